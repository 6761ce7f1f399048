//! The `sanctum suggest` command.

use std::path::PathBuf;

use anyhow::Result;

use sanctum_core::suggest::suggest_prompt;
use sanctum_providers::config::{create_generator, load_config_from};

pub async fn execute(prompt: String, config_path: Option<PathBuf>) -> Result<()> {
    anyhow::ensure!(!prompt.trim().is_empty(), "prompt cannot be empty");

    let config = load_config_from(config_path.as_deref())?;
    let generator = create_generator(&config.openai)?;

    let enhanced = suggest_prompt(generator.as_ref(), &config.openai.chat_model, &prompt).await?;
    println!("{enhanced}");
    Ok(())
}
