//! The `sanctum add-card` and `sanctum remove-card` commands.

use std::path::PathBuf;

use anyhow::{Context, Result};

use sanctum_core::store::assign_identity;

use super::{parse_card_id, Services};

pub async fn add(pattern: String, answer: String, config_path: Option<PathBuf>) -> Result<()> {
    anyhow::ensure!(!pattern.trim().is_empty(), "pattern cannot be empty");
    anyhow::ensure!(!answer.trim().is_empty(), "answer cannot be empty");

    let services = Services::connect(config_path.as_deref()).await?;
    let id = assign_identity();
    services
        .store
        .upsert(id, answer.trim())
        .await
        .context("failed to store card")?;

    println!("Added card {id}");
    Ok(())
}

pub async fn remove(id: String, config_path: Option<PathBuf>) -> Result<()> {
    let id = parse_card_id(&id)?;

    let services = Services::connect(config_path.as_deref()).await?;
    services
        .store
        .remove(id)
        .await
        .context("failed to remove card")?;

    println!("Removed card {id}");
    Ok(())
}
