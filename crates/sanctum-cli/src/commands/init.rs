//! The `sanctum init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("sanctum.toml").exists() {
        println!("sanctum.toml already exists, skipping.");
    } else {
        std::fs::write("sanctum.toml", SAMPLE_CONFIG)?;
        println!("Created sanctum.toml");
    }

    println!("\nNext steps:");
    println!("  1. Set OPENAI_API_KEY and PINECONE_API_KEY, or edit sanctum.toml");
    println!("  2. Run: sanctum stats");
    println!("  3. Run: sanctum generate --prompt \"The French Revolution\"");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# sanctum configuration

[openai]
api_key = "${OPENAI_API_KEY}"
chat_model = "gpt-4o"
embedding_model = "text-embedding-3-small"

[pinecone]
api_key = "${PINECONE_API_KEY}"
index_name = "sanctum2"
namespace = "flashcards"
# host = "sanctum2-xxxxxxx.svc.pinecone.io"

[deck]
target_size = 20
max_rounds = 40
round_delay_ms = 200
temperature = 0.7
rollback_on_failure = false

[grading]
letter_grades = true
"#;
