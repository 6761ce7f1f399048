//! The `sanctum grade` command.

use std::path::PathBuf;

use anyhow::Result;

use sanctum_core::grader::Grader;
use sanctum_core::model::{ErrorResponse, GradeRequest};

use super::{parse_card_id, Services};

pub async fn execute(
    id: String,
    answer: String,
    no_letter: bool,
    format: String,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let id = parse_card_id(&id)?;
    anyhow::ensure!(!answer.trim().is_empty(), "an answer must be provided");
    anyhow::ensure!(
        matches!(format.as_str(), "text" | "json"),
        "unknown format '{format}', expected text or json"
    );

    let services = Services::connect(config_path.as_deref()).await?;
    let mut grader_config = services.config.grader_config();
    if no_letter {
        grader_config.letter_grades = false;
    }
    let grader = Grader::new(services.store, grader_config);

    let request = GradeRequest { id, answer };
    match grader.grade_request(&request).await {
        Ok(result) if format == "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Ok(result) => match result.letter_grade {
            Some(letter) => println!("Score: {:.1} ({letter})", result.numeric_grade),
            None => println!("Score: {:.1}", result.numeric_grade),
        },
        Err(e) => {
            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&ErrorResponse::from(&e))?);
            }
            return Err(e.into());
        }
    }

    Ok(())
}
