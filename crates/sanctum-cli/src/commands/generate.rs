//! The `sanctum generate` command.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use sanctum_core::engine::DeckExpander;
use sanctum_core::events::DeckEvent;
use sanctum_core::model::FlashcardDeck;

use super::show::deck_table;
use super::Services;

pub async fn execute(
    prompt: String,
    target: Option<usize>,
    max_rounds: Option<u32>,
    format: String,
    output: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    anyhow::ensure!(!prompt.trim().is_empty(), "prompt cannot be empty");
    anyhow::ensure!(
        matches!(format.as_str(), "text" | "sse" | "json"),
        "unknown format '{format}', expected text, sse or json"
    );
    if let Some(target) = target {
        anyhow::ensure!(target >= 1, "target must be at least 1");
    }
    if let Some(rounds) = max_rounds {
        anyhow::ensure!(rounds >= 1, "max-rounds must be at least 1");
    }

    let services = Services::connect(config_path.as_deref()).await?;
    let mut expander_config = services.config.expander_config();
    if let Some(target) = target {
        expander_config.target_size = target;
    }
    if let Some(rounds) = max_rounds {
        expander_config.max_rounds = rounds;
    }

    let expander = Arc::new(DeckExpander::new(
        services.generator,
        services.store,
        expander_config,
    ));
    let mut run = expander.spawn(prompt);

    let mut finished: Option<FlashcardDeck> = None;
    let mut interrupted = false;
    loop {
        tokio::select! {
            event = run.recv() => {
                let Some(event) = event else { break };
                render(&event, &format)?;
                match event {
                    DeckEvent::Complete { deck, .. } => finished = Some(deck),
                    DeckEvent::Failed { message, kind, cards_stored } => {
                        anyhow::bail!(
                            "deck generation failed ({kind}): {message}; {cards_stored} cards were already stored"
                        );
                    }
                    DeckEvent::Status { .. } => {}
                }
            }
            _ = tokio::signal::ctrl_c() => {
                interrupted = true;
                break;
            }
        }
    }

    if interrupted {
        // Wait for the run to roll back before the process exits.
        if let Err(e) = run.cancel().await {
            tracing::warn!(error = %e, "deck generation task did not shut down cleanly");
        }
        anyhow::bail!("deck generation cancelled");
    }

    let deck = finished.ok_or_else(|| anyhow::anyhow!("generation ended without a result"))?;

    if format == "text" {
        println!("{}\n", deck.title);
        println!("{}", deck_table(&deck));
    }

    if let Some(dir) = output {
        let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H%M%S");
        let path = dir.join(format!("deck-{timestamp}.json"));
        deck.save_json(&path)?;
        eprintln!("Deck saved to: {}", path.display());
    }

    Ok(())
}

fn render(event: &DeckEvent, format: &str) -> Result<()> {
    match format {
        "sse" => print!("{}", event.to_sse()?),
        "json" => println!("{}", serde_json::to_string(event)?),
        _ => match event {
            DeckEvent::Status { message, progress } => {
                eprintln!("[{progress:>5.1}%] {message}");
            }
            DeckEvent::Complete { message, deck, .. } => {
                eprintln!("[100.0%] {message}: {} cards", deck.len());
            }
            DeckEvent::Failed { .. } => {}
        },
    }
    Ok(())
}
