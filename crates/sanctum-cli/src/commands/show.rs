//! The `sanctum show` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use sanctum_core::model::FlashcardDeck;

pub fn execute(path: PathBuf) -> Result<()> {
    let deck = FlashcardDeck::load_json(&path)?;

    println!("{} ({} cards)\n", deck.title, deck.len());
    println!("{}", deck_table(&deck));
    Ok(())
}

pub fn deck_table(deck: &FlashcardDeck) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["#", "Question", "Answer", "Id"]);
    for (i, card) in deck.cards.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&card.pattern),
            Cell::new(&card.answer),
            Cell::new(card.id),
        ]);
    }
    table
}
