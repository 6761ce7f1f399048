//! The `sanctum stats` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use super::Services;

pub async fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let services = Services::connect(config_path.as_deref()).await?;
    let stats = services
        .store
        .stats()
        .await
        .context("failed to read index statistics")?;

    let mut table = Table::new();
    table.set_header(vec!["Index", "Namespace", "Vectors", "Dimension"]);
    table.add_row(vec![
        Cell::new(&services.config.pinecone.index_name),
        Cell::new(&services.config.pinecone.namespace),
        Cell::new(stats.vector_count),
        Cell::new(stats.dimension),
    ]);

    println!("{table}");
    Ok(())
}
