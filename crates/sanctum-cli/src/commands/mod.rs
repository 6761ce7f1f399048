pub mod cards;
pub mod generate;
pub mod grade;
pub mod init;
pub mod show;
pub mod stats;
pub mod suggest;

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use sanctum_core::model::CardId;
use sanctum_core::store::CardStore;
use sanctum_core::traits::Generator;
use sanctum_providers::config::{connect_index, create_generator, load_config_from};
use sanctum_providers::SanctumConfig;

/// Configured clients shared by the commands that touch the index.
pub struct Services {
    pub config: SanctumConfig,
    pub generator: Arc<dyn Generator>,
    pub store: Arc<CardStore>,
}

impl Services {
    pub async fn connect(config_path: Option<&Path>) -> Result<Self> {
        let config = load_config_from(config_path)?;
        let generator = create_generator(&config.openai)?;
        let index = connect_index(&config.pinecone).await?;
        debug!(generator = generator.name(), index = index.name(), "clients configured");
        let store = Arc::new(CardStore::new(generator.clone(), index));
        Ok(Self {
            config,
            generator,
            store,
        })
    }
}

pub fn parse_card_id(id: &str) -> Result<CardId> {
    CardId::from_str(id).with_context(|| format!("invalid card id '{id}'"))
}
