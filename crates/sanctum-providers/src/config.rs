//! Configuration loading and client factories.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use sanctum_core::engine::DeckExpanderConfig;
use sanctum_core::grader::GraderConfig;
use sanctum_core::traits::{Generator, VectorIndex};

use crate::openai::{OpenAiProvider, DEFAULT_EMBEDDING_MODEL};
use crate::pinecone::PineconeIndex;

/// OpenAI-compatible generation and embedding settings.
///
/// Note: Custom Debug impl masks the API key to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: Option<String>,
    pub org_id: Option<String>,
    pub chat_model: String,
    pub embedding_model: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: None,
            org_id: None,
            chat_model: "gpt-4o".to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
        }
    }
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &"***")
            .field("base_url", &self.base_url)
            .field("org_id", &self.org_id)
            .field("chat_model", &self.chat_model)
            .field("embedding_model", &self.embedding_model)
            .finish()
    }
}

/// Pinecone index settings. Without `host`, the data-plane host is looked up
/// by `index_name`.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PineconeConfig {
    pub api_key: String,
    pub index_name: String,
    pub host: Option<String>,
    pub namespace: String,
    pub control_plane_url: Option<String>,
}

impl Default for PineconeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            index_name: "sanctum2".to_string(),
            host: None,
            namespace: "flashcards".to_string(),
            control_plane_url: None,
        }
    }
}

impl std::fmt::Debug for PineconeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PineconeConfig")
            .field("api_key", &"***")
            .field("index_name", &self.index_name)
            .field("host", &self.host)
            .field("namespace", &self.namespace)
            .field("control_plane_url", &self.control_plane_url)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeckConfig {
    pub target_size: usize,
    pub max_rounds: u32,
    pub round_delay_ms: u64,
    pub temperature: f64,
    pub rollback_on_failure: bool,
}

impl Default for DeckConfig {
    fn default() -> Self {
        let defaults = DeckExpanderConfig::default();
        Self {
            target_size: defaults.target_size,
            max_rounds: defaults.max_rounds,
            round_delay_ms: defaults.round_delay.as_millis() as u64,
            temperature: defaults.temperature,
            rollback_on_failure: defaults.rollback_on_failure,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GradingConfig {
    pub letter_grades: bool,
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            letter_grades: true,
        }
    }
}

/// Top-level sanctum configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SanctumConfig {
    pub openai: OpenAiConfig,
    pub pinecone: PineconeConfig,
    pub deck: DeckConfig,
    pub grading: GradingConfig,
}

impl SanctumConfig {
    pub fn expander_config(&self) -> DeckExpanderConfig {
        DeckExpanderConfig {
            model: self.openai.chat_model.clone(),
            target_size: self.deck.target_size,
            max_rounds: self.deck.max_rounds,
            round_delay: Duration::from_millis(self.deck.round_delay_ms),
            temperature: self.deck.temperature,
            rollback_on_failure: self.deck.rollback_on_failure,
        }
    }

    pub fn grader_config(&self) -> GraderConfig {
        GraderConfig {
            letter_grades: self.grading.letter_grades,
        }
    }

    fn resolve_env_vars(&mut self) {
        let openai = &mut self.openai;
        openai.api_key = resolve_env_vars(&openai.api_key);
        openai.base_url = openai.base_url.as_deref().map(resolve_env_vars);
        openai.org_id = openai.org_id.as_deref().map(resolve_env_vars);

        let pinecone = &mut self.pinecone;
        pinecone.api_key = resolve_env_vars(&pinecone.api_key);
        pinecone.index_name = resolve_env_vars(&pinecone.index_name);
        pinecone.host = pinecone.host.as_deref().map(resolve_env_vars);
        pinecone.namespace = resolve_env_vars(&pinecone.namespace);
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

/// Load config from an explicit path, or search the default locations.
///
/// Search order without a path:
/// 1. `sanctum.toml` in the current directory
/// 2. `~/.config/sanctum/config.toml`
///
/// Environment variable overrides: `OPENAI_API_KEY`, `PINECONE_API_KEY`.
pub fn load_config_from(path: Option<&Path>) -> Result<SanctumConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("sanctum.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            parse_config(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => SanctumConfig::default(),
    };

    if let Ok(key) = std::env::var("OPENAI_API_KEY") {
        config.openai.api_key = key;
    }
    if let Ok(key) = std::env::var("PINECONE_API_KEY") {
        config.pinecone.api_key = key;
    }

    Ok(config)
}

/// Parse a config document and resolve `${VAR}` references in it.
pub fn parse_config(content: &str) -> Result<SanctumConfig> {
    let mut config: SanctumConfig = toml::from_str(content)?;
    config.resolve_env_vars();
    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("sanctum"))
}

/// Create the generation client from its configuration.
pub fn create_generator(config: &OpenAiConfig) -> Result<Arc<dyn Generator>> {
    anyhow::ensure!(
        !config.api_key.trim().is_empty(),
        "no OpenAI API key configured (set OPENAI_API_KEY or [openai].api_key)"
    );
    let provider = OpenAiProvider::new(
        &config.api_key,
        config.base_url.clone(),
        config.org_id.clone(),
    )?
    .with_embedding_model(config.embedding_model.clone());
    Ok(Arc::new(provider))
}

/// Open the configured index, discovering its host if none is set.
pub async fn connect_index(config: &PineconeConfig) -> Result<Arc<dyn VectorIndex>> {
    anyhow::ensure!(
        !config.api_key.trim().is_empty(),
        "no Pinecone API key configured (set PINECONE_API_KEY or [pinecone].api_key)"
    );
    let index = match config.host.as_deref().filter(|h| !h.trim().is_empty()) {
        Some(host) => PineconeIndex::new(&config.api_key, host, &config.namespace)?,
        None => PineconeIndex::connect(
            &config.api_key,
            &config.index_name,
            &config.namespace,
            config.control_plane_url.as_deref(),
        )
        .await
        .with_context(|| format!("failed to connect to index '{}'", config.index_name))?,
    };
    Ok(Arc::new(index))
}
