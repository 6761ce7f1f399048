//! Capability traits for the generation model and the vector index.
//!
//! Both are external network services. Concrete clients live in
//! `sanctum-providers`; the orchestrators here only see these traits.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, StoreError};
use crate::model::IndexStats;

// ---------------------------------------------------------------------------
// Generation capability
// ---------------------------------------------------------------------------

/// A chat and embedding backend.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Human-readable provider name (e.g. "openai").
    fn name(&self) -> &str;

    /// Run a chat completion and return the text of the first choice.
    async fn chat(&self, request: &ChatRequest) -> Result<String, ProviderError>;

    /// Embed each input text.
    ///
    /// Results carry the position of the input they belong to. Callers must
    /// correlate by [`Embedding::index`], not by the order of the returned list.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>, ProviderError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// A chat completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Model identifier (e.g. "gpt-4o").
    pub model: String,
    pub messages: Vec<ChatMessage>,
    /// Structured output contract the response must conform to.
    #[serde(default)]
    pub response_schema: Option<ResponseSchema>,
    /// Sampling temperature.
    pub temperature: f64,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

/// A named JSON schema for structured output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseSchema {
    pub name: String,
    pub schema: serde_json::Value,
    pub strict: bool,
}

/// One embedding result, tagged with the position of its input text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub index: usize,
    pub vector: Vec<f32>,
}

// ---------------------------------------------------------------------------
// Vector index capability
// ---------------------------------------------------------------------------

/// A vector written to the index under an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
}

/// A key/vector index with upsert semantics.
///
/// Writes are last-writer-wins per id. Namespace selection is part of the
/// implementation's configuration.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    fn name(&self) -> &str;

    /// Write or replace each record. Returns the number of vectors written.
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize, StoreError>;

    /// Fetch vectors by id. Absent ids are simply missing from the map.
    async fn fetch(&self, ids: &[String]) -> Result<HashMap<String, Vec<f32>>, StoreError>;

    /// Delete vectors by id. Unknown ids are not an error.
    async fn delete(&self, ids: &[String]) -> Result<(), StoreError>;

    async fn describe_stats(&self) -> Result<IndexStats, StoreError>;
}
