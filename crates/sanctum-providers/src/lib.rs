//! sanctum-providers: clients for the external capabilities.
//!
//! Implements the `Generator` trait for OpenAI-compatible chat and embedding
//! APIs and the `VectorIndex` trait for Pinecone, plus in-memory mocks and the
//! configuration that wires them together.

pub mod config;
pub mod error;
pub mod mock;
pub mod openai;
pub mod pinecone;

pub use config::{connect_index, create_generator, load_config_from, SanctumConfig};
pub use error::{ProviderError, StoreError};
