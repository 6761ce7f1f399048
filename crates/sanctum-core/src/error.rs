//! Error types for the generation capability, the card store, and the two
//! orchestrators.
//!
//! `ProviderError` is defined here rather than in `sanctum-providers` so the
//! orchestrators can classify failures by variant without string matching.

use thiserror::Error;

use crate::engine::DeckPhase;

/// Errors that can occur when calling the generation capability.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// No API key was configured for the provider.
    #[error("missing credentials for {0}")]
    MissingCredentials(String),

    /// Authentication failed (invalid API key).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The API returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The response body did not have the expected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Errors raised by the card store adapter and the vector index behind it.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The index service could not be reached or rejected the call.
    #[error("vector index unavailable: {0}")]
    Unavailable(String),

    /// No record exists for the id, or it is still propagating after an upsert.
    #[error("answer for card {0} is unavailable: it does not exist or is still being indexed")]
    NotFound(String),

    /// The request or the returned data was malformed.
    #[error("invalid store operation: {0}")]
    Invalid(String),

    /// Embedding the answer text failed before anything was written.
    #[error("failed to embed answer text: {0}")]
    Embedding(#[from] ProviderError),
}

/// Errors from the similarity engine.
#[derive(Debug, Error, PartialEq)]
pub enum SimilarityError {
    /// One of the vectors has zero magnitude, so the cosine is undefined.
    #[error("undefined similarity: zero-magnitude vector")]
    ZeroMagnitude,

    /// A component was NaN or infinite.
    #[error("undefined similarity: non-finite vector component")]
    NonFinite,
}

/// Terminal failure of a deck expansion run.
#[derive(Debug, Error)]
pub enum DeckError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("generation request failed during {phase}: {source}")]
    Generation {
        phase: DeckPhase,
        #[source]
        source: ProviderError,
    },

    #[error("could not parse generated cards: {0}")]
    Parse(String),

    #[error("failed to store generated cards: {0}")]
    StoreWrite(#[source] StoreError),

    #[error("round {round} produced no new cards")]
    Stalled { round: u32 },

    #[error("gave up after {rounds} rounds with {cards} of {target} cards")]
    RoundLimit {
        rounds: u32,
        cards: usize,
        target: usize,
    },

    #[error("deck generation cancelled by the caller")]
    Cancelled,
}

impl DeckError {
    /// Stable machine-readable category for error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            DeckError::InvalidInput(_) => "invalid_input",
            DeckError::Generation { .. } => "generation_failure",
            DeckError::Parse(_) => "generation_parse_error",
            DeckError::StoreWrite(_) => "store_write_error",
            DeckError::Stalled { .. } => "stalled",
            DeckError::RoundLimit { .. } => "round_limit",
            DeckError::Cancelled => "cancelled",
        }
    }
}

/// Failure of a grading request.
#[derive(Debug, Error)]
pub enum GradeError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    AnswerUnavailable(#[source] StoreError),

    #[error("unable to embed provided answer: {0}")]
    EmbeddingFailed(#[source] ProviderError),

    #[error(transparent)]
    UndefinedSimilarity(#[from] SimilarityError),

    #[error("stored answer has {stored} dimensions but the submitted answer has {submitted}")]
    DimensionMismatch { stored: usize, submitted: usize },
}

impl GradeError {
    /// Stable machine-readable category for error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            GradeError::InvalidInput(_) => "invalid_input",
            GradeError::AnswerUnavailable(_) => "answer_unavailable",
            GradeError::EmbeddingFailed(_) => "embedding_failed",
            GradeError::UndefinedSimilarity(_) => "undefined_similarity",
            GradeError::DimensionMismatch { .. } => "dimension_mismatch",
        }
    }
}

/// Failure of a prompt suggestion request.
#[derive(Debug, Error)]
pub enum SuggestError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("prompt suggestion failed: {0}")]
    Generation(#[from] ProviderError),

    #[error("model returned an empty suggestion")]
    EmptyResponse,
}
