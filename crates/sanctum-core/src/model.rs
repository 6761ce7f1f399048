//! Core data model types for sanctum.
//!
//! Flashcards, decks, and the request/response shapes exchanged with the
//! surrounding system.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::grade::LetterGrade;

/// Opaque, globally unique card identity.
///
/// Backed by a random (v4) UUID, so identities carry 122 bits of entropy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(Uuid);

impl CardId {
    /// Issue a fresh identity. Never returns a previously issued value.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for CardId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for CardId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// A question/answer pair as produced by the generation model, before it has
/// been given an identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CardDraft {
    /// The prompt or question.
    pub pattern: String,
    /// The expected answer.
    #[serde(rename = "match")]
    pub answer: String,
}

/// A flashcard with its assigned identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    /// The prompt or question.
    pub pattern: String,
    /// The expected answer.
    #[serde(rename = "match")]
    pub answer: String,
    /// Identity assigned at creation. Older payloads call this `uuid`.
    #[serde(alias = "uuid")]
    pub id: CardId,
}

impl Flashcard {
    pub fn new(pattern: impl Into<String>, answer: impl Into<String>, id: CardId) -> Self {
        Self {
            pattern: pattern.into(),
            answer: answer.into(),
            id,
        }
    }

    pub fn from_draft(draft: CardDraft, id: CardId) -> Self {
        Self {
            pattern: draft.pattern,
            answer: draft.answer,
            id,
        }
    }

    /// The card without its identity, as shown to the generation model.
    pub fn draft(&self) -> CardDraft {
        CardDraft {
            pattern: self.pattern.clone(),
            answer: self.answer.clone(),
        }
    }
}

/// An ordered collection of flashcards about one topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashcardDeck {
    pub cards: Vec<Flashcard>,
    pub title: String,
}

impl FlashcardDeck {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            cards: Vec::new(),
            title: title.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Save the deck as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize deck")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write deck to {}", path.display()))?;
        Ok(())
    }

    /// Load a deck from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read deck from {}", path.display()))?;
        let deck: FlashcardDeck =
            serde_json::from_str(&content).context("failed to parse deck JSON")?;
        Ok(deck)
    }
}

/// Request to generate a deck.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeckRequest {
    pub prompt: String,
}

impl From<String> for DeckRequest {
    fn from(prompt: String) -> Self {
        Self { prompt }
    }
}

impl From<&str> for DeckRequest {
    fn from(prompt: &str) -> Self {
        Self {
            prompt: prompt.to_string(),
        }
    }
}

/// Request to grade an answer against a stored card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeRequest {
    #[serde(alias = "uuid")]
    pub id: CardId,
    pub answer: String,
}

/// Outcome of grading one answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeResult {
    /// Similarity score in `[0, 100]`.
    pub numeric_grade: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub letter_grade: Option<LetterGrade>,
}

/// Vector index statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub vector_count: u64,
    pub dimension: u32,
}

impl fmt::Display for IndexStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Vector Count: {}, Dimension: {}",
            self.vector_count, self.dimension
        )
    }
}

/// Structured error payload returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            kind: kind.into(),
        }
    }
}

impl From<&crate::error::DeckError> for ErrorResponse {
    fn from(err: &crate::error::DeckError) -> Self {
        Self::new(err.to_string(), err.kind())
    }
}

impl From<&crate::error::GradeError> for ErrorResponse {
    fn from(err: &crate::error::GradeError) -> Self {
        Self::new(err.to_string(), err.kind())
    }
}
