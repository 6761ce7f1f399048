//! Progress notifications emitted by a deck expansion run.

use serde::Serialize;

use crate::error::DeckError;
use crate::model::FlashcardDeck;

/// One notification in a run's ordered event stream.
///
/// Every stream ends with exactly one terminal event: `Complete` or `Failed`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DeckEvent {
    Status {
        message: String,
        progress: f64,
    },
    Complete {
        message: String,
        progress: f64,
        deck: FlashcardDeck,
    },
    Failed {
        message: String,
        kind: String,
        /// Cards already written to the store before the failure.
        cards_stored: usize,
    },
}

impl DeckEvent {
    pub fn status(message: impl Into<String>, progress: f64) -> Self {
        DeckEvent::Status {
            message: message.into(),
            progress,
        }
    }

    pub fn complete(deck: FlashcardDeck) -> Self {
        DeckEvent::Complete {
            message: "Deck generation complete".to_string(),
            progress: 100.0,
            deck,
        }
    }

    pub fn failed(error: &DeckError, cards_stored: usize) -> Self {
        DeckEvent::Failed {
            message: error.to_string(),
            kind: error.kind().to_string(),
            cards_stored,
        }
    }

    /// SSE event name.
    pub fn event_type(&self) -> &'static str {
        match self {
            DeckEvent::Status { .. } => "status",
            DeckEvent::Complete { .. } => "complete",
            DeckEvent::Failed { .. } => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, DeckEvent::Status { .. })
    }

    /// Percent complete, if the event carries one.
    pub fn progress(&self) -> Option<f64> {
        match self {
            DeckEvent::Status { progress, .. } | DeckEvent::Complete { progress, .. } => {
                Some(*progress)
            }
            DeckEvent::Failed { .. } => None,
        }
    }

    /// Render as a server-sent event frame.
    pub fn to_sse(&self) -> Result<String, serde_json::Error> {
        let data = serde_json::to_string(self)?;
        Ok(format!("event: {}\ndata: {data}\n\n", self.event_type()))
    }
}

/// Percentage of the target reached, capped at 100.
pub fn percent_complete(count: usize, target: usize) -> f64 {
    if target == 0 {
        return 100.0;
    }
    (100.0 * count as f64 / target as f64).min(100.0)
}
