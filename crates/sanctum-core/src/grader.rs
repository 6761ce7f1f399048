//! Grading orchestrator: scores a free-text answer against a card's stored
//! answer by embedding similarity.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::error::GradeError;
use crate::grade::classify;
use crate::model::{CardId, GradeRequest, GradeResult};
use crate::similarity::similarity;
use crate::store::CardStore;

/// Configuration for the grader.
#[derive(Debug, Clone)]
pub struct GraderConfig {
    /// Attach a letter grade to each result.
    pub letter_grades: bool,
}

impl Default for GraderConfig {
    fn default() -> Self {
        Self {
            letter_grades: true,
        }
    }
}

pub struct Grader {
    store: Arc<CardStore>,
    config: GraderConfig,
}

impl Grader {
    pub fn new(store: Arc<CardStore>, config: GraderConfig) -> Self {
        Self { store, config }
    }

    /// Grade `answer` against the stored answer of card `id`.
    ///
    /// The stored vector is fetched first, then the answer is embedded.
    /// Nothing is cached, so identical inputs are re-scored every time.
    #[instrument(skip(self, id, answer), fields(id = %id))]
    pub async fn grade(&self, id: CardId, answer: &str) -> Result<GradeResult, GradeError> {
        if answer.trim().is_empty() {
            return Err(GradeError::InvalidInput("an answer must be provided".into()));
        }

        // A missing card is reported before any embedding is requested.
        let stored = self
            .store
            .fetch(id)
            .await
            .map_err(GradeError::AnswerUnavailable)?;
        let submitted = self
            .store
            .embed(answer)
            .await
            .map_err(GradeError::EmbeddingFailed)?;

        if stored.len() != submitted.len() {
            return Err(GradeError::DimensionMismatch {
                stored: stored.len(),
                submitted: submitted.len(),
            });
        }

        let numeric_grade = similarity(&stored, &submitted)?;
        let letter_grade = self.config.letter_grades.then(|| classify(numeric_grade));
        info!(numeric_grade, ?letter_grade, "answer graded");

        Ok(GradeResult {
            numeric_grade,
            letter_grade,
        })
    }

    pub async fn grade_request(&self, request: &GradeRequest) -> Result<GradeResult, GradeError> {
        self.grade(request.id, &request.answer).await
    }
}
