//! Card identity and the answer-vector store adapter.
//!
//! [`CardStore`] pairs the embedding side of a [`Generator`] with a
//! [`VectorIndex`]: writing a card embeds its answer and upserts the vector
//! under the card's id, and grading later fetches that vector back.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::error::{ProviderError, StoreError};
use crate::model::{CardId, Flashcard, IndexStats};
use crate::traits::{Embedding, Generator, VectorIndex, VectorRecord};

/// Issue a new card identity.
pub fn assign_identity() -> CardId {
    CardId::generate()
}

/// Stores and retrieves answer embeddings keyed by card identity.
///
/// Construct once at startup and share it behind an `Arc`.
pub struct CardStore {
    embedder: Arc<dyn Generator>,
    index: Arc<dyn VectorIndex>,
}

impl CardStore {
    pub fn new(embedder: Arc<dyn Generator>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index }
    }

    /// Embed `text` and write it under `id`, replacing any existing vector.
    pub async fn upsert(&self, id: CardId, text: &str) -> Result<(), StoreError> {
        self.upsert_batch(&[(id, text.to_string())]).await?;
        Ok(())
    }

    /// Embed every text in one request and upsert the vectors under their ids.
    ///
    /// Embeddings are matched back to entries by their returned index, so the
    /// provider may answer in any order.
    #[instrument(skip(self, entries), fields(count = entries.len(), index = self.index.name()))]
    pub async fn upsert_batch(&self, entries: &[(CardId, String)]) -> Result<usize, StoreError> {
        if entries.is_empty() {
            return Ok(0);
        }
        if let Some((id, _)) = entries.iter().find(|(_, text)| text.trim().is_empty()) {
            return Err(StoreError::Invalid(format!("card {id} has an empty answer")));
        }

        let texts: Vec<String> = entries.iter().map(|(_, text)| text.clone()).collect();
        let embeddings = self.embedder.embed(&texts).await?;
        let vectors = correlate(entries.len(), embeddings)?;

        let records = entries
            .iter()
            .zip(vectors)
            .map(|((id, _), values)| VectorRecord {
                id: id.to_string(),
                values,
            })
            .collect();

        let written = self.index.upsert(records).await?;
        info!(written, "vectors upserted");
        Ok(written)
    }

    /// Upsert the answer of each card.
    pub async fn upsert_cards(&self, cards: &[Flashcard]) -> Result<usize, StoreError> {
        let entries: Vec<(CardId, String)> = cards
            .iter()
            .map(|card| (card.id, card.answer.clone()))
            .collect();
        self.upsert_batch(&entries).await
    }

    /// Fetch the stored answer vector for `id`.
    #[instrument(skip(self, id), fields(id = %id))]
    pub async fn fetch(&self, id: CardId) -> Result<Vec<f32>, StoreError> {
        let key = id.to_string();
        let mut found = self.index.fetch(std::slice::from_ref(&key)).await?;
        let vector = found.remove(&key).ok_or(StoreError::NotFound(key))?;
        if vector.is_empty() {
            return Err(StoreError::Invalid(format!("card {id} has an empty vector")));
        }
        debug!(dimension = vector.len(), "fetched answer vector");
        Ok(vector)
    }

    /// Delete the record for `id`. Deleting an unknown id succeeds.
    pub async fn remove(&self, id: CardId) -> Result<(), StoreError> {
        self.remove_many(&[id]).await
    }

    pub async fn remove_many(&self, ids: &[CardId]) -> Result<(), StoreError> {
        if ids.is_empty() {
            return Ok(());
        }
        let keys: Vec<String> = ids.iter().map(CardId::to_string).collect();
        self.index.delete(&keys).await?;
        info!(count = keys.len(), "vectors removed");
        Ok(())
    }

    /// Embed a single text, e.g. a submitted answer.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let embeddings = self.embedder.embed(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .find(|e| e.index == 0)
            .map(|e| e.vector)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ProviderError::MalformedResponse("no embedding returned".into()))
    }

    pub async fn stats(&self) -> Result<IndexStats, StoreError> {
        self.index.describe_stats().await
    }
}

/// Place each embedding at the position its index names.
///
/// Rejects responses with the wrong count, out-of-range or repeated indices,
/// empty vectors, or mixed dimensions.
fn correlate(expected: usize, embeddings: Vec<Embedding>) -> Result<Vec<Vec<f32>>, StoreError> {
    if embeddings.len() != expected {
        return Err(StoreError::Invalid(format!(
            "expected {expected} embeddings, got {}",
            embeddings.len()
        )));
    }

    let mut slots: Vec<Option<Vec<f32>>> = vec![None; expected];
    let mut dimension = None;
    for embedding in embeddings {
        let slot = slots.get_mut(embedding.index).ok_or_else(|| {
            StoreError::Invalid(format!("embedding index {} out of range", embedding.index))
        })?;
        if slot.is_some() {
            return Err(StoreError::Invalid(format!(
                "embedding index {} returned twice",
                embedding.index
            )));
        }
        if embedding.vector.is_empty() {
            return Err(StoreError::Invalid(format!(
                "embedding {} is empty",
                embedding.index
            )));
        }
        match dimension {
            None => dimension = Some(embedding.vector.len()),
            Some(d) if d != embedding.vector.len() => {
                return Err(StoreError::Invalid(format!(
                    "embedding {} has {} dimensions, expected {d}",
                    embedding.index,
                    embedding.vector.len()
                )));
            }
            Some(_) => {}
        }
        *slot = Some(embedding.vector);
    }

    slots
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| StoreError::Invalid("embedding response has gaps".into()))
}
