//! In-crate test doubles for the capability traits.
//!
//! Builder names follow `sanctum_providers::mock`, which this crate cannot
//! depend on. Embeddings here are letter histograms so expected scores can
//! be worked out by hand.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{ProviderError, StoreError};
use crate::model::IndexStats;
use crate::traits::{ChatRequest, Embedding, Generator, VectorIndex, VectorRecord};

/// Returns queued chat replies in order and embeds text as a letter histogram.
#[derive(Default)]
pub struct FakeGenerator {
    replies: Mutex<VecDeque<Result<String, ProviderError>>>,
    pub requests: Mutex<Vec<ChatRequest>>,
    shuffle_embeddings: bool,
    fail_embeddings: bool,
}

impl FakeGenerator {
    pub fn with_responses(replies: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Default::default()
        }
    }

    /// Return embeddings in reverse input order.
    pub fn shuffled_embeddings(mut self) -> Self {
        self.shuffle_embeddings = true;
        self
    }

    pub fn failing_embeddings(mut self) -> Self {
        self.fail_embeddings = true;
        self
    }
}

pub fn letter_histogram(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; 26];
    for c in text.chars().filter(|c| c.is_ascii_alphabetic()) {
        v[(c.to_ascii_lowercase() as u8 - b'a') as usize] += 1.0;
    }
    v
}

#[async_trait]
impl Generator for FakeGenerator {
    fn name(&self) -> &str {
        "fake"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<String, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::NetworkError("no scripted reply".into())))
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>, ProviderError> {
        if self.fail_embeddings {
            return Err(ProviderError::ApiError {
                status: 503,
                message: "embeddings down".into(),
            });
        }
        let mut out: Vec<Embedding> = texts
            .iter()
            .enumerate()
            .map(|(index, t)| Embedding {
                index,
                vector: letter_histogram(t),
            })
            .collect();
        if self.shuffle_embeddings {
            out.reverse();
        }
        Ok(out)
    }
}

/// HashMap-backed index that can be told to fail its Nth upsert.
#[derive(Default)]
pub struct FakeIndex {
    pub vectors: Mutex<HashMap<String, Vec<f32>>>,
    upserts: AtomicU32,
    fail_upsert_on: Option<u32>,
}

impl FakeIndex {
    pub fn failing_upsert_on(call: u32) -> Self {
        Self {
            fail_upsert_on: Some(call),
            ..Default::default()
        }
    }
}

#[async_trait]
impl VectorIndex for FakeIndex {
    fn name(&self) -> &str {
        "fake"
    }

    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize, StoreError> {
        let call = self.upserts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_upsert_on == Some(call) {
            return Err(StoreError::Unavailable("injected failure".into()));
        }
        let mut vectors = self.vectors.lock().unwrap();
        let n = records.len();
        for r in records {
            vectors.insert(r.id, r.values);
        }
        Ok(n)
    }

    async fn fetch(&self, ids: &[String]) -> Result<HashMap<String, Vec<f32>>, StoreError> {
        let vectors = self.vectors.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| vectors.get(id).map(|v| (id.clone(), v.clone())))
            .collect())
    }

    async fn delete(&self, ids: &[String]) -> Result<(), StoreError> {
        let mut vectors = self.vectors.lock().unwrap();
        for id in ids {
            vectors.remove(id);
        }
        Ok(())
    }

    async fn describe_stats(&self) -> Result<IndexStats, StoreError> {
        let vectors = self.vectors.lock().unwrap();
        Ok(IndexStats {
            vector_count: vectors.len() as u64,
            dimension: vectors.values().next().map(|v| v.len() as u32).unwrap_or(0),
        })
    }
}
