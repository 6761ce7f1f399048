//! Mock generator and in-memory index for testing without network calls.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use sanctum_core::model::IndexStats;
use sanctum_core::traits::{ChatRequest, Embedding, Generator, VectorIndex, VectorRecord};

use crate::error::{ProviderError, StoreError};

/// Dimension of [`hashed_embedding`] vectors.
pub const MOCK_EMBEDDING_DIM: usize = 64;

enum ChatScript {
    Fixed(String),
    Queue(Mutex<VecDeque<Result<String, ProviderError>>>),
    /// Every call returns this many cards no earlier call returned.
    Cards(usize),
}

/// A mock generator for exercising the expander and grader end to end.
pub struct MockGenerator {
    script: ChatScript,
    shuffle_embeddings: bool,
    fail_embeddings: bool,
    call_count: AtomicU32,
    last_request: Mutex<Option<ChatRequest>>,
}

impl MockGenerator {
    fn with_script(script: ChatScript) -> Self {
        Self {
            script,
            shuffle_embeddings: false,
            fail_embeddings: false,
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Create a mock that always returns the same response.
    pub fn with_fixed_response(response: &str) -> Self {
        Self::with_script(ChatScript::Fixed(response.to_string()))
    }

    /// Return each response once, in order. Calls past the end fail.
    pub fn with_responses(responses: Vec<Result<String, ProviderError>>) -> Self {
        Self::with_script(ChatScript::Queue(Mutex::new(responses.into())))
    }

    /// Answer every chat call with `per_call` fresh flashcards.
    pub fn card_factory(per_call: usize) -> Self {
        Self::with_script(ChatScript::Cards(per_call))
    }

    /// Return embeddings in reverse input order, as batch APIs may.
    pub fn shuffled_embeddings(mut self) -> Self {
        self.shuffle_embeddings = true;
        self
    }

    pub fn failing_embeddings(mut self) -> Self {
        self.fail_embeddings = true;
        self
    }

    /// Number of chat calls made.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// The last chat request received.
    pub fn last_request(&self) -> Option<ChatRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

/// A `{"cards": [...]}` batch with `count` cards unique to `call`.
pub fn card_batch(call: u32, count: usize) -> String {
    let cards: Vec<serde_json::Value> = (1..=count)
        .map(|i| {
            serde_json::json!({
                "pattern": format!("Question {call}.{i}?"),
                "match": format!("answer {call} {i} explains topic {}", call * 10 + i as u32),
            })
        })
        .collect();
    serde_json::json!({ "cards": cards }).to_string()
}

/// Deterministic bag-of-words embedding: each lowercase word is hashed
/// (FNV-1a) into one of [`MOCK_EMBEDDING_DIM`] buckets.
pub fn hashed_embedding(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; MOCK_EMBEDDING_DIM];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in word.to_lowercase().bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        v[(hash % MOCK_EMBEDDING_DIM as u64) as usize] += 1.0;
    }
    v
}

#[async_trait]
impl Generator for MockGenerator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<String, ProviderError> {
        let call = self.call_count.fetch_add(1, Ordering::Relaxed) + 1;
        *self.last_request.lock().unwrap() = Some(request.clone());

        match &self.script {
            ChatScript::Fixed(response) => Ok(response.clone()),
            ChatScript::Queue(queue) => queue.lock().unwrap().pop_front().unwrap_or_else(|| {
                Err(ProviderError::ApiError {
                    status: 500,
                    message: "mock has no responses left".into(),
                })
            }),
            ChatScript::Cards(per_call) => Ok(card_batch(call, *per_call)),
        }
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>, ProviderError> {
        if self.fail_embeddings {
            return Err(ProviderError::ApiError {
                status: 503,
                message: "mock embeddings unavailable".into(),
            });
        }
        let mut embeddings: Vec<Embedding> = texts
            .iter()
            .enumerate()
            .map(|(index, text)| Embedding {
                index,
                vector: hashed_embedding(text),
            })
            .collect();
        if self.shuffle_embeddings {
            embeddings.reverse();
        }
        Ok(embeddings)
    }
}

/// In-memory vector index. Optionally fails one upsert call (1-based).
#[derive(Default)]
pub struct InMemoryIndex {
    vectors: Mutex<HashMap<String, Vec<f32>>>,
    upsert_calls: AtomicU32,
    fail_upsert_on: Option<u32>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_upsert_on(call: u32) -> Self {
        Self {
            fail_upsert_on: Some(call),
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.vectors.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: &str) -> bool {
        self.vectors.lock().unwrap().contains_key(id)
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    fn name(&self) -> &str {
        "memory"
    }

    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize, StoreError> {
        let call = self.upsert_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_upsert_on == Some(call) {
            return Err(StoreError::Unavailable(format!(
                "mock upsert {call} rejected"
            )));
        }
        let count = records.len();
        let mut vectors = self.vectors.lock().unwrap();
        for record in records {
            vectors.insert(record.id, record.values);
        }
        Ok(count)
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
            dimension: vectors.values().next().map_or(0, |v| v.len() as u32),
        })
    }
}
