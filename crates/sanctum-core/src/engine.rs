//! Deck expansion orchestrator.
//!
//! A run seeds a deck with a first batch of cards about a topic, then keeps
//! asking the generation model for a few more cards, with the whole deck so
//! far as context, until the target size is reached. Every batch is given
//! identities and written to the card store before the next round starts, and
//! each step is reported on an ordered event channel.

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, instrument, warn};

use crate::error::DeckError;
use crate::events::{percent_complete, DeckEvent};
use crate::model::{CardDraft, CardId, DeckRequest, Flashcard, FlashcardDeck};
use crate::prompts::{
    expansion_prompt, flashcard_schema, parse_card_batch, seed_prompt, FLASHCARD_SYSTEM_PROMPT,
};
use crate::store::{assign_identity, CardStore};
use crate::traits::{ChatMessage, ChatRequest, Generator};

/// Buffer size of the channel returned by [`DeckExpander::spawn`].
pub const EVENT_BUFFER: usize = 64;

/// Lifecycle of a run: `Idle -> Seeding -> Expanding -> Complete | Failed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeckPhase {
    #[default]
    Idle,
    Seeding,
    Expanding,
    Complete,
    Failed,
}

impl DeckPhase {
    /// Whether a run in this phase may move to `next`.
    ///
    /// Seeding may complete directly when the first batch already reaches
    /// the target. Any non-terminal phase may fail.
    pub fn can_advance_to(self, next: DeckPhase) -> bool {
        use DeckPhase::*;
        matches!(
            (self, next),
            (Idle, Seeding)
                | (Seeding, Expanding)
                | (Seeding | Expanding, Complete)
                | (Idle | Seeding | Expanding, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, DeckPhase::Complete | DeckPhase::Failed)
    }
}

impl fmt::Display for DeckPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeckPhase::Idle => write!(f, "idle"),
            DeckPhase::Seeding => write!(f, "seeding"),
            DeckPhase::Expanding => write!(f, "expanding"),
            DeckPhase::Complete => write!(f, "complete"),
            DeckPhase::Failed => write!(f, "failed"),
        }
    }
}

/// Configuration for the deck expander.
#[derive(Debug, Clone)]
pub struct DeckExpanderConfig {
    /// Chat model used for card generation.
    pub model: String,
    /// Number of cards at which a run completes.
    pub target_size: usize,
    /// Hard ceiling on generation rounds, seeding included.
    pub max_rounds: u32,
    /// Pause between rounds.
    pub round_delay: Duration,
    /// Sampling temperature.
    pub temperature: f64,
    /// Delete cards already written when a run fails or is cancelled.
    pub rollback_on_failure: bool,
}

impl Default for DeckExpanderConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            target_size: 20,
            max_rounds: 40,
            round_delay: Duration::from_millis(200),
            temperature: 0.7,
            rollback_on_failure: false,
        }
    }
}

/// Phase and store writes of one run.
#[derive(Default)]
struct RunLedger {
    phase: DeckPhase,
    /// Every id handed to the store, including a batch whose write failed.
    attempted: Vec<CardId>,
    /// Cards whose write succeeded.
    stored: usize,
}

impl RunLedger {
    fn advance(&mut self, next: DeckPhase) {
        debug_assert!(
            self.phase.can_advance_to(next),
            "invalid phase change {} -> {next}",
            self.phase
        );
        debug!(from = %self.phase, to = %next, "phase change");
        self.phase = next;
    }
}

/// A run started with [`DeckExpander::spawn`].
pub struct DeckRun {
    /// Ordered progress events. Ends after the terminal event.
    pub events: mpsc::Receiver<DeckEvent>,
    handle: JoinHandle<Result<FlashcardDeck, DeckError>>,
}

impl DeckRun {
    pub async fn recv(&mut self) -> Option<DeckEvent> {
        self.events.recv().await
    }

    /// Wait for the run to finish and return its outcome.
    pub async fn join(self) -> Result<Result<FlashcardDeck, DeckError>, JoinError> {
        self.handle.await
    }

    /// Close the event stream and wait until the run has stopped, including
    /// any rollback it performs.
    pub async fn cancel(self) -> Result<Result<FlashcardDeck, DeckError>, JoinError> {
        drop(self.events);
        self.handle.await
    }
}

/// Drives deck expansion runs. One expander can serve many concurrent runs.
pub struct DeckExpander {
    generator: Arc<dyn Generator>,
    store: Arc<CardStore>,
    config: DeckExpanderConfig,
}

impl DeckExpander {
    pub fn new(
        generator: Arc<dyn Generator>,
        store: Arc<CardStore>,
        config: DeckExpanderConfig,
    ) -> Self {
        Self {
            generator,
            store,
            config,
        }
    }

    /// Start a run on the tokio runtime.
    ///
    /// Dropping the run's event receiver cancels it at its next suspension
    /// point.
    pub fn spawn(self: Arc<Self>, request: impl Into<DeckRequest>) -> DeckRun {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let request = request.into();
        let handle = tokio::spawn(async move { self.run(&request.prompt, &tx).await });
        DeckRun { events: rx, handle }
    }

    /// Run one expansion to completion, reporting on `events`.
    ///
    /// On success the last event sent is `Complete`; on failure it is
    /// `Failed` and no deck is returned. A cancelled run sends nothing more.
    #[instrument(skip(self, events), fields(target = self.config.target_size))]
    pub async fn run(
        &self,
        topic: &str,
        events: &mpsc::Sender<DeckEvent>,
    ) -> Result<FlashcardDeck, DeckError> {
        let mut ledger = RunLedger::default();

        match self.expand(topic, events, &mut ledger).await {
            Ok(deck) => {
                ledger.advance(DeckPhase::Complete);
                info!(cards = deck.len(), "deck generation complete");
                let _ = events.send(DeckEvent::complete(deck.clone())).await;
                Ok(deck)
            }
            Err(err) => {
                warn!(phase = %ledger.phase, cards_stored = ledger.stored, "deck generation failed: {err}");
                ledger.advance(DeckPhase::Failed);
                if self.config.rollback_on_failure && !ledger.attempted.is_empty() {
                    self.rollback(&ledger.attempted).await;
                }
                if !matches!(err, DeckError::Cancelled) {
                    let _ = events
                        .send(DeckEvent::failed(&err, ledger.stored))
                        .await;
                }
                Err(err)
            }
        }
    }

    async fn expand(
        &self,
        topic: &str,
        events: &mpsc::Sender<DeckEvent>,
        ledger: &mut RunLedger,
    ) -> Result<FlashcardDeck, DeckError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(DeckError::InvalidInput("prompt cannot be empty".into()));
        }
        let target = self.config.target_size;
        if target == 0 {
            return Err(DeckError::InvalidInput(
                "target size must be at least 1".into(),
            ));
        }

        let mut deck = FlashcardDeck::new(topic);
        let mut round = 0u32;
        ledger.advance(DeckPhase::Seeding);

        emit(events, DeckEvent::status("Starting generation...", 0.0)).await?;

        while deck.len() < target {
            if round >= self.config.max_rounds {
                return Err(DeckError::RoundLimit {
                    rounds: round,
                    cards: deck.len(),
                    target,
                });
            }
            round += 1;
            let phase = ledger.phase;
            debug!(round, %phase, cards = deck.len(), "requesting cards");

            let prompt = match phase {
                DeckPhase::Seeding => seed_prompt(topic),
                _ => expansion_prompt(&deck.cards)
                    .map_err(|e| DeckError::Parse(format!("failed to encode deck: {e}")))?,
            };
            let drafts = guarded(events, self.request_cards(phase, prompt)).await??;

            let fresh = dedupe(&deck.cards, drafts);
            if fresh.is_empty() {
                return Err(DeckError::Stalled { round });
            }

            let cards: Vec<Flashcard> = fresh
                .into_iter()
                .map(|draft| Flashcard::from_draft(draft, assign_identity()))
                .collect();
            ledger.attempted.extend(cards.iter().map(|c| c.id));
            guarded(events, self.store.upsert_cards(&cards))
                .await?
                .map_err(DeckError::StoreWrite)?;
            ledger.stored += cards.len();

            deck.cards.extend(cards);
            let message = match phase {
                DeckPhase::Seeding => "Initial cards generated".to_string(),
                _ => format!("{} of {} cards generated", deck.len(), target),
            };
            emit(
                events,
                DeckEvent::status(message, percent_complete(deck.len(), target)),
            )
            .await?;
            if phase == DeckPhase::Seeding && deck.len() < target {
                ledger.advance(DeckPhase::Expanding);
            }

            if deck.len() < target && !self.config.round_delay.is_zero() {
                guarded(events, tokio::time::sleep(self.config.round_delay)).await?;
            }
        }

        Ok(deck)
    }

    async fn request_cards(
        &self,
        phase: DeckPhase,
        prompt: String,
    ) -> Result<Vec<CardDraft>, DeckError> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage::system(FLASHCARD_SYSTEM_PROMPT),
                ChatMessage::user(prompt),
            ],
            response_schema: Some(flashcard_schema()),
            temperature: self.config.temperature,
            max_tokens: None,
        };

        let content = self
            .generator
            .chat(&request)
            .await
            .map_err(|source| DeckError::Generation { phase, source })?;

        parse_card_batch(&content).map_err(|e| DeckError::Parse(e.to_string()))
    }

    async fn rollback(&self, ids: &[CardId]) {
        match self.store.remove_many(ids).await {
            Ok(()) => info!(count = ids.len(), "rolled back stored cards"),
            Err(e) => warn!(count = ids.len(), "rollback failed, cards left in store: {e}"),
        }
    }
}

/// Send an event, treating a closed channel as cancellation.
async fn emit(events: &mpsc::Sender<DeckEvent>, event: DeckEvent) -> Result<(), DeckError> {
    events.send(event).await.map_err(|_| DeckError::Cancelled)
}

/// Await `fut` unless the event receiver goes away first.
async fn guarded<F: Future>(
    events: &mpsc::Sender<DeckEvent>,
    fut: F,
) -> Result<F::Output, DeckError> {
    tokio::select! {
        output = fut => Ok(output),
        _ = events.closed() => Err(DeckError::Cancelled),
    }
}

/// Questions compare equal ignoring case and runs of whitespace.
fn normalize(pattern: &str) -> String {
    pattern
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Drop blank drafts and drafts whose question is already in the deck or
/// earlier in the same batch.
fn dedupe(existing: &[Flashcard], drafts: Vec<CardDraft>) -> Vec<CardDraft> {
    let mut seen: HashSet<String> = existing.iter().map(|c| normalize(&c.pattern)).collect();
    drafts
        .into_iter()
        .filter(|d| !d.pattern.trim().is_empty() && !d.answer.trim().is_empty())
        .filter(|d| seen.insert(normalize(&d.pattern)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ProviderError, StoreError};
    use crate::testing::{FakeGenerator, FakeIndex};

    fn batch(cards: &[(&str, &str)]) -> Result<String, ProviderError> {
        let cards: Vec<serde_json::Value> = cards
            .iter()
            .map(|(p, m)| serde_json::json!({"pattern": p, "match": m}))
            .collect();
        Ok(serde_json::json!({ "cards": cards }).to_string())
    }

    fn config(target_size: usize) -> DeckExpanderConfig {
        DeckExpanderConfig {
            target_size,
            round_delay: Duration::ZERO,
            ..Default::default()
        }
    }

    fn expander(
        generator: Arc<FakeGenerator>,
        index: Arc<FakeIndex>,
        config: DeckExpanderConfig,
    ) -> DeckExpander {
        let store = Arc::new(CardStore::new(generator.clone(), index));
        DeckExpander::new(generator, store, config)
    }

    async fn collect(rx: &mut mpsc::Receiver<DeckEvent>) -> Vec<DeckEvent> {
        let mut out = Vec::new();
        while let Some(event) = rx.recv().await {
            out.push(event);
        }
        out
    }

    #[tokio::test]
    async fn seeds_then_expands_to_target() {
        let generator = Arc::new(FakeGenerator::with_responses(vec![
            batch(&[("q1", "alpha"), ("q2", "beta")]),
            batch(&[("q3", "gamma"), ("q4", "delta")]),
        ]));
        let index = Arc::new(FakeIndex::default());
        let expander = expander(generator.clone(), index.clone(), config(3));

        let (tx, mut rx) = mpsc::channel(EVENT_BUFFER);
        let deck = expander.run("Greek letters", &tx).await.unwrap();
        drop(tx);
        let events = collect(&mut rx).await;

        assert_eq!(deck.len(), 4);
        assert_eq!(deck.title, "Greek letters");
        assert_eq!(generator.requests.lock().unwrap().len(), 2);
        assert_eq!(index.vectors.lock().unwrap().len(), 4);

        let progress: Vec<f64> = events.iter().filter_map(DeckEvent::progress).collect();
        assert!(progress.windows(2).all(|w| w[0] <= w[1]), "{progress:?}");
        assert_eq!(progress.last(), Some(&100.0));
        assert!(matches!(events.last(), Some(DeckEvent::Complete { .. })));
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    }

    #[tokio::test]
    async fn second_round_sees_the_deck() {
        let generator = Arc::new(FakeGenerator::with_responses(vec![
            batch(&[("What is ownership?", "A rule set")]),
            batch(&[("What is borrowing?", "Taking a reference")]),
        ]));
        let expander = expander(generator.clone(), Arc::new(FakeIndex::default()), config(2));

        let (tx, _rx) = mpsc::channel(EVENT_BUFFER);
        expander.run("Rust", &tx).await.unwrap();

        let requests = generator.requests.lock().unwrap();
        assert!(requests[0].messages[1].content.contains("about Rust"));
        assert!(requests[1].messages[1].content.contains("What is ownership?"));
        assert!(requests.iter().all(|r| r.response_schema.is_some()));
    }

    #[tokio::test]
    async fn empty_topic_is_rejected_without_calls() {
        let generator = Arc::new(FakeGenerator::default());
        let expander = expander(generator.clone(), Arc::new(FakeIndex::default()), config(3));

        let (tx, mut rx) = mpsc::channel(EVENT_BUFFER);
        let err = expander.run("   ", &tx).await.unwrap_err();
        drop(tx);

        assert!(matches!(err, DeckError::InvalidInput(_)));
        assert!(generator.requests.lock().unwrap().is_empty());
        let events = collect(&mut rx).await;
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], DeckEvent::Failed { .. }));
    }

    #[tokio::test]
    async fn unparseable_seed_fails() {
        let generator = Arc::new(FakeGenerator::with_responses(vec![Ok(
            "Here are some cards!".to_string()
        )]));
        let index = Arc::new(FakeIndex::default());
        let expander = expander(generator, index.clone(), config(3));

        let (tx, _rx) = mpsc::channel(EVENT_BUFFER);
        let err = expander.run("Chemistry", &tx).await.unwrap_err();
        assert!(matches!(err, DeckError::Parse(_)));
        assert!(index.vectors.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn store_failure_on_second_round_discards_deck() {
        let generator = Arc::new(FakeGenerator::with_responses(vec![
            batch(&[("q1", "alpha"), ("q2", "beta")]),
            batch(&[("q3", "gamma"), ("q4", "delta")]),
        ]));
        let index = Arc::new(FakeIndex::failing_upsert_on(2));
        let expander = expander(generator, index, config(4));

        let (tx, mut rx) = mpsc::channel(EVENT_BUFFER);
        let err = expander.run("Greek letters", &tx).await.unwrap_err();
        drop(tx);
        let events = collect(&mut rx).await;

        assert!(matches!(
            err,
            DeckError::StoreWrite(StoreError::Unavailable(_))
        ));
        assert!(!events
            .iter()
            .any(|e| matches!(e, DeckEvent::Complete { .. })));
        match events.last() {
            Some(DeckEvent::Failed { cards_stored, kind, .. }) => {
                assert_eq!(*cards_stored, 2);
                assert_eq!(kind, "store_write_error");
            }
            other => panic!("expected failure event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rollback_removes_stored_cards() {
        let generator = Arc::new(FakeGenerator::with_responses(vec![
            batch(&[("q1", "alpha"), ("q2", "beta")]),
            Err(ProviderError::Timeout(30)),
        ]));
        let index = Arc::new(FakeIndex::default());
        let expander = expander(
            generator,
            index.clone(),
            DeckExpanderConfig {
                rollback_on_failure: true,
                ..config(5)
            },
        );

        let (tx, _rx) = mpsc::channel(EVENT_BUFFER);
        let err = expander.run("Greek letters", &tx).await.unwrap_err();
        assert!(matches!(
            err,
            DeckError::Generation {
                phase: DeckPhase::Expanding,
                ..
            }
        ));
        assert!(index.vectors.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_only_round_stalls() {
        let generator = Arc::new(FakeGenerator::with_responses(vec![
            batch(&[("What is H2O?", "Water")]),
            batch(&[("what is  h2o?", "Water again")]),
        ]));
        let expander = expander(generator, Arc::new(FakeIndex::default()), config(5));

        let (tx, _rx) = mpsc::channel(EVENT_BUFFER);
        let err = expander.run("Chemistry", &tx).await.unwrap_err();
        assert!(matches!(err, DeckError::Stalled { round: 2 }));
    }

    #[tokio::test]
    async fn round_ceiling_stops_slow_growth() {
        let generator = Arc::new(FakeGenerator::with_responses(vec![
            batch(&[("q1", "a")]),
            batch(&[("q2", "b")]),
            batch(&[("q3", "c")]),
        ]));
        let expander = expander(
            generator,
            Arc::new(FakeIndex::default()),
            DeckExpanderConfig {
                max_rounds: 2,
                ..config(10)
            },
        );

        let (tx, _rx) = mpsc::channel(EVENT_BUFFER);
        let err = expander.run("Letters", &tx).await.unwrap_err();
        assert!(matches!(
            err,
            DeckError::RoundLimit {
                rounds: 2,
                cards: 2,
                target: 10
            }
        ));
    }

    #[tokio::test]
    async fn dropped_receiver_cancels_run() {
        let generator = Arc::new(FakeGenerator::with_responses(vec![
            batch(&[("q1", "a"), ("q2", "b")]),
            batch(&[("q3", "c"), ("q4", "d")]),
        ]));
        let expander = expander(generator.clone(), Arc::new(FakeIndex::default()), config(20));

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        drop(rx);
        let err = expander.run("Letters", &tx).await.unwrap_err();
        assert!(matches!(err, DeckError::Cancelled));
        assert!(generator.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn spawned_run_streams_to_completion() {
        let generator = Arc::new(FakeGenerator::with_responses(vec![batch(&[
            ("q1", "a"),
            ("q2", "b"),
        ])]));
        let expander = Arc::new(expander(generator, Arc::new(FakeIndex::default()), config(2)));

        let mut run = expander.spawn("Letters");
        let events = collect(&mut run.events).await;
        match events.last() {
            Some(DeckEvent::Complete { deck, progress, .. }) => {
                assert_eq!(deck.len(), 2);
                assert_eq!(*progress, 100.0);
            }
            other => panic!("expected completion, got {other:?}"),
        }
        assert_eq!(run.join().await.unwrap().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn cancelled_run_rolls_back_before_returning() {
        let generator = Arc::new(FakeGenerator::with_responses(vec![
            batch(&[("q1", "alpha"), ("q2", "beta")]),
            batch(&[("q3", "gamma"), ("q4", "delta")]),
        ]));
        let index = Arc::new(FakeIndex::default());
        let expander = Arc::new(expander(
            generator,
            index.clone(),
            DeckExpanderConfig {
                rollback_on_failure: true,
                round_delay: Duration::from_secs(3600),
                ..config(10)
            },
        ));

        let mut run = expander.spawn("Greek letters");
        loop {
            match run.recv().await {
                Some(DeckEvent::Status { message, .. }) if message == "Initial cards generated" => {
                    break
                }
                Some(_) => {}
                None => panic!("run ended before the first batch was stored"),
            }
        }
        assert_eq!(index.vectors.lock().unwrap().len(), 2);

        let outcome = run.cancel().await.unwrap();
        assert!(matches!(outcome, Err(DeckError::Cancelled)));
        assert!(index.vectors.lock().unwrap().is_empty());
    }

    #[test]
    fn phase_transitions() {
        use DeckPhase::*;
        assert_eq!(DeckPhase::default(), Idle);
        assert!(Idle.can_advance_to(Seeding));
        assert!(Seeding.can_advance_to(Expanding));
        assert!(Seeding.can_advance_to(Complete));
        assert!(Expanding.can_advance_to(Complete));
        assert!(Idle.can_advance_to(Failed));
        assert!(Expanding.can_advance_to(Failed));

        assert!(!Idle.can_advance_to(Expanding));
        assert!(!Idle.can_advance_to(Complete));
        assert!(!Expanding.can_advance_to(Seeding));
        assert!(!Complete.can_advance_to(Failed));
        assert!(!Failed.can_advance_to(Seeding));
        assert!(Complete.is_terminal() && Failed.is_terminal());
        assert!(!Expanding.is_terminal());
    }

    #[test]
    fn dedupe_drops_blank_and_repeated() {
        let existing = vec![Flashcard::new("What is Rust?", "A language", CardId::generate())];
        let draft = |p: &str, a: &str| CardDraft {
            pattern: p.into(),
            answer: a.into(),
        };
        let kept = dedupe(
            &existing,
            vec![
                draft("WHAT is   rust?", "dup"),
                draft("", "blank question"),
                draft("What is Cargo?", " "),
                draft("What is Cargo?", "The build tool"),
                draft("what is cargo?", "dup in batch"),
            ],
        );
        assert_eq!(kept, vec![draft("What is Cargo?", "The build tool")]);
    }
}
