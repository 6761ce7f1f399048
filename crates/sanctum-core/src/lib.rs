//! sanctum-core: Deck expansion, semantic grading, and the card store adapter.
//!
//! This crate defines the flashcard data model, the capability traits for the
//! generation model and the vector index, and the two orchestrators built on
//! them: the iterative deck expander and the embedding-similarity grader.

pub mod engine;
pub mod error;
pub mod events;
pub mod grade;
pub mod grader;
pub mod model;
pub mod prompts;
pub mod similarity;
pub mod store;
pub mod suggest;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

pub use engine::{DeckExpander, DeckExpanderConfig, DeckPhase};
pub use error::{DeckError, GradeError, ProviderError, SimilarityError, StoreError, SuggestError};
pub use events::DeckEvent;
pub use grade::{classify, LetterGrade};
pub use grader::{Grader, GraderConfig};
pub use model::{CardId, Flashcard, FlashcardDeck, GradeResult};
pub use similarity::similarity;
pub use store::{assign_identity, CardStore};
