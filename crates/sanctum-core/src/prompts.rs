//! Fixed model instructions and the structured-output contract for card
//! generation.

use serde::{Deserialize, Serialize};

use crate::model::{CardDraft, Flashcard};
use crate::traits::ResponseSchema;

/// System instruction for every card generation request.
pub const FLASHCARD_SYSTEM_PROMPT: &str = r#"You are a study aid that writes flashcards as JSON. For the topic or deck you are given, produce question/answer pairs where "pattern" holds the question and "match" holds its answer.

Respond with a single JSON object of this exact shape and nothing else:
{ "cards": [ { "pattern": string, "match": string } ] }

Each card must have exactly the fields "pattern" and "match". Keep answers accurate and concise. Do not add commentary, markdown, or any text outside the JSON object.

Example:
{
  "cards": [
    { "pattern": "What is photosynthesis?", "match": "The process by which plants turn sunlight, water and CO2 into glucose and oxygen" },
    { "pattern": "In what year did World War II end?", "match": "1945" }
  ]
}"#;

/// System instruction for turning a short topic into a richer study prompt.
pub const PROMPT_SUGGESTION_SYSTEM_PROMPT: &str = r#"You improve study prompts so they produce better flashcards. Rewrite the user's topic as a more detailed, comprehensive version of itself.

Consider adding specific subtopics, relevant terminology, key context and related concepts, and a breakdown of complex areas into manageable parts, at a level of detail suited to flashcards.

Reply with ONLY the improved prompt. No explanations, labels, or metadata. It must be usable as a direct replacement for the original.

Example:
Input: "Ancient Rome"
Output: "Ancient Rome (753 BCE - 476 CE), including: political structure (Republic and Empire), key historical figures, major battles, social classes, cultural developments, architectural achievements, and the factors behind its rise and fall""#;

/// Name of the structured output schema sent with card requests.
pub const FLASHCARD_SCHEMA_NAME: &str = "flashcards";

/// User message for the seeding round.
pub fn seed_prompt(topic: &str) -> String {
    format!("Generate 2-3 flashcards about {topic}.")
}

/// User message for an expansion round, carrying the deck so far.
pub fn expansion_prompt(cards: &[Flashcard]) -> Result<String, serde_json::Error> {
    let context = CardBatch {
        cards: cards.iter().map(Flashcard::draft).collect(),
    };
    let deck_json = serde_json::to_string_pretty(&context)?;
    Ok(format!(
        "Here is my current deck of flashcards:\n\n{deck_json}\n\n\
         Please generate 2-3 additional flashcards that expand the knowledge covered by this deck. \
         Focus on related but new concepts and do not repeat any question already in the deck."
    ))
}

/// The JSON schema every card generation response must satisfy.
pub fn flashcard_schema() -> ResponseSchema {
    ResponseSchema {
        name: FLASHCARD_SCHEMA_NAME.to_string(),
        strict: true,
        schema: serde_json::json!({
            "type": "object",
            "properties": {
                "cards": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "pattern": { "type": "string" },
                            "match": { "type": "string" }
                        },
                        "required": ["pattern", "match"],
                        "additionalProperties": false
                    }
                }
            },
            "required": ["cards"],
            "additionalProperties": false
        }),
    }
}

/// Wire shape of a generation response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CardBatch {
    pub cards: Vec<CardDraft>,
}

/// Decode a model response into card drafts.
///
/// Anything that is not exactly `{"cards": [{"pattern", "match"}, ...]}` is
/// rejected.
pub fn parse_card_batch(content: &str) -> Result<Vec<CardDraft>, serde_json::Error> {
    let batch: CardBatch = serde_json::from_str(content.trim())?;
    Ok(batch.cards)
}
