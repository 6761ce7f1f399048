//! Prompt suggestion: expand a short study topic into a richer one before
//! generating a deck from it.

use tracing::instrument;

use crate::error::SuggestError;
use crate::prompts::PROMPT_SUGGESTION_SYSTEM_PROMPT;
use crate::traits::{ChatMessage, ChatRequest, Generator};

/// Ask the model for an enhanced version of `prompt`.
#[instrument(skip(generator, prompt), fields(provider = generator.name()))]
pub async fn suggest_prompt(
    generator: &dyn Generator,
    model: &str,
    prompt: &str,
) -> Result<String, SuggestError> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(SuggestError::InvalidInput("prompt cannot be empty".into()));
    }

    let request = ChatRequest {
        model: model.to_string(),
        messages: vec![
            ChatMessage::system(PROMPT_SUGGESTION_SYSTEM_PROMPT),
            ChatMessage::user(prompt),
        ],
        response_schema: None,
        temperature: 0.7,
        max_tokens: None,
    };

    let enhanced = generator.chat(&request).await?;
    let enhanced = enhanced.trim().trim_matches('"').trim();
    if enhanced.is_empty() {
        return Err(SuggestError::EmptyResponse);
    }
    Ok(enhanced.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::testing::FakeGenerator;

    #[tokio::test]
    async fn returns_trimmed_suggestion() {
        let generator = FakeGenerator::with_responses(vec![Ok(
            "  \"Ancient Rome, including the Republic and the Empire\"\n".to_string(),
        )]);
        let enhanced = suggest_prompt(&generator, "gpt-4o", "Ancient Rome")
            .await
            .unwrap();
        assert_eq!(enhanced, "Ancient Rome, including the Republic and the Empire");

        let requests = generator.requests.lock().unwrap();
        assert!(requests[0].response_schema.is_none());
        assert_eq!(requests[0].messages[1].content, "Ancient Rome");
    }

    #[tokio::test]
    async fn empty_prompt_is_rejected() {
        let generator = FakeGenerator::default();
        let err = suggest_prompt(&generator, "gpt-4o", "").await.unwrap_err();
        assert!(matches!(err, SuggestError::InvalidInput(_)));
        assert!(generator.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn provider_failure_propagates() {
        let generator =
            FakeGenerator::with_responses(vec![Err(ProviderError::AuthenticationFailed(
                "bad key".into(),
            ))]);
        let err = suggest_prompt(&generator, "gpt-4o", "Biology")
            .await
            .unwrap_err();
        assert!(matches!(err, SuggestError::Generation(_)));
    }

    #[tokio::test]
    async fn blank_reply_is_an_error() {
        let generator = FakeGenerator::with_responses(vec![Ok("  \n".to_string())]);
        let err = suggest_prompt(&generator, "gpt-4o", "Biology")
            .await
            .unwrap_err();
        assert!(matches!(err, SuggestError::EmptyResponse));
    }
}
