//! OpenAI-compatible chat and embeddings client.

use std::time::Instant;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use sanctum_core::traits::{ChatMessage, ChatRequest, Embedding, Generator, ResponseSchema};

use crate::error::{check_provider_status, provider_transport_error, ProviderError};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// OpenAI-compatible API provider.
pub struct OpenAiProvider {
    api_key: String,
    base_url: String,
    org_id: Option<String>,
    embedding_model: String,
    client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(
        api_key: &str,
        base_url: Option<String>,
        org_id: Option<String>,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ProviderError::NetworkError(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_key: api_key.trim().to_string(),
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            org_id,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            client,
        })
    }

    /// Use a different embedding model. Stored vectors are only comparable
    /// with vectors from the same model.
    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    async fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::MissingCredentials("openai".into()));
        }

        let mut req = self
            .client
            .post(format!("{}{path}", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json");

        if let Some(org) = &self.org_id {
            req = req.header("OpenAI-Organization", org);
        }

        let response = req
            .json(body)
            .send()
            .await
            .map_err(|e| provider_transport_error(e, DEFAULT_TIMEOUT_SECS))?;
        let response = check_provider_status(response).await?;

        response
            .json::<R>()
            .await
            .map_err(|e| ProviderError::MalformedResponse(format!("failed to parse response: {e}")))
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat<'a>>,
}

#[derive(Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    json_schema: &'a ResponseSchema,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl Generator for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn chat(&self, request: &ChatRequest) -> Result<String, ProviderError> {
        let start = Instant::now();
        let body = ChatCompletionRequest {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: request.response_schema.as_ref().map(|schema| ResponseFormat {
                kind: "json_schema",
                json_schema: schema,
            }),
        };

        let response: ChatCompletionResponse = self.post("/v1/chat/completions", &body).await?;

        if let Some(usage) = &response.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                latency_ms = start.elapsed().as_millis() as u64,
                "chat completion finished"
            );
        }

        let message = response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| ProviderError::MalformedResponse("no response choices returned".into()))?;

        match (message.content, message.refusal) {
            (Some(content), _) => Ok(content),
            (None, Some(refusal)) => Err(ProviderError::MalformedResponse(format!(
                "model refused: {refusal}"
            ))),
            (None, None) => Err(ProviderError::MalformedResponse(
                "response choice has no content".into(),
            )),
        }
    }

    #[instrument(skip(self, texts), fields(count = texts.len(), model = %self.embedding_model))]
    async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let body = EmbeddingRequest {
            model: &self.embedding_model,
            input: texts,
        };

        let response: EmbeddingResponse = self.post("/v1/embeddings", &body).await?;

        Ok(response
            .data
            .into_iter()
            .map(|d| Embedding {
                index: d.index,
                vector: d.embedding,
            })
            .collect())
    }
}
