use crate::answer::{build_prompt, Answerer};
use crate::embeddings::Embedder;
use crate::error::SearchError;
use crate::models::RetrievalResult;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";
pub const DEFAULT_LLM_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";
pub const DEFAULT_GEMINI_EMBEDDING_DIMENSIONS: usize = 768;
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

const BACKEND: &str = "gemini";

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Shared HTTP plumbing for the Generative Language API.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: Url,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, SearchError> {
        let mut base = config.base_url;
        if !base.ends_with('/') {
            base.push('/');
        }

        Ok(Self {
            client: Client::builder().timeout(config.timeout).build()?,
            api_key: config.api_key,
            base_url: Url::parse(&base)?,
        })
    }

    fn model_url(&self, model: &str, method: &str) -> Result<Url, SearchError> {
        let model = model.trim_start_matches("models/");
        Ok(self.base_url.join(&format!("models/{model}:{method}"))?)
    }

    async fn post<B, R>(&self, url: Url, body: &B) -> Result<R, SearchError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned + Send,
    {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let details = response.text().await.unwrap_or_default();
            return Err(SearchError::BackendResponse {
                backend: BACKEND.to_string(),
                details: format!("{status}: {}", details.trim()),
            });
        }

        Ok(response.json().await?)
    }
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Content {
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Part {
    text: Option<String>,
}

impl Content {
    fn text(role: Option<&str>, text: &str) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![Part {
                text: Some(text.to_string()),
            }],
        }
    }
}

#[skip_serializing_none]
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest {
    model: String,
    content: Content,
    output_dimensionality: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    fn into_text(self) -> Result<String, SearchError> {
        let Some(candidate) = self.candidates.into_iter().next() else {
            let details = match self.prompt_feedback.and_then(|feedback| feedback.block_reason) {
                Some(reason) => format!("prompt blocked: {reason}"),
                None => "response had no candidates".to_string(),
            };
            return Err(SearchError::BackendResponse {
                backend: BACKEND.to_string(),
                details,
            });
        };

        debug!(finish_reason = ?candidate.finish_reason, "gemini candidate");

        Ok(candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<String>()
            })
            .unwrap_or_default())
    }
}

pub struct GeminiEmbedder {
    client: GeminiClient,
    model: String,
    dimensions: usize,
}

impl GeminiEmbedder {
    pub fn new(client: GeminiClient, model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            client,
            model: model.into(),
            dimensions,
        }
    }

    fn request(&self, text: &str) -> EmbedContentRequest {
        EmbedContentRequest {
            model: format!("models/{}", self.model.trim_start_matches("models/")),
            content: Content::text(None, text),
            output_dimensionality: Some(self.dimensions),
        }
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, SearchError> {
        let url = self.client.model_url(&self.model, "embedContent")?;
        let response: EmbedContentResponse = self.client.post(url, &self.request(text)).await?;
        let values = response.embedding.values;

        if values.len() != self.dimensions {
            return Err(SearchError::DimensionMismatch {
                expected: self.dimensions,
                actual: values.len(),
            });
        }

        Ok(values)
    }
}

pub struct GeminiAnswerer {
    client: GeminiClient,
    model: String,
    temperature: f32,
}

impl GeminiAnswerer {
    pub fn new(client: GeminiClient, model: impl Into<String>, temperature: f32) -> Self {
        Self {
            client,
            model: model.into(),
            temperature,
        }
    }

    fn request(&self, query: &str, context: &RetrievalResult) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content::text(Some("user"), &build_prompt(query, context))],
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        }
    }
}

#[async_trait]
impl Answerer for GeminiAnswerer {
    async fn answer(&self, query: &str, context: &RetrievalResult) -> Result<String, SearchError> {
        let url = self.client.model_url(&self.model, "generateContent")?;
        let response: GenerateContentResponse =
            self.client.post(url, &self.request(query, context)).await?;
        response.into_text()
    }
}
