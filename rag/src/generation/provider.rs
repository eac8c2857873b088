//! OpenAI-compatible and Azure OpenAI chat completion adapter.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{ChatMessage, CompletionProvider, GenerationParams};
use crate::error::RagError;
use crate::text::is_resource_name;

const COLLABORATOR: &str = "completion";

/// Default Azure OpenAI REST API version.
pub const DEFAULT_AZURE_API_VERSION: &str = "2023-05-15";

/// Which wire flavour the endpoint speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatProviderKind {
    /// `POST {endpoint}/chat/completions` with a bearer token
    OpenAi,
    /// `POST {endpoint}/openai/deployments/{model}/chat/completions` with an `api-key` header
    Azure,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    n: u32,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Chat completion client for OpenAI-style APIs.
pub struct ChatCompletionProvider {
    client: reqwest::Client,
    kind: ChatProviderKind,
    endpoint: String,
    /// Model name, or deployment name for Azure
    model: String,
    api_key: String,
    api_version: String,
}

impl ChatCompletionProvider {
    /// Create a client. A missing API key makes the collaborator unavailable.
    pub fn new(
        kind: ChatProviderKind,
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        api_version: Option<String>,
    ) -> Result<Self, RagError> {
        let model = model.into();
        let api_key = api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| RagError::CollaboratorUnavailable {
                collaborator: COLLABORATOR,
                message: "no API key configured".to_string(),
            })?;
        if kind == ChatProviderKind::Azure && !is_resource_name(&model) {
            return Err(RagError::InvalidInput(format!(
                "invalid deployment name: {model:?}"
            )));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            kind,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model,
            api_key,
            api_version: api_version.unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.to_string()),
        })
    }

    fn url(&self) -> String {
        match self.kind {
            ChatProviderKind::OpenAi => format!("{}/chat/completions", self.endpoint),
            ChatProviderKind::Azure => format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                self.endpoint, self.model, self.api_version
            ),
        }
    }

    fn build_request<'a>(
        &'a self,
        system: &'a str,
        messages: &'a [ChatMessage],
        params: GenerationParams,
    ) -> ChatRequest<'a> {
        let mut wire = Vec::with_capacity(messages.len() + 1);
        if !system.trim().is_empty() {
            wire.push(WireMessage {
                role: "system",
                content: system,
            });
        }
        wire.extend(messages.iter().map(|m| WireMessage {
            role: m.role.as_str(),
            content: &m.content,
        }));

        ChatRequest {
            // Azure routes by deployment in the URL.
            model: match self.kind {
                ChatProviderKind::OpenAi => Some(self.model.as_str()),
                ChatProviderKind::Azure => None,
            },
            messages: wire,
            temperature: params.temperature,
            max_tokens: params.max_tokens,
            n: 1,
        }
    }
}

#[async_trait]
impl CompletionProvider for ChatCompletionProvider {
    fn name(&self) -> &str {
        match self.kind {
            ChatProviderKind::OpenAi => "openai",
            ChatProviderKind::Azure => "azure-openai",
        }
    }

    async fn complete_with(
        &self,
        system: &str,
        messages: &[ChatMessage],
        params: GenerationParams,
    ) -> Result<String, RagError> {
        let request = self.build_request(system, messages, params);
        let builder = self.client.post(self.url()).json(&request);
        let builder = match self.kind {
            ChatProviderKind::OpenAi => builder.bearer_auth(&self.api_key),
            ChatProviderKind::Azure => builder.header("api-key", &self.api_key),
        };

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(RagError::collaborator(
                COLLABORATOR,
                format!("API error {status}: {message}"),
            ));
        }

        let parsed: ChatResponse = serde_json::from_str(&body)?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .ok_or_else(|| {
                RagError::collaborator(
                    COLLABORATOR,
                    format!("no content from model '{}'", self.model),
                )
            })
    }
}
