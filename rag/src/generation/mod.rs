//! Completion collaborator: trait, retry wrapper, and the chat adapter.
//!
//! The orchestrator never sees a raw generation error: once the retry budget
//! is spent it answers with [`GENERATION_FAILURE_APOLOGY`].

mod prompt;
mod provider;

pub use prompt::{
    CYPHER_SYSTEM_PROMPT, cypher_request, product_lookup_prompt, question_message, system_prompt,
};
pub use provider::{ChatCompletionProvider, ChatProviderKind, DEFAULT_AZURE_API_VERSION};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde::Serialize;

use crate::error::RagError;
use crate::types::{Role, Turn};

/// Answer used when no source produced any context.
pub const NO_CONTEXT_APOLOGY: &str = "I'm sorry, I couldn't find specific information about that. Please try asking another question about our products or services.";

/// Answer used when the completion collaborator keeps failing.
pub const GENERATION_FAILURE_APOLOGY: &str =
    "I apologize, but I'm having trouble processing your request. Please try again later.";

/// One message sent to a chat completion API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

impl From<&Turn> for ChatMessage {
    fn from(turn: &Turn) -> Self {
        Self {
            role: turn.role,
            content: turn.text.clone(),
        }
    }
}

/// Sampling parameters for a completion call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 500,
        }
    }
}

impl GenerationParams {
    /// Low-temperature settings for extraction tasks (product lookup, Cypher).
    pub fn precise() -> Self {
        Self {
            temperature: 0.1,
            max_tokens: 300,
        }
    }
}

/// A chat completion backend.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Short name used in logs and status output.
    fn name(&self) -> &str;

    /// Complete a conversation. An empty `system` prompt is not sent.
    async fn complete_with(
        &self,
        system: &str,
        messages: &[ChatMessage],
        params: GenerationParams,
    ) -> Result<String, RagError>;

    /// Complete a conversation with the default answering parameters.
    async fn complete(&self, system: &str, messages: &[ChatMessage]) -> Result<String, RagError> {
        self.complete_with(system, messages, GenerationParams::default())
            .await
    }

    /// Single-prompt completion used for product lookup and query generation.
    async fn complete_prompt(&self, prompt: &str) -> Result<String, RagError> {
        self.complete_with("", &[ChatMessage::user(prompt)], GenerationParams::precise())
            .await
    }
}

/// Attempt budget and randomized exponential backoff between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Same attempt budget, no waiting.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before retrying after the given (1-based) failed attempt:
    /// uniform between `min_delay` and `min(max_delay, 2^attempt s)`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exp = Duration::from_secs(1u64 << attempt.min(16));
        let upper = exp.min(self.max_delay);
        let lower = self.min_delay.min(upper);
        if upper <= lower {
            return lower;
        }
        let millis = rand::thread_rng().gen_range(lower.as_millis()..=upper.as_millis());
        Duration::from_millis(u64::try_from(millis).unwrap_or(u64::MAX))
    }
}

/// Wraps a provider with a fixed attempt budget.
///
/// Blank completions count as failures. Providers that are unavailable
/// (misconfigured) are not retried.
pub struct RetryingProvider {
    inner: Arc<dyn CompletionProvider>,
    policy: RetryPolicy,
}

impl RetryingProvider {
    pub fn new(inner: Arc<dyn CompletionProvider>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl CompletionProvider for RetryingProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete_with(
        &self,
        system: &str,
        messages: &[ChatMessage],
        params: GenerationParams,
    ) -> Result<String, RagError> {
        let attempts = self.policy.max_attempts.max(1);
        let mut last_err = None;

        for attempt in 1..=attempts {
            match self.inner.complete_with(system, messages, params).await {
                Ok(text) if !text.trim().is_empty() => return Ok(text.trim().to_string()),
                Ok(_) => {
                    last_err = Some(RagError::collaborator("completion", "empty completion"));
                }
                Err(e) if e.is_unavailable() => return Err(e),
                Err(e) => last_err = Some(e),
            }

            if attempt < attempts {
                let delay = self.policy.delay_after(attempt);
                log::warn!(
                    "{} attempt {}/{} failed, retrying in {:?}",
                    self.inner.name(),
                    attempt,
                    attempts,
                    delay
                );
                tokio::time::sleep(delay).await;
            }
        }

        Err(last_err.unwrap_or_else(|| RagError::collaborator("completion", "no attempts made")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Fails `failures` times, then answers.
    struct FlakyProvider {
        failures: Mutex<u32>,
        calls: Mutex<u32>,
        answer: String,
    }

    impl FlakyProvider {
        fn new(failures: u32, answer: &str) -> Self {
            Self {
                failures: Mutex::new(failures),
                calls: Mutex::new(0),
                answer: answer.to_string(),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl CompletionProvider for FlakyProvider {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn complete_with(
            &self,
            _system: &str,
            _messages: &[ChatMessage],
            _params: GenerationParams,
        ) -> Result<String, RagError> {
            *self.calls.lock().unwrap() += 1;
            let mut failures = self.failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(RagError::collaborator("completion", "503"));
            }
            Ok(self.answer.clone())
        }
    }

    struct Unconfigured;

    #[async_trait]
    impl CompletionProvider for Unconfigured {
        fn name(&self) -> &str {
            "unconfigured"
        }

        async fn complete_with(
            &self,
            _system: &str,
            _messages: &[ChatMessage],
            _params: GenerationParams,
        ) -> Result<String, RagError> {
            Err(RagError::CollaboratorUnavailable {
                collaborator: "completion",
                message: "no api key".into(),
            })
        }
    }

    #[tokio::test]
    async fn test_retry_recovers_after_failures() {
        let flaky = Arc::new(FlakyProvider::new(2, "  hello  "));
        let provider = RetryingProvider::new(flaky.clone(), RetryPolicy::immediate(3));
        let answer = provider.complete("", &[ChatMessage::user("hi")]).await.unwrap();
        assert_eq!(answer, "hello");
        assert_eq!(flaky.calls(), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_budget() {
        let flaky = Arc::new(FlakyProvider::new(10, "never"));
        let provider = RetryingProvider::new(flaky.clone(), RetryPolicy::immediate(3));
        assert!(provider.complete_prompt("hi").await.is_err());
        assert_eq!(flaky.calls(), 3);
    }

    #[tokio::test]
    async fn test_blank_completion_is_retried() {
        let flaky = Arc::new(FlakyProvider::new(0, "   "));
        let provider = RetryingProvider::new(flaky.clone(), RetryPolicy::immediate(2));
        assert!(provider.complete_prompt("hi").await.is_err());
        assert_eq!(flaky.calls(), 2);
    }

    #[tokio::test]
    async fn test_unavailable_is_not_retried() {
        let provider = RetryingProvider::new(Arc::new(Unconfigured), RetryPolicy::immediate(3));
        let err = provider.complete_prompt("hi").await.unwrap_err();
        assert!(err.is_unavailable());
    }

    #[test]
    fn test_backoff_within_bounds() {
        let policy = RetryPolicy::default();
        for attempt in 1..6 {
            let delay = policy.delay_after(attempt);
            assert!(delay >= policy.min_delay);
            assert!(delay <= Duration::from_secs(1 << attempt).min(policy.max_delay));
        }
        assert!(policy.delay_after(30) <= policy.max_delay);
        assert_eq!(RetryPolicy::immediate(3).delay_after(2), Duration::ZERO);
    }

    #[test]
    fn test_chat_message_from_turn() {
        let turn = Turn {
            index: 0,
            role: Role::Assistant,
            text: "KitKat is a wafer.".into(),
            timestamp: chrono::Utc::now(),
        };
        let msg = ChatMessage::from(&turn);
        assert_eq!(msg, ChatMessage::assistant("KitKat is a wafer."));
    }
}
