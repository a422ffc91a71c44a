use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::services::circuit_breaker::CircuitBreaker;

/// System prompt steering the model toward bare, paste-ready React output.
const SYSTEM_PROMPT: &str = "You are an expert React and Tailwind CSS developer. \
Generate clean, production-ready React components. \
Use functional components with hooks and Tailwind CSS for all styling. \
Return ONLY the component source code with no markdown code blocks, \
no TypeScript types, and no external dependencies beyond React itself.";

/// Parsed result of a successful generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedComponent {
    pub code: String,
    pub explanation: String,
}

/// Transport-level failure from the completion backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("upstream API key not configured")]
    NotConfigured,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream returned status {code}")]
    Status { code: u16 },

    #[error("malformed upstream response: {0}")]
    Malformed(String),
}

impl BackendError {
    /// Transient failures are worth retrying; the rest fail the attempt
    /// outright.
    pub fn is_transient(&self) -> bool {
        match self {
            BackendError::Http(_) => true,
            BackendError::Status { code } => *code == 429 || *code >= 500,
            BackendError::NotConfigured | BackendError::Malformed(_) => false,
        }
    }
}

/// Failure modes surfaced by [`LlmClient::generate`].
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("generation service temporarily unavailable (circuit open)")]
    CircuitOpen,

    #[error("upstream call timed out after {0:?}")]
    Timeout(Duration),

    #[error("upstream call failed: {0}")]
    Upstream(String),
}

/// Raw chat-completion transport, kept behind a trait so tests can script
/// upstream behavior without a network.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_prompt: &str)
        -> Result<String, BackendError>;
}

/// OpenAI-style chat-completion backend.
pub struct OpenAiBackend {
    http: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

impl OpenAiBackend {
    pub fn new(api_key: Option<String>, model: String) -> Self {
        Self {
            http: Client::new(),
            api_key,
            model,
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, BackendError> {
        let api_key = self.api_key.as_deref().ok_or(BackendError::NotConfigured)?;

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: 0.7,
            max_tokens: 2000,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status {
                code: status.as_u16(),
            });
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| BackendError::Malformed("no choices in completion".to_string()))?;

        Ok(content)
    }
}

/// Fault-tolerant LLM client: circuit-breaker gating, bounded per-attempt
/// timeout, and bounded retry with exponential backoff for transient
/// upstream failures.
pub struct LlmClient {
    backend: Arc<dyn CompletionBackend>,
    breaker: Arc<CircuitBreaker>,
    timeout: Duration,
    max_attempts: u32,
    backoff_base: Duration,
}

impl LlmClient {
    pub fn new(
        backend: Arc<dyn CompletionBackend>,
        breaker: Arc<CircuitBreaker>,
        timeout: Duration,
        max_attempts: u32,
        backoff_base: Duration,
    ) -> Self {
        Self {
            backend,
            breaker,
            timeout,
            max_attempts: max_attempts.max(1),
            backoff_base,
        }
    }

    /// Generate a UI component for `prompt`.
    ///
    /// Each attempt asks the circuit breaker for permission first; a denied
    /// attempt fails immediately without touching the backend. Timeouts and
    /// 5xx-equivalent upstream failures are retried up to the configured
    /// attempt budget; unusable output is an upstream error and is not
    /// retried.
    pub async fn generate(&self, prompt: &str) -> Result<GeneratedComponent, LlmError> {
        let user_prompt = format!("Create a React component with Tailwind CSS for: {prompt}");

        for attempt in 1..=self.max_attempts {
            if !self.breaker.try_acquire() {
                return Err(LlmError::CircuitOpen);
            }

            let outcome = tokio::time::timeout(
                self.timeout,
                self.backend.complete(SYSTEM_PROMPT, &user_prompt),
            )
            .await;

            match outcome {
                Ok(Ok(raw)) => match parse_completion(&raw, prompt) {
                    Ok(generated) => {
                        self.breaker.record_success();
                        return Ok(generated);
                    }
                    Err(reason) => {
                        // The call "succeeded" but produced nothing usable;
                        // that still counts against the upstream.
                        self.breaker.record_failure();
                        return Err(LlmError::Upstream(reason));
                    }
                },
                Ok(Err(err)) => {
                    self.breaker.record_failure();
                    if err.is_transient() && attempt < self.max_attempts {
                        tracing::warn!(attempt, error = %err, "upstream call failed, retrying");
                        tokio::time::sleep(self.backoff(attempt)).await;
                        continue;
                    }
                    return Err(LlmError::Upstream(err.to_string()));
                }
                Err(_) => {
                    self.breaker.record_failure();
                    if attempt < self.max_attempts {
                        tracing::warn!(attempt, timeout = ?self.timeout, "upstream call timed out, retrying");
                        tokio::time::sleep(self.backoff(attempt)).await;
                        continue;
                    }
                    return Err(LlmError::Timeout(self.timeout));
                }
            }
        }

        unreachable!("attempt loop always returns")
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_base * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// Extract a component definition from raw model output.
///
/// Tolerates markdown fences around the source; anything that does not
/// contain a recognizable component definition is rejected.
fn parse_completion(raw: &str, prompt: &str) -> Result<GeneratedComponent, String> {
    let trimmed = raw.trim();

    let code = if trimmed.starts_with("```") {
        let mut lines: Vec<&str> = trimmed.lines().collect();
        lines.remove(0);
        if lines.last().is_some_and(|l| l.trim() == "```") {
            lines.pop();
        }
        lines.join("\n")
    } else {
        trimmed.to_string()
    };

    let code = code.trim().to_string();
    if code.is_empty() {
        return Err("upstream returned an empty completion".to_string());
    }

    let has_definition = ["function ", "const ", "class ", "export default"]
        .iter()
        .any(|marker| code.contains(marker));
    if !has_definition {
        return Err("no component definition found in upstream output".to_string());
    }

    Ok(GeneratedComponent {
        code,
        explanation: format!("Generated React component based on: {prompt}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const COMPONENT: &str = "function PricingCard() { return <div>Card</div>; }";

    /// Backend that replays a script of responses and counts invocations.
    struct ScriptedBackend {
        script: Mutex<VecDeque<Result<String, BackendError>>>,
        calls: AtomicUsize,
        delay: Option<Duration>,
    }

    impl ScriptedBackend {
        fn new(script: Vec<Result<String, BackendError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: AtomicUsize::new(0),
                delay: None,
            }
        }

        fn slow(script: Vec<Result<String, BackendError>>, delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Self::new(script)
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CompletionBackend for ScriptedBackend {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(BackendError::Status { code: 500 }))
        }
    }

    fn client(backend: Arc<ScriptedBackend>, breaker: Arc<CircuitBreaker>) -> LlmClient {
        LlmClient::new(
            backend,
            breaker,
            Duration::from_millis(100),
            3,
            Duration::from_millis(1),
        )
    }

    fn fresh_breaker() -> Arc<CircuitBreaker> {
        Arc::new(CircuitBreaker::new(5, Duration::from_secs(60)))
    }

    #[tokio::test]
    async fn returns_parsed_component_on_success() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok(COMPONENT.to_string())]));
        let llm = client(backend.clone(), fresh_breaker());

        let generated = llm.generate("a pricing card").await.unwrap();
        assert_eq!(generated.code, COMPONENT);
        assert!(generated.explanation.contains("a pricing card"));
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn strips_markdown_fences() {
        let fenced = format!("```jsx\n{COMPONENT}\n```");
        let backend = Arc::new(ScriptedBackend::new(vec![Ok(fenced)]));
        let llm = client(backend, fresh_breaker());

        let generated = llm.generate("a card").await.unwrap();
        assert_eq!(generated.code, COMPONENT);
    }

    #[tokio::test]
    async fn retries_transient_failures_then_succeeds() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Err(BackendError::Status { code: 503 }),
            Err(BackendError::Status { code: 500 }),
            Ok(COMPONENT.to_string()),
        ]));
        let llm = client(backend.clone(), fresh_breaker());

        let generated = llm.generate("a card").await.unwrap();
        assert_eq!(generated.code, COMPONENT);
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_surface_upstream_error() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Err(BackendError::Status { code: 500 }),
            Err(BackendError::Status { code: 500 }),
            Err(BackendError::Status { code: 500 }),
        ]));
        let llm = client(backend.clone(), fresh_breaker());

        let err = llm.generate("a card").await.unwrap_err();
        assert!(matches!(err, LlmError::Upstream(_)));
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test]
    async fn non_transient_failure_is_not_retried() {
        let backend = Arc::new(ScriptedBackend::new(vec![Err(BackendError::NotConfigured)]));
        let llm = client(backend.clone(), fresh_breaker());

        let err = llm.generate("a card").await.unwrap_err();
        assert!(matches!(err, LlmError::Upstream(_)));
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn unusable_output_is_upstream_error_without_retry() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok(
            "Sure! Here is some prose about UIs.".to_string()
        )]));
        let breaker = fresh_breaker();
        let llm = client(backend.clone(), breaker.clone());

        let err = llm.generate("a card").await.unwrap_err();
        assert!(matches!(err, LlmError::Upstream(_)));
        assert_eq!(backend.calls(), 1);
        assert_eq!(breaker.snapshot().consecutive_failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_counts_and_surfaces_after_retries() {
        let backend = Arc::new(ScriptedBackend::slow(
            vec![
                Ok(COMPONENT.to_string()),
                Ok(COMPONENT.to_string()),
                Ok(COMPONENT.to_string()),
            ],
            Duration::from_secs(5),
        ));
        let breaker = fresh_breaker();
        let llm = LlmClient::new(
            backend.clone(),
            breaker.clone(),
            Duration::from_millis(50),
            3,
            Duration::from_millis(1),
        );

        let err = llm.generate("a card").await.unwrap_err();
        assert!(matches!(err, LlmError::Timeout(_)));
        assert_eq!(backend.calls(), 3);
        assert_eq!(breaker.snapshot().consecutive_failures, 3);
    }

    #[tokio::test]
    async fn open_circuit_rejects_without_invoking_backend() {
        let breaker = Arc::new(CircuitBreaker::new(1, Duration::from_secs(60)));
        breaker.record_failure();

        let backend = Arc::new(ScriptedBackend::new(vec![Ok(COMPONENT.to_string())]));
        let llm = client(backend.clone(), breaker);

        let err = llm.generate("a card").await.unwrap_err();
        assert!(matches!(err, LlmError::CircuitOpen));
        assert_eq!(backend.calls(), 0);
    }

    #[test]
    fn parse_rejects_empty_fenced_block() {
        assert!(parse_completion("```\n```", "x").is_err());
        assert!(parse_completion("", "x").is_err());
    }

    #[test]
    fn parse_accepts_const_arrow_component() {
        let raw = "const Card = () => <div/>;";
        let parsed = parse_completion(raw, "a card").unwrap();
        assert_eq!(parsed.code, raw);
    }
}
