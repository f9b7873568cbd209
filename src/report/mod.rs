//! Drafting reports with an external language model.
//!
//! The model receives the reporting period, the metrics as JSON and any
//! extra instructions, and answers with markdown that the rest of the crate
//! renders and exports.

mod store;
mod transport;

pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use transport::{UreqTransport, HttpRequest, HttpResponse, Transport};

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{ReportError, StoreError};

/// Store key holding the service API key.
pub const API_KEY: &str = "openrouter_api_key";
/// Store key holding the preferred model.
pub const MODEL_KEY: &str = "openrouter_model";

pub const DEFAULT_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

const SYSTEM_PROMPT: &str = "You are an operations analyst for a public bus agency. \
Write clear, factual business reports in GitHub-flavored markdown. Use headings, \
short paragraphs, bullet lists and tables where they help. Do not invent numbers \
that are not in the data.";

/// Reporting window a draft covers.
#[derive(clap::ValueEnum, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReportPeriod {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Annual,
}

impl ReportPeriod {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Annual => "annual",
        }
    }
}

/// What to draft.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRequest {
    pub period: ReportPeriod,
    /// Operational metrics, embedded verbatim in the prompt
    pub metrics: serde_json::Value,
    pub instructions: Option<String>,
}

impl ReportRequest {
    pub const fn new(period: ReportPeriod, metrics: serde_json::Value) -> Self {
        Self {
            period,
            metrics,
            instructions: None,
        }
    }

    #[must_use]
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        let instructions = instructions.into();
        self.instructions = (!instructions.trim().is_empty()).then_some(instructions);
        self
    }

    /// The user message sent to the model.
    pub fn prompt(&self) -> String {
        let metrics = serde_json::to_string_pretty(&self.metrics)
            .unwrap_or_else(|_| self.metrics.to_string());
        let mut prompt = format!(
            "Draft the {} operations report.\n\nMetrics (JSON):\n```json\n{metrics}\n```\n",
            self.period.label()
        );
        if let Some(instructions) = &self.instructions {
            prompt.push_str("\nAdditional instructions:\n");
            prompt.push_str(instructions.trim());
            prompt.push('\n');
        }
        prompt
    }
}

/// Connection settings for the drafting service.
///
/// Passed explicitly; nothing is read from globals.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            temperature: 0.3,
            max_tokens: 2000,
            timeout: Duration::from_secs(120),
        }
    }
}

impl ReportConfig {
    /// Defaults plus whatever key and model `store` holds.
    pub fn from_store(store: &dyn KeyValueStore) -> Result<Self, StoreError> {
        let mut config = Self {
            api_key: store.get(API_KEY)?,
            ..Self::default()
        };
        if let Some(model) = store.get(MODEL_KEY)? {
            config.model = model;
        }
        Ok(config)
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|key| !key.is_empty())
    }
}

/// Produces report markdown.
pub trait ReportGenerator {
    fn generate(&self, request: &ReportRequest) -> Result<String, ReportError>;
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Client for an OpenAI-style chat completions endpoint.
#[derive(Debug, Clone)]
pub struct OpenRouterClient<T: Transport> {
    config: ReportConfig,
    transport: T,
}

impl OpenRouterClient<UreqTransport> {
    pub fn new(config: ReportConfig) -> Self {
        Self::with_transport(config, UreqTransport::new())
    }
}

impl<T: Transport> OpenRouterClient<T> {
    pub const fn with_transport(config: ReportConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub const fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// JSON body for `request`.
    pub fn request_body(&self, request: &ReportRequest) -> serde_json::Value {
        json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": request.prompt() },
            ],
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
        })
    }
}

impl<T: Transport> ReportGenerator for OpenRouterClient<T> {
    fn generate(&self, request: &ReportRequest) -> Result<String, ReportError> {
        let _scope = crate::perf::scope("report.generate");
        let key = self
            .config
            .key()
            .ok_or_else(|| ReportError::Authentication("no API key configured".to_string()))?;

        let http = HttpRequest {
            url: self.config.endpoint.clone(),
            headers: vec![
                ("Authorization".to_string(), format!("Bearer {key}")),
                ("Content-Type".to_string(), "application/json".to_string()),
                ("X-Title".to_string(), "Fleet Operations Reports".to_string()),
            ],
            body: self.request_body(request).to_string(),
            timeout: self.config.timeout,
        };
        tracing::info!(model = %self.config.model, period = request.period.label(), "requesting draft");
        let response = self.transport.post(&http)?;

        match response.status {
            401 | 403 => {
                return Err(ReportError::Authentication(error_message(&response.body)));
            }
            status if !response.is_success() => {
                return Err(ReportError::Service {
                    status,
                    message: error_message(&response.body),
                });
            }
            _ => {}
        }

        let parsed: ChatResponse = serde_json::from_str(&response.body)
            .map_err(|err| ReportError::MalformedResponse(err.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| ReportError::MalformedResponse("response has no content".to_string()))
    }
}

fn error_message(body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        return envelope.error.message;
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response".to_string();
    }
    trimmed.chars().take(200).collect()
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    struct MockTransport {
        response: Result<HttpResponse, String>,
        seen: RefCell<Vec<HttpRequest>>,
    }

    impl MockTransport {
        fn replying(status: u16, body: &str) -> Self {
            Self {
                response: Ok(HttpResponse {
                    status,
                    body: body.to_string(),
                }),
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl Transport for &MockTransport {
        fn post(&self, request: &HttpRequest) -> Result<HttpResponse, ReportError> {
            self.seen.borrow_mut().push(request.clone());
            self.response.clone().map_err(ReportError::Transport)
        }
    }

    fn request() -> ReportRequest {
        ReportRequest::new(ReportPeriod::Weekly, json!({ "on_time_pct": 91.4, "trips": 1203 }))
            .with_instructions("Focus on route 12.")
    }

    fn config() -> ReportConfig {
        ReportConfig::default().with_api_key("sk-test")
    }

    #[test]
    fn test_success_returns_content() {
        let transport = MockTransport::replying(
            200,
            r##"{"choices":[{"message":{"role":"assistant","content":"# Weekly Report"}}]}"##,
        );
        let client = OpenRouterClient::with_transport(config(), &transport);
        assert_eq!(client.generate(&request()).unwrap(), "# Weekly Report");

        let seen = transport.seen.borrow();
        let sent = &seen[0];
        assert!(sent.headers.iter().any(|(k, v)| k == "Authorization" && v == "Bearer sk-test"));
        let body: serde_json::Value = serde_json::from_str(&sent.body).unwrap();
        let prompt = body["messages"][1]["content"].as_str().unwrap();
        assert!(prompt.contains("weekly"));
        assert!(prompt.contains("\"trips\": 1203"));
        assert!(prompt.contains("Focus on route 12."));
    }

    #[test]
    fn test_unauthorized_is_authentication_error() {
        let transport = MockTransport::replying(401, r#"{"error":{"message":"bad key"}}"#);
        let client = OpenRouterClient::with_transport(config(), &transport);
        let err = client.generate(&request()).unwrap_err();
        assert!(matches!(err, ReportError::Authentication(ref m) if m == "bad key"));
    }

    #[test]
    fn test_server_error_is_service_error() {
        let transport = MockTransport::replying(500, "upstream down");
        let client = OpenRouterClient::with_transport(config(), &transport);
        let err = client.generate(&request()).unwrap_err();
        assert!(matches!(err, ReportError::Service { status: 500, ref message } if message == "upstream down"));
    }

    #[test]
    fn test_missing_key_never_calls_transport() {
        let transport = MockTransport::replying(200, "{}");
        let client = OpenRouterClient::with_transport(
            ReportConfig::default().with_api_key("  "),
            &transport,
        );
        assert!(matches!(
            client.generate(&request()),
            Err(ReportError::Authentication(_))
        ));
        assert!(transport.seen.borrow().is_empty());
    }

    #[test]
    fn test_empty_choices_is_malformed() {
        let transport = MockTransport::replying(200, r#"{"choices":[]}"#);
        let client = OpenRouterClient::with_transport(config(), &transport);
        assert!(matches!(
            client.generate(&request()),
            Err(ReportError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_config_from_store() {
        let store = MemoryStore::new();
        store.set(API_KEY, "sk-stored").unwrap();
        store.set(MODEL_KEY, "mistralai/mistral-large").unwrap();
        let config = ReportConfig::from_store(&store).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("sk-stored"));
        assert_eq!(config.model, "mistralai/mistral-large");
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_blank_instructions_are_dropped() {
        let request = ReportRequest::new(ReportPeriod::Monthly, json!({})).with_instructions("   ");
        assert!(request.instructions.is_none());
        assert!(!request.prompt().contains("Additional instructions"));
    }
}
