use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::Prompt;
use rig::providers::groq;

const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
const TEMPERATURE: f64 = 0.2;
const MAX_TOKENS: u64 = 8000;

/// Model-side failures, kept distinguishable from malformed successes so the
/// orchestrator can map them onto its error taxonomy.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// The client cannot be used at all (missing key, bad configuration).
    #[error("model client not configured: {0}")]
    NotConfigured(String),

    /// A single request failed: network, quota, timeout, provider error.
    #[error("model request failed: {0}")]
    Request(String),
}

/// The single suspension point of the generation pipeline.
///
/// One stateless round trip per call: system prompt, user prompt, and a flag
/// asking the provider for a JSON-object response. Which vendor or model id
/// sits behind this is irrelevant to the orchestrators.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn complete(&self, system: &str, user: &str, json_mode: bool)
        -> Result<String, ModelError>;
}

/// Groq-backed client.
///
/// Construction never fails: a missing `GROQ_API_KEY` is reported as
/// `NotConfigured` at call time so callers still get a structured result.
pub struct GroqClient {
    api_key: Option<String>,
    model: String,
}

impl GroqClient {
    pub fn from_env() -> Self {
        let api_key = std::env::var("GROQ_API_KEY")
            .ok()
            .filter(|key| !key.is_empty());
        if api_key.is_none() {
            log::warn!("GROQ_API_KEY not found; model calls will fail");
        }

        let model = std::env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        GroqClient { api_key, model }
    }
}

#[async_trait]
impl ModelClient for GroqClient {
    async fn complete(
        &self,
        system: &str,
        user: &str,
        json_mode: bool,
    ) -> Result<String, ModelError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ModelError::NotConfigured("GROQ_API_KEY not set".to_string()))?;

        let client: groq::Client = groq::Client::builder()
            .api_key(api_key)
            .build()
            .map_err(|e| ModelError::NotConfigured(format!("failed to create Groq client: {e}")))?;

        let mut builder = client
            .agent(&self.model)
            .preamble(system)
            .temperature(TEMPERATURE)
            .max_tokens(MAX_TOKENS);

        if json_mode {
            builder = builder.additional_params(serde_json::json!({
                "response_format": {"type": "json_object"}
            }));
        }

        let agent = builder.build();

        agent
            .prompt(user)
            .await
            .map_err(|e| ModelError::Request(e.to_string()))
    }
}
