use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("oracle request failed: {0}")]
    Request(String),
    #[error("oracle response malformed: {0}")]
    MalformedResponse(String),
}

/// Classification/extraction capability the intent resolver calls. The raw
/// string it returns is untrusted and sanitized by the resolver.
pub trait IntentOracle {
    fn classify(&self, prompt: &str) -> Result<String, OracleError>;
}

impl<F> IntentOracle for F
where
    F: Fn(&str) -> Result<String, OracleError>,
{
    fn classify(&self, prompt: &str) -> Result<String, OracleError> {
        self(prompt)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionsEnvelope {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: String,
}

/// OpenRouter-style `/chat/completions` client used as the default oracle.
/// Low temperature and a small token cap keep the verdict cheap and terse.
#[derive(Debug, Clone)]
pub struct ChatCompletionsOracle {
    api_base: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl ChatCompletionsOracle {
    pub fn new(api_base: &str, api_key: &str, model: &str, timeout: Duration) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            timeout,
        }
    }
}

impl IntentOracle for ChatCompletionsOracle {
    fn classify(&self, prompt: &str) -> Result<String, OracleError> {
        let url = format!("{}/chat/completions", self.api_base);
        let response = ureq::post(&url)
            .timeout(self.timeout)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .send_json(json!({
                "model": self.model,
                "messages": [{"role": "user", "content": prompt}],
                "temperature": 0.1,
                "max_tokens": 200,
            }))
            .map_err(|e| OracleError::Request(e.to_string()))?;

        let envelope = response
            .into_json::<ChatCompletionsEnvelope>()
            .map_err(|e| OracleError::MalformedResponse(e.to_string()))?;
        let content = envelope
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| OracleError::MalformedResponse("no choices in response".to_string()))?;
        Ok(content)
    }
}
