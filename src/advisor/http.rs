use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::advisor::reasoning::{
    parse_reply, ReasoningRequest, ReasoningResponse, ReasoningService,
};
use crate::config::ReasoningConfig;

const CONNECT_TIMEOUT_SECS: u64 = 4;

/// Reasoning service reached over HTTP with a JSON body.
pub struct HttpReasoningClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl HttpReasoningClient {
    pub fn from_config(config: &ReasoningConfig) -> Result<Self> {
        let endpoint = config.endpoint.trim();
        if endpoint.is_empty() {
            return Err(anyhow!("reasoning endpoint is not configured"));
        }
        let client = Client::builder()
            .user_agent(concat!("trip-tradeoff/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .context("failed to build reasoning HTTP client")?;
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty());
        if api_key.is_none() {
            debug!("{} not set, calling reasoning endpoint without auth", config.api_key_env);
        }
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            model: config.model.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl ReasoningService for HttpReasoningClient {
    fn name(&self) -> &str {
        &self.endpoint
    }

    async fn reason(&self, request: &ReasoningRequest) -> Result<ReasoningResponse> {
        let body = json!({
            "model": self.model,
            "system": request.system,
            "input": request,
        });
        let mut builder = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder
            .send()
            .await
            .with_context(|| format!("failed POST request: {}", self.endpoint))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .with_context(|| format!("failed reading response body: {}", self.endpoint))?;
        if !status.is_success() {
            let preview: String = text.chars().take(180).collect();
            return Err(anyhow!("POST {} returned {status}: {preview}", self.endpoint));
        }
        decode_reply(&text)
    }
}

/// Accepts a bare reply object, a provider envelope carrying the reply as
/// text, or plain text with an embedded JSON object.
pub fn decode_reply(body: &str) -> Result<ReasoningResponse> {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return parse_reply(body);
    };
    if let Some(object) = value.as_object() {
        if object_get_case_insensitive(object, "reasons").is_some()
            || object_get_case_insensitive(object, "summary").is_some()
        {
            return serde_json::from_value(value).context("malformed reasoning reply");
        }
    }
    let text = envelope_text(&value)
        .ok_or_else(|| anyhow!("reasoning response has no recognizable reply text"))?;
    parse_reply(text)
}

fn envelope_text(value: &Value) -> Option<&str> {
    if let Some(text) = value.as_str() {
        return Some(text);
    }
    if let Some(array) = value.as_array() {
        return array.iter().find_map(envelope_text);
    }
    let object = value.as_object()?;
    for key in ["output_text", "text", "completion", "content", "output", "message"] {
        if let Some(found) = object_get_case_insensitive(object, key).and_then(envelope_text) {
            return Some(found);
        }
    }
    object_get_case_insensitive(object, "choices").and_then(envelope_text)
}

fn object_get_case_insensitive<'a>(
    object: &'a Map<String, Value>,
    key: &str,
) -> Option<&'a Value> {
    object.get(key).or_else(|| {
        object
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_bare_reply_object() {
        let body = json!({
            "reasons": {"L1A1": "Cheaper nonstop on the same day."},
            "decision": "optimize"
        })
        .to_string();
        let reply = decode_reply(&body).expect("decode");
        assert_eq!(reply.reasons.len(), 1);
        assert_eq!(reply.decision.as_deref(), Some("optimize"));
    }

    #[test]
    fn decodes_chat_style_envelope() {
        let inner = "```json\n{\"summary\": \"Shift the trip a week.\", \"key_insight\": \"Dates drive cost.\"}\n```";
        let body = json!({
            "choices": [{"message": {"role": "assistant", "content": inner}}]
        })
        .to_string();
        let reply = decode_reply(&body).expect("decode");
        assert_eq!(reply.summary.as_deref(), Some("Shift the trip a week."));
        assert_eq!(reply.key_insight.as_deref(), Some("Dates drive cost."));
    }

    #[test]
    fn decodes_plain_text_body() {
        let reply = decode_reply("Sure! {\"summary\": \"ok\"}").expect("decode");
        assert_eq!(reply.summary.as_deref(), Some("ok"));
    }

    #[test]
    fn rejects_envelope_without_reply() {
        let body = json!({"id": "abc", "usage": {"tokens": 10}}).to_string();
        assert!(decode_reply(&body).is_err());
    }

    #[test]
    fn client_requires_endpoint() {
        let config = ReasoningConfig::default();
        assert!(HttpReasoningClient::from_config(&config).is_err());
        let config = ReasoningConfig {
            endpoint: "http://127.0.0.1:9/v1/reason".to_string(),
            ..ReasoningConfig::default()
        };
        let client = HttpReasoningClient::from_config(&config).expect("client");
        assert_eq!(client.name(), "http://127.0.0.1:9/v1/reason");
    }
}
