use anyhow::Context;
use reqwest::Url;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::config::ServerConfig;
use crate::error::ChatError;

/// Number of documents the service is asked to retrieve per message.
pub const TOP_K: u32 = 5;

const SERVER_ERROR: &str = "Server error";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    top_k: u32,
}

/// A citation attached to an assistant reply.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Source {
    #[serde(default, deserialize_with = "lenient_string")]
    pub uri: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "page_number")]
    pub page_number: Option<u64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub page_range: Option<String>,
    #[serde(default, deserialize_with = "numeric")]
    pub score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub text: Option<String>,
}

// A malformed field drops to `None` instead of failing the whole reply.
fn numeric<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(|v| v.as_f64()))
}

fn page_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    let page = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u64::MAX as f64)
                .map(|f| f as u64)
        }),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    Ok(page.filter(|p| *p > 0))
}

fn lenient_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[derive(Debug, Default, Deserialize)]
struct ChatResponseBody {
    #[serde(default)]
    annotated_text: Option<String>,
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    sources: Option<Vec<Source>>,
    #[serde(default)]
    error: Option<Value>,
}

impl ChatResponseBody {
    fn error_message(&self) -> Option<String> {
        self.error
            .as_ref()
            .and_then(Value::as_str)
            .filter(|e| !e.is_empty())
            .map(str::to_string)
    }
}

/// The part of a successful `/chat` response the transcript shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatReply {
    pub text: String,
    pub sources: Vec<Source>,
}

impl From<ChatResponseBody> for ChatReply {
    fn from(body: ChatResponseBody) -> Self {
        let text = [body.annotated_text, body.response]
            .into_iter()
            .flatten()
            .find(|t| !t.is_empty())
            .unwrap_or_default();

        ChatReply {
            text,
            sources: body.sources.unwrap_or_default(),
        }
    }
}

/// HTTP client for the document chat service.
#[derive(Debug, Clone)]
pub struct ChatClient {
    base_url: Url,
    client: reqwest::Client,
}

impl ChatClient {
    pub fn from_config(config: &ServerConfig) -> anyhow::Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .with_context(|| format!("invalid server base_url {:?}", config.base_url))?;

        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().context("failed to build HTTP client")?;

        Ok(ChatClient { base_url, client })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ChatError> {
        self.base_url
            .join(path)
            .map_err(|e| ChatError::Transport(e.to_string()))
    }

    /// Posts one message to `/chat`.
    ///
    /// A non-success status becomes [`ChatError::Service`] carrying the body's
    /// `error` field (or a generic message); anything that prevents reading a
    /// successful reply becomes [`ChatError::Transport`].
    pub async fn send(&self, message: &str) -> Result<ChatReply, ChatError> {
        let url = self.endpoint("/chat")?;
        tracing::debug!(%url, top_k = TOP_K, "sending chat message");

        let response = self
            .client
            .post(url)
            .json(&ChatRequest { message, top_k: TOP_K })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ChatResponseBody>(&body)
                .ok()
                .and_then(|b| b.error_message())
                .unwrap_or_else(|| SERVER_ERROR.to_string());
            tracing::warn!(%status, error = %message, "chat service returned an error");
            return Err(ChatError::Service(message));
        }

        let parsed: ChatResponseBody = serde_json::from_str(&body).map_err(|e| {
            ChatError::Transport(format!("invalid response from chat service: {}", e))
        })?;
        let reply = ChatReply::from(parsed);
        tracing::info!(sources = reply.sources.len(), "chat reply received");

        Ok(reply)
    }

    /// Asks the service to forget the conversation.
    pub async fn clear(&self) -> Result<(), ChatError> {
        let url = self.endpoint("/clear")?;
        let response = self.client.post(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::Service(format!(
                "clear failed with status {}",
                status
            )));
        }
        Ok(())
    }

    /// Turns a citation target into an absolute URL; `"#"` has no target.
    pub fn resolve_link(&self, href: &str) -> Option<Url> {
        if href.is_empty() || href == "#" {
            return None;
        }
        self.base_url.join(href).ok()
    }
}
