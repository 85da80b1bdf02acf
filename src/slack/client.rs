//! Slack Web API client for the handful of methods the relay and hook call.
//!
//! Slack answers most application errors with HTTP 200 and `"ok": false`,
//! so every response body is checked for the `ok` flag as well.

use crate::slack::MessageUpdater;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "https://slack.com/api";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from the Slack Web API.
#[derive(Debug, Error)]
pub enum SlackError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Slack {method} request failed: {source}")]
    Http {
        method: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("Slack {method} failed ({status}): {body}")]
    Status {
        method: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Slack {method} failed: {error}")]
    Api { method: &'static str, error: String },

    #[error("Slack {method} returned an unexpected response: {detail}")]
    Unexpected { method: &'static str, detail: String },
}

/// Arguments of `chat.update`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageUpdate {
    pub channel: String,
    pub ts: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocks: Option<Vec<Value>>,
}

/// Arguments of `chat.postMessage`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostMessage {
    pub channel: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocks: Option<Vec<Value>>,
}

/// Who the bot token belongs to (from `auth.test`).
#[derive(Debug, Clone, Deserialize)]
pub struct AuthIdentity {
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Client for the Slack Web API, authenticated with the bot token.
pub struct SlackClient {
    http: reqwest::Client,
    api_url: String,
    bot_token: SecretString,
}

impl SlackClient {
    pub fn new(bot_token: SecretString) -> Result<Self, SlackError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(SlackError::Client)?;
        Ok(Self {
            http,
            api_url: DEFAULT_API_URL.to_string(),
            bot_token,
        })
    }

    /// Point the client at a different API root (tests, proxies).
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Ask Slack for a Socket Mode websocket URL. Needs the app-level token.
    pub async fn open_socket_url(&self, app_token: &SecretString) -> Result<String, SlackError> {
        const METHOD: &str = "apps.connections.open";
        let body = self.call(METHOD, app_token, None).await?;
        body.get("url")
            .and_then(|u| u.as_str())
            .map(String::from)
            .ok_or(SlackError::Unexpected {
                method: METHOD,
                detail: "missing url".to_string(),
            })
    }

    /// Post a message; returns its ts.
    pub async fn post_message(&self, message: &PostMessage) -> Result<String, SlackError> {
        const METHOD: &str = "chat.postMessage";
        let payload = to_json(METHOD, message)?;
        let body = self.call(METHOD, &self.bot_token, Some(&payload)).await?;
        Ok(body
            .get("ts")
            .and_then(|t| t.as_str())
            .unwrap_or_default()
            .to_string())
    }

    /// Check the bot token.
    pub async fn auth_test(&self) -> Result<AuthIdentity, SlackError> {
        const METHOD: &str = "auth.test";
        let body = self.call(METHOD, &self.bot_token, None).await?;
        serde_json::from_value(body).map_err(|e| SlackError::Unexpected {
            method: METHOD,
            detail: e.to_string(),
        })
    }

    async fn call(
        &self,
        method: &'static str,
        token: &SecretString,
        payload: Option<&Value>,
    ) -> Result<Value, SlackError> {
        let url = format!("{}/{}", self.api_url, method);
        let mut request = self.http.post(&url).bearer_auth(token.expose_secret());
        if let Some(payload) = payload {
            request = request.json(payload);
        }

        let resp = request
            .send()
            .await
            .map_err(|source| SlackError::Http { method, source })?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .unwrap_or_else(|e| format!("<failed to read response body: {e}>"));

        if !status.is_success() {
            return Err(SlackError::Status {
                method,
                status,
                body: text,
            });
        }

        let body: Value = serde_json::from_str(&text).map_err(|e| SlackError::Unexpected {
            method,
            detail: e.to_string(),
        })?;

        if body.get("ok") != Some(&Value::Bool(true)) {
            let error = body
                .get("error")
                .and_then(|e| e.as_str())
                .unwrap_or("unknown")
                .to_string();
            return Err(SlackError::Api { method, error });
        }

        Ok(body)
    }
}

#[async_trait]
impl MessageUpdater for SlackClient {
    async fn update_message(&self, update: &MessageUpdate) -> Result<(), SlackError> {
        const METHOD: &str = "chat.update";
        let payload = to_json(METHOD, update)?;
        self.call(METHOD, &self.bot_token, Some(&payload)).await?;
        Ok(())
    }
}

fn to_json<T: Serialize>(method: &'static str, value: &T) -> Result<Value, SlackError> {
    serde_json::to_value(value).map_err(|e| SlackError::Unexpected {
        method,
        detail: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_omits_missing_blocks() {
        let update = MessageUpdate {
            channel: "C1".to_string(),
            ts: "1.2".to_string(),
            text: "✅ Approved by alice".to_string(),
            blocks: None,
        };
        let json = serde_json::to_value(&update).unwrap();
        assert!(json.get("blocks").is_none());
        assert_eq!(json["channel"], "C1");
    }

    #[test]
    fn test_api_url_trailing_slash() {
        let client = SlackClient::new(SecretString::from("xoxb-test".to_string()))
            .unwrap()
            .with_api_url("http://localhost:1234/api/");
        assert_eq!(client.api_url(), "http://localhost:1234/api");
    }
}
