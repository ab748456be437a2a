//! Telegram Bot API adapter.
//!
//! Implements the `tgcast-core` MessagingClient over `sendMessage` /
//! `editMessageText`. The bot token is supplied per call, so one client serves
//! every channel.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use tgcast_core::{
    config::Config,
    domain::{Credential, MessageId, MessageRef, RecipientId},
    errors::Error,
    messaging::{MessagingClient, ProviderError},
    Result,
};

const MAX_ERROR_BODY: usize = 200;

#[derive(Clone, Debug)]
pub struct TelegramClient {
    api_base: String,
    parse_mode: Option<String>,
    http: reqwest::Client,
}

/// Bot API response envelope.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    error_code: Option<u16>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
}

impl TelegramClient {
    pub fn new(
        api_base: impl Into<String>,
        parse_mode: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::External(format!("http client build failed: {e}")))?;
        Ok(Self {
            api_base: api_base.into(),
            parse_mode,
            http,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(
            cfg.telegram_api_base.clone(),
            cfg.telegram_parse_mode.clone(),
            cfg.request_timeout,
        )
    }

    fn method_url(&self, credential: &Credential, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, credential.expose())
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        credential: &Credential,
        method: &str,
        mut body: serde_json::Value,
    ) -> std::result::Result<T, ProviderError> {
        if let Some(mode) = &self.parse_mode {
            body["parse_mode"] = json!(mode);
        }

        // reqwest errors embed the URL, which embeds the token.
        let resp = self
            .http
            .post(self.method_url(credential, method))
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::transport(describe_transport(e)))?;

        let status = resp.status();
        tracing::debug!(method, status = status.as_u16(), "telegram api call");
        let raw = resp
            .text()
            .await
            .map_err(|e| ProviderError::transport(describe_transport(e)))?;

        let parsed = serde_json::from_str::<ApiResponse<T>>(&raw);

        if !status.is_success() {
            let description = parsed
                .ok()
                .and_then(|r| r.description)
                .unwrap_or_else(|| truncate(&raw, MAX_ERROR_BODY));
            return Err(ProviderError::new(status.as_u16(), description));
        }

        let envelope = parsed.map_err(|e| {
            ProviderError::transport(format!("undecodable {method} response: {e}"))
        })?;
        if !envelope.ok {
            return Err(ProviderError {
                status: envelope.error_code,
                description: envelope
                    .description
                    .unwrap_or_else(|| format!("{method} returned ok=false")),
            });
        }

        envelope
            .result
            .ok_or_else(|| ProviderError::transport(format!("{method} response has no result")))
    }
}

#[async_trait]
impl MessagingClient for TelegramClient {
    async fn send(
        &self,
        to: &RecipientId,
        text: &str,
        credential: &Credential,
    ) -> std::result::Result<MessageRef, ProviderError> {
        let sent: SentMessage = self
            .call(
                credential,
                "sendMessage",
                json!({ "chat_id": to.as_str(), "text": text }),
            )
            .await?;

        Ok(MessageRef {
            chat: to.clone(),
            message_id: MessageId(sent.message_id),
        })
    }

    async fn edit(
        &self,
        msg: &MessageRef,
        text: &str,
        credential: &Credential,
    ) -> std::result::Result<(), ProviderError> {
        // editMessageText returns either the Message or `true`; neither is needed.
        let _: serde_json::Value = self
            .call(
                credential,
                "editMessageText",
                json!({
                    "chat_id": msg.chat.as_str(),
                    "message_id": msg.message_id.0,
                    "text": text,
                }),
            )
            .await?;
        Ok(())
    }
}

fn describe_transport(e: reqwest::Error) -> String {
    let kind = if e.is_timeout() {
        "timeout"
    } else if e.is_connect() {
        "connect error"
    } else if e.is_decode() || e.is_body() {
        "body error"
    } else {
        "request error"
    };
    format!("{kind}: {}", e.without_url())
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
