//! Minimal Telegram Bot API client: long polling plus the two send methods
//! the bot needs.
//!
//! Every method is a POST to `{api_base}/bot{token}/{method}` answered with
//! the `{"ok", "result", "description"}` envelope. Transport errors are
//! stripped of their URL before surfacing so the token never reaches logs.

use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::BotConfig;
use crate::error::ScoutError;

/// Extra time allowed on top of the long-poll timeout before reqwest gives up.
const POLL_GRACE: Duration = Duration::from_secs(15);

/// Timeout for send calls.
const SEND_TIMEOUT: Duration = Duration::from_secs(60);

/// An incoming update; only message updates are requested.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Serialize)]
struct ReplyParameters {
    message_id: i64,
    allow_sending_without_reply: bool,
}

impl ReplyParameters {
    fn to(message_id: i64) -> Self {
        Self {
            message_id,
            allow_sending_without_reply: true,
        }
    }
}

#[derive(Debug, Serialize)]
struct GetUpdates {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    timeout: u64,
    allowed_updates: &'static [&'static str],
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_parameters: Option<ReplyParameters>,
}

/// Outbound side of the bot: where replies go.
pub trait Messenger: Send + Sync {
    fn send_text(
        &self,
        chat_id: i64,
        reply_to: Option<i64>,
        text: &str,
    ) -> impl Future<Output = crate::Result<()>> + Send;

    fn send_document(
        &self,
        chat_id: i64,
        reply_to: Option<i64>,
        file_name: &str,
        contents: Vec<u8>,
    ) -> impl Future<Output = crate::Result<()>> + Send;
}

/// Inbound side of the bot: where updates come from.
pub trait UpdateSource: Send + Sync {
    /// Fetch updates with id >= `offset`, waiting up to `timeout_secs` for new ones.
    fn get_updates(
        &self,
        offset: Option<i64>,
        timeout_secs: u64,
    ) -> impl Future<Output = crate::Result<Vec<Update>>> + Send;
}

/// Unwrap an API envelope, turning `ok = false` into an error.
fn unwrap_envelope<T>(method: &str, envelope: ApiResponse<T>) -> crate::Result<T> {
    match (envelope.ok, envelope.result) {
        (true, Some(result)) => Ok(result),
        (true, None) => Err(ScoutError::TelegramApi(
            method.to_string(),
            "response has no result".to_string(),
        )),
        (false, _) => Err(ScoutError::TelegramApi(
            method.to_string(),
            envelope
                .description
                .unwrap_or_else(|| "unknown error".to_string()),
        )),
    }
}

/// Telegram Bot API client.
#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    /// `{api_base}/bot{token}`; never logged.
    base_url: String,
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient").finish_non_exhaustive()
    }
}

impl TelegramClient {
    pub fn new(api_base_url: &str, token: &str) -> crate::Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            base_url: format!("{}/bot{}", api_base_url.trim_end_matches('/'), token),
        })
    }

    /// Build a client from `[bot]` config, resolving the token.
    pub fn from_config(config: &BotConfig) -> crate::Result<Self> {
        let token = config.resolve_token()?;
        Self::new(&config.api_base_url, &token)
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.base_url, method)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        request: reqwest::RequestBuilder,
    ) -> crate::Result<T> {
        let response = request.send().await.map_err(reqwest::Error::without_url)?;
        let envelope: ApiResponse<T> = response
            .json()
            .await
            .map_err(reqwest::Error::without_url)?;
        unwrap_envelope(method, envelope)
    }
}

impl UpdateSource for TelegramClient {
    /// Long-poll `getUpdates` for message updates.
    async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout_secs: u64,
    ) -> crate::Result<Vec<Update>> {
        let body = GetUpdates {
            offset,
            timeout: timeout_secs,
            allowed_updates: &["message"],
        };
        let request = self
            .http
            .post(self.method_url("getUpdates"))
            .timeout(Duration::from_secs(timeout_secs) + POLL_GRACE)
            .json(&body);
        self.call("getUpdates", request).await
    }
}

impl Messenger for TelegramClient {
    async fn send_text(
        &self,
        chat_id: i64,
        reply_to: Option<i64>,
        text: &str,
    ) -> crate::Result<()> {
        let body = SendMessage {
            chat_id,
            text,
            reply_parameters: reply_to.map(ReplyParameters::to),
        };
        let request = self
            .http
            .post(self.method_url("sendMessage"))
            .timeout(SEND_TIMEOUT)
            .json(&body);
        let _sent: serde_json::Value = self.call("sendMessage", request).await?;
        Ok(())
    }

    async fn send_document(
        &self,
        chat_id: i64,
        reply_to: Option<i64>,
        file_name: &str,
        contents: Vec<u8>,
    ) -> crate::Result<()> {
        let mime = if file_name.ends_with(".json") {
            "application/json"
        } else {
            "text/plain"
        };
        let document = reqwest::multipart::Part::bytes(contents)
            .file_name(file_name.to_string())
            .mime_str(mime)?;

        let mut form = reqwest::multipart::Form::new()
            .text("chat_id", chat_id.to_string())
            .part("document", document);
        if let Some(message_id) = reply_to {
            let params = serde_json::to_string(&ReplyParameters::to(message_id))?;
            form = form.text("reply_parameters", params);
        }

        let request = self
            .http
            .post(self.method_url("sendDocument"))
            .timeout(SEND_TIMEOUT)
            .multipart(form);
        let _sent: serde_json::Value = self.call("sendDocument", request).await?;
        Ok(())
    }
}
