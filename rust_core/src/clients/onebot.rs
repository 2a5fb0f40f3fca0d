//! OneBot HTTP API client
//!
//! Sends relay notifications to a chat bot backend either as a group message
//! (`/send_group_msg`) or a private message (`/send_private_msg`).

use super::Notifier;
use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Where notifications are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageTarget {
    Group(i64),
    Private(i64),
}

impl MessageTarget {
    fn endpoint(&self) -> &'static str {
        match self {
            MessageTarget::Group(_) => "send_group_msg",
            MessageTarget::Private(_) => "send_private_msg",
        }
    }
}

/// Request body for both send endpoints.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "message_type", rename_all = "snake_case")]
pub enum OutgoingMessage<'a> {
    Group { message: &'a str, group_id: String },
    Private { message: &'a str, user_id: String },
}

impl<'a> OutgoingMessage<'a> {
    pub fn new(target: MessageTarget, message: &'a str) -> Self {
        match target {
            MessageTarget::Group(id) => OutgoingMessage::Group {
                message,
                group_id: id.to_string(),
            },
            MessageTarget::Private(id) => OutgoingMessage::Private {
                message,
                user_id: id.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginInfo {
    pub user_id: i64,
    pub nickname: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    status: Option<String>,
    data: Option<T>,
}

#[derive(Debug)]
pub struct OneBotClient {
    http: Client,
    base_url: String,
    target: MessageTarget,
    connected: AtomicBool,
}

impl OneBotClient {
    pub fn new(base_url: String, target: MessageTarget, timeout: Duration) -> Self {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            target,
            connected: AtomicBool::new(false),
        }
    }

    pub fn target(&self) -> MessageTarget {
        self.target
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    /// Probe `/get_login_info` and mark the bot as reachable.
    pub async fn connect(&self) -> Result<Option<LoginInfo>> {
        let url = self.url("get_login_info");
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Bot API request failed: {url}"))?;

        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            anyhow::bail!("Bot API non-2xx: {status} body={text}");
        }

        info!("Bot login info: {}", text);
        self.connected.store(true, Ordering::SeqCst);

        let login = serde_json::from_str::<ApiResponse<LoginInfo>>(&text)
            .ok()
            .and_then(|r| {
                if r.status.as_deref().is_some_and(|s| s != "ok") {
                    warn!("Bot reported status {:?} for login info", r.status);
                }
                r.data
            });
        Ok(login)
    }

    pub async fn send(&self, message: &str) -> Result<()> {
        if !self.is_connected() {
            if let Err(e) = self.connect().await {
                warn!("Bot not connected, sending anyway: {:#}", e);
            }
        }

        let url = self.url(self.target.endpoint());
        let body = OutgoingMessage::new(self.target, message);

        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Bot API request failed: {url}"))?;

        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            anyhow::bail!("Bot API non-2xx: {status} body={text}");
        }

        match self.target {
            MessageTarget::Group(id) => info!("Sent to group id:{} message:{}", id, message),
            MessageTarget::Private(id) => info!("Sent to user id:{} message:{}", id, message),
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for OneBotClient {
    async fn notify(&self, text: &str) -> Result<()> {
        self.send(text).await
    }
}
