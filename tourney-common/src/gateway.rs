// Copyright (C) 2026 StarHuntingGames
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use anyhow::Context;
use async_trait::async_trait;
use tracing::{info, warn};

use crate::{OutboundMessage, UserId};

pub const BROADCAST_PREFIX: &str = "📢 Announcement:";

#[async_trait]
pub trait ChatSender: Send + Sync {
    async fn send(&self, message: &OutboundMessage) -> anyhow::Result<()>;
}

/// HTTP client for the chat transport's delivery endpoint.
#[derive(Clone)]
pub struct ChatGatewayClient {
    client: reqwest::Client,
    base_url: String,
}

impl ChatGatewayClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    pub fn from_env() -> Self {
        let base_url = std::env::var("CHAT_GATEWAY_BASE_URL")
            .ok()
            .unwrap_or_else(|| "http://chat-gateway:8080".to_string());
        Self::new(base_url)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl ChatSender for ChatGatewayClient {
    async fn send(&self, message: &OutboundMessage) -> anyhow::Result<()> {
        let response = self
            .client
            .post(self.endpoint("v1/messages"))
            .json(message)
            .send()
            .await
            .context("failed to call chat gateway")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<response body unavailable>".to_string());
            anyhow::bail!("chat gateway returned {status}: {body}");
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Sends `text` to every recipient, one at a time. A failed delivery is
/// logged and skipped.
pub async fn broadcast(
    sender: &dyn ChatSender,
    recipients: &[UserId],
    text: &str,
) -> BroadcastReport {
    let mut report = BroadcastReport::default();
    let body = format!("{BROADCAST_PREFIX}\n{text}");

    for &user_id in recipients {
        let message = OutboundMessage {
            chat: user_id.to_string(),
            text: body.clone(),
            actions: Vec::new(),
        };
        match sender.send(&message).await {
            Ok(()) => report.delivered += 1,
            Err(error) => {
                report.failed += 1;
                warn!(user_id, error = %error, "broadcast delivery failed");
            }
        }
    }

    info!(
        delivered = report.delivered,
        failed = report.failed,
        "broadcast finished"
    );
    report
}
