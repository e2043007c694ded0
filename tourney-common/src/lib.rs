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

//! Shared tournament registration core: slot registry, reserve queue, quota
//! tracking, proof-link checks and the wire types the services exchange.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod command;
pub mod gate;
pub mod gateway;
pub mod proof;
pub mod quota;
pub mod registry;
pub mod reserve;
pub mod state;

pub use command::{ActionToken, Command, ParseError};
pub use gate::EventGate;
pub use gateway::{BroadcastReport, ChatGatewayClient, ChatSender, broadcast};
pub use proof::{ProofRule, ProofRules, ProofValidator, ProofVerdict, ValidationResult};
pub use quota::QuotaTracker;
pub use registry::{ConfirmOutcome, RegistryError, SlotRegistry};
pub use reserve::ReserveQueue;
pub use state::{CancelOutcome, RegisterOutcome, TournamentState};

/// Lowest slot number handed out to walk-up registrations.
pub const FIRST_SLOT_NUMBER: SlotNumber = 5;
pub const MIN_PROOF_LINKS: usize = 4;
pub const DEFAULT_SLOT_EVENTS_TOPIC: &str = "tournament.slot-events.v1";

pub type UserId = i64;
pub type ChatId = i64;
pub type SlotNumber = u32;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlotStatus {
    Pending,
    Confirmed,
}

impl SlotStatus {
    pub fn marker(self) -> &'static str {
        match self {
            SlotStatus::Pending => "⏳",
            SlotStatus::Confirmed => "✅",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
}

impl ChatKind {
    /// Only supergroups may switch on proof auto-checking without the admin.
    pub fn allows_self_service_autocheck(self) -> bool {
        self == ChatKind::Supergroup
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Registration {
    pub slot: SlotNumber,
    pub team_name: String,
    pub captain_handle: String,
    /// `None` for teams promoted from the reserve queue, which never had a
    /// captain identity attached.
    pub captain_id: Option<UserId>,
    pub status: SlotStatus,
    pub registered_at: DateTime<Utc>,
}

impl Registration {
    pub fn is_captain(&self, user_id: UserId) -> bool {
        self.captain_id == Some(user_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReserveEntry {
    pub team_name: String,
    pub captain_handle: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlotSummary {
    pub slot: SlotNumber,
    pub team_name: String,
    pub status: SlotStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReserveListing {
    pub position: usize,
    pub team_name: String,
    pub captain_handle: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlotEventType {
    Registered,
    ReservePromoted,
}

/// Announcement for the captains' room, produced after a state change commits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlotEvent {
    pub event_id: String,
    pub event_type: SlotEventType,
    pub destination: String,
    pub slot: SlotNumber,
    pub team_name: String,
    pub captain_handle: String,
    pub captain_id: Option<UserId>,
    #[serde(default)]
    pub actions: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl SlotEvent {
    pub fn registered(destination: &str, registration: &Registration) -> Self {
        Self::new(
            SlotEventType::Registered,
            destination,
            registration,
            vec![
                ActionToken::Confirm(registration.slot).encode(),
                ActionToken::Cancel(registration.slot).encode(),
            ],
        )
    }

    pub fn reserve_promoted(destination: &str, registration: &Registration) -> Self {
        Self::new(
            SlotEventType::ReservePromoted,
            destination,
            registration,
            Vec::new(),
        )
    }

    fn new(
        event_type: SlotEventType,
        destination: &str,
        registration: &Registration,
        actions: Vec<String>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            event_type,
            destination: destination.to_string(),
            slot: registration.slot,
            team_name: registration.team_name.clone(),
            captain_handle: registration.captain_handle.clone(),
            captain_id: registration.captain_id,
            actions,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionButton {
    Callback { label: String, data: String },
    Url { label: String, url: String },
}

/// A message handed to the chat gateway for delivery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutboundMessage {
    pub chat: String,
    pub text: String,
    #[serde(default)]
    pub actions: Vec<ActionButton>,
}

/// Inbound update as forwarded by the chat transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChatUpdate {
    Message {
        user_id: UserId,
        chat_id: ChatId,
        chat_kind: ChatKind,
        text: String,
    },
    Callback {
        user_id: UserId,
        chat_id: ChatId,
        data: String,
    },
}

impl ChatUpdate {
    pub fn user_id(&self) -> UserId {
        match self {
            ChatUpdate::Message { user_id, .. } | ChatUpdate::Callback { user_id, .. } => *user_id,
        }
    }

    pub fn chat_id(&self) -> ChatId {
        match self {
            ChatUpdate::Message { chat_id, .. } | ChatUpdate::Callback { chat_id, .. } => *chat_id,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReplyOutcome {
    Applied,
    Rejected,
    Ignored,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReplyDelivery {
    /// Plain reply in the originating chat.
    Message,
    /// Transient popup on the pressed button.
    Alert,
    /// Replace the text of the message carrying the pressed button.
    EditOriginal,
}

/// What the transport should show the caller after a command was handled.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandReply {
    pub outcome: ReplyOutcome,
    pub delivery: ReplyDelivery,
    pub text: Option<String>,
    #[serde(default)]
    pub actions: Vec<ActionButton>,
}

impl CommandReply {
    pub fn ignored() -> Self {
        Self {
            outcome: ReplyOutcome::Ignored,
            delivery: ReplyDelivery::Message,
            text: None,
            actions: Vec::new(),
        }
    }

    pub fn applied(text: impl Into<String>) -> Self {
        Self::with(ReplyOutcome::Applied, ReplyDelivery::Message, text)
    }

    pub fn rejected(text: impl Into<String>) -> Self {
        Self::with(ReplyOutcome::Rejected, ReplyDelivery::Message, text)
    }

    pub fn alert(text: impl Into<String>) -> Self {
        Self::with(ReplyOutcome::Rejected, ReplyDelivery::Alert, text)
    }

    pub fn edit_original(text: impl Into<String>) -> Self {
        Self::with(ReplyOutcome::Applied, ReplyDelivery::EditOriginal, text)
    }

    pub fn with_action(mut self, action: ActionButton) -> Self {
        self.actions.push(action);
        self
    }

    fn with(outcome: ReplyOutcome, delivery: ReplyDelivery, text: impl Into<String>) -> Self {
        Self {
            outcome,
            delivery,
            text: Some(text.into()),
            actions: Vec::new(),
        }
    }
}

/// Replace `${VAR_NAME}` patterns in a string with values from environment variables.
/// Unknown or unset variables are replaced with an empty string.
pub fn expand_env_vars(input: &str) -> String {
    let Ok(re) = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}") else {
        return input.to_string();
    };
    re.replace_all(input, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_default()
    })
    .into_owned()
}
