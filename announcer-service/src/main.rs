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

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use rdkafka::{
    Message,
    config::ClientConfig,
    consumer::{CommitMode, Consumer, StreamConsumer},
};
use tourney_common::{
    ActionButton, ActionToken, ChatGatewayClient, ChatSender, DEFAULT_SLOT_EVENTS_TOPIC,
    OutboundMessage, SlotEvent, SlotEventType,
};
use tracing::{info, warn};

#[derive(Clone)]
struct AppState {
    chat_sender: Arc<dyn ChatSender>,
    bootstrap_servers: String,
    topic: String,
    consumer_group_id: String,
}

impl AppState {
    fn from_env() -> Self {
        Self {
            chat_sender: Arc::new(ChatGatewayClient::from_env()),
            bootstrap_servers: std::env::var("KAFKA_BOOTSTRAP_SERVERS")
                .ok()
                .unwrap_or_else(|| "kafka:9092".to_string()),
            topic: std::env::var("SLOT_EVENTS_TOPIC")
                .ok()
                .unwrap_or_else(|| DEFAULT_SLOT_EVENTS_TOPIC.to_string()),
            consumer_group_id: std::env::var("ANNOUNCER_CONSUMER_GROUP_ID")
                .ok()
                .unwrap_or_else(|| "announcer-service-v1".to_string()),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "announcer_service=debug".to_string()),
        )
        .init();

    let state = AppState::from_env();
    let runner_state = state.clone();
    tokio::spawn(async move {
        if let Err(error) = run_event_consumer(runner_state).await {
            warn!(error = %error, "announcer consumer stopped");
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("announcer-service shutting down");
    Ok(())
}

async fn run_event_consumer(state: AppState) -> anyhow::Result<()> {
    let consumer: StreamConsumer = ClientConfig::new()
        .set("bootstrap.servers", &state.bootstrap_servers)
        .set("group.id", &state.consumer_group_id)
        .set("enable.auto.commit", "false")
        .set("auto.offset.reset", "earliest")
        .create()
        .context("failed to create announcer-service consumer")?;

    consumer
        .subscribe(&[state.topic.as_str()])
        .context("failed to subscribe announcer-service to slot events")?;
    info!(topic = %state.topic, "announcer-service subscribed to slot events");

    loop {
        let message = match consumer.recv().await {
            Ok(message) => message,
            Err(error) => {
                warn!(?error, "announcer-service kafka receive error");
                tokio::time::sleep(Duration::from_millis(300)).await;
                continue;
            }
        };

        let payload = match message.payload() {
            Some(payload) => payload,
            None => {
                if let Err(error) = consumer.commit_message(&message, CommitMode::Async) {
                    warn!(?error, "announcer-service failed to commit empty payload");
                }
                continue;
            }
        };

        match serde_json::from_slice::<SlotEvent>(payload) {
            Ok(event) => handle_slot_event(&state, &event).await,
            Err(error) => warn!(?error, "announcer-service failed to parse slot event"),
        }

        if let Err(error) = consumer.commit_message(&message, CommitMode::Async) {
            warn!(?error, "announcer-service failed to commit consumed event");
        }
    }
}

/// Delivery failures are logged; the event is not retried.
async fn handle_slot_event(state: &AppState, event: &SlotEvent) {
    let message = render_announcement(event);
    match state.chat_sender.send(&message).await {
        Ok(()) => info!(
            slot = event.slot,
            event_type = ?event.event_type,
            destination = %event.destination,
            "announcement delivered"
        ),
        Err(error) => warn!(
            slot = event.slot,
            event_type = ?event.event_type,
            destination = %event.destination,
            error = %error,
            "announcement delivery failed"
        ),
    }
}

fn render_announcement(event: &SlotEvent) -> OutboundMessage {
    let text = match event.event_type {
        SlotEventType::Registered => format!(
            "New registration: {} — {} (slot {})",
            event.team_name, event.captain_handle, event.slot
        ),
        SlotEventType::ReservePromoted => format!(
            "Reserve promoted: {} — {} (slot {})",
            event.team_name, event.captain_handle, event.slot
        ),
    };

    let actions = event
        .actions
        .iter()
        .filter_map(|token| match ActionToken::parse(token) {
            Ok(parsed) => Some(action_button(parsed)),
            Err(error) => {
                warn!(event_id = %event.event_id, error = %error, "dropping unknown action token");
                None
            }
        })
        .collect();

    OutboundMessage {
        chat: event.destination.clone(),
        text,
        actions,
    }
}

fn action_button(token: ActionToken) -> ActionButton {
    let label = match token {
        ActionToken::Confirm(_) => "✅ Confirm",
        ActionToken::Cancel(_) => "❌ Cancel",
    };
    ActionButton::Callback {
        label: label.to_string(),
        data: token.encode(),
    }
}
