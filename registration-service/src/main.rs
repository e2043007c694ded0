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

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use lambda_http::run as lambda_run;
use rdkafka::{
    config::ClientConfig,
    producer::{FutureProducer, FutureRecord},
};
use tokio::sync::RwLock;
use tourney_common::{
    ActionButton, ChatGatewayClient, ChatSender, ChatUpdate, Command, CommandReply,
    DEFAULT_SLOT_EVENTS_TOPIC, ParseError, ProofRules, ProofValidator, ProofVerdict,
    RegistryError, ReserveListing, SlotEvent, SlotSummary, TournamentState, UserId, broadcast,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};

#[derive(Clone)]
struct AppState {
    store: Arc<RwLock<TournamentState>>,
    admin_id: UserId,
    proof_validator: Arc<ProofValidator>,
    slot_event_publisher: Arc<dyn SlotEventPublisher>,
    chat_sender: Arc<dyn ChatSender>,
    upsell_url: String,
}

#[async_trait]
trait SlotEventPublisher: Send + Sync {
    async fn publish_slot_event(&self, event: &SlotEvent) -> anyhow::Result<()>;
}

#[derive(Clone)]
struct KafkaSlotEventPublisher {
    producer: FutureProducer,
    topic: String,
}

impl KafkaSlotEventPublisher {
    fn from_env() -> anyhow::Result<Self> {
        let bootstrap_servers = std::env::var("KAFKA_BOOTSTRAP_SERVERS")
            .ok()
            .unwrap_or_else(|| "kafka:9092".to_string());
        let producer = ClientConfig::new()
            .set("bootstrap.servers", bootstrap_servers)
            .set("message.timeout.ms", "5000")
            .create()
            .context("failed to create Kafka slot-event producer")?;
        let topic = std::env::var("SLOT_EVENTS_TOPIC")
            .ok()
            .unwrap_or_else(|| DEFAULT_SLOT_EVENTS_TOPIC.to_string());
        Ok(Self { producer, topic })
    }
}

#[async_trait]
impl SlotEventPublisher for KafkaSlotEventPublisher {
    async fn publish_slot_event(&self, event: &SlotEvent) -> anyhow::Result<()> {
        let payload = serde_json::to_string(event).context("failed to encode slot event")?;
        let key = event.slot.to_string();
        self.producer
            .send(
                FutureRecord::to(&self.topic).key(&key).payload(&payload),
                std::time::Duration::from_secs(5),
            )
            .await
            .map_err(|(error, _)| anyhow::anyhow!("Kafka publish failed: {error:?}"))?;
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "registration_service=debug,tower_http=info".to_string()),
        )
        .init();

    let admin_id = parse_admin_id()?;
    let proof_rules = load_proof_rules_config().unwrap_or_default();
    info!(
        min_links = proof_rules.min_links,
        rule_count = proof_rules.rules.len(),
        "proof rules ready"
    );

    let state = AppState {
        store: Arc::new(RwLock::new(TournamentState::new(admin_id))),
        admin_id,
        proof_validator: Arc::new(ProofValidator::new(proof_rules)),
        slot_event_publisher: Arc::new(KafkaSlotEventPublisher::from_env()?),
        chat_sender: Arc::new(ChatGatewayClient::from_env()),
        upsell_url: std::env::var("UPSELL_URL")
            .ok()
            .unwrap_or_else(|| "https://t.me/your_username".to_string()),
    };

    let app = build_router(state);

    if std::env::var("AWS_LAMBDA_RUNTIME_API").is_ok() {
        info!("AWS Lambda runtime detected; running registration-service in lambda mode");
        lambda_run(app)
            .await
            .map_err(|e| anyhow::Error::msg(format!("lambda runtime error: {e}")))?;
        return Ok(());
    }

    let bind_addr = parse_bind_addr("REGISTRATION_BIND", "0.0.0.0:8085")?;
    info!(%bind_addr, "registration-service listening");
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn parse_admin_id() -> anyhow::Result<UserId> {
    let raw = std::env::var("ADMIN_ID").context("ADMIN_ID must be set")?;
    raw.trim()
        .parse()
        .context(format!("invalid ADMIN_ID {raw:?}"))
}

fn load_proof_rules_config() -> Option<ProofRules> {
    let path = std::env::var("PROOF_RULES_CONFIG_PATH")
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())?;

    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(error) => {
            warn!(path = %path, error = %error, "failed to read proof rules config file");
            return None;
        }
    };

    match ProofRules::from_yaml_str(&raw) {
        Ok(rules) => {
            info!(path = %path, "loaded proof rules from YAML config");
            Some(rules)
        }
        Err(error) => {
            warn!(path = %path, error = %error, "failed to parse proof rules config yaml");
            None
        }
    }
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/updates", post(update_handler))
        .route("/v1/slots", get(list_slots_handler))
        .route("/v1/reserve", get(list_reserve_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn parse_bind_addr(var_name: &str, default: &str) -> anyhow::Result<SocketAddr> {
    let value = std::env::var(var_name)
        .ok()
        .unwrap_or_else(|| default.to_string());
    value.parse().context(format!("invalid {var_name}"))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"ok": true, "service": "registration-service"}))
}

async fn list_slots_handler(State(state): State<AppState>) -> Json<Vec<SlotSummary>> {
    Json(state.store.read().await.list_slots())
}

async fn list_reserve_handler(State(state): State<AppState>) -> Json<Vec<ReserveListing>> {
    Json(state.store.read().await.list_reserve())
}

async fn update_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatUpdate>, JsonRejection>,
) -> Result<Json<CommandReply>, ApiError> {
    let Json(update) = payload
        .map_err(|rejection| ApiError::bad_request(format!("invalid chat update: {rejection}")))?;
    Ok(Json(dispatch(&state, &update).await))
}

fn authorize(command_requires_admin: bool, user_id: UserId, admin_id: UserId) -> bool {
    !command_requires_admin || user_id == admin_id
}

/// Parses the update, applies the admin check, then runs the command. Every
/// failure is turned into a reply for this update alone.
async fn dispatch(state: &AppState, update: &ChatUpdate) -> CommandReply {
    let user_id = update.user_id();
    let parsed = match update {
        ChatUpdate::Message { text, .. } => Command::parse_message(text),
        ChatUpdate::Callback { data, .. } => Command::parse_callback(data).map(Some),
    };

    let command = match parsed {
        Ok(Some(command)) => command,
        Ok(None) => return CommandReply::ignored(),
        Err(error) if !authorize(error.requires_admin(), user_id, state.admin_id) => {
            return CommandReply::ignored();
        }
        Err(ParseError::Usage(usage)) => return CommandReply::rejected(usage),
        Err(error @ ParseError::UnknownAction(_)) => {
            warn!(user_id, error = %error, "ignoring malformed callback");
            return CommandReply::ignored();
        }
    };

    if !authorize(command.requires_admin(), user_id, state.admin_id) {
        debug!(user_id, command = command.name(), "ignoring admin command from non-admin");
        return CommandReply::ignored();
    }

    execute(state, update, command).await
}

async fn execute(state: &AppState, update: &ChatUpdate, command: Command) -> CommandReply {
    let user_id = update.user_id();
    let chat_id = update.chat_id();

    match command {
        Command::Register {
            team_name,
            captain_handle,
        } => {
            let result = {
                let mut store = state.store.write().await;
                store.register(team_name, captain_handle, user_id)
            };
            match result {
                Ok(outcome) => {
                    let registration = &outcome.registration;
                    info!(
                        slot = registration.slot,
                        team = %registration.team_name,
                        captain_id = user_id,
                        "team registered"
                    );
                    let reply = CommandReply::applied(format!(
                        "✅ {} registered in slot {}",
                        registration.team_name, registration.slot
                    ));
                    announce(state, outcome.announcement).await;
                    reply
                }
                Err(RegistryError::QuotaExceeded(_)) => {
                    info!(user_id, "free registration already used");
                    CommandReply::rejected("❌ You have already used your free registration.")
                        .with_action(ActionButton::Url {
                            label: "💸 Buy access".to_string(),
                            url: state.upsell_url.clone(),
                        })
                }
                Err(error) => CommandReply::rejected(error.to_string()),
            }
        }
        Command::Confirm { slot } => {
            let result = {
                let mut store = state.store.write().await;
                store.confirm(slot, user_id)
            };
            match result {
                Ok(outcome) => {
                    if outcome.newly_confirmed {
                        info!(slot, team = %outcome.registration.team_name, "slot confirmed");
                    }
                    CommandReply::edit_original(format!(
                        "✅ {} confirmed slot {}",
                        outcome.registration.team_name, slot
                    ))
                }
                Err(error) => slot_error_reply(error, user_id),
            }
        }
        Command::Cancel { slot } => {
            let result = {
                let mut store = state.store.write().await;
                store.cancel(slot, user_id)
            };
            match result {
                Ok(outcome) => {
                    info!(slot, team = %outcome.cancelled.team_name, "slot cancelled");
                    match &outcome.promoted {
                        Some(promoted) => {
                            info!(slot, team = %promoted.team_name, "reserve team promoted")
                        }
                        None => info!(slot, "slot left vacant; reserve queue empty"),
                    }
                    let reply = CommandReply::edit_original(format!(
                        "❌ {} gave up slot {}.",
                        outcome.cancelled.team_name, slot
                    ));
                    announce(state, outcome.announcement).await;
                    reply
                }
                Err(error) => slot_error_reply(error, user_id),
            }
        }
        Command::ListSlots => {
            let slots = state.store.read().await.list_slots();
            CommandReply::applied(format_slot_list(&slots))
        }
        Command::AddReserve {
            team_name,
            captain_handle,
        } => {
            let position = {
                let mut store = state.store.write().await;
                store.add_reserve(team_name.clone(), captain_handle)
            };
            info!(team = %team_name, position, "team added to reserve");
            CommandReply::applied(format!("✅ Added to reserve (position {position})"))
        }
        Command::ListReserve => {
            let reserve = state.store.read().await.list_reserve();
            CommandReply::applied(format_reserve_list(&reserve))
        }
        Command::DumpRegistrations => {
            let registrations = state.store.read().await.registry.registrations();
            match serde_json::to_string_pretty(&registrations) {
                Ok(dump) => CommandReply::applied(dump),
                Err(error) => {
                    warn!(error = %error, "failed to render registration dump");
                    CommandReply::rejected("Failed to render registrations")
                }
            }
        }
        Command::ResetQuota => {
            let cleared = state.store.write().await.reset_quota();
            info!(cleared, "free registration limits reset");
            CommandReply::applied("Limits reset.")
        }
        Command::GrantAccess { user_id: grantee } => {
            let granted = state.store.write().await.grant_access(grantee);
            if granted {
                info!(user_id = grantee, "access granted");
                CommandReply::applied(format!("✅ Access granted to {grantee}"))
            } else {
                CommandReply::applied(format!("{grantee} already has access"))
            }
        }
        Command::EnableAutocheck => {
            let qualifies = matches!(
                update,
                ChatUpdate::Message { chat_kind, .. } if chat_kind.allows_self_service_autocheck()
            );
            if !qualifies {
                return CommandReply::rejected("This command only works in groups.");
            }
            state.store.write().await.enable_room(chat_id);
            info!(chat_id, "proof auto-check enabled");
            CommandReply::applied("✅ Auto-check enabled. Send your proofs.")
        }
        Command::ApproveRoom { chat_id: room } => {
            state.store.write().await.enable_room(room);
            info!(chat_id = room, "room approved for proof auto-check");
            CommandReply::applied(format!("✅ Connected: {room}"))
        }
        Command::SetAnnounceTarget { destination } => {
            state
                .store
                .write()
                .await
                .set_announce_target(destination.clone());
            info!(destination = %destination, "captains' chat set");
            CommandReply::applied("✅ Captains' chat set")
        }
        Command::Broadcast { text } => {
            let recipients = state.store.read().await.broadcast_recipients();
            let report = broadcast(state.chat_sender.as_ref(), &recipients, &text).await;
            debug!(
                delivered = report.delivered,
                failed = report.failed,
                "broadcast acknowledged"
            );
            CommandReply::applied("✅ Broadcast complete")
        }
        Command::SubmitProof { text } => {
            if !state.store.read().await.is_room_enabled(chat_id) {
                return CommandReply::ignored();
            }
            match state.proof_validator.validate_text(&text) {
                ProofVerdict::InsufficientProofs { found } => {
                    debug!(chat_id, found, "not enough links for a proof check");
                    CommandReply::ignored()
                }
                ProofVerdict::Checked(result) if result.passed => {
                    info!(chat_id, user_id, "proofs passed");
                    CommandReply::applied("✅ Proofs accepted")
                }
                ProofVerdict::Checked(result) => {
                    let missing: Vec<&str> = result
                        .failed_requirements
                        .iter()
                        .map(String::as_str)
                        .collect();
                    info!(chat_id, user_id, missing = ?missing, "proofs failed");
                    CommandReply::rejected(format!(
                        "❌ Missing subscription to: {}",
                        missing.join(", ")
                    ))
                }
            }
        }
    }
}

fn slot_error_reply(error: RegistryError, user_id: UserId) -> CommandReply {
    match error {
        RegistryError::NotFound(slot) => {
            debug!(slot, user_id, "slot action on vacant slot");
            CommandReply::rejected(format!("Slot {slot} is not registered."))
        }
        RegistryError::NotCaptain(slot) => {
            debug!(slot, user_id, "slot action by non-captain");
            CommandReply::alert("You are not the captain of this team.")
        }
        RegistryError::QuotaExceeded(_) => CommandReply::rejected(error.to_string()),
    }
}

/// Publishes after the store lock has been released. The state change stands
/// even if the announcement is lost.
async fn announce(state: &AppState, announcement: Option<SlotEvent>) {
    let Some(event) = announcement else {
        return;
    };

    if let Err(error) = state.slot_event_publisher.publish_slot_event(&event).await {
        warn!(
            slot = event.slot,
            event_type = ?event.event_type,
            error = %error,
            "failed to publish slot event"
        );
    } else {
        info!(
            slot = event.slot,
            event_type = ?event.event_type,
            destination = %event.destination,
            "published slot event"
        );
    }
}

fn format_slot_list(slots: &[SlotSummary]) -> String {
    if slots.is_empty() {
        return "No teams registered yet".to_string();
    }
    slots
        .iter()
        .map(|slot| format!("Slot {}: {} — {}", slot.slot, slot.team_name, slot.status.marker()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_reserve_list(reserve: &[ReserveListing]) -> String {
    if reserve.is_empty() {
        return "Reserve is empty".to_string();
    }
    reserve
        .iter()
        .map(|entry| format!("{}. {} — {}", entry.position, entry.team_name, entry.captain_handle))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!(status = %self.status, message = %self.message, "request failed");
        (
            self.status,
            Json(serde_json::json!({"error": self.message})),
        )
            .into_response()
    }
}
