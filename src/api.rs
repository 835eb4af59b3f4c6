use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};

use crate::line::{self, PushSink, WebhookEnvelope};
use crate::notifier::Notifier;
use crate::registry::UserRegistry;

/// The one inbound command the bot understands.
pub const CHECK_COMMAND: &str = "コミット確認";

const FALLBACK_MESSAGE: &str =
    "申し訳ありませんが、そのメッセージは認識できません。'コミット確認'と入力してください。";

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<UserRegistry>,
    pub notifier: Arc<Notifier>,
    pub sink: Arc<dyn PushSink>,
    pub channel_secret: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/callback", post(handle_callback))
        .route("/health", get(handle_health))
        .with_state(state)
}

async fn handle_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let signature = headers
        .get("X-Line-Signature")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    // The signature covers the raw body, so verification has to happen
    // before any parsing.
    if !line::verify_signature(&state.channel_secret, &body, signature) {
        tracing::error!("Invalid webhook signature, check the channel secret");
        return (StatusCode::BAD_REQUEST, "invalid signature");
    }

    let envelope: WebhookEnvelope = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::error!("Malformed webhook body: {e}");
            return (StatusCode::BAD_REQUEST, "malformed body");
        }
    };

    for event in &envelope.events {
        let Some((user_id, text)) = event.text_message() else {
            continue;
        };
        handle_text(&state, user_id, text).await;
    }

    (StatusCode::OK, "OK")
}

async fn handle_text(state: &AppState, user_id: &str, text: &str) {
    tracing::info!("Received message from {user_id}: {text}");

    if state.registry.add(user_id) {
        tracing::info!("Registered new user ({} total)", state.registry.len());
    }

    if text == CHECK_COMMAND {
        state.notifier.check_and_notify(user_id, true).await;
    } else if let Err(e) = state.sink.send_text(user_id, FALLBACK_MESSAGE).await {
        tracing::error!("Failed to send fallback reply to {user_id}: {e}");
    }
}

async fn handle_health() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "status": "ok",
        "name": "kusabot",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
