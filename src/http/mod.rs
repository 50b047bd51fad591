//! Thin, stateless HTTP control surface.
//!
//! Three room actions (`create`, `join`, `start`) translate into room actor
//! commands and return the resulting snapshot; everything else about a room
//! happens over its message channel. The suggestion and health endpoints sit
//! alongside for the client and for deployment probes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;

use crate::config::Config;
use crate::protocol::{ErrorCode, ErrorReply, RoomActionRequest, RoomError};
use crate::providers::ItemStore;
use crate::registry::RoomRegistry;
use crate::websocket;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<RoomRegistry>,
    pub items: Arc<dyn ItemStore>,
    pub config: Arc<Config>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/room/{code}", post(room_action).get(room_snapshot))
        .route("/room/{code}/ws", get(websocket::ws_handler))
        .route("/suggestion", get(suggestion))
        .route("/healthz", get(healthz))
        .with_state(state)
}

/// `POST /room/{code}`: create (with `new` or an explicit code), join, or
/// start.
async fn room_action(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(request): Json<RoomActionRequest>,
) -> Response {
    let code = code.to_uppercase();
    match request {
        RoomActionRequest::Create { nickname, config } => {
            // "NEW" asks the server to sample a fresh code; anything else is
            // an explicit code claim.
            let explicit = (code != "NEW").then_some(code.as_str());
            match state
                .registry
                .create_room(explicit, &nickname, config.as_ref())
            {
                Ok(reply) => Json(reply).into_response(),
                Err(error) => error.into_response(),
            }
        }
        RoomActionRequest::Join { nickname } => {
            let handle = match state.registry.get(&code) {
                Some(handle) => handle,
                None => return RoomError::new(ErrorCode::RoomNotFound).into_response(),
            };
            match handle.join(nickname).await {
                Ok(reply) => Json(reply).into_response(),
                Err(error) => error.into_response(),
            }
        }
        RoomActionRequest::Start { player_id } => {
            let handle = match state.registry.get(&code) {
                Some(handle) => handle,
                None => return RoomError::new(ErrorCode::RoomNotFound).into_response(),
            };
            let Some(player_id) = player_id else {
                return RoomError::with_message(
                    ErrorCode::PlayerNotFound,
                    "start requires a playerId",
                )
                .into_response();
            };
            match handle.start(player_id).await {
                Ok(reply) => Json(reply).into_response(),
                Err(error) => error.into_response(),
            }
        }
    }
}

/// `GET /room/{code}`: current snapshot or 404.
async fn room_snapshot(State(state): State<AppState>, Path(code): Path<String>) -> Response {
    let code = code.to_uppercase();
    let Some(handle) = state.registry.get(&code) else {
        return RoomError::new(ErrorCode::RoomNotFound).into_response();
    };
    match handle.snapshot().await {
        Ok(reply) => Json(reply).into_response(),
        Err(error) => error.into_response(),
    }
}

/// `GET /suggestion`: one random previously-submitted item, or 204 when the
/// store has nothing to offer.
async fn suggestion(State(state): State<AppState>) -> Response {
    match state.items.sample(1).await.into_iter().next() {
        Some(suggestion) => Json(suggestion).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn healthz(State(state): State<AppState>) -> Response {
    Json(json!({
        "status": "ok",
        "rooms": state.registry.room_count(),
    }))
    .into_response()
}

impl IntoResponse for RoomError {
    fn into_response(self) -> Response {
        let status = self.code.status_code();
        let body = ErrorReply {
            error: self.code,
            message: self.message,
        };
        (status, Json(body)).into_response()
    }
}
