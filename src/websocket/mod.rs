//! WebSocket message channel: the upgrade endpoint and per-connection loops.

mod connection;

use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::{IntoResponse, Response};

use crate::http::AppState;
use crate::protocol::{ErrorCode, RoomError};

/// `GET /room/{code}/ws`: attach a message channel to a room.
///
/// The room is resolved before the upgrade so an unknown code gets a clean
/// 404 instead of an accepted-then-dropped socket.
pub async fn ws_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
    ws: WebSocketUpgrade,
) -> Response {
    let code = code.to_uppercase();
    let Some(room) = state.registry.get(&code) else {
        return RoomError::new(ErrorCode::RoomNotFound).into_response();
    };
    let queue_capacity = state.config.server.subscriber_queue_capacity;
    ws.max_message_size(state.config.server.max_message_size)
        .on_upgrade(move |socket| connection::handle_socket(socket, room, queue_capacity))
}
