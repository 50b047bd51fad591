use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::protocol::ClientMessage;
use crate::room::RoomHandle;

/// Drive one subscriber: a write loop draining the hub's bounded queue and a
/// read loop parsing control messages into room commands.
///
/// The subscriber starts anonymous; identity arrives with the client's
/// `identify` message. Everything stateful happens inside the room actor, so
/// this function only shuttles frames.
pub(super) async fn handle_socket(socket: WebSocket, room: RoomHandle, queue_capacity: usize) {
    let (mut sender, mut receiver) = socket.split();
    let subscriber_id = Uuid::new_v4();
    let (tx, mut rx) = mpsc::channel::<Bytes>(queue_capacity);

    if room.subscribe(subscriber_id, tx).await.is_err() {
        // Room torn down between lookup and attach.
        let _ = sender.close().await;
        return;
    }
    tracing::debug!(
        room_code = %room.code(),
        %subscriber_id,
        "subscriber attached"
    );

    // Outbound: the hub closes our queue to disconnect us (slow consumer,
    // missed heartbeats, room teardown), which ends this task and the socket.
    let send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let Ok(text) = Utf8Bytes::try_from(frame) else {
                continue;
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    });

    // Inbound: parse and forward. Malformed frames are logged and dropped
    // rather than answered; the error taxonomy covers only well-formed
    // commands.
    while let Some(message) = receiver.next().await {
        let message = match message {
            Ok(message) => message,
            Err(error) => {
                tracing::debug!(%subscriber_id, %error, "websocket read error");
                break;
            }
        };
        match message {
            Message::Text(text) => match serde_json::from_str::<ClientMessage>(text.as_str()) {
                Ok(parsed) => room.client_message(subscriber_id, parsed).await,
                Err(error) => {
                    tracing::debug!(%subscriber_id, %error, "ignoring malformed frame");
                }
            },
            Message::Close(_) => break,
            Message::Binary(_) => {
                tracing::debug!(%subscriber_id, "ignoring unexpected binary frame");
            }
            // Protocol-level ping/pong is handled by the transport.
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }

    room.unsubscribe(subscriber_id).await;
    send_task.abort();
    tracing::debug!(room_code = %room.code(), %subscriber_id, "subscriber detached");
}
