//! Per-connection read and write pumps.
//!
//! Every connection runs two tasks:
//! 1. The read pump decodes frames and submits them to the room
//! 2. The write pump drains the connection's outbound queue to the socket
//!
//! Either pump ending unregisters the connection. Only the room closes the
//! outbound queue; the write pump answers that with a close frame.

use std::sync::Arc;

use axum::extract::ws::Message;
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;

use crate::domain::foundation::UserId;

use super::messages::{ClientMessage, ServerMessage};
use super::room::{ConnectionId, RoomClosed, RoomHandle};

/// A client attached to a room.
pub struct Connection {
    id: ConnectionId,
    user_id: UserId,
    room: RoomHandle,
}

impl Connection {
    /// Register with `room` and return the connection plus its outbound queue.
    ///
    /// The first frame in the queue is already the snapshot (or the error
    /// that replaced it) when this returns.
    pub async fn join(
        room: RoomHandle,
        user_id: UserId,
        outbound_capacity: usize,
    ) -> Result<(Self, mpsc::Receiver<Arc<ServerMessage>>), RoomClosed> {
        let id = ConnectionId::new();
        let (tx, rx) = mpsc::channel(outbound_capacity.max(1));
        room.register(id, user_id.clone(), tx).await?;
        Ok((Self { id, user_id, room }, rx))
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Pump frames between `socket` and the room until either side stops.
    pub async fn attach<S>(self, socket: S, outbound: mpsc::Receiver<Arc<ServerMessage>>)
    where
        S: Sink<Message, Error = axum::Error>
            + Stream<Item = Result<Message, axum::Error>>
            + Send
            + 'static,
    {
        let (sink, stream) = socket.split();
        let Connection { id, user_id, room } = self;

        let mut send_task = tokio::spawn(write_pump(sink, outbound, room.clone(), id));
        let mut recv_task = tokio::spawn(read_pump(stream, room.clone(), id, user_id));

        // Wait for either task to finish
        tokio::select! {
            _ = &mut send_task => recv_task.abort(),
            _ = &mut recv_task => send_task.abort(),
        }

        room.unregister(&id);
        tracing::debug!(room = %room.key(), connection_id = %id, "Connection closed");
    }
}

/// Write queued frames to the socket in order.
///
/// Ends when the room closes the queue (a close frame is sent first) or when
/// a write fails (the connection is unregistered).
pub async fn write_pump<W>(
    mut sink: W,
    mut outbound: mpsc::Receiver<Arc<ServerMessage>>,
    room: RoomHandle,
    id: ConnectionId,
) where
    W: Sink<Message, Error = axum::Error> + Unpin,
{
    while let Some(frame) = outbound.recv().await {
        let json = match serde_json::to_string(frame.as_ref()) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(connection_id = %id, "Failed to encode frame: {}", e);
                continue;
            }
        };

        if let Err(e) = sink.send(Message::Text(json)).await {
            tracing::debug!(connection_id = %id, "Send error, closing connection: {}", e);
            room.unregister(&id);
            return;
        }
    }

    // Peer may already be gone.
    let _ = sink.send(Message::Close(None)).await;
}

/// Decode socket frames and submit them to the room.
///
/// Text and binary frames are both parsed as JSON. A frame that fails to
/// decode, a transport error or a close frame ends the pump and unregisters
/// the connection.
pub async fn read_pump<R>(mut stream: R, room: RoomHandle, id: ConnectionId, user_id: UserId)
where
    R: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    while let Some(result) = stream.next().await {
        let decoded = match result {
            Ok(Message::Text(text)) => serde_json::from_str::<ClientMessage>(&text),
            Ok(Message::Binary(bytes)) => serde_json::from_slice::<ClientMessage>(&bytes),
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
            Ok(Message::Close(_)) => {
                tracing::debug!(connection_id = %id, "Client sent close frame");
                break;
            }
            Err(e) => {
                tracing::debug!(connection_id = %id, "Receive error: {}", e);
                break;
            }
        };

        let message = match decoded {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!(connection_id = %id, "Undecodable frame, closing: {}", e);
                break;
            }
        };

        if let Err(e) = room.submit(id, user_id.clone(), message).await {
            tracing::debug!(connection_id = %id, "{}", e);
            break;
        }
    }

    room.unregister(&id);
}
