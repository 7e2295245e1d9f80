//! Document room: the single serialization point for one document.
//!
//! Each room runs as its own task and owns the set of connected clients.
//! Registration, unregistration and inbound frames arrive on separate
//! channels and are handled one at a time, so edits to a document are applied
//! in a strict total order and the client set needs no lock.
//!
//! # Architecture
//!
//! ```text
//!   register ──────┐
//!   unregister ────┼──► Room task ──► Apply/RevertToVersion handlers ──► DocumentRepository
//!   inbound (64) ──┘        │
//!                           └──► try_send ──► outbound (256) per connection
//! ```
//!
//! A connection whose outbound queue is full when a frame is delivered is
//! evicted: its sender is dropped, which closes the queue exactly once.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::application::handlers::document::{
    ApplyOperationCommand, ApplyOperationHandler, GetDocumentHandler, GetDocumentQuery,
    RevertToVersionCommand, RevertToVersionHandler, StorageDeadline,
};
use crate::domain::foundation::{DocumentId, TenantId, UserId};
use crate::ports::DocumentRepository;

use super::messages::{ClientMessage, ClientMessageKind, ServerMessage};

/// Unique identifier for a WebSocket connection.
///
/// Generated server-side when a client connects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Create a new random connection ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a room: one document of one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomKey {
    pub tenant_id: TenantId,
    pub document_id: DocumentId,
}

impl RoomKey {
    pub fn new(tenant_id: TenantId, document_id: DocumentId) -> Self {
        Self {
            tenant_id,
            document_id,
        }
    }
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tenant_id, self.document_id)
    }
}

/// The room task has stopped and no longer accepts input.
#[derive(Debug, Clone, Error)]
#[error("Room {0} is closed")]
pub struct RoomClosed(pub RoomKey);

/// Application services a room calls into.
#[derive(Clone)]
pub struct CollaborationServices {
    pub apply_operation: Arc<ApplyOperationHandler>,
    pub revert_to_version: Arc<RevertToVersionHandler>,
    pub get_document: Arc<GetDocumentHandler>,
}

impl CollaborationServices {
    /// Build the services over one repository, bounding every storage call
    /// by `deadline`.
    pub fn new(repository: Arc<dyn DocumentRepository>, deadline: StorageDeadline) -> Self {
        Self {
            apply_operation: Arc::new(
                ApplyOperationHandler::new(repository.clone()).with_deadline(deadline),
            ),
            revert_to_version: Arc::new(
                RevertToVersionHandler::new(repository.clone()).with_deadline(deadline),
            ),
            get_document: Arc::new(GetDocumentHandler::new(repository).with_deadline(deadline)),
        }
    }
}

/// Outbound half handed to the room when a connection joins.
pub type OutboundSender = mpsc::Sender<Arc<ServerMessage>>;

struct Registration {
    connection_id: ConnectionId,
    user_id: UserId,
    outbound: OutboundSender,
    joined: oneshot::Sender<()>,
}

struct InboundEvent {
    connection_id: ConnectionId,
    user_id: UserId,
    message: ClientMessage,
}

struct RoomChannels {
    key: RoomKey,
    register: mpsc::UnboundedSender<Registration>,
    unregister: mpsc::UnboundedSender<ConnectionId>,
    inbound: mpsc::Sender<InboundEvent>,
}

/// Cloneable handle to a running room.
///
/// The room task exits once every handle is dropped and its queues are
/// drained.
#[derive(Clone)]
pub struct RoomHandle {
    channels: Arc<RoomChannels>,
}

impl RoomHandle {
    pub fn key(&self) -> &RoomKey {
        &self.channels.key
    }

    /// Number of live handles, the hub's own included.
    pub fn holder_count(&self) -> usize {
        Arc::strong_count(&self.channels)
    }

    /// Add a connection and wait until its first frame has been queued.
    ///
    /// The first frame is a `snapshot` of the document, or an `error` frame if
    /// the document could not be loaded. Nothing broadcast afterwards can
    /// overtake it.
    pub async fn register(
        &self,
        connection_id: ConnectionId,
        user_id: UserId,
        outbound: OutboundSender,
    ) -> Result<(), RoomClosed> {
        let (joined, ack) = oneshot::channel();
        self.channels
            .register
            .send(Registration {
                connection_id,
                user_id,
                outbound,
                joined,
            })
            .map_err(|_| self.closed())?;
        ack.await.map_err(|_| self.closed())
    }

    /// Remove a connection. Safe to call any number of times, including for
    /// connections that never registered.
    pub fn unregister(&self, connection_id: &ConnectionId) {
        // A stopped room has no clients left to remove.
        let _ = self.channels.unregister.send(*connection_id);
    }

    /// Queue a frame for the room, waiting while the inbound queue is full.
    pub async fn submit(
        &self,
        connection_id: ConnectionId,
        user_id: UserId,
        message: ClientMessage,
    ) -> Result<(), RoomClosed> {
        self.channels
            .inbound
            .send(InboundEvent {
                connection_id,
                user_id,
                message,
            })
            .await
            .map_err(|_| self.closed())
    }

    fn closed(&self) -> RoomClosed {
        RoomClosed(self.channels.key.clone())
    }
}

struct ClientEntry {
    user_id: UserId,
    outbound: OutboundSender,
}

/// The room actor.
pub struct Room {
    key: RoomKey,
    services: CollaborationServices,
    clients: HashMap<ConnectionId, ClientEntry>,
    register_rx: mpsc::UnboundedReceiver<Registration>,
    unregister_rx: mpsc::UnboundedReceiver<ConnectionId>,
    inbound_rx: mpsc::Receiver<InboundEvent>,
    predecessor: Option<JoinHandle<()>>,
}

impl Room {
    /// Start a room task.
    ///
    /// When `predecessor` is given the new room waits for that task to finish
    /// before handling anything, so edits queued in a reaped room are applied
    /// before edits sent to its replacement.
    pub fn spawn(
        key: RoomKey,
        services: CollaborationServices,
        inbound_capacity: usize,
        predecessor: Option<JoinHandle<()>>,
    ) -> (RoomHandle, JoinHandle<()>) {
        let (register, register_rx) = mpsc::unbounded_channel();
        let (unregister, unregister_rx) = mpsc::unbounded_channel();
        let (inbound, inbound_rx) = mpsc::channel(inbound_capacity.max(1));

        let handle = RoomHandle {
            channels: Arc::new(RoomChannels {
                key: key.clone(),
                register,
                unregister,
                inbound,
            }),
        };

        let room = Room {
            key,
            services,
            clients: HashMap::new(),
            register_rx,
            unregister_rx,
            inbound_rx,
            predecessor,
        };

        (handle, tokio::spawn(room.run()))
    }

    async fn run(mut self) {
        if let Some(predecessor) = self.predecessor.take() {
            if let Err(e) = predecessor.await {
                tracing::warn!(room = %self.key, "Previous room task failed: {}", e);
            }
        }

        tracing::debug!(room = %self.key, "Room started");

        loop {
            tokio::select! {
                biased;

                Some(connection_id) = self.unregister_rx.recv() => {
                    self.remove_client(&connection_id);
                }
                Some(registration) = self.register_rx.recv() => {
                    self.add_client(registration).await;
                }
                Some(event) = self.inbound_rx.recv() => {
                    self.dispatch(event).await;
                }
                else => break,
            }
        }

        tracing::debug!(room = %self.key, "Room stopped");
    }

    async fn add_client(&mut self, registration: Registration) {
        let Registration {
            connection_id,
            user_id,
            outbound,
            joined,
        } = registration;

        let first = match self
            .services
            .get_document
            .handle(GetDocumentQuery {
                tenant_id: self.key.tenant_id.clone(),
                document_id: self.key.document_id.clone(),
            })
            .await
        {
            Ok(document) => ServerMessage::snapshot(&self.key, &user_id, &document),
            Err(e) => {
                tracing::warn!(
                    room = %self.key,
                    connection_id = %connection_id,
                    "Could not load document for snapshot: {}",
                    e
                );
                ServerMessage::error(&self.key, &user_id, e.to_string())
            }
        };

        tracing::debug!(
            room = %self.key,
            connection_id = %connection_id,
            user_id = %user_id,
            "Client joined"
        );

        self.clients
            .insert(connection_id, ClientEntry { user_id, outbound });
        self.send_to(&connection_id, Arc::new(first));

        // The joiner may have given up waiting; it is evicted on the next send.
        let _ = joined.send(());
    }

    fn remove_client(&mut self, connection_id: &ConnectionId) {
        if let Some(entry) = self.clients.remove(connection_id) {
            tracing::debug!(
                room = %self.key,
                connection_id = %connection_id,
                user_id = %entry.user_id,
                "Client left"
            );
        }
    }

    async fn dispatch(&mut self, event: InboundEvent) {
        let InboundEvent {
            connection_id,
            user_id,
            message,
        } = event;

        match message.kind {
            ClientMessageKind::Operation => {
                let Some(new_content) = message.new_content else {
                    let error = ServerMessage::error(&self.key, &user_id, "newContent is required");
                    self.send_to(&connection_id, Arc::new(error));
                    return;
                };

                let cmd = ApplyOperationCommand {
                    tenant_id: self.key.tenant_id.clone(),
                    document_id: self.key.document_id.clone(),
                    user_id: user_id.clone(),
                    delta: message.delta.unwrap_or_default(),
                    new_content,
                    lamport: message.lamport.unwrap_or_default(),
                    label: message.label.unwrap_or_default(),
                };

                match self.services.apply_operation.handle(cmd).await {
                    Ok(applied) => {
                        tracing::debug!(
                            room = %self.key,
                            user_id = %user_id,
                            version = applied.document.version(),
                            "Operation applied"
                        );
                        self.broadcast(ServerMessage::update(&self.key, &user_id, applied));
                    }
                    Err(e) => {
                        tracing::warn!(
                            room = %self.key,
                            connection_id = %connection_id,
                            code = %e.code(),
                            "Operation rejected: {}",
                            e
                        );
                        let error = ServerMessage::error(&self.key, &user_id, e.to_string());
                        self.send_to(&connection_id, Arc::new(error));
                    }
                }
            }
            ClientMessageKind::Revert => {
                let Some(version_id) = message.version_id else {
                    let error = ServerMessage::error(&self.key, &user_id, "versionId is required");
                    self.send_to(&connection_id, Arc::new(error));
                    return;
                };

                let cmd = RevertToVersionCommand {
                    tenant_id: self.key.tenant_id.clone(),
                    document_id: self.key.document_id.clone(),
                    version_id,
                    user_id: user_id.clone(),
                };

                match self.services.revert_to_version.handle(cmd).await {
                    Ok((document, version)) => {
                        tracing::debug!(
                            room = %self.key,
                            user_id = %user_id,
                            version = document.version(),
                            "Revert applied"
                        );
                        self.broadcast(ServerMessage::reverted(
                            &self.key, &user_id, &document, version,
                        ));
                    }
                    Err(e) => {
                        tracing::warn!(
                            room = %self.key,
                            connection_id = %connection_id,
                            code = %e.code(),
                            "Revert rejected: {}",
                            e
                        );
                        let error = ServerMessage::error(&self.key, &user_id, e.to_string());
                        self.send_to(&connection_id, Arc::new(error));
                    }
                }
            }
            ClientMessageKind::Presence => {
                self.broadcast(ServerMessage::presence(&self.key, &user_id));
            }
            ClientMessageKind::Other(kind) => {
                tracing::debug!(room = %self.key, kind = %kind, "Acknowledging unrecognized frame");
                self.broadcast(ServerMessage::ack(&self.key, &user_id));
            }
        }
    }

    /// Deliver to one connection, evicting it if its queue is full or closed.
    fn send_to(&mut self, connection_id: &ConnectionId, frame: Arc<ServerMessage>) {
        let Some(entry) = self.clients.get(connection_id) else {
            return;
        };
        if let Err(e) = entry.outbound.try_send(frame) {
            self.evict(connection_id, &e);
        }
    }

    /// Deliver to every connection without waiting on any of them.
    fn broadcast(&mut self, frame: ServerMessage) {
        let frame = Arc::new(frame);
        let failed: Vec<(ConnectionId, TrySendError<Arc<ServerMessage>>)> = self
            .clients
            .iter()
            .filter_map(|(id, entry)| {
                entry
                    .outbound
                    .try_send(Arc::clone(&frame))
                    .err()
                    .map(|e| (*id, e))
            })
            .collect();

        for (id, e) in failed {
            self.evict(&id, &e);
        }
    }

    fn evict<T>(&mut self, connection_id: &ConnectionId, cause: &TrySendError<T>) {
        let Some(entry) = self.clients.remove(connection_id) else {
            return;
        };
        match cause {
            TrySendError::Full(_) => tracing::warn!(
                room = %self.key,
                connection_id = %connection_id,
                user_id = %entry.user_id,
                "Evicting slow consumer"
            ),
            TrySendError::Closed(_) => tracing::debug!(
                room = %self.key,
                connection_id = %connection_id,
                "Dropping disconnected client"
            ),
        }
    }

    #[cfg(test)]
    fn client_count(&self) -> usize {
        self.clients.len()
    }
}
