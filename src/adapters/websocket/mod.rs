//! WebSocket adapters for collaborative document editing.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                               Hub                                    │
//! │   Room: acme:doc-1     Room: acme:doc-2     Room: globex:doc-1       │
//! └─────────────────────────────────────────────────────────────────────┘
//!          │ one task per room, edits applied in arrival order
//!          ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                              Room                                    │
//! │   inbound (bounded) ──► ApplyOperationHandler ──► broadcast          │
//! │   ├── connection-a  outbound (bounded, evicted when full)            │
//! │   └── connection-b                                                   │
//! └─────────────────────────────────────────────────────────────────────┘
//!          ▲                                   │
//!          │ read pump                         │ write pump
//!          └──────────── WebSocket ◄───────────┘
//! ```
//!
//! # Components
//!
//! - [`messages`] - WebSocket message protocol types
//! - [`room`] - Per-document actor and its handle
//! - [`hub`] - Room registry with idle reaping
//! - [`connection`] - Read/write pumps for one socket
//! - [`handler`] - Axum WebSocket upgrade handler

pub mod connection;
pub mod handler;
pub mod hub;
pub mod messages;
pub mod room;

pub use connection::Connection;
pub use handler::{websocket_router, ws_handler, WebSocketState, WsConnectParams};
pub use hub::Hub;
pub use messages::{ClientMessage, ClientMessageKind, ServerMessage, ServerMessageKind};
pub use room::{CollaborationServices, ConnectionId, Room, RoomClosed, RoomHandle, RoomKey};
