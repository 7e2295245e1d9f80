//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `memory` - In-memory document store (development, tests)
//! - `postgres` - PostgreSQL document store
//! - `websocket` - Real-time collaboration rooms and connections
//! - `http` - Application router

pub mod http;
pub mod memory;
pub mod postgres;
pub mod websocket;

pub use self::http::app_router;
pub use memory::InMemoryDocumentRepository;
pub use postgres::PostgresDocumentRepository;
pub use websocket::{CollaborationServices, Hub, WebSocketState};
