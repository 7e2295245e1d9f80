//! DocStream - Real-time collaborative document editing
//!
//! Clients connect over WebSocket to a per-document room. Each room applies
//! edits one at a time (last writer wins), persists a version snapshot for
//! every accepted edit and fans the result out to every connected client.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
