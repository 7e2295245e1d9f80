//! WebSocket upgrade handler for collaborative editing sessions.
//!
//! Handles the HTTP → WebSocket upgrade and the connection lifecycle:
//! 1. Validate `tenantId`, `docId` and `userId` query parameters
//! 2. Upgrade to WebSocket
//! 3. Look up (or start) the document's room and join it
//! 4. Pump frames until either side disconnects
//! 5. Unregister from the room

use std::sync::Arc;

use axum::{
    extract::{
        ws::{WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::domain::foundation::{DocumentId, TenantId, UserId};

use super::connection::Connection;
use super::hub::Hub;

/// State required for WebSocket handling.
#[derive(Clone)]
pub struct WebSocketState {
    /// Registry of document rooms.
    pub hub: Arc<Hub>,
    /// Bound of each connection's outbound queue.
    pub outbound_capacity: usize,
}

impl WebSocketState {
    /// Create a new WebSocket state.
    pub fn new(hub: Arc<Hub>, outbound_capacity: usize) -> Self {
        Self {
            hub,
            outbound_capacity,
        }
    }
}

/// Query parameters of the upgrade request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WsConnectParams {
    pub tenant_id: Option<String>,
    pub doc_id: Option<String>,
    pub user_id: Option<String>,
}

impl WsConnectParams {
    /// Validate that every parameter is present and non-empty.
    pub fn resolve(self) -> Option<(TenantId, DocumentId, UserId)> {
        let tenant_id = TenantId::new(self.tenant_id?).ok()?;
        let document_id = DocumentId::new(self.doc_id?).ok()?;
        let user_id = UserId::new(self.user_id?).ok()?;
        Some((tenant_id, document_id, user_id))
    }
}

/// Handle WebSocket upgrade requests for a document.
///
/// Route: `GET /ws?tenantId=..&docId=..&userId=..`
///
/// Parameters are checked before the upgrade so a bad request is answered
/// with a plain 400.
pub async fn ws_handler(
    Query(params): Query<WsConnectParams>,
    State(state): State<WebSocketState>,
    ws: Option<WebSocketUpgrade>,
) -> Response {
    let Some((tenant_id, document_id, user_id)) = params.resolve() else {
        return (
            StatusCode::BAD_REQUEST,
            "tenantId, docId, and userId are required",
        )
            .into_response();
    };

    let Some(ws) = ws else {
        return (StatusCode::UPGRADE_REQUIRED, "Expected a WebSocket upgrade").into_response();
    };

    ws.on_upgrade(move |socket| handle_socket(socket, tenant_id, document_id, user_id, state))
}

/// Handle an established WebSocket connection.
async fn handle_socket(
    socket: WebSocket,
    tenant_id: TenantId,
    document_id: DocumentId,
    user_id: UserId,
    state: WebSocketState,
) {
    let room = state.hub.get_or_create_room(tenant_id, document_id).await;

    match Connection::join(room, user_id.clone(), state.outbound_capacity).await {
        Ok((connection, outbound)) => {
            tracing::debug!(
                connection_id = %connection.id(),
                user_id = %user_id,
                "WebSocket connected"
            );
            connection.attach(socket, outbound).await;
        }
        Err(e) => {
            tracing::warn!(user_id = %user_id, "Could not join room: {}", e);
        }
    }
}

/// Create axum router for the WebSocket endpoint.
///
/// # Example
///
/// ```ignore
/// let app = Router::new()
///     .merge(websocket_router().with_state(ws_state));
/// ```
pub fn websocket_router() -> axum::Router<WebSocketState> {
    use axum::routing::get;

    axum::Router::new().route("/ws", get(ws_handler))
}
