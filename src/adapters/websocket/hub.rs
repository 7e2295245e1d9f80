//! Registry of live document rooms.
//!
//! Rooms are created lazily on first use. The registry lock is held only for
//! lookup and insert, never across storage I/O.
//!
//! Idle rooms (no connection holds a handle) can be reaped by a periodic
//! sweep. A reaped room still drains whatever was already queued; a room
//! created afterwards for the same document waits for it, so edits to one
//! document stay totally ordered across room incarnations.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::domain::foundation::{DocumentId, TenantId};

use super::room::{CollaborationServices, Room, RoomHandle, RoomKey};

struct RoomSlot {
    handle: RoomHandle,
    task: JoinHandle<()>,
}

#[derive(Default)]
struct HubState {
    rooms: HashMap<RoomKey, RoomSlot>,
    /// Tasks of reaped rooms that may still be draining.
    draining: HashMap<RoomKey, JoinHandle<()>>,
}

/// Creates and tracks one room per document.
pub struct Hub {
    state: Mutex<HubState>,
    services: CollaborationServices,
    inbound_capacity: usize,
}

impl Hub {
    pub fn new(services: CollaborationServices, inbound_capacity: usize) -> Self {
        Self {
            state: Mutex::new(HubState::default()),
            services,
            inbound_capacity,
        }
    }

    /// Return the room for a document, starting it if needed.
    pub async fn get_or_create_room(
        &self,
        tenant_id: TenantId,
        document_id: DocumentId,
    ) -> RoomHandle {
        let key = RoomKey::new(tenant_id, document_id);
        let mut state = self.state.lock().await;

        if let Some(slot) = state.rooms.get(&key) {
            return slot.handle.clone();
        }

        let predecessor = state.draining.remove(&key);
        let (handle, task) = Room::spawn(
            key.clone(),
            self.services.clone(),
            self.inbound_capacity,
            predecessor,
        );
        tracing::debug!(room = %key, "Room created");

        state.rooms.insert(
            key,
            RoomSlot {
                handle: handle.clone(),
                task,
            },
        );
        handle
    }

    /// Number of rooms currently registered.
    pub async fn room_count(&self) -> usize {
        self.state.lock().await.rooms.len()
    }

    /// Drop every room that only the hub still references.
    ///
    /// Returns how many rooms were removed.
    pub async fn reap_idle(&self) -> usize {
        let mut state = self.state.lock().await;

        // Handles are only cloned under this lock, so a count of one cannot
        // grow while we hold it.
        let idle: Vec<RoomKey> = state
            .rooms
            .iter()
            .filter(|(_, slot)| slot.handle.holder_count() == 1)
            .map(|(key, _)| key.clone())
            .collect();

        for key in &idle {
            if let Some(slot) = state.rooms.remove(key) {
                drop(slot.handle);
                tracing::debug!(room = %key, "Reaping idle room");
                state.draining.insert(key.clone(), slot.task);
            }
        }

        state.draining.retain(|_, task| !task.is_finished());
        idle.len()
    }

    /// Run [`Hub::reap_idle`] every `interval` until the hub is dropped.
    pub fn spawn_reaper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let hub: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(hub) = hub.upgrade() else {
                    break;
                };
                let reaped = hub.reap_idle().await;
                if reaped > 0 {
                    tracing::debug!(reaped, "Idle rooms reaped");
                }
            }
        })
    }
}
