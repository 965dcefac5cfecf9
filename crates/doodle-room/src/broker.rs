//! Broker: the registry mapping room codes to running rooms.
//!
//! The lock guards only the map. It is never held across anything that
//! talks to a room, so a busy room can't stall lookups for the others.

use std::collections::HashMap;
use std::sync::Arc;

use doodle_game::settings::with_defaults;
use doodle_protocol::{RoomCode, RoomSettings};
use rand::Rng;
use rand::distr::Alphanumeric;
use tokio::sync::RwLock;

use crate::room::spawn_room;
use crate::{Handler, RoomError, RoomHandle};

/// Length of generated room codes.
pub const CODE_LEN: usize = 6;

/// Shared, cloneable room registry.
#[derive(Debug, Clone, Default)]
pub struct Broker {
    rooms: Arc<RwLock<HashMap<RoomCode, RoomHandle>>>,
}

impl Broker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a room by code.
    ///
    /// # Errors
    /// [`RoomError::NotFound`] if nothing is registered under `code`.
    pub async fn get(&self, code: &RoomCode) -> Result<RoomHandle, RoomError> {
        self.rooms
            .read()
            .await
            .get(code)
            .cloned()
            .ok_or_else(|| RoomError::NotFound(code.clone()))
    }

    /// Inserts or overwrites; returns the previous entry.
    pub async fn set(&self, code: RoomCode, room: RoomHandle) -> Option<RoomHandle> {
        self.rooms.write().await.insert(code, room)
    }

    pub async fn remove(&self, code: &RoomCode) -> Option<RoomHandle> {
        self.rooms.write().await.remove(code)
    }

    /// Removes `code` only if it still points at room `instance`.
    async fn remove_instance(&self, code: &RoomCode, instance: u64) -> bool {
        let mut rooms = self.rooms.write().await;
        match rooms.get(code) {
            Some(room) if room.instance() == instance => {
                rooms.remove(code);
                true
            }
            _ => false,
        }
    }

    /// A page of known codes, sorted. Pages may shift between calls as
    /// rooms come and go.
    pub async fn codes(&self, offset: usize, count: usize) -> Vec<RoomCode> {
        let mut codes: Vec<RoomCode> = self.rooms.read().await.keys().cloned().collect();
        codes.sort();
        codes.into_iter().skip(offset).take(count).collect()
    }

    pub async fn len(&self) -> usize {
        self.rooms.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rooms.read().await.is_empty()
    }

    /// Asks every registered room to shut down. Returns how many were asked.
    ///
    /// Rooms drain and deregister themselves; the map isn't touched here.
    pub async fn shutdown_all(&self) -> usize {
        let rooms: Vec<RoomHandle> = self.rooms.read().await.values().cloned().collect();
        for room in &rooms {
            if let Err(e) = room.shutdown() {
                tracing::debug!(room = %room.code(), error = %e, "room already stopped");
            }
        }
        rooms.len()
    }

    /// Creates a room under a fresh code and registers it.
    ///
    /// The room deregisters itself when its task ends.
    pub async fn create_room<H: Handler>(
        &self,
        settings: RoomSettings,
        handler: Arc<H>,
    ) -> RoomHandle {
        let settings = with_defaults(settings);

        let (room, task) = {
            let mut rooms = self.rooms.write().await;
            let code = loop {
                let code = generate_code();
                if !rooms.contains_key(&code) {
                    break code;
                }
            };
            let (room, task) = spawn_room(code.clone(), settings, handler);
            rooms.insert(code, room.clone());
            (room, task)
        };
        tracing::info!(room = %room.code(), "room created");

        let broker = self.clone();
        let code = room.code().clone();
        let instance = room.instance();
        tokio::spawn(async move {
            if let Err(e) = task.await {
                tracing::error!(room = %code, error = %e, "room task failed");
            }
            if broker.remove_instance(&code, instance).await {
                tracing::debug!(room = %code, "room deregistered");
            }
        });

        room
    }
}

fn generate_code() -> RoomCode {
    let code: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(CODE_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    RoomCode::new(code)
}
