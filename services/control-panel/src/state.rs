//! State owned by the synchronizer: snapshot, connection config, direction memory

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::registers::{PanelSnapshot, RegisterValue};

/// Serial port and reference speed the backend is configured with
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub serial_port: String,
    pub reference_speed: i64,
}

/// Mutable panel state
#[derive(Debug, Default)]
pub struct PanelState {
    snapshot: PanelSnapshot,
    connection: ConnectionConfig,
    last_direction: Option<bool>,
}

impl PanelState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> &PanelSnapshot {
        &self.snapshot
    }

    /// Replace the snapshot wholesale
    pub fn replace_snapshot(&mut self, snapshot: PanelSnapshot) {
        self.snapshot = snapshot;
    }

    /// Commit a single confirmed register value
    pub fn commit_register(&mut self, key: &str, value: RegisterValue) {
        self.snapshot.set(key, value);
    }

    /// Last committed value of a boolean register, `false` when unknown
    pub fn committed_bool(&self, key: &str) -> bool {
        self.snapshot.get_bool(key).unwrap_or(false)
    }

    pub fn connection(&self) -> &ConnectionConfig {
        &self.connection
    }

    pub fn set_serial_port(&mut self, port: &str) {
        self.connection.serial_port = port.to_string();
    }

    pub fn set_reference_speed(&mut self, speed: i64) {
        self.connection.reference_speed = speed;
    }

    pub fn last_direction(&self) -> Option<bool> {
        self.last_direction
    }

    /// Record the rendered direction, returning true if it flipped
    pub fn observe_direction(&mut self, direction: bool) -> bool {
        let flipped = matches!(self.last_direction, Some(previous) if previous != direction);
        self.last_direction = Some(direction);
        flipped
    }
}

/// Thread-safe shared state handle
pub type StateHandle = Arc<RwLock<PanelState>>;

pub fn new_state_handle() -> StateHandle {
    Arc::new(RwLock::new(PanelState::new()))
}
