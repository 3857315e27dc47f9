//! Transient toast notifications

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::memory::lock;

/// Delay before a new toast slides in
pub const SHOW_DELAY: Duration = Duration::from_millis(100);
/// Time from creation until the fade-out starts
pub const VISIBLE_FOR: Duration = Duration::from_millis(3000);
/// Length of the fade-out transition
pub const FADE_OUT: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Success,
    Warning,
    Error,
}

impl Severity {
    pub fn title(&self) -> &'static str {
        match self {
            Severity::Success => "Success",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Severity::Success => "check-circle",
            Severity::Warning => "alert-triangle",
            Severity::Error => "alert-circle",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Visual phase of a toast on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastPhase {
    Entering,
    Active,
    Leaving,
}

/// A toast currently on screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toast {
    pub id: u64,
    pub severity: Severity,
    pub message: String,
    pub phase: ToastPhase,
}

/// Record of a shown toast
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToastRecord {
    pub severity: Severity,
    pub message: String,
    pub timestamp_epoch_ms: u64,
}

/// Trait for surfacing notifications to the user
pub trait Toaster: Send + Sync + std::fmt::Debug {
    fn show(&self, severity: Severity, message: &str);
}

/// Toast overlay with timed lifecycle and a bounded history
#[derive(Debug)]
pub struct ToastBoard {
    next_id: AtomicU64,
    active: Arc<Mutex<Vec<Toast>>>,
    history: Mutex<VecDeque<ToastRecord>>,
    history_max_size: usize,
}

impl ToastBoard {
    pub fn new(history_max_size: usize) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            active: Arc::new(Mutex::new(Vec::new())),
            history: Mutex::new(VecDeque::with_capacity(history_max_size)),
            history_max_size,
        }
    }

    /// Toasts currently on screen, oldest first
    pub fn active(&self) -> Vec<Toast> {
        lock(&self.active).clone()
    }

    /// Every toast shown so far, bounded by the history size
    pub fn history(&self) -> Vec<ToastRecord> {
        lock(&self.history).iter().cloned().collect()
    }

    pub fn count(&self, severity: Severity) -> usize {
        lock(&self.history)
            .iter()
            .filter(|r| r.severity == severity)
            .count()
    }

    fn record(&self, severity: Severity, message: &str) {
        let mut history = lock(&self.history);
        if self.history_max_size == 0 {
            return;
        }
        if history.len() >= self.history_max_size {
            history.pop_front();
        }
        history.push_back(ToastRecord {
            severity,
            message: message.to_string(),
            timestamp_epoch_ms: current_epoch_ms(),
        });
    }
}

impl Toaster for ToastBoard {
    fn show(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Success => tracing::info!("[{}] {}", severity, message),
            Severity::Warning => tracing::warn!("[{}] {}", severity, message),
            Severity::Error => tracing::error!("[{}] {}", severity, message),
        }

        self.record(severity, message);

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.active).push(Toast {
            id,
            severity,
            message: message.to_string(),
            phase: ToastPhase::Entering,
        });

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("No runtime for toast {} lifecycle, dropping it", id);
            lock(&self.active).retain(|t| t.id != id);
            return;
        };

        let active = Arc::clone(&self.active);
        runtime.spawn(async move {
            tokio::time::sleep(SHOW_DELAY).await;
            set_phase(&active, id, ToastPhase::Active);
            tokio::time::sleep(VISIBLE_FOR - SHOW_DELAY).await;
            set_phase(&active, id, ToastPhase::Leaving);
            tokio::time::sleep(FADE_OUT).await;
            lock(&active).retain(|t| t.id != id);
        });
    }
}

fn set_phase(active: &Mutex<Vec<Toast>>, id: u64, phase: ToastPhase) {
    if let Some(toast) = lock(active).iter_mut().find(|t| t.id == id) {
        toast.phase = phase;
    }
}

fn current_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
