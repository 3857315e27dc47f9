//! In-memory widgets backing the console front-end

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::widgets::{
    Banner, Button, DirectionIcon, LinkIndicator, Readout, SelectOption, Selector, Switch,
};

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
pub struct MemorySwitch {
    checked: AtomicBool,
}

impl Switch for MemorySwitch {
    fn set_checked(&self, checked: bool) {
        self.checked.store(checked, Ordering::SeqCst);
    }

    fn is_checked(&self) -> bool {
        self.checked.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
pub struct MemoryReadout {
    text: Mutex<String>,
}

impl MemoryReadout {
    pub fn text(&self) -> String {
        lock(&self.text).clone()
    }
}

impl Readout for MemoryReadout {
    fn set_text(&self, text: &str) {
        *lock(&self.text) = text.to_string();
    }
}

/// Link badge; `None` until the first render
#[derive(Debug, Default)]
pub struct MemoryLink {
    connected: Mutex<Option<bool>>,
}

impl MemoryLink {
    pub fn connected(&self) -> Option<bool> {
        *lock(&self.connected)
    }

    pub fn label(&self) -> &'static str {
        match self.connected() {
            Some(true) => "Connected",
            Some(false) => "Disconnected",
            None => "-",
        }
    }
}

impl LinkIndicator for MemoryLink {
    fn set_connected(&self, connected: bool) {
        *lock(&self.connected) = Some(connected);
    }
}

/// Class events kept by [`MemoryIcon`]; older ones are dropped
pub const ICON_EVENT_LOG_SIZE: usize = 64;

/// Class change recorded by [`MemoryIcon`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassEvent {
    Added(String),
    Removed(String),
}

#[derive(Debug, Default)]
pub struct MemoryIcon {
    rotation: AtomicU16,
    active: AtomicBool,
    classes: Mutex<Vec<String>>,
    events: Mutex<VecDeque<ClassEvent>>,
}

impl MemoryIcon {
    pub fn rotation(&self) -> u16 {
        self.rotation.load(Ordering::SeqCst)
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn has_class(&self, class: &str) -> bool {
        lock(&self.classes).iter().any(|c| c == class)
    }

    /// Recent class additions and removals, oldest first
    pub fn class_events(&self) -> Vec<ClassEvent> {
        lock(&self.events).iter().cloned().collect()
    }

    fn record(&self, event: ClassEvent) {
        let mut events = lock(&self.events);
        if events.len() >= ICON_EVENT_LOG_SIZE {
            events.pop_front();
        }
        events.push_back(event);
    }
}

impl DirectionIcon for MemoryIcon {
    fn set_rotation(&self, degrees: u16) {
        self.rotation.store(degrees, Ordering::SeqCst);
    }

    fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }

    fn add_class(&self, class: &str) {
        let mut classes = lock(&self.classes);
        if !classes.iter().any(|c| c == class) {
            classes.push(class.to_string());
        }
        drop(classes);
        self.record(ClassEvent::Added(class.to_string()));
    }

    fn remove_class(&self, class: &str) {
        lock(&self.classes).retain(|c| c != class);
        self.record(ClassEvent::Removed(class.to_string()));
    }
}

#[derive(Debug, Default)]
struct SelectorInner {
    options: Vec<SelectOption>,
    selected: Option<usize>,
}

#[derive(Debug, Default)]
pub struct MemorySelector {
    inner: Mutex<SelectorInner>,
}

impl MemorySelector {
    pub fn options(&self) -> Vec<SelectOption> {
        lock(&self.inner).options.clone()
    }

    pub fn selected_label(&self) -> Option<String> {
        let inner = lock(&self.inner);
        inner
            .selected
            .and_then(|i| inner.options.get(i))
            .map(|o| o.label.clone())
    }
}

impl Selector for MemorySelector {
    fn set_options(&self, options: Vec<SelectOption>) {
        let mut inner = lock(&self.inner);
        inner.selected = if options.is_empty() { None } else { Some(0) };
        inner.options = options;
    }

    fn select(&self, value: &str) {
        let mut inner = lock(&self.inner);
        if let Some(index) = inner.options.iter().position(|o| o.value == value) {
            inner.selected = Some(index);
        }
    }

    fn selected(&self) -> Option<String> {
        let inner = lock(&self.inner);
        inner
            .selected
            .and_then(|i| inner.options.get(i))
            .map(|o| o.value.clone())
    }
}

#[derive(Debug)]
pub struct MemoryButton {
    enabled: AtomicBool,
}

impl Default for MemoryButton {
    fn default() -> Self {
        Self {
            enabled: AtomicBool::new(true),
        }
    }
}

impl Button for MemoryButton {
    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
pub struct MemoryBanner {
    message: Mutex<Option<String>>,
}

impl MemoryBanner {
    /// The visible message, if the banner is shown
    pub fn message(&self) -> Option<String> {
        lock(&self.message).clone()
    }
}

impl Banner for MemoryBanner {
    fn show(&self, message: &str) {
        *lock(&self.message) = Some(message.to_string());
    }

    fn hide(&self) {
        *lock(&self.message) = None;
    }
}
