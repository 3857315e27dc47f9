//! Panel synchronizer: keeps the rendered panel in step with the backend

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::backend::{BackendClient, ConfigurationRequest, ConnectionStatus, RegisterWrite};
use crate::registers::{
    DisplayTable, PanelSnapshot, RegisterValue, DIRECTION_REGISTER, MOVE_REGISTER, REGISTERS,
};
use crate::state::{new_state_handle, ConnectionConfig, PanelState, StateHandle};
use crate::toast::{Severity, Toaster};
use crate::widgets::{DirectionIcon, PanelView, RenderMap, RenderTarget, SelectOption, BOUNCE_CLASS};

/// Speeds offered when the backend cannot list its own
pub const FALLBACK_SPEEDS: [i64; 10] = [0, 100, 200, 300, 400, 500, 750, 1000, 1500, 2000];

/// How long the direction icon keeps the bounce class
pub const BOUNCE_DURATION: Duration = Duration::from_millis(300);

/// Delay between the success toast and a backend warning after applying configuration
pub const WARNING_DELAY: Duration = Duration::from_secs(1);

const NO_PORTS: &str = "No ports available";
const NO_SPEEDS: &str = "No options available";
const PORTS_FAILED: &str = "Error loading ports";
const CONNECTION_FAILED: &str = "Connection to the server failed";

/// Which refresh control the user pressed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshSource {
    Desktop,
    Mobile,
}

/// Optimistic switch change awaiting the backend's verdict.
///
/// `begin` shows the tentative value; exactly one of `commit` or `rollback`
/// settles it.
#[must_use]
#[derive(Debug)]
pub struct PendingToggle {
    register: String,
    tentative: bool,
}

impl PendingToggle {
    pub fn begin(targets: &RenderMap, register: &str, tentative: bool) -> Self {
        for switch in targets.switches(register) {
            switch.set_checked(tentative);
        }
        tracing::debug!("Toggle '{}' -> {} pending", register, tentative);
        Self {
            register: register.to_string(),
            tentative,
        }
    }

    /// Accept the tentative value into the snapshot
    pub fn commit(self, state: &mut PanelState) -> (String, RegisterValue) {
        let value = RegisterValue::Boolean(self.tentative);
        state.commit_register(&self.register, value);
        tracing::debug!("Toggle '{}' -> {} committed", self.register, self.tentative);
        (self.register, value)
    }

    /// Put the switches back to the last committed value
    pub fn rollback(self, targets: &RenderMap, state: &PanelState) {
        let committed = state.committed_bool(&self.register);
        for switch in targets.switches(&self.register) {
            switch.set_checked(committed);
        }
        tracing::debug!("Toggle '{}' rolled back to {}", self.register, committed);
    }
}

struct Inner {
    backend: BackendClient,
    view: PanelView,
    toaster: Arc<dyn Toaster>,
    display: DisplayTable,
    state: StateHandle,
    poll_interval: Duration,
}

/// Keeps the panel view consistent with the backend registers and forwards
/// user edits. Cloning yields another handle to the same synchronizer.
#[derive(Clone)]
pub struct PanelSynchronizer {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for PanelSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PanelSynchronizer")
            .field("backend", &self.inner.backend)
            .field("poll_interval", &self.inner.poll_interval)
            .finish()
    }
}

impl PanelSynchronizer {
    /// Build a synchronizer; fails if the view does not cover every register
    pub fn new(
        backend: BackendClient,
        view: PanelView,
        toaster: Arc<dyn Toaster>,
        display: DisplayTable,
        poll_interval: Duration,
    ) -> crate::Result<Self> {
        view.targets.validate(REGISTERS)?;
        Ok(Self {
            inner: Arc::new(Inner {
                backend,
                view,
                toaster,
                display,
                state: new_state_handle(),
                poll_interval,
            }),
        })
    }

    pub fn state(&self) -> StateHandle {
        Arc::clone(&self.inner.state)
    }

    pub async fn snapshot(&self) -> PanelSnapshot {
        self.inner.state.read().await.snapshot().clone()
    }

    pub async fn connection(&self) -> ConnectionConfig {
        self.inner.state.read().await.connection().clone()
    }

    pub fn view(&self) -> &PanelView {
        &self.inner.view
    }

    /// Bootstrap, then poll until cancelled
    pub async fn run(&self, cancel: CancellationToken) {
        self.bootstrap().await;
        self.poll_loop(cancel).await;
    }

    /// Load both option lists and the first snapshot concurrently
    pub async fn bootstrap(&self) {
        tracing::debug!("Bootstrapping panel from {}", self.inner.backend.base_url());
        tokio::join!(
            self.load_serial_ports(),
            self.load_speed_options(),
            self.refresh(RefreshSource::Desktop),
        );
    }

    /// Fire a silent poll every interval until cancelled.
    ///
    /// Ticks do not wait for the previous request; the last response to land wins.
    pub async fn poll_loop(&self, cancel: CancellationToken) {
        let period = self.inner.poll_interval;
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let this = self.clone();
                    tokio::spawn(async move { this.poll().await });
                }
                _ = cancel.cancelled() => {
                    tracing::debug!("Polling loop cancelled");
                    break;
                }
            }
        }
    }

    /// One routine poll: no feedback on success
    pub async fn poll(&self) {
        match self.inner.backend.registers().await {
            Ok(snapshot) => self.apply_snapshot(snapshot).await,
            Err(e) => self.report_fetch_failure(&e),
        }
    }

    /// User-triggered refresh: always notifies, controls disabled while in flight
    pub async fn refresh(&self, source: RefreshSource) {
        tracing::debug!("Manual refresh from {:?}", source);
        let controls = &self.inner.view.controls;
        controls.refresh_button.set_enabled(false);
        controls.refresh_button_mobile.set_enabled(false);

        match self.inner.backend.registers().await {
            Ok(snapshot) => {
                self.apply_snapshot(snapshot).await;
                self.inner
                    .toaster
                    .show(Severity::Success, "Data updated successfully");
            }
            Err(e) => self.report_fetch_failure(&e),
        }

        controls.refresh_button.set_enabled(true);
        controls.refresh_button_mobile.set_enabled(true);
    }

    fn report_fetch_failure(&self, error: &crate::PanelError) {
        tracing::warn!("Failed to fetch registers: {}", error);
        let reason = error.to_string();
        let message = if reason.is_empty() {
            CONNECTION_FAILED
        } else {
            reason.as_str()
        };
        self.inner.view.controls.error_banner.show(message);
        self.inner
            .toaster
            .show(Severity::Error, "Failed to update data");
    }

    /// Replace the snapshot and re-render under one lock
    async fn apply_snapshot(&self, snapshot: PanelSnapshot) {
        let mut state = self.inner.state.write().await;
        state.replace_snapshot(snapshot);
        self.render(&mut state);
        self.inner.view.controls.error_banner.hide();
    }

    /// Render every register of the current snapshot
    pub fn render(&self, state: &mut PanelState) {
        let entries: Vec<(String, RegisterValue)> = state
            .snapshot()
            .iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        for (key, value) in entries {
            self.render_register(state, &key, value);
        }
    }

    fn render_register(&self, state: &mut PanelState, key: &str, value: RegisterValue) {
        for target in self.inner.view.targets.targets(key) {
            match (target, value) {
                (RenderTarget::Switch(switch), RegisterValue::Boolean(b)) => switch.set_checked(b),
                (RenderTarget::Link(link), RegisterValue::Boolean(b)) => link.set_connected(b),
                (RenderTarget::Readout(readout), RegisterValue::Numeric(n)) => {
                    readout.set_text(&self.inner.display.format(key, n))
                }
                _ => tracing::debug!("Register '{}' value {:?} does not fit its target", key, value),
            }
        }

        let Some(icon) = self.inner.view.targets.direction_icon() else {
            return;
        };
        match (key, value) {
            (DIRECTION_REGISTER, RegisterValue::Boolean(direction)) => {
                icon.set_rotation(if direction { 0 } else { 180 });
                if state.observe_direction(direction) {
                    bounce(Arc::clone(icon));
                }
            }
            (MOVE_REGISTER, RegisterValue::Boolean(moving)) => icon.set_active(moving),
            _ => {}
        }
    }

    /// Write one register. Boolean writes are shown optimistically and
    /// rolled back on failure.
    pub async fn write_register(&self, register: &str, value: RegisterValue) {
        let write = RegisterWrite::new(register, value);
        let targets = &self.inner.view.targets;

        let pending = match value {
            RegisterValue::Boolean(b) => Some(PendingToggle::begin(targets, register, b)),
            RegisterValue::Numeric(_) => None,
        };

        let result = self.inner.backend.set_register(&write).await;

        let mut state = self.inner.state.write().await;
        match result {
            Ok(()) => {
                let value = match pending {
                    Some(pending) => pending.commit(&mut state).1,
                    None => {
                        state.commit_register(register, value);
                        value
                    }
                };
                self.render_register(&mut state, register, value);
                drop(state);
                self.inner
                    .toaster
                    .show(Severity::Success, &format!("{} updated successfully", register));
            }
            Err(e) => {
                tracing::warn!("Failed to update {}: {}", register, e);
                if let Some(pending) = pending {
                    pending.rollback(targets, &state);
                }
                drop(state);
                self.inner
                    .toaster
                    .show(Severity::Error, &format!("Failed to update {}", register));
            }
        }
    }

    /// Submit the selected port and speed
    pub async fn apply_configuration(&self) {
        let controls = &self.inner.view.controls;

        let Some(port) = controls.port_selector.selected().filter(|p| !p.is_empty()) else {
            self.inner
                .toaster
                .show(Severity::Error, "Please select a serial port");
            return;
        };
        let Some(speed) = controls
            .speed_selector
            .selected()
            .and_then(|s| s.trim().parse::<i64>().ok())
        else {
            self.inner
                .toaster
                .show(Severity::Error, "Please select a valid speed");
            return;
        };

        controls.apply_button.set_enabled(false);

        let request = ConfigurationRequest {
            serial_port: port,
            reference_speed: speed,
        };
        tracing::debug!("Applying configuration {:?}", request);

        match self.inner.backend.apply_configuration(&request).await {
            Ok(outcome) => {
                {
                    let mut state = self.inner.state.write().await;
                    state.set_serial_port(&request.serial_port);
                    state.set_reference_speed(request.reference_speed);
                }
                self.inner
                    .toaster
                    .show(Severity::Success, "Configuration applied successfully");
                if let Some(warning) = outcome.warning {
                    let toaster = Arc::clone(&self.inner.toaster);
                    tokio::spawn(async move {
                        tokio::time::sleep(WARNING_DELAY).await;
                        toaster.show(Severity::Warning, &format!("Warning: {}", warning));
                    });
                }
                let this = self.clone();
                tokio::spawn(async move { this.refresh(RefreshSource::Desktop).await });
            }
            Err(e) => {
                tracing::warn!("Failed to apply configuration: {}", e);
                self.inner
                    .toaster
                    .show(Severity::Error, &format!("Error: {}", e));
            }
        }

        controls.apply_button.set_enabled(true);
    }

    /// Backend link status; failures are notified and yield `None`
    pub async fn connection_status(&self) -> Option<ConnectionStatus> {
        match self.inner.backend.connection_status().await {
            Ok(status) => Some(status),
            Err(e) => {
                tracing::warn!("Failed to read connection status: {}", e);
                self.inner.toaster.show(
                    Severity::Error,
                    &format!("Failed to read connection status: {}", e),
                );
                None
            }
        }
    }

    async fn load_serial_ports(&self) {
        let selector = &self.inner.view.controls.port_selector;
        match self.inner.backend.serial_ports().await {
            Ok(ports) if ports.ports.is_empty() => {
                selector.set_options(vec![SelectOption::placeholder(NO_PORTS)]);
            }
            Ok(ports) => {
                selector.set_options(
                    ports
                        .ports
                        .iter()
                        .map(|p| SelectOption::new(p.as_str(), p.as_str()))
                        .collect(),
                );
                if let Some(current) = ports.current_port {
                    selector.select(&current);
                    self.inner.state.write().await.set_serial_port(&current);
                }
            }
            Err(e) => {
                tracing::error!("Failed to load serial ports: {}", e);
                selector.set_options(vec![SelectOption::placeholder(PORTS_FAILED)]);
            }
        }
    }

    async fn load_speed_options(&self) {
        let selector = &self.inner.view.controls.speed_selector;
        match self.inner.backend.reference_speed_options().await {
            Ok(speeds) if speeds.options.is_empty() => {
                selector.set_options(vec![SelectOption::placeholder(NO_SPEEDS)]);
            }
            Ok(speeds) => {
                selector.set_options(speed_options(&speeds.options));
                if let Some(current) = speeds.current_speed {
                    selector.select(&current.to_string());
                    self.inner.state.write().await.set_reference_speed(current);
                }
            }
            Err(e) => {
                tracing::error!("Failed to load reference speed options: {}", e);
                selector.set_options(speed_options(&FALLBACK_SPEEDS));
                self.inner.toaster.show(
                    Severity::Error,
                    "Failed to load speed options. Using default values.",
                );
            }
        }
    }
}

fn speed_options(speeds: &[i64]) -> Vec<SelectOption> {
    speeds
        .iter()
        .map(|s| SelectOption::new(s.to_string(), format!("{} RPM", s)))
        .collect()
}

fn bounce(icon: Arc<dyn DirectionIcon>) {
    icon.add_class(BOUNCE_CLASS);
    tokio::spawn(async move {
        tokio::time::sleep(BOUNCE_DURATION).await;
        icon.remove_class(BOUNCE_CLASS);
    });
}
