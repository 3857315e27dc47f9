//! Control Panel - register dashboard for an ESP32 motor controller
//!
//! Polls the register backend, renders the values into a console panel,
//! relays switch and configuration changes, and shows toast notifications.

pub mod backend;
pub mod config;
pub mod console;
pub mod error;
pub mod io;
pub mod memory;
pub mod registers;
pub mod state;
pub mod synchronizer;
pub mod toast;
pub mod widgets;

pub use config::{load_config, Config};
pub use error::{PanelError, Result};
pub use synchronizer::PanelSynchronizer;

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::backend::BackendClient;
use crate::console::{forward_lines, stdin_lines, Console, ConsoleView};
use crate::io::{HttpClient, ReqwestHttpClient};
use crate::registers::DisplayTable;
use crate::toast::ToastBoard;

/// Builder for the control panel.
///
/// Validates the configuration and wires the backend client, console widgets,
/// toast board and synchronizer together.
pub struct PanelBuilder {
    config: Config,
    http: Arc<dyn HttpClient>,
    cancel: Option<CancellationToken>,
}

impl PanelBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            http: Arc::new(ReqwestHttpClient::new()),
            cancel: None,
        }
    }

    pub fn with_http_client(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = http;
        self
    }

    pub fn with_cancellation_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn build(self) -> Result<ControlPanel> {
        self.config.validate()?;

        let view = Arc::new(ConsoleView::new());
        let toasts = Arc::new(ToastBoard::new(self.config.toasts.history_size));
        let display = DisplayTable::with_overrides(&self.config.display);
        let backend = BackendClient::new(&self.config.backend.base_url, self.http);

        let synchronizer = PanelSynchronizer::new(
            backend,
            view.panel_view(),
            toasts.clone(),
            display,
            Duration::from_millis(self.config.polling.interval_ms),
        )?;

        tracing::debug!(
            "Built control panel for {} (poll every {} ms)",
            self.config.backend.base_url,
            self.config.polling.interval_ms
        );

        Ok(ControlPanel {
            synchronizer,
            view,
            toasts,
            cancel: self.cancel.unwrap_or_default(),
        })
    }
}

/// A wired control panel, ready to start
#[derive(Debug)]
pub struct ControlPanel {
    synchronizer: PanelSynchronizer,
    view: Arc<ConsoleView>,
    toasts: Arc<ToastBoard>,
    cancel: CancellationToken,
}

impl ControlPanel {
    pub fn synchronizer(&self) -> &PanelSynchronizer {
        &self.synchronizer
    }

    pub fn view(&self) -> &Arc<ConsoleView> {
        &self.view
    }

    pub fn toasts(&self) -> &Arc<ToastBoard> {
        &self.toasts
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run on stdin/stdout until quit, EOF or Ctrl-C
    pub async fn start(self) -> Result<()> {
        let cancel_for_signal = self.cancel.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => tracing::info!("Shutdown signal received"),
                Err(e) => tracing::error!("Failed to listen for ctrl-c: {}", e),
            }
            cancel_for_signal.cancel();
        });

        let lines = stdin_lines()?;
        self.start_with_lines(lines, tokio::io::stdout()).await
    }

    /// Bootstrap, poll in the background and drive the console from `reader`
    pub async fn start_with_io<R, W>(self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin,
    {
        self.start_with_lines(forward_lines(reader), writer).await
    }

    async fn start_with_lines<W>(self, lines: mpsc::Receiver<String>, writer: W) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        if self.cancel.is_cancelled() {
            tracing::info!("Control panel cancelled before start");
            return Ok(());
        }

        tokio::select! {
            _ = self.synchronizer.bootstrap() => {}
            _ = self.cancel.cancelled() => {
                tracing::info!("Control panel cancelled during bootstrap");
                return Ok(());
            }
        }

        let synchronizer = self.synchronizer.clone();
        let cancel_for_poll = self.cancel.clone();
        let poller = tokio::spawn(async move { synchronizer.poll_loop(cancel_for_poll).await });

        tracing::info!("Control panel started");

        let console = Console::new(
            self.synchronizer.clone(),
            Arc::clone(&self.view),
            Arc::clone(&self.toasts),
        );
        let result = console.run(lines, writer, self.cancel.clone()).await;

        self.cancel.cancel();
        if let Err(e) = poller.await {
            tracing::warn!("Polling task ended abnormally: {}", e);
        }
        tracing::info!("Control panel stopped");

        result
    }
}

/// Run the control panel with the given configuration
pub async fn run(config: Config) -> Result<()> {
    PanelBuilder::new(config).build()?.start().await
}
