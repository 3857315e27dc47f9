//! Terminal front-end: in-memory widgets, command parser and the stdin loop

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::str::FromStr;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::memory::{
    MemoryBanner, MemoryButton, MemoryIcon, MemoryLink, MemoryReadout, MemorySelector,
    MemorySwitch,
};
use crate::registers::{register_kind, RegisterKind, RegisterValue, LINK_REGISTERS, REGISTERS};
use crate::synchronizer::{PanelSynchronizer, RefreshSource};
use crate::toast::ToastBoard;
use crate::widgets::{Controls, PanelView, RenderMap, Selector, Switch};
use crate::PanelError;

pub const HELP: &str = "\
Commands:
  refresh | r [mobile]        fetch registers now
  toggle <register> [on|off]  write a boolean register (no value flips it)
  set <register> <number>     write a numeric register
  port <name>                 choose the serial port
  speed <value>               choose the reference speed
  apply                       apply the selected port and speed
  status                      show the backend connection status
  show                        print the panel
  toasts                      print active notifications
  help                        print this summary
  quit | exit                 leave
";

/// Widgets of the console panel, one per catalog register plus the controls
#[derive(Debug)]
pub struct ConsoleView {
    switches: BTreeMap<&'static str, Arc<MemorySwitch>>,
    readouts: BTreeMap<&'static str, Arc<MemoryReadout>>,
    links: BTreeMap<&'static str, Arc<MemoryLink>>,
    pub icon: Arc<MemoryIcon>,
    pub port: Arc<MemorySelector>,
    pub speed: Arc<MemorySelector>,
    pub apply: Arc<MemoryButton>,
    pub refresh: Arc<MemoryButton>,
    pub refresh_mobile: Arc<MemoryButton>,
    pub banner: Arc<MemoryBanner>,
}

impl Default for ConsoleView {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleView {
    pub fn new() -> Self {
        let mut switches = BTreeMap::new();
        let mut readouts = BTreeMap::new();
        let mut links = BTreeMap::new();
        for spec in REGISTERS {
            match spec.kind {
                RegisterKind::Boolean if LINK_REGISTERS.contains(&spec.key) => {
                    links.insert(spec.key, Arc::new(MemoryLink::default()));
                }
                RegisterKind::Boolean => {
                    switches.insert(spec.key, Arc::new(MemorySwitch::default()));
                }
                RegisterKind::Numeric => {
                    readouts.insert(spec.key, Arc::new(MemoryReadout::default()));
                }
            }
        }

        Self {
            switches,
            readouts,
            links,
            icon: Arc::default(),
            port: Arc::default(),
            speed: Arc::default(),
            apply: Arc::default(),
            refresh: Arc::default(),
            refresh_mobile: Arc::default(),
            banner: Arc::default(),
        }
    }

    /// Switch for a register; unknown keys get a detached switch
    pub fn switch(&self, key: &str) -> Arc<MemorySwitch> {
        self.switches.get(key).cloned().unwrap_or_default()
    }

    pub fn readout(&self, key: &str) -> Arc<MemoryReadout> {
        self.readouts.get(key).cloned().unwrap_or_default()
    }

    pub fn link(&self, key: &str) -> Arc<MemoryLink> {
        self.links.get(key).cloned().unwrap_or_default()
    }

    pub fn has_switch(&self, key: &str) -> bool {
        self.switches.contains_key(key)
    }

    /// Bind these widgets into the view the synchronizer renders into
    pub fn panel_view(&self) -> PanelView {
        let mut targets = RenderMap::new().with_direction_icon(self.icon.clone());
        for (key, switch) in &self.switches {
            targets = targets.with_switch(key, switch.clone());
        }
        for (key, readout) in &self.readouts {
            targets = targets.with_readout(key, readout.clone());
        }
        for (key, link) in &self.links {
            targets = targets.with_link(key, link.clone());
        }

        PanelView {
            targets,
            controls: Controls {
                port_selector: self.port.clone(),
                speed_selector: self.speed.clone(),
                apply_button: self.apply.clone(),
                refresh_button: self.refresh.clone(),
                refresh_button_mobile: self.refresh_mobile.clone(),
                error_banner: self.banner.clone(),
            },
        }
    }

    /// Plain-text rendering of the whole panel, in catalog order
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        if let Some(message) = self.banner.message() {
            let _ = writeln!(out, "!! {}", message);
        }
        for spec in REGISTERS {
            let value = if let Some(switch) = self.switches.get(spec.key) {
                on_off(switch.is_checked()).to_string()
            } else if let Some(link) = self.links.get(spec.key) {
                link.label().to_string()
            } else if let Some(readout) = self.readouts.get(spec.key) {
                let text = readout.text();
                if text.is_empty() {
                    "-".to_string()
                } else {
                    text
                }
            } else {
                continue;
            };
            let _ = writeln!(out, "{:<20} {}", spec.key, value);
        }

        let arrow = if self.icon.rotation() == 0 { "^" } else { "v" };
        let motion = if self.icon.is_active() { "moving" } else { "idle" };
        let _ = writeln!(out, "{:<20} {} ({})", "icon", arrow, motion);
        let _ = writeln!(
            out,
            "{:<20} {}",
            "port",
            self.port.selected_label().unwrap_or_else(|| "-".to_string())
        );
        let _ = writeln!(
            out,
            "{:<20} {}",
            "speed",
            self.speed.selected_label().unwrap_or_else(|| "-".to_string())
        );
        out
    }
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

/// One console input line
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Refresh(RefreshSource),
    Toggle { register: String, value: Option<bool> },
    Set { register: String, value: f64 },
    Port(String),
    Speed(String),
    Apply,
    Status,
    Show,
    Toasts,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = PanelError;

    fn from_str(line: &str) -> crate::Result<Self> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Err(invalid("empty command"));
        };
        let args: Vec<&str> = words.collect();

        let command = match (verb.to_ascii_lowercase().as_str(), args.as_slice()) {
            ("refresh" | "r", []) => Command::Refresh(RefreshSource::Desktop),
            ("refresh" | "r", ["mobile"]) => Command::Refresh(RefreshSource::Mobile),
            ("toggle", [register]) => Command::Toggle {
                register: switchable(register)?,
                value: None,
            },
            ("toggle", [register, state]) => Command::Toggle {
                register: switchable(register)?,
                value: Some(match state.to_ascii_lowercase().as_str() {
                    "on" | "true" | "1" => true,
                    "off" | "false" | "0" => false,
                    other => return Err(invalid(&format!("expected on or off, got '{}'", other))),
                }),
            },
            ("set", [register, value]) => {
                if register_kind(register) != Some(RegisterKind::Numeric) {
                    return Err(invalid(&format!("'{}' is not a numeric register", register)));
                }
                let value: f64 = value
                    .parse()
                    .ok()
                    .filter(|v: &f64| v.is_finite())
                    .ok_or_else(|| invalid(&format!("'{}' is not a number", value)))?;
                Command::Set {
                    register: register.to_string(),
                    value,
                }
            }
            ("port", [name]) => Command::Port(name.to_string()),
            ("speed", [value]) => Command::Speed(value.to_string()),
            ("apply", []) => Command::Apply,
            ("status", []) => Command::Status,
            ("show", []) => Command::Show,
            ("toasts", []) => Command::Toasts,
            ("help" | "?", []) => Command::Help,
            ("quit" | "exit", []) => Command::Quit,
            _ => return Err(invalid(&format!("unknown command '{}', try help", line.trim()))),
        };
        Ok(command)
    }
}

fn invalid(message: &str) -> PanelError {
    PanelError::Validation(message.to_string())
}

fn switchable(register: &str) -> crate::Result<String> {
    if register_kind(register) == Some(RegisterKind::Boolean) && !LINK_REGISTERS.contains(&register)
    {
        Ok(register.to_string())
    } else {
        Err(invalid(&format!("'{}' has no switch", register)))
    }
}

/// Console session bound to a running synchronizer
#[derive(Debug)]
pub struct Console {
    synchronizer: PanelSynchronizer,
    view: Arc<ConsoleView>,
    toasts: Arc<ToastBoard>,
}

impl Console {
    pub fn new(
        synchronizer: PanelSynchronizer,
        view: Arc<ConsoleView>,
        toasts: Arc<ToastBoard>,
    ) -> Self {
        Self {
            synchronizer,
            view,
            toasts,
        }
    }

    /// Run a command and return what to print
    pub async fn execute(&self, command: Command) -> String {
        tracing::debug!("Console command {:?}", command);
        match command {
            Command::Refresh(source) => {
                self.synchronizer.refresh(source).await;
                self.view.render_text()
            }
            Command::Toggle { register, value } => {
                let value = value.unwrap_or_else(|| !self.view.switch(&register).is_checked());
                self.synchronizer
                    .write_register(&register, RegisterValue::Boolean(value))
                    .await;
                format!(
                    "{}: {}\n",
                    register,
                    on_off(self.view.switch(&register).is_checked())
                )
            }
            Command::Set { register, value } => {
                self.synchronizer
                    .write_register(&register, RegisterValue::Numeric(value))
                    .await;
                format!("{}: {}\n", register, self.view.readout(&register).text())
            }
            Command::Port(name) => choose(&self.view.port, "serial port", &name),
            Command::Speed(value) => choose(&self.view.speed, "speed", &value),
            Command::Apply => {
                self.synchronizer.apply_configuration().await;
                let connection = self.synchronizer.connection().await;
                format!(
                    "Configuration: port {} at {} RPM\n",
                    if connection.serial_port.is_empty() {
                        "-"
                    } else {
                        connection.serial_port.as_str()
                    },
                    connection.reference_speed
                )
            }
            Command::Status => match self.synchronizer.connection_status().await {
                Some(status) => {
                    let mut out = format!(
                        "connected: {}\nport: {}\nbaudrate: {}\nslave_id: {}\n",
                        if status.connected { "yes" } else { "no" },
                        status.port.as_deref().unwrap_or("-"),
                        status.baudrate.map_or("-".to_string(), |b| b.to_string()),
                        status.slave_id.map_or("-".to_string(), |s| s.to_string()),
                    );
                    if let Some(error) = status.error {
                        let _ = writeln!(out, "error: {}", error);
                    }
                    out
                }
                None => "Connection status unavailable\n".to_string(),
            },
            Command::Show => self.view.render_text(),
            Command::Toasts => {
                let active = self.toasts.active();
                if active.is_empty() {
                    return "No notifications\n".to_string();
                }
                active
                    .iter()
                    .map(|t| {
                        format!(
                            "[{}] {}: {} ({:?})\n",
                            t.severity.icon(),
                            t.severity.title(),
                            t.message,
                            t.phase
                        )
                    })
                    .collect()
            }
            Command::Help => HELP.to_string(),
            Command::Quit => String::new(),
        }
    }

    /// Read commands until quit, end of input or cancellation.
    ///
    /// Cancellation also abandons a command still waiting on the backend.
    pub async fn run<W>(
        &self,
        mut lines: mpsc::Receiver<String>,
        mut writer: W,
        cancel: CancellationToken,
    ) -> crate::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        writer.write_all(HELP.as_bytes()).await?;
        writer.flush().await?;

        loop {
            let line = tokio::select! {
                line = lines.recv() => line,
                _ = cancel.cancelled() => {
                    tracing::debug!("Console cancelled");
                    break;
                }
            };
            let Some(line) = line else {
                tracing::debug!("Console input closed");
                break;
            };
            if line.trim().is_empty() {
                continue;
            }

            let output = match line.parse::<Command>() {
                Ok(Command::Quit) => break,
                Ok(command) => tokio::select! {
                    output = self.execute(command) => output,
                    _ = cancel.cancelled() => {
                        tracing::debug!("Console cancelled during '{}'", line.trim());
                        break;
                    }
                },
                Err(e) => format!("{}\n", e),
            };
            writer.write_all(output.as_bytes()).await?;
            writer.flush().await?;
        }
        Ok(())
    }
}

/// Lines buffered between an input source and the console loop
const LINE_BUFFER: usize = 16;

/// Feed lines from an async reader into a console line channel
pub fn forward_lines<R>(reader: R) -> mpsc::Receiver<String>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(LINE_BUFFER);
    tokio::spawn(async move {
        let mut lines = reader.lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if tx.send(line).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("Failed to read console input: {}", e);
                    break;
                }
            }
        }
    });
    rx
}

/// Feed stdin lines into a console line channel.
///
/// Reads on a plain thread: a read blocked on the terminal does not hold up
/// runtime shutdown, the thread simply ends with the process.
pub fn stdin_lines() -> crate::Result<mpsc::Receiver<String>> {
    let (tx, rx) = mpsc::channel(LINE_BUFFER);
    std::thread::Builder::new()
        .name("console-stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lines() {
                match line {
                    Ok(line) => {
                        if tx.blocking_send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Failed to read stdin: {}", e);
                        break;
                    }
                }
            }
        })?;
    Ok(rx)
}

fn choose(selector: &MemorySelector, what: &str, value: &str) -> String {
    let options = selector.options();
    if options.iter().any(|o| !o.value.is_empty() && o.value == value) {
        selector.select(value);
        return format!(
            "Selected {} {}\n",
            what,
            selector.selected_label().unwrap_or_default()
        );
    }
    let available: Vec<&str> = options
        .iter()
        .filter(|o| !o.value.is_empty())
        .map(|o| o.value.as_str())
        .collect();
    if available.is_empty() {
        format!("No {} options available\n", what)
    } else {
        format!("Unknown {} '{}'; available: {}\n", what, value, available.join(", "))
    }
}
