//! Render target capabilities and the register -> target map
//!
//! The synchronizer never addresses widgets by name. Every register key is
//! resolved once, at construction, to the capabilities that display it.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;

use crate::registers::{RegisterKind, RegisterSpec};

/// CSS-style class toggled on the direction icon during a flip
pub const BOUNCE_CLASS: &str = "bounce";

/// A two-state switch bound to a boolean register
pub trait Switch: Send + Sync + Debug {
    fn set_checked(&self, checked: bool);
    fn is_checked(&self) -> bool;
}

/// A text element showing a formatted numeric register
pub trait Readout: Send + Sync + Debug {
    fn set_text(&self, text: &str);
}

/// Connected/disconnected badge
pub trait LinkIndicator: Send + Sync + Debug {
    fn set_connected(&self, connected: bool);
}

/// Arrow icon driven by the `direction` and `move` registers
pub trait DirectionIcon: Send + Sync + Debug {
    fn set_rotation(&self, degrees: u16);
    fn set_active(&self, active: bool);
    fn add_class(&self, class: &str);
    fn remove_class(&self, class: &str);
}

/// One entry in a selection control
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }

    /// An entry with an empty value, used for "nothing to pick" states
    pub fn placeholder(label: impl Into<String>) -> Self {
        Self::new(String::new(), label)
    }
}

/// Drop-down style selection control
pub trait Selector: Send + Sync + Debug {
    /// Replace all options. The first option becomes the selection.
    fn set_options(&self, options: Vec<SelectOption>);
    /// Select the option with this value, if present
    fn select(&self, value: &str);
    /// Value of the current selection
    fn selected(&self) -> Option<String>;
}

pub trait Button: Send + Sync + Debug {
    fn set_enabled(&self, enabled: bool);
    fn is_enabled(&self) -> bool;
}

/// Persistent error panel
pub trait Banner: Send + Sync + Debug {
    fn show(&self, message: &str);
    fn hide(&self);
}

/// A capability that a register value can be rendered into
#[derive(Debug, Clone)]
pub enum RenderTarget {
    Switch(Arc<dyn Switch>),
    Readout(Arc<dyn Readout>),
    Link(Arc<dyn LinkIndicator>),
}

impl RenderTarget {
    fn accepts(&self, kind: RegisterKind) -> bool {
        match self {
            RenderTarget::Switch(_) | RenderTarget::Link(_) => kind == RegisterKind::Boolean,
            RenderTarget::Readout(_) => kind == RegisterKind::Numeric,
        }
    }
}

/// Register key -> render targets, plus the direction icon
#[derive(Debug, Clone, Default)]
pub struct RenderMap {
    targets: BTreeMap<String, Vec<RenderTarget>>,
    direction_icon: Option<Arc<dyn DirectionIcon>>,
}

impl RenderMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_switch(mut self, key: &str, switch: Arc<dyn Switch>) -> Self {
        self.push(key, RenderTarget::Switch(switch));
        self
    }

    pub fn with_readout(mut self, key: &str, readout: Arc<dyn Readout>) -> Self {
        self.push(key, RenderTarget::Readout(readout));
        self
    }

    pub fn with_link(mut self, key: &str, indicator: Arc<dyn LinkIndicator>) -> Self {
        self.push(key, RenderTarget::Link(indicator));
        self
    }

    pub fn with_direction_icon(mut self, icon: Arc<dyn DirectionIcon>) -> Self {
        self.direction_icon = Some(icon);
        self
    }

    fn push(&mut self, key: &str, target: RenderTarget) {
        self.targets.entry(key.to_string()).or_default().push(target);
    }

    pub fn targets(&self, key: &str) -> &[RenderTarget] {
        self.targets.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Switches bound to a register (usually one)
    pub fn switches(&self, key: &str) -> impl Iterator<Item = &Arc<dyn Switch>> {
        self.targets(key).iter().filter_map(|t| match t {
            RenderTarget::Switch(s) => Some(s),
            _ => None,
        })
    }

    pub fn direction_icon(&self) -> Option<&Arc<dyn DirectionIcon>> {
        self.direction_icon.as_ref()
    }

    /// Check that every catalog register has a target of the right kind
    /// and that the direction icon is bound.
    pub fn validate(&self, catalog: &[RegisterSpec]) -> crate::Result<()> {
        let mut problems = Vec::new();
        for spec in catalog {
            let targets = self.targets(spec.key);
            if targets.is_empty() {
                problems.push(format!("'{}' has no target", spec.key));
            } else if let Some(bad) = targets.iter().find(|t| !t.accepts(spec.kind)) {
                problems.push(format!(
                    "'{}' is {} but bound to {:?}",
                    spec.key,
                    spec.kind.as_str(),
                    bad
                ));
            }
        }
        if self.direction_icon.is_none() {
            problems.push("direction icon is not bound".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(crate::PanelError::Render(problems.join("; ")))
        }
    }
}

/// Input controls that are not tied to a single register
#[derive(Debug, Clone)]
pub struct Controls {
    pub port_selector: Arc<dyn Selector>,
    pub speed_selector: Arc<dyn Selector>,
    pub apply_button: Arc<dyn Button>,
    pub refresh_button: Arc<dyn Button>,
    pub refresh_button_mobile: Arc<dyn Button>,
    pub error_banner: Arc<dyn Banner>,
}

/// Everything the synchronizer renders into
#[derive(Debug, Clone)]
pub struct PanelView {
    pub targets: RenderMap,
    pub controls: Controls,
}
