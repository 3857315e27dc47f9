//! BDD step definitions for the control panel

pub mod backend_steps;
pub mod panel_steps;
