//! Error types for the control panel

/// Errors that can occur while synchronizing the panel with the backend
#[derive(Debug, thiserror::Error)]
pub enum PanelError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Http(String),

    #[error("{0}")]
    Backend(String),

    #[error("{0}")]
    Validation(String),

    #[error("Render map error: {0}")]
    Render(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for control panel operations
pub type Result<T> = std::result::Result<T, PanelError>;
