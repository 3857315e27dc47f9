//! Client for the panel backend REST API

use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};

use crate::io::{HttpClient, HttpResponse};
use crate::registers::{PanelSnapshot, RegisterKind, RegisterValue};
use crate::PanelError;

/// `GET /api/serial_ports`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SerialPorts {
    #[serde(default)]
    pub ports: Vec<String>,
    #[serde(default)]
    pub current_port: Option<String>,
}

/// `GET /api/reference_speed_options`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SpeedOptions {
    #[serde(default, deserialize_with = "speed_list")]
    pub options: Vec<i64>,
    #[serde(default, deserialize_with = "optional_speed")]
    pub current_speed: Option<i64>,
}

// The backend may send speeds as JSON floats (`750.0`); round to whole RPM.
fn speed_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<i64>, D::Error> {
    let speeds = Vec::<f64>::deserialize(deserializer)?;
    Ok(speeds.into_iter().map(whole_rpm).collect())
}

fn optional_speed<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.map(whole_rpm))
}

fn whole_rpm(speed: f64) -> i64 {
    speed.round() as i64
}

/// `GET /api/status`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ConnectionStatus {
    pub connected: bool,
    #[serde(default)]
    pub port: Option<String>,
    #[serde(default)]
    pub baudrate: Option<u32>,
    #[serde(default)]
    pub slave_id: Option<u32>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Body of `POST /api/set_register`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegisterWrite {
    pub register: String,
    pub value: RegisterValue,
    #[serde(rename = "type")]
    pub kind: RegisterKind,
}

impl RegisterWrite {
    pub fn new(register: &str, value: RegisterValue) -> Self {
        Self {
            register: register.to_string(),
            value,
            kind: value.kind(),
        }
    }
}

/// Body of `POST /api/apply_configuration`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigurationRequest {
    pub serial_port: String,
    pub reference_speed: i64,
}

/// Successful configuration change; the backend may attach a warning
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub warning: Option<String>,
}

/// `{success, error?, warning?}` envelope of write endpoints
#[derive(Debug, Deserialize)]
struct WriteResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    warning: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Typed access to the backend endpoints.
///
/// Non-2xx statuses map to [`PanelError::Http`] and `success: false` bodies
/// to [`PanelError::Backend`]; callers treat both the same way.
pub struct BackendClient {
    base_url: String,
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl BackendClient {
    pub fn new(base_url: &str, http: Arc<dyn HttpClient>) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        tracing::debug!("Created BackendClient for {}", base_url);
        Self { base_url, http }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn serial_ports(&self) -> crate::Result<SerialPorts> {
        let response = self.http.get(&self.url("/api/serial_ports")).await?;
        let body = check_status(response)?;
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn reference_speed_options(&self) -> crate::Result<SpeedOptions> {
        let response = self
            .http
            .get(&self.url("/api/reference_speed_options"))
            .await?;
        let body = check_status(response)?;
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn registers(&self) -> crate::Result<PanelSnapshot> {
        let response = self.http.get(&self.url("/api/get_registers")).await?;
        let body = check_status(response)?;
        PanelSnapshot::from_json(&body)
    }

    pub async fn set_register(&self, write: &RegisterWrite) -> crate::Result<()> {
        let body = serde_json::to_value(write)?;
        let response = self
            .http
            .post_json(&self.url("/api/set_register"), &body)
            .await?;
        check_write(response).map(|_| ())
    }

    pub async fn apply_configuration(
        &self,
        request: &ConfigurationRequest,
    ) -> crate::Result<ApplyOutcome> {
        let body = serde_json::to_value(request)?;
        let response = self
            .http
            .post_json(&self.url("/api/apply_configuration"), &body)
            .await?;
        let parsed = check_write(response)?;
        Ok(ApplyOutcome {
            warning: parsed.warning.filter(|w| !w.is_empty()),
        })
    }

    pub async fn connection_status(&self) -> crate::Result<ConnectionStatus> {
        let response = self.http.get(&self.url("/api/status")).await?;
        let body = check_status(response)?;
        Ok(serde_json::from_str(&body)?)
    }
}

fn check_status(response: HttpResponse) -> crate::Result<String> {
    if response.is_success() {
        return Ok(response.body);
    }
    let detail = serde_json::from_str::<ErrorBody>(&response.body)
        .ok()
        .map(|b| b.error)
        .filter(|e| !e.is_empty());
    Err(PanelError::Http(match detail {
        Some(detail) => format!("HTTP error: {}: {}", response.status, detail),
        None => format!("HTTP error: {}", response.status),
    }))
}

fn check_write(response: HttpResponse) -> crate::Result<WriteResponse> {
    let body = check_status(response)?;
    let parsed: WriteResponse = serde_json::from_str(&body)?;
    if parsed.success {
        Ok(parsed)
    } else {
        Err(PanelError::Backend(
            parsed
                .error
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| "Unknown error".to_string()),
        ))
    }
}
