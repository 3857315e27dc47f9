//! BDD test world for the control panel

use std::collections::HashMap;
use std::sync::Arc;

use cucumber::World;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use control_panel::config::{BackendConfig, Config};
use control_panel::io::{HttpClient, HttpResponse};
use control_panel::toast::Severity;
use control_panel::{ControlPanel, PanelBuilder, PanelError};

pub const BASE_URL: &str = "http://panel.test";

/// A request seen by [`FakeBackend`]
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub path: String,
    pub body: Option<serde_json::Value>,
}

/// Route table standing in for the register backend.
///
/// A route mapped to `None` behaves like a refused connection.
#[derive(Debug)]
pub struct FakeBackend {
    routes: RwLock<HashMap<(&'static str, String), Option<HttpResponse>>>,
    pub requests: RwLock<Vec<RecordedRequest>>,
}

fn ok(body: &str) -> Option<HttpResponse> {
    Some(HttpResponse {
        status: 200,
        body: body.to_string(),
    })
}

impl Default for FakeBackend {
    fn default() -> Self {
        let routes = HashMap::from([
            (("GET", "/api/serial_ports".to_string()), ok(r#"{"ports": []}"#)),
            (
                ("GET", "/api/reference_speed_options".to_string()),
                ok(r#"{"options": []}"#),
            ),
            (("GET", "/api/get_registers".to_string()), ok("{}")),
            (("GET", "/api/status".to_string()), ok(r#"{"connected": false}"#)),
            (
                ("POST", "/api/set_register".to_string()),
                ok(r#"{"success": true}"#),
            ),
            (
                ("POST", "/api/apply_configuration".to_string()),
                ok(r#"{"success": true}"#),
            ),
        ]);
        Self {
            routes: RwLock::new(routes),
            requests: RwLock::new(Vec::new()),
        }
    }
}

impl FakeBackend {
    pub async fn respond(&self, method: &'static str, path: &str, status: u16, body: &str) {
        self.routes.write().await.insert(
            (method, path.to_string()),
            Some(HttpResponse {
                status,
                body: body.to_string(),
            }),
        );
    }

    /// Refuse every known route
    pub async fn go_offline(&self) {
        for reply in self.routes.write().await.values_mut() {
            *reply = None;
        }
    }

    pub async fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests
            .read()
            .await
            .iter()
            .filter(|r| r.path == path)
            .cloned()
            .collect()
    }

    async fn reply(
        &self,
        method: &'static str,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> control_panel::Result<HttpResponse> {
        let path = url.strip_prefix(BASE_URL).unwrap_or(url).to_string();
        self.requests.write().await.push(RecordedRequest {
            method,
            path: path.clone(),
            body: body.cloned(),
        });
        match self.routes.read().await.get(&(method, path)) {
            Some(Some(response)) => Ok(response.clone()),
            Some(None) => Err(PanelError::Http(format!(
                "{} {} failed: connection refused",
                method, url
            ))),
            None => Ok(HttpResponse {
                status: 404,
                body: String::new(),
            }),
        }
    }
}

#[async_trait::async_trait]
impl HttpClient for FakeBackend {
    async fn get(&self, url: &str) -> control_panel::Result<HttpResponse> {
        self.reply("GET", url, None).await
    }

    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> control_panel::Result<HttpResponse> {
        self.reply("POST", url, Some(body)).await
    }
}

#[derive(Debug, Default, World)]
pub struct PanelWorld {
    pub backend: Option<Arc<FakeBackend>>,
    pub poll_interval_ms: Option<u64>,
    pub cancel: Option<CancellationToken>,
    pub panel: Option<ControlPanel>,

    // Lifecycle
    pub build_error: Option<String>,
    pub start_succeeded: Option<bool>,

    // Console
    pub console_output: Option<String>,
}

impl PanelWorld {
    pub fn backend(&mut self) -> Arc<FakeBackend> {
        self.backend.get_or_insert_with(Default::default).clone()
    }

    pub fn config(&self) -> Config {
        let mut config = Config {
            backend: BackendConfig {
                base_url: BASE_URL.to_string(),
            },
            ..Config::default()
        };
        if let Some(interval_ms) = self.poll_interval_ms {
            config.polling.interval_ms = interval_ms;
        }
        config
    }

    pub fn builder(&mut self) -> PanelBuilder {
        let http = self.backend();
        let mut builder =
            PanelBuilder::new(self.config()).with_http_client(http as Arc<dyn HttpClient>);
        if let Some(cancel) = self.cancel.take() {
            builder = builder.with_cancellation_token(cancel);
        }
        builder
    }

    /// The panel under test, built on first use
    pub fn panel(&mut self) -> &ControlPanel {
        if self.panel.is_none() {
            let panel = self.builder().build().expect("panel should build");
            self.panel = Some(panel);
        }
        self.panel.as_ref().expect("panel was just built")
    }
}

pub fn parse_severity(word: &str) -> Severity {
    match word {
        "success" => Severity::Success,
        "warning" => Severity::Warning,
        "error" => Severity::Error,
        other => panic!("unknown toast severity '{}'", other),
    }
}
