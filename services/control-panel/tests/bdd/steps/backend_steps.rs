//! Given steps describing how the fake backend answers

use cucumber::gherkin::Step;
use cucumber::{given, when};

use crate::world::PanelWorld;

fn docstring(step: &Step) -> &str {
    step.docstring
        .as_deref()
        .expect("step needs a docstring")
        .trim()
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

async fn serve_registers(world: &mut PanelWorld, step: &Step) {
    let body = docstring(step).to_string();
    world
        .backend()
        .respond("GET", "/api/get_registers", 200, &body)
        .await;
}

#[given("the backend reports registers:")]
async fn backend_reports_registers(world: &mut PanelWorld, step: &Step) {
    serve_registers(world, step).await;
}

#[when("the backend starts reporting registers:")]
async fn backend_starts_reporting(world: &mut PanelWorld, step: &Step) {
    serve_registers(world, step).await;
}

#[given(expr = "the backend answers GET {string} with status {int}")]
async fn backend_answers_status(world: &mut PanelWorld, path: String, status: u16) {
    world.backend().respond("GET", &path, status, "").await;
}

#[given(expr = "the backend answers GET {string} with status {int} and body:")]
async fn backend_answers_status_with_body(
    world: &mut PanelWorld,
    path: String,
    status: u16,
    step: &Step,
) {
    let body = docstring(step).to_string();
    world.backend().respond("GET", &path, status, &body).await;
}

#[given("the backend is unreachable")]
async fn backend_unreachable(world: &mut PanelWorld) {
    world.backend().go_offline().await;
}

#[given(expr = "the backend lists serial ports {string} with {string} selected")]
async fn backend_lists_ports(world: &mut PanelWorld, ports: String, current: String) {
    let body = serde_json::json!({"ports": split_list(&ports), "current_port": current});
    world
        .backend()
        .respond("GET", "/api/serial_ports", 200, &body.to_string())
        .await;
}

#[given("the backend lists no serial ports")]
async fn backend_lists_no_ports(world: &mut PanelWorld) {
    world
        .backend()
        .respond("GET", "/api/serial_ports", 200, r#"{"ports": []}"#)
        .await;
}

fn speeds(list: &str) -> Vec<i64> {
    split_list(list)
        .iter()
        .map(|s| s.parse().expect("speed must be an integer"))
        .collect()
}

#[given(expr = "the backend offers speeds {string}")]
async fn backend_offers_speeds(world: &mut PanelWorld, list: String) {
    let body = serde_json::json!({"options": speeds(&list)});
    world
        .backend()
        .respond("GET", "/api/reference_speed_options", 200, &body.to_string())
        .await;
}

#[given(expr = "the backend offers speeds {string} with {int} selected")]
async fn backend_offers_speeds_selected(world: &mut PanelWorld, list: String, current: i64) {
    let body = serde_json::json!({"options": speeds(&list), "current_speed": current});
    world
        .backend()
        .respond("GET", "/api/reference_speed_options", 200, &body.to_string())
        .await;
}

#[given(expr = "the backend rejects writes with {string}")]
async fn backend_rejects_writes(world: &mut PanelWorld, error: String) {
    let body = serde_json::json!({"success": false, "error": error});
    world
        .backend()
        .respond("POST", "/api/set_register", 200, &body.to_string())
        .await;
}

#[given(expr = "the backend accepts configurations with warning {string}")]
async fn backend_accepts_with_warning(world: &mut PanelWorld, warning: String) {
    let body = serde_json::json!({"success": true, "warning": warning});
    world
        .backend()
        .respond("POST", "/api/apply_configuration", 200, &body.to_string())
        .await;
}

#[given(expr = "the backend rejects configurations with {string}")]
async fn backend_rejects_configurations(world: &mut PanelWorld, error: String) {
    let body = serde_json::json!({"success": false, "error": error});
    world
        .backend()
        .respond("POST", "/api/apply_configuration", 200, &body.to_string())
        .await;
}

#[given("the backend reports connection status:")]
async fn backend_reports_status(world: &mut PanelWorld, step: &Step) {
    let body = docstring(step).to_string();
    world.backend().respond("GET", "/api/status", 200, &body).await;
}

#[when("the backend goes offline")]
async fn backend_goes_offline(world: &mut PanelWorld) {
    world.backend().go_offline().await;
}
