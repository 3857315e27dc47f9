//! BDD step definitions for polling, rendering, writes and configuration

use std::time::Duration;

use cucumber::{then, when};

use control_panel::memory::ClassEvent;
use control_panel::registers::RegisterValue;
use control_panel::synchronizer::RefreshSource;
use control_panel::toast::Severity;
use control_panel::widgets::{Button, Selector, Switch, BOUNCE_CLASS};

use crate::world::{parse_severity, PanelWorld};

fn on_off(word: &str) -> bool {
    match word {
        "on" => true,
        "off" => false,
        other => panic!("expected on or off, got '{}'", other),
    }
}

// --- When steps ---

#[when("the panel bootstraps")]
async fn panel_bootstraps(world: &mut PanelWorld) {
    let synchronizer = world.panel().synchronizer().clone();
    synchronizer.bootstrap().await;
}

#[when("a routine poll runs")]
async fn routine_poll(world: &mut PanelWorld) {
    let synchronizer = world.panel().synchronizer().clone();
    synchronizer.poll().await;
}

#[when("the user refreshes the panel")]
async fn user_refreshes(world: &mut PanelWorld) {
    let synchronizer = world.panel().synchronizer().clone();
    synchronizer.refresh(RefreshSource::Desktop).await;
}

#[when("the user refreshes from both controls at once")]
async fn user_refreshes_twice(world: &mut PanelWorld) {
    let synchronizer = world.panel().synchronizer().clone();
    tokio::join!(
        synchronizer.refresh(RefreshSource::Desktop),
        synchronizer.refresh(RefreshSource::Mobile)
    );
}

#[when(expr = "the user turns {string} {word}")]
async fn user_turns(world: &mut PanelWorld, register: String, state: String) {
    let synchronizer = world.panel().synchronizer().clone();
    synchronizer
        .write_register(&register, RegisterValue::Boolean(on_off(&state)))
        .await;
}

#[when(expr = "the user sets {string} to {int}")]
async fn user_sets(world: &mut PanelWorld, register: String, value: i64) {
    let synchronizer = world.panel().synchronizer().clone();
    synchronizer
        .write_register(&register, RegisterValue::Numeric(value as f64))
        .await;
}

#[when(expr = "the user selects port {string}")]
fn user_selects_port(world: &mut PanelWorld, port: String) {
    world.panel().view().port.select(&port);
}

#[when(expr = "the user selects speed {string}")]
fn user_selects_speed(world: &mut PanelWorld, speed: String) {
    world.panel().view().speed.select(&speed);
}

#[when("the user applies the configuration")]
async fn user_applies(world: &mut PanelWorld) {
    let synchronizer = world.panel().synchronizer().clone();
    synchronizer.apply_configuration().await;
}

// --- Then steps: widgets ---

#[then(expr = "switch {string} should be {word}")]
fn switch_should_be(world: &mut PanelWorld, register: String, state: String) {
    let checked = world.panel().view().switch(&register).is_checked();
    assert_eq!(checked, on_off(&state), "switch '{}'", register);
}

#[then(expr = "readout {string} should show {string}")]
fn readout_should_show(world: &mut PanelWorld, register: String, expected: String) {
    let text = world.panel().view().readout(&register).text();
    assert_eq!(text, expected, "readout '{}'", register);
}

#[then(expr = "link {string} should show {string}")]
fn link_should_show(world: &mut PanelWorld, register: String, expected: String) {
    let label = world.panel().view().link(&register).label();
    assert_eq!(label, expected, "link '{}'", register);
}

#[then(expr = "the error banner should show {string}")]
fn banner_should_show(world: &mut PanelWorld, expected: String) {
    let message = world.panel().view().banner.message();
    assert_eq!(message.as_deref(), Some(expected.as_str()));
}

#[then("the error banner should be hidden")]
fn banner_should_be_hidden(world: &mut PanelWorld) {
    let message = world.panel().view().banner.message();
    assert_eq!(message, None);
}

#[then("both refresh buttons should be enabled")]
fn refresh_buttons_enabled(world: &mut PanelWorld) {
    let view = world.panel().view();
    assert!(view.refresh.is_enabled(), "desktop refresh disabled");
    assert!(view.refresh_mobile.is_enabled(), "mobile refresh disabled");
}

#[then("the apply button should be enabled")]
fn apply_button_enabled(world: &mut PanelWorld) {
    assert!(world.panel().view().apply.is_enabled());
}

#[then(expr = "the direction icon should point {word}")]
fn icon_should_point(world: &mut PanelWorld, way: String) {
    let expected = match way.as_str() {
        "up" => 0,
        "down" => 180,
        other => panic!("unknown direction '{}'", other),
    };
    assert_eq!(world.panel().view().icon.rotation(), expected);
}

#[then("the direction icon should bounce")]
fn icon_should_bounce(world: &mut PanelWorld) {
    assert!(world.panel().view().icon.has_class(BOUNCE_CLASS));
}

#[then(expr = "after {int} ms the direction icon should not bounce")]
async fn icon_stops_bouncing(world: &mut PanelWorld, ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    assert!(!world.panel().view().icon.has_class(BOUNCE_CLASS));
}

#[then(regex = r"^the direction icon should have bounced (\d+) times?$")]
fn icon_bounce_count(world: &mut PanelWorld, times: usize) {
    let added = world
        .panel()
        .view()
        .icon
        .class_events()
        .iter()
        .filter(|e| matches!(e, ClassEvent::Added(c) if c == BOUNCE_CLASS))
        .count();
    assert_eq!(added, times);
}

#[then(expr = "the port selector should show {string}")]
fn port_selector_shows(world: &mut PanelWorld, expected: String) {
    let label = world.panel().view().port.selected_label();
    assert_eq!(label.as_deref(), Some(expected.as_str()));
}

#[then(expr = "the speed selector should show {string}")]
fn speed_selector_shows(world: &mut PanelWorld, expected: String) {
    let label = world.panel().view().speed.selected_label();
    assert_eq!(label.as_deref(), Some(expected.as_str()));
}

#[then(expr = "the speed selector should offer {string}")]
fn speed_selector_offers(world: &mut PanelWorld, expected: String) {
    let values: Vec<String> = world
        .panel()
        .view()
        .speed
        .options()
        .into_iter()
        .map(|o| o.value)
        .collect();
    assert_eq!(values.join(", "), expected);
}

#[then(expr = "the connection config should be {string} at {int}")]
async fn connection_config_is(world: &mut PanelWorld, port: String, speed: i64) {
    let synchronizer = world.panel().synchronizer().clone();
    let connection = synchronizer.connection().await;
    assert_eq!(connection.serial_port, port);
    assert_eq!(connection.reference_speed, speed);
}

// --- Then steps: toasts ---

#[then(regex = r#"^an? (success|warning|error) toast "(.*)" should be shown$"#)]
fn toast_should_be_shown(world: &mut PanelWorld, severity: String, message: String) {
    let severity = parse_severity(&severity);
    let history = world.panel().toasts().history();
    assert!(
        history
            .iter()
            .any(|t| t.severity == severity && t.message == message),
        "no {} toast '{}' in {:?}",
        severity,
        message,
        history
    );
}

#[then(regex = r"^exactly (\d+) (success|warning|error) toasts? should have been shown$")]
fn toast_count(world: &mut PanelWorld, count: usize, severity: String) {
    let severity = parse_severity(&severity);
    assert_eq!(world.panel().toasts().count(severity), count);
}

#[then("no toast should have been shown")]
fn no_toast(world: &mut PanelWorld) {
    let history = world.panel().toasts().history();
    assert!(history.is_empty(), "unexpected toasts {:?}", history);
}

#[then(expr = "within {int} seconds a warning toast {string} should be shown")]
async fn warning_toast_within(world: &mut PanelWorld, seconds: u64, message: String) {
    let toasts = world.panel().toasts().clone();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(seconds);
    loop {
        if toasts
            .history()
            .iter()
            .any(|t| t.severity == Severity::Warning && t.message == message)
        {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "warning '{}' not shown within {}s",
            message,
            seconds
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

// --- Then steps: backend traffic ---

#[then(expr = "the backend should have received a boolean write of {string} = {word}")]
async fn backend_received_boolean_write(world: &mut PanelWorld, register: String, value: String) {
    let writes = world.backend().requests_to("/api/set_register").await;
    let expected = serde_json::json!({
        "register": register,
        "value": on_off(&value),
        "type": "boolean",
    });
    assert!(
        writes.iter().any(|w| w.body.as_ref() == Some(&expected)),
        "no write {} in {:?}",
        expected,
        writes
    );
}

#[then(expr = "the backend should have received configuration {string} at {int}")]
async fn backend_received_configuration(world: &mut PanelWorld, port: String, speed: i64) {
    let requests = world.backend().requests_to("/api/apply_configuration").await;
    let expected = serde_json::json!({"serial_port": port, "reference_speed": speed});
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].body.as_ref(), Some(&expected));
}

#[then(expr = "the backend should not have received {string}")]
async fn backend_not_received(world: &mut PanelWorld, path: String) {
    let requests = world.backend().requests_to(&path).await;
    assert!(requests.is_empty(), "unexpected requests {:?}", requests);
}
