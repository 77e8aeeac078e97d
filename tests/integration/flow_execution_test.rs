//! Flow execution against a scripted transport.

use super::{temp_project, ScriptedTransport};
use rest_flow::config::CapturePolicy;
use rest_flow::executor::SendError;
use rest_flow::flow::{execute_flow, Flow, FlowError};
use rest_flow::models::RequestTemplate;
use rest_flow::variables::parse_capture_spec;
use rest_flow::Project;
use serde_json::json;
use std::collections::HashMap;

fn login() -> RequestTemplate {
    let mut template = RequestTemplate::with_target("login", "POST", "${BASE}/login");
    template.body = Some(br#"{"user": "${USER}"}"#.to_vec());
    template.set_capture(parse_capture_spec("token", ".auth.token").unwrap());
    template
}

fn profile() -> RequestTemplate {
    let mut template = RequestTemplate::with_target("profile", "GET", "${BASE}/me");
    template.add_header("Authorization", "Bearer ${TOKEN}");
    template
}

/// A project with `login -> profile` as the `smoke` flow.
fn smoke_project() -> (tempfile::TempDir, Project) {
    let (dir, _, mut project) = temp_project("flows");
    project.vars.set("base", "http://api.test");
    project.vars.set("user", "alice");
    project.add_template(login()).unwrap();
    project.add_template(profile()).unwrap();
    project
        .add_flow(Flow::new("smoke", ["login", "profile"]))
        .unwrap();
    (dir, project)
}

fn no_overrides() -> HashMap<String, String> {
    HashMap::new()
}

#[test]
fn test_captured_token_reaches_next_step() {
    let (_dir, mut project) = smoke_project();
    let transport = ScriptedTransport::new()
        .reply_json(json!({"auth": {"token": "abc"}}))
        .reply_json(json!({"name": "alice"}));

    let outcome = execute_flow(&mut project, "smoke", &no_overrides(), &transport).unwrap();

    assert_eq!(outcome.flow, "smoke");
    assert_eq!(outcome.steps.len(), 2);
    assert_eq!(outcome.steps[0].template, "login");
    assert_eq!(
        outcome.steps[0].result.captures.captured,
        vec![("TOKEN".to_string(), "abc".to_string())]
    );

    let sent = transport.sent.borrow();
    assert_eq!(sent[0].url, "http://api.test/login");
    assert_eq!(sent[0].body.as_deref(), Some(&br#"{"user": "alice"}"#[..]));
    assert_eq!(sent[1].header("authorization"), Some("Bearer abc"));
    assert_eq!(project.vars.get("token"), "abc");
}

#[test]
fn test_flow_names_are_case_insensitive() {
    let (_dir, mut project) = smoke_project();
    let transport = ScriptedTransport::new()
        .reply_json(json!({"auth": {"token": "abc"}}))
        .reply_json(json!({}));

    assert!(execute_flow(&mut project, "SMOKE", &no_overrides(), &transport).is_ok());
    assert!(matches!(
        execute_flow(&mut project, "nope", &no_overrides(), &transport),
        Err(FlowError::NoSuchFlow(_))
    ));
}

#[test]
fn test_overrides_beat_captured_values() {
    let (_dir, mut project) = smoke_project();
    let transport = ScriptedTransport::new()
        .reply_json(json!({"auth": {"token": "captured"}}))
        .reply_json(json!({}));
    let overrides = HashMap::from([("Token".to_string(), "forced".to_string())]);

    execute_flow(&mut project, "smoke", &overrides, &transport).unwrap();

    assert_eq!(
        transport.sent.borrow()[1].header("Authorization"),
        Some("Bearer forced")
    );
    // The capture is still stored for later invocations.
    assert_eq!(project.vars.get("TOKEN"), "captured");
}

#[test]
fn test_missing_template_stops_flow_and_keeps_earlier_effects() {
    let (_dir, project) = smoke_project();

    // A flow can keep pointing at a template that no longer exists.
    let mut json = serde_json::to_value(&project).unwrap();
    json["flows"][0]["steps"][1] = json!("ghost");
    let mut project: Project = serde_json::from_value(json).unwrap();

    let transport = ScriptedTransport::new().reply_json(json!({"auth": {"token": "abc"}}));
    let err = execute_flow(&mut project, "smoke", &no_overrides(), &transport).unwrap_err();

    match &err {
        FlowError::MissingTemplate { step, template } => {
            assert_eq!(*step, 2);
            assert_eq!(template, "ghost");
        }
        other => panic!("Expected MissingTemplate, got {:?}", other),
    }
    assert!(err.to_string().contains("non-existent template"));
    assert_eq!(transport.sent_count(), 1);
    assert_eq!(project.vars.get("token"), "abc");
}

#[test]
fn test_incomplete_template_is_never_sent() {
    let (_dir, mut project) = smoke_project();
    project.add_template(RequestTemplate::new("draft")).unwrap();
    project
        .add_flow(Flow::new("drafty", ["login", "draft"]))
        .unwrap();

    let transport = ScriptedTransport::new().reply_json(json!({"auth": {"token": "abc"}}));
    let err = execute_flow(&mut project, "drafty", &no_overrides(), &transport).unwrap_err();

    assert!(matches!(err, FlowError::IncompleteTemplate { step: 2, .. }));
    assert!(err.to_string().contains("incomplete template"));
    assert_eq!(transport.sent_count(), 1);
}

#[test]
fn test_unresolved_placeholder_fails_step_before_sending() {
    let (_dir, mut project) = smoke_project();
    project.vars.remove("base");

    let transport = ScriptedTransport::new();
    let err = execute_flow(&mut project, "smoke", &no_overrides(), &transport).unwrap_err();

    assert!(matches!(
        err,
        FlowError::StepFailed {
            step: 1,
            source: SendError::Substitution { .. },
            ..
        }
    ));
    assert_eq!(transport.sent_count(), 0);
}

#[test]
fn test_transport_failure_reports_step() {
    let (_dir, mut project) = smoke_project();
    let transport = ScriptedTransport::new().reply_json(json!({"auth": {"token": "abc"}}));

    let err = execute_flow(&mut project, "smoke", &no_overrides(), &transport).unwrap_err();

    match err {
        FlowError::StepFailed {
            step,
            template,
            source: SendError::Transport(_),
        } => {
            assert_eq!(step, 2);
            assert_eq!(template, "profile");
        }
        other => panic!("Expected transport failure, got {:?}", other),
    }
}

#[test]
fn test_capture_failure_warns_by_default() {
    let (_dir, mut project) = smoke_project();
    let transport = ScriptedTransport::new()
        .reply_json(json!({"unexpected": true}))
        .reply_json(json!({}));
    project.vars.set("token", "stale");

    let outcome = execute_flow(&mut project, "smoke", &no_overrides(), &transport).unwrap();

    assert_eq!(outcome.steps.len(), 2);
    assert_eq!(outcome.steps[0].result.captures.failures.len(), 1);
    assert_eq!(outcome.steps[0].result.captures.failures[0].variable, "TOKEN");
    // A failed capture leaves the old value in place.
    assert_eq!(
        transport.sent.borrow()[1].header("Authorization"),
        Some("Bearer stale")
    );
}

#[test]
fn test_capture_failure_aborts_under_abort_policy() {
    let (_dir, mut project) = smoke_project();
    project.settings.capture_policy = CapturePolicy::Abort;
    let transport = ScriptedTransport::new()
        .reply_json(json!({"unexpected": true}))
        .reply_json(json!({}));

    let err = execute_flow(&mut project, "smoke", &no_overrides(), &transport).unwrap_err();

    match err {
        FlowError::StepFailed {
            step: 1,
            source: SendError::CaptureFailed(failures),
            ..
        } => assert_eq!(failures.len(), 1),
        other => panic!("Expected capture abort, got {:?}", other),
    }
    assert_eq!(transport.sent_count(), 1);
    // The aborted step is still in history.
    assert_eq!(project.history().unwrap().len(), 1);
}

#[test]
fn test_history_records_flow_steps() {
    let (_dir, mut project) = smoke_project();
    let transport = ScriptedTransport::new()
        .reply_json(json!({"auth": {"token": "abc"}}))
        .reply_json(json!({}));

    execute_flow(&mut project, "smoke", &no_overrides(), &transport).unwrap();
    project.save().unwrap();

    let history = project.history().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].template, "login");
    assert_eq!(history[1].template, "profile");
    assert!(history.iter().all(|entry| entry.flow.as_deref() == Some("smoke")));
    // Credentials are stripped before history is written.
    assert_eq!(history[1].request.header("authorization"), None);
}

#[test]
fn test_history_can_be_disabled() {
    let (_dir, mut project) = smoke_project();
    project.settings.record_history = false;
    let transport = ScriptedTransport::new()
        .reply_json(json!({"auth": {"token": "abc"}}))
        .reply_json(json!({}));

    execute_flow(&mut project, "smoke", &no_overrides(), &transport).unwrap();
    project.save().unwrap();

    assert!(project.history().unwrap().is_empty());
    assert!(!project.history_path().exists());
}
