//! Project files on disk: save/load round trips and side files.

use super::{temp_project, ScriptedTransport};
use rest_flow::auth::AuthConfig;
use rest_flow::config::{set_setting, CapturePolicy};
use rest_flow::flow::{Flow, StepEdits};
use rest_flow::models::RequestTemplate;
use rest_flow::variables::parse_capture_spec;
use rest_flow::{Project, ProjectError};
use serde_json::json;
use std::collections::HashMap;
use std::fs;

#[test]
fn test_round_trip_preserves_everything() {
    let (_dir, path, mut project) = temp_project("round-trip");

    let mut upload = RequestTemplate::with_target("upload", "PUT", "${BASE}/blob");
    upload.add_header("X-Tag", "a");
    upload.add_header("X-Tag", "b");
    upload.body = Some(vec![0, 159, 146, 150, 255]);
    upload.set_capture(parse_capture_spec("etag", ":0,8").unwrap());
    upload.auth = Some(AuthConfig::Bearer {
        token: "${TOKEN}".to_string(),
    });
    project.add_template(upload.clone()).unwrap();
    project.add_template(RequestTemplate::new("draft")).unwrap();
    project.add_flow(Flow::new("sync", ["upload"])).unwrap();

    project.vars.set("base", "http://default");
    project.vars.set_in("base", "http://prod", "prod");
    project.vars.set_current_env("prod");
    project.settings.capture_policy = CapturePolicy::Abort;
    project.save().unwrap();

    let loaded = Project::load(&path).unwrap();
    assert_eq!(loaded.name, "round-trip");
    assert_eq!(loaded.template("UPLOAD"), Some(&upload));
    assert!(loaded.template("draft").is_some());
    assert_eq!(loaded.flow("sync").unwrap().template_names(), vec!["upload"]);
    assert_eq!(loaded.vars, project.vars);
    assert_eq!(loaded.vars.current_env(), "PROD");
    assert_eq!(loaded.vars.get("base"), "http://prod");
    assert_eq!(loaded.settings.capture_policy, CapturePolicy::Abort);
}

#[test]
fn test_body_is_stored_as_base64() {
    let (_dir, path, mut project) = temp_project("b64");
    let mut template = RequestTemplate::with_target("hello", "POST", "http://x");
    template.body = Some(b"hello".to_vec());
    project.add_template(template).unwrap();
    project.save().unwrap();

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["templates"][0]["body"], json!("aGVsbG8="));
}

#[test]
fn test_older_project_files_load_with_defaults() {
    let (_dir, path, _) = temp_project("old");
    fs::write(&path, r#"{"name": "old"}"#).unwrap();

    let loaded = Project::load(&path).unwrap();
    assert!(loaded.templates().is_empty());
    assert!(loaded.flows().is_empty());
    assert_eq!(loaded.settings.timeout_secs, 30);
    assert_eq!(loaded.vars.env_count(), 1);
}

#[test]
fn test_corrupted_project_file_is_reported() {
    let (_dir, path, _) = temp_project("broken");
    fs::write(&path, "{ not json").unwrap();

    assert!(matches!(Project::load(&path), Err(ProjectError::Json { .. })));
}

#[test]
fn test_history_is_trimmed_to_limit() {
    let (_dir, path, mut project) = temp_project("limit");
    set_setting(&mut project.settings, "history-limit", "3").unwrap();
    project
        .add_template(RequestTemplate::with_target("ping", "GET", "http://x/${N}"))
        .unwrap();

    let mut transport = ScriptedTransport::new();
    for _ in 0..5 {
        transport = transport.reply_json(json!({}));
    }
    for n in 0..5 {
        let overrides = HashMap::from([("n".to_string(), n.to_string())]);
        project.send("ping", &overrides, &transport).unwrap();
        project.save().unwrap();
    }

    let history = Project::load(&path).unwrap().history().unwrap();
    let urls: Vec<_> = history.iter().map(|e| e.request.url.as_str()).collect();
    assert_eq!(urls, ["http://x/2", "http://x/3", "http://x/4"]);
}

#[test]
fn test_custom_history_path_is_relative_to_project() {
    let (dir, path, mut project) = temp_project("paths");
    set_setting(&mut project.settings, "history-file", "logs/sends.jsonl").unwrap();
    project
        .add_template(RequestTemplate::with_target("ping", "GET", "http://x"))
        .unwrap();

    let transport = ScriptedTransport::new().reply_json(json!({}));
    project.send("ping", &HashMap::new(), &transport).unwrap();
    project.save().unwrap();

    let expected = dir.path().join(".restflow").join("logs").join("sends.jsonl");
    assert_eq!(project.history_path(), expected);
    assert!(expected.exists());

    project.clear_history().unwrap();
    assert!(!expected.exists());
    assert!(Project::load(&path).unwrap().history().unwrap().is_empty());
}

#[test]
fn test_flow_edit_persists() {
    let (_dir, path, mut project) = temp_project("edits");
    for name in ["a", "b", "c", "x"] {
        project
            .add_template(RequestTemplate::with_target(name, "GET", "http://x"))
            .unwrap();
    }
    project.add_flow(Flow::new("f", ["a", "b", "c"])).unwrap();

    let edits = StepEdits {
        removals: vec![2],
        insertions: vec![(Some(1), "x".to_string())],
        moves: vec![],
    };
    project.edit_flow("f", &edits).unwrap();
    project.save().unwrap();

    let loaded = Project::load(&path).unwrap();
    assert_eq!(loaded.flow("f").unwrap().template_names(), vec!["a", "x", "c"]);
}
