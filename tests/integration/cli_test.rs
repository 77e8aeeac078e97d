//! Command handlers driven through parsed command lines.

use clap::Parser;
use rest_flow::cli::Cli;
use rest_flow::commands::{self, CommandError};
use rest_flow::flow::FlowError;
use rest_flow::ProjectError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn restflow(project: &Path, args: &[&str]) -> Result<String, CommandError> {
    let mut argv = vec!["restflow", "-P", project.to_str().unwrap()];
    argv.extend_from_slice(args);
    let cli = Cli::try_parse_from(argv).expect("arguments should parse");
    commands::run(cli)
}

fn initialised() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(".restflow").join("project.json");
    restflow(&path, &["init", "demo"]).unwrap();
    (dir, path)
}

#[test]
fn test_init_refuses_to_overwrite() {
    let (_dir, path) = initialised();

    let err = restflow(&path, &["init", "again"]).unwrap_err();
    assert!(matches!(
        err,
        CommandError::Project(ProjectError::AlreadyExists(_))
    ));
    assert!(restflow(&path, &["init", "again", "--force"]).is_ok());
}

#[test]
fn test_commands_need_a_project() {
    let dir = TempDir::new().unwrap();
    let err = restflow(&dir.path().join("missing.json"), &["req", "list"]).unwrap_err();
    assert!(matches!(err, CommandError::Project(ProjectError::NotFound(_))));
}

#[test]
fn test_request_lifecycle() {
    let (_dir, path) = initialised();

    restflow(
        &path,
        &[
            "req", "new", "login", "-X", "post", "-u", "${BASE}/login", "-H",
            "Content-Type: application/json", "-d", r#"{"u":"${USER}"}"#, "-c", "token:.token",
        ],
    )
    .unwrap();

    let listed = restflow(&path, &["req", "list"]).unwrap();
    assert_eq!(listed, "login\tPOST ${BASE}/login\n");

    let shown = restflow(&path, &["req", "show", "LOGIN"]).unwrap();
    assert!(shown.contains("Content-Type: application/json"));
    assert!(shown.contains("capture TOKEN:.token"));

    restflow(
        &path,
        &[
            "req", "edit", "login", "--name", "sign-in", "--remove-header", "content-type",
            "--remove-capture", "token", "--bearer", "${TOKEN}",
        ],
    )
    .unwrap();
    let shown = restflow(&path, &["req", "show", "sign-in"]).unwrap();
    assert!(!shown.contains("Content-Type"));
    assert!(!shown.contains("capture"));
    assert!(shown.contains("auth: bearer"));

    restflow(&path, &["req", "delete", "sign-in"]).unwrap();
    assert_eq!(restflow(&path, &["req", "list"]).unwrap(), "");
}

#[test]
fn test_flow_commands() {
    let (_dir, path) = initialised();
    for name in ["a", "b", "c", "x"] {
        restflow(&path, &["req", "new", name, "-X", "GET", "-u", "http://x"]).unwrap();
    }

    let err = restflow(&path, &["flow", "new", "bad", "a", "ghost"]).unwrap_err();
    assert!(matches!(
        err,
        CommandError::Project(ProjectError::Flow(FlowError::MissingTemplate { step: 2, .. }))
    ));

    restflow(&path, &["flow", "new", "f", "a", "b", "c"]).unwrap();
    restflow(
        &path,
        &["flow", "edit", "f", "--delete", "2", "--insert", "1:x"],
    )
    .unwrap();
    assert_eq!(
        restflow(&path, &["flow", "list"]).unwrap(),
        "f\ta -> x -> c\n"
    );

    restflow(&path, &["flow", "edit", "f", "--move", "0:2"]).unwrap();
    assert_eq!(
        restflow(&path, &["flow", "show", "f"]).unwrap(),
        "f\n  1. x\n  2. c\n  3. a\n"
    );

    let err = restflow(&path, &["req", "delete", "x"]).unwrap_err();
    assert!(matches!(
        err,
        CommandError::Project(ProjectError::TemplateInUse { .. })
    ));

    restflow(&path, &["flow", "delete", "f"]).unwrap();
    restflow(&path, &["req", "delete", "x"]).unwrap();
}

#[test]
fn test_vars_and_environments() {
    let (_dir, path) = initialised();

    restflow(&path, &["vars", "set", "host", "default.test"]).unwrap();
    restflow(&path, &["vars", "set", "host", "prod.test", "--env", "prod"]).unwrap();
    restflow(&path, &["vars", "set", "blank", ""]).unwrap();

    assert_eq!(restflow(&path, &["vars", "get", "HOST"]).unwrap(), "default.test\n");
    assert_eq!(restflow(&path, &["vars", "get", "blank"]).unwrap(), "\n");
    assert!(matches!(
        restflow(&path, &["vars", "get", "nope"]),
        Err(CommandError::UndefinedVariable(_))
    ));

    restflow(&path, &["env", "prod"]).unwrap();
    assert_eq!(restflow(&path, &["vars", "get", "host"]).unwrap(), "prod.test\n");
    assert_eq!(
        restflow(&path, &["vars", "get", "host", "--default"]).unwrap(),
        "default.test\n"
    );
    assert_eq!(
        restflow(&path, &["vars", "list"]).unwrap(),
        "BLANK=\nHOST=prod.test\n"
    );
    assert_eq!(
        restflow(&path, &["env", "--list"]).unwrap(),
        "  (default) (2 vars)\n* PROD (1 vars)\n"
    );

    restflow(&path, &["vars", "unset", "host", "--all"]).unwrap();
    assert!(restflow(&path, &["vars", "get", "host"]).is_err());

    restflow(&path, &["env", "--delete", "prod"]).unwrap();
    assert_eq!(
        restflow(&path, &["env"]).unwrap(),
        "Current environment: (default)\n"
    );
    assert!(matches!(
        restflow(&path, &["vars", "set", "bad name", "x"]),
        Err(CommandError::Var(_))
    ));
}

#[test]
fn test_config_commands() {
    let (_dir, path) = initialised();

    assert_eq!(restflow(&path, &["config", "get", "timeout"]).unwrap(), "30\n");
    restflow(&path, &["config", "set", "capture_policy", "ABORT"]).unwrap();
    assert_eq!(
        restflow(&path, &["config", "get", "capture-policy"]).unwrap(),
        "abort\n"
    );

    assert!(matches!(
        restflow(&path, &["config", "set", "timeout", "0"]),
        Err(CommandError::Config(_))
    ));
    assert!(matches!(
        restflow(&path, &["config", "get", "colour"]),
        Err(CommandError::Config(_))
    ));

    let listed = restflow(&path, &["config", "list"]).unwrap();
    assert_eq!(listed.lines().count(), 9);
    assert!(listed.contains("capture-policy = abort"));
}

#[test]
fn test_send_captures_history_and_cookies() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/login")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_header("set-cookie", "sid=s1")
        .with_body(r#"{"token":"abc"}"#)
        .create();

    let (_dir, path) = initialised();
    restflow(&path, &["vars", "set", "base", &server.url()]).unwrap();
    restflow(
        &path,
        &["req", "new", "login", "-X", "POST", "-u", "${BASE}/login", "-c", "token:.token"],
    )
    .unwrap();

    let output = restflow(&path, &["send", "login", "-i"]).unwrap();
    mock.assert();
    assert!(output.starts_with("200 OK\n"));
    assert!(output.contains("\"token\": \"abc\""));
    assert!(output.contains("captured TOKEN = abc"));

    assert_eq!(restflow(&path, &["vars", "get", "token"]).unwrap(), "abc\n");
    assert!(restflow(&path, &["history"]).unwrap().contains("login"));
    assert!(restflow(&path, &["cookies"])
        .unwrap()
        .ends_with("1 live cookie(s)\n"));

    // Clearing with recording off still empties the session file.
    restflow(&path, &["config", "set", "record-cookies", "false"]).unwrap();
    restflow(&path, &["cookies", "--clear"]).unwrap();
    let session = std::fs::read_to_string(path.with_file_name("session.json")).unwrap();
    assert!(!session.contains("sid=s1"));
    restflow(&path, &["config", "set", "record-cookies", "true"]).unwrap();
    restflow(&path, &["history", "--clear"]).unwrap();
    assert_eq!(restflow(&path, &["history"]).unwrap(), "");
    assert_eq!(
        restflow(&path, &["cookies"]).unwrap(),
        "0 live cookie(s)\n"
    );
}

#[test]
fn test_incomplete_request_is_not_sent() {
    let (_dir, path) = initialised();
    restflow(&path, &["req", "new", "draft"]).unwrap();

    let err = restflow(&path, &["send", "draft"]).unwrap_err();
    assert!(err.to_string().contains("incomplete"));
}
