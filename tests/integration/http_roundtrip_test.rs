//! Sends through the real `reqwest` transport against a local mock server.

use super::temp_project;
use rest_flow::auth::AuthConfig;
use rest_flow::executor::{ExecutionConfig, ReqwestTransport, SendError};
use rest_flow::flow::{execute_flow, Flow};
use rest_flow::models::RequestTemplate;
use rest_flow::session::RecordingJar;
use rest_flow::variables::parse_capture_spec;
use rest_flow::{Project, ProjectError};
use std::collections::HashMap;
use std::sync::Arc;

fn transport_for(project: &Project) -> (ReqwestTransport, Option<Arc<RecordingJar>>) {
    let jar = project.cookie_jar();
    let config = ExecutionConfig::from_settings(&project.settings);
    let transport = ReqwestTransport::new(&config, jar.clone()).expect("Failed to build client");
    (transport, jar)
}

#[test]
fn test_flow_over_http_threads_token_and_cookie() {
    let mut server = mockito::Server::new();
    let login_mock = server
        .mock("POST", "/login")
        .match_body(r#"{"user":"alice"}"#)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_header("set-cookie", "sid=s1; Path=/")
        .with_body(r#"{"auth":{"token":"abc"}}"#)
        .create();
    let profile_mock = server
        .mock("GET", "/me")
        .match_header("authorization", "Bearer abc")
        .match_header("cookie", "sid=s1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"name":"alice"}"#)
        .create();

    let (_dir, path, mut project) = temp_project("http");
    project.vars.set("base", server.url());

    let mut login = RequestTemplate::with_target("login", "POST", "${BASE}/login");
    login.body = Some(br#"{"user":"alice"}"#.to_vec());
    login.set_capture(parse_capture_spec("token", ".auth.token").unwrap());
    project.add_template(login).unwrap();

    let mut profile = RequestTemplate::with_target("profile", "GET", "${BASE}/me");
    profile.auth = Some(AuthConfig::Bearer {
        token: "${TOKEN}".to_string(),
    });
    project.add_template(profile).unwrap();
    project
        .add_flow(Flow::new("smoke", ["login", "profile"]))
        .unwrap();

    let (transport, jar) = transport_for(&project);
    let outcome = execute_flow(&mut project, "smoke", &HashMap::new(), &transport).unwrap();

    login_mock.assert();
    profile_mock.assert();
    assert_eq!(outcome.steps[1].result.response.status_code, 200);
    assert_eq!(
        outcome.steps[1].result.response.body_text(),
        r#"{"name":"alice"}"#
    );

    let jar = jar.expect("cookie recording is on by default");
    assert_eq!(jar.live_count(), 1);
    project.store_cookies(&jar);
    project.save().unwrap();

    let reloaded = Project::load(&path).unwrap();
    assert_eq!(reloaded.vars.get("token"), "abc");
    assert_eq!(reloaded.session.cookies.len(), 1);
    assert_eq!(reloaded.session.cookies[0].set_cookie, "sid=s1; Path=/");
    assert_eq!(reloaded.history().unwrap().len(), 2);
}

#[test]
fn test_basic_auth_is_resolved_and_sent() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/private")
        .match_header("authorization", "Basic YWxpY2U6cHc=")
        .with_status(204)
        .create();

    let (_dir, _, mut project) = temp_project("auth");
    let mut template =
        RequestTemplate::with_target("private", "GET", format!("{}/private", server.url()));
    template.auth = Some(AuthConfig::Basic {
        username: "${USER}".to_string(),
        password: "pw".to_string(),
    });
    project.add_template(template).unwrap();
    project.vars.set("user", "alice");

    let (transport, _) = transport_for(&project);
    let result = project.send("private", &HashMap::new(), &transport).unwrap();

    mock.assert();
    assert_eq!(result.response.status_code, 204);
}

#[test]
fn test_error_status_is_a_response_not_a_failure() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("DELETE", "/items/7")
        .with_status(404)
        .with_body("gone")
        .create();

    let (_dir, _, mut project) = temp_project("status");
    project
        .add_template(RequestTemplate::with_target(
            "remove",
            "delete",
            format!("{}/items/${{ID}}", server.url()),
        ))
        .unwrap();

    let (transport, _) = transport_for(&project);
    let overrides = HashMap::from([("id".to_string(), "7".to_string())]);
    let result = project.send("remove", &overrides, &transport).unwrap();

    mock.assert();
    assert_eq!(result.response.status_code, 404);
    assert_eq!(result.response.body_text(), "gone");
    assert_eq!(result.request.method, "DELETE");
}

#[test]
fn test_invalid_url_fails_without_network() {
    let (_dir, _, mut project) = temp_project("bad-url");
    project
        .add_template(RequestTemplate::with_target("bad", "GET", "not a url"))
        .unwrap();

    let (transport, _) = transport_for(&project);
    let err = project.send("bad", &HashMap::new(), &transport).unwrap_err();

    assert!(matches!(err, ProjectError::Send(SendError::Transport(_))));
}
