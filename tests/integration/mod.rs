//! Shared fixtures for the integration tests.

pub mod cli_test;
pub mod flow_execution_test;
pub mod http_roundtrip_test;
pub mod project_persistence_test;
pub mod properties_test;

use rest_flow::executor::{RequestError, Transport};
use rest_flow::models::{HttpRequest, HttpResponse};
use rest_flow::Project;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::PathBuf;
use tempfile::TempDir;

/// Answers requests from a queue of canned responses and keeps every
/// request it was given.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: RefCell<VecDeque<HttpResponse>>,
    pub sent: RefCell<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a 200 response with a JSON body.
    pub fn reply_json(self, body: serde_json::Value) -> Self {
        let mut response = HttpResponse::new(200, "OK");
        response.add_header("Content-Type", "application/json");
        response.set_body(body.to_string());
        self.responses.borrow_mut().push_back(response);
        self
    }

    /// Queues an arbitrary response.
    pub fn reply(self, response: HttpResponse) -> Self {
        self.responses.borrow_mut().push_back(response);
        self
    }

    pub fn sent_count(&self) -> usize {
        self.sent.borrow().len()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, RequestError> {
        self.sent.borrow_mut().push(request.clone());
        self.responses
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| RequestError::NetworkError("no scripted response left".to_string()))
    }
}

/// A project file inside a fresh temporary directory.
pub fn temp_project(name: &str) -> (TempDir, PathBuf, Project) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join(".restflow").join("project.json");
    let project = Project::init(&path, name, false).expect("Failed to init project");
    (dir, path, project)
}
