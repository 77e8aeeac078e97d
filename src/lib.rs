//! REST Flow: a scriptable REST client.
//!
//! Request templates are stored by name in a project file, sent with
//! `${NAME}` placeholders filled in from an environment-aware variable store,
//! and chained into ordered flows. Values scraped from one response are
//! written back to the store so later requests can use them.
//!
//! # Architecture
//!
//! - **variables**: variable store, `${NAME}` substitution, capture specs and
//!   response scraping
//! - **flow**: flows, batched step edits and flow execution
//! - **executor**: single-template send path and the HTTP transport
//! - **models**: request templates, resolved requests and responses
//! - **project**: the on-disk project (templates, flows, variables, settings)
//! - **history** / **session**: request history and the recording cookie jar
//! - **config**: project settings and their attribute table
//! - **auth**: typed authentication configuration
//! - **formatter**: response rendering for the terminal
//! - **cli** / **commands**: argument parsing and command handlers
//!
//! # Example
//!
//! ```
//! use rest_flow::variables::{substitute_variables, VariableContext, VariableStore};
//!
//! let mut store = VariableStore::new();
//! store.set("host", "api.example.com");
//!
//! let context = VariableContext::new(&store);
//! let url = substitute_variables("https://${HOST}/users", &context).unwrap();
//! assert_eq!(url, "https://api.example.com/users");
//! ```

pub mod auth;
pub mod cli;
pub mod commands;
pub mod config;
pub mod executor;
pub mod flow;
pub mod formatter;
pub mod history;
pub mod models;
pub mod project;
pub mod session;
pub mod variables;

pub use executor::{send_template, SendError, SendResult, Transport};
pub use flow::{execute_flow, Flow, FlowError, FlowOutcome, StepEdits};
pub use models::{HttpRequest, HttpResponse, RequestTemplate};
pub use project::{Project, ProjectError};
pub use variables::{parse_capture_spec, substitute_variables, VarScraper, VariableStore};
