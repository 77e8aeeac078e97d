//! Data models for request templates, resolved requests and responses.

pub mod encoding;
pub mod request;
pub mod response;
pub mod template;

pub use request::{header_value, Headers, HttpRequest};
pub use response::HttpResponse;
pub use template::RequestTemplate;
