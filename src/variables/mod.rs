//! Variables module for REST Flow
//!
//! This module provides the variable store, `${NAME}` substitution, and the
//! capture engine that scrapes response bodies back into variables.

pub mod capture;
pub mod extract;
pub mod store;
pub mod substitution;

pub use capture::{parse_capture_spec, CaptureError, PathStep, ScrapeTarget, VarScraper};
pub use extract::{apply_captures, CaptureFailure, CaptureReport};
pub use store::{normalize_name, VariableStore, DEFAULT_ENV};
pub use substitution::{
    is_valid_var_name, substitute_variables, VarError, VariableContext, DEFAULT_PREFIX,
};
