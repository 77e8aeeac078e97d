//! Flows: named, ordered lists of request templates.
//!
//! A flow is run step by step, with captures from one step visible to the
//! placeholders of the next. Steps refer to templates by name and the
//! references are checked when the flow runs, so a flow can outlive a
//! renamed or missing template and still be listed and edited.

pub mod executor;
pub mod mutator;

pub use executor::{execute_flow, FlowOutcome, FlowState, StepResult};
pub use mutator::{apply_edits, StepEdits};

use crate::executor::SendError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One step of a flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlowStep {
    /// Name of the template to send.
    pub template: String,
}

impl FlowStep {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Whether this step refers to `template`, ignoring case.
    pub fn refers_to(&self, template: &str) -> bool {
        self.template.eq_ignore_ascii_case(template)
    }
}

/// A named sequence of steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flow {
    pub name: String,
    #[serde(default)]
    pub steps: Vec<FlowStep>,
}

impl Flow {
    /// Creates a flow from template names, in order.
    pub fn new<I, S>(name: impl Into<String>, templates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            steps: templates.into_iter().map(FlowStep::new).collect(),
        }
    }

    /// Whether any step refers to `template`.
    pub fn references(&self, template: &str) -> bool {
        self.steps.iter().any(|step| step.refers_to(template))
    }

    /// Points every step that refers to `old` at `new`. Returns how many
    /// steps changed.
    pub fn rename_template(&mut self, old: &str, new: &str) -> usize {
        let mut renamed = 0;
        for step in self.steps.iter_mut().filter(|step| step.refers_to(old)) {
            step.template = new.to_string();
            renamed += 1;
        }
        renamed
    }

    /// Template names in step order.
    pub fn template_names(&self) -> Vec<&str> {
        self.steps.iter().map(|step| step.template.as_str()).collect()
    }
}

/// Errors from editing or running a flow.
#[derive(Debug)]
pub enum FlowError {
    /// No flow with this name
    NoSuchFlow(String),
    /// A step names a template that does not exist (step is 1-based)
    MissingTemplate { step: usize, template: String },
    /// A step's template has no method or URL
    IncompleteTemplate { step: usize, template: String },
    /// A step was resolved but sending it failed
    StepFailed {
        step: usize,
        template: String,
        source: SendError,
    },
    /// A deletion named a step number outside the flow
    InvalidStepIndex(usize),
    /// A move named a source position outside the flow
    InvalidMoveSource(usize),
    /// An insertion named a template that does not exist
    UnknownTemplate(String),
    /// The edit would leave the flow with no steps
    EmptyFlow,
}

impl fmt::Display for FlowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowError::NoSuchFlow(name) => write!(f, "No such flow: {}", name),
            FlowError::MissingTemplate { step, template } => write!(
                f,
                "Step {} refers to non-existent template '{}'",
                step, template
            ),
            FlowError::IncompleteTemplate { step, template } => write!(
                f,
                "Step {}: incomplete template '{}' (method and URL are required)",
                step, template
            ),
            FlowError::StepFailed {
                step,
                template,
                source,
            } => write!(f, "Step {} ({}) failed: {}", step, template, source),
            FlowError::InvalidStepIndex(n) => write!(f, "No step number {} in this flow", n),
            FlowError::InvalidMoveSource(n) => {
                write!(f, "Cannot move step at position {}: out of range", n)
            }
            FlowError::UnknownTemplate(name) => write!(f, "Unknown request template: {}", name),
            FlowError::EmptyFlow => write!(f, "A flow must keep at least one step"),
        }
    }
}

impl std::error::Error for FlowError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FlowError::StepFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}
