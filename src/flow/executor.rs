//! Flow execution.
//!
//! Each step moves through `Resolving -> Sending -> Capturing`; the flow as a
//! whole starts `Loaded` and ends `Done` or `Failed(step)`. The first failing
//! step stops the run. Variables captured and history recorded by earlier
//! steps stay in the project.

use super::FlowError;
use crate::executor::{
    capture_response, prepare_request, ExecutionConfig, SendError, SendResult, Transport,
};
use crate::project::Project;
use crate::variables::VariableContext;
use std::collections::HashMap;
use std::fmt;

/// Where a flow run currently is. Step numbers are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Loaded,
    Resolving(usize),
    Sending(usize),
    Capturing(usize),
    Done,
    Failed(usize),
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowState::Loaded => write!(f, "loaded"),
            FlowState::Resolving(step) => write!(f, "resolving step {}", step),
            FlowState::Sending(step) => write!(f, "sending step {}", step),
            FlowState::Capturing(step) => write!(f, "capturing step {}", step),
            FlowState::Done => write!(f, "done"),
            FlowState::Failed(step) => write!(f, "failed at step {}", step),
        }
    }
}

/// Result of one executed step.
#[derive(Debug, Clone)]
pub struct StepResult {
    /// 1-based step number
    pub step: usize,
    /// Template name as stored in the project
    pub template: String,
    pub result: SendResult,
}

/// Result of a completed flow run.
#[derive(Debug, Clone)]
pub struct FlowOutcome {
    pub flow: String,
    pub steps: Vec<StepResult>,
}

struct Run<'a> {
    flow: &'a str,
    state: FlowState,
}

impl<'a> Run<'a> {
    fn new(flow: &'a str) -> Self {
        log::debug!("flow {}: {}", flow, FlowState::Loaded);
        Self {
            flow,
            state: FlowState::Loaded,
        }
    }

    fn advance(&mut self, next: FlowState) {
        log::debug!("flow {}: {} -> {}", self.flow, self.state, next);
        self.state = next;
    }

    fn fail(&mut self, step: usize, err: FlowError) -> FlowError {
        self.advance(FlowState::Failed(step));
        log::warn!("flow {}: {}", self.flow, err);
        err
    }
}

/// Runs every step of a flow in order.
///
/// Placeholders resolve against the project's variables plus `overrides`;
/// captures are written back after each step so later steps see them.
/// Under the abort capture policy a capture failure stops the flow after
/// that step's history has been recorded.
pub fn execute_flow(
    project: &mut Project,
    name: &str,
    overrides: &HashMap<String, String>,
    transport: &dyn Transport,
) -> Result<FlowOutcome, FlowError> {
    let flow = project
        .flow(name)
        .cloned()
        .ok_or_else(|| FlowError::NoSuchFlow(name.to_string()))?;
    let config = ExecutionConfig::from_settings(&project.settings);

    let mut run = Run::new(&flow.name);
    let mut outcome = FlowOutcome {
        flow: flow.name.clone(),
        steps: Vec::with_capacity(flow.steps.len()),
    };

    for (index, step) in flow.steps.iter().enumerate() {
        let number = index + 1;
        run.advance(FlowState::Resolving(number));

        let Some(template) = project.template(&step.template).cloned() else {
            return Err(run.fail(
                number,
                FlowError::MissingTemplate {
                    step: number,
                    template: step.template.clone(),
                },
            ));
        };

        if !template.is_sendable() {
            return Err(run.fail(
                number,
                FlowError::IncompleteTemplate {
                    step: number,
                    template: template.name.clone(),
                },
            ));
        }

        let step_failed = |source: SendError| FlowError::StepFailed {
            step: number,
            template: template.name.clone(),
            source,
        };

        let prepared = {
            let context = VariableContext::new(&project.vars)
                .with_overrides(overrides)
                .with_prefix(config.var_prefix.as_str());
            prepare_request(&template, &context)
        };
        let request = match prepared {
            Ok(request) => request,
            Err(err) => return Err(run.fail(number, step_failed(err))),
        };

        run.advance(FlowState::Sending(number));
        log::info!("[{}] step {}: {} {}", flow.name, number, request.method, request.url);
        let response = match transport.send(&request) {
            Ok(response) => response,
            Err(err) => return Err(run.fail(number, step_failed(err.into()))),
        };

        run.advance(FlowState::Capturing(number));
        let captures = capture_response(&template, &response, &mut project.vars);
        let result = SendResult {
            request,
            response,
            captures,
        };
        project.record_history(&template.name, Some(&flow.name), &result);

        let enforced = result.enforce(config.capture_policy);
        outcome.steps.push(StepResult {
            step: number,
            template: template.name.clone(),
            result,
        });
        if let Err(err) = enforced {
            return Err(run.fail(number, step_failed(err)));
        }
    }

    run.advance(FlowState::Done);
    Ok(outcome)
}
