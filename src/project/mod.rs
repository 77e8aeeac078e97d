//! On-disk projects.
//!
//! A project file holds the request templates, flows, variables and
//! settings. History and the cookie session live in separate files next to
//! it. A project is loaded fresh for every command and saved after every
//! command that changes it.

use crate::executor::{send_template, ExecutionConfig, SendError, SendResult, Transport};
use crate::flow::{apply_edits, Flow, FlowError, StepEdits};
use crate::history::{self, HistoryEntry, HistoryError};
use crate::models::RequestTemplate;
use crate::config::Settings;
use crate::session::{RecordingJar, Session};
use crate::variables::VariableStore;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default project file location, relative to the working directory.
pub const DEFAULT_PROJECT_FILE: &str = ".restflow/project.json";

/// Errors from loading, saving or changing a project.
#[derive(Debug)]
pub enum ProjectError {
    /// File system error, with the path involved
    Io { path: PathBuf, source: std::io::Error },
    /// Project or session file is not valid JSON for its schema
    Json { path: PathBuf, source: serde_json::Error },
    /// History could not be read or written
    History(HistoryError),
    /// `init` found an existing project file
    AlreadyExists(PathBuf),
    /// No project file at the given path
    NotFound(PathBuf),
    /// Settings in the project file fail validation
    InvalidSettings(String),
    /// Template or flow name is empty or has surrounding whitespace
    InvalidName(String),
    DuplicateTemplate(String),
    NoSuchTemplate(String),
    /// A template cannot be deleted while flows still use it
    TemplateInUse { template: String, flows: Vec<String> },
    DuplicateFlow(String),
    NoSuchFlow(String),
    Flow(FlowError),
    Send(SendError),
}

impl fmt::Display for ProjectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectError::Io { path, source } => write!(f, "{}: {}", path.display(), source),
            ProjectError::Json { path, source } => {
                write!(f, "{}: invalid JSON: {}", path.display(), source)
            }
            ProjectError::History(err) => write!(f, "{}", err),
            ProjectError::AlreadyExists(path) => write!(
                f,
                "A project already exists at {} (use --force to overwrite)",
                path.display()
            ),
            ProjectError::NotFound(path) => write!(
                f,
                "No project at {} (run `restflow init` first)",
                path.display()
            ),
            ProjectError::InvalidSettings(msg) => write!(f, "Invalid project settings: {}", msg),
            ProjectError::InvalidName(name) => write!(f, "Invalid name: '{}'", name),
            ProjectError::DuplicateTemplate(name) => {
                write!(f, "A request named '{}' already exists", name)
            }
            ProjectError::NoSuchTemplate(name) => write!(f, "No such request: {}", name),
            ProjectError::TemplateInUse { template, flows } => write!(
                f,
                "Request '{}' is used by flow(s): {}",
                template,
                flows.join(", ")
            ),
            ProjectError::DuplicateFlow(name) => {
                write!(f, "A flow named '{}' already exists", name)
            }
            ProjectError::NoSuchFlow(name) => write!(f, "No such flow: {}", name),
            ProjectError::Flow(err) => write!(f, "{}", err),
            ProjectError::Send(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for ProjectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProjectError::Io { source, .. } => Some(source),
            ProjectError::Json { source, .. } => Some(source),
            ProjectError::History(err) => Some(err),
            ProjectError::Flow(err) => Some(err),
            ProjectError::Send(err) => Some(err),
            _ => None,
        }
    }
}

impl From<HistoryError> for ProjectError {
    fn from(err: HistoryError) -> Self {
        ProjectError::History(err)
    }
}

impl From<FlowError> for ProjectError {
    fn from(err: FlowError) -> Self {
        ProjectError::Flow(err)
    }
}

impl From<SendError> for ProjectError {
    fn from(err: SendError) -> Self {
        ProjectError::Send(err)
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ProjectError + '_ {
    move |source| ProjectError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ProjectError> {
    let text = fs::read_to_string(path).map_err(io_error(path))?;
    serde_json::from_str(&text).map_err(|source| ProjectError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes through a temporary file so a crash never leaves half a file.
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ProjectError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }

    let json = serde_json::to_string_pretty(value).map_err(|source| ProjectError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, json + "\n").map_err(io_error(&temp_path))?;
    fs::rename(&temp_path, path).map_err(io_error(path))
}

fn check_name(name: &str) -> Result<(), ProjectError> {
    if name.is_empty() || name.trim() != name {
        return Err(ProjectError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// A REST Flow project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub name: String,

    #[serde(default)]
    templates: Vec<RequestTemplate>,

    #[serde(default)]
    flows: Vec<Flow>,

    #[serde(default)]
    pub vars: VariableStore,

    #[serde(default)]
    pub settings: Settings,

    /// Cookie log, loaded from and saved to the session file
    #[serde(skip)]
    pub session: Session,

    /// Entries recorded since load, appended to the history file on save
    #[serde(skip)]
    pending_history: Vec<HistoryEntry>,

    /// Project file this project was loaded from or last saved to
    #[serde(skip)]
    location: PathBuf,
}

impl Project {
    /// Creates an empty in-memory project.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            templates: Vec::new(),
            flows: Vec::new(),
            vars: VariableStore::new(),
            settings: Settings::default(),
            session: Session::default(),
            pending_history: Vec::new(),
            location: PathBuf::from(DEFAULT_PROJECT_FILE),
        }
    }

    /// Creates a new project file.
    ///
    /// Fails if the file already exists, unless `force` is set.
    pub fn init(path: &Path, name: &str, force: bool) -> Result<Self, ProjectError> {
        if path.exists() && !force {
            return Err(ProjectError::AlreadyExists(path.to_path_buf()));
        }

        let mut project = Project::new(name);
        project.location = path.to_path_buf();
        project.save()?;
        log::info!("Initialised project '{}' at {}", name, path.display());
        Ok(project)
    }

    /// Loads a project and its cookie session.
    pub fn load(path: &Path) -> Result<Self, ProjectError> {
        if !path.exists() {
            return Err(ProjectError::NotFound(path.to_path_buf()));
        }

        let mut project: Project = read_json(path)?;
        project
            .settings
            .validate()
            .map_err(ProjectError::InvalidSettings)?;
        project.location = path.to_path_buf();

        let session_path = project.session_path();
        if project.settings.record_cookies && session_path.exists() {
            project.session = read_json(&session_path)?;
        }

        log::debug!(
            "Loaded project '{}' ({} requests, {} flows)",
            project.name,
            project.templates.len(),
            project.flows.len()
        );
        Ok(project)
    }

    /// Saves the project file, flushes recorded history and writes the
    /// cookie session.
    pub fn save(&mut self) -> Result<(), ProjectError> {
        write_json(&self.location, self)?;

        if !self.pending_history.is_empty() {
            let history_path = self.history_path();
            history::append_entries(&history_path, &self.pending_history)?;
            history::maintain_history_limit(&history_path, self.settings.history_limit)?;
            self.pending_history.clear();
        }

        if self.settings.record_cookies {
            write_json(&self.session_path(), &self.session)?;
        }

        Ok(())
    }

    /// Saves to a different project file and makes it the project's location.
    pub fn save_as(&mut self, path: &Path) -> Result<(), ProjectError> {
        self.location = path.to_path_buf();
        self.save()
    }

    /// Path of the project file.
    pub fn location(&self) -> &Path {
        &self.location
    }

    fn resolve_path(&self, file: &str) -> PathBuf {
        let file = Path::new(file);
        match self.location.parent() {
            Some(dir) if file.is_relative() => dir.join(file),
            _ => file.to_path_buf(),
        }
    }

    /// History file, resolved against the project file's directory.
    pub fn history_path(&self) -> PathBuf {
        self.resolve_path(&self.settings.history_file)
    }

    /// Session file, resolved against the project file's directory.
    pub fn session_path(&self) -> PathBuf {
        self.resolve_path(&self.settings.session_file)
    }

    // Templates

    /// Looks up a template by name, ignoring case.
    pub fn template(&self, name: &str) -> Option<&RequestTemplate> {
        self.templates
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Mutable lookup by name, ignoring case.
    pub fn template_mut(&mut self, name: &str) -> Option<&mut RequestTemplate> {
        self.templates
            .iter_mut()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// All templates, in creation order.
    pub fn templates(&self) -> &[RequestTemplate] {
        &self.templates
    }

    pub fn add_template(&mut self, template: RequestTemplate) -> Result<(), ProjectError> {
        check_name(&template.name)?;
        if self.template(&template.name).is_some() {
            return Err(ProjectError::DuplicateTemplate(template.name));
        }
        self.templates.push(template);
        Ok(())
    }

    /// Names of the flows that use a template.
    pub fn flows_using(&self, template: &str) -> Vec<String> {
        self.flows
            .iter()
            .filter(|flow| flow.references(template))
            .map(|flow| flow.name.clone())
            .collect()
    }

    /// Deletes a template. Refused while any flow refers to it.
    pub fn remove_template(&mut self, name: &str) -> Result<RequestTemplate, ProjectError> {
        let index = self
            .templates
            .iter()
            .position(|t| t.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| ProjectError::NoSuchTemplate(name.to_string()))?;

        let flows = self.flows_using(name);
        if !flows.is_empty() {
            return Err(ProjectError::TemplateInUse {
                template: self.templates[index].name.clone(),
                flows,
            });
        }

        Ok(self.templates.remove(index))
    }

    /// Renames a template and updates every flow step that refers to it.
    pub fn rename_template(&mut self, old: &str, new: &str) -> Result<(), ProjectError> {
        check_name(new)?;
        if !old.eq_ignore_ascii_case(new) && self.template(new).is_some() {
            return Err(ProjectError::DuplicateTemplate(new.to_string()));
        }

        let template = self
            .template_mut(old)
            .ok_or_else(|| ProjectError::NoSuchTemplate(old.to_string()))?;
        template.name = new.to_string();

        for flow in &mut self.flows {
            flow.rename_template(old, new);
        }
        Ok(())
    }

    // Flows

    /// Looks up a flow by name, ignoring case.
    pub fn flow(&self, name: &str) -> Option<&Flow> {
        self.flows.iter().find(|f| f.name.eq_ignore_ascii_case(name))
    }

    /// All flows, in creation order.
    pub fn flows(&self) -> &[Flow] {
        &self.flows
    }

    /// Adds a flow. Every step must name an existing template.
    pub fn add_flow(&mut self, flow: Flow) -> Result<(), ProjectError> {
        check_name(&flow.name)?;
        if self.flow(&flow.name).is_some() {
            return Err(ProjectError::DuplicateFlow(flow.name));
        }
        if flow.steps.is_empty() {
            return Err(FlowError::EmptyFlow.into());
        }
        if let Some((index, step)) = flow
            .steps
            .iter()
            .enumerate()
            .find(|(_, step)| self.template(&step.template).is_none())
        {
            return Err(FlowError::MissingTemplate {
                step: index + 1,
                template: step.template.clone(),
            }
            .into());
        }

        self.flows.push(flow);
        Ok(())
    }

    pub fn remove_flow(&mut self, name: &str) -> Result<Flow, ProjectError> {
        let index = self
            .flows
            .iter()
            .position(|f| f.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| ProjectError::NoSuchFlow(name.to_string()))?;
        Ok(self.flows.remove(index))
    }

    /// Applies a batch of step edits. On error the flow is unchanged.
    pub fn edit_flow(&mut self, name: &str, edits: &StepEdits) -> Result<(), ProjectError> {
        let index = self
            .flows
            .iter()
            .position(|f| f.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| ProjectError::NoSuchFlow(name.to_string()))?;

        let steps = apply_edits(&self.flows[index].steps, edits, |template| {
            self.template(template).is_some()
        })?;
        self.flows[index].steps = steps;
        Ok(())
    }

    // Sending

    /// Sends one template against the project's variables and records it in
    /// history. The capture policy is left to the caller.
    pub fn send(
        &mut self,
        name: &str,
        overrides: &HashMap<String, String>,
        transport: &dyn Transport,
    ) -> Result<SendResult, ProjectError> {
        let template = self
            .template(name)
            .cloned()
            .ok_or_else(|| ProjectError::NoSuchTemplate(name.to_string()))?;
        let config = ExecutionConfig::from_settings(&self.settings);

        let result = send_template(&template, &mut self.vars, overrides, &config, transport)?;
        self.record_history(&template.name, None, &result);
        Ok(result)
    }

    /// Queues a history entry for the next save, if history is enabled.
    pub fn record_history(&mut self, template: &str, flow: Option<&str>, result: &SendResult) {
        if !self.settings.record_history {
            return;
        }

        let mut entry =
            HistoryEntry::new(template, result.request.clone(), result.response.clone());
        if let Some(flow) = flow {
            entry = entry.in_flow(flow);
        }
        self.pending_history.push(entry);
    }

    /// Saved history followed by entries not yet saved.
    pub fn history(&self) -> Result<Vec<HistoryEntry>, ProjectError> {
        let mut entries = history::load_history(&self.history_path())?;
        entries.extend(
            self.pending_history
                .iter()
                .cloned()
                .map(HistoryEntry::prepare_for_storage),
        );
        Ok(entries)
    }

    /// Deletes the history file and drops unsaved entries.
    pub fn clear_history(&mut self) -> Result<(), ProjectError> {
        self.pending_history.clear();
        history::clear_history(&self.history_path())?;
        Ok(())
    }

    /// A cookie jar seeded from the session, or `None` when cookie
    /// recording is off.
    pub fn cookie_jar(&self) -> Option<Arc<RecordingJar>> {
        self.settings.record_cookies.then(|| {
            Arc::new(RecordingJar::new(
                &self.session,
                self.settings.cookie_lifetime(),
            ))
        })
    }

    /// Copies the jar's log back into the session for saving.
    pub fn store_cookies(&mut self, jar: &RecordingJar) {
        self.session = jar.session();
    }

    /// Forgets every recorded cookie and empties the session file on disk,
    /// whether or not cookie recording is switched on.
    pub fn clear_cookies(&mut self) -> Result<(), ProjectError> {
        self.session = Session::default();
        write_json(&self.session_path(), &self.session)
    }
}
