//! Command handlers.
//!
//! Every command loads the project fresh, does its work, saves the project
//! if anything changed and returns the text to print.

use crate::auth::basic::parse_basic_auth_header;
use crate::auth::AuthConfig;
use crate::cli::{
    Cli, Command, ConfigCommand, EnvScope, FlowCommand, ListScope, Overrides, ReqCommand,
    RequestOpts, VarsCommand,
};
use crate::config::{get_setting, set_setting, setting_entries, ConfigError};
use crate::executor::{ExecutionConfig, RequestError, ReqwestTransport, SendError, SendResult};
use crate::flow::{execute_flow, Flow, FlowError, StepEdits};
use crate::formatter::{format_response, FormatOptions};
use crate::models::RequestTemplate;
use crate::project::{Project, ProjectError};
use crate::session::RecordingJar;
use crate::variables::{
    is_valid_var_name, parse_capture_spec, CaptureError, VarError, DEFAULT_ENV,
};
use std::collections::HashMap;
use std::fmt::{self, Write};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Errors reported by command handlers.
#[derive(Debug)]
pub enum CommandError {
    Project(ProjectError),
    Config(ConfigError),
    Capture(CaptureError),
    Var(VarError),
    Flow(FlowError),
    Send(SendError),
    Transport(RequestError),
    /// Header argument is not `Name: value`
    InvalidHeader(String),
    /// Basic credentials are not `USER:PASSWORD`
    InvalidCredentials(String),
    /// A body file could not be read
    BodyFile { path: PathBuf, source: std::io::Error },
    UndefinedVariable(String),
    NoSuchEnvironment(String),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Project(err) => write!(f, "{}", err),
            CommandError::Config(err) => write!(f, "{}", err),
            CommandError::Capture(err) => write!(f, "{}", err),
            CommandError::Var(err) => write!(f, "{}", err),
            CommandError::Flow(err) => write!(f, "{}", err),
            CommandError::Send(err) => write!(f, "{}", err),
            CommandError::Transport(err) => write!(f, "{}", err),
            CommandError::InvalidHeader(header) => {
                write!(f, "Invalid header '{}': expected 'Name: value'", header)
            }
            CommandError::InvalidCredentials(value) => {
                write!(f, "Invalid credentials '{}': expected USER:PASSWORD", value)
            }
            CommandError::BodyFile { path, source } => {
                write!(f, "Cannot read body file {}: {}", path.display(), source)
            }
            CommandError::UndefinedVariable(name) => write!(f, "Variable not set: {}", name),
            CommandError::NoSuchEnvironment(name) => write!(f, "No such environment: {}", name),
        }
    }
}

impl std::error::Error for CommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CommandError::Project(err) => Some(err),
            CommandError::Config(err) => Some(err),
            CommandError::Capture(err) => Some(err),
            CommandError::Var(err) => Some(err),
            CommandError::Flow(err) => Some(err),
            CommandError::Send(err) => Some(err),
            CommandError::Transport(err) => Some(err),
            CommandError::BodyFile { source, .. } => Some(source),
            _ => None,
        }
    }
}

macro_rules! impl_from {
    ($($source:ty => $variant:ident),* $(,)?) => {
        $(impl From<$source> for CommandError {
            fn from(err: $source) -> Self {
                CommandError::$variant(err)
            }
        })*
    };
}

impl_from! {
    ProjectError => Project,
    ConfigError => Config,
    CaptureError => Capture,
    VarError => Var,
    FlowError => Flow,
    SendError => Send,
    RequestError => Transport,
}

/// Per-invocation state taken from the global flags.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub project_path: PathBuf,
    pub verbosity: u8,
}

impl Invocation {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            project_path: cli.project.clone(),
            verbosity: cli.verbose,
        }
    }

    fn load(&self) -> Result<Project, CommandError> {
        Ok(Project::load(&self.project_path)?)
    }
}

/// Runs a parsed command line and returns its output.
pub fn run(cli: Cli) -> Result<String, CommandError> {
    let invocation = Invocation::from_cli(&cli);
    log::debug!("Using project file {}", invocation.project_path.display());

    match cli.command {
        Command::Init { name, force } => init(&invocation, name, force),
        Command::Req(command) => request_command(&invocation, command),
        Command::Send {
            name,
            overrides,
            include_headers,
        } => send(&invocation, &name, overrides, include_headers),
        Command::Flow(command) => flow_command(&invocation, command),
        Command::Vars(command) => vars_command(&invocation, command),
        Command::Env {
            name,
            default,
            delete,
            list,
        } => env_command(&invocation, name, default, delete, list),
        Command::Config(command) => config_command(&invocation, command),
        Command::History { clear } => history_command(&invocation, clear),
        Command::Cookies { clear } => cookies_command(&invocation, clear),
    }
}

fn init(invocation: &Invocation, name: Option<String>, force: bool) -> Result<String, CommandError> {
    let name = name.unwrap_or_else(|| default_project_name(&invocation.project_path));
    let project = Project::init(&invocation.project_path, &name, force)?;
    Ok(format!(
        "Created project '{}' at {}\n",
        project.name,
        project.location().display()
    ))
}

/// Name of the directory holding the project directory, e.g. `app` for
/// `app/.restflow/project.json`.
fn default_project_name(path: &Path) -> String {
    let absolute = std::env::current_dir()
        .map(|dir| dir.join(path))
        .unwrap_or_else(|_| path.to_path_buf());

    absolute
        .ancestors()
        .filter_map(|dir| dir.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .find(|name| !name.starts_with('.') && !name.ends_with(".json"))
        .unwrap_or_else(|| "restflow".to_string())
}

// Request templates

fn request_command(invocation: &Invocation, command: ReqCommand) -> Result<String, CommandError> {
    let mut project = invocation.load()?;

    let output = match command {
        ReqCommand::List => {
            let mut output = String::new();
            for template in project.templates() {
                let _ = writeln!(
                    output,
                    "{}\t{} {}",
                    template.name,
                    or_dash(&template.method),
                    or_dash(&template.url)
                );
            }
            return Ok(output);
        }
        ReqCommand::Show { name } => {
            let template = project
                .template(&name)
                .ok_or(ProjectError::NoSuchTemplate(name))?;
            return Ok(describe_template(template));
        }
        ReqCommand::New { name, opts } => {
            let mut template = RequestTemplate::new(name);
            apply_request_opts(&mut template, opts)?;
            let output = format!("Created request '{}'\n", template.name);
            project.add_template(template)?;
            output
        }
        ReqCommand::Edit {
            name,
            opts,
            rename,
            remove_header,
            remove_capture,
            remove_body,
            remove_auth,
        } => {
            let template = project
                .template_mut(&name)
                .ok_or_else(|| ProjectError::NoSuchTemplate(name.clone()))?;

            for header in &remove_header {
                template.remove_header(header);
            }
            for capture in &remove_capture {
                template.remove_capture(capture);
            }
            if remove_body {
                template.body = None;
            }
            if remove_auth {
                template.auth = None;
            }
            apply_request_opts(template, opts)?;

            let mut current = template.name.clone();
            if let Some(new_name) = rename {
                project.rename_template(&current, &new_name)?;
                current = new_name;
            }
            format!("Updated request '{}'\n", current)
        }
        ReqCommand::Delete { name } => {
            let removed = project.remove_template(&name)?;
            format!("Deleted request '{}'\n", removed.name)
        }
    };

    project.save()?;
    Ok(output)
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}

fn apply_request_opts(template: &mut RequestTemplate, opts: RequestOpts) -> Result<(), CommandError> {
    if let Some(method) = opts.method {
        template.method = method.trim().to_uppercase();
    }
    if let Some(url) = opts.url {
        template.url = url.trim().to_string();
    }

    for header in &opts.headers {
        let (name, value) = header
            .split_once(':')
            .filter(|(name, _)| !name.trim().is_empty())
            .ok_or_else(|| CommandError::InvalidHeader(header.clone()))?;
        template.add_header(name.trim(), value.trim());
    }

    if let Some(body) = opts.body {
        template.body = Some(body.into_bytes());
    }
    if let Some(path) = opts.body_file {
        let body = fs::read(&path).map_err(|source| CommandError::BodyFile { path, source })?;
        template.body = Some(body);
    }

    for capture in &opts.captures {
        let (variable, spec) = capture.split_once(':').ok_or_else(|| {
            CaptureError::InvalidSpec {
                spec: capture.clone(),
                reason: "expected VAR:SPEC".to_string(),
            }
        })?;
        template.set_capture(parse_capture_spec(variable, spec)?);
    }

    if let Some(credentials) = opts.basic {
        let (username, password) = credentials
            .split_once(':')
            .ok_or_else(|| CommandError::InvalidCredentials(credentials.clone()))?;
        template.auth = Some(AuthConfig::Basic {
            username: username.to_string(),
            password: password.to_string(),
        });
    }
    if let Some(token) = opts.bearer {
        template.auth = Some(AuthConfig::Bearer { token });
    }

    Ok(())
}

fn describe_template(template: &RequestTemplate) -> String {
    let mut output = format!("{}\n", template.name);
    let _ = writeln!(
        output,
        "  {} {}",
        or_dash(&template.method),
        or_dash(&template.url)
    );

    for (name, values) in &template.headers {
        for value in values {
            let _ = writeln!(output, "  {}: {}", name, mask_header(name, value));
        }
    }
    if let Some(auth) = &template.auth {
        let _ = writeln!(output, "  auth: {}", auth);
    }
    if let Some(body) = &template.body {
        let _ = writeln!(output, "  body: {}", String::from_utf8_lossy(body));
    }
    for capture in &template.captures {
        let _ = writeln!(output, "  capture {}:{}", capture.name, capture.spec());
    }
    if !template.is_sendable() {
        output.push_str("  (incomplete: method and URL are required)\n");
    }
    output
}

/// Hides the password of a literal Basic `Authorization` header.
fn mask_header(name: &str, value: &str) -> String {
    if name.eq_ignore_ascii_case("authorization") {
        if let Some((username, _)) = parse_basic_auth_header(value) {
            return format!("Basic {}:***", username);
        }
    }
    value.to_string()
}

// Sending

fn override_map(overrides: Overrides) -> HashMap<String, String> {
    overrides.vars.into_iter().collect()
}

/// Builds the HTTP transport, sharing a cookie jar with the project when
/// cookie recording is on.
fn transport_for(
    project: &Project,
) -> Result<(ReqwestTransport, Option<Arc<RecordingJar>>), CommandError> {
    let jar = project.cookie_jar();
    let config = ExecutionConfig::from_settings(&project.settings);
    let transport = ReqwestTransport::new(&config, jar.clone())?;
    Ok((transport, jar))
}

fn describe_result(output: &mut String, result: &SendResult, options: FormatOptions) {
    output.push_str(&format_response(&result.response, options));
    for (variable, value) in &result.captures.captured {
        let _ = writeln!(output, "captured {} = {}", variable, value);
    }
    for failure in &result.captures.failures {
        let _ = writeln!(output, "warning: {}", failure);
    }
}

fn send(
    invocation: &Invocation,
    name: &str,
    overrides: Overrides,
    include_headers: bool,
) -> Result<String, CommandError> {
    let mut project = invocation.load()?;
    let (transport, jar) = transport_for(&project)?;

    let sent = project.send(name, &override_map(overrides), &transport);
    if let Some(jar) = &jar {
        project.store_cookies(jar);
    }
    project.save()?;
    let result = sent?;

    let mut output = String::new();
    describe_result(
        &mut output,
        &result,
        FormatOptions {
            show_headers: include_headers,
        },
    );
    result.enforce(project.settings.capture_policy)?;
    Ok(output)
}

// Flows

fn flow_command(invocation: &Invocation, command: FlowCommand) -> Result<String, CommandError> {
    let mut project = invocation.load()?;

    let output = match command {
        FlowCommand::List => {
            let mut output = String::new();
            for flow in project.flows() {
                let _ = writeln!(output, "{}\t{}", flow.name, flow.template_names().join(" -> "));
            }
            return Ok(output);
        }
        FlowCommand::Show { name } => {
            let flow = project.flow(&name).ok_or(ProjectError::NoSuchFlow(name))?;
            let mut output = format!("{}\n", flow.name);
            for (index, step) in flow.steps.iter().enumerate() {
                let missing = if project.template(&step.template).is_none() {
                    " (missing)"
                } else {
                    ""
                };
                let _ = writeln!(output, "  {}. {}{}", index + 1, step.template, missing);
            }
            return Ok(output);
        }
        FlowCommand::New { name, requests } => {
            let output = format!("Created flow '{}' with {} step(s)\n", name, requests.len());
            project.add_flow(Flow::new(name, requests))?;
            output
        }
        FlowCommand::Delete { name } => {
            let removed = project.remove_flow(&name)?;
            format!("Deleted flow '{}'\n", removed.name)
        }
        FlowCommand::Edit {
            name,
            delete,
            insert,
            moves,
        } => {
            let edits = StepEdits {
                removals: delete,
                insertions: insert,
                moves,
            };
            if edits.is_empty() {
                return Ok(format!("No changes to flow '{}'\n", name));
            }
            project.edit_flow(&name, &edits)?;
            format!("Updated flow '{}'\n", name)
        }
        FlowCommand::Exec {
            name,
            overrides,
            include_headers,
        } => return exec_flow(project, &name, overrides, include_headers),
    };

    project.save()?;
    Ok(output)
}

/// Runs a flow and saves whatever it changed, including after a failure.
fn exec_flow(
    mut project: Project,
    name: &str,
    overrides: Overrides,
    include_headers: bool,
) -> Result<String, CommandError> {
    let (transport, jar) = transport_for(&project)?;

    let outcome = execute_flow(&mut project, name, &override_map(overrides), &transport);
    if let Some(jar) = &jar {
        project.store_cookies(jar);
    }
    project.save()?;
    let outcome = outcome?;

    let options = FormatOptions {
        show_headers: include_headers,
    };
    let total = outcome.steps.len();
    let mut output = String::new();
    for step in &outcome.steps {
        let _ = writeln!(output, "== [{}/{}] {} ==", step.step, total, step.template);
        describe_result(&mut output, &step.result, options);
        output.push('\n');
    }
    let _ = writeln!(output, "Flow '{}' completed ({} steps)", outcome.flow, total);
    Ok(output)
}

// Variables and environments

fn env_label(env: &str) -> &str {
    if env == DEFAULT_ENV {
        "(default)"
    } else {
        env
    }
}

fn vars_command(invocation: &Invocation, command: VarsCommand) -> Result<String, CommandError> {
    let mut project = invocation.load()?;
    let store = &mut project.vars;

    let output = match command {
        VarsCommand::List { scope } => return Ok(list_vars(&project, scope)),
        VarsCommand::Get { name, scope } => {
            let EnvScope { env, default } = scope;
            let value = match (env, default) {
                (Some(env), _) => store.get_from(&name, &env),
                (None, true) => store.get_from(&name, DEFAULT_ENV),
                (None, false) => store.lookup(&name),
            };
            return value
                .map(|value| format!("{}\n", value))
                .ok_or(CommandError::UndefinedVariable(name));
        }
        VarsCommand::Set { name, value, env } => {
            if !is_valid_var_name(&name) {
                return Err(VarError::InvalidName(name).into());
            }
            match env {
                Some(env) => store.set_in(&name, value, &env),
                None => store.set(&name, value),
            }
            format!("Set {}\n", name.to_uppercase())
        }
        VarsCommand::Unset { name, env, all } => {
            let removed = if all {
                store.remove(&name)
            } else if let Some(env) = env {
                store.unset_in(&env, &name)
            } else {
                store.unset(&name)
            };
            if !removed {
                return Err(CommandError::UndefinedVariable(name));
            }
            format!("Unset {}\n", name.to_uppercase())
        }
    };

    project.save()?;
    Ok(output)
}

fn list_vars(project: &Project, scope: ListScope) -> String {
    let store = &project.vars;
    let mut output = String::new();

    let list_env = |output: &mut String, env: &str| {
        for name in store.defined_in(env) {
            let value = store.get_from(&name, env).unwrap_or_default();
            let _ = writeln!(output, "{}={}", name, value);
        }
    };

    if scope.all {
        for env in store.environment_names() {
            let _ = writeln!(output, "[{}]", env_label(&env));
            list_env(&mut output, &env);
        }
    } else if let Some(env) = &scope.env {
        list_env(&mut output, env);
    } else if scope.default {
        list_env(&mut output, DEFAULT_ENV);
    } else {
        for name in store.all() {
            let _ = writeln!(output, "{}={}", name, store.get(&name));
        }
    }
    output
}

fn env_command(
    invocation: &Invocation,
    name: Option<String>,
    default: bool,
    delete: Option<String>,
    list: bool,
) -> Result<String, CommandError> {
    let mut project = invocation.load()?;
    let store = &mut project.vars;
    let mut output = String::new();
    let mut changed = false;

    if let Some(env) = delete {
        if !store.delete_env(&env)? {
            return Err(CommandError::NoSuchEnvironment(env));
        }
        let _ = writeln!(output, "Deleted environment {}", env.to_uppercase());
        changed = true;
    }

    if default {
        store.set_current_env(DEFAULT_ENV);
        changed = true;
    } else if let Some(env) = name {
        store.set_current_env(&env);
        changed = true;
    }

    if list {
        for env in store.environment_names() {
            let marker = if env == store.current_env() { "*" } else { " " };
            let _ = writeln!(
                output,
                "{} {} ({} vars)",
                marker,
                env_label(&env),
                store.defined_in(&env).len()
            );
        }
    } else {
        let _ = writeln!(
            output,
            "Current environment: {}",
            env_label(store.current_env())
        );
    }

    if changed {
        project.save()?;
    }
    Ok(output)
}

// Settings, history and cookies

fn config_command(invocation: &Invocation, command: ConfigCommand) -> Result<String, CommandError> {
    let mut project = invocation.load()?;

    match command {
        ConfigCommand::List => {
            let mut output = String::new();
            for entry in setting_entries() {
                let _ = writeln!(
                    output,
                    "{} = {}\t# {}",
                    entry.name,
                    (entry.get)(&project.settings),
                    entry.description
                );
            }
            Ok(output)
        }
        ConfigCommand::Get { key } => Ok(format!("{}\n", get_setting(&project.settings, &key)?)),
        ConfigCommand::Set { key, value } => {
            set_setting(&mut project.settings, &key, &value)?;
            project.save()?;
            Ok(format!("{} = {}\n", key, get_setting(&project.settings, &key)?))
        }
    }
}

fn history_command(invocation: &Invocation, clear: bool) -> Result<String, CommandError> {
    let mut project = invocation.load()?;

    if clear {
        project.clear_history()?;
        return Ok("History cleared\n".to_string());
    }

    let mut output = String::new();
    for entry in project.history()? {
        let _ = writeln!(output, "{}", entry);
    }
    Ok(output)
}

fn cookies_command(invocation: &Invocation, clear: bool) -> Result<String, CommandError> {
    let mut project = invocation.load()?;

    if clear {
        project.clear_cookies()?;
        project.save()?;
        return Ok("Cookies cleared\n".to_string());
    }

    let jar = RecordingJar::new(&project.session, project.settings.cookie_lifetime());
    let mut output = String::new();
    for record in jar.session().cookies {
        let _ = writeln!(
            output,
            "{}  {}  {}",
            record.time.format("%Y-%m-%d %H:%M:%S"),
            record.url,
            record.set_cookie
        );
    }
    let _ = writeln!(output, "{} live cookie(s)", jar.live_count());
    Ok(output)
}
