//! Command-line interface definition.

use crate::project::DEFAULT_PROJECT_FILE;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "restflow", about = "Scriptable REST client with request flows")]
pub struct Cli {
    /// Project file
    #[arg(short = 'P', long = "project", global = true, default_value = DEFAULT_PROJECT_FILE)]
    pub project: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a new project
    Init {
        /// Project name (defaults to the current directory name)
        name: Option<String>,
        /// Overwrite an existing project file
        #[arg(long)]
        force: bool,
    },

    /// Manage request templates
    #[command(subcommand)]
    Req(ReqCommand),

    /// Send a request template
    Send {
        name: String,
        #[command(flatten)]
        overrides: Overrides,
        /// Print response headers
        #[arg(short = 'i', long = "include")]
        include_headers: bool,
    },

    /// Manage and run flows
    #[command(subcommand)]
    Flow(FlowCommand),

    /// Inspect and change variables
    #[command(subcommand)]
    Vars(VarsCommand),

    /// Show, switch, list or delete environments
    Env {
        /// Environment to switch to
        name: Option<String>,
        /// Switch back to the default environment
        #[arg(long, conflicts_with = "name")]
        default: bool,
        /// Delete an environment
        #[arg(long, value_name = "NAME")]
        delete: Option<String>,
        /// List all environments
        #[arg(long)]
        list: bool,
    },

    /// Read and change project settings
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Show request history
    History {
        #[arg(long)]
        clear: bool,
    },

    /// Show recorded cookies
    Cookies {
        #[arg(long)]
        clear: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum ReqCommand {
    /// List request templates
    List,
    /// Create a request template
    New {
        name: String,
        #[command(flatten)]
        opts: RequestOpts,
    },
    /// Show a request template
    Show { name: String },
    /// Change a request template
    Edit {
        name: String,
        #[command(flatten)]
        opts: RequestOpts,
        /// Rename the template
        #[arg(long = "name", value_name = "NEW_NAME")]
        rename: Option<String>,
        /// Remove all values of a header
        #[arg(long, value_name = "NAME")]
        remove_header: Vec<String>,
        /// Remove a capture
        #[arg(long, value_name = "VAR")]
        remove_capture: Vec<String>,
        /// Remove the body
        #[arg(long)]
        remove_body: bool,
        /// Remove authentication
        #[arg(long)]
        remove_auth: bool,
    },
    /// Delete a request template
    Delete { name: String },
}

/// Options shared by `req new` and `req edit`.
#[derive(Debug, Default, Args)]
pub struct RequestOpts {
    /// HTTP method
    #[arg(short = 'X', long)]
    pub method: Option<String>,
    /// Request URL
    #[arg(short = 'u', long)]
    pub url: Option<String>,
    /// Header as "Name: value"; repeatable
    #[arg(short = 'H', long = "header", value_name = "HEADER")]
    pub headers: Vec<String>,
    /// Request body
    #[arg(short = 'd', long = "body", conflicts_with = "body_file")]
    pub body: Option<String>,
    /// Read the request body from a file
    #[arg(long, value_name = "PATH")]
    pub body_file: Option<PathBuf>,
    /// Capture as VAR:SPEC; repeatable
    #[arg(short = 'c', long = "capture", value_name = "VAR:SPEC")]
    pub captures: Vec<String>,
    /// Basic authentication as USER:PASSWORD
    #[arg(long, value_name = "USER:PASSWORD", conflicts_with = "bearer")]
    pub basic: Option<String>,
    /// Bearer token authentication
    #[arg(long, value_name = "TOKEN")]
    pub bearer: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum FlowCommand {
    /// List flows
    List,
    /// Create a flow from request templates, in order
    New {
        name: String,
        #[arg(required = true, value_name = "REQ")]
        requests: Vec<String>,
    },
    /// Show a flow's steps
    Show { name: String },
    /// Delete a flow
    Delete { name: String },
    /// Edit a flow's steps in one batch
    Edit {
        name: String,
        /// Delete step N (1-based); repeatable
        #[arg(long = "delete", value_name = "N")]
        delete: Vec<usize>,
        /// Insert REQ before 0-based SLOT, or append; repeatable
        #[arg(long = "insert", value_name = "[SLOT:]REQ", value_parser = parse_insertion)]
        insert: Vec<(Option<usize>, String)>,
        /// Move the step at 0-based FROM to TO; repeatable
        #[arg(long = "move", value_name = "FROM:TO", value_parser = parse_move)]
        moves: Vec<(usize, usize)>,
    },
    /// Run a flow
    Exec {
        name: String,
        #[command(flatten)]
        overrides: Overrides,
        /// Print response headers
        #[arg(short = 'i', long = "include")]
        include_headers: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum VarsCommand {
    /// List variables visible from the current environment
    List {
        #[command(flatten)]
        scope: ListScope,
    },
    /// Print one variable
    Get {
        name: String,
        #[command(flatten)]
        scope: EnvScope,
    },
    /// Set a variable
    Set {
        name: String,
        value: String,
        /// Environment to write to instead of the current one
        #[arg(long)]
        env: Option<String>,
    },
    /// Remove a variable
    Unset {
        name: String,
        /// Environment to remove from instead of the current one
        #[arg(long, conflicts_with = "all")]
        env: Option<String>,
        /// Remove from every environment
        #[arg(long)]
        all: bool,
    },
}

/// Which environment a single lookup reads.
#[derive(Debug, Default, Args)]
pub struct EnvScope {
    /// Read only this environment
    #[arg(long, conflicts_with = "default")]
    pub env: Option<String>,
    /// Read only the default environment
    #[arg(long)]
    pub default: bool,
}

/// Which variables `vars list` shows.
#[derive(Debug, Default, Args)]
pub struct ListScope {
    /// Only this environment
    #[arg(long, conflicts_with_all = ["default", "all"])]
    pub env: Option<String>,
    /// Only the default environment
    #[arg(long, conflicts_with = "all")]
    pub default: bool,
    /// Every environment
    #[arg(long)]
    pub all: bool,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// List all settings
    List,
    /// Print one setting
    Get { key: String },
    /// Change one setting
    Set { key: String, value: String },
}

/// One-time variable overrides for a send or flow run.
#[derive(Debug, Default, Args)]
pub struct Overrides {
    /// Override a variable for this run only; repeatable
    #[arg(short = 'V', long = "var", value_name = "NAME=VALUE", value_parser = parse_override)]
    pub vars: Vec<(String, String)>,
}

fn parse_override(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", s))?;
    if name.trim().is_empty() {
        return Err(format!("missing variable name in '{}'", s));
    }
    Ok((name.trim().to_string(), value.to_string()))
}

fn parse_insertion(s: &str) -> Result<(Option<usize>, String), String> {
    let (slot, template) = match s.split_once(':') {
        Some((slot, template)) => match slot.trim().parse::<usize>() {
            Ok(slot) => (Some(slot), template),
            Err(_) => (None, s),
        },
        None => (None, s),
    };
    if template.trim().is_empty() {
        return Err(format!("missing request name in '{}'", s));
    }
    Ok((slot, template.trim().to_string()))
}

fn parse_move(s: &str) -> Result<(usize, usize), String> {
    let invalid = || format!("expected FROM:TO with non-negative numbers, got '{}'", s);
    let (from, to) = s.split_once(':').ok_or_else(invalid)?;
    let from = from.trim().parse().map_err(|_| invalid())?;
    let to = to.trim().parse().map_err(|_| invalid())?;
    Ok((from, to))
}
