//! Per-invocation state shared by every command

use crate::cli::{Cli, OutputFormat};
use crate::error::{CliError, CliResult};
use crate::reply::Reply;
use issuedesk::{Actor, Config, Environment, IssueDeskError, IssueTracker};
use serde::Serialize;
use serde_json::{json, Value};
use std::error::Error;
use std::time::Instant;

/// Everything a command needs besides its own arguments
#[derive(Debug)]
pub struct CommandContext {
    pub config: Config,
    pub format: OutputFormat,
    actor: Option<String>,
    started: Instant,
}

impl CommandContext {
    pub fn new(config: Config, format: OutputFormat, actor: Option<String>) -> Self {
        Self {
            config,
            format,
            actor,
            started: Instant::now(),
        }
    }

    /// Resolve the configuration for this invocation
    ///
    /// `--configuration` selects the profile and `--database` replaces the
    /// store path; both win over environment variables and the YAML file.
    pub fn load_config(cli: &Cli) -> CliResult<Config> {
        let mut config = match &cli.configuration {
            Some(name) => {
                let environment: Environment = name.parse().map_err(CliError::validation)?;
                Config::for_environment(environment)
            }
            None => Config::new(),
        };
        if let Some(path) = &cli.database {
            config.database_path = path.clone();
        }
        config
            .validate()
            .map_err(|e| CliError::from(IssueDeskError::from(e)))?;
        Ok(config)
    }

    /// The identity recorded on writes
    pub fn actor(&self) -> CliResult<Actor> {
        let identity = self.actor.as_deref().ok_or_else(|| {
            CliError::usage("No actor given: pass --actor or set ISSUEDESK_ACTOR")
        })?;
        Ok(Actor::new(identity)?)
    }

    /// Engine over the configured store
    pub async fn tracker(&self) -> CliResult<IssueTracker> {
        Ok(IssueTracker::from_config(&self.config).await?)
    }

    /// Print a successful result
    ///
    /// JSON output wraps `data` in a reply envelope; table output prints
    /// whatever `render` produces, or the message when it produces nothing.
    pub fn emit<T: Serialize>(
        &self,
        data: T,
        message: impl Into<String>,
        render: impl FnOnce(&T) -> String,
    ) {
        let message = message.into();
        match self.format {
            OutputFormat::Json => {
                println!("{}", Reply::success(data, message, self.started).to_json());
            }
            OutputFormat::Table => {
                let rendered = render(&data);
                if rendered.is_empty() {
                    println!("{}", message);
                } else {
                    println!("{}", rendered);
                }
            }
        }
    }

    /// Report a failed command and return its exit code
    pub fn fail(&self, error: &CliError) -> i32 {
        match self.format {
            OutputFormat::Json => {
                let reply = Reply::failure(error, violation_data(error), self.started);
                println!("{}", reply.to_json());
            }
            OutputFormat::Table => eprintln!("Error: {}", error.full_chain()),
        }
        error.exit_code
    }
}

/// The violated fields of a validation failure, for the reply `data`
fn violation_data(error: &CliError) -> Option<Value> {
    let errors = error
        .source()
        .and_then(|e| e.downcast_ref::<IssueDeskError>())
        .and_then(IssueDeskError::validation_errors)?;
    let violations: Vec<Value> = errors
        .violations()
        .iter()
        .map(|v| {
            json!({
                "field": v.field,
                "value": v.value,
                "constraint": v.constraint.to_string(),
            })
        })
        .collect();
    Some(json!({ "violations": violations }))
}
