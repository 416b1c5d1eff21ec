use clap::{Parser, Subcommand, ValueEnum};
use is_terminal::IsTerminal;
use std::io;
use std::path::PathBuf;

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "issuedesk")]
#[command(version)]
#[command(about = "Manage issues and their activity history")]
#[command(long_about = "
issuedesk keeps issues with sequential per-project names (DWB-0001,
DWB-0002, ...) and records every change as an activity entry holding a
field-level diff.

Example usage:
  issuedesk db create                                  # Create an empty store
  issuedesk issue create --project DWB --type BUG --priority 2 --story-points 3 --summary 'Login fails'
  issuedesk issue update DWB-0001 --set priority=4     # Change one field
  issuedesk issue history DWB-0001                     # Show recorded changes
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration profile (development, testing, docker, production)
    #[arg(short = 'c', long = "configuration", global = true)]
    pub configuration: Option<String>,

    /// Path of the JSON record store
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table, global = true)]
    pub format: OutputFormat,

    /// Identity recorded as the author of changes
    #[arg(long, env = "ISSUEDESK_ACTOR", global = true)]
    pub actor: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the effective configuration
    #[command(long_about = "
Prints every configuration setting after defaults, ISSUEDESK_* environment
variables, issuedesk.yaml and command-line flags have been applied.

Example:
  issuedesk settings
  issuedesk -c production settings --format json
")]
    Settings,
    /// Create, reset and populate the record store
    #[command(long_about = "
Manage the JSON record store file.

Examples:
  issuedesk db create
  issuedesk db seed --issues issues.json --activity activity.json
  issuedesk db fake --count 25 --project DWB
  issuedesk db drop
")]
    Db {
        #[command(subcommand)]
        subcommand: DbCommands,
    },
    /// Create, inspect and update issues
    #[command(long_about = "
Issues are named {PROJECT}-{NNNN}. Updates only write the fields whose
value changed and record the change as an UPDATE activity entry.

Examples:
  issuedesk issue create --project DWB --type BUG --priority 2 --story-points 3 --summary 'Login fails'
  issuedesk issue list --project DWB --status OPEN
  issuedesk issue show DWB-0001
  issuedesk issue update DWB-0001 --set status=IN_PROGRESS --set assigned_to=greg
  issuedesk issue update DWB-0001 --payload '{\"priority\": 1}'
  issuedesk issue history DWB-0001
  issuedesk issue delete DWB-0001
")]
    Issue {
        #[command(subcommand)]
        subcommand: IssueCommands,
    },
    /// Add and list activity entries
    #[command(long_about = "
Activity entries annotate an issue. UPDATE entries are written by
'issue update' and cannot be added directly.

Examples:
  issuedesk activity add DWB-0001 --text 'Reproduced on staging'
  issuedesk activity list --issue DWB-0001 --newest-first
")]
    Activity {
        #[command(subcommand)]
        subcommand: ActivityCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum DbCommands {
    /// Create an empty store file
    Create,
    /// Remove every record from the store
    Drop,
    /// Load issues and activity from JSON files
    Seed {
        /// JSON array of issue objects
        #[arg(long)]
        issues: PathBuf,
        /// JSON array of activity objects
        #[arg(long)]
        activity: Option<PathBuf>,
    },
    /// Generate random issues
    Fake {
        /// Number of issues to create
        #[arg(long, default_value_t = 10)]
        count: usize,
        /// Project key of the generated issues
        #[arg(long, default_value = "DWB")]
        project: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum IssueCommands {
    /// Create an issue
    Create {
        /// Project key
        #[arg(long)]
        project: Option<String>,
        /// Issue type (BUG, FEATURE, TASK, ...)
        #[arg(long = "type")]
        issue_type: Option<String>,
        /// Priority, 1 (highest) to 5
        #[arg(long)]
        priority: Option<i64>,
        /// Story points
        #[arg(long)]
        story_points: Option<i64>,
        /// One-line summary
        #[arg(long)]
        summary: Option<String>,
        /// Longer description
        #[arg(long)]
        description: Option<String>,
        /// Assignee
        #[arg(long)]
        assigned_to: Option<String>,
        /// Version the problem was found in
        #[arg(long)]
        affected_version: Option<String>,
        /// Initial status (default OPEN)
        #[arg(long)]
        status: Option<String>,
        /// JSON object with the issue fields; flags override its values
        #[arg(long)]
        payload: Option<String>,
    },
    /// Show one issue
    Show {
        /// Issue name, e.g. DWB-0001
        name: String,
    },
    /// List issues
    List {
        /// Only issues of this project
        #[arg(long)]
        project: Option<String>,
        /// Only issues of this type
        #[arg(long = "type")]
        issue_type: Option<String>,
        /// Only issues with this status
        #[arg(long)]
        status: Option<String>,
        /// Only issues with this resolution
        #[arg(long)]
        resolution: Option<String>,
        /// Only issues assigned to this identity
        #[arg(long)]
        assigned_to: Option<String>,
        /// Only issues created by this identity
        #[arg(long)]
        created_by: Option<String>,
    },
    /// Change fields of an issue
    Update {
        /// Issue name, e.g. DWB-0001
        name: String,
        /// Field assignment; `null` clears an optional field
        #[arg(long = "set", value_name = "FIELD=VALUE", value_parser = parse_assignment)]
        assignments: Vec<(String, String)>,
        /// JSON object with the fields to change
        #[arg(long)]
        payload: Option<String>,
    },
    /// Delete an issue without activity
    Delete {
        /// Issue name, e.g. DWB-0001
        name: String,
    },
    /// Show the activity of an issue, newest first
    History {
        /// Issue name, e.g. DWB-0001
        name: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ActivityCommands {
    /// Add an activity entry to an issue
    Add {
        /// Issue name or numeric id
        issue: String,
        /// Activity type
        #[arg(long = "type", default_value = "COMMENT")]
        activity_type: String,
        /// Entry text
        #[arg(long)]
        text: Option<String>,
    },
    /// List activity entries
    List {
        /// Only entries of this issue
        #[arg(long)]
        issue: Option<String>,
        /// Only entries of this type
        #[arg(long = "type")]
        activity_type: Option<String>,
        /// Only entries by this identity
        #[arg(long)]
        created_by: Option<String>,
        /// Most recent entries first
        #[arg(long)]
        newest_first: bool,
    },
}

/// Parse a `field=value` pair
fn parse_assignment(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((field, value)) if !field.trim().is_empty() => {
            Ok((field.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected FIELD=VALUE, got '{s}'")),
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    #[allow(dead_code)]
    pub fn try_parse_from_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(args)
    }

    pub fn is_tty() -> bool {
        io::stdout().is_terminal()
    }

    pub fn should_use_color() -> bool {
        Self::is_tty() && std::env::var("NO_COLOR").is_err()
    }
}
