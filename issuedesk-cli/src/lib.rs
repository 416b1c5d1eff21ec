//! issuedesk CLI library
//!
//! Command handlers, argument definitions and output helpers for the
//! `issuedesk` binary, exposed as a library so they can be tested directly.

/// Activity subcommands
pub mod activity;
/// Command-line interface definitions and argument parsing
pub mod cli;
/// Per-invocation configuration, actor and output handling
pub mod context;
/// Record store maintenance subcommands
pub mod db;
/// Table rendering
pub mod display;
/// CLI error type and exit code mapping
pub mod error;
/// Exit codes used by the CLI application
pub mod exit_codes;
/// Issue subcommands
pub mod issue;
/// Subscriber setup and the log file writer
pub mod logging;
/// JSON reply envelope
pub mod reply;
/// The settings subcommand
pub mod settings;
