//! JSON reply envelope
//!
//! Every command run with `--format json` prints exactly one envelope on
//! stdout, whether it succeeded or not:
//!
//! ```json
//! {"data": ..., "message": "...", "status": "success", "response": 200,
//!  "timestamp": "2024-05-01T12:00:00Z", "duration": 0.004}
//! ```

use crate::error::CliError;
use crate::exit_codes::{EXIT_CONFLICT, EXIT_MISSING, EXIT_VALIDATION};
use serde::Serialize;
use std::time::Instant;

/// Outcome class of a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyStatus {
    Success,
    Error,
    Missing,
    Conflict,
    Exception,
}

impl ReplyStatus {
    /// HTTP-style response code
    pub fn response(&self) -> u16 {
        match self {
            ReplyStatus::Success => 200,
            ReplyStatus::Error => 400,
            ReplyStatus::Missing => 404,
            ReplyStatus::Conflict => 409,
            ReplyStatus::Exception => 500,
        }
    }

    /// Status for a failed command
    pub fn for_exit_code(exit_code: i32) -> Self {
        match exit_code {
            EXIT_VALIDATION => ReplyStatus::Error,
            EXIT_MISSING => ReplyStatus::Missing,
            EXIT_CONFLICT => ReplyStatus::Conflict,
            _ => ReplyStatus::Exception,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Reply<T: Serialize> {
    pub data: Option<T>,
    pub message: String,
    pub status: ReplyStatus,
    pub response: u16,
    pub timestamp: String,
    /// Seconds spent handling the command
    pub duration: f64,
}

impl<T: Serialize> Reply<T> {
    pub fn success(data: T, message: impl Into<String>, started: Instant) -> Self {
        Self::build(Some(data), message.into(), ReplyStatus::Success, started)
    }

    fn build(data: Option<T>, message: String, status: ReplyStatus, started: Instant) -> Self {
        Self {
            data,
            message,
            status,
            response: status.response(),
            timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            duration: started.elapsed().as_secs_f64(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| {
            format!(r#"{{"message": "failed to encode reply: {e}", "status": "exception", "response": 500}}"#)
        })
    }
}

impl Reply<serde_json::Value> {
    /// Envelope for a failed command; validation failures carry their violations as data
    pub fn failure(error: &CliError, data: Option<serde_json::Value>, started: Instant) -> Self {
        Self::build(
            data,
            error.full_chain(),
            ReplyStatus::for_exit_code(error.exit_code),
            started,
        )
    }
}
