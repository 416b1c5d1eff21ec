//! Common utilities module

/// Environment variable loading utilities
pub mod env_loader;

/// Field violations and validation helpers
pub mod validation;

pub use env_loader::{load_env_flag, load_env_optional, load_env_parsed, load_env_string, EnvLoader};
pub use validation::{Constraint, FieldViolation, ValidationErrors, ViolationCollector};
