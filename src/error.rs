//! Error types for Drive Grade scoring and ingestion.
//!
//! Every failure surfaced by this crate is a [`DriveGradeError`]. Variants are grouped
//! into four kinds (see [`ErrorKind`]) so calling layers can pick retry, skip or abort
//! semantics without matching on individual variants.
//!
//! ## Error Categories
//!
//! - **Validation**: malformed or incomplete weekend files, tables or pit lists
//! - **Provider**: an upstream data source failed, returned nothing or was unavailable
//! - **Timeout**: a blocking external call exceeded its deadline
//! - **Aggregation**: a season run had no usable races
//! - **Io**: a file or directory could not be read or written
//!
//! ```rust
//! use drivegrade::{DriveGradeError, ErrorKind};
//!
//! let error = DriveGradeError::validation("strategy", "driver 'VER' has 2 optimal vs 1 actual stops");
//! assert_eq!(error.kind(), ErrorKind::Validation);
//! assert!(!error.is_retryable());
//! ```

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for Drive Grade operations.
pub type Result<T, E = DriveGradeError> = std::result::Result<T, E>;

/// Coarse classification of a [`DriveGradeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Provider,
    Timeout,
    Aggregation,
    Io,
}

/// Main error type for Drive Grade operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum DriveGradeError {
    #[error("Validation failed in {context}: {details}")]
    Validation { context: String, details: String },

    #[error("{table} missing columns: {}", missing.join(", "))]
    TableValidation { table: String, missing: Vec<String> },

    #[error("Parse error in {context}: {details}")]
    Parse { context: String, details: String },

    #[error("Provider {provider} failed: {reason}")]
    Provider {
        provider: String,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Provider {provider} returned no data for {operation}")]
    EmptyResult { provider: String, operation: String },

    #[error("No providers available to {operation}")]
    NoProviderAvailable { operation: String },

    #[error("{description} timed out after {timeout:?}")]
    Timeout { description: String, timeout: Duration },

    #[error("Season aggregation failed: {reason}")]
    Aggregation { reason: String },

    #[error("File error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DriveGradeError {
    /// Returns the coarse kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DriveGradeError::Validation { .. }
            | DriveGradeError::TableValidation { .. }
            | DriveGradeError::Parse { .. } => ErrorKind::Validation,
            DriveGradeError::Provider { .. }
            | DriveGradeError::EmptyResult { .. }
            | DriveGradeError::NoProviderAvailable { .. } => ErrorKind::Provider,
            DriveGradeError::Timeout { .. } => ErrorKind::Timeout,
            DriveGradeError::Aggregation { .. } => ErrorKind::Aggregation,
            DriveGradeError::File { .. } => ErrorKind::Io,
        }
    }

    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            DriveGradeError::Provider { .. } => true,
            DriveGradeError::EmptyResult { .. } => true,
            DriveGradeError::NoProviderAvailable { .. } => true,
            DriveGradeError::Timeout { .. } => true,
            DriveGradeError::Validation { .. } => false,
            DriveGradeError::TableValidation { .. } => false,
            DriveGradeError::Parse { .. } => false,
            DriveGradeError::Aggregation { .. } => false,
            DriveGradeError::File { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            DriveGradeError::Validation { .. } => vec![
                "Check pit lap lists have one actual stop per planned stop",
                "Verify numeric fields hold numbers",
                "Fix the source data and re-run ingestion",
            ],
            DriveGradeError::TableValidation { .. } => vec![
                "Add the missing columns to the table header",
                "Regenerate the tables with the table exporter",
            ],
            DriveGradeError::Parse { .. } => vec![
                "Check the file is valid JSON or YAML",
                "Verify the weekend file matches the documented schema",
            ],
            DriveGradeError::Provider { .. } => vec![
                "Check network connectivity to the provider",
                "Retry later or rely on a fallback provider",
            ],
            DriveGradeError::EmptyResult { .. } => vec![
                "Confirm the season and round exist",
                "Wait for the provider to publish the session",
            ],
            DriveGradeError::NoProviderAvailable { .. } => vec![
                "Configure at least one provider",
                "Check the session archive directory exists",
            ],
            DriveGradeError::Timeout { .. } => vec![
                "Increase the session timeout",
                "Retry the request",
            ],
            DriveGradeError::Aggregation { .. } => vec![
                "Supply at least one championship (non-testing) race",
            ],
            DriveGradeError::File { .. } => vec![
                "Check the file exists and is readable",
                "Check file permissions",
            ],
        }
    }

    /// Helper constructor for validation errors.
    pub fn validation(context: impl Into<String>, details: impl Into<String>) -> Self {
        DriveGradeError::Validation { context: context.into(), details: details.into() }
    }

    /// Helper constructor for parse errors.
    pub fn parse(context: impl Into<String>, details: impl ToString) -> Self {
        DriveGradeError::Parse { context: context.into(), details: details.to_string() }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DriveGradeError::File { path: path.into(), source }
    }

    /// Helper constructor for provider failures without an underlying cause.
    pub fn provider_failed(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        DriveGradeError::Provider { provider: provider.into(), reason: reason.into(), source: None }
    }

    /// Helper constructor for provider failures with source.
    pub fn provider_failed_with_source(
        provider: impl Into<String>,
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        DriveGradeError::Provider {
            provider: provider.into(),
            reason: reason.into(),
            source: Some(source),
        }
    }

    /// Helper constructor for aggregation errors.
    pub fn aggregation(reason: impl Into<String>) -> Self {
        DriveGradeError::Aggregation { reason: reason.into() }
    }
}

impl From<std::io::Error> for DriveGradeError {
    fn from(err: std::io::Error) -> Self {
        DriveGradeError::File { path: PathBuf::from("<unknown>"), source: err }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn error_messages_carry_their_context(
            context in "\\w+",
            details in ".*",
            provider in "\\w+",
            timeout_ms in 1u64..60_000u64
        ) {
            let validation = DriveGradeError::validation(context.clone(), details.clone());
            prop_assert!(validation.to_string().contains(&context));
            prop_assert!(validation.to_string().contains(&details));

            let provider_err = DriveGradeError::provider_failed(provider.clone(), "boom");
            prop_assert!(provider_err.to_string().contains(&provider));

            let timeout = DriveGradeError::Timeout {
                description: context.clone(),
                timeout: Duration::from_millis(timeout_ms),
            };
            prop_assert!(timeout.to_string().contains("timed out"));
            prop_assert_eq!(timeout.kind(), ErrorKind::Timeout);
        }
    }

    #[test]
    fn table_validation_names_table_and_columns() {
        let error = DriveGradeError::TableValidation {
            table: "telemetry".to_string(),
            missing: vec!["lap_delta".to_string(), "lap_number".to_string()],
        };
        assert_eq!(error.to_string(), "telemetry missing columns: lap_delta, lap_number");
        assert_eq!(error.kind(), ErrorKind::Validation);
    }

    #[test]
    fn kinds_partition_variants() {
        assert_eq!(DriveGradeError::aggregation("none").kind(), ErrorKind::Aggregation);
        assert_eq!(
            DriveGradeError::NoProviderAvailable { operation: "fetch race".into() }.kind(),
            ErrorKind::Provider
        );
        assert_eq!(
            DriveGradeError::EmptyResult { provider: "legacy".into(), operation: "x".into() }
                .kind(),
            ErrorKind::Provider
        );
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(DriveGradeError::from(io).kind(), ErrorKind::Io);
    }

    #[test]
    fn retry_classification() {
        assert!(DriveGradeError::provider_failed("realtime", "503").is_retryable());
        assert!(
            DriveGradeError::Timeout { description: "load".into(), timeout: Duration::from_secs(1) }
                .is_retryable()
        );
        assert!(!DriveGradeError::validation("strategy", "mismatch").is_retryable());
        assert!(!DriveGradeError::aggregation("no races").is_retryable());

        for suggestion in DriveGradeError::aggregation("x").recovery_suggestions() {
            assert!(suggestion.len() > 5);
        }
    }

    #[test]
    fn source_chain_is_preserved() {
        let inner = std::io::Error::other("connection reset");
        let error = DriveGradeError::provider_failed_with_source("legacy", "request failed", Box::new(inner));
        let source = std::error::Error::source(&error).expect("source should be kept");
        assert!(source.to_string().contains("connection reset"));
    }

    #[test]
    fn error_is_send_sync_static() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<DriveGradeError>();
    }
}
