//! Error taxonomy for the pipeline.
//!
//! Each stage has its own error enum so callers can tell *which* stage gave
//! up; `AppError` wraps them for the binary, which maps every failure to a
//! process exit code:
//!
//! - 2: usage / local I/O
//! - 3: the payload or its columns could not be understood
//! - 4: network or chart rendering

use thiserror::Error;

/// Stage 1: fetching the raw payload from the remote service.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure or a non-success HTTP status on either hop.
    #[error("network failure{}", fmt_status(.status))]
    NetworkFailure {
        status: Option<u16>,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// The service answered with an HTML page instead of data or an export
    /// envelope. Usually means the request profile was rejected upstream.
    #[error("upstream rejected the request (HTML error page)")]
    UpstreamRejected,

    #[error("request timed out")]
    Timeout,
}

impl FetchError {
    /// Classify a reqwest transport error.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::NetworkFailure {
                status: err.status().map(|s| s.as_u16()),
                source: Some(err),
            }
        }
    }

    pub fn status(status: u16) -> Self {
        FetchError::NetworkFailure {
            status: Some(status),
            source: None,
        }
    }
}

fn fmt_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (HTTP {code})"),
        None => String::new(),
    }
}

/// Stage 2: turning raw bytes into a tabular frame.
#[derive(Debug, Error)]
pub enum FormatError {
    /// Every parser attempt was exhausted.
    #[error("payload is not a parseable table: {detail}")]
    Unparseable { detail: String },

    /// The payload is JSON. The fetcher dereferences export envelopes, so
    /// JSON reaching the resolver is never tabular data.
    #[error("payload is a JSON document, not tabular data (export link not dereferenced?)")]
    UnexpectedEnvelope,
}

/// Stage 3: picking the date and value columns.
#[derive(Debug, Error)]
pub enum IdentifyError {
    #[error("no streamflow column could be identified; available columns: {}", .columns.join(", "))]
    NoValueColumn { columns: Vec<String> },

    /// A caller-supplied column override named a column that does not exist.
    #[error("column '{name}' not found; available columns: {}", .columns.join(", "))]
    ColumnNotFound { name: String, columns: Vec<String> },
}

/// Top-level error for the binary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("format resolution failed: {0}")]
    Format(#[from] FormatError),

    #[error("column identification failed: {0}")]
    Identify(#[from] IdentifyError),

    #[error("chart rendering failed: {0}")]
    Chart(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Usage(String),
}

impl AppError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        AppError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Usage(_) | AppError::Io { .. } => 2,
            AppError::Format(_) | AppError::Identify(_) => 3,
            AppError::Fetch(_) | AppError::Chart(_) => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_stage_severity() {
        assert_eq!(AppError::from(FetchError::Timeout).exit_code(), 4);
        assert_eq!(
            AppError::from(FormatError::UnexpectedEnvelope).exit_code(),
            3
        );
        assert_eq!(
            AppError::from(IdentifyError::NoValueColumn { columns: vec![] }).exit_code(),
            3
        );
        assert_eq!(AppError::Usage("bad flag".into()).exit_code(), 2);
    }

    #[test]
    fn no_value_column_lists_available_names() {
        let err = IdentifyError::NoValueColumn {
            columns: vec!["estacion".into(), "codigo".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("estacion"), "message should list columns: {msg}");
        assert!(msg.contains("codigo"));
    }

    #[test]
    fn network_failure_displays_status_when_known() {
        assert!(FetchError::status(503).to_string().contains("HTTP 503"));
        let no_status = FetchError::NetworkFailure {
            status: None,
            source: None,
        };
        assert!(!no_status.to_string().contains("HTTP"));
    }
}
