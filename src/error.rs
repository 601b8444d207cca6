//! Error types for ip4set.

use std::net::Ipv4Addr;
use thiserror::Error;

/// Fatal error type for ip4set operations.
///
/// Any of these aborts the load in progress. Problems confined to a single
/// input line are reported as [`LineError`] instead.
#[derive(Error, Debug)]
pub enum Error {
    /// Key buffer could not grow or shrink
    #[error("out of memory: cannot allocate {requested} keys")]
    OutOfMemory { requested: usize },

    /// Ingest or finalize outside of a load
    #[error("set builder is not loading; reset it first")]
    NotLoading,

    /// Finalize after a load was aborted
    #[error("load was aborted")]
    LoadAborted,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Invalid IPv4 address given as an argument
    #[error("invalid IP address: {0}")]
    InvalidAddress(String),
}

/// Result type alias for ip4set operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Non-fatal problem with one input line. The line is skipped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LineError {
    /// Bad dotted quad, or unexpected characters after it
    #[error("invalid address")]
    InvalidAddress,

    /// Directive line with a malformed record template
    #[error("invalid record template: {0}")]
    InvalidTemplate(#[from] TemplateError),
}

/// Error type for record template parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// A value is neither a dotted quad nor a single octet
    #[error("invalid A value: {0}")]
    InvalidAValue(String),

    /// A value outside 127.0.0.0/8
    #[error("A value {0} is not in 127.0.0.0/8")]
    NotLoopback(Ipv4Addr),

    /// TXT text that cannot be written back on one line
    #[error("control character in TXT text")]
    ControlCharacter,
}
