//! Error types for the replication orchestration engine.

use thiserror::Error;

/// Errors raised while reading, mutating or reporting on replication relationships.
///
/// Variants fall in three groups. Connection, authentication and configuration
/// failures are fatal and abort the running action. Target, existence, state
/// and remote rejections are per-item: they are recorded against a single
/// directory or relationship and the batch continues. Identity lookup and I/O
/// failures never change the outcome of an action.
#[derive(Debug, Error)]
pub enum ReplError {
    /// The cluster could not be reached.
    #[error("connection to {host} failed: {msg}")]
    Connection {
        /// Host the request was sent to.
        host: String,
        /// Transport error description.
        msg: String,
    },

    /// The cluster refused the supplied credentials or session.
    #[error("authentication with {host} failed: {msg}")]
    Auth {
        /// Host that rejected the request.
        host: String,
        /// Error description returned by the cluster.
        msg: String,
    },

    /// Invalid invocation: empty endpoint pool, conflicting filters, unknown network.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The destination directory exists and already holds data.
    #[error("target directory {path} is not empty")]
    TargetNotEmpty {
        /// Destination path that was checked.
        path: String,
    },

    /// A relationship already covers the source directory.
    #[error("a replication relationship already exists for {path}")]
    AlreadyExists {
        /// Source path that is already replicated.
        path: String,
    },

    /// The relationship is not in the state the operation requires.
    #[error("relationship {id} is {state}, expected {expected}")]
    InvalidState {
        /// Relationship identifier.
        id: String,
        /// State the relationship was found in.
        state: String,
        /// State the operation requires.
        expected: String,
    },

    /// The cluster name/id query failed.
    #[error("cluster identity lookup failed: {0}")]
    IdentityLookup(String),

    /// Any other rejection reported by the cluster for a single request.
    #[error("remote error (HTTP {status}): {msg}")]
    Remote {
        /// HTTP status returned by the cluster.
        status: u16,
        /// First line of the error body.
        msg: String,
    },

    /// I/O error while writing a report or log.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV encoding or decoding error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl ReplError {
    /// Returns true when the error must abort the whole action.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ReplError::Connection { .. } | ReplError::Auth { .. } | ReplError::Configuration(_)
        )
    }

    /// Short machine-friendly name of the error kind, used in run logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ReplError::Connection { .. } => "ConnectionError",
            ReplError::Auth { .. } => "AuthError",
            ReplError::Configuration(_) => "ConfigurationError",
            ReplError::TargetNotEmpty { .. } => "TargetNotEmptyError",
            ReplError::AlreadyExists { .. } => "AlreadyExistsError",
            ReplError::InvalidState { .. } => "InvalidStateError",
            ReplError::IdentityLookup(_) => "IdentityLookupError",
            ReplError::Remote { .. } => "RemoteError",
            ReplError::Io(_) | ReplError::Csv(_) => "IOError",
        }
    }
}

/// Result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, ReplError>;
