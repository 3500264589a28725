//! Error types for the SVM provisioner
//!
//! Provides structured error types for partition provisioning, endpoint
//! allocation, credential reconciliation and the two external systems the
//! engine talks to (the storage controller and the control-plane secret store).

use std::time::Duration;
use thiserror::Error;

/// Unified error type for the engine
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Operation cancelled: {operation}")]
    Cancelled { operation: String },

    // =========================================================================
    // Resource Errors
    // =========================================================================
    #[error("Resource not found: {kind}/{name}")]
    NotFound { kind: String, name: String },

    #[error("Resource already exists: {kind}/{name}")]
    AlreadyExists { kind: String, name: String },

    /// Account exists on the controller but no secret mirrors it.
    #[error("Credential secret missing for existing account {username} on SVM {svm}")]
    SeedSecretMissing { svm: String, username: String },

    // =========================================================================
    // Provisioning Errors
    // =========================================================================
    #[error("SVM {svm} not ready after {attempts} attempts: {last_condition}")]
    ReadinessTimeout {
        svm: String,
        attempts: u32,
        last_condition: String,
    },

    #[error("Insufficient storage nodes: found {found}, need at least {required}")]
    InsufficientNodes { found: usize, required: usize },

    #[error("Failed to create network interface {interface}: {source}")]
    InterfaceCreation {
        interface: String,
        #[source]
        source: Box<Error>,
    },

    #[error("{operation} failed for project {project}: {source}")]
    Context {
        project: String,
        operation: String,
        #[source]
        source: Box<Error>,
    },

    // =========================================================================
    // Storage Controller Errors
    // =========================================================================
    #[error("Storage controller error: {operation} returned {status}: {message}")]
    Controller {
        operation: String,
        status: u16,
        message: String,
    },

    #[error("Storage controller connection error: {0}")]
    Http(#[from] reqwest::Error),

    // =========================================================================
    // Kubernetes Errors
    // =========================================================================
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Metrics registration error: {0}")]
    Metrics(#[from] prometheus::Error),
}

/// Action to take on error during reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    /// Requeue with exponential backoff
    RequeueWithBackoff,
    /// Requeue after specific duration
    RequeueAfter(Duration),
    /// Don't requeue, wait for changes
    NoRequeue,
}

impl Error {
    /// Attach tenant and operation context to an error
    pub fn context(self, project: impl Into<String>, operation: impl Into<String>) -> Self {
        Error::Context {
            project: project.into(),
            operation: operation.into(),
            source: Box::new(self),
        }
    }

    /// Innermost error, looking through context and interface wrappers
    pub fn root(&self) -> &Error {
        match self {
            Error::Context { source, .. } | Error::InterfaceCreation { source, .. } => {
                source.root()
            }
            other => other,
        }
    }

    /// Determine what action to take for this error
    pub fn action(&self) -> ErrorAction {
        match self.root() {
            // Transient errors - retry with backoff
            Error::Http(_) | Error::Kube(_) | Error::Controller { .. } => {
                ErrorAction::RequeueWithBackoff
            }

            // SVM still coming up - give the controller time
            Error::ReadinessTimeout { .. } => ErrorAction::RequeueAfter(Duration::from_secs(30)),

            // Cluster topology may change, but not quickly
            Error::InsufficientNodes { .. } => {
                ErrorAction::RequeueAfter(Duration::from_secs(300))
            }

            // Lost a create race, next pass observes the winner
            Error::AlreadyExists { .. } => ErrorAction::RequeueAfter(Duration::from_secs(5)),

            // Configuration/validation errors - don't retry automatically
            Error::Configuration(_) | Error::Validation(_) | Error::Cancelled { .. } => {
                ErrorAction::NoRequeue
            }

            // Rotation disabled; waits for an operator to restore the secret
            Error::SeedSecretMissing { .. } => ErrorAction::NoRequeue,

            // All other errors - retry with backoff
            _ => ErrorAction::RequeueWithBackoff,
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        !matches!(self.action(), ErrorAction::NoRequeue)
    }

    /// Check if this error is transient
    pub fn is_transient(&self) -> bool {
        matches!(
            self.root(),
            Error::Http(_) | Error::Kube(_) | Error::Controller { .. }
        )
    }

    /// Check if this error reports a missing resource
    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), Error::NotFound { .. })
    }

    /// Check if this error reports a name collision on create
    pub fn is_already_exists(&self) -> bool {
        matches!(self.root(), Error::AlreadyExists { .. })
    }
}

/// Result type alias for the engine
pub type Result<T> = std::result::Result<T, Error>;
