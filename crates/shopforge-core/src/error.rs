//! Unified error types for ShopForge using thiserror.
//!
//! Operational errors carry a stable code and HTTP status so the API layer
//! can serialize them without inspecting variants; everything else maps to
//! an internal server error.

use thiserror::Error;

/// The unified error type for ShopForge operations
#[derive(Error, Debug)]
pub enum Error {
    // Request validation
    #[error("Store name is required")]
    MissingStoreName,

    #[error("Invalid store name: {message}")]
    InvalidStoreName { message: String },

    #[error("Unknown engine: {engine}")]
    InvalidEngine { engine: String },

    #[error("Engine '{engine}' is not available: {message}")]
    EngineUnavailable { engine: String, message: String },

    #[error("Request body is not valid JSON: {message}")]
    InvalidJson { message: String },

    // State machine guards
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Invalid state transition: cannot {action} a store in status '{status}'")]
    InvalidStateTransition { action: String, status: String },

    #[error("Operation '{operation}' already in progress for store {store_id}")]
    OperationInProgress {
        store_id: String,
        operation: String,
    },

    // Limits
    #[error("Store quota exceeded: maximum of {limit} active stores")]
    QuotaExceeded { limit: u32 },

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    // Persistence
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // External tools
    #[error("Helm command failed: {message}")]
    Helm { message: String },

    #[error("Cluster query failed: {message}")]
    Cluster { message: String },

    #[error("Command '{command}' timed out after {timeout_secs}s")]
    CommandTimeout { command: String, timeout_secs: u64 },

    // Workflow
    #[error("Provisioning timed out")]
    ProvisioningTimeout,

    #[error("{message}")]
    ProvisioningFailed { message: String },

    // Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },

    // Generic wrapped error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Create a database error
    pub fn database(message: impl Into<String>) -> Self {
        Error::Database {
            message: message.into(),
            source: None,
        }
    }

    /// Create a database error with source
    pub fn database_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Error::Database {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a not found error
    pub fn not_found(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Error::NotFound {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    pub fn invalid_store_name(message: impl Into<String>) -> Self {
        Error::InvalidStoreName {
            message: message.into(),
        }
    }

    pub fn invalid_transition(action: impl Into<String>, status: impl Into<String>) -> Self {
        Error::InvalidStateTransition {
            action: action.into(),
            status: status.into(),
        }
    }

    pub fn operation_in_progress(
        store_id: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        Error::OperationInProgress {
            store_id: store_id.into(),
            operation: operation.into(),
        }
    }

    pub fn provisioning_failed(message: impl Into<String>) -> Self {
        Error::ProvisioningFailed {
            message: message.into(),
        }
    }

    pub fn helm(message: impl Into<String>) -> Self {
        Error::Helm {
            message: message.into(),
        }
    }

    pub fn cluster(message: impl Into<String>) -> Self {
        Error::Cluster {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal {
            message: message.into(),
        }
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Error::MissingStoreName
            | Error::InvalidStoreName { .. }
            | Error::InvalidEngine { .. }
            | Error::EngineUnavailable { .. }
            | Error::InvalidJson { .. } => 400,
            Error::NotFound { .. } => 404,
            Error::InvalidStateTransition { .. } | Error::OperationInProgress { .. } => 409,
            Error::QuotaExceeded { .. } | Error::RateLimitExceeded => 429,
            _ => 500,
        }
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::MissingStoreName => "MISSING_STORE_NAME",
            Error::InvalidStoreName { .. } => "INVALID_STORE_NAME",
            Error::InvalidEngine { .. } => "INVALID_ENGINE",
            Error::EngineUnavailable { .. } => "ENGINE_UNAVAILABLE",
            Error::InvalidJson { .. } => "INVALID_JSON",
            Error::NotFound { .. } => "NOT_FOUND",
            Error::InvalidStateTransition { .. } => "INVALID_STATE_TRANSITION",
            Error::OperationInProgress { .. } => "OPERATION_IN_PROGRESS",
            Error::QuotaExceeded { .. } => "QUOTA_EXCEEDED",
            Error::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            _ => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Whether the error is expected and safe to show to API clients as-is
    pub fn is_operational(&self) -> bool {
        self.status_code() != 500
    }
}

/// Result type alias for ShopForge operations
pub type Result<T> = std::result::Result<T, Error>;
