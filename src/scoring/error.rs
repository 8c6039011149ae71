//! Error types for selection and routing-service failures

use crate::registry::RegistryError;
use thiserror::Error;

/// Errors surfaced by selection and the router façade.
///
/// Every variant fails the call, never the process.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RoutingError {
    /// The request is malformed; nothing was changed
    #[error("Invalid request field '{field}': {message}")]
    InvalidRequest { field: String, message: String },

    /// No candidate backend is registered
    #[error("No available backends (requested: {requested:?})")]
    NoAvailableBackends { requested: Vec<String> },

    /// Backend state could not be read
    #[error("Backend registry unavailable: {0}")]
    BackendRegistryUnavailable(String),

    #[error("Backend not found: {0}")]
    BackendNotFound(String),

    #[error("Backend already registered: {0}")]
    DuplicateBackend(String),
}

impl RoutingError {
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        RoutingError::InvalidRequest {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Stable machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            RoutingError::InvalidRequest { .. } => "invalid_request",
            RoutingError::NoAvailableBackends { .. } => "no_available_backends",
            RoutingError::BackendRegistryUnavailable(_) => "registry_unavailable",
            RoutingError::BackendNotFound(_) => "backend_not_found",
            RoutingError::DuplicateBackend(_) => "duplicate_backend",
        }
    }
}

impl From<RegistryError> for RoutingError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NoAvailableBackends { requested } => {
                RoutingError::NoAvailableBackends { requested }
            }
            RegistryError::BackendNotFound(id) => RoutingError::BackendNotFound(id),
            RegistryError::DuplicateBackend(id) => RoutingError::DuplicateBackend(id),
            RegistryError::EmptyBackendId => {
                RoutingError::invalid("backend_id", "backend id must not be empty")
            }
            RegistryError::InvalidCapabilities { message, .. } => {
                RoutingError::invalid("capabilities", message)
            }
        }
    }
}
