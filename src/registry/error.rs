/// Errors that can occur during registry operations
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("backend already exists: {0}")]
    DuplicateBackend(String),

    #[error("backend not found: {0}")]
    BackendNotFound(String),

    #[error("backend id must not be empty")]
    EmptyBackendId,

    #[error("invalid capabilities for backend '{id}': {message}")]
    InvalidCapabilities { id: String, message: String },

    #[error("none of the requested backends are registered: {requested:?}")]
    NoAvailableBackends { requested: Vec<String> },
}
