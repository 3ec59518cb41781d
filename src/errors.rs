use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("MISSING_IDENTIFIER: {0}")]
    MissingIdentifier(String),
    #[error("DUPLICATE_FIELD: {0}")]
    DuplicateField(String),
    #[error("HOST_UNAVAILABLE: {0}")]
    HostUnavailable(String),
    #[error("NOT_FOUND: {0}")]
    NotFound(String),
    #[error("INVALID_CONFIG: {0}")]
    InvalidConfig(String),
    #[error("IO_FAILURE: {0}")]
    Io(String),
    #[error("INTERNAL: {0}")]
    Internal(String),
    /// A field creation failed part way through a sync run. `created` lists the
    /// fields that were created before the failing one, in creation order.
    #[error("SYNC_ABORTED: creating field '{field}' failed: {source}")]
    SyncAborted {
        field: String,
        created: Vec<String>,
        source: Box<AppError>,
    },
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingIdentifier(_) => "MISSING_IDENTIFIER",
            Self::DuplicateField(_) => "DUPLICATE_FIELD",
            Self::HostUnavailable(_) => "HOST_UNAVAILABLE",
            Self::NotFound(_) => "NOT_FOUND",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Io(_) => "IO_FAILURE",
            Self::Internal(_) => "INTERNAL",
            Self::SyncAborted { .. } => "SYNC_ABORTED",
        }
    }

    /// The host-level failure underneath any sync attribution.
    pub fn root_cause(&self) -> &AppError {
        match self {
            Self::SyncAborted { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(value: serde_yaml::Error) -> Self {
        Self::InvalidConfig(value.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
