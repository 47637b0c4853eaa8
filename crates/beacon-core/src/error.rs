use thiserror::Error;

/// Core error type for BEACON operations.
#[derive(Error, Debug)]
pub enum BeaconError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    #[error("Address not found: {address} is not registered for service {service}")]
    AddressNotFound { service: String, address: String },

    #[error("Corrupt record under key {key}: {reason}")]
    CorruptRecord { key: String, reason: String },

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Write conflict on key {key} after {attempts} attempts")]
    Conflict { key: String, attempts: u32 },

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Machine-checkable classification of a [`BeaconError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    CorruptRecord,
    StoreUnavailable,
    Conflict,
    Internal,
}

impl ErrorKind {
    /// Stable code used on the wire.
    pub fn as_code(&self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::CorruptRecord => "CORRUPT_RECORD",
            Self::StoreUnavailable => "STORE_UNAVAILABLE",
            Self::Conflict => "CONFLICT",
            Self::Internal => "INTERNAL_ERROR",
        }
    }
}

impl BeaconError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::ServiceNotFound(_) | Self::AddressNotFound { .. } => ErrorKind::NotFound,
            Self::CorruptRecord { .. } => ErrorKind::CorruptRecord,
            Self::StoreUnavailable(_) => ErrorKind::StoreUnavailable,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Config(_) | Self::Unsupported(_) | Self::Serialization(_) | Self::Io(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Whether the error is a legitimate terminal state rather than a fault.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

impl From<serde_json::Error> for BeaconError {
    fn from(e: serde_json::Error) -> Self {
        BeaconError::Serialization(e.to_string())
    }
}

/// Result type alias using BeaconError.
pub type Result<T> = std::result::Result<T, BeaconError>;
