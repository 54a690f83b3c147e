use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Process not found: {0}")]
    ProcessNotFound(String),

    #[error("Failed to open process: {0}")]
    ProcessOpenFailed(String),

    #[error("Failed to read process memory at address {address:#x}: {message}")]
    MemoryReadFailed { address: u64, message: String },

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("Static address not resolved: {0}")]
    AddressNotResolved(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not supported on this platform: {0}")]
    Unsupported(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// True for failures callers should degrade on (treat the value as
    /// unchanged) rather than escalate.
    pub fn is_read_failure(&self) -> bool {
        matches!(self, Error::MemoryReadFailed { .. })
    }

    /// True for errors that retrying cannot fix.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::InvalidConfig(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_failure_classification() {
        let err = Error::MemoryReadFailed {
            address: 0x1000,
            message: "gone".to_string(),
        };
        assert!(err.is_read_failure());
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_config_error_is_fatal() {
        let err = Error::InvalidConfig("process_index 5 out of range".to_string());
        assert!(err.is_fatal());
        assert!(!err.is_read_failure());
    }
}
