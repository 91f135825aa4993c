//! Error types
//!
//! A single error enum covers configuration, connection, persistence and
//! control-thread failures. None of them is fatal to the host: target-level
//! connection errors are kept in the target's status, everything else is
//! returned to the immediate caller.

use crate::target::TargetId;

/// Error type for all push target operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A target configuration failed validation
    InvalidConfig(String),
    /// A target could not establish (or keep) its output
    ConnectFailed(String),
    /// The config store could not commit a document
    PersistFailed(String),
    /// A config document or one of its entries could not be parsed
    MalformedDocument(String),
    /// No control thread has been designated yet (or it was shut down)
    ControlThreadNotReady,
    /// `designate` was called a second time
    ControlThreadAlreadyDesignated,
    /// The control thread did not process a routed event in time
    DeliveryTimeout,
    /// No target with this id is registered
    UnknownTarget(TargetId),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidConfig(reason) => write!(f, "Invalid target configuration: {}", reason),
            Error::ConnectFailed(reason) => write!(f, "Connect failed: {}", reason),
            Error::PersistFailed(reason) => write!(f, "Failed to persist configuration: {}", reason),
            Error::MalformedDocument(reason) => write!(f, "Malformed config document: {}", reason),
            Error::ControlThreadNotReady => write!(f, "Control thread not designated"),
            Error::ControlThreadAlreadyDesignated => {
                write!(f, "Control thread already designated")
            }
            Error::DeliveryTimeout => write!(f, "Timed out waiting for the control thread"),
            Error::UnknownTarget(id) => write!(f, "Unknown target: {}", id),
        }
    }
}

impl std::error::Error for Error {}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn persist(context: &str, err: impl std::fmt::Display) -> Self {
        Error::PersistFailed(format!("{}: {}", context, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_reason() {
        let err = Error::InvalidConfig("server is empty".into());
        assert_eq!(
            err.to_string(),
            "Invalid target configuration: server is empty"
        );

        let err = Error::persist("rename", "permission denied");
        assert_eq!(
            err,
            Error::PersistFailed("rename: permission denied".into())
        );
    }
}
