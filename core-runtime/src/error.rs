//! Errors raised while assembling the runtime: configuration validation,
//! bridge injection, and the logging bootstrap.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A configuration value failed validation in the builder.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A required platform bridge was not injected for this host.
    #[error("Missing capability '{capability}': {message}")]
    CapabilityMissing { capability: String, message: String },

    /// The log filter did not parse or the subscriber could not be
    /// installed (it may only be installed once per process).
    #[error("Logging setup failed: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_missing_names_the_bridge() {
        let err = Error::CapabilityMissing {
            capability: "http_client".to_string(),
            message: "no HTTP bridge for this platform".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("http_client"));
        assert!(text.contains("no HTTP bridge"));
    }

    #[test]
    fn test_logging_error_display() {
        let err = Error::Logging("invalid directive".to_string());
        assert_eq!(err.to_string(), "Logging setup failed: invalid directive");
    }
}
