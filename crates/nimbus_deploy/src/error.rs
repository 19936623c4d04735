//! Error types for stack deployment.

use nimbus_core::TemplateError;
use thiserror::Error;

/// Result type alias for deployment operations.
pub type DeployResult<T> = Result<T, DeployError>;

/// Errors that can occur while talking to CloudFormation.
#[derive(Error, Debug)]
pub enum DeployError {
    /// The service rejected the request. Holds the service's message.
    #[error("{0}")]
    Api(String),

    #[error("CloudFormation client not available: {0}")]
    ClientUnavailable(String),

    #[error("Deletion of stack '{0}' aborted")]
    Aborted(String),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DeployError {
    /// Build an `Api` error from CLI stderr, keeping only the service message.
    ///
    /// `An error occurred (ValidationError) when calling the CreateStack
    /// operation: Stack [web] already exists` becomes `Stack [web] already exists`.
    pub fn from_stderr(stderr: &str) -> Self {
        let stderr = stderr.trim();
        let message = stderr
            .split_once("operation: ")
            .map(|(_, message)| message)
            .unwrap_or(stderr);
        Self::Api(message.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_stderr_strips_prefix() {
        let err = DeployError::from_stderr(
            "\nAn error occurred (ValidationError) when calling the CreateStack operation: Stack [web] already exists\n",
        );
        assert_eq!(err.to_string(), "Stack [web] already exists");
    }

    #[test]
    fn test_from_stderr_keeps_unrecognized_text() {
        let err = DeployError::from_stderr("Unable to locate credentials");
        assert!(matches!(err, DeployError::Api(msg) if msg == "Unable to locate credentials"));
    }
}
