//! Error types for the Hetzner Robot provider.

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur while serving a provider operation.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested resource was not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// A validation error occurred.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A configuration error occurred.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An operation was attempted before `configure` succeeded.
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    /// The requested resource or data source type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The HTTP request could not be sent or its body could not be read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The Robot webservice answered with an unexpected status.
    #[error("Robot webservice response status {status}: {message}")]
    Api {
        /// HTTP status code of the response.
        status: u16,
        /// Robot error code (`NOT_FOUND`, `BOOT_ALREADY_ENABLED`, ...), if the body carried one.
        code: Option<String>,
        /// Robot error message, or the raw response body.
        message: String,
    },

    /// Invalid request from the host.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Operation not implemented.
    #[error("Unimplemented: {0}")]
    Unimplemented(String),
}

#[derive(Deserialize)]
struct RobotErrorEnvelope {
    error: RobotErrorBody,
}

#[derive(Deserialize)]
struct RobotErrorBody {
    code: Option<String>,
    message: Option<String>,
}

impl ProviderError {
    /// Build an [`ProviderError::Api`] from a response the caller did not expect.
    ///
    /// Robot reports failures as `{"error": {"status", "code", "message"}}`;
    /// anything else is kept verbatim as the message.
    pub fn from_api_response(status: u16, body: &str) -> Self {
        match serde_json::from_str::<RobotErrorEnvelope>(body) {
            Ok(envelope) => Self::Api {
                status,
                code: envelope.error.code,
                message: envelope
                    .error
                    .message
                    .unwrap_or_else(|| body.to_string()),
            },
            Err(_) => Self::Api {
                status,
                code: None,
                message: body.to_string(),
            },
        }
    }

    /// Get the error message as a string.
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(msg) => msg,
            Self::Validation(msg) => msg,
            Self::Configuration(msg) => msg,
            Self::NotConfigured(msg) => msg,
            Self::UnknownResource(msg) => msg,
            Self::Serialization(_err) => "serialization error (see Debug output)",
            Self::Http(_err) => "http error (see Debug output)",
            Self::Api { message, .. } => message,
            Self::InvalidRequest(msg) => msg,
            Self::Unimplemented(msg) => msg,
        }
    }

    /// The Robot error code carried by an API error, if any.
    pub fn api_code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// Whether the error means the remote object does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Api { status, .. } => *status == 404,
            _ => false,
        }
    }

    /// Turn a 404 from the webservice into [`ProviderError::NotFound`] naming `what`.
    pub(crate) fn or_not_found(self, what: impl std::fmt::Display) -> Self {
        if self.is_not_found() {
            Self::NotFound(what.to_string())
        } else {
            self
        }
    }
}
