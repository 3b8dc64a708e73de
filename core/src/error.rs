//! Error types for the Portability client.
//!
//! # Design
//! Every failure is returned synchronously to the caller as one
//! `PortabilityError`. The two server-reported variants, `Authorization`
//! (401/403) and `Api` (any other non-success status), carry the first
//! entry's code and message plus the full `errors` list from the body.
//! Everything else is a client-side condition: a bad argument, a transport
//! failure, or a body the client cannot interpret.

use serde_json::Value;
use thiserror::Error;

/// Boxed error produced by a `Transport`.
pub type TransportError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PortabilityError>;

#[derive(Debug, Error)]
pub enum PortabilityError {
    /// The caller asked for a response type the client does not know.
    #[error("Unsupported response type '{0}'")]
    UnsupportedResponseType(String),

    /// The caller asked for a verb other than GET, PUT, POST or DELETE.
    #[error("Method must be of GET, PUT, POST or DELETE")]
    UnsupportedMethod(String),

    /// The HTTP exchange itself failed (connection, timeout, unreadable body).
    #[error("An unknown error occurred.")]
    Transport(#[source] TransportError),

    /// The response body is not JSON, whatever the status.
    #[error("Unable to parse response, invalid JSON.")]
    InvalidJson(#[source] serde_json::Error),

    /// The body parsed but lacks the shape the client expects.
    #[error("Unknown JSON structure in response.")]
    UnknownStructure,

    /// 401 or 403 with an `errors` list.
    #[error("{}", api_message(.code, .message))]
    Authorization {
        status: u16,
        code: String,
        message: String,
        errors: Vec<Value>,
    },

    /// Any other non-success status with an `errors` list.
    #[error("{}", api_message(.code, .message))]
    Api {
        status: u16,
        code: String,
        message: String,
        errors: Vec<Value>,
    },

    /// The home document has no template under this key.
    #[error("home document has no URI template named '{0}'")]
    MissingTemplate(String),

    /// The home document template is not valid RFC 6570.
    #[error("invalid URI template '{key}': {source}")]
    Template {
        key: String,
        #[source]
        source: iri_string::template::Error,
    },

    /// A resource did not match the shape the caller asked for.
    #[error("resource does not match the requested shape: {0}")]
    Shape(#[source] serde_json::Error),
}

impl PortabilityError {
    /// Server error code from the first `errors` entry, if this is a
    /// server-reported error.
    pub fn code(&self) -> Option<&str> {
        match self {
            PortabilityError::Authorization { code, .. } | PortabilityError::Api { code, .. } => {
                Some(code)
            }
            _ => None,
        }
    }

    /// Full `errors` list returned by the server.
    pub fn error_list(&self) -> Option<&[Value]> {
        match self {
            PortabilityError::Authorization { errors, .. }
            | PortabilityError::Api { errors, .. } => Some(errors),
            _ => None,
        }
    }

    /// HTTP status behind a server-reported error.
    pub fn status(&self) -> Option<u16> {
        match self {
            PortabilityError::Authorization { status, .. }
            | PortabilityError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_authorization(&self) -> bool {
        matches!(self, PortabilityError::Authorization { .. })
    }
}

fn api_message(code: &str, message: &str) -> String {
    if code.is_empty() {
        message.to_string()
    } else {
        format!("{code}: {message}")
    }
}
