//! Custom error types for translation operations

use std::time::Duration;
use thiserror::Error;

use crate::core::models::DocumentHandle;

/// Translation-related errors
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Transport-level failure that survived the retry budget
    #[error("Connection error: {message}")]
    Connection {
        /// What went wrong
        message: String,
        /// Whether the last failure was classified as transient
        retryable: bool,
    },

    /// 403 from the API
    #[error("Authorization failure, check authentication key{message}")]
    Authorization {
        /// Detail appended to the message
        message: String,
    },

    /// 456 from the API
    #[error("Quota for this billing period has been exceeded{message}")]
    QuotaExceeded {
        /// Detail appended to the message
        message: String,
    },

    /// 404 from the API
    #[error("Not found, check server_url{message}")]
    NotFound {
        /// Detail appended to the message
        message: String,
    },

    /// 404 from a glossary endpoint
    #[error("Glossary not found{message}")]
    GlossaryNotFound {
        /// Detail appended to the message
        message: String,
    },

    /// 429 after retries were exhausted
    #[error("Too many requests, servers are currently experiencing high load{message}")]
    TooManyRequests {
        /// Detail appended to the message
        message: String,
    },

    /// 503 while downloading a document that is not translated yet
    #[error("Document not ready{message}")]
    DocumentNotReady {
        /// Detail appended to the message
        message: String,
    },

    /// Any other unsuccessful status
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Server message, if any
        message: String,
    },

    /// A document job failed after upload; the handle allows recovery
    #[error("Document translation failed: {message} ({handle})")]
    DocumentTranslation {
        /// Summary of the failure
        message: String,
        /// Handle of the uploaded job
        handle: DocumentHandle,
        /// Underlying error, if the failure was not reported by the job itself
        #[source]
        source: Option<Box<TranslationError>>,
    },

    /// Rejected locally, before any request was made
    #[error("Invalid argument: {message}")]
    Validation {
        /// Description of the problem
        message: String,
    },

    /// Invalid response from API
    #[error("Invalid response: {message}")]
    InvalidResponse {
        /// Description of the problem
        message: String,
    },

    /// The caller-level deadline expired and the request was aborted
    #[error("Request cancelled after {0:?}")]
    Cancelled(Duration),

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the problem
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Reqwest error
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<anyhow::Error> for TranslationError {
    fn from(err: anyhow::Error) -> Self {
        TranslationError::Config {
            message: err.to_string(),
        }
    }
}

/// Which endpoint family produced a response, for status interpretation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusContext {
    /// Translation, usage and language endpoints
    General,
    /// 404 means the glossary does not exist
    Glossary,
    /// 503 means the document is not ready
    DocumentDownload,
}

impl TranslationError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        TranslationError::Validation {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_response(message: impl ToString) -> Self {
        TranslationError::InvalidResponse {
            message: message.to_string(),
        }
    }

    /// Whether repeating the same call later could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            TranslationError::Connection { retryable, .. } => *retryable,
            TranslationError::TooManyRequests { .. }
            | TranslationError::DocumentNotReady { .. }
            | TranslationError::Cancelled(_) => true,
            TranslationError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Handle of the failed job, if this error came from a document translation
    pub fn document_handle(&self) -> Option<&DocumentHandle> {
        match self {
            TranslationError::DocumentTranslation { handle, .. } => Some(handle),
            _ => None,
        }
    }

    /// Map the final status of a request to an error.
    ///
    /// 2xx and 3xx pass; everything else becomes the matching variant with
    /// `message`/`detail` from a JSON body, or the raw body otherwise.
    pub fn check_status(status: u16, body: &[u8], context: StatusContext) -> Result<()> {
        if (200..400).contains(&status) {
            return Ok(());
        }

        let message = match serde_json::from_slice::<serde_json::Value>(body) {
            Ok(json) => {
                let mut message = String::new();
                if let Some(m) = json.get("message").and_then(|m| m.as_str()) {
                    message.push_str(&format!(", message: {}", m));
                }
                if let Some(d) = json.get("detail").and_then(|d| d.as_str()) {
                    message.push_str(&format!(", detail: {}", d));
                }
                message
            }
            Err(_) if body.is_empty() => String::new(),
            Err(_) => format!(", {}", String::from_utf8_lossy(body)),
        };

        Err(match (status, context) {
            (403, _) => TranslationError::Authorization { message },
            (456, _) => TranslationError::QuotaExceeded { message },
            (404, StatusContext::Glossary) => TranslationError::GlossaryNotFound { message },
            (404, _) => TranslationError::NotFound { message },
            (400, _) => TranslationError::Api {
                status,
                message: format!("Bad request{}", message),
            },
            (429, _) => TranslationError::TooManyRequests { message },
            (503, StatusContext::DocumentDownload) => TranslationError::DocumentNotReady { message },
            (503, _) => TranslationError::Api {
                status,
                message: format!("Service unavailable{}", message),
            },
            _ => TranslationError::Api {
                status,
                message: format!(
                    "Unexpected status code{}, content: {}",
                    message,
                    String::from_utf8_lossy(body)
                ),
            },
        })
    }
}

/// Result type for translation operations
pub type Result<T> = std::result::Result<T, TranslationError>;
