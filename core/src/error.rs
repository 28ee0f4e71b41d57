//! Error types for eater clients.
//!
//! # Design
//! `EaterError` is the single failure type returned by `HttpEater`. Transport
//! timeouts, other transport failures and HTTP statuses >= 400 each get a
//! dedicated variant so callers can decide what to retry. Validation
//! failures from the model layer travel inside `Data` untouched, keeping the
//! field-level detail of `DataError` available to the caller.

use std::fmt;

use thiserror::Error;

use crate::http::HttpMethod;
use crate::session::TransportError;

/// Errors returned by `HttpEater` construction and invocation.
#[derive(Debug, Error)]
pub enum EaterError {
    /// The transport gave up waiting for the server.
    #[error("{eater}.{method} for URL '{url}' timed out.")]
    Timeout {
        eater: String,
        method: HttpMethod,
        url: String,
    },

    /// Any transport failure other than a timeout: DNS, refused connection,
    /// TLS, broken pipe.
    #[error("Exception raised for URL '{url}'.")]
    Connect {
        url: String,
        #[source]
        source: TransportError,
    },

    /// The server answered with a status code >= 400.
    #[error("Received unexpected HTTP response '{status} {reason}' for URL '{url}'.")]
    Unexpected {
        status: u16,
        reason: String,
        url: String,
    },

    /// The body does not match the content type it claims to be.
    #[error("Unexpected response from URL '{url}': {message}")]
    UnexpectedResponse { url: String, message: String },

    /// No parser is registered for the response content type.
    #[error("Content type '{content_type}' is not implemented. {eater} should register a content handler for it.")]
    NotImplemented { content_type: String, eater: String },

    #[error(transparent)]
    Data(#[from] DataError),

    /// The URL template could not be rendered against the request model.
    #[error("cannot format URL template '{template}': {message}")]
    Template { template: String, message: String },

    /// The outbound request could not be assembled.
    #[error("cannot build request: {0}")]
    Request(String),
}

impl EaterError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, EaterError::Timeout { .. })
    }

    pub fn is_connect(&self) -> bool {
        matches!(self, EaterError::Connect { .. })
    }

    /// True for `Unexpected` and its specialization `UnexpectedResponse`.
    pub fn is_unexpected(&self) -> bool {
        matches!(
            self,
            EaterError::Unexpected { .. } | EaterError::UnexpectedResponse { .. }
        )
    }

    pub fn is_not_implemented(&self) -> bool {
        matches!(self, EaterError::NotImplemented { .. })
    }

    pub fn is_data(&self) -> bool {
        matches!(self, EaterError::Data(_))
    }

    /// HTTP status carried by an `Unexpected` error.
    pub fn status(&self) -> Option<u16> {
        match self {
            EaterError::Unexpected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The validation failure, if this error is one.
    pub fn as_data(&self) -> Option<&DataError> {
        match self {
            EaterError::Data(err) => Some(err),
            _ => None,
        }
    }
}

/// A single field that failed conversion or validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Validation failure raised while building a model from raw data.
///
/// Holds one entry per offending field. Conversion errors reported by
/// `serde_json` do not name a field and are stored under an empty field
/// name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DataError {
    errors: Vec<FieldError>,
}

impl DataError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut err = Self::new();
        err.push(field, message);
        err
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Messages recorded against `field`.
    pub fn messages_for<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.errors
            .iter()
            .filter(move |e| e.field == field)
            .map(|e| e.message.as_str())
    }

    /// `Ok(())` when nothing was recorded, `Err(self)` otherwise.
    pub fn into_result(self) -> Result<(), DataError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed")?;
        for (i, err) in self.errors.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            if err.field.is_empty() {
                write!(f, "{sep}{}", err.message)?;
            } else {
                write!(f, "{sep}{}: {}", err.field, err.message)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for DataError {}

impl From<serde_json::Error> for DataError {
    fn from(err: serde_json::Error) -> Self {
        DataError::field("", err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_names_eater_method_and_url() {
        let err = EaterError::Timeout {
            eater: "GetPersonApi".to_string(),
            method: HttpMethod::Get,
            url: "http://example.com/".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "GetPersonApi.get for URL 'http://example.com/' timed out."
        );
        assert!(err.is_timeout());
        assert!(!err.is_connect());
    }

    #[test]
    fn unexpected_carries_status_reason_and_url() {
        let err = EaterError::Unexpected {
            status: 404,
            reason: "Not Found".to_string(),
            url: "http://example.com/x".to_string(),
        };
        assert_eq!(err.status(), Some(404));
        assert!(err.to_string().contains("'404 Not Found'"));
        assert!(err.is_unexpected());
    }

    #[test]
    fn unexpected_response_is_unexpected() {
        let err = EaterError::UnexpectedResponse {
            url: "http://example.com/".to_string(),
            message: "not json".to_string(),
        };
        assert!(err.is_unexpected());
        assert_eq!(err.status(), None);
    }

    #[test]
    fn data_error_is_transparent() {
        let data = DataError::field("name", "String value is too short.");
        let err = EaterError::from(data.clone());
        assert!(err.is_data());
        assert_eq!(err.to_string(), data.to_string());
        assert_eq!(err.as_data(), Some(&data));
    }

    #[test]
    fn data_error_display_lists_fields() {
        let mut data = DataError::new();
        data.push("name", "too short");
        data.push("pk", "required");
        assert_eq!(data.to_string(), "validation failed: name: too short; pk: required");
        assert_eq!(data.messages_for("pk").collect::<Vec<_>>(), vec!["required"]);
    }

    #[test]
    fn empty_data_error_into_result_is_ok() {
        assert!(DataError::new().into_result().is_ok());
        assert!(DataError::field("a", "b").into_result().is_err());
    }
}
