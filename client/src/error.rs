//! Error types for the todo API client and its view-models.
//!
//! # Design
//! `ApiError` separates "no response arrived" (`Network`) from "a response
//! arrived with a non-2xx status" (`RequestFailed`). A 404 is not a separate
//! variant: it is a `RequestFailed` whose status callers can check with
//! `is_not_found`. `ValidationError` is raised before any request is built
//! and never reaches the API layer. View-models store failures as
//! `ViewError`, so every variant here is `Clone`.

use thiserror::Error;

/// Errors returned by `TodoClient` parse methods and `TodoApi` operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The request never produced a response (DNS, refused connection,
    /// timeout, broken transport).
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a status outside 2xx.
    #[error("API error: {status} {status_text}")]
    RequestFailed {
        status: u16,
        status_text: String,
        body: Option<String>,
    },

    /// A 2xx response body could not be decoded into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be encoded as JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl ApiError {
    /// HTTP status of a failed request, if a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::RequestFailed { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// Client-side input errors caught before a request is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter a todo name")]
    EmptyName,
}

/// The displayable failure a view-model keeps as `last_error`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl ViewError {
    /// The underlying API failure, if this is not a validation error.
    pub fn api(&self) -> Option<&ApiError> {
        match self {
            ViewError::Api(err) => Some(err),
            ViewError::Validation(_) => None,
        }
    }
}
