//! Error types for the synthesis webhook.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use provisioner::SynthesisError;
use thiserror::Error;

/// Failures of a single webhook exchange.
///
/// Every variant is terminal for its request only; the server keeps serving.
/// The `Display` text is the response body, so callers see what went wrong.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Anything but `POST`.
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// The request body could not be read to the end or exceeded the limit.
    #[error("Can't read body")]
    ReadBody(#[source] axum::Error),

    /// The body is not a JSON hook request.
    #[error("Error decoding body: {0}")]
    Decode(#[source] serde_json::Error),

    /// The body decoded but carries no `object`.
    #[error("Missing required key \"object\"")]
    MissingObject,

    /// Synthesis failed for a Source this provisioner governs.
    #[error("Error reconciling source {source_name}: {source}")]
    Synthesis {
        source_name: String,
        #[source]
        source: SynthesisError,
    },

    /// The attachments could not be encoded. Never answered with `{}`.
    #[error("Error encoding response: {0}")]
    Encode(#[source] serde_json::Error),
}

impl WebhookError {
    /// Returns the HTTP status code for this error.
    ///
    /// - MethodNotAllowed: 405 Method Not Allowed
    /// - everything else: 500 Internal Server Error
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::ReadBody(_)
            | Self::Decode(_)
            | Self::MissingObject
            | Self::Synthesis { .. }
            | Self::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}
