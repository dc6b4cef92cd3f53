//! Error and retry-policy types for the provisioner domain.
//!
//! [`TemplateError`] is fatal at startup: the process never serves without a
//! valid template. [`SynthesisError`] is per-request and terminal for that
//! request only.
//!
//! [`RetryPolicy`] is shared with the watch controller, whose reconcilers
//! report whether a failed reconciliation may be attempted again.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether a failure is safe to retry and, if so, after what delay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The operation may be retried.
    Retryable {
        /// Minimum back-off before the next attempt. `None` applies the
        /// caller's own back-off.
        after: Option<Duration>,
    },
    /// The operation must not be retried.
    NonRetryable,
}

// ---------------------------------------------------------------------------
// Template errors
// ---------------------------------------------------------------------------

/// Errors produced while loading the service template.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// The template file could not be opened or read.
    #[error("failed to read service template {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document is neither valid YAML nor valid JSON, or does not have
    /// the shape of a service spec.
    #[error("failed to decode service template: {0}")]
    Decode(String),

    /// The document nests deeper than the expansion guard allows.
    #[error("service template nests {depth} levels deep, limit is {limit}")]
    TooDeep {
        /// Nesting depth found in the decoded document.
        depth: usize,
        /// Configured maximum.
        limit: usize,
    },

    /// The template has no `runLatest` revision container, so there is no
    /// environment list to bind the channel address into.
    #[error("service template has no runLatest container")]
    MissingContainer,
}

// ---------------------------------------------------------------------------
// Synthesis errors
// ---------------------------------------------------------------------------

/// Errors produced while synthesizing attachments for a Source.
///
/// Templates accepted by [`crate::Template::load`] never trigger these; the
/// variants exist so malformed templates surface as request failures rather
/// than panics.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("template has no runLatest container to bind CHANNEL_ADDRESS into")]
    MissingContainer,
}
