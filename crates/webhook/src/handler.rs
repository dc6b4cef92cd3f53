//! The synthesis webhook handler.
//!
//! One exchange: check the method, read the body, decode a [`HookRequest`],
//! synthesize, encode a [`HookResponse`]. The handler keeps no state between
//! requests; the template and synthesizer are shared read-only through
//! [`HookState`].

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Method};
use axum::response::{IntoResponse, Response};
use provisioner::{AttachmentSet, Source, Synthesis, Synthesizer, Template};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::WebhookError;

/// Largest request body the handler will read.
pub const MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

/// Body returned for Sources this provisioner does not govern.
const EMPTY_RESPONSE: &[u8] = b"{}";

/// Read-only dependencies shared by every request.
#[derive(Debug, Clone)]
pub struct HookState {
    template: Arc<Template>,
    synthesizer: Arc<Synthesizer>,
}

impl HookState {
    pub fn new(template: Arc<Template>, synthesizer: Synthesizer) -> Self {
        Self {
            template,
            synthesizer: Arc::new(synthesizer),
        }
    }
}

/// Inbound envelope: `{"object": <Source>}`.
#[derive(Debug, Default, Deserialize)]
pub struct HookRequest {
    #[serde(default)]
    pub object: Option<Source>,
}

/// Outbound envelope: `{"attachments": [<Service>, <Channel>]}`.
#[derive(Debug, Serialize)]
pub struct HookResponse<'a> {
    pub attachments: &'a AttachmentSet,
}

/// Handles `/` for every method; anything but `POST` is refused.
#[instrument(
    name = "synthesis_hook",
    skip_all,
    fields(request_id = %uuid::Uuid::new_v4(), method = %method)
)]
pub async fn handle_hook(
    State(state): State<HookState>,
    method: Method,
    body: Body,
) -> Result<Response, WebhookError> {
    if method != Method::POST {
        return Err(WebhookError::MethodNotAllowed);
    }

    let bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(WebhookError::ReadBody)?;
    let source = decode_request(&bytes)?;

    let synthesis = state
        .synthesizer
        .synthesize(&source, &state.template)
        .map_err(|source_err| WebhookError::Synthesis {
            source_name: source.name().to_string(),
            source: source_err,
        })?;

    let body = encode_response(synthesis)?;
    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}

/// Decodes a hook request body into the Source it carries.
pub fn decode_request(bytes: &[u8]) -> Result<Source, WebhookError> {
    let request: HookRequest = serde_json::from_slice(bytes).map_err(WebhookError::Decode)?;
    request.object.ok_or(WebhookError::MissingObject)
}

/// Encodes a synthesis outcome as the response body.
///
/// Skipped Sources answer `{}`. Provisioned Sources answer the attachment
/// envelope; an encoding failure is an error, never an empty body.
pub fn encode_response(synthesis: Synthesis) -> Result<Vec<u8>, WebhookError> {
    match synthesis {
        Synthesis::Provisioned(attachments) => {
            let body = serde_json::to_vec(&HookResponse {
                attachments: &attachments,
            })
            .map_err(WebhookError::Encode)?;
            info!(attachments = ?attachments.kinds(), "provisioned source");
            Ok(body)
        }
        Synthesis::Skipped(skip) => {
            info!(
                source = %skip.source,
                provisioner = skip.provisioner.as_ref().map_or("<none>", |p| p.as_str()),
                "ignoring source governed by another provisioner"
            );
            Ok(EMPTY_RESPONSE.to_vec())
        }
    }
}
