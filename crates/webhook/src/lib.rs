//! HTTP surface of the k8sevents provisioner.
//!
//! A single route, `/`, accepts `POST {"object": <Source>}` and answers with
//! the attachments synthesized for it:
//!
//! | Outcome | Status | Body |
//! |---------|--------|------|
//! | Source governed by `k8sevents` | 200 | `{"attachments":[<Service>,<Channel>]}` |
//! | Source governed by anything else | 200 | `{}` |
//! | Method other than `POST` | 405 | `Method not allowed` |
//! | Unreadable body, bad JSON, missing `object`, synthesis or encoding failure | 500 | error text |
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Transport, request decoding and the shutdown lifecycle
//! live here. Synthesis decisions belong to [`provisioner`].

pub mod error;
pub mod handler;
pub mod server;

pub use error::WebhookError;
pub use handler::{
    decode_request, encode_response, handle_hook, HookRequest, HookResponse, HookState,
    MAX_BODY_BYTES,
};
pub use server::{
    router, serve, serve_on, shutdown_signal, ServerConfig, ServerError, DEFAULT_PORT,
    DEFAULT_SHUTDOWN_GRACE_PERIOD,
};
