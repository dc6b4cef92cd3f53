//! k8sevents provisioner entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Parse flags**: port, template path, shutdown grace period, log format.
//! 2. **Wire observability**: install the `tracing` subscriber (JSON or text,
//!    plus the OTLP exporter when `OTEL_EXPORTER_OTLP_ENDPOINT` is set).
//! 3. **Load the service template**: exactly once, before the listener
//!    binds. A template that cannot be read or decoded stops the process.
//! 4. **Serve**: run the synthesis webhook until SIGINT/SIGTERM, then drain
//!    in-flight requests within the grace period.

mod args;
mod telemetry;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use provisioner::{Synthesizer, Template};
use tracing::{error, info};
use webhook::HookState;

use crate::args::CliArgs;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    let telemetry = telemetry::init(args.log_format)?;

    let result = run(&args).await;
    if let Err(e) = &result {
        error!(error = %format!("{e:#}"), "provisioner exited with error");
    }

    telemetry.shutdown();
    result
}

async fn run(args: &CliArgs) -> anyhow::Result<()> {
    let template = Template::load(&args.service_template)
        .context("cannot start without a valid service template")?;
    info!(path = %args.service_template.display(), "service template loaded");

    let synthesizer = Synthesizer::default();
    info!(provisioner = %synthesizer.identity(), "synthesizing for provisioner");

    let app = webhook::router(HookState::new(Arc::new(template), synthesizer));
    webhook::serve(&args.server_config(), app, webhook::shutdown_signal())
        .await
        .context("synthesis webhook failed")?;

    info!("shutdown complete");
    Ok(())
}
