//! Command-line flags.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use provisioner::DEFAULT_TEMPLATE_PATH;
use webhook::{ServerConfig, DEFAULT_PORT};

/// Serves the k8sevents synthesis webhook.
#[derive(Parser, Debug)]
#[command(
    name = "k8sevents-provisioner",
    version,
    about = "Synthesizes a Service and Channel for every k8sevents Source"
)]
pub struct CliArgs {
    /// The port to listen on
    #[arg(long, value_name = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// A template for a Service spec (YAML or JSON)
    #[arg(long, value_name = "PATH", default_value = DEFAULT_TEMPLATE_PATH)]
    pub service_template: PathBuf,

    /// Seconds in-flight requests may keep running after SIGINT/SIGTERM
    #[arg(long, value_name = "SECONDS", default_value_t = 30)]
    pub shutdown_grace_period: u64,

    /// Log line format
    #[arg(long, value_enum, default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// One JSON object per line
    Json,
    /// Human-readable lines
    Text,
}

impl CliArgs {
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            port: self.port,
            shutdown_grace_period: Duration::from_secs(self.shutdown_grace_period),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = CliArgs::try_parse_from(["k8sevents-provisioner"]).unwrap();
        assert_eq!(args.port, 80);
        assert_eq!(args.service_template, PathBuf::from("/templates/service.yaml"));
        assert_eq!(args.log_format, LogFormat::Json);
        assert_eq!(args.server_config(), ServerConfig::default());
    }

    #[test]
    fn test_overrides() {
        let args = CliArgs::try_parse_from([
            "k8sevents-provisioner",
            "--port",
            "8080",
            "--service-template",
            "/tmp/service.json",
            "--shutdown-grace-period",
            "5",
            "--log-format",
            "text",
        ])
        .unwrap();

        assert_eq!(args.port, 8080);
        assert_eq!(args.service_template, PathBuf::from("/tmp/service.json"));
        assert_eq!(args.log_format, LogFormat::Text);
        assert_eq!(
            args.server_config().shutdown_grace_period,
            Duration::from_secs(5)
        );
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        assert!(CliArgs::try_parse_from(["k8sevents-provisioner", "--port", "70000"]).is_err());
    }
}
