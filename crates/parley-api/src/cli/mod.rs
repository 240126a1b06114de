//! CLI command definitions for the `parley` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod characters;
pub mod config;

use clap::{Parser, Subcommand};
use parley_types::config::{HttpConfig, ServerConfig};

/// Real-time character conversation server.
#[derive(Parser)]
#[command(name = "parley", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true, env = "PARLEY_LOG_JSON")]
    pub log_json: bool,

    /// Export spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true, env = "PARLEY_OTEL")]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP/WebSocket server.
    Serve {
        /// Port to listen on (overrides config.toml).
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (overrides config.toml).
        #[arg(long)]
        host: Option<String>,
    },

    /// List characters found in the data directory.
    #[command(alias = "ls")]
    Characters,

    /// Print the effective configuration.
    Config,
}

impl Cli {
    /// Log filter derived from `-v` / `--quiet`; `RUST_LOG` still wins.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 if self.quiet => "error",
            0 => "warn",
            1 => "info,parley=debug",
            _ => "trace",
        }
    }
}

/// Apply `--host` / `--port` to the loaded config.
///
/// A `public_base_url` still pointing at the default bind address follows
/// the override, so speech URLs stay reachable.
pub fn apply_overrides(config: &mut ServerConfig, host: Option<String>, port: Option<u16>) {
    let defaults = HttpConfig::default();
    let follows_bind = config.server.public_base_url
        == format!("http://{}:{}", config.server.host, config.server.port)
        || config.server.public_base_url == defaults.public_base_url;

    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    if follows_bind {
        config.server.public_base_url =
            format!("http://{}:{}", config.server.host, config.server.port);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve_with_overrides() {
        let cli = Cli::try_parse_from(["parley", "-v", "serve", "--port", "9000"]).unwrap();
        assert_eq!(cli.log_filter(), "info,parley=debug");
        match cli.command {
            Commands::Serve { port, host } => {
                assert_eq!(port, Some(9000));
                assert!(host.is_none());
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_quiet_filter() {
        let cli = Cli::try_parse_from(["parley", "--quiet", "characters"]).unwrap();
        assert_eq!(cli.log_filter(), "error");
        assert!(matches!(cli.command, Commands::Characters));
    }

    #[test]
    fn test_overrides_move_default_public_url() {
        let mut config = ServerConfig::default();
        apply_overrides(&mut config, Some("0.0.0.0".to_string()), Some(8080));
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.public_base_url, "http://0.0.0.0:8080");
    }

    #[test]
    fn test_overrides_keep_custom_public_url() {
        let mut config = ServerConfig::default();
        config.server.public_base_url = "https://parley.example.com".to_string();
        apply_overrides(&mut config, None, Some(8080));
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.public_base_url, "https://parley.example.com");
    }
}
