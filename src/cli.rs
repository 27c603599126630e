// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `contractgen`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "contractgen",
    version,
    about = "Serve LLM-orchestrated contract drafts over server-sent events.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// A missing file is not an error: built-in defaults plus environment
    /// overrides are used instead.
    #[arg(long, value_name = "PATH", default_value = "Contractgen.toml")]
    pub config: String,

    /// Address to listen on; overrides `[server].listen`.
    #[arg(long, value_name = "ADDR")]
    pub listen: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `CONTRACTGEN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Load + validate config, print it, but don't start the server.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
