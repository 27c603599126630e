// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod html;
pub mod llm;
pub mod logging;
pub mod server;
pub mod stages;
pub mod types;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::engine::{EngineSettings, Orchestrator};
use crate::llm::{HttpLlmClient, HttpLlmClientConfig, LlmClient};
use crate::stages::{StageSettings, Stages};

/// How long in-flight section calls may run on after Ctrl-C.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (file, environment, CLI override)
/// - the completion client and stage functions
/// - the orchestrator and HTTP router
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let mut cfg = load_and_validate(&config_path)?;

    if let Some(listen) = &args.listen {
        cfg.server.listen = listen.clone();
    }
    let listen: SocketAddr = cfg
        .server
        .listen
        .parse()
        .with_context(|| format!("invalid listen address {:?}", cfg.server.listen))?;

    if args.dry_run {
        print_dry_run(&cfg)?;
        return Ok(());
    }

    if cfg.llm.api_key.as_deref().is_none_or(str::is_empty) {
        anyhow::bail!("OPENAI_API_KEY is not set (or [llm].api_key is empty)");
    }

    let client: Arc<dyn LlmClient> =
        Arc::new(HttpLlmClient::new(HttpLlmClientConfig::from(&cfg.llm))?);
    let stages = Stages::new(client, StageSettings::from(&cfg));
    let orchestrator = Arc::new(Orchestrator::new(stages, EngineSettings::from(&cfg)));

    info!(
        model = %cfg.llm.model,
        max_parallel_sections = cfg.generation.max_parallel_sections,
        ttl_secs = cfg.jobs.ttl_secs,
        "contractgen starting"
    );

    let app = server::router(orchestrator.clone(), &cfg.server.cors_origins);

    // Ctrl-C cancels every job first: cancelled pipelines close their
    // channels, which ends attached streams and lets the server drain.
    let signalled = orchestrator.clone();
    let shutdown = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
        info!("shutdown requested");
        signalled.shutdown();
    };

    server::serve(listen, app, shutdown).await?;

    let aborted = orchestrator.drain(SHUTDOWN_GRACE).await;
    if aborted > 0 {
        warn!(aborted, "aborted pipelines still running after the shutdown grace");
    }
    Ok(())
}

/// Dry-run output: the effective configuration as TOML (secrets omitted).
fn print_dry_run(cfg: &ConfigFile) -> Result<()> {
    let rendered = toml::to_string_pretty(cfg).context("rendering effective config")?;
    println!("contractgen dry-run");
    println!();
    print!("{rendered}");
    debug!("dry-run complete (server not started)");
    Ok(())
}
