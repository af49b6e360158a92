//! git-lineage - commit-history extraction with snapshot lineage
//!
//! # Usage
//! ```bash
//! git-lineage extract https://github.com/acme/widgets          # Records JSON on stdout
//! git-lineage extract <URL> --max-commits 50 --output out.json # Limited, written to a file
//! git-lineage serve --port 3001                                # POST /api/v1/ingest
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use git_lineage::config::{ExtractionConfig, DEFAULT_CONTEXT_LINES};
use git_lineage::ingest::ingest_into;
use git_lineage::routes::{self, AppState};

/// Extract commit history, diffs and file snapshots from git repositories
#[derive(Parser)]
#[command(name = "git-lineage")]
#[command(about = "Commit-history extraction with snapshot lineage", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clone a repository, extract every branch and print the records as JSON
    Extract {
        /// Repository URL or local path
        #[arg(value_name = "URL")]
        url: String,

        /// Clone into this (empty or missing) directory instead of a temp dir
        #[arg(long)]
        dest: Option<PathBuf>,

        /// Write JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        limits: LimitArgs,
    },
    /// Serve the ingest endpoint
    Serve {
        /// Port to run the server on
        #[arg(short, long, env = "GIT_LINEAGE_PORT", default_value = "3001")]
        port: u16,
    },
}

#[derive(Args)]
struct LimitArgs {
    /// Unchanged lines kept around each hunk
    #[arg(long, env = "GIT_LINEAGE_CONTEXT_LINES", default_value_t = DEFAULT_CONTEXT_LINES)]
    context_lines: u32,

    /// Clone depth and per-branch commit limit
    #[arg(long, env = "GIT_LINEAGE_MAX_COMMITS")]
    max_commits: Option<usize>,

    /// Report renames and copies instead of delete/add pairs
    #[arg(long, env = "GIT_LINEAGE_DETECT_RENAMES", value_parser = clap::builder::FalseyValueParser::new())]
    detect_renames: bool,
}

impl From<LimitArgs> for ExtractionConfig {
    fn from(args: LimitArgs) -> Self {
        Self {
            context_lines: args.context_lines,
            max_commits: args.max_commits,
            detect_renames: args.detect_renames,
        }
    }
}

/// Cancel `cancel` on Ctrl+C.
fn cancel_on_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping after the current commit");
            cancel.cancel();
        }
    });
}

async fn run_extract(
    url: String,
    dest: Option<PathBuf>,
    output: Option<PathBuf>,
    config: ExtractionConfig,
) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    let record = tokio::task::spawn_blocking(move || ingest_into(&url, dest.as_deref(), &config, &cancel)).await??;

    let json = serde_json::to_string_pretty(&record)?;
    match output {
        Some(path) => {
            tokio::fs::write(&path, json).await?;
            eprintln!("✓ Wrote {} commits to {}", record.commits.len(), path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

async fn run_serve(port: u16) -> anyhow::Result<()> {
    let state = AppState::default();
    let cancel = state.cancel.clone();

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = format!("127.0.0.1:{port}");
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("✗ Failed to bind to port {port}: {e}");
            eprintln!("  Try a different port with --port <PORT>");
            std::process::exit(1);
        }
    };

    println!();
    println!("  git-lineage");
    println!("  Server:  http://{addr}");
    println!("  Ingest:  POST http://{addr}/api/v1/ingest");
    println!();
    println!("  Press Ctrl+C to stop");
    println!();

    // Running ingests observe the token between commits
    let shutdown = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }
        println!("\n  Shutting down...");
        cancel.cancel();
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so extract output stays clean JSON
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Extract { url, dest, output, limits } => run_extract(url, dest, output, limits.into()).await,
        Commands::Serve { port } => run_serve(port).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract_config(args: &[&str]) -> ExtractionConfig {
        let mut argv = vec!["git-lineage", "extract", "https://github.com/acme/widgets"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Extract { limits, .. } => limits.into(),
            Commands::Serve { .. } => panic!("parsed as serve"),
        }
    }

    #[test]
    fn test_detect_renames_env_values() {
        // Only this test touches the variable.
        for (value, expected) in [("1", true), ("yes", true), ("on", true), ("true", true), ("0", false), ("off", false)] {
            unsafe { std::env::set_var("GIT_LINEAGE_DETECT_RENAMES", value) };
            assert_eq!(extract_config(&[]).detect_renames, expected, "{value}");
        }
        unsafe { std::env::remove_var("GIT_LINEAGE_DETECT_RENAMES") };

        assert!(extract_config(&["--detect-renames"]).detect_renames);
        assert!(!extract_config(&[]).detect_renames);
    }
}
