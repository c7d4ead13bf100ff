//! assetsync entry point.
//!
//! Reads inputs the way a GitHub Actions step receives them, replaces the
//! triggering release's assets with the matched local files, and reports the
//! outcome as a workflow annotation and exit code.

mod workflow;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use assetsync_core::config::ActionConfig;
use assetsync_core::github::GitHubClient;
use assetsync_core::sync_engine::{self, RunOutcome};

// ---------------------------------------------------------------------------
// CLI arguments
// ---------------------------------------------------------------------------

/// Upload build artifacts to a GitHub release, replacing same-named assets.
#[derive(Parser, Debug)]
#[command(name = "assetsync", version, about)]
struct Args {
    /// Optional TOML configuration file; flags override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Glob patterns of files to upload, separated by `;`.
    #[arg(long, env = "INPUT_FILES")]
    files: Option<String>,

    /// Access token; falls back to the variable named by `github.token_env`.
    #[arg(long, env = "INPUT_REPO-TOKEN", hide_env_values = true)]
    repo_token: Option<String>,

    /// Repository in `owner/repo` format.
    #[arg(long, env = "GITHUB_REPOSITORY")]
    repo: Option<String>,

    /// GitHub API base URL.
    #[arg(long, env = "GITHUB_API_URL")]
    api_url: Option<String>,

    /// Path to the triggering event payload.
    #[arg(long, env = "GITHUB_EVENT_PATH")]
    event_path: Option<PathBuf>,

    /// Release action to act on instead of the payload's.
    #[arg(long)]
    action: Option<String>,

    /// Release id to act on instead of the payload's.
    #[arg(long)]
    release_id: Option<u64>,

    /// Directory the patterns are resolved against.
    #[arg(long, env = "GITHUB_WORKSPACE")]
    working_directory: Option<PathBuf>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => return fail(&e),
    };

    init_tracing(&args, &config);

    match run(config).await {
        Ok(RunOutcome::Skipped { action }) => {
            println!("{}", skip_line(&action));
            ExitCode::SUCCESS
        }
        Ok(RunOutcome::Synced(result)) => {
            let count = result.uploaded.len().to_string();
            let outputs = workflow::set_output("asset_count", &count).and_then(|()| {
                match result.last_download_url() {
                    Some(url) => workflow::set_output("browser_download_url", url),
                    None => Ok(()),
                }
            });
            if let Err(e) = outputs {
                warn!("failed to write step outputs: {}", e);
            }
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

async fn run(config: ActionConfig) -> Result<RunOutcome> {
    let ctx = config.run_context()?;
    info!("Repository    : {}", ctx.repo);
    info!("API URL       : {}", ctx.api_url);
    info!("Files         : {}", ctx.glob_spec);
    info!("Working dir   : {}", ctx.root.display());
    info!("Action        : {}", ctx.trigger.action);

    let client = GitHubClient::new(&ctx.api_url, &ctx.credential)?;
    Ok(sync_engine::run(&ctx, Arc::new(client)).await?)
}

/// Load the optional file, apply flag overrides, resolve the token, validate.
fn load_config(args: &Args) -> Result<ActionConfig> {
    let mut config = match &args.config {
        Some(path) => ActionConfig::load_from_file(path)?,
        None => ActionConfig::default(),
    };

    if let Some(files) = non_empty(&args.files) {
        config.assets.files = files;
    }
    if let Some(dir) = &args.working_directory {
        config.assets.working_directory = Some(dir.clone());
    }
    if let Some(repo) = non_empty(&args.repo) {
        config.github.repo = repo;
    }
    if let Some(api_url) = non_empty(&args.api_url) {
        config.github.api_url = api_url;
    }
    if let Some(token) = non_empty(&args.repo_token) {
        config.github.token = Some(token);
    }
    if let Some(path) = &args.event_path {
        config.event.path = Some(path.clone());
    }
    if let Some(action) = non_empty(&args.action) {
        config.event.action = Some(action);
    }
    if args.release_id.is_some() {
        config.event.release_id = args.release_id;
    }
    if let Some(level) = non_empty(&args.log_level) {
        config.log.level = level;
    }

    config.resolve_env_vars();
    config.validate()?;
    Ok(config)
}

fn init_tracing(args: &Args, config: &ActionConfig) {
    let runner_debug = std::env::var("RUNNER_DEBUG").is_ok_and(|v| v == "1");
    let level = match (&args.log_level, runner_debug) {
        (None, true) => "debug",
        _ => config.log.level.as_str(),
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn fail(err: &anyhow::Error) -> ExitCode {
    println!("{}", failure_line(err));
    ExitCode::FAILURE
}

/// Core error messages already embed their cause, so only the outermost one is shown.
fn failure_line(err: &anyhow::Error) -> String {
    workflow::command("error", &err.to_string())
}

fn skip_line(action: &str) -> String {
    workflow::command(
        "warning",
        &format!("Cannot upload assets for release.type: {}", action),
    )
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty()).map(String::from)
}
