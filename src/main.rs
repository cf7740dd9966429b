//! submodule-sync CLI

mod cli;

use clap::{Args, Parser, Subcommand};
use cli::style::Stylize;
use std::path::PathBuf;
use std::process::ExitCode;
use submodule_sync::config::is_truthy;
use submodule_sync::types::DEFAULT_COMMIT_SALT;
use tracing_subscriber::EnvFilter;

/// Keep a GitLab submodule pointer in sync with an external branch
#[derive(Parser)]
#[command(name = "submodule-sync", version, about)]
struct Cli {
    /// More log output (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite the sync branch to pin the submodule and create or update its MR
    SyncBranch(SyncArgs),
    /// Validate the sync MR and merge it
    MergeMr(MergeArgs),
}

/// Arguments shared by both commands
#[derive(Args)]
struct CommonArgs {
    /// GitLab project id or `group/project` path
    #[arg(long)]
    project_id: String,

    /// Branch in the external repository
    #[arg(long)]
    branch: String,

    /// Branch the merge request targets
    #[arg(long)]
    target_branch: String,

    /// Logical submodule name (as in .gitmodules)
    #[arg(long)]
    submodule: String,

    /// GitLab API token
    #[arg(long, env = "GITLAB_TOKEN", hide_env_values = true)]
    gitlab_token: String,

    /// GitLab host URL
    #[arg(long, env = "GITLAB_URL")]
    gitlab_url: String,

    /// Token embedded in every commit this tool produces
    #[arg(long, env = "SUBMODULE_SYNC_SALT", default_value_t = DEFAULT_COMMIT_SALT.to_string())]
    salt: String,
}

#[derive(Args)]
struct SyncArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Commit to pin (defaults to the external branch head)
    #[arg(long)]
    sha: Option<String>,

    /// External pull request URL, linked from the MR description
    #[arg(long, env = "GITHUB_PR_URL")]
    pr_url: Option<String>,

    /// Base directory for ephemeral workspaces (defaults to the temp dir)
    #[arg(long, env = "SUBMODULE_SYNC_WORKDIR")]
    workdir: Option<PathBuf>,
}

#[derive(Args)]
struct MergeArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Commit the MR must pin the submodule to
    #[arg(long)]
    sha: String,

    /// Merge when the pipeline succeeds ("true" or "1", case-insensitive)
    #[arg(
        long,
        env = "MERGE_WHEN_PIPELINE_SUCCEEDS",
        value_name = "BOOL",
        default_value = "false",
        action = clap::ArgAction::Set,
        value_parser = parse_flag,
    )]
    merge_when_pipeline_succeeds: bool,
}

#[allow(clippy::unnecessary_wraps)]
fn parse_flag(value: &str) -> Result<bool, String> {
    Ok(is_truthy(value))
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Resolves when the process is asked to stop
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut term) = signal(SignalKind::terminate()) {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
            return;
        }
    }
    let _ = tokio::signal::ctrl_c().await;
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let parsed = Cli::parse();
    init_logging(parsed.verbose);

    let run = async move {
        match parsed.command {
            Commands::SyncBranch(args) => cli::sync::run_sync(args).await,
            Commands::MergeMr(args) => cli::merge::run_merge(args).await,
        }
    };

    // Dropping the losing branch drops the run, which removes its workspace
    // and kills any running git child.
    tokio::select! {
        result = run => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                anstream::eprintln!("{} {e}", "error:".error());
                ExitCode::FAILURE
            }
        },
        () = shutdown_signal() => {
            anstream::eprintln!("{}", "interrupted".warn());
            ExitCode::from(130)
        }
    }
}
