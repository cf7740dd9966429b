//! Merge command - validate the sync MR and merge it

use crate::MergeArgs;
use crate::cli::CliProgress;
use crate::cli::context::CommandContext;
use crate::cli::style::{Stylize, check};
use anstream::println;
use submodule_sync::error::Result;
use submodule_sync::merge::{MergeOutcome, MergeParams, execute_merge};

/// Run the `merge-mr` command
pub async fn run_merge(args: MergeArgs) -> Result<()> {
    let mut ctx = CommandContext::new(args.common)?;
    ctx.config.merge_when_pipeline_succeeds = args.merge_when_pipeline_succeeds;

    let params = MergeParams {
        identity: ctx.identity.clone(),
        target_branch: ctx.target_branch.clone(),
        sha: args.sha.trim().to_string(),
        merge_when_pipeline_succeeds: ctx.config.merge_when_pipeline_succeeds,
    };

    match execute_merge(&ctx.platform, &params, &CliProgress).await? {
        MergeOutcome::Merged { iid, web_url } => {
            println!(
                "{} {} !{iid}: {}",
                check(),
                "Merged".success(),
                web_url.muted()
            );
        }
        MergeOutcome::Pending { iid, status } => {
            println!(
                "{} !{iid} accepted but not merged yet (pipeline: {status})",
                "…".warn()
            );
            println!("{}", "   Re-run to confirm the final state.".muted());
        }
    }

    Ok(())
}
