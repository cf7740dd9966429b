//! Sync command - rewrite the sync branch and upsert its MR

use crate::SyncArgs;
use crate::cli::CliProgress;
use crate::cli::context::CommandContext;
use crate::cli::style::{Stylize, check};
use anstream::println;
use submodule_sync::error::Result;
use submodule_sync::repo::GitCli;
use submodule_sync::sync::{SyncRequest, UpsertOutcome, sync_branch};

/// Run the `sync-branch` command
pub async fn run_sync(args: SyncArgs) -> Result<()> {
    let mut ctx = CommandContext::new(args.common)?;
    ctx.config.pr_url = args.pr_url.filter(|url| !url.trim().is_empty());
    ctx.config.workdir = args.workdir;

    let request = SyncRequest {
        identity: ctx.identity.clone(),
        target_branch: ctx.target_branch.clone(),
        sha: args
            .sha
            .map(|sha| sha.trim().to_string())
            .filter(|sha| !sha.is_empty()),
    };

    anstream::eprintln!(
        "{} {} {} {}",
        "Syncing".emphasis(),
        request.identity.source_branch_name().accent(),
        "into".muted(),
        request.target_branch.accent()
    );

    let git = GitCli::new();
    let result = sync_branch(&git, &ctx.platform, &ctx.config, &request, &CliProgress).await?;

    let branch_note = if result.reconcile.created_branch {
        "created"
    } else {
        "rewritten"
    };
    println!(
        "{} Branch {} {} at {}",
        check(),
        result.reconcile.source_branch.accent(),
        branch_note.success(),
        result.reconcile.pointer.sha.accent()
    );

    let (verb, mr) = match &result.merge_request {
        UpsertOutcome::Created(mr) => ("Created", mr),
        UpsertOutcome::Updated(mr) => ("Updated", mr),
    };
    println!(
        "{} {} merge request !{}: {}",
        check(),
        verb.success(),
        mr.iid,
        mr.web_url.muted()
    );

    Ok(())
}
