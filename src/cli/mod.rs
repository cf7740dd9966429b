//! Command implementations and terminal output

pub mod context;
pub mod merge;
pub mod style;
pub mod sync;

use async_trait::async_trait;
use style::{Stylize, arrow, check};
use submodule_sync::progress::ProgressCallback;
use submodule_sync::sync::ReconcileState;

/// Prints engine progress to stderr, one line per step
#[derive(Debug, Clone, Copy, Default)]
pub struct CliProgress;

#[async_trait]
impl ProgressCallback for CliProgress {
    async fn on_state(&self, state: ReconcileState) {
        anstream::eprintln!("  {} {}", check(), state.muted());
    }

    async fn on_message(&self, message: &str) {
        anstream::eprintln!("{} {message}", arrow());
    }
}
