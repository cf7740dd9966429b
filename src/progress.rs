//! Progress reporting for long-running operations

use crate::sync::ReconcileState;
use async_trait::async_trait;

/// Receives progress updates from the sync and merge engines
#[async_trait]
pub trait ProgressCallback: Send + Sync {
    /// Called each time the reconciler completes a state transition
    async fn on_state(&self, state: ReconcileState);

    /// Free-form status message
    async fn on_message(&self, message: &str);
}

/// Progress callback that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

#[async_trait]
impl ProgressCallback for NoopProgress {
    async fn on_state(&self, _state: ReconcileState) {}

    async fn on_message(&self, _message: &str) {}
}
