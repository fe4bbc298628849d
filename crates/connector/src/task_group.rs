//! Per-session task group.
//!
//! Every request of a session runs as one task in a [`TaskGroup`]. The group
//! owns a cancellation scope derived from the connector's shutdown token:
//! the first task that fails (or panics) cancels the scope, and every other
//! task of the group stops at its next await point.

use std::future::Future;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::instrument::WithSubscriber;

use crate::errors::DispatchError;

pub(crate) struct TaskGroup {
    tasks: JoinSet<Result<(), DispatchError>>,
    scope: CancellationToken,
}

impl TaskGroup {
    /// Creates an empty group whose scope is cancelled together with `parent`.
    pub(crate) fn new(parent: &CancellationToken) -> Self {
        Self {
            tasks: JoinSet::new(),
            scope: parent.child_token(),
        }
    }

    /// Scope shared by every task in the group.
    pub(crate) fn scope(&self) -> &CancellationToken {
        &self.scope
    }

    /// Spawns `task` into the group. A task that is still running when the
    /// scope is cancelled is dropped and counts as a success.
    pub(crate) fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = Result<(), DispatchError>> + Send + 'static,
    {
        let scope = self.scope.clone();
        self.tasks.spawn(
            async move {
                tokio::select! {
                    biased;
                    _ = scope.cancelled() => Ok(()),
                    result = task => result,
                }
            }
            .with_current_subscriber(),
        );
    }

    /// Waits for the next task to finish.
    ///
    /// Returns `None` when the group is empty. A failed task cancels the
    /// scope before its error is returned. Cancel safe.
    pub(crate) async fn join_next(&mut self) -> Option<Result<(), DispatchError>> {
        let joined = self.tasks.join_next().await?;
        let result = joined.map_err(DispatchError::Task).and_then(|result| result);
        if result.is_err() {
            self.scope.cancel();
        }
        Some(result)
    }

    /// Cancels the scope, then aborts and joins every remaining task.
    pub(crate) async fn shutdown(mut self) {
        self.scope.cancel();
        self.tasks.shutdown().await;
    }
}
