//! Cancellation of long waits such as report polling.
use std::future::Future;

use tokio_util::sync::CancellationToken as Inner;

/// Stops a wait started with [`crate::invoke`].
///
/// Clones share one state; cancelling any clone cancels all of them and
/// every token derived with [`CancellationToken::child_token`].
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Inner);

impl CancellationToken {
    pub fn new() -> Self {
        Self(Inner::new())
    }

    /// A token cancelled together with `self` that can also be cancelled alone.
    pub fn child_token(&self) -> Self {
        Self(self.0.child_token())
    }

    pub fn cancel(&self) {
        self.0.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.is_cancelled()
    }

    pub async fn cancelled(&self) {
        self.0.cancelled().await
    }

    /// Drives `action` to completion, or returns `None` once the token is
    /// cancelled. A token cancelled beforehand never polls `action`.
    pub async fn run<F: Future>(&self, action: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            _ = self.0.cancelled() => None,
            v = action => Some(v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_completes() {
        let token = CancellationToken::new();
        assert_eq!(Some(3), token.run(async { 3 }).await);
    }

    #[tokio::test]
    async fn test_child_cancelled_with_parent() {
        let parent = CancellationToken::new();
        let child = parent.child_token();
        let sibling = child.clone();
        child.cancel();
        assert!(sibling.is_cancelled());
        assert!(!parent.is_cancelled());

        let child = parent.child_token();
        parent.cancel();
        assert!(child.is_cancelled());
        assert_eq!(None, child.run(std::future::pending::<()>()).await);
    }
}
