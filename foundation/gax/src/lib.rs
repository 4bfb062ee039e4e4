use std::future::Future;
use std::time::Duration;

use crate::cancel::CancellationToken;

pub mod cancel;

/// Reasons an awaited action stopped before completing.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Interrupted {
    #[error("operation cancelled")]
    Cancelled,

    #[error("operation timed out after {0:?}")]
    TimedOut(Duration),
}

/// Runs `action` until it completes, `cancel` fires or `timeout` elapses.
///
/// Without a token and a timeout this is the same as awaiting `action`.
pub async fn invoke<S, E>(
    cancel: Option<CancellationToken>,
    timeout: Option<Duration>,
    action: impl Future<Output = Result<S, E>>,
) -> Result<S, E>
where
    E: From<Interrupted>,
{
    let bounded = async {
        match timeout {
            Some(limit) => match tokio::time::timeout(limit, action).await {
                Ok(v) => v,
                Err(_) => {
                    tracing::debug!("action timed out after {limit:?}");
                    Err(Interrupted::TimedOut(limit).into())
                }
            },
            None => action.await,
        }
    };
    match cancel {
        Some(cancel) => match cancel.run(bounded).await {
            Some(v) => v,
            None => {
                tracing::debug!("action cancelled");
                Err(Interrupted::Cancelled.into())
            }
        },
        None => bounded.await,
    }
}
