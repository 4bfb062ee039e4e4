use async_trait::async_trait;

use crate::error::Error;
use crate::token::Token;
use crate::token_source::TokenSource;

/// Caches the token of the wrapped source until it expires.
///
/// When a refresh fails the error is returned and the cached token is dropped,
/// so an expired token is never handed out again.
#[derive(Debug)]
pub struct ReuseTokenSource {
    target: Box<dyn TokenSource>,
    current_token: std::sync::RwLock<Option<Token>>,
    margin: time::Duration,
    guard: tokio::sync::Mutex<()>,
}

impl ReuseTokenSource {
    pub(crate) fn new(target: Box<dyn TokenSource>, margin: time::Duration) -> ReuseTokenSource {
        ReuseTokenSource {
            target,
            current_token: std::sync::RwLock::new(None),
            margin,
            guard: tokio::sync::Mutex::new(()),
        }
    }
}

#[async_trait]
impl TokenSource for ReuseTokenSource {
    async fn token(&self) -> Result<Token, Error> {
        if let Ok(token) = self.r_lock_token() {
            return Ok(token);
        }

        // Only single task can refresh token
        let _locking = self.guard.lock().await;

        if let Ok(token) = self.r_lock_token() {
            return Ok(token);
        }

        match self.target.token().await {
            Ok(token) => {
                tracing::debug!("token refresh success : expiry={:?}", token.expiry);
                *self.current_token.write()? = Some(token.clone());
                Ok(token)
            }
            Err(e) => {
                tracing::debug!("token refresh failed : {e}");
                *self.current_token.write()? = None;
                Err(e)
            }
        }
    }
}

impl ReuseTokenSource {
    fn r_lock_token(&self) -> Result<Token, Error> {
        let token = self.current_token.read()?;
        match token.as_ref() {
            Some(token) if token.valid_with_margin(self.margin) => Ok(token.clone()),
            _ => Err(Error::InvalidToken),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use time::OffsetDateTime;

    use super::*;

    #[derive(Debug)]
    struct CountingSource {
        calls: Arc<AtomicUsize>,
        lifetime: time::Duration,
        fail_after: usize,
    }

    #[async_trait]
    impl TokenSource for CountingSource {
        async fn token(&self) -> Result<Token, Error> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n > self.fail_after {
                return Err(Error::TokenErrorResponse {
                    status: 400,
                    error: "invalid_grant".to_string(),
                    error_description: None,
                });
            }
            Ok(Token {
                access_token: format!("token-{n}"),
                token_type: "Bearer".to_string(),
                expiry: Some(OffsetDateTime::now_utc() + self.lifetime),
            })
        }
    }

    #[tokio::test]
    async fn test_reuse_token() {
        let calls = Arc::new(AtomicUsize::new(0));
        let ts = ReuseTokenSource::new(
            Box::new(CountingSource {
                calls: calls.clone(),
                lifetime: time::Duration::hours(1),
                fail_after: usize::MAX,
            }),
            time::Duration::seconds(10),
        );
        assert_eq!("token-1", ts.token().await.unwrap().access_token);
        assert_eq!("token-1", ts.token().await.unwrap().access_token);
        assert_eq!(1, calls.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_refresh_expired_token() {
        let calls = Arc::new(AtomicUsize::new(0));
        let ts = ReuseTokenSource::new(
            Box::new(CountingSource {
                calls: calls.clone(),
                lifetime: time::Duration::seconds(5),
                fail_after: usize::MAX,
            }),
            time::Duration::seconds(10),
        );
        assert_eq!("token-1", ts.token().await.unwrap().access_token);
        assert_eq!("token-2", ts.token().await.unwrap().access_token);
    }

    #[tokio::test]
    async fn test_failed_refresh_never_returns_stale_token() {
        let calls = Arc::new(AtomicUsize::new(0));
        let ts = ReuseTokenSource::new(
            Box::new(CountingSource {
                calls: calls.clone(),
                lifetime: time::Duration::seconds(5),
                fail_after: 1,
            }),
            time::Duration::seconds(10),
        );
        assert_eq!("token-1", ts.token().await.unwrap().access_token);
        assert!(matches!(ts.token().await, Err(Error::TokenErrorResponse { .. })));
        assert!(ts.token().await.is_err());
    }
}
