pub mod reuse_token_source;
pub mod service_account_token_source;

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use time::OffsetDateTime;

use crate::error::Error;
use crate::token::Token;

#[async_trait]
pub trait TokenSource: Send + Sync + Debug {
    async fn token(&self) -> Result<Token, Error>;
}

pub(crate) fn default_http_client(timeout: Duration) -> Result<reqwest::Client, Error> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

#[derive(Clone, Deserialize)]
pub(crate) struct InternalToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: Option<i64>,
}

impl InternalToken {
    pub(crate) fn to_token(&self, now: OffsetDateTime) -> Token {
        Token {
            access_token: self.access_token.clone(),
            token_type: self.token_type.clone(),
            expiry: self.expires_in.map(|s| now + time::Duration::seconds(s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_token_to_token() {
        let now = OffsetDateTime::now_utc();
        let internal: InternalToken =
            serde_json::from_str(r#"{"access_token":"abc","token_type":"Bearer","expires_in":3600}"#).unwrap();
        let token = internal.to_token(now);
        assert_eq!("abc", token.access_token);
        assert_eq!(Some(now + time::Duration::hours(1)), token.expiry);

        let internal: InternalToken = serde_json::from_str(r#"{"access_token":"abc","token_type":"Bearer"}"#).unwrap();
        assert!(internal.to_token(now).expiry.is_none());
    }
}
