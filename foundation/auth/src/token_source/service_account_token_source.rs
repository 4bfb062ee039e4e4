use std::fmt::Debug;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::Serialize;
use time::OffsetDateTime;

use crate::credential::RefreshConfig;
use crate::credentials::CredentialsFile;
use crate::error::{Error, TokenErrorResponse};
use crate::token::{Token, TOKEN_URL};
use crate::token_source::{default_http_client, InternalToken, TokenSource};

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Claim set of the signed assertion.
#[derive(Serialize)]
struct Assertion<'a> {
    iss: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sub: Option<&'a str>,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

/// Exchanges an RS256 assertion signed with the service account key for an
/// access token (JWT bearer grant).
pub struct OAuth2ServiceAccountTokenSource {
    client_email: String,
    key: EncodingKey,
    key_id: String,
    scope: String,
    token_url: String,
    subject: Option<String>,
    lifetime: time::Duration,
    http: reqwest::Client,
}

impl Debug for OAuth2ServiceAccountTokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuth2ServiceAccountTokenSource")
            .field("client_email", &self.client_email)
            .field("key_id", &self.key_id)
            .field("scope", &self.scope)
            .field("token_url", &self.token_url)
            .field("subject", &self.subject)
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

impl OAuth2ServiceAccountTokenSource {
    /// `scope` is the space separated scope list. The token URL is taken from
    /// `config`, then from the key file, then [`TOKEN_URL`].
    pub(crate) fn new(cred: &CredentialsFile, scope: &str, config: &RefreshConfig) -> Result<Self, Error> {
        let client_email = cred
            .client_email
            .clone()
            .filter(|email| !email.is_empty())
            .ok_or(Error::NoClientEmailFound)?;
        let token_url = config
            .token_url
            .clone()
            .or_else(|| cred.token_uri.clone())
            .unwrap_or_else(|| TOKEN_URL.to_string());
        Ok(Self {
            client_email,
            key: cred.try_to_private_key()?,
            key_id: cred.private_key_id.clone().unwrap_or_default(),
            scope: scope.to_string(),
            token_url,
            subject: config.subject.clone(),
            lifetime: time::Duration::try_from(config.token_lifetime).unwrap_or(time::Duration::HOUR),
            http: default_http_client(config.timeout)?,
        })
    }

    fn sign(&self, issued_at: OffsetDateTime) -> Result<String, Error> {
        let claims = Assertion {
            iss: &self.client_email,
            sub: self.subject.as_deref(),
            scope: &self.scope,
            aud: &self.token_url,
            iat: issued_at.unix_timestamp(),
            exp: (issued_at + self.lifetime).unix_timestamp(),
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.key_id.clone());
        Ok(jsonwebtoken::encode(&header, &claims, &self.key)?)
    }

    /// Prefers the OAuth error body of a rejected request over the bare status.
    async fn into_error(response: reqwest::Response) -> Error {
        let status = response.status();
        let fallback = response.error_for_status_ref().err();
        match (response.json::<TokenErrorResponse>().await, fallback) {
            (Ok(body), _) => Error::TokenErrorResponse {
                status: status.as_u16(),
                error: body.error,
                error_description: body.error_description,
            },
            (Err(_), Some(e)) | (Err(e), None) => Error::HttpError(e),
        }
    }
}

#[async_trait]
impl TokenSource for OAuth2ServiceAccountTokenSource {
    async fn token(&self) -> Result<Token, Error> {
        let issued_at = OffsetDateTime::now_utc();
        let assertion = self.sign(issued_at)?;

        tracing::trace!(token_url = %self.token_url, "requesting access token");
        let response = self
            .http
            .post(&self.token_url)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::into_error(response).await);
        }

        let token = response.json::<InternalToken>().await?.to_token(issued_at);
        if token.access_token.is_empty() {
            return Err(Error::EmptyToken);
        }
        Ok(token)
    }
}
