use std::sync::Arc;
use std::time::Duration;

use tokio::sync::OnceCell;

use crate::credentials::{CredentialsFile, KeyMaterial};
use crate::error::Error;
use crate::scope::Scope;
use crate::token::DEFAULT_REFRESH_MARGIN;
use crate::token_source::reuse_token_source::ReuseTokenSource;
use crate::token_source::service_account_token_source::OAuth2ServiceAccountTokenSource;
use crate::token_source::TokenSource;

pub(crate) const SERVICE_ACCOUNT_KEY: &str = "service_account";

/// Options handed to the token source as is.
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Lifetime requested for each signed assertion.
    pub token_lifetime: Duration,
    /// A cached token is refreshed this long before it expires.
    pub refresh_margin: Duration,
    /// Overrides the `token_uri` of the key.
    pub token_url: Option<String>,
    /// Account to impersonate with domain-wide delegation.
    pub subject: Option<String>,
    /// Timeout of each request to the token endpoint.
    pub timeout: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            token_lifetime: Duration::from_secs(3600),
            refresh_margin: Duration::from_secs(DEFAULT_REFRESH_MARGIN.whole_seconds() as u64),
            token_url: None,
            subject: None,
            timeout: Duration::from_secs(3),
        }
    }
}

impl RefreshConfig {
    pub fn with_token_lifetime(mut self, value: Duration) -> Self {
        self.token_lifetime = value;
        self
    }

    pub fn with_refresh_margin(mut self, value: Duration) -> Self {
        self.refresh_margin = value;
        self
    }

    pub fn with_token_url(mut self, value: impl Into<String>) -> Self {
        self.token_url = Some(value.into());
        self
    }

    pub fn with_subject(mut self, value: impl Into<String>) -> Self {
        self.subject = Some(value.into());
        self
    }

    pub fn with_timeout(mut self, value: Duration) -> Self {
        self.timeout = value;
        self
    }
}

/// Turns a service account key and a set of scopes into bearer tokens.
///
/// Inputs are validated by [`Credential::new`] without touching the network.
/// The OAuth client is constructed on first use and kept for the lifetime of
/// the credential; token caching is left to that client.
#[derive(Debug)]
pub struct Credential {
    key: Option<KeyMaterial>,
    scopes: Vec<Scope>,
    refresh: RefreshConfig,
    source: OnceCell<Arc<dyn TokenSource>>,
}

impl Credential {
    pub fn new<S: AsRef<str>>(
        key: impl Into<KeyMaterial>,
        scopes: &[S],
        refresh: RefreshConfig,
    ) -> Result<Self, Error> {
        let key = key.into();
        if key.is_empty() {
            return Err(Error::KeyMaterialRequired);
        }
        if scopes.is_empty() {
            return Err(Error::ScopeRequired);
        }
        let scopes = Scope::resolve_all(scopes)?;
        Ok(Self {
            key: Some(key),
            scopes,
            refresh,
            source: OnceCell::new(),
        })
    }

    /// Reads the key material from the environment.
    /// See [`CredentialsFile::new`].
    pub async fn from_env<S: AsRef<str>>(scopes: &[S], refresh: RefreshConfig) -> Result<Self, Error> {
        if scopes.is_empty() {
            return Err(Error::ScopeRequired);
        }
        let file = CredentialsFile::new().await?;
        Self::new(file, scopes, refresh)
    }

    /// Uses an existing token source instead of the key material.
    pub fn with_token_source<S: AsRef<str>>(source: Arc<dyn TokenSource>, scopes: &[S]) -> Result<Self, Error> {
        if scopes.is_empty() {
            return Err(Error::ScopeRequired);
        }
        let scopes = Scope::resolve_all(scopes)?;
        Ok(Self {
            key: None,
            scopes,
            refresh: RefreshConfig::default(),
            source: OnceCell::new_with(Some(source)),
        })
    }

    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    pub fn refresh_config(&self) -> &RefreshConfig {
        &self.refresh
    }

    /// Constructs the OAuth client bound to the scopes, parsing the key if
    /// it is still serialized. Subsequent calls return the same client.
    pub fn build(&self) -> Result<Arc<dyn TokenSource>, Error> {
        if let Some(source) = self.source.get() {
            return Ok(source.clone());
        }
        let source = self.create_source()?;
        // a concurrent build may have won the race; keep whichever was stored first.
        let _ = self.source.set(source.clone());
        Ok(self.source.get().cloned().unwrap_or(source))
    }

    /// Returns a valid access token, refreshing it when necessary.
    pub async fn token(&self) -> Result<String, Error> {
        let source = self.build()?;
        let token = source.token().await?;
        if token.access_token.is_empty() {
            return Err(Error::EmptyToken);
        }
        Ok(token.access_token)
    }

    fn create_source(&self) -> Result<Arc<dyn TokenSource>, Error> {
        let file = self.key.as_ref().ok_or(Error::KeyMaterialRequired)?.parse()?;
        if file.tp != SERVICE_ACCOUNT_KEY {
            return Err(Error::UnsupportedAccountType(file.tp));
        }
        let inner = OAuth2ServiceAccountTokenSource::new(&file, &Scope::join(&self.scopes, " "), &self.refresh)?;
        let margin = time::Duration::try_from(self.refresh.refresh_margin).unwrap_or(DEFAULT_REFRESH_MARGIN);
        tracing::debug!(scopes = %Scope::join(&self.scopes, ","), "service account token source created");
        Ok(Arc::new(ReuseTokenSource::new(Box::new(inner), margin)))
    }
}
