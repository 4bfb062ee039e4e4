use std::env::VarError;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("key material is required")]
    KeyMaterialRequired,

    #[error("at least one scope is required")]
    ScopeRequired,

    #[error("unknown scope {0}")]
    UnknownScope(String),

    #[error("unsupported account {0}")]
    UnsupportedAccountType(String),

    #[error("Private Key is required")]
    NoPrivateKeyFound,

    #[error("client email is required")]
    NoClientEmailFound,

    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(#[source] serde_json::Error),

    #[error(transparent)]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    VarError(#[from] VarError),

    #[error("failed to read credentials: {0}")]
    CredentialsIOError(#[source] std::io::Error),

    #[error(transparent)]
    HttpError(#[from] reqwest::Error),

    #[error("token endpoint responded with status {status}: {error} {error_description:?}")]
    TokenErrorResponse {
        status: u16,
        error: String,
        error_description: Option<String>,
    },

    #[error("token endpoint returned an empty access token")]
    EmptyToken,

    #[error("invalid token")]
    InvalidToken,

    #[error("token lock poisoned")]
    LockPoisoned,
}

impl Error {
    /// Returns `true` when the error was raised while validating inputs,
    /// before any request reached the token endpoint.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::KeyMaterialRequired
                | Error::ScopeRequired
                | Error::UnknownScope(_)
                | Error::UnsupportedAccountType(_)
                | Error::NoPrivateKeyFound
                | Error::NoClientEmailFound
                | Error::InvalidKeyMaterial(_)
                | Error::JwtError(_)
                | Error::VarError(_)
                | Error::CredentialsIOError(_)
        )
    }
}

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        Error::LockPoisoned
    }
}

#[derive(serde::Deserialize, Debug)]
pub(crate) struct TokenErrorResponse {
    pub(crate) error: String,
    pub(crate) error_description: Option<String>,
}
