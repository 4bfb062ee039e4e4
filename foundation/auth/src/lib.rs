//! # admanager-auth
//!
//! Service account authentication for the Google Ad Manager API.
//!
//! A [`Credential`] is created from a service account key and a list of scope
//! names. It validates its inputs immediately and exchanges a signed JWT for an
//! access token the first time one is requested.
//!
//! ```
//! use admanager_auth::{Credential, RefreshConfig};
//!
//! async fn run(key_json: String) -> Result<(), admanager_auth::error::Error> {
//!     let credential = Credential::new(key_json, &["DFP"], RefreshConfig::default())?;
//!     let token = credential.token().await?;
//!     Ok(())
//! }
//! ```
pub mod credential;
pub mod credentials;
pub mod error;
pub mod scope;
pub mod token;
pub mod token_source;

pub use credential::{Credential, RefreshConfig};
pub use credentials::{CredentialsFile, KeyMaterial};
pub use scope::Scope;
