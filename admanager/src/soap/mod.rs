//! SOAP transport.
//!
//! Service descriptions are discovered at runtime, so a [`RemoteClient`]
//! exposes its operations by name and answers through a completion callback.
//! The gateway adapts those callbacks into futures.
use std::fmt::Debug;

use async_trait::async_trait;
use serde_json::Value;

pub mod client;
pub mod envelope;
pub mod repeated;
pub mod wsdl;

pub use client::{HttpWsdlLoader, SoapClient};
pub use envelope::{BearerSecurity, SoapHeader};
pub use wsdl::ServiceDescription;

/// Methods of a [`RemoteClient`] that configure the client instead of
/// invoking a remote operation.
pub const CONTROL_METHODS: [&str; 3] = ["addSoapHeader", "setSecurity", "setEndpoint"];

pub fn is_control_method(name: &str) -> bool {
    CONTROL_METHODS.contains(&name)
}

/// Completion callback of a remote call: `(error, result)`.
pub type Callback = Box<dyn FnOnce(Option<Error>, Option<Value>) + Send + 'static>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to load service description from {url}: {message}")]
    Description { url: String, message: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("SOAP fault {code}: {message}")]
    Fault {
        code: String,
        message: String,
        detail: Option<Value>,
    },

    #[error("malformed XML: {0}")]
    Xml(String),

    #[error("request body of {0} must be a JSON object")]
    InvalidBody(String),

    #[error("{0:?} is not a valid XML name")]
    InvalidName(String),

    #[error("unknown operation {0}")]
    UnknownOperation(String),

    #[error("bearer token must not be empty")]
    EmptyToken,

    #[error("remote client dropped the callback of {0}")]
    CallbackDropped(String),

    #[error("no async runtime available to run {0}")]
    NoRuntime(String),
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        Error::Xml(e.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        Error::Xml(e.to_string())
    }
}

/// A protocol client constructed from one service description.
pub trait RemoteClient: Send + Sync + Debug {
    /// Every method the client responds to, remote operations and
    /// [`CONTROL_METHODS`] alike.
    fn method_names(&self) -> Vec<String>;

    /// Adds a header block to every outgoing envelope.
    fn add_soap_header(&mut self, header: SoapHeader);

    /// Attaches bearer security to every outgoing request.
    fn set_security(&mut self, security: BearerSecurity);

    /// Overrides the address requests are posted to.
    fn set_endpoint(&mut self, endpoint: String);

    /// Invokes `operation` and reports the outcome through `callback`.
    fn call(&self, operation: &str, body: Value, callback: Callback);
}

/// Fetches a service description and builds a client from it.
#[async_trait]
pub trait WsdlLoader: Send + Sync + Debug {
    async fn load(&self, url: &str) -> Result<Box<dyn RemoteClient>, Error>;
}
