use admanager_gax::Interrupted;

use crate::soap;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Credential inputs were missing or invalid. Raised before any I/O.
    #[error("configuration error: {0}")]
    Configuration(#[source] admanager_auth::error::Error),

    /// The access token could not be obtained or refreshed.
    #[error("auth error: {0}")]
    Auth(#[source] admanager_auth::error::Error),

    /// Loading the service description or invoking a remote operation failed.
    #[error("invocation error: {0}")]
    Invocation(#[from] soap::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    /// Writing a report to disk failed.
    #[error("download error: {0}")]
    Download(#[source] std::io::Error),

    /// A report downloader was constructed without a response.
    #[error("report response is required")]
    NullResponse,

    #[error("report job {id} failed")]
    ReportFailed { id: String },

    #[error("unexpected response from {operation}: {message}")]
    UnexpectedResponse { operation: String, message: String },

    #[error("operation cancelled")]
    Cancelled,

    #[error("operation timed out after {0:?}")]
    TimedOut(std::time::Duration),

    /// Failure while the client was obtaining a service.
    #[error("client error: {0}")]
    Client(#[source] Box<Error>),
}

impl From<admanager_auth::error::Error> for Error {
    fn from(e: admanager_auth::error::Error) -> Self {
        if e.is_configuration() {
            Error::Configuration(e)
        } else {
            Error::Auth(e)
        }
    }
}

impl From<Interrupted> for Error {
    fn from(e: Interrupted) -> Self {
        match e {
            Interrupted::Cancelled => Error::Cancelled,
            Interrupted::TimedOut(d) => Error::TimedOut(d),
        }
    }
}
