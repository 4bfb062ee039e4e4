//! Report jobs: waiting for a server-side job and saving its payload.
use async_trait::async_trait;

pub use admanager_gax::Interrupted;

pub mod download;
pub mod poller;
pub mod service;

pub use download::{ReportDownloader, ReportResponse};
pub use poller::{PollerConfig, ReportJobPoller};
pub use service::{ExportFormat, ReportDownloadOptions, ReportJobStatus, ReportService, ServiceReportJob};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Waiting,
    Done,
}

/// A server-side job driven by [`ReportJobPoller`].
#[async_trait]
pub trait ReportJob: Send {
    type Output: Send;
    type Error: From<Interrupted> + Send;

    /// Submits the job. Jobs that are already running keep the default.
    async fn schedule(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn poll(&mut self) -> Result<JobStatus, Self::Error>;

    /// Fetches the payload. Only called once [`ReportJob::poll`] reported [`JobStatus::Done`].
    async fn fetch(&mut self) -> Result<Self::Output, Self::Error>;
}
