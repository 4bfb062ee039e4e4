use std::str::FromStr;

use admanager_gax::cancel::CancellationToken;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::Error;
use crate::gateway::{OperationSet, Service};
use crate::report::{JobStatus, ReportDownloader, ReportJob, ReportJobPoller, ReportResponse};
use crate::soap;

const RUN_REPORT_JOB: &str = "runReportJob";
const GET_REPORT_JOB_STATUS: &str = "getReportJobStatus";
const GET_REPORT_DOWNLOAD_URL_WITH_OPTIONS: &str = "getReportDownloadUrlWithOptions";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportJobStatus {
    InProgress,
    Completed,
    Failed,
}

impl FromStr for ReportJobStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IN_PROGRESS" => Ok(ReportJobStatus::InProgress),
            "COMPLETED" => Ok(ReportJobStatus::Completed),
            "FAILED" => Ok(ReportJobStatus::Failed),
            other => Err(Error::UnexpectedResponse {
                operation: GET_REPORT_JOB_STATUS.to_string(),
                message: format!("unknown report job status {other}"),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExportFormat {
    Tsv,
    TsvExcel,
    #[default]
    CsvDump,
    Xml,
    Xlsx,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDownloadOptions {
    pub export_format: ExportFormat,
    pub include_report_properties: bool,
    pub include_totals_row: bool,
    pub use_gzip_compression: bool,
}

impl Default for ReportDownloadOptions {
    fn default() -> Self {
        Self {
            export_format: ExportFormat::CsvDump,
            include_report_properties: false,
            include_totals_row: false,
            use_gzip_compression: true,
        }
    }
}

/// Typed operations of `ReportService`.
#[derive(Debug, Clone)]
pub struct ReportService {
    service: Service,
    http: reqwest::Client,
}

impl OperationSet for ReportService {
    const NAME: &'static str = "ReportService";

    fn from_service(service: Service) -> Self {
        Self {
            service,
            http: reqwest::Client::default(),
        }
    }
}

impl ReportService {
    /// Client used to fetch report payloads from their download URL.
    pub fn with_http(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn service(&self) -> &Service {
        &self.service
    }

    /// Starts a job for `query` and returns the created report job.
    pub async fn run_report_job(&self, query: Value) -> Result<Value, Error> {
        let body = json!({ "reportJob": { "reportQuery": query } });
        self.required(RUN_REPORT_JOB, body).await
    }

    pub async fn get_report_job_status(&self, id: &str) -> Result<ReportJobStatus, Error> {
        let status = self.required(GET_REPORT_JOB_STATUS, json!({ "reportJobId": id })).await?;
        match status.as_str() {
            Some(s) => s.parse(),
            None => Err(Error::UnexpectedResponse {
                operation: GET_REPORT_JOB_STATUS.to_string(),
                message: format!("expected a status string, got {status}"),
            }),
        }
    }

    pub async fn get_report_download_url_with_options(
        &self,
        id: &str,
        options: &ReportDownloadOptions,
    ) -> Result<String, Error> {
        let body = json!({ "reportJobId": id, "reportDownloadOptions": options });
        match self.required(GET_REPORT_DOWNLOAD_URL_WITH_OPTIONS, body).await? {
            Value::String(url) => Ok(url),
            other => Err(Error::UnexpectedResponse {
                operation: GET_REPORT_DOWNLOAD_URL_WITH_OPTIONS.to_string(),
                message: format!("expected a URL, got {other}"),
            }),
        }
    }

    /// Opens the payload behind a download URL.
    pub async fn download(&self, url: &str) -> Result<ReportResponse, Error> {
        let response = self.http.get(url).send().await.map_err(soap::Error::from)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(soap::Error::Status {
                status: status.as_u16(),
                body,
            }
            .into());
        }
        Ok(response.into())
    }

    /// A job that runs `query` once polled.
    pub fn job(&self, query: Value, options: ReportDownloadOptions) -> ServiceReportJob {
        ServiceReportJob {
            service: self.clone(),
            query: Some(query),
            options,
            id: None,
        }
    }

    /// A job that was started before, identified by `id`.
    pub fn existing_job(&self, id: impl Into<String>, options: ReportDownloadOptions) -> ServiceReportJob {
        ServiceReportJob {
            service: self.clone(),
            query: None,
            options,
            id: Some(id.into()),
        }
    }

    /// Runs `query`, waits for the job and returns a downloader for its payload.
    pub async fn report(
        &self,
        query: Value,
        options: ReportDownloadOptions,
        poller: &ReportJobPoller,
        cancel: Option<CancellationToken>,
    ) -> Result<ReportDownloader, Error> {
        let mut job = self.job(query, options);
        let response = poller.get_response(&mut job, cancel).await?;
        ReportDownloader::new(Some(response))
    }

    async fn required(&self, operation: &str, body: Value) -> Result<Value, Error> {
        self.service
            .invoke(operation, body)
            .await?
            .ok_or_else(|| Error::UnexpectedResponse {
                operation: operation.to_string(),
                message: "empty response".to_string(),
            })
    }
}

/// [`ReportJob`] backed by `ReportService`.
#[derive(Debug)]
pub struct ServiceReportJob {
    service: ReportService,
    query: Option<Value>,
    options: ReportDownloadOptions,
    id: Option<String>,
}

impl ServiceReportJob {
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn require_id(&self) -> Result<&str, Error> {
        self.id.as_deref().ok_or_else(|| Error::UnexpectedResponse {
            operation: RUN_REPORT_JOB.to_string(),
            message: "report job has not been scheduled".to_string(),
        })
    }
}

#[async_trait]
impl ReportJob for ServiceReportJob {
    type Output = ReportResponse;
    type Error = Error;

    async fn schedule(&mut self) -> Result<(), Self::Error> {
        let Some(query) = self.query.take() else {
            return Ok(());
        };
        let job = self.service.run_report_job(query).await?;
        let id = match job.get("id") {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => {
                return Err(Error::UnexpectedResponse {
                    operation: RUN_REPORT_JOB.to_string(),
                    message: format!("report job without id: {job}"),
                })
            }
        };
        tracing::debug!(id, "report job started");
        self.id = Some(id);
        Ok(())
    }

    async fn poll(&mut self) -> Result<JobStatus, Self::Error> {
        let id = self.require_id()?;
        match self.service.get_report_job_status(id).await? {
            ReportJobStatus::InProgress => Ok(JobStatus::Waiting),
            ReportJobStatus::Completed => Ok(JobStatus::Done),
            ReportJobStatus::Failed => Err(Error::ReportFailed { id: id.to_string() }),
        }
    }

    async fn fetch(&mut self) -> Result<Self::Output, Self::Error> {
        let id = self.require_id()?;
        let url = self.service.get_report_download_url_with_options(id, &self.options).await?;
        self.service.download(&url).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::gateway::tests::MockLoader;
    use crate::gateway::{GatewayConfig, ServiceGateway};
    use crate::report::PollerConfig;
    use crate::version::ServiceEndpoint;

    async fn report_service(responses: Vec<(&str, Option<&str>, Option<Value>)>) -> ReportService {
        let mut loader = MockLoader {
            methods: vec![
                RUN_REPORT_JOB.to_string(),
                GET_REPORT_JOB_STATUS.to_string(),
                GET_REPORT_DOWNLOAD_URL_WITH_OPTIONS.to_string(),
            ],
            responses: HashMap::new(),
            ..Default::default()
        };
        for (name, error, result) in responses {
            loader
                .responses
                .insert(name.to_string(), (error.map(String::from), result));
        }
        let config = GatewayConfig {
            version: "v202508".to_string(),
            network_code: "1".to_string(),
            token: "token".to_string(),
            application_name: "report-test".to_string(),
            service_name: ReportService::NAME.to_string(),
            endpoint: ServiceEndpoint::default(),
            location: None,
        };
        let service = ServiceGateway::new(config, Arc::new(loader))
            .create_client()
            .await
            .unwrap();
        ReportService::from_service(service)
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!(ReportJobStatus::InProgress, "IN_PROGRESS".parse().unwrap());
        assert_eq!(ReportJobStatus::Completed, "COMPLETED".parse().unwrap());
        assert_eq!(ReportJobStatus::Failed, "FAILED".parse().unwrap());
        assert!("completed".parse::<ReportJobStatus>().is_err());
    }

    #[test]
    fn test_download_options_wire_names() {
        let options = serde_json::to_value(ReportDownloadOptions::default()).unwrap();
        assert_eq!(
            json!({
                "exportFormat": "CSV_DUMP",
                "includeReportProperties": false,
                "includeTotalsRow": false,
                "useGzipCompression": true
            }),
            options
        );
    }

    #[tokio::test]
    async fn test_schedule_reads_numeric_id() {
        let service = report_service(vec![(RUN_REPORT_JOB, None, Some(json!({"rval": {"id": 42}})))]).await;
        let mut job = service.job(json!({}), ReportDownloadOptions::default());
        job.schedule().await.unwrap();
        assert_eq!(Some("42"), job.id());
    }

    #[tokio::test]
    async fn test_failed_job() {
        let service = report_service(vec![
            (RUN_REPORT_JOB, None, Some(json!({"rval": {"id": "7"}}))),
            (GET_REPORT_JOB_STATUS, None, Some(json!({"rval": "FAILED"}))),
        ])
        .await;
        let poller = ReportJobPoller::new(PollerConfig::default().with_interval(Duration::from_millis(1)));
        let result = service
            .report(json!({}), ReportDownloadOptions::default(), &poller, None)
            .await;
        assert!(matches!(result, Err(Error::ReportFailed { id }) if id == "7"));
    }

    #[tokio::test]
    async fn test_existing_job_skips_run() {
        let service = report_service(vec![(GET_REPORT_JOB_STATUS, Some("not found"), None)]).await;
        let mut job = service.existing_job("9", ReportDownloadOptions::default());
        job.schedule().await.unwrap();
        assert!(matches!(job.poll().await, Err(Error::Invocation(_))));
    }

    #[tokio::test]
    async fn test_poll_before_schedule() {
        let service = report_service(vec![]).await;
        let mut job = service.job(json!({}), ReportDownloadOptions::default());
        assert!(matches!(job.poll().await, Err(Error::UnexpectedResponse { .. })));
    }
}
