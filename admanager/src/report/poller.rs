use std::time::Duration;

use admanager_gax::cancel::CancellationToken;
use admanager_gax::invoke;

use crate::report::{JobStatus, ReportJob};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerConfig {
    /// Pause between two status checks.
    pub interval: Duration,
    /// Upper bound of the whole wait, schedule and fetch included.
    /// `None` waits as long as the job reports [`JobStatus::Waiting`].
    pub timeout: Option<Duration>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            timeout: None,
        }
    }
}

impl PollerConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReportJobPoller {
    config: PollerConfig,
}

impl ReportJobPoller {
    pub fn new(config: PollerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Schedules `job`, waits while it reports [`JobStatus::Waiting`] and
    /// returns what it fetches. Errors of the job are returned as they are.
    pub async fn get_response<J: ReportJob>(
        &self,
        job: &mut J,
        cancel: Option<CancellationToken>,
    ) -> Result<J::Output, J::Error> {
        let interval = self.config.interval;
        invoke(cancel, self.config.timeout, async move {
            job.schedule().await?;
            let mut checks: u64 = 1;
            while job.poll().await? == JobStatus::Waiting {
                tracing::trace!(checks, "report job still waiting");
                tokio::time::sleep(interval).await;
                checks += 1;
            }
            tracing::debug!(checks, "report job done");
            job.fetch().await
        })
        .await
    }
}
