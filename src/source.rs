//! HTTP adapter for fetching jobs.

use crate::error::SourceError;
use crate::models::Job;
use crate::traits::JobSource;

#[derive(Debug, Clone)]
pub struct JobSourceConfig {
    /// Endpoint returning a JSON array of jobs.
    pub url: String,
    pub timeout_secs: u64,
}

impl Default for JobSourceConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8000/api/jobs".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpJobSource {
    config: JobSourceConfig,
    client: reqwest::blocking::Client,
}

impl HttpJobSource {
    pub fn new(config: JobSourceConfig) -> Result<Self, SourceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &JobSourceConfig {
        &self.config
    }
}

impl JobSource for HttpJobSource {
    fn fetch_jobs(&self) -> Result<Vec<Job>, SourceError> {
        let response = self.client.get(&self.config.url).send()?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(
                url = %self.config.url,
                status = status.as_u16(),
                "job source returned an error status"
            );
            return Err(SourceError::Status(status.as_u16()));
        }

        let jobs = response.json::<Vec<Job>>()?;
        tracing::debug!(url = %self.config.url, count = jobs.len(), "fetched jobs");
        Ok(jobs)
    }
}
