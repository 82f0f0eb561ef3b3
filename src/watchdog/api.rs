use anyhow::Context as _;
use async_trait::async_trait;
use url::Url;

use crate::watchdog::model::{CrawlerJobStatus, TriggerResponse};

/// Client for the remote crawler service. The jobs themselves run outside
/// this process; this interface only starts them and observes their status.
#[async_trait]
pub trait CrawlerApi: Send + Sync {
    async fn trigger_job(&self, job_name: &str) -> anyhow::Result<TriggerResponse>;
    async fn fetch_job_statuses(&self) -> anyhow::Result<Vec<CrawlerJobStatus>>;
}

pub struct HttpCrawlerApi {
    client: reqwest::Client,
    base_url: Url,
    auth_token: Option<String>,
}

impl HttpCrawlerApi {
    pub fn new(mut base_url: Url, auth_token: Option<String>) -> Self {
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }
        Self {
            client: reqwest::Client::new(),
            base_url,
            auth_token,
        }
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

#[async_trait]
impl CrawlerApi for HttpCrawlerApi {
    async fn trigger_job(&self, job_name: &str) -> anyhow::Result<TriggerResponse> {
        let url = self
            .base_url
            .join(&format!("watchdog/{job_name}/run"))
            .context("build trigger url")?;
        let resp = self
            .authorized(self.client.post(url.clone()))
            .send()
            .await
            .with_context(|| format!("send trigger request: {url}"))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("trigger {job_name} failed ({status}): {body}");
        }
        resp.json().await.context("parse trigger response")
    }

    async fn fetch_job_statuses(&self) -> anyhow::Result<Vec<CrawlerJobStatus>> {
        let url = self
            .base_url
            .join("watchdog/status")
            .context("build status url")?;
        let resp = self
            .authorized(self.client.get(url.clone()))
            .send()
            .await
            .with_context(|| format!("fetch statuses: {url}"))?
            .error_for_status()
            .with_context(|| format!("fetch statuses: {url}"))?;
        resp.json().await.context("parse status response")
    }
}
