use anyhow::Context as _;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use url::Url;

/// A signed ledger movement; income is positive, expense negative.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub amount: f64,
    pub category: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Deadline {
    pub id: String,
    pub title: String,
    pub category: String,
    pub due_date: NaiveDate,
}

/// Point-in-time view of the domain data the alert rules read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub transactions: Vec<Transaction>,
    pub deadlines: Vec<Deadline>,
}

#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch_transactions(&self) -> anyhow::Result<Vec<Transaction>>;
    async fn fetch_deadlines(&self) -> anyhow::Result<Vec<Deadline>>;
}

pub async fn fetch_snapshot(source: &dyn SnapshotSource) -> anyhow::Result<Snapshot> {
    let transactions = source
        .fetch_transactions()
        .await
        .context("fetch transactions")?;
    let deadlines = source.fetch_deadlines().await.context("fetch deadlines")?;
    Ok(Snapshot {
        transactions,
        deadlines,
    })
}

/// Reads transactions and deadlines from the records service over JSON.
pub struct HttpSnapshotSource {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpSnapshotSource {
    pub fn new(mut base_url: Url) -> Self {
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> anyhow::Result<T> {
        let url = self
            .base_url
            .join(path)
            .with_context(|| format!("build url for: {path}"))?;
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("fetch {url}"))?
            .error_for_status()
            .with_context(|| format!("fetch {url}"))?;
        resp.json().await.context("parse response json")
    }
}

#[async_trait]
impl SnapshotSource for HttpSnapshotSource {
    async fn fetch_transactions(&self) -> anyhow::Result<Vec<Transaction>> {
        self.get_json("transactions").await
    }

    async fn fetch_deadlines(&self) -> anyhow::Result<Vec<Deadline>> {
        self.get_json("gov-deadlines").await
    }
}
