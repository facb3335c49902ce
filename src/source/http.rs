use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;

use super::TreeSource;
use crate::models::{TreePayload, VersionResponse};

const VERSION_PATH: &str = "/tree-version";
const TREE_PATH: &str = "/tree";
const SINGLE_LOOKUP_PATH: &str = "/imagenes-local";

/// Tree source backed by the dashboard HTTP endpoints
#[derive(Debug, Clone)]
pub struct HttpTreeSource {
    client: Client,
    base_url: String,
}

impl HttpTreeSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, base_url: base_url.trim_end_matches('/').to_string() })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = self.url(path);
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?
            .error_for_status()
            .with_context(|| format!("Request to {} returned an error status", url))?;

        response.json::<T>().await.with_context(|| format!("Invalid JSON from {}", url))
    }
}

#[async_trait]
impl TreeSource for HttpTreeSource {
    async fn fetch_version(&self) -> Result<String> {
        let response: VersionResponse = self.get_json(VERSION_PATH, &[]).await?;
        response.version.ok_or_else(|| anyhow!("Version endpoint returned no version"))
    }

    async fn fetch_tree(&self) -> Result<TreePayload> {
        self.get_json(TREE_PATH, &[]).await
    }

    async fn lookup_single(&self, key: &str) -> Result<Vec<String>> {
        let urls: Vec<String> = self.get_json(SINGLE_LOOKUP_PATH, &[("clave", key)]).await?;
        Ok(urls.into_iter().filter(|u| !u.trim().is_empty()).collect())
    }
}
