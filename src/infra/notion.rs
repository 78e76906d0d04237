//! Notion database client backing the job listing feed.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::{
    application::listings::{RecordStore, UpstreamError},
    config::NotionSettings,
    domain::listings::ExternalRow,
};

use super::error::InfraError;

const NOTION_VERSION_HEADER: &str = "Notion-Version";
const ERROR_BODY_PREVIEW_CHARS: usize = 512;

#[derive(Debug, Deserialize)]
struct QueryResponse {
    results: Vec<ExternalRow>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NotionClient {
    client: Client,
    query_url: Url,
    secret: String,
    api_version: String,
}

impl NotionClient {
    pub fn new(settings: &NotionSettings) -> Result<Self, InfraError> {
        let query_url = with_trailing_slash(&settings.api_base)
            .join(&format!("v1/databases/{}/query", settings.database_id))
            .map_err(|err| {
                InfraError::configuration(format!("invalid notion query url: {err}"))
            })?;
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(settings.timeout)
            .build()?;

        Ok(Self {
            client,
            query_url,
            secret: settings.secret.clone(),
            api_version: settings.api_version.clone(),
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("jobdesk/", env!("CARGO_PKG_VERSION"))
    }

    pub fn query_url(&self) -> &Url {
        &self.query_url
    }
}

/// `Url::join` replaces the last path segment unless the base ends in `/`.
fn with_trailing_slash(base: &Url) -> Url {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}

#[async_trait]
impl RecordStore for NotionClient {
    async fn query_rows(&self) -> Result<Vec<ExternalRow>, UpstreamError> {
        let response = self
            .client
            .post(self.query_url.clone())
            .bearer_auth(&self.secret)
            .header(NOTION_VERSION_HEADER, &self.api_version)
            .json(&json!({}))
            .send()
            .await
            .map_err(UpstreamError::transport)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(UpstreamError::transport)?;
        if !status.is_success() {
            let body = String::from_utf8_lossy(&bytes)
                .chars()
                .take(ERROR_BODY_PREVIEW_CHARS)
                .collect();
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let page: QueryResponse =
            serde_json::from_slice(&bytes).map_err(UpstreamError::malformed)?;

        if page.has_more {
            // Only the first page is served.
            warn!(
                target = "infra::notion",
                op = "notion::query_rows",
                rows = page.results.len(),
                next_cursor = page.next_cursor.as_deref().unwrap_or(""),
                "Notion database has more rows than one page; remaining rows are not listed"
            );
        }
        debug!(
            target = "infra::notion",
            op = "notion::query_rows",
            rows = page.results.len(),
            "Notion database queried"
        );

        Ok(page.results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn settings(api_base: &str) -> NotionSettings {
        NotionSettings {
            secret: "secret".into(),
            database_id: "0123abcd".into(),
            api_base: Url::parse(api_base).expect("url"),
            api_version: "2022-06-28".into(),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn query_url_targets_database() {
        let client = NotionClient::new(&settings("https://api.notion.com")).expect("client");
        assert_eq!(
            client.query_url().as_str(),
            "https://api.notion.com/v1/databases/0123abcd/query"
        );
    }

    #[test]
    fn query_url_keeps_base_path_without_trailing_slash() {
        let client = NotionClient::new(&settings("http://proxy.local/notion")).expect("client");
        assert_eq!(
            client.query_url().as_str(),
            "http://proxy.local/notion/v1/databases/0123abcd/query"
        );
    }

    #[test]
    fn query_url_keeps_base_path_with_trailing_slash() {
        let client =
            NotionClient::new(&settings("http://proxy.local/notion/")).expect("client");
        assert_eq!(
            client.query_url().as_str(),
            "http://proxy.local/notion/v1/databases/0123abcd/query"
        );
    }
}
