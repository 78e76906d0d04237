//! Job listing retrieval and row normalization.

use std::{sync::Arc, time::Instant};

use async_trait::async_trait;
use metrics::{counter, histogram};
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::listings::{Cell, ExternalRow, JobRecord};

const POSITION: &str = "position";
const COMPANY: &str = "company";
const SUMMARY: &str = "summary";
const URL: &str = "url";

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("record store request failed: {0}")]
    Transport(String),
    #[error("record store responded with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("record store response was malformed: {0}")]
    Malformed(String),
}

impl UpstreamError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    pub fn malformed(err: impl std::fmt::Display) -> Self {
        Self::Malformed(err.to_string())
    }

    fn kind(&self) -> &'static str {
        match self {
            UpstreamError::Transport(_) => "transport",
            UpstreamError::Status { .. } => "status",
            UpstreamError::Malformed(_) => "malformed",
        }
    }
}

/// External collection of listing rows, queried once per request.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn query_rows(&self) -> Result<Vec<ExternalRow>, UpstreamError>;
}

#[derive(Clone)]
pub struct ListingService {
    store: Arc<dyn RecordStore>,
}

impl ListingService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Fetch every row of the configured collection, normalized and in store order.
    pub async fn fetch_all(&self) -> Result<Vec<JobRecord>, UpstreamError> {
        let started_at = Instant::now();
        let rows = match self.store.query_rows().await {
            Ok(rows) => rows,
            Err(err) => {
                counter!("jobdesk_listing_fetch_total", "result" => err.kind()).increment(1);
                warn!(
                    target = "application::listings",
                    op = "listings::fetch_all",
                    result = "error",
                    elapsed_ms = started_at.elapsed().as_millis() as u64,
                    error_code = err.kind(),
                    error = %err,
                    "Record store query failed"
                );
                return Err(err);
            }
        };

        let records: Vec<JobRecord> = rows.iter().map(normalize).collect();
        let elapsed_ms = started_at.elapsed().as_millis() as u64;
        counter!("jobdesk_listing_fetch_total", "result" => "ok").increment(1);
        histogram!("jobdesk_listing_fetch_ms").record(elapsed_ms as f64);
        info!(
            target = "application::listings",
            op = "listings::fetch_all",
            result = "ok",
            elapsed_ms,
            records = records.len(),
            "Job listings fetched"
        );

        Ok(records)
    }
}

/// Map one store row onto a [`JobRecord`].
///
/// `position` and `company` are short labels and keep only the first rich-text
/// fragment; `summary` is long-form and joins every fragment. Missing
/// properties and mismatched cell kinds yield empty strings.
pub fn normalize(row: &ExternalRow) -> JobRecord {
    JobRecord {
        position: first_fragment(row.cell(POSITION)),
        company: first_fragment(row.cell(COMPANY)),
        summary: joined_fragments(row.cell(SUMMARY)),
        url: url_value(row.cell(URL)),
    }
}

fn first_fragment(cell: Option<&Cell>) -> String {
    match cell {
        Some(Cell::RichText(fragments)) => fragments
            .first()
            .map(|fragment| fragment.plain_text.clone())
            .unwrap_or_default(),
        _ => String::new(),
    }
}

fn joined_fragments(cell: Option<&Cell>) -> String {
    match cell {
        Some(Cell::RichText(fragments)) => fragments
            .iter()
            .map(|fragment| fragment.plain_text.as_str())
            .collect(),
        _ => String::new(),
    }
}

fn url_value(cell: Option<&Cell>) -> String {
    match cell {
        Some(Cell::Url(Some(url))) => url.clone(),
        _ => String::new(),
    }
}
