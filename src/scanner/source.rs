//! Opportunity source connectors.
//!
//! A connector only fetches raw records. Normalization, filtering and
//! scoring happen in the scanner.

use std::path::PathBuf;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::domain::RawOpportunity;
use crate::error::SourceError;

/// External feed of raw opportunity records.
#[async_trait]
pub trait SourceConnector: Send + Sync {
    /// Stable identifier, copied into every opportunity as `source_id`.
    fn name(&self) -> &str;

    /// Fetch the current batch. Zero records is a valid answer.
    async fn fetch(&self) -> Result<Vec<RawOpportunity>, SourceError>;
}

/// Decode each element on its own; one bad record never sinks the batch.
fn decode_records(source_id: &str, values: Vec<Value>) -> Vec<RawOpportunity> {
    values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(source = source_id, index, error = %e, "Dropping undecodable record");
                None
            }
        })
        .collect()
}

/// Fixed set of records, returned on every fetch.
pub struct StaticSource {
    name: String,
    records: Vec<RawOpportunity>,
}

impl StaticSource {
    pub fn new(name: impl Into<String>, records: Vec<RawOpportunity>) -> Self {
        Self {
            name: name.into(),
            records,
        }
    }
}

#[async_trait]
impl SourceConnector for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<RawOpportunity>, SourceError> {
        Ok(self.records.clone())
    }
}

/// JSON array of records on disk, re-read on every fetch.
pub struct FileSource {
    name: String,
    path: PathBuf,
}

impl FileSource {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

#[async_trait]
impl SourceConnector for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<RawOpportunity>, SourceError> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| SourceError::Unavailable {
                source_id: self.name.clone(),
                reason: format!("{}: {e}", self.path.display()),
            })?;
        let values: Vec<Value> = serde_json::from_str(&text).map_err(|e| SourceError::Malformed {
            source_id: self.name.clone(),
            reason: e.to_string(),
        })?;
        Ok(decode_records(&self.name, values))
    }
}

/// HTTP endpoint answering GET with a JSON array of records.
pub struct HttpSource {
    name: String,
    client: Client,
    url: Url,
}

impl HttpSource {
    pub fn new(name: impl Into<String>, url: Url) -> Self {
        Self {
            name: name.into(),
            client: Client::new(),
            url,
        }
    }

    fn unavailable(&self, reason: impl ToString) -> SourceError {
        SourceError::Unavailable {
            source_id: self.name.clone(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl SourceConnector for HttpSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<RawOpportunity>, SourceError> {
        debug!(source = %self.name, url = %self.url, "Fetching opportunities");

        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|e| self.unavailable(e))?
            .error_for_status()
            .map_err(|e| self.unavailable(e))?;

        let values = response
            .json::<Vec<Value>>()
            .await
            .map_err(|e| SourceError::Malformed {
                source_id: self.name.clone(),
                reason: e.to_string(),
            })?;
        Ok(decode_records(&self.name, values))
    }
}
