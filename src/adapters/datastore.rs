use crate::config::settings::SyncSettings;
use crate::domain::model::{Record, StopReason};
use crate::domain::ports::{PageResult, RecordSource};
use crate::utils::error::Result;
use reqwest::Client;
use serde::Deserialize;

/// `{ "result": { "records": [...] } }`
#[derive(Debug, Deserialize)]
struct SearchResponse {
    result: SearchResult,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    records: Vec<serde_json::Value>,
}

/// Client for a CKAN-style `datastore_search` endpoint.
pub struct DatastoreClient {
    client: Client,
    api_url: String,
    resource_id: Option<String>,
}

impl DatastoreClient {
    pub fn new(client: Client, api_url: String, resource_id: Option<String>) -> Self {
        Self {
            client,
            api_url,
            resource_id,
        }
    }

    pub fn from_settings(settings: &SyncSettings) -> Result<Self> {
        let client = super::http::build_client(settings.timeout, false)?;
        Ok(Self::new(
            client,
            settings.api_url.clone(),
            settings.resource_id.clone(),
        ))
    }
}

impl RecordSource for DatastoreClient {
    async fn fetch_page(&self, offset: usize, limit: usize) -> PageResult {
        let mut request = self
            .client
            .get(&self.api_url)
            .query(&[("limit", limit), ("offset", offset)]);

        if let Some(resource_id) = &self.resource_id {
            request = request.query(&[("resource_id", resource_id)]);
        }

        tracing::debug!(
            "Requesting {} (offset={}, limit={})",
            self.api_url,
            offset,
            limit
        );

        let response = request.send().await.map_err(|e| {
            tracing::warn!("❌ Datastore request failed at offset {}: {}", offset, e);
            StopReason::Transport(e.to_string())
        })?;

        let status = response.status();
        tracing::debug!("API response status: {}", status);
        if !status.is_success() {
            tracing::warn!(
                "❌ Datastore returned {} at offset {}",
                status.as_u16(),
                offset
            );
            return Err(StopReason::HttpStatus(status.as_u16()));
        }

        let body = response.text().await.map_err(|e| {
            tracing::warn!("❌ Failed to read datastore response body: {}", e);
            StopReason::Transport(e.to_string())
        })?;

        let parsed: SearchResponse = serde_json::from_str(&body).map_err(|e| {
            tracing::warn!("❌ Unexpected datastore response shape: {}", e);
            StopReason::MalformedBody(e.to_string())
        })?;

        // 非物件的列也要保留，分頁判斷依賴原始筆數
        let records: Vec<Record> = parsed.result.records.into_iter().map(Record::from).collect();
        let empty_rows = records.iter().filter(|record| record.is_empty()).count();
        if empty_rows > 0 {
            tracing::debug!("{} rows at offset {} carry no fields", empty_rows, offset);
        }

        Ok(records)
    }
}
