use std::{future::Future, time::Duration};

use anyhow::{Context, Result};
use reqwest::{Client, Request, Url};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::{log_debug, log_warn, records::CapabilityToken, settings::InspectorSettings};

const ENABLE_LOGS: bool = true;

/// Body of `PUT /records/{id}`. Absent fields are left out of the JSON entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecordPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disposition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl RecordPatch {
    pub fn disposition(value: impl Into<String>) -> Self {
        Self {
            disposition: Some(value.into()),
            notes: None,
        }
    }

    pub fn notes(value: impl Into<String>) -> Self {
        Self {
            disposition: None,
            notes: Some(value.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SaveError {
    #[error("backend rejected the update with status {status}")]
    Rejected { status: u16 },
    #[error("backend did not answer in time")]
    Timeout,
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("could not encode the request: {0}")]
    Encode(String),
}

impl From<reqwest::Error> for SaveError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SaveError::Timeout
        } else if err.is_builder() {
            SaveError::Encode(err.to_string())
        } else {
            SaveError::Transport(err.to_string())
        }
    }
}

/// Write side of the backend contract. The surface never reads.
pub trait RecordWriter: Send + Sync + 'static {
    fn put_record(
        &self,
        record_id: &str,
        patch: &RecordPatch,
        token: &CapabilityToken,
    ) -> impl Future<Output = Result<Value, SaveError>> + Send;
}

#[derive(Debug, Clone)]
pub struct HttpRecordWriter {
    client: Client,
    base_url: Url,
}

impl HttpRecordWriter {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        let base_url =
            Url::parse(base_url).with_context(|| format!("Invalid API base URL {base_url}"))?;
        Ok(Self { client, base_url })
    }

    pub fn from_settings(settings: &InspectorSettings) -> Result<Self> {
        Self::new(&settings.api_base_url, settings.request_timeout())
    }

    /// `{base}/records/{id}` with the id percent-encoded as one path segment.
    pub fn record_url(&self, record_id: &str) -> Result<Url, SaveError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SaveError::Encode(format!("{} cannot take a path", self.base_url)))?
            .pop_if_empty()
            .push("records")
            .push(record_id);
        Ok(url)
    }

    pub fn build_request(
        &self,
        record_id: &str,
        patch: &RecordPatch,
        token: &CapabilityToken,
    ) -> Result<Request, SaveError> {
        let url = self.record_url(record_id)?;
        Ok(self
            .client
            .put(url)
            .bearer_auth(token.as_str())
            .json(patch)
            .build()?)
    }
}

impl RecordWriter for HttpRecordWriter {
    fn put_record(
        &self,
        record_id: &str,
        patch: &RecordPatch,
        token: &CapabilityToken,
    ) -> impl Future<Output = Result<Value, SaveError>> + Send {
        let request = self.build_request(record_id, patch, token);
        let client = self.client.clone();
        let record_id = record_id.to_string();

        async move {
            let request = request?;
            log_debug!("PUT {}", request.url());
            let response = client.execute(request).await?;
            let status = response.status();
            if !status.is_success() {
                log_warn!("Save for {record_id} rejected with {status}");
                return Err(SaveError::Rejected {
                    status: status.as_u16(),
                });
            }
            let body = response.bytes().await?;
            Ok(serde_json::from_slice(&body).unwrap_or(Value::Null))
        }
    }
}
