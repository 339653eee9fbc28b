//! HTTP connection to a single hub

use axon_core::{AttrValue, AxonError, ErrorKind, HardwareId, HubCredentials};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, trace};

use crate::wire::{HubInfo, ModuleRecord, WriteRequest};

/// Default per-request timeout
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("hub unreachable: {0}")]
    Unreachable(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("function not found on hub: {0}")]
    NotFound(String),
    #[error("write rejected: {0}")]
    WriteRejected(String),
}

impl From<TransportError> for AxonError {
    fn from(err: TransportError) -> Self {
        let kind = match &err {
            TransportError::Timeout => ErrorKind::Timeout,
            TransportError::Unreachable(_) => ErrorKind::Offline,
            TransportError::MalformedResponse(_) => ErrorKind::MalformedResponse,
            // The hub no longer lists the function: it dropped offline
            TransportError::NotFound(_) => ErrorKind::Offline,
            TransportError::WriteRejected(_) => ErrorKind::WriteRejected,
        };
        AxonError::new(kind, err.to_string())
    }
}

/// One registered gateway endpoint.
///
/// Performs attribute reads, attribute writes, and directory listings
/// against a single hub base URL. Every request carries the timeout the
/// connection was built with; there are no implicit retries.
#[derive(Debug, Clone)]
pub struct HubConnection {
    base_url: String,
    credentials: Option<HubCredentials>,
    client: reqwest::Client,
}

impl HubConnection {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Unreachable(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials: None,
            client,
        })
    }

    pub fn with_credentials(mut self, credentials: HubCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let builder = self.client.get(url);
        match &self.credentials {
            Some(c) => builder.basic_auth(&c.user, Some(&c.password)),
            None => builder,
        }
    }

    /// Liveness probe; the hub answers with its own identity
    pub async fn probe(&self) -> Result<HubInfo, TransportError> {
        let url = format!("{}/api/info", self.base_url);
        trace!(url = %url, "Probing hub");

        let response = self.get(&url).send().await.map_err(map_send_error)?;
        if !response.status().is_success() {
            return Err(TransportError::Unreachable(format!(
                "probe returned {}",
                response.status()
            )));
        }

        response
            .json::<HubInfo>()
            .await
            .map_err(|e| TransportError::MalformedResponse(e.to_string()))
    }

    /// Fetch the full attribute set of one function.
    ///
    /// The protocol always returns every attribute together; callers cache
    /// the whole snapshot rather than single values.
    pub async fn fetch_attributes(
        &self,
        hardware_id: &HardwareId,
    ) -> Result<HashMap<String, AttrValue>, TransportError> {
        let url = format!("{}/api/functions/{}", self.base_url, hardware_id);
        trace!(url = %url, "Fetching function attributes");

        let response = self.get(&url).send().await.map_err(map_send_error)?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(TransportError::NotFound(hardware_id.to_string()));
        }
        if !response.status().is_success() {
            return Err(TransportError::Unreachable(format!(
                "attribute fetch returned {}",
                response.status()
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| TransportError::MalformedResponse(e.to_string()))?;

        let object = body.as_object().ok_or_else(|| {
            TransportError::MalformedResponse("attribute set is not a JSON object".to_string())
        })?;

        let mut attributes = HashMap::with_capacity(object.len());
        for (name, value) in object {
            if let Some(value) = AttrValue::from_json(value) {
                attributes.insert(name.clone(), value);
            }
        }

        debug!(
            function = %hardware_id,
            count = attributes.len(),
            "Fetched attribute snapshot"
        );
        Ok(attributes)
    }

    /// Write one attribute through to the hub.
    ///
    /// Safe to call without any prior read; no retry on failure.
    pub async fn write_attribute(
        &self,
        hardware_id: &HardwareId,
        name: &str,
        value: &AttrValue,
    ) -> Result<(), TransportError> {
        let url = format!("{}/api/functions/{}/{}", self.base_url, hardware_id, name);
        trace!(url = %url, value = %value, "Writing attribute");

        let builder = self.client.post(&url).json(&WriteRequest {
            value: value.to_json(),
        });
        let builder = match &self.credentials {
            Some(c) => builder.basic_auth(&c.user, Some(&c.password)),
            None => builder,
        };

        let response = builder.send().await.map_err(map_send_error)?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(TransportError::NotFound(hardware_id.to_string()));
        }
        if status.is_client_error() {
            return Err(TransportError::WriteRejected(format!(
                "{} {} = {} returned {}",
                hardware_id, name, value, status
            )));
        }
        if !status.is_success() {
            return Err(TransportError::Unreachable(format!(
                "attribute write returned {}",
                status
            )));
        }

        debug!(function = %hardware_id, attribute = name, "Wrote attribute");
        Ok(())
    }

    /// The hub's live module directory
    pub async fn list_modules(&self) -> Result<Vec<ModuleRecord>, TransportError> {
        let url = format!("{}/api/modules", self.base_url);
        trace!(url = %url, "Listing modules");

        let response = self.get(&url).send().await.map_err(map_send_error)?;
        if !response.status().is_success() {
            return Err(TransportError::Unreachable(format!(
                "module listing returned {}",
                response.status()
            )));
        }

        response
            .json::<Vec<ModuleRecord>>()
            .await
            .map_err(|e| TransportError::MalformedResponse(e.to_string()))
    }
}

fn map_send_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Unreachable(err.to_string())
    }
}
