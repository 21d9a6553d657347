use async_trait::async_trait;
use panel_controller::collab::DevConfigSource;
use panel_controller::dev_config::{FetchResponse, DEV_CONFIG_PATH};
use panel_controller::location::PageLocation;
use panel_controller::ProbeError;
use reqwest::header::CACHE_CONTROL;
use std::time::Duration;
use tracing::trace;

/// Fetches `/dev-config.json` from the page origin over HTTP.
pub struct HttpDevConfigSource {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpDevConfigSource {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }
}

#[async_trait(?Send)]
impl DevConfigSource for HttpDevConfigSource {
    async fn fetch(&self, location: &PageLocation) -> Result<FetchResponse, ProbeError> {
        let url = location
            .join(DEV_CONFIG_PATH)
            .map_err(|err| ProbeError::Fetch(err.to_string()))?;
        trace!(url = %url, "fetching dev-config");

        let response = self
            .client
            .get(url)
            .header(CACHE_CONTROL, "no-store")
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| ProbeError::Fetch(err.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|err| ProbeError::Fetch(err.to_string()))?;
        Ok(FetchResponse { status, body })
    }
}
