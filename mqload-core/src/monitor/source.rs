use serde_json::Value;
use std::time::Duration;

use crate::error::PollError;
use crate::http::{self, HttpClient};
use crate::publish::BoxFuture;

/// Where snapshots come from. Each call is one independent attempt.
pub trait MetricsSource: Send + Sync {
    fn fetch(&self, timeout: Duration) -> BoxFuture<'_, Result<Value, PollError>>;
}

/// GETs a JSON document from an `http://` endpoint.
#[derive(Debug, Clone)]
pub struct HttpMetricsSource {
    url: String,
    client: HttpClient,
}

impl HttpMetricsSource {
    pub fn new(url: impl Into<String>) -> Result<Self, PollError> {
        let url = url.into();
        http::validate_http_url(&url).map_err(|err| match err {
            http::Error::OnlyHttpSupported(u) => PollError::OnlyHttpSupported(u),
            _ => PollError::InvalidUrl(url.clone()),
        })?;

        Ok(Self {
            url,
            client: HttpClient::default(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl MetricsSource for HttpMetricsSource {
    fn fetch(&self, timeout: Duration) -> BoxFuture<'_, Result<Value, PollError>> {
        Box::pin(async move {
            let res = self
                .client
                .get(&self.url, Some(timeout))
                .await
                .map_err(|err| match err {
                    http::Error::Timeout(d) => PollError::Timeout(d),
                    other => PollError::Http(other),
                })?;

            if !res.is_success() {
                return Err(PollError::Status(res.status));
            }

            Ok(serde_json::from_slice(&res.body)?)
        })
    }
}
