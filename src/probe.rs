use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::Client;
use tracing::debug;
use url::Url;

use crate::error::{HarnessError, HarnessResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status: u16,
    pub body: String,
}

pub trait RouteProbe: Send + Sync + 'static {
    fn get(&self, host: &str, path: &str, timeout: Duration) -> HarnessResult<ProbeResponse>;
}

pub type SharedRouteProbe = Arc<dyn RouteProbe>;

pub struct HttpRouteProbe {
    client: Client,
    scheme: &'static str,
}

impl HttpRouteProbe {
    pub fn new(use_http: bool, skip_ssl_validation: bool) -> HarnessResult<Self> {
        let client = Client::builder()
            .danger_accept_invalid_certs(skip_ssl_validation)
            .build()
            .map_err(|e| HarnessError::HttpClientInit(e.to_string()))?;
        Ok(Self {
            client,
            scheme: if use_http { "http" } else { "https" },
        })
    }

    pub fn url_for(&self, host: &str, path: &str) -> HarnessResult<Url> {
        let raw = format!("{}://{host}", self.scheme);
        let base = Url::parse(raw.as_str()).map_err(|e| HarnessError::RouteUnreachable {
            url: raw.clone(),
            message: e.to_string(),
        })?;
        base.join(path).map_err(|e| HarnessError::RouteUnreachable {
            url: format!("{raw}{path}"),
            message: e.to_string(),
        })
    }
}

impl RouteProbe for HttpRouteProbe {
    fn get(&self, host: &str, path: &str, timeout: Duration) -> HarnessResult<ProbeResponse> {
        let url = self.url_for(host, path)?;
        let unreachable = |message: String| HarnessError::RouteUnreachable {
            url: url.to_string(),
            message,
        };
        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .map_err(|e| unreachable(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| unreachable(format!("failed to read body: {e}")))?;
        debug!(url = %url, status, bytes = body.len(), "route probed");
        Ok(ProbeResponse { status, body })
    }
}
