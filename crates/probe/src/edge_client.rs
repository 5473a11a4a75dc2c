//! 边缘 API 客户端
//!
//! 从服务端视角补充两项检测：解析器归属与代理启发式。未配置边缘地址时跳过。

use crate::error::{ProbeError, Result};
use edge::{DNS_LEAK_PATH, DnsLeakResponse, PROXY_DETECTION_PATH, ProxyDetectionResponse};
use leakscope_common::config::EdgeConfig;
use leakscope_common::metrics::PROBE_FAILURES;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

pub struct EdgeClient {
    client: reqwest::Client,
    config: EdgeConfig,
}

impl EdgeClient {
    pub fn new(config: &EdgeConfig, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.config.is_enabled()
    }

    pub async fn dns_leak(&self) -> Option<DnsLeakResponse> {
        self.fetch("edge_dns", DNS_LEAK_PATH).await
    }

    pub async fn proxy_detection(&self) -> Option<ProxyDetectionResponse> {
        self.fetch("edge_proxy", PROXY_DETECTION_PATH).await
    }

    async fn fetch<T: DeserializeOwned>(&self, probe: &str, path: &str) -> Option<T> {
        let Some(url) = self.config.endpoint(path) else {
            debug!("Edge API not configured, skipping {}", path);
            return None;
        };

        match self.get_json(&url).await {
            Ok(body) => Some(body),
            Err(e) => {
                warn!("Edge request {} failed: {}", url, e);
                PROBE_FAILURES.with_label_values(&[probe, e.kind()]).inc();
                None
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::HttpStatus {
                service: "edge API".to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.json::<T>().await?)
    }
}
