//! DNS 可达性探测
//!
//! 对每个测试域名并发发起 `HEAD https://<domain>`，任意 HTTP 响应都算解析成功。

use crate::error::Result;
use chrono::{SecondsFormat, Utc};
use futures::future::join_all;
use leakscope_common::config::probe::DnsProbeConfig;
use leakscope_common::metrics::PROBE_FAILURES;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsProbeResult {
    pub domain: String,
    pub resolved: bool,
    /// 毫秒
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: String,
}

pub struct DnsProbe {
    client: reqwest::Client,
    domains: Vec<String>,
}

impl DnsProbe {
    pub fn new(config: &DnsProbeConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            client,
            domains: config.test_domains.clone(),
        })
    }

    /// 并发探测全部域名，结果顺序与配置一致
    pub async fn run(&self) -> Vec<DnsProbeResult> {
        join_all(self.domains.iter().map(|domain| self.check(domain))).await
    }

    async fn check(&self, domain: &str) -> DnsProbeResult {
        // 配置项可以直接写完整 URL
        let url = if domain.contains("://") {
            domain.to_string()
        } else {
            format!("https://{domain}")
        };

        let start = Instant::now();
        let outcome = self.client.head(&url).send().await;
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

        match outcome {
            Ok(response) => {
                let elapsed = start.elapsed().as_millis() as u64;
                debug!("{} answered {} in {}ms", domain, response.status(), elapsed);
                DnsProbeResult {
                    domain: domain.to_string(),
                    resolved: true,
                    response_time: Some(elapsed),
                    error: None,
                    timestamp,
                }
            }
            Err(e) => {
                warn!("{} is not reachable: {}", domain, e);
                let kind = if e.is_timeout() { "timeout" } else { "network" };
                PROBE_FAILURES.with_label_values(&["dns", kind]).inc();
                DnsProbeResult {
                    domain: domain.to_string(),
                    resolved: false,
                    response_time: None,
                    error: Some(e.to_string()),
                    timestamp,
                }
            }
        }
    }
}
