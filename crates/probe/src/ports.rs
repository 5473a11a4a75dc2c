//! 本地端口探测

use futures::future::join_all;
use leakscope_common::config::probe::PortProbeConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use strum::Display;
use tokio::net::TcpStream;
use tokio::time::{Instant, timeout};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum PortStatus {
    #[serde(rename = "Potentially Open")]
    #[strum(serialize = "Potentially Open")]
    PotentiallyOpen,
    #[serde(rename = "Closed/Filtered")]
    #[strum(serialize = "Closed/Filtered")]
    ClosedFiltered,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortProbeResult {
    pub port: u16,
    pub status: PortStatus,
    /// 毫秒；超时为 None
    pub response_time: Option<u64>,
}

impl PortProbeResult {
    pub fn is_open(&self) -> bool {
        self.status == PortStatus::PotentiallyOpen
    }
}

pub struct PortProbe {
    host: String,
    ports: Vec<u16>,
    timeout: Duration,
    open_threshold: Duration,
}

impl PortProbe {
    pub fn new(config: &PortProbeConfig) -> Self {
        Self {
            host: config.host.clone(),
            ports: config.ports.clone(),
            timeout: config.timeout(),
            open_threshold: config.open_threshold(),
        }
    }

    pub async fn run(&self) -> Vec<PortProbeResult> {
        join_all(self.ports.iter().map(|&port| self.check(port))).await
    }

    /// 连接在阈值内成功视为可能开放；被拒绝、超时或过慢都算关闭/过滤
    async fn check(&self, port: u16) -> PortProbeResult {
        let start = Instant::now();
        let attempt = timeout(self.timeout, TcpStream::connect((self.host.as_str(), port))).await;
        let elapsed = start.elapsed();

        let (status, response_time) = match attempt {
            Ok(Ok(_stream)) if elapsed < self.open_threshold => {
                (PortStatus::PotentiallyOpen, Some(elapsed.as_millis() as u64))
            }
            Ok(_) => (PortStatus::ClosedFiltered, Some(elapsed.as_millis() as u64)),
            Err(_) => (PortStatus::ClosedFiltered, None),
        };
        debug!("{}:{} -> {} ({:?})", self.host, port, status, elapsed);

        PortProbeResult {
            port,
            status,
            response_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    fn probe_for(ports: Vec<u16>) -> PortProbe {
        PortProbe::new(&PortProbeConfig {
            host: "127.0.0.1".to_string(),
            ports,
            timeout_ms: 1_000,
            open_threshold_ms: 500,
        })
    }

    #[tokio::test]
    async fn test_listening_port_is_potentially_open() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let results = probe_for(vec![port]).run().await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].port, port);
        assert!(results[0].is_open());
        assert!(results[0].response_time.is_some());
    }

    #[tokio::test]
    async fn test_closed_port() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let results = probe_for(vec![port]).run().await;
        assert_eq!(results[0].status, PortStatus::ClosedFiltered);
        assert_eq!(
            serde_json::to_value(&results[0]).unwrap()["status"],
            "Closed/Filtered"
        );
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(PortStatus::PotentiallyOpen.to_string(), "Potentially Open");
        assert_eq!(PortStatus::ClosedFiltered.to_string(), "Closed/Filtered");
    }
}
