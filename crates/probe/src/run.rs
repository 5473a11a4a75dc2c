//! 一次完整的泄漏检测
//!
//! 第一阶段并发执行三路 IP 查询（各自带重试），第二阶段并发执行其余七项检测。
//! 单项失败只影响对应小节，不会中断整个运行。进度与新发现的 ICE 地址通过事件通道实时推送。

use crate::dns::{DnsProbe, DnsProbeResult};
use crate::edge_client::EdgeClient;
use crate::error::{ProbeError, Result};
use crate::host::HostFingerprint;
use crate::ports::{PortProbe, PortProbeResult};
use crate::retry::fetch_with_retry;
use crate::services::{IpLookup, IpServices};
use crate::timezone::{TimezoneReport, probe_timezone};
use crate::webrtc::{CandidateSource, IceProbe, WebRtcCandidateSource};
use analysis::{
    AddressObservation, AddressSource, Assessment, IceAddress, LeakVerdict, Status, analyze_dns,
    analyze_ports, analyze_webrtc, compare_ips, overall_status,
};
use chrono::{DateTime, SecondsFormat, Utc};
use edge::{DnsLeakResponse, ProxyDetectionResponse};
use leakscope_common::SerializationError;
use leakscope_common::config::{EdgeConfig, ProbeConfig};
use leakscope_common::metrics::{LEAKS_DETECTED, PROBE_FAILURES};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// 一次运行包含的检测项数
pub const TOTAL_TESTS: usize = 10;

/// 运行过程中的实时事件
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeEvent {
    /// 某项检测结束
    Progress {
        name: &'static str,
        completed: usize,
        total: usize,
    },
    /// WebRTC 首次发现某个地址
    IceAddress(IceAddress),
}

/// 检测结论汇总
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunAnalysis {
    /// 各来源观测到的地址，按来源顺序排列
    pub observations: Vec<AddressObservation>,
    pub overall: Assessment,
    pub ip_comparison: LeakVerdict,
    pub webrtc: Assessment,
    pub dns: Assessment,
    pub ports: Assessment,
}

/// 一次运行的全部结果，即导出的 JSON
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeakReport {
    pub run_id: Uuid,
    #[serde(rename = "cloudflare")]
    pub primary: Option<IpLookup>,
    #[serde(rename = "other")]
    pub secondary: Option<IpLookup>,
    pub ipv6: Option<IpLookup>,
    pub webrtc: Vec<IceAddress>,
    pub dns: Vec<DnsProbeResult>,
    pub fingerprint: HostFingerprint,
    pub timezone: Option<TimezoneReport>,
    pub ports: Vec<PortProbeResult>,
    #[serde(rename = "workerDNS")]
    pub edge_dns: Option<DnsLeakResponse>,
    #[serde(rename = "workerProxy")]
    pub edge_proxy: Option<ProxyDetectionResponse>,
    pub analysis: RunAnalysis,
    pub timestamp: String,
    #[serde(skip)]
    pub generated_at: DateTime<Utc>,
}

impl LeakReport {
    pub fn to_json(&self) -> std::result::Result<String, SerializationError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// `ip-leak-test-YYYY-MM-DD.json`
    pub fn export_file_name(&self) -> String {
        format!("ip-leak-test-{}.json", self.generated_at.format("%Y-%m-%d"))
    }

    /// 是否有任何一项判定为泄漏
    pub fn has_leak(&self) -> bool {
        self.analysis.webrtc.has_leak()
            || self.timezone.as_ref().is_some_and(|tz| tz.check.leak_detected)
            || self.edge_dns.as_ref().is_some_and(|dns| dns.leak_detected)
    }
}

/// 进度计数
struct Progress {
    completed: AtomicUsize,
    events: Option<mpsc::UnboundedSender<ProbeEvent>>,
}

impl Progress {
    fn finish(&self, name: &'static str) {
        let completed = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        info!("[{}/{}] {} finished", completed, TOTAL_TESTS, name);
        self.emit(ProbeEvent::Progress {
            name,
            completed,
            total: TOTAL_TESTS,
        });
    }

    fn emit(&self, event: ProbeEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}

/// 检测运行器
pub struct LeakTestRun<S: CandidateSource> {
    services: IpServices,
    ice: IceProbe<S>,
    dns: DnsProbe,
    ports: PortProbe,
    edge: EdgeClient,
    max_retries: u32,
    retry_delay: Duration,
    events: Option<mpsc::UnboundedSender<ProbeEvent>>,
}

impl LeakTestRun<WebRtcCandidateSource> {
    pub fn from_config(probe: &ProbeConfig, edge: &EdgeConfig) -> Result<Self> {
        let source = WebRtcCandidateSource::new(probe.webrtc.stun_servers.clone());
        Self::with_candidate_source(probe, edge, source)
    }
}

impl<S: CandidateSource> LeakTestRun<S> {
    pub fn with_candidate_source(probe: &ProbeConfig, edge: &EdgeConfig, source: S) -> Result<Self> {
        Ok(Self {
            services: IpServices::new(probe)?,
            ice: IceProbe::new(source, probe.webrtc.gathering_window()),
            dns: DnsProbe::new(&probe.dns)?,
            ports: PortProbe::new(&probe.ports),
            edge: EdgeClient::new(edge, probe.timeout())?,
            max_retries: probe.max_retries,
            retry_delay: probe.retry_delay(),
            events: None,
        })
    }

    /// 订阅实时事件，之后的每次运行都会推送
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<ProbeEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.events = Some(tx);
        rx
    }

    pub async fn run(&mut self) -> LeakReport {
        let run_id = Uuid::new_v4();
        info!("Starting leak test run {}", run_id);

        let progress = Progress {
            completed: AtomicUsize::new(0),
            events: self.events.clone(),
        };

        let Self {
            services,
            ice,
            dns,
            ports,
            edge,
            max_retries,
            retry_delay,
            ..
        } = self;
        let (max_retries, retry_delay) = (*max_retries, *retry_delay);
        let (services, dns, ports, edge) = (&*services, &*dns, &*ports, &*edge);

        // 第一阶段：三路 IP 查询
        let (primary, secondary, ipv6) = tokio::join!(
            async {
                let result =
                    fetch_with_retry(|| services.trace_lookup(), max_retries, retry_delay).await;
                progress.finish("primary IP lookup");
                result
            },
            async {
                let result =
                    fetch_with_retry(|| services.ipify_lookup(), max_retries, retry_delay).await;
                progress.finish("secondary IP lookup");
                result
            },
            async {
                let result =
                    fetch_with_retry(|| services.ipv6_lookup(), max_retries, retry_delay).await;
                progress.finish("IPv6 lookup");
                result
            },
        );

        let public_ip = primary.as_ref().map(|lookup| lookup.ip.clone());
        let country_code = primary
            .as_ref()
            .and_then(|lookup| lookup.country_code.clone())
            .or_else(|| secondary.as_ref().and_then(|l| l.country_code.clone()));

        // 第二阶段：其余检测
        let (webrtc, dns_results, fingerprint, timezone, port_results, edge_dns, edge_proxy) = tokio::join!(
            async {
                let result = ice
                    .gather(|address| progress.emit(ProbeEvent::IceAddress(address.clone())))
                    .await;
                progress.finish("WebRTC");
                result
            },
            async {
                let result = dns.run().await;
                progress.finish("DNS");
                result
            },
            async {
                let result = HostFingerprint::collect();
                progress.finish("fingerprint");
                result
            },
            async {
                let result = probe_timezone(country_code.as_deref());
                progress.finish("timezone");
                result
            },
            async {
                let result = ports.run().await;
                progress.finish("ports");
                result
            },
            async {
                let result = edge.dns_leak().await;
                progress.finish("edge DNS");
                result
            },
            async {
                let result = edge.proxy_detection().await;
                progress.finish("edge proxy");
                result
            },
        );

        let (webrtc, webrtc_analysis) = match webrtc {
            Ok(addresses) => {
                let assessment = analyze_webrtc(&addresses, public_ip.as_deref());
                (addresses, assessment)
            }
            Err(e) => {
                record_failure("webrtc", &e);
                (
                    Vec::new(),
                    Assessment::new(Status::Error, format!("WebRTC test failed: {e}")),
                )
            }
        };

        let timezone = timezone
            .map_err(|e| record_failure("timezone", &e))
            .ok();

        let resolved = dns_results.iter().filter(|r| r.resolved).count();
        let open_ports = port_results.iter().filter(|p| p.is_open()).count();

        let observations = [
            (AddressSource::ServiceA, primary.as_ref()),
            (AddressSource::ServiceB, secondary.as_ref()),
            (AddressSource::Ipv6Probe, ipv6.as_ref()),
        ]
        .into_iter()
        .filter_map(|(source, lookup)| lookup.map(|l| AddressObservation::new(&l.ip, source)))
        .chain(
            webrtc
                .iter()
                .map(|a| AddressObservation::new(&a.ip, AddressSource::WebRtc)),
        )
        .collect();

        let analysis = RunAnalysis {
            observations,
            overall: overall_status(
                primary.as_ref().map(|l| l.ip.as_str()),
                secondary.as_ref().map(|l| l.ip.as_str()),
                ipv6.as_ref().map(|l| l.ip.as_str()),
            ),
            ip_comparison: compare_ips(
                primary.as_ref().map(|l| l.ip.as_str()),
                secondary.as_ref().map(|l| l.ip.as_str()),
            ),
            webrtc: webrtc_analysis,
            dns: analyze_dns(resolved, dns_results.len()),
            ports: analyze_ports(open_ports),
        };

        let generated_at = Utc::now();
        let report = LeakReport {
            run_id,
            primary,
            secondary,
            ipv6,
            webrtc,
            dns: dns_results,
            fingerprint,
            timezone,
            ports: port_results,
            edge_dns,
            edge_proxy,
            analysis,
            timestamp: generated_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            generated_at,
        };

        record_leaks(&report);
        info!(
            "Leak test run {} finished: {}",
            run_id, report.analysis.overall.message
        );
        report
    }
}

fn record_failure(probe: &str, error: &ProbeError) {
    warn!("{} probe failed: {}", probe, error);
    PROBE_FAILURES
        .with_label_values(&[probe, error.kind()])
        .inc();
}

fn record_leaks(report: &LeakReport) {
    let mut sections = Vec::new();
    if report.analysis.webrtc.has_leak() {
        sections.push("webrtc");
    }
    if report.timezone.as_ref().is_some_and(|tz| tz.check.leak_detected) {
        sections.push("timezone");
    }
    if report.analysis.ip_comparison.status == Status::Warning {
        sections.push("ip_mismatch");
    }
    for section in sections {
        LEAKS_DETECTED.with_label_values(&[section]).inc();
    }
}
