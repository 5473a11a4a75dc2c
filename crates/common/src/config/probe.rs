//! 本地检测配置
//!
//! `leakscope check` 使用的外部服务地址、超时与重试参数

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 检测总体配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProbeConfig {
    /// 单个 HTTP 请求的超时时间（毫秒）
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// 每个 IP 查询最多尝试的次数（含首次）
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// 两次尝试之间的固定间隔（毫秒）
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    #[serde(default)]
    pub endpoints: EndpointConfig,

    #[serde(default)]
    pub webrtc: WebRtcProbeConfig,

    #[serde(default)]
    pub dns: DnsProbeConfig,

    #[serde(default)]
    pub ports: PortProbeConfig,
}

/// 第三方 IP 服务地址
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EndpointConfig {
    /// 返回 `key=value` 文本的 trace 端点
    #[serde(default = "default_trace_url")]
    pub trace_url: String,

    /// 返回 `{"ip": ...}` 的 IPv4 查询服务
    #[serde(default = "default_ipify_url")]
    pub ipify_url: String,

    /// 双栈查询服务，仅当返回 IPv6 地址时视为有效
    #[serde(default = "default_ipv6_url")]
    pub ipv6_url: String,

    /// 地理信息查询前缀，请求形如 `{details_url}{ip}/json/`
    #[serde(default = "default_details_url")]
    pub details_url: String,
}

/// WebRTC 候选采集配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WebRtcProbeConfig {
    #[serde(default = "default_stun_servers")]
    pub stun_servers: Vec<String>,

    /// 采集窗口（秒），到期后强制关闭连接
    #[serde(default = "default_gathering_secs")]
    pub gathering_secs: u64,
}

/// DNS 可达性配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DnsProbeConfig {
    #[serde(default = "default_test_domains")]
    pub test_domains: Vec<String>,

    #[serde(default = "default_dns_timeout_ms")]
    pub timeout_ms: u64,
}

/// 本地端口探测配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PortProbeConfig {
    #[serde(default = "default_port_host")]
    pub host: String,

    #[serde(default = "default_ports")]
    pub ports: Vec<u16>,

    #[serde(default = "default_port_timeout_ms")]
    pub timeout_ms: u64,

    /// 低于该耗时完成的连接视为端口可能开放
    #[serde(default = "default_open_threshold_ms")]
    pub open_threshold_ms: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            endpoints: EndpointConfig::default(),
            webrtc: WebRtcProbeConfig::default(),
            dns: DnsProbeConfig::default(),
            ports: PortProbeConfig::default(),
        }
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            trace_url: default_trace_url(),
            ipify_url: default_ipify_url(),
            ipv6_url: default_ipv6_url(),
            details_url: default_details_url(),
        }
    }
}

impl Default for WebRtcProbeConfig {
    fn default() -> Self {
        Self {
            stun_servers: default_stun_servers(),
            gathering_secs: default_gathering_secs(),
        }
    }
}

impl Default for DnsProbeConfig {
    fn default() -> Self {
        Self {
            test_domains: default_test_domains(),
            timeout_ms: default_dns_timeout_ms(),
        }
    }
}

impl Default for PortProbeConfig {
    fn default() -> Self {
        Self {
            host: default_port_host(),
            ports: default_ports(),
            timeout_ms: default_port_timeout_ms(),
            open_threshold_ms: default_open_threshold_ms(),
        }
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl WebRtcProbeConfig {
    pub fn gathering_window(&self) -> Duration {
        Duration::from_secs(self.gathering_secs)
    }
}

impl DnsProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl PortProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn open_threshold(&self) -> Duration {
        Duration::from_millis(self.open_threshold_ms)
    }
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_delay_ms() -> u64 {
    1_000
}

fn default_trace_url() -> String {
    "https://www.cloudflare.com/cdn-cgi/trace".to_string()
}

fn default_ipify_url() -> String {
    "https://api.ipify.org?format=json".to_string()
}

fn default_ipv6_url() -> String {
    "https://api64.ipify.org?format=json".to_string()
}

fn default_details_url() -> String {
    "https://ipapi.co/".to_string()
}

fn default_stun_servers() -> Vec<String> {
    vec![
        "stun:stun.l.google.com:19302".to_string(),
        "stun:stun1.l.google.com:19302".to_string(),
    ]
}

fn default_gathering_secs() -> u64 {
    5
}

fn default_test_domains() -> Vec<String> {
    ["google.com", "cloudflare.com", "github.com", "wikipedia.org"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_dns_timeout_ms() -> u64 {
    5_000
}

fn default_port_host() -> String {
    "127.0.0.1".to_string()
}

fn default_ports() -> Vec<u16> {
    vec![80, 443, 8080, 3000, 5000]
}

fn default_port_timeout_ms() -> u64 {
    1_000
}

fn default_open_threshold_ms() -> u64 {
    500
}
