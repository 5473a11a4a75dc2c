//! 边缘 API 响应结构
//!
//! 本地检测的边缘客户端复用同一套结构反序列化响应。

use analysis::ProxyHeuristicResult;
use serde::{Deserialize, Serialize};

pub const API_VERSION: &str = "1.0.0";
pub const API_MESSAGE: &str = "IP Leak Detection API";

pub const DNS_LEAK_PATH: &str = "/api/dns-leak";
pub const ADVANCED_IP_PATH: &str = "/api/advanced-ip";
pub const PROXY_DETECTION_PATH: &str = "/api/proxy-detection";

/// `GET /`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiIndex {
    pub status: String,
    pub message: String,
    pub version: String,
    pub endpoints: Vec<String>,
}

impl Default for ApiIndex {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            message: API_MESSAGE.to_string(),
            version: API_VERSION.to_string(),
            endpoints: [DNS_LEAK_PATH, ADVANCED_IP_PATH, PROXY_DETECTION_PATH]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// `GET /api/dns-leak`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsLeakResponse {
    #[serde(rename = "clientIP")]
    pub client_ip: String,
    pub as_organization: String,
    pub asn: String,
    pub timestamp: String,
    pub cloudflare_ray: String,
    pub country: String,
    pub city: String,
    pub colo: String,
    pub leak_detected: bool,
    pub leak_reason: Option<String>,
}

/// `GET /api/advanced-ip`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvancedIpResponse {
    pub ip: String,
    pub country: String,
    pub country_name: String,
    pub region: String,
    pub city: String,
    pub postal_code: String,
    pub timezone: String,
    pub latitude: String,
    pub longitude: String,
    pub asn: String,
    pub asn_org: String,
    pub colo: String,
    pub metro_code: String,
    pub continent: String,
    #[serde(rename = "isEU")]
    pub is_eu: String,
    pub timestamp: String,
    pub headers: HeaderSummary,
    pub ip_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderSummary {
    pub user_agent: String,
    pub accept_language: String,
    pub accept_encoding: String,
    pub referer: String,
    pub origin: String,
}

/// `GET /api/proxy-detection`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyDetectionResponse {
    pub ip: String,
    #[serde(flatten)]
    pub result: ProxyHeuristicResult,
    pub asn: String,
    pub asn_org: String,
    pub country: String,
    pub timestamp: String,
}
