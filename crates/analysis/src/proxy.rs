//! 代理 / VPN / Tor 启发式
//!
//! 判定顺序：
//! 1. 国家代码为 `T1` 视为 Tor 出口，不再做 ASN 分类
//! 2. 住宅运营商白名单命中时跳过 VPN 与机房检查
//! 3. VPN 关键字，首个命中生效
//! 4. 机房关键字，命中同时记为 VPN 与机房
//! 5. 转发类请求头独立记为“可能使用代理”

use crate::keywords::{self, KeywordList};
use serde::{Deserialize, Serialize};
use strum::Display;

/// Tor 出口节点的国家代码标记
pub const TOR_COUNTRY_CODE: &str = "T1";

/// 与代理相关的请求头
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForwardingHeaders {
    pub x_forwarded_for: Option<String>,
    pub x_real_ip: Option<String>,
    pub via: Option<String>,
}

impl ForwardingHeaders {
    fn present(value: &Option<String>) -> Option<&str> {
        value.as_deref().filter(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display)]
pub enum RiskLevel {
    #[serde(rename = "Very Low")]
    #[strum(serialize = "Very Low")]
    VeryLow,
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyHeuristicResult {
    pub is_proxy_likely: bool,
    pub is_tor: bool,
    #[serde(rename = "isVPN")]
    pub is_vpn: bool,
    pub is_datacenter: bool,
    #[serde(rename = "proxyIndicators")]
    pub indicators: Vec<String>,
    pub risk: RiskLevel,
}

/// 根据 ASN 组织名、国家代码与转发请求头评估代理可能性
pub fn evaluate_proxy(
    asn_org: &str,
    country: Option<&str>,
    headers: &ForwardingHeaders,
) -> ProxyHeuristicResult {
    let mut indicators = Vec::new();
    let mut is_tor = false;
    let mut is_vpn = false;
    let mut is_datacenter = false;

    if country == Some(TOR_COUNTRY_CODE) {
        is_tor = true;
        indicators.push(format!(
            "Tor exit node detected (via country code {TOR_COUNTRY_CODE})"
        ));
    } else {
        let org = asn_org.to_lowercase();
        let residential = matches(&org, keywords::RESIDENTIAL);

        if !residential {
            if matches(&org, keywords::VPN_PROVIDERS) {
                is_vpn = true;
                indicators.push(format!("VPN service detected: {asn_org}"));
            } else if matches(&org, keywords::DATACENTERS) {
                is_vpn = true;
                is_datacenter = true;
                indicators.push(format!("Datacenter/VPN IP detected: {asn_org}"));
            }
        }
    }

    let mut is_proxy_likely = false;
    if ForwardingHeaders::present(&headers.x_forwarded_for).is_some() {
        indicators.push("X-Forwarded-For header present".to_string());
        is_proxy_likely = true;
    }
    if ForwardingHeaders::present(&headers.x_real_ip).is_some() {
        indicators.push("X-Real-IP header present".to_string());
        is_proxy_likely = true;
    }
    if let Some(via) = ForwardingHeaders::present(&headers.via) {
        indicators.push(format!("Via header present: {via}"));
        is_proxy_likely = true;
    }

    is_proxy_likely |= is_tor || is_vpn || is_datacenter;

    let risk = if is_tor {
        RiskLevel::High
    } else if is_vpn || is_datacenter {
        RiskLevel::Medium
    } else if is_proxy_likely {
        RiskLevel::Low
    } else {
        RiskLevel::VeryLow
    };

    ProxyHeuristicResult {
        is_proxy_likely,
        is_tor,
        is_vpn,
        is_datacenter,
        indicators,
        risk,
    }
}

/// 解析器所属 ASN 是否为常见的公共 DNS 服务商
pub fn public_dns_provider(asn_org: &str) -> Option<&'static str> {
    keywords::first_match(&asn_org.to_lowercase(), keywords::PUBLIC_DNS_PROVIDERS)
}

fn matches(org: &str, list: KeywordList) -> bool {
    keywords::first_match(org, list).is_some()
}
