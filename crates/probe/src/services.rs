//! 第三方 IP 服务查询
//!
//! 三条独立路径观测公网地址：
//!
//! - trace 端点：`key=value` 文本，取 `ip`/`loc`/`colo`，再用详情服务补全
//! - IPv4 查询服务：`{"ip": ...}`，详情查询失败时整体视为失败
//! - 双栈查询服务：只有返回 IPv6 地址时才有效
//!
//! 所有请求受配置的超时约束，失败只记录日志并返回 `None`。

use crate::error::{ProbeError, Result};
use leakscope_common::config::probe::{EndpointConfig, ProbeConfig};
use leakscope_common::metrics::PROBE_FAILURES;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// 一次地理信息查询的结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpLookup {
    pub ip: String,
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub city: Option<String>,
    pub isp: Option<String>,
    pub region: Option<String>,
    pub timezone: Option<String>,
    pub postal: Option<String>,
    /// "纬度, 经度"
    pub coords: Option<String>,
    pub asn: Option<String>,
}

/// 详情服务的响应，只取用到的字段
#[derive(Debug, Default, Deserialize)]
struct IpDetails {
    ip: Option<String>,
    country_name: Option<String>,
    country_code: Option<String>,
    city: Option<String>,
    org: Option<String>,
    region: Option<String>,
    timezone: Option<String>,
    postal: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    asn: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IpAnswer {
    ip: String,
}

impl IpDetails {
    fn into_lookup(self, fallback_ip: &str) -> IpLookup {
        let coords = match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(format!("{lat}, {lon}")),
            _ => None,
        };
        IpLookup {
            ip: self.ip.unwrap_or_else(|| fallback_ip.to_string()),
            country: self.country_name,
            country_code: self.country_code,
            city: self.city,
            isp: self.org,
            region: self.region,
            timezone: self.timezone,
            postal: self.postal,
            coords,
            asn: self.asn,
        }
    }
}

/// 解析 trace 端点的 `key=value` 文本，每行恰好一个 `=` 才被接受
pub fn parse_trace(text: &str) -> HashMap<String, String> {
    text.lines()
        .filter_map(|line| {
            let mut parts = line.split('=');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(key), Some(value), None) => {
                    Some((key.trim().to_string(), value.trim().to_string()))
                }
                _ => None,
            }
        })
        .collect()
}

/// IP 服务客户端
#[derive(Debug, Clone)]
pub struct IpServices {
    client: reqwest::Client,
    endpoints: EndpointConfig,
}

impl IpServices {
    pub fn new(config: &ProbeConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("leakscope/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            endpoints: config.endpoints.clone(),
        })
    }

    /// 主来源：trace 端点
    pub async fn trace_lookup(&self) -> Option<IpLookup> {
        record("trace", self.try_trace_lookup().await)
    }

    /// 备用来源：IPv4 查询服务 + 详情
    pub async fn ipify_lookup(&self) -> Option<IpLookup> {
        record("ipify", self.try_ipify_lookup().await)
    }

    /// IPv6 路径
    pub async fn ipv6_lookup(&self) -> Option<IpLookup> {
        record("ipv6", self.try_ipv6_lookup().await)
    }

    /// 详情查询：`GET {details_url}{ip}/json/`
    pub async fn details(&self, ip: &str) -> Option<IpLookup> {
        match self.fetch_details(ip).await {
            Ok(details) => Some(details.into_lookup(ip)),
            Err(e) => {
                warn!("IP details lookup for {} failed: {}", ip, e);
                None
            }
        }
    }

    async fn try_trace_lookup(&self) -> Result<IpLookup> {
        let response = self.client.get(&self.endpoints.trace_url).send().await?;
        let response = ensure_success("trace endpoint", response)?;
        let trace = parse_trace(&response.text().await?);

        let ip = trace
            .get("ip")
            .cloned()
            .ok_or_else(|| ProbeError::parse("trace response has no ip field"))?;
        let loc = trace.get("loc").cloned();
        let colo = trace.get("colo").cloned();
        debug!("Trace endpoint reports ip={} loc={:?} colo={:?}", ip, loc, colo);

        let lookup = match self.details(&ip).await {
            Some(mut lookup) => {
                lookup.country_code = lookup.country_code.or_else(|| loc.clone());
                lookup.city = lookup.city.or(colo);
                lookup
            }
            None => IpLookup {
                ip,
                country: loc.clone(),
                country_code: loc,
                city: colo,
                ..Default::default()
            },
        };
        Ok(lookup)
    }

    async fn try_ipify_lookup(&self) -> Result<IpLookup> {
        let answer = self.fetch_ip(&self.endpoints.ipify_url, "IPv4 lookup").await?;
        let details = self.fetch_details(&answer.ip).await?;
        Ok(details.into_lookup(&answer.ip))
    }

    async fn try_ipv6_lookup(&self) -> Result<IpLookup> {
        let answer = self.fetch_ip(&self.endpoints.ipv6_url, "IPv6 lookup").await?;
        if !answer.ip.contains(':') {
            return Err(ProbeError::unavailable(format!(
                "IPv6 connectivity (service answered {})",
                answer.ip
            )));
        }
        let details = self.fetch_details(&answer.ip).await?;
        Ok(details.into_lookup(&answer.ip))
    }

    async fn fetch_ip(&self, url: &str, service: &str) -> Result<IpAnswer> {
        let response = self.client.get(url).send().await?;
        let response = ensure_success(service, response)?;
        Ok(response.json::<IpAnswer>().await?)
    }

    async fn fetch_details(&self, ip: &str) -> Result<IpDetails> {
        let url = format!("{}{}/json/", self.endpoints.details_url, ip);
        let response = self.client.get(&url).send().await?;
        let response = ensure_success("IP details", response)?;
        Ok(response.json::<IpDetails>().await?)
    }
}

fn ensure_success(service: &str, response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ProbeError::HttpStatus {
            service: service.to_string(),
            status: status.as_u16(),
        })
    }
}

/// 记录失败并降级为 `None`
fn record<T>(probe: &str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("{} lookup failed: {}", probe, e);
            PROBE_FAILURES.with_label_values(&[probe, e.kind()]).inc();
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trace() {
        let text = "fl=29f\nh=www.cloudflare.com\nip=203.0.113.7\nts=1700000000.1\nloc=NL\ncolo=AMS\nbroken\nk=v=w\n";
        let trace = parse_trace(text);
        assert_eq!(trace.get("ip").map(String::as_str), Some("203.0.113.7"));
        assert_eq!(trace.get("loc").map(String::as_str), Some("NL"));
        assert_eq!(trace.get("colo").map(String::as_str), Some("AMS"));
        assert!(!trace.contains_key("broken"));
        assert!(!trace.contains_key("k"));
    }

    #[test]
    fn test_details_coords() {
        let details = IpDetails {
            latitude: Some(52.37),
            longitude: Some(4.89),
            country_name: Some("Netherlands".into()),
            ..Default::default()
        };
        let lookup = details.into_lookup("203.0.113.7");
        assert_eq!(lookup.ip, "203.0.113.7");
        assert_eq!(lookup.coords.as_deref(), Some("52.37, 4.89"));
        assert_eq!(lookup.country.as_deref(), Some("Netherlands"));

        let partial = IpDetails {
            latitude: Some(1.0),
            ..Default::default()
        };
        assert!(partial.into_lookup("x").coords.is_none());
    }
}
