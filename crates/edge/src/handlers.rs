//! 边缘 API 处理器

use crate::country::country_name;
use crate::metadata::RequestMetadata;
use crate::types::{
    AdvancedIpResponse, ApiIndex, DnsLeakResponse, HeaderSummary, ProxyDetectionResponse,
};
use analysis::{classify, evaluate_proxy, public_dns_provider};
use axum::Json;
use chrono::{SecondsFormat, Utc};
use leakscope_common::metrics::PROXY_VERDICTS;
use tracing::{debug, info};

const UNKNOWN: &str = "Unknown";
const NONE: &str = "None";

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn or_default(value: Option<String>, default: &str) -> String {
    value.unwrap_or_else(|| default.to_string())
}

/// API 索引
pub async fn index() -> Json<ApiIndex> {
    Json(ApiIndex::default())
}

/// 解析器归属信息
///
/// 只能看到请求本身，因此永远不判定泄漏；命中公共 DNS 服务商时给出说明。
pub async fn dns_leak(meta: RequestMetadata) -> Json<DnsLeakResponse> {
    let as_organization = or_default(meta.as_organization, UNKNOWN);
    let leak_reason = public_dns_provider(&as_organization).map(|provider| {
        debug!("Resolver organization matches public DNS provider: {provider}");
        "Using a known public DNS provider.".to_string()
    });

    Json(DnsLeakResponse {
        client_ip: or_default(meta.client_ip, UNKNOWN),
        as_organization,
        asn: or_default(meta.asn, UNKNOWN),
        timestamp: now(),
        cloudflare_ray: or_default(meta.ray, UNKNOWN),
        country: or_default(meta.country, UNKNOWN),
        city: or_default(meta.city, UNKNOWN),
        colo: or_default(meta.colo, UNKNOWN),
        leak_detected: false,
        leak_reason,
    })
}

/// 地理与 ASN 详情
pub async fn advanced_ip(meta: RequestMetadata) -> Json<AdvancedIpResponse> {
    let ip = or_default(meta.client_ip, UNKNOWN);
    let ip_type = classify(&ip).label().to_string();

    Json(AdvancedIpResponse {
        country_name: country_name(meta.country.as_deref()),
        country: or_default(meta.country, UNKNOWN),
        region: or_default(meta.region, UNKNOWN),
        city: or_default(meta.city, UNKNOWN),
        postal_code: or_default(meta.postal_code, UNKNOWN),
        timezone: or_default(meta.timezone, UNKNOWN),
        latitude: or_default(meta.latitude, UNKNOWN),
        longitude: or_default(meta.longitude, UNKNOWN),
        asn: or_default(meta.asn, UNKNOWN),
        asn_org: or_default(meta.as_organization, UNKNOWN),
        colo: or_default(meta.colo, UNKNOWN),
        metro_code: or_default(meta.metro_code, UNKNOWN),
        continent: or_default(meta.continent, UNKNOWN),
        is_eu: if meta.is_eu { "Yes" } else { "No" }.to_string(),
        timestamp: now(),
        headers: HeaderSummary {
            user_agent: or_default(meta.user_agent, UNKNOWN),
            accept_language: or_default(meta.accept_language, UNKNOWN),
            accept_encoding: or_default(meta.accept_encoding, UNKNOWN),
            referer: or_default(meta.referer, NONE),
            origin: or_default(meta.origin, NONE),
        },
        ip,
        ip_type,
    })
}

/// 代理 / VPN / Tor 启发式
pub async fn proxy_detection(meta: RequestMetadata) -> Json<ProxyDetectionResponse> {
    let asn_org = meta.as_organization.unwrap_or_default();
    let result = evaluate_proxy(&asn_org, meta.country.as_deref(), &meta.forwarding);

    PROXY_VERDICTS
        .with_label_values(&[&result.risk.to_string()])
        .inc();
    info!(
        risk = %result.risk,
        indicators = result.indicators.len(),
        "Proxy heuristic evaluated"
    );

    Json(ProxyDetectionResponse {
        ip: or_default(meta.client_ip, UNKNOWN),
        result,
        asn: or_default(meta.asn, UNKNOWN),
        asn_org,
        country: or_default(meta.country, UNKNOWN),
        timestamp: now(),
    })
}
