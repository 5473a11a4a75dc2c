//! 请求元数据提取
//!
//! 边缘代理（如 Cloudflare）在请求头中注入客户端地址、地理与 ASN 信息。
//! 缺少 `CF-Connecting-IP` 时退回到 TCP 对端地址。

use analysis::ForwardingHeaders;
use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::{HeaderMap, request::Parts};
use std::convert::Infallible;
use std::net::SocketAddr;

pub const CONNECTING_IP: &str = "CF-Connecting-IP";
pub const IP_COUNTRY: &str = "CF-IPCountry";
pub const RAY: &str = "CF-Ray";
pub const COUNTRY: &str = "X-CF-Country";
pub const CITY: &str = "X-CF-City";
pub const REGION: &str = "X-CF-Region";
pub const POSTAL_CODE: &str = "X-CF-Postal-Code";
pub const TIMEZONE: &str = "X-CF-Timezone";
pub const LATITUDE: &str = "X-CF-Latitude";
pub const LONGITUDE: &str = "X-CF-Longitude";
pub const ASN: &str = "X-CF-ASN";
pub const AS_ORGANIZATION: &str = "X-CF-AS-Organization";
pub const COLO: &str = "X-CF-Colo";
pub const METRO_CODE: &str = "X-CF-Metro-Code";
pub const CONTINENT: &str = "X-CF-Continent";
pub const IS_EU: &str = "X-CF-Is-EU";

/// 单次请求可观测到的全部元数据
#[derive(Debug, Clone, Default)]
pub struct RequestMetadata {
    pub client_ip: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub postal_code: Option<String>,
    pub timezone: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub asn: Option<String>,
    pub as_organization: Option<String>,
    pub colo: Option<String>,
    pub metro_code: Option<String>,
    pub continent: Option<String>,
    pub is_eu: bool,
    pub ray: Option<String>,
    pub user_agent: Option<String>,
    pub accept_language: Option<String>,
    pub accept_encoding: Option<String>,
    pub referer: Option<String>,
    pub origin: Option<String>,
    pub forwarding: ForwardingHeaders,
}

impl RequestMetadata {
    pub fn from_parts(parts: &Parts) -> Self {
        let headers = &parts.headers;

        let peer_ip = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        Self {
            client_ip: header(headers, CONNECTING_IP).or(peer_ip),
            country: header(headers, COUNTRY).or(header(headers, IP_COUNTRY)),
            city: header(headers, CITY),
            region: header(headers, REGION),
            postal_code: header(headers, POSTAL_CODE),
            timezone: header(headers, TIMEZONE),
            latitude: header(headers, LATITUDE),
            longitude: header(headers, LONGITUDE),
            asn: header(headers, ASN),
            as_organization: header(headers, AS_ORGANIZATION),
            colo: header(headers, COLO),
            metro_code: header(headers, METRO_CODE),
            continent: header(headers, CONTINENT),
            is_eu: header(headers, IS_EU)
                .is_some_and(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes")),
            ray: header(headers, RAY),
            user_agent: header(headers, "User-Agent"),
            accept_language: header(headers, "Accept-Language"),
            accept_encoding: header(headers, "Accept-Encoding"),
            referer: header(headers, "Referer"),
            origin: header(headers, "Origin"),
            forwarding: ForwardingHeaders {
                x_forwarded_for: header(headers, "X-Forwarded-For"),
                x_real_ip: header(headers, "X-Real-IP"),
                via: header(headers, "Via"),
            },
        }
    }
}

impl<S> FromRequestParts<S> for RequestMetadata
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}

/// 读取请求头；空值视为缺失，非 UTF-8 字节按替换字符解码
fn header(headers: &HeaderMap, name: &'static str) -> Option<String> {
    let value = headers.get(name)?;
    let value = String::from_utf8_lossy(value.as_bytes());
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, Request};

    fn parts(request: Request<()>) -> Parts {
        request.into_parts().0
    }

    #[test]
    fn test_reads_edge_headers() {
        let request = Request::builder()
            .header(CONNECTING_IP, "203.0.113.9")
            .header(IP_COUNTRY, "FR")
            .header(AS_ORGANIZATION, "Orange S.A.")
            .header(IS_EU, "1")
            .header("Via", "1.1 varnish")
            .body(())
            .unwrap();

        let meta = RequestMetadata::from_parts(&parts(request));
        assert_eq!(meta.client_ip.as_deref(), Some("203.0.113.9"));
        assert_eq!(meta.country.as_deref(), Some("FR"));
        assert_eq!(meta.as_organization.as_deref(), Some("Orange S.A."));
        assert!(meta.is_eu);
        assert_eq!(meta.forwarding.via.as_deref(), Some("1.1 varnish"));
        assert!(meta.forwarding.x_forwarded_for.is_none());
    }

    #[test]
    fn test_falls_back_to_peer_address() {
        let mut request = Request::builder().body(()).unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([198, 51, 100, 4], 40000))));

        let meta = RequestMetadata::from_parts(&parts(request));
        assert_eq!(meta.client_ip.as_deref(), Some("198.51.100.4"));
        assert!(!meta.is_eu);
    }

    #[test]
    fn test_decodes_utf8_header_values() {
        let mut request = Request::builder()
            .header(AS_ORGANIZATION, "NordVPN Services")
            .body(())
            .unwrap();
        request.headers_mut().insert(
            CITY,
            HeaderValue::from_bytes("Zürich".as_bytes()).unwrap(),
        );
        request.headers_mut().insert(
            "User-Agent",
            HeaderValue::from_bytes(&[0x4d, 0xff, 0x6f]).unwrap(),
        );

        let meta = RequestMetadata::from_parts(&parts(request));
        assert_eq!(meta.city.as_deref(), Some("Zürich"));
        assert_eq!(meta.user_agent.as_deref(), Some("M\u{fffd}o"));
        assert_eq!(meta.as_organization.as_deref(), Some("NordVPN Services"));
    }

    #[test]
    fn test_blank_header_is_missing() {
        let request = Request::builder()
            .header("X-Real-IP", "")
            .body(())
            .unwrap();
        let meta = RequestMetadata::from_parts(&parts(request));
        assert!(meta.forwarding.x_real_ip.is_none());
    }
}
