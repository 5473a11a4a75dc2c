use axum::{Router, routing::get};
use edge::{
    AdvancedIpResponse, ApiIndex, DNS_LEAK_PATH, DnsLeakResponse, ProxyDetectionResponse,
    create_router, middleware,
};
use reqwest::StatusCode;
use reqwest::header::HeaderValue;
use serde_json::Value;
use std::net::SocketAddr;
use tokio::net::TcpListener;

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn start_test_server() -> TestServer {
    let app = create_router();

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind listener");
    let addr = listener.local_addr().expect("Failed to read bound addr");
    let base_url = format!("http://{addr}");

    let handle = tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("Edge test server exited unexpectedly");
    });

    TestServer { base_url, handle }
}

#[tokio::test]
async fn test_index_and_cors_headers() {
    let server = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/", server.base_url))
        .send()
        .await
        .expect("index request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );

    let index: ApiIndex = resp.json().await.expect("index body should parse");
    assert_eq!(index.status, "ok");
    assert_eq!(index.message, "IP Leak Detection API");
    assert_eq!(
        index.endpoints,
        vec!["/api/dns-leak", "/api/advanced-ip", "/api/proxy-detection"]
    );
}

#[tokio::test]
async fn test_options_is_empty_ok() {
    let server = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .request(
            reqwest::Method::OPTIONS,
            format!("{}/api/proxy-detection", server.base_url),
        )
        .send()
        .await
        .expect("options request failed");
    assert_eq!(resp.status(), StatusCode::OK);

    let methods = resp
        .headers()
        .get("access-control-allow-methods")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(methods.contains("GET"));
    assert!(methods.contains("POST"));
    assert!(methods.contains("OPTIONS"));

    let body = resp.text().await.expect("options body");
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_unknown_path_is_404() {
    let server = start_test_server().await;
    let resp = reqwest::get(format!("{}/api/nope", server.base_url))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(resp.text().await.expect("body"), "Not Found");
}

#[tokio::test]
async fn test_dns_leak_public_resolver() {
    let server = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/api/dns-leak", server.base_url))
        .header("CF-Connecting-IP", "8.8.4.4")
        .header("X-CF-AS-Organization", "Google LLC")
        .header("X-CF-ASN", "15169")
        .header("CF-Ray", "8a1b2c3d4e5f-AMS")
        .send()
        .await
        .expect("dns-leak request failed");
    assert_eq!(resp.status(), StatusCode::OK);

    let body: DnsLeakResponse = resp.json().await.expect("dns-leak body should parse");
    assert_eq!(body.client_ip, "8.8.4.4");
    assert_eq!(body.asn, "15169");
    assert_eq!(body.cloudflare_ray, "8a1b2c3d4e5f-AMS");
    assert_eq!(body.city, "Unknown");
    assert!(!body.leak_detected);
    assert_eq!(
        body.leak_reason.as_deref(),
        Some("Using a known public DNS provider.")
    );
}

#[tokio::test]
async fn test_post_is_accepted() {
    let server = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/dns-leak", server.base_url))
        .send()
        .await
        .expect("dns-leak post failed");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_advanced_ip_reports_headers() {
    let server = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/api/advanced-ip", server.base_url))
        .header("CF-Connecting-IP", "2001:db8::1")
        .header("X-CF-Country", "DE")
        .header("X-CF-Is-EU", "1")
        .header("User-Agent", "leakscope-test")
        .header("Accept-Language", "de-DE")
        .send()
        .await
        .expect("advanced-ip request failed");
    assert_eq!(resp.status(), StatusCode::OK);

    let body: AdvancedIpResponse = resp.json().await.expect("advanced-ip body should parse");
    assert_eq!(body.ip, "2001:db8::1");
    assert_eq!(body.ip_type, "Public IPv6");
    assert_eq!(body.country_name, "Germany");
    assert_eq!(body.is_eu, "Yes");
    assert_eq!(body.headers.user_agent, "leakscope-test");
    assert_eq!(body.headers.accept_language, "de-DE");
    assert_eq!(body.headers.origin, "None");
}

#[tokio::test]
async fn test_client_ip_falls_back_to_peer() {
    let server = start_test_server().await;

    let resp = reqwest::get(format!("{}/api/advanced-ip", server.base_url))
        .await
        .expect("advanced-ip request failed");
    let body: AdvancedIpResponse = resp.json().await.expect("advanced-ip body should parse");
    assert_eq!(body.ip, "127.0.0.1");
    assert_eq!(body.ip_type, "Loopback IPv4");
    assert_eq!(body.is_eu, "No");
}

#[tokio::test]
async fn test_proxy_detection_vpn_and_tor() {
    let server = start_test_server().await;
    let client = reqwest::Client::new();

    let vpn: ProxyDetectionResponse = client
        .get(format!("{}/api/proxy-detection", server.base_url))
        .header("CF-Connecting-IP", "185.65.134.10")
        .header("X-CF-AS-Organization", "NordVPN S.A.")
        .header("X-CF-Country", "PA")
        .send()
        .await
        .expect("proxy request failed")
        .json()
        .await
        .expect("proxy body should parse");
    assert!(vpn.result.is_vpn);
    assert!(vpn.result.is_proxy_likely);
    assert!(!vpn.result.is_tor);
    assert_eq!(vpn.result.risk.to_string(), "Medium");

    let tor: Value = client
        .get(format!("{}/api/proxy-detection", server.base_url))
        .header("X-CF-Country", "T1")
        .header("X-CF-AS-Organization", "DigitalOcean, LLC")
        .send()
        .await
        .expect("proxy request failed")
        .json()
        .await
        .expect("proxy body should parse");
    assert_eq!(tor["isTor"], true);
    assert_eq!(tor["isDatacenter"], false);
    assert_eq!(tor["risk"], "High");
    assert_eq!(
        tor["proxyIndicators"][0],
        "Tor exit node detected (via country code T1)"
    );
}

#[tokio::test]
async fn test_utf8_header_values_are_answered() {
    let server = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/api/proxy-detection", server.base_url))
        .header("X-CF-AS-Organization", "NordVPN Services")
        .header(
            "User-Agent",
            HeaderValue::from_bytes("Mozilla/5.0 (Zürich)".as_bytes()).expect("utf8 header"),
        )
        .header(
            "X-CF-City",
            HeaderValue::from_bytes("São Paulo".as_bytes()).expect("utf8 header"),
        )
        .send()
        .await
        .expect("proxy-detection request failed");
    assert_eq!(resp.status(), StatusCode::OK);

    let body: ProxyDetectionResponse = resp.json().await.expect("proxy body should parse");
    assert!(body.result.is_vpn);
    assert_eq!(body.result.risk.to_string(), "Medium");

    let resp = client
        .get(format!("{}/api/advanced-ip", server.base_url))
        .header(
            "X-CF-City",
            HeaderValue::from_bytes("São Paulo".as_bytes()).expect("utf8 header"),
        )
        .send()
        .await
        .expect("advanced-ip request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    let body: AdvancedIpResponse = resp.json().await.expect("advanced body should parse");
    assert_eq!(body.city, "São Paulo");
}

async fn exploding_handler() -> &'static str {
    panic!("resolver table corrupted")
}

#[tokio::test]
async fn test_handler_panic_returns_500_json() {
    let app = Router::new()
        .route(DNS_LEAK_PATH, get(exploding_handler))
        .route_layer(axum::middleware::from_fn(middleware::catch_failures));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind listener");
    let addr = listener.local_addr().expect("Failed to read bound addr");
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server exited");
    });

    let resp = reqwest::get(format!("http://{addr}{DNS_LEAK_PATH}"))
        .await
        .expect("dns-leak request failed");
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = resp.json().await.expect("error body should be json");
    assert_eq!(body["error"], "DNS Leak detection failed");
    assert_eq!(body["message"], "resolver table corrupted");

    handle.abort();
}
