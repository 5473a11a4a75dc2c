//! 边缘 API
//!
//! 部署在边缘代理之后的无状态 HTTP 服务，只依据请求头中注入的元数据回答：
//!
//! - `/` API 索引
//! - `/api/dns-leak` 解析器归属
//! - `/api/advanced-ip` 地理与 ASN 详情
//! - `/api/proxy-detection` 代理 / VPN / Tor 启发式
//!
//! 所有响应允许任意来源跨域访问，任意 `OPTIONS` 请求直接返回空 200。

pub mod country;
pub mod error;
pub mod handlers;
pub mod metadata;
pub mod middleware;
pub mod types;

pub use error::{EdgeError, Endpoint};
pub use metadata::RequestMetadata;
pub use types::{
    ADVANCED_IP_PATH, API_VERSION, AdvancedIpResponse, ApiIndex, DNS_LEAK_PATH, DnsLeakResponse,
    HeaderSummary, PROXY_DETECTION_PATH, ProxyDetectionResponse,
};

use axum::{
    Router,
    http::{Method, StatusCode, header},
    routing::get,
};
use tower_http::cors::{Any, CorsLayer};

/// 创建边缘 API 路由
pub fn create_router() -> Router {
    Router::new()
        .route("/", get(handlers::index).post(handlers::index))
        .route(
            DNS_LEAK_PATH,
            get(handlers::dns_leak).post(handlers::dns_leak),
        )
        .route(
            ADVANCED_IP_PATH,
            get(handlers::advanced_ip).post(handlers::advanced_ip),
        )
        .route(
            PROXY_DETECTION_PATH,
            get(handlers::proxy_detection).post(handlers::proxy_detection),
        )
        .route_layer(axum::middleware::from_fn(middleware::catch_failures))
        .route_layer(axum::middleware::from_fn(middleware::record_metrics))
        .fallback(not_found)
        .layer(cors_layer())
        .layer(axum::middleware::from_fn(middleware::answer_options))
}

/// 任意来源、GET/POST/OPTIONS、仅允许 Content-Type 请求头
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not Found")
}
