//! 边缘 API 服务实现

use crate::service::info::ServiceInfo;
use crate::service::{HttpRouterService, ServiceType};
use anyhow::Result;
use async_trait::async_trait;
use axum::{Router, routing::get};
use tracing::info;

/// 边缘 API：服务端视角的 DNS / 地理 / 代理检测
#[derive(Debug)]
pub struct EdgeService {
    info: ServiceInfo,
}

impl EdgeService {
    pub fn new() -> Self {
        Self {
            info: ServiceInfo::new(
                "Edge API",
                ServiceType::Edge,
                Some("IP leak detection edge API (dns-leak, advanced-ip, proxy-detection)".to_string()),
            ),
        }
    }
}

impl Default for EdgeService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpRouterService for EdgeService {
    fn info(&self) -> &ServiceInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut ServiceInfo {
        &mut self.info
    }

    async fn build_router(&mut self) -> Result<Router> {
        info!("Building edge API router");
        let router = Router::new()
            .route("/health", get(|| async { "Edge API is healthy" }))
            .merge(edge::create_router());
        info!("Edge API router built successfully");
        Ok(router)
    }

    fn route_prefix(&self) -> &str {
        "/"
    }
}
