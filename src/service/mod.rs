//! 服务管理模块
//!
//! 管理 `leakscope serve` 下各 HTTP 服务的生命周期
//!
//! ## 核心概念
//!
//! - `HttpRouterService`: HTTP路由服务的核心 trait，提供 axum 路由器
//! - `ServiceInfo`: 服务的基本信息
//! - `ServiceManager`: 服务管理器，合并路由、挂载 `/metrics` 并负责优雅关闭

pub mod http;
pub mod info;
pub mod manager;
pub mod trace;

use anyhow::Result;
use async_trait::async_trait;
use axum::Router;
use info::ServiceInfo;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use strum::Display;
use tracing::info;
use url::Url;

pub use http::EdgeService;
pub use info::ServiceStatus;
pub use manager::ServiceManager;

/// 服务类型
#[derive(Debug, Clone, Serialize, Deserialize, Display, PartialEq, Eq)]
pub enum ServiceType {
    Edge,
}

/// HTTP路由服务的核心 trait - 为 axum 提供路由器
#[async_trait]
pub trait HttpRouterService: Send + Sync + Debug {
    /// 获取服务信息
    fn info(&self) -> &ServiceInfo;

    /// 获取可变的服务信息
    fn info_mut(&mut self) -> &mut ServiceInfo;

    /// 构建axum路由器
    async fn build_router(&mut self) -> Result<Router>;

    /// 服务启动回调（路由器已构建并启动后调用）
    async fn on_start(&mut self, base_url: Url) -> Result<()> {
        self.info_mut().set_running(base_url);
        Ok(())
    }

    /// 服务停止回调
    async fn on_stop(&mut self) -> Result<()> {
        info!("HTTP router service '{}' stopped", self.info().name);
        self.info_mut().status = ServiceStatus::Unknown;
        Ok(())
    }

    /// 获取路由前缀，"/" 表示挂在根路径
    fn route_prefix(&self) -> &str;
}
