//! 服务管理器模块 - 负责管理多个服务的生命周期

use super::HttpRouterService;
use crate::service::info::ServiceInfo;
use crate::service::trace::http_trace_layer;
use anyhow::Result;
use axum::Router;
use leakscope_common::config::LeakscopeConfig;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use url::Url;

/// 服务管理器，负责管理多个服务的生命周期
#[derive(Debug)]
pub struct ServiceManager {
    services: Vec<Box<dyn HttpRouterService>>,
    shutdown_tx: tokio::sync::broadcast::Sender<()>,
    config: LeakscopeConfig,
}

impl ServiceManager {
    /// 创建新的服务管理器
    pub fn new(config: LeakscopeConfig, shutdown_tx: tokio::sync::broadcast::Sender<()>) -> Self {
        Self {
            services: Vec::new(),
            shutdown_tx,
            config,
        }
    }

    /// 添加服务到管理器
    pub fn add_service(&mut self, service: Box<dyn HttpRouterService>) {
        info!("Adding service '{}' to manager", service.info().name);
        self.services.push(service);
    }

    /// 当前所有服务的信息快照
    pub fn service_infos(&self) -> Vec<ServiceInfo> {
        self.services.iter().map(|s| s.info().clone()).collect()
    }

    /// 按配置绑定地址并启动所有服务
    pub async fn start_all(&mut self) -> Result<Vec<JoinHandle<()>>> {
        let http_config = self
            .config
            .bind
            .http
            .clone()
            .ok_or_else(|| anyhow::anyhow!("No HTTP binding configuration found (bind.http)"))?;

        let addr = http_config.socket_addr()?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind to address '{addr}': {e}"))?;
        let public_url = Url::parse(&http_config.public_url())
            .map_err(|e| anyhow::anyhow!("Failed to parse HTTP URL: {e}"))?;

        let handle = self.start_on(listener, public_url).await?;
        Ok(vec![handle])
    }

    /// 在给定的监听器上启动合并后的 HTTP 服务
    pub async fn start_on(&mut self, listener: TcpListener, public_url: Url) -> Result<JoinHandle<()>> {
        let addr = listener.local_addr()?;
        info!(
            "Starting HTTP server with {} route services (environment: {})",
            self.services.len(),
            self.config.env
        );

        let app = self.build_app(&public_url).await?;
        info!("HTTP server listening on {}", addr);

        let shutdown_tx = self.shutdown_tx.clone();
        let mut shutdown_rx = shutdown_tx.subscribe();
        Ok(tokio::spawn(async move {
            let server = axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("HTTP server received shutdown signal");
            });
            if let Err(e) = server.await {
                error!("HTTP server error: {}", e);
                let _ = shutdown_tx.send(());
            }
            info!("HTTP server stopped");
        }))
    }

    /// 合并所有服务的路由，并挂载 `/metrics` 与追踪层
    pub async fn build_app(&mut self, public_url: &Url) -> Result<Router> {
        let mut app = Router::new();

        for service in &mut self.services {
            let route_prefix = service.route_prefix().to_string();
            let service_name = service.info().name.clone();

            match service.build_router().await {
                Ok(router) => {
                    info!(
                        "Adding route '{}' for service '{}'",
                        route_prefix, service_name
                    );
                    app = if route_prefix == "/" {
                        app.merge(router)
                    } else {
                        app.nest(&route_prefix, router)
                    };

                    if let Err(e) = service.on_start(public_url.clone()).await {
                        error!("Failed to start service '{}': {:?}", service_name, e);
                    }
                }
                Err(e) => {
                    error!(
                        "Failed to build router for service '{}': {:?}",
                        service_name, e
                    );
                    service.info_mut().set_error(e.to_string());
                }
            }
        }

        info!("Adding /metrics endpoint for Prometheus");
        app = app.route("/metrics", axum::routing::get(metrics_handler));

        Ok(app.layer(http_trace_layer()))
    }

    /// Stop all services
    pub async fn stop_all(&mut self) -> Result<()> {
        info!("Stopping all services");

        let _ = self.shutdown_tx.send(());
        for service in &mut self.services {
            if let Err(e) = service.on_stop().await {
                warn!("Failed to stop service '{}': {:?}", service.info().name, e);
            }
        }

        info!("All services stopped");
        Ok(())
    }
}

/// Prometheus metrics endpoint handler
async fn metrics_handler() -> String {
    leakscope_common::metrics::export_metrics()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{EdgeService, ServiceStatus};

    #[tokio::test]
    async fn test_build_app_marks_services_running() {
        let config = LeakscopeConfig::default();
        let (shutdown_tx, _) = tokio::sync::broadcast::channel(1);
        let mut manager = ServiceManager::new(config, shutdown_tx);
        manager.add_service(Box::new(EdgeService::new()));

        let url = Url::parse("http://localhost:8787").unwrap();
        manager.build_app(&url).await.unwrap();

        let infos = manager.service_infos();
        assert_eq!(infos.len(), 1);
        assert!(infos[0].is_running());

        manager.stop_all().await.unwrap();
        assert_eq!(manager.service_infos()[0].status, ServiceStatus::Unknown);
    }
}
