//! 边缘 API 错误类型

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use crate::types::{ADVANCED_IP_PATH, DNS_LEAK_PATH, PROXY_DETECTION_PATH};
use serde_json::json;
use thiserror::Error;

/// 出错的检测端点，决定响应中的 `error` 文案
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    DnsLeak,
    AdvancedIp,
    ProxyDetection,
}

impl Endpoint {
    /// 按请求路径找到对应端点
    pub fn from_path(path: &str) -> Option<Self> {
        match path {
            DNS_LEAK_PATH => Some(Endpoint::DnsLeak),
            ADVANCED_IP_PATH => Some(Endpoint::AdvancedIp),
            PROXY_DETECTION_PATH => Some(Endpoint::ProxyDetection),
            _ => None,
        }
    }

    fn failure_label(self) -> &'static str {
        match self {
            Endpoint::DnsLeak => "DNS Leak detection failed",
            Endpoint::AdvancedIp => "Advanced IP detection failed",
            Endpoint::ProxyDetection => "Proxy detection failed",
        }
    }
}

/// 边缘服务错误类型
#[derive(Error, Debug)]
pub enum EdgeError {
    /// 某个检测端点处理失败
    #[error("{message}")]
    DetectionFailed { endpoint: Endpoint, message: String },

    /// 不属于任何检测端点的内部错误
    #[error("{message}")]
    Internal { message: String },
}

impl EdgeError {
    /// 将底层错误归到某个端点
    pub fn failed(endpoint: Endpoint, source: impl std::fmt::Display) -> Self {
        Self::DetectionFailed {
            endpoint,
            message: source.to_string(),
        }
    }

    /// 按请求路径归类；未知路径记为内部错误
    pub fn for_path(path: &str, source: impl std::fmt::Display) -> Self {
        match Endpoint::from_path(path) {
            Some(endpoint) => Self::failed(endpoint, source),
            None => Self::Internal {
                message: source.to_string(),
            },
        }
    }
}

impl IntoResponse for EdgeError {
    fn into_response(self) -> Response {
        let error_label = match &self {
            EdgeError::DetectionFailed { endpoint, .. } => endpoint.failure_label(),
            EdgeError::Internal { .. } => "Internal Server Error",
        };
        tracing::error!("Edge request failed: {:?}", self);

        let body = Json(json!({
            "error": error_label,
            "message": self.to_string(),
        }));

        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_path_picks_endpoint() {
        let err = EdgeError::for_path(PROXY_DETECTION_PATH, "asn lookup exploded");
        assert_eq!(err.to_string(), "asn lookup exploded");
        assert!(matches!(
            err,
            EdgeError::DetectionFailed {
                endpoint: Endpoint::ProxyDetection,
                ..
            }
        ));

        let err = EdgeError::for_path("/health", "boom");
        assert!(matches!(err, EdgeError::Internal { .. }));
    }

    #[test]
    fn test_into_response_is_500() {
        let response = EdgeError::failed(Endpoint::DnsLeak, "boom").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
