//! 本地检测错误类型
//!
//! 每个探测自行捕获错误并降级为 `None` 或占位值，错误只用于日志与指标。

use thiserror::Error;

/// 探测错误枚举
#[derive(Error, Debug)]
pub enum ProbeError {
    // ========== 网络错误 ==========
    /// 操作超时
    #[error("Operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// HTTP 请求失败
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// 服务返回非成功状态码
    #[error("{service} returned HTTP {status}")]
    HttpStatus { service: String, status: u16 },

    // ========== 能力错误 ==========
    /// 当前主机不具备某项能力
    #[error("Capability not available: {capability}")]
    Unavailable { capability: String },

    // ========== 数据错误 ==========
    /// 响应内容无法解析
    #[error("Failed to parse response: {details}")]
    Parse { details: String },

    // ========== 外部错误包装 ==========
    /// WebRTC 库错误
    #[error("WebRTC error: {0}")]
    WebRtc(#[from] webrtc::Error),

    /// IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// 本地检测专用的 Result 类型
pub type Result<T> = std::result::Result<T, ProbeError>;

impl ProbeError {
    pub fn unavailable(capability: impl Into<String>) -> Self {
        Self::Unavailable {
            capability: capability.into(),
        }
    }

    pub fn parse(details: impl Into<String>) -> Self {
        Self::Parse {
            details: details.into(),
        }
    }

    /// 指标标签
    pub fn kind(&self) -> &'static str {
        match self {
            ProbeError::Timeout { .. } => "timeout",
            ProbeError::Network(e) if e.is_timeout() => "timeout",
            ProbeError::Network(_) | ProbeError::HttpStatus { .. } => "network",
            ProbeError::Unavailable { .. } => "unavailable",
            ProbeError::Parse { .. } => "parse",
            ProbeError::WebRtc(_) => "webrtc",
            ProbeError::Io(_) => "io",
        }
    }
}
