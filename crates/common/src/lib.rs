//! leakscope 通用基础设施
//!
//! 为边缘 API 服务与本地检测提供配置、错误类型和监控指标

pub mod config;
pub mod error;
pub mod metrics;

pub use config::LeakscopeConfig;
pub use error::{ConfigError, NetworkError, SerializationError};
