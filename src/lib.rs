//! # leakscope
//!
//! IP 泄漏诊断工具：边缘 API 服务（`serve`）与本机一致性检测（`check`）

pub mod report;
pub mod service;

// Re-export commonly used types
pub use leakscope_common::config::LeakscopeConfig;
pub use service::{EdgeService, ServiceManager};
