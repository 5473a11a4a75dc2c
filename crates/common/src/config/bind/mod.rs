pub mod http;

pub use crate::config::bind::http::HttpBindConfig;
use serde::{Deserialize, Serialize};

/// 网络绑定配置
///
/// 定义边缘 API 服务的网络绑定参数。
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BindConfig {
    /// HTTP 服务绑定配置（可选）
    ///
    /// `leakscope serve` 需要此配置；只运行本地检测时可以省略。
    pub http: Option<HttpBindConfig>,
}

impl Default for BindConfig {
    fn default() -> Self {
        Self {
            http: Some(HttpBindConfig::default()),
        }
    }
}
