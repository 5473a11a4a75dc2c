use serde::{Deserialize, Serialize};

/// 边缘 API 配置
///
/// 本地检测通过 `api_url` 访问部署好的边缘服务（`/api/dns-leak`、`/api/proxy-detection`）。
/// 未配置时跳过这两项检测。
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct EdgeConfig {
    /// 边缘服务的基础地址，例如 "https://leak.example.com"
    pub api_url: Option<String>,
}

impl EdgeConfig {
    pub fn is_enabled(&self) -> bool {
        self.api_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty())
    }

    /// 拼接端点地址
    pub fn endpoint(&self, path: &str) -> Option<String> {
        let base = self.api_url.as_deref()?.trim();
        if base.is_empty() {
            return None;
        }
        Some(format!("{}{}", base.trim_end_matches('/'), path))
    }
}
