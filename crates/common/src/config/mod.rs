//! 统一配置管理
//!
//! leakscope 配置的"单一真理之源"：所有配置项的定义、文档、默认值都在这里统一管理。

pub mod bind;
pub mod edge;
pub mod probe;

pub use crate::config::bind::{BindConfig, HttpBindConfig};
pub use crate::config::edge::EdgeConfig;
pub use crate::config::probe::{
    DnsProbeConfig, EndpointConfig, PortProbeConfig, ProbeConfig, WebRtcProbeConfig,
};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use url::Url;

/// leakscope 的主配置结构体
///
/// 配置文件使用 TOML 格式，除 `name` 与 `env` 外的所有段都有默认值。
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LeakscopeConfig {
    /// 实例名称
    ///
    /// 用于在日志中区分不同的部署，如 leakscope-edge-01。
    pub name: String,

    /// 运行环境标识
    ///
    /// - "dev": 开发环境
    /// - "prod": 生产环境，建议输出到文件并开启轮转
    /// - "test": 测试环境，用于自动化测试
    pub env: String,

    /// 网络绑定配置（`serve` 使用）
    #[serde(default)]
    pub bind: BindConfig,

    /// 本地检测配置（`check` 使用）
    #[serde(default)]
    pub probe: ProbeConfig,

    /// 边缘 API 地址（`check` 使用）
    #[serde(default)]
    pub edge: EdgeConfig,

    /// 可观测性配置
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// 可观测性配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ObservabilityConfig {
    /// 过滤级别
    ///
    /// 支持 EnvFilter 语法（如 "info,hyper=warn"）。默认值 "info"。
    #[serde(default = "default_filter_level")]
    pub filter_level: String,

    #[serde(default)]
    pub log: LogConfig,
}

/// 日志配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogConfig {
    /// 日志输出目标
    ///
    /// - "console": 仅输出到控制台（默认）
    /// - "file": 输出到文件
    #[serde(default = "default_log_output")]
    pub output: String,

    /// 日志轮转开关
    ///
    /// 当 output = "file" 时有效：true 按天轮转，false 追加到单个文件
    #[serde(default)]
    pub rotate: bool,

    /// 日志文件目录
    #[serde(default = "default_log_path")]
    pub path: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            filter_level: default_filter_level(),
            log: LogConfig::default(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            output: default_log_output(),
            rotate: false,
            path: default_log_path(),
        }
    }
}

fn default_log_output() -> String {
    "console".to_string()
}

fn default_log_path() -> String {
    "logs/".to_string()
}

fn default_filter_level() -> String {
    "info".to_string()
}

impl Default for LeakscopeConfig {
    fn default() -> Self {
        Self {
            name: "leakscope-default".to_string(),
            env: "dev".to_string(),
            bind: BindConfig::default(),
            probe: ProbeConfig::default(),
            edge: EdgeConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl LeakscopeConfig {
    /// 返回可观测性配置引用
    pub fn observability_config(&self) -> &ObservabilityConfig {
        &self.observability
    }

    /// 检查是否使用控制台日志输出
    pub fn is_console_logging(&self) -> bool {
        self.observability.log.output == "console"
    }

    /// 检查是否应该轮转日志
    pub fn should_rotate_logs(&self) -> bool {
        self.observability.log.output == "file" && self.observability.log.rotate
    }

    /// 从文件加载配置
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(ConfigError::FileNotFound {
                path: path_ref.display().to_string(),
            });
        }

        if !path_ref.is_file() {
            return Err(ConfigError::InvalidFormat {
                message: format!("Path is not a valid file: {}", path_ref.display()),
            });
        }

        let content = std::fs::read_to_string(path_ref)?;
        Ok(Self::from_toml(&content)?)
    }

    /// 从 TOML 字符串加载配置
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// 验证配置有效性
    ///
    /// 以 "Warning:" 开头的条目不阻止启动。
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push("Instance name cannot be empty".to_string());
        }

        if !["dev", "prod", "test"].contains(&self.env.as_str()) {
            errors.push(format!(
                "Invalid environment '{}', must be one of: dev, prod, test",
                self.env
            ));
        }

        // 过滤级别（EnvFilter 语法）只检查第一段
        {
            let main_level = self
                .observability
                .filter_level
                .split(',')
                .next()
                .unwrap_or("")
                .trim();
            if !["trace", "debug", "info", "warn", "error"].contains(&main_level) {
                errors.push(format!(
                    "Invalid filter level '{}', must start with one of: trace, debug, info, warn, error",
                    self.observability.filter_level
                ));
            }
        }

        if !["console", "file"].contains(&self.observability.log.output.as_str()) {
            errors.push(format!(
                "Invalid log output '{}' (observability.log.output), must be 'console' or 'file'",
                self.observability.log.output
            ));
        }

        if let Some(ref http) = self.bind.http {
            if http.port == 0 {
                errors.push("bind.http.port cannot be 0".to_string());
            }
            if let Err(e) = http.socket_addr() {
                errors.push(format!("bind.http: {e}"));
            }
        }

        self.validate_probe(&mut errors);

        if let Some(ref api_url) = self.edge.api_url
            && !api_url.trim().is_empty()
            && !is_http_url(api_url)
        {
            errors.push(format!(
                "edge.api_url '{api_url}' must be an absolute http(s) URL"
            ));
        }

        if self.env == "prod" && self.is_console_logging() {
            errors.push(
                "Warning: Production environment should log to file (observability.log.output = \"file\")"
                    .to_string(),
            );
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_probe(&self, errors: &mut Vec<String>) {
        let probe = &self.probe;

        if probe.timeout_ms == 0 {
            errors.push("probe.timeout_ms must be greater than 0".to_string());
        }
        if probe.max_retries == 0 {
            errors.push("probe.max_retries must be at least 1".to_string());
        }

        for (field, value) in [
            ("probe.endpoints.trace_url", &probe.endpoints.trace_url),
            ("probe.endpoints.ipify_url", &probe.endpoints.ipify_url),
            ("probe.endpoints.ipv6_url", &probe.endpoints.ipv6_url),
            ("probe.endpoints.details_url", &probe.endpoints.details_url),
        ] {
            if !is_http_url(value) {
                errors.push(format!("{field} '{value}' must be an absolute http(s) URL"));
            }
        }

        if probe.webrtc.stun_servers.is_empty() {
            errors.push(
                "Warning: probe.webrtc.stun_servers is empty, only host candidates will be gathered"
                    .to_string(),
            );
        }
        for server in &probe.webrtc.stun_servers {
            if !(server.starts_with("stun:") || server.starts_with("turn:")) {
                errors.push(format!(
                    "Invalid ICE server '{server}', must start with stun: or turn:"
                ));
            }
        }
        if probe.webrtc.gathering_secs == 0 || probe.webrtc.gathering_secs > 60 {
            errors.push(format!(
                "probe.webrtc.gathering_secs must be between 1 and 60, got {}",
                probe.webrtc.gathering_secs
            ));
        }

        if probe.dns.test_domains.is_empty() {
            errors.push("Warning: probe.dns.test_domains is empty, DNS test will report an error".to_string());
        }

        if probe.ports.ports.is_empty() {
            errors.push("Warning: probe.ports.ports is empty, port scan is skipped".to_string());
        }
        if probe.ports.open_threshold_ms > probe.ports.timeout_ms {
            errors.push(format!(
                "Warning: probe.ports.open_threshold_ms ({}) exceeds probe.ports.timeout_ms ({})",
                probe.ports.open_threshold_ms, probe.ports.timeout_ms
            ));
        }
    }
}

fn is_http_url(value: &str) -> bool {
    Url::parse(value)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn minimal_toml() -> &'static str {
        r#"
name = "leakscope-test"
env = "test"
"#
    }

    #[test]
    fn test_default_config() {
        let config = LeakscopeConfig::default();
        assert_eq!(config.name, "leakscope-default");
        assert_eq!(config.env, "dev");
        assert_eq!(config.probe.max_retries, 2);
        assert_eq!(config.probe.webrtc.gathering_secs, 5);
        assert_eq!(config.probe.ports.ports, vec![80, 443, 8080, 3000, 5000]);
        assert!(!config.edge.is_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_minimal_toml_fills_defaults() {
        let config = LeakscopeConfig::from_toml(minimal_toml()).unwrap();
        assert_eq!(config.name, "leakscope-test");
        assert_eq!(config.probe.dns.timeout_ms, 5_000);
        assert_eq!(config.probe.ports.timeout_ms, 1_000);
        assert_eq!(config.observability.filter_level, "info");
        assert!(config.is_console_logging());
        assert_eq!(config.bind.http.as_ref().unwrap().port, 8787);
    }

    #[test]
    fn test_validate_reports_errors() {
        let mut config = LeakscopeConfig::default();
        config.env = "staging".to_string();
        config.probe.max_retries = 0;
        config.probe.endpoints.trace_url = "not a url".to_string();
        config.probe.webrtc.stun_servers = vec!["stun.example.com:3478".to_string()];

        let errors = config.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("Invalid environment")));
        assert!(errors.iter().any(|e| e.contains("max_retries")));
        assert!(errors.iter().any(|e| e.contains("trace_url")));
        assert!(errors.iter().any(|e| e.contains("Invalid ICE server")));
        assert!(errors.iter().all(|e| !e.starts_with("Warning:")));
    }

    #[test]
    fn test_validate_warnings_only() {
        let mut config = LeakscopeConfig::default();
        config.env = "prod".to_string();
        config.probe.dns.test_domains.clear();

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.starts_with("Warning:")));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(minimal_toml().as_bytes()).unwrap();

        let config = LeakscopeConfig::from_file(&path).unwrap();
        assert_eq!(config.env, "test");

        let missing = LeakscopeConfig::from_file(dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(ConfigError::FileNotFound { .. })));

        let directory = LeakscopeConfig::from_file(dir.path());
        assert!(matches!(directory, Err(ConfigError::InvalidFormat { .. })));
    }

    #[test]
    fn test_from_file_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "name = ").unwrap();

        assert!(matches!(
            LeakscopeConfig::from_file(&path),
            Err(ConfigError::Parse(_))
        ));
    }
}
