//! Prometheus 监控指标模块
//!
//! 提供全局指标收集和导出功能

use lazy_static::lazy_static;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};
use std::sync::Once;
use std::time::Instant;

static METRICS_INIT: Once = Once::new();

lazy_static! {
    /// 全局 Prometheus Registry
    pub static ref REGISTRY: Registry = Registry::new();

    // ========== 边缘 API 指标 ==========

    /// HTTP 请求延迟（秒）
    pub static ref REQUEST_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new("request_duration_seconds", "HTTP request duration in seconds")
            .namespace("leakscope")
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        &["endpoint", "method", "status"]
    ).unwrap();

    /// HTTP 请求总数
    pub static ref REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("requests_total", "Total number of HTTP requests")
            .namespace("leakscope"),
        &["endpoint", "method", "status"]
    ).unwrap();

    /// 代理检测结论（按风险等级）
    pub static ref PROXY_VERDICTS: IntCounterVec = IntCounterVec::new(
        Opts::new("proxy_verdicts_total", "Proxy detection verdicts by risk level")
            .namespace("leakscope"),
        &["risk"]
    ).unwrap();

    // ========== 本地检测指标 ==========

    /// 检测失败次数（超时、网络、解析等）
    pub static ref PROBE_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new("probe_failures_total", "Total number of failed probes")
            .namespace("leakscope"),
        &["probe", "kind"]
    ).unwrap();

    /// 检出的泄漏（按检测项）
    pub static ref LEAKS_DETECTED: IntCounterVec = IntCounterVec::new(
        Opts::new("leaks_detected_total", "Total number of detected leaks")
            .namespace("leakscope"),
        &["section"]
    ).unwrap();
}

/// 注册所有指标到全局 Registry
///
/// This function is idempotent - calling it multiple times is safe.
/// Only the first call will actually register the metrics.
pub fn register_metrics() -> Result<(), prometheus::Error> {
    let mut result = Ok(());

    METRICS_INIT.call_once(|| {
        let register_result = (|| {
            REGISTRY.register(Box::new(REQUEST_DURATION.clone()))?;
            REGISTRY.register(Box::new(REQUESTS_TOTAL.clone()))?;
            REGISTRY.register(Box::new(PROXY_VERDICTS.clone()))?;
            REGISTRY.register(Box::new(PROBE_FAILURES.clone()))?;
            REGISTRY.register(Box::new(LEAKS_DETECTED.clone()))?;
            Ok::<(), prometheus::Error>(())
        })();

        if let Err(e) = register_result {
            result = Err(e);
        }
    });

    result
}

/// HTTP 请求计时器
pub struct RequestTimer {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestTimer {
    /// 创建计时器
    pub fn new(endpoint: &str, method: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// 完成计时并记录指标
    pub fn observe(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();
        let status_str = status.to_string();

        REQUEST_DURATION
            .with_label_values(&[&self.endpoint, &self.method, &status_str])
            .observe(duration);

        REQUESTS_TOTAL
            .with_label_values(&[&self.endpoint, &self.method, &status_str])
            .inc();
    }
}

/// 导出 Prometheus 格式的指标
pub fn export_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }

    String::from_utf8_lossy(&buffer).into_owned()
}
