use axum::http::Request;
use tower_http::{
    classify::{ServerErrorsAsFailures, SharedClassifier},
    trace::{MakeSpan, TraceLayer},
};
use tracing::{Span, info_span};

pub type HttpTraceLayer = TraceLayer<SharedClassifier<ServerErrorsAsFailures>, HttpMakeSpan>;

pub fn http_trace_layer() -> HttpTraceLayer {
    TraceLayer::new_for_http().make_span_with(HttpMakeSpan)
}

/// 每个请求一个 span，边缘请求带上 CF-Ray 便于和前置代理日志对照
#[derive(Clone, Debug, Default)]
pub struct HttpMakeSpan;

impl<B> MakeSpan<B> for HttpMakeSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        let ray = request
            .headers()
            .get(edge::metadata::RAY)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("-");

        info_span!(
            "http.request",
            method = %request.method(),
            uri = %request.uri(),
            version = ?request.version(),
            cf_ray = %ray
        )
    }
}
