//! 边缘路由中间件：请求指标、内部失败兜底与 `OPTIONS` 应答

use axum::{
    body::Body,
    extract::{MatchedPath, Request},
    http::{Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures::FutureExt;
use leakscope_common::metrics::RequestTimer;
use std::any::Any;
use std::panic::AssertUnwindSafe;

use crate::error::EdgeError;

/// 按匹配到的路由模板记录请求耗时与计数
pub async fn record_metrics(request: Request, next: Next) -> Response {
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let timer = RequestTimer::new(&endpoint, request.method().as_str());

    let response = next.run(request).await;
    timer.observe(response.status().as_u16());
    response
}

/// 处理器内部失败时回答 500 `{error, message}`，不让连接直接断开
pub async fn catch_failures(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(response) => response,
        Err(payload) => EdgeError::for_path(&path, panic_message(payload.as_ref())).into_response(),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}

/// 任意 `OPTIONS` 请求直接返回带跨域头的空 200，不进入路由
pub async fn answer_options(request: Request, next: Next) -> Response {
    if request.method() != Method::OPTIONS {
        return next.run(request).await;
    }

    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        header::HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        header::HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        header::HeaderValue::from_static("Content-Type"),
    );
    response
}
