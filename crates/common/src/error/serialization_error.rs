//! 序列化相关错误类型
//!
//! 定义与报告导出相关的错误

use thiserror::Error;

/// 序列化相关错误
#[derive(Error, Debug)]
pub enum SerializationError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
