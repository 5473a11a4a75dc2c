//! 网络相关错误类型
//!
//! 定义与监听地址解析相关的错误

use thiserror::Error;

/// 网络相关错误
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Invalid address format: {address}")]
    InvalidAddress { address: String },
}
