//! HTTP服务模块
//!
//! 管理HTTP相关的服务

mod edge_api;

pub use edge_api::EdgeService;
