use serde::{Deserialize, Serialize};
use strum::Display;

/// 单项检测的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Status {
    Safe,
    Warning,
    Leak,
    Error,
    Unknown,
}

/// 两个观测值的比较结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeakVerdict {
    pub matched: bool,
    pub status: Status,
    pub reason: Option<String>,
}

/// 状态加上面向用户的说明
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessment {
    pub status: Status,
    pub message: String,
}

impl Assessment {
    pub fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn has_leak(&self) -> bool {
        self.status == Status::Leak
    }
}
