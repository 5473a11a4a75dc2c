//! ICE 候选解析
//!
//! 从 SDP candidate 行中提取 IP 字面量，并在一次采集会话内去重。

use crate::address::{AddressClass, classify};
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

lazy_static! {
    static ref IPV4_PATTERN: Regex =
        Regex::new(r"\b(?:[0-9]{1,3}\.){3}[0-9]{1,3}\b").expect("valid IPv4 pattern");
    static ref IPV6_PATTERN: Regex =
        Regex::new(r"(?i)(?:[0-9a-f]{0,4}:){2,7}[0-9a-f]{0,4}(?:%[0-9a-z]+)?")
            .expect("valid IPv6 pattern");
}

/// 采集会话中发现的一个地址
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceAddress {
    pub ip: String,
    /// 作用域标签，例如 "Private IPv4 (Class C)"
    #[serde(rename = "type")]
    pub label: String,
    pub class: AddressClass,
    /// 原始 candidate 行
    pub candidate: String,
    /// 首次发现时间，导出为毫秒时间戳
    #[serde(rename = "timestamp", with = "chrono::serde::ts_milliseconds")]
    pub observed_at: DateTime<Utc>,
}

impl IceAddress {
    pub fn is_public(&self) -> bool {
        self.class.is_public()
    }
}

/// 提取 candidate 中的第一个 IP 字面量：先找 IPv4，找不到再找 IPv6
///
/// 模式命中但无法解析为地址的片段会被跳过。
pub fn extract_address(candidate: &str) -> Option<String> {
    fn is_address(m: &regex::Match<'_>) -> bool {
        classify(m.as_str()).family.is_some()
    }

    IPV4_PATTERN
        .find_iter(candidate)
        .find(is_address)
        .or_else(|| IPV6_PATTERN.find_iter(candidate).find(is_address))
        .map(|m| m.as_str().to_string())
}

/// 单次测试运行独占的去重集合
///
/// 每个新地址只在首次出现时由 [`observe`](Self::observe) 返回，
/// 调用方据此发送实时事件；[`addresses`](Self::addresses) 按发现顺序给出批量结果。
#[derive(Debug, Default)]
pub struct IceAddressCollector {
    seen: HashSet<String>,
    ordered: Vec<IceAddress>,
}

impl IceAddressCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// 处理一行 candidate，若发现了新的地址则返回它，并记下收到该行的时间
    pub fn observe(&mut self, candidate: &str, observed_at: DateTime<Utc>) -> Option<IceAddress> {
        let ip = extract_address(candidate)?;
        if !self.seen.insert(ip.clone()) {
            return None;
        }

        let class = classify(&ip);
        let address = IceAddress {
            label: class.label().to_string(),
            class,
            candidate: candidate.to_string(),
            observed_at,
            ip,
        };
        self.ordered.push(address.clone());
        Some(address)
    }

    pub fn addresses(&self) -> &[IceAddress] {
        &self.ordered
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// 清空状态，在每次运行开始时调用
    pub fn reset(&mut self) {
        self.seen.clear();
        self.ordered.clear();
    }
}
