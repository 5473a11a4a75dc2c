//! 地址分类器
//!
//! 将 IPv4/IPv6 字面量映射为作用域标签（私有、回环、链路本地、ULA、公网）

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use strum::Display;

/// 地址族
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum AddressFamily {
    #[strum(serialize = "IPv4")]
    #[serde(rename = "IPv4")]
    V4,
    #[strum(serialize = "IPv6")]
    #[serde(rename = "IPv6")]
    V6,
}

/// RFC1918 私有网段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrivateClass {
    A,
    B,
    C,
}

/// 地址作用域
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "class")]
pub enum AddressScope {
    Private(PrivateClass),
    Loopback,
    LinkLocal,
    UniqueLocal,
    Public,
    Unknown,
}

/// 一次分类的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddressClass {
    /// 无法解析的输入没有地址族
    pub family: Option<AddressFamily>,
    pub scope: AddressScope,
}

impl AddressClass {
    const UNKNOWN: AddressClass = AddressClass {
        family: None,
        scope: AddressScope::Unknown,
    };

    pub fn is_public(&self) -> bool {
        self.scope == AddressScope::Public
    }

    /// 人类可读的作用域标签
    pub fn label(&self) -> &'static str {
        use AddressFamily::*;
        use AddressScope::*;

        match (self.family, self.scope) {
            (Some(V4), Private(PrivateClass::A)) => "Private IPv4 (Class A)",
            (Some(V4), Private(PrivateClass::B)) => "Private IPv4 (Class B)",
            (Some(V4), Private(PrivateClass::C)) => "Private IPv4 (Class C)",
            (Some(V4), Loopback) => "Loopback IPv4",
            (Some(V4), LinkLocal) => "Link-Local IPv4",
            (Some(V4), Public) => "Public IPv4",
            (Some(V6), LinkLocal) => "Link-Local IPv6",
            (Some(V6), UniqueLocal) => "Private IPv6 (ULA)",
            (Some(V6), Loopback) => "Loopback IPv6",
            (Some(V6), Public) => "Public IPv6",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for AddressClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 对 IP 字面量进行分类，规则按顺序匹配，首个命中生效
///
/// 没有错误路径：无法解析的输入返回 `Unknown`。
pub fn classify(literal: &str) -> AddressClass {
    let literal = literal.trim();

    if let Ok(v4) = literal.parse::<Ipv4Addr>() {
        return AddressClass {
            family: Some(AddressFamily::V4),
            scope: classify_v4(v4),
        };
    }

    // zone id（如 fe80::1%eth0）不参与分类
    let without_zone = literal.split('%').next().unwrap_or(literal);
    match without_zone.parse::<Ipv6Addr>() {
        Ok(v6) => AddressClass {
            family: Some(AddressFamily::V6),
            scope: classify_v6(v6),
        },
        Err(_) => AddressClass::UNKNOWN,
    }
}

fn classify_v4(addr: Ipv4Addr) -> AddressScope {
    match addr.octets() {
        [10, ..] => AddressScope::Private(PrivateClass::A),
        [172, b, ..] if (16..=31).contains(&b) => AddressScope::Private(PrivateClass::B),
        [192, 168, ..] => AddressScope::Private(PrivateClass::C),
        [127, ..] => AddressScope::Loopback,
        [169, 254, ..] => AddressScope::LinkLocal,
        _ => AddressScope::Public,
    }
}

fn classify_v6(addr: Ipv6Addr) -> AddressScope {
    let head = addr.segments()[0];
    if head == 0xfe80 {
        AddressScope::LinkLocal
    } else if head & 0xfe00 == 0xfc00 {
        AddressScope::UniqueLocal
    } else if addr == Ipv6Addr::LOCALHOST {
        AddressScope::Loopback
    } else {
        AddressScope::Public
    }
}

/// 观测来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum AddressSource {
    /// 主 IP 服务（trace 端点）
    ServiceA,
    /// 备用 IP 服务
    ServiceB,
    #[strum(serialize = "WebRTC")]
    WebRtc,
    #[strum(serialize = "IPv6 probe")]
    Ipv6Probe,
}

/// 某个来源观测到的一个地址，创建后不可变
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressObservation {
    literal: String,
    class: AddressClass,
    source: AddressSource,
}

impl AddressObservation {
    pub fn new(literal: impl Into<String>, source: AddressSource) -> Self {
        let literal = literal.into();
        let class = classify(&literal);
        Self {
            literal,
            class,
            source,
        }
    }

    pub fn literal(&self) -> &str {
        &self.literal
    }

    pub fn family(&self) -> Option<AddressFamily> {
        self.class.family
    }

    pub fn scope(&self) -> AddressScope {
        self.class.scope
    }

    pub fn class(&self) -> AddressClass {
        self.class
    }

    pub fn source(&self) -> AddressSource {
        self.source
    }
}
