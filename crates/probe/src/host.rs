//! 主机指纹面
//!
//! 收集外部可观察到的主机特征：主机名、系统、CPU 数、语言区域与网卡地址。
//! 读不到的项记为 "Not Available"。

use analysis::classify;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use tracing::debug;

pub const NOT_AVAILABLE: &str = "Not Available";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceAddress {
    pub name: String,
    pub ip: String,
    #[serde(rename = "type")]
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageInfo {
    pub primary: String,
    pub all: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostFingerprint {
    pub hostname: String,
    pub os: String,
    pub family: String,
    pub arch: String,
    pub cores: String,
    pub languages: LanguageInfo,
    pub interfaces: Vec<InterfaceAddress>,
    /// 以上各项拼接后的短哈希
    pub surface_hash: String,
}

impl HostFingerprint {
    pub fn collect() -> Self {
        let hostname = hostname::get()
            .ok()
            .and_then(|name| name.into_string().ok())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());

        let languages = language_info(
            std::env::var("LANG").ok().as_deref(),
            std::env::var("LANGUAGE").ok().as_deref(),
        );

        let interfaces = match local_ip_address::list_afinet_netifas() {
            Ok(list) => list
                .into_iter()
                .map(|(name, ip)| interface_address(name, ip))
                .collect(),
            Err(e) => {
                debug!("Network interfaces not available: {}", e);
                Vec::new()
            }
        };

        let mut fingerprint = Self {
            hostname,
            os: std::env::consts::OS.to_string(),
            family: std::env::consts::FAMILY.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            cores: num_cpus::get().to_string(),
            languages,
            interfaces,
            surface_hash: String::new(),
        };
        fingerprint.surface_hash = fingerprint.compute_hash();
        fingerprint
    }

    fn compute_hash(&self) -> String {
        let mut surface = format!(
            "{}|{}|{}|{}|{}|{}",
            self.hostname, self.os, self.family, self.arch, self.cores, self.languages.all
        );
        for iface in &self.interfaces {
            surface.push('|');
            surface.push_str(&iface.ip);
        }
        let mut hash = simple_hash(&surface);
        hash.truncate(16);
        hash
    }
}

fn interface_address(name: String, ip: IpAddr) -> InterfaceAddress {
    let ip = ip.to_string();
    InterfaceAddress {
        label: classify(&ip).label().to_string(),
        name,
        ip,
    }
}

/// 由 `LANG`（如 `de_DE.UTF-8`）与 `LANGUAGE`（如 `de:en`）推导语言列表
pub fn language_info(lang: Option<&str>, language: Option<&str>) -> LanguageInfo {
    fn tag(locale: &str) -> Option<String> {
        let base = locale.split(['.', '@']).next()?.trim();
        if base.is_empty() || base == "C" || base == "POSIX" {
            return None;
        }
        Some(base.replace('_', "-"))
    }

    let primary = lang.and_then(tag);
    let mut all: Vec<String> = language
        .map(|list| list.split(':').filter_map(tag).collect())
        .unwrap_or_default();
    if let Some(primary) = &primary
        && !all.contains(primary)
    {
        all.insert(0, primary.clone());
    }

    LanguageInfo {
        primary: primary.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        all: if all.is_empty() {
            NOT_AVAILABLE.to_string()
        } else {
            all.join(", ")
        },
    }
}

/// 32 位滚动哈希 `h = h * 31 + c`（按 UTF-16 码元），取绝对值后输出十六进制
pub fn simple_hash(input: &str) -> String {
    let hash = input.encode_utf16().fold(0i32, |hash, unit| {
        hash.wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit))
    });
    format!("{:x}", i64::from(hash).abs())
}
