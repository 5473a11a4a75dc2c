//! 泄漏判定核心
//!
//! 纯函数集合：地址作用域分类、ICE 候选解析与去重、多来源一致性比较、
//! 时区与地理位置校验，以及基于 ASN 组织名的代理/VPN/Tor 启发式。
//! 不做任何网络 I/O。

pub mod address;
pub mod consistency;
pub mod ice;
pub mod keywords;
pub mod proxy;
pub mod timezone;
pub mod verdict;

pub use address::{
    AddressClass, AddressFamily, AddressObservation, AddressScope, AddressSource, PrivateClass,
    classify,
};
pub use consistency::{analyze_dns, analyze_ports, analyze_webrtc, compare_ips, overall_status};
pub use ice::{IceAddress, IceAddressCollector, extract_address};
pub use proxy::{
    ForwardingHeaders, ProxyHeuristicResult, RiskLevel, TOR_COUNTRY_CODE, evaluate_proxy,
    public_dns_provider,
};
pub use timezone::{TimezoneCheck, check_timezone, expected_countries, format_utc_offset};
pub use verdict::{Assessment, LeakVerdict, Status};
