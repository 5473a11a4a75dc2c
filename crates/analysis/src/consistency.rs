//! 一致性分析
//!
//! 比较不同来源观测到的地址，给出泄漏判定与说明文字

use crate::ice::IceAddress;
use crate::verdict::{Assessment, LeakVerdict, Status};
use std::collections::BTreeSet;

/// 比较两个来源得到的公网 IP（精确字符串相等）
pub fn compare_ips(a: Option<&str>, b: Option<&str>) -> LeakVerdict {
    match (a, b) {
        (Some(a), Some(b)) if a == b => LeakVerdict {
            matched: true,
            status: Status::Safe,
            reason: Some(
                "Your IP address is identical from both sources. No leak detected.".to_string(),
            ),
        },
        (Some(_), Some(_)) => LeakVerdict {
            matched: false,
            status: Status::Warning,
            reason: Some(
                "Your IP address differs between sources! Possible IP leak detected.".to_string(),
            ),
        },
        _ => LeakVerdict {
            matched: false,
            status: Status::Unknown,
            reason: Some("Incomplete data".to_string()),
        },
    }
}

/// 分析 WebRTC 暴露的地址
///
/// 只关注公网地址：出现多个不同的公网地址，或唯一的公网地址与外部观测到的
/// 公网 IP 不一致时判定为泄漏。
pub fn analyze_webrtc(addresses: &[IceAddress], public_ip: Option<&str>) -> Assessment {
    if addresses.is_empty() {
        return Assessment::new(
            Status::Safe,
            "WebRTC did not expose any additional IP addresses.",
        );
    }

    let public: BTreeSet<&str> = addresses
        .iter()
        .filter(|a| a.is_public())
        .map(|a| a.ip.as_str())
        .collect();

    if public.len() > 1 {
        return Assessment::new(
            Status::Leak,
            "Critical! Multiple public IPs detected via WebRTC.",
        );
    }

    if let (Some(exposed), Some(observed)) = (public.first(), public_ip)
        && *exposed != observed
    {
        return Assessment::new(
            Status::Leak,
            "Warning! WebRTC has exposed your real IP address.",
        );
    }

    Assessment::new(
        Status::Safe,
        "WebRTC only shows private/local IPs. No leak detected.",
    )
}

/// DNS 可达性分析：全部失败为错误，全部成功为安全，部分成功为警告
pub fn analyze_dns(resolved: usize, total: usize) -> Assessment {
    if resolved == 0 {
        Assessment::new(
            Status::Error,
            "DNS test error. No domains are accessible.",
        )
    } else if resolved >= total {
        Assessment::new(
            Status::Safe,
            format!("All {total} DNS servers responded successfully."),
        )
    } else {
        Assessment::new(
            Status::Warning,
            format!("{resolved} of {total} DNS servers are accessible."),
        )
    }
}

/// 顶部状态横幅
///
/// 比较主、备两个 IP 服务的结果；若存在 IPv6 结果且与备用服务的 IPv4 不同，
/// 额外给出警告。
pub fn overall_status(
    primary: Option<&str>,
    secondary: Option<&str>,
    ipv6: Option<&str>,
) -> Assessment {
    let (Some(primary), Some(secondary)) = (primary, secondary) else {
        return Assessment::new(Status::Warning, "Incomplete data - Some services failed");
    };

    let mut assessment = if primary == secondary {
        Assessment::new(Status::Safe, "Your IP is identical from both sources ✓")
    } else {
        Assessment::new(Status::Warning, "Warning: Your IP differs between sources!")
    };

    if let Some(v6) = ipv6
        && v6 != secondary
    {
        assessment = Assessment::new(Status::Warning, "IPv6 detected and differs from IPv4!");
    }

    assessment
}

/// 本地端口探测汇总
pub fn analyze_ports(open_ports: usize) -> Assessment {
    if open_ports > 0 {
        Assessment::new(Status::Warning, "Ports Detected")
    } else {
        Assessment::new(Status::Safe, "Secure")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ice::IceAddressCollector;

    fn ice(ips: &[&str]) -> Vec<IceAddress> {
        let mut collector = IceAddressCollector::new();
        for ip in ips {
            collector.observe(
                &format!("candidate:1 1 udp 2122260223 {ip} 5000 typ host"),
                chrono::Utc::now(),
            );
        }
        collector.addresses().to_vec()
    }

    #[test]
    fn test_compare_ips() {
        let same = compare_ips(Some("1.2.3.4"), Some("1.2.3.4"));
        assert!(same.matched);
        assert_eq!(same.status, Status::Safe);

        let diff = compare_ips(Some("1.2.3.4"), Some("5.6.7.8"));
        assert!(!diff.matched);
        assert_eq!(diff.status, Status::Warning);
        assert!(diff.reason.unwrap().contains("differs"));

        let missing = compare_ips(None, Some("1.2.3.4"));
        assert_eq!(missing.status, Status::Unknown);
        assert_eq!(missing.reason.as_deref(), Some("Incomplete data"));
    }

    #[test]
    fn test_webrtc_private_only_is_safe() {
        let result = analyze_webrtc(&ice(&["192.168.1.5"]), Some("1.2.3.4"));
        assert!(!result.has_leak());
        assert_eq!(result.status, Status::Safe);
    }

    #[test]
    fn test_webrtc_multiple_public_is_leak() {
        let result = analyze_webrtc(&ice(&["1.2.3.4", "5.6.7.8"]), Some("1.2.3.4"));
        assert!(result.has_leak());
        assert!(result.message.contains("Multiple public IPs"));
    }

    #[test]
    fn test_webrtc_single_public_mismatch() {
        let leak = analyze_webrtc(&ice(&["192.168.1.5", "5.6.7.8"]), Some("1.2.3.4"));
        assert!(leak.has_leak());
        assert!(leak.message.contains("exposed your real IP"));

        let same = analyze_webrtc(&ice(&["1.2.3.4"]), Some("1.2.3.4"));
        assert!(!same.has_leak());

        // 没有外部观测值时无法比较
        let unknown = analyze_webrtc(&ice(&["5.6.7.8"]), None);
        assert!(!unknown.has_leak());
    }

    #[test]
    fn test_webrtc_empty() {
        let result = analyze_webrtc(&[], Some("1.2.3.4"));
        assert_eq!(result.status, Status::Safe);
        assert!(result.message.contains("did not expose"));
    }

    #[test]
    fn test_dns_thresholds() {
        let partial = analyze_dns(2, 3);
        assert_eq!(partial.status, Status::Warning);
        assert_eq!(partial.status.to_string(), "warning");
        assert!(partial.message.contains("2 of 3"));

        assert_eq!(analyze_dns(0, 3).status, Status::Error);

        let all = analyze_dns(3, 3);
        assert_eq!(all.status, Status::Safe);
        assert!(all.message.contains("All 3"));
    }

    #[test]
    fn test_overall_status() {
        assert_eq!(
            overall_status(None, Some("1.2.3.4"), None).message,
            "Incomplete data - Some services failed"
        );
        assert_eq!(
            overall_status(Some("1.2.3.4"), Some("1.2.3.4"), None).status,
            Status::Safe
        );
        assert_eq!(
            overall_status(Some("1.2.3.4"), Some("5.6.7.8"), None).status,
            Status::Warning
        );

        let v6 = overall_status(Some("1.2.3.4"), Some("1.2.3.4"), Some("2001:db8::1"));
        assert_eq!(v6.status, Status::Warning);
        assert_eq!(v6.message, "IPv6 detected and differs from IPv4!");
    }

    #[test]
    fn test_ports() {
        assert_eq!(analyze_ports(0).message, "Secure");
        assert_eq!(analyze_ports(2).status, Status::Warning);
    }
}
