//! 终端报告渲染
//!
//! 把一次 [`LeakReport`] 渲染为分节的彩色文本，并在运行中逐条打印实时事件。

use analysis::{Assessment, Status};
use colored::*;
use probe::{IpLookup, LeakReport, NOT_AVAILABLE, PortStatus, ProbeEvent};

const RULE_WIDTH: usize = 60;

/// 查询失败时的占位
pub const ERROR_LOADING: &str = "Error loading";
/// 未检测到 IPv6 时的占位
pub const IPV6_NOT_DETECTED: &str = "N/A (IPv6 not detected)";
/// 可选小节缺失时的占位
pub const NOT_AVAILABLE_SECTION: &str = "Not Available";

/// 带标题的一节输出
struct Section {
    title: String,
    lines: Vec<String>,
}

impl Section {
    fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            lines: Vec::new(),
        }
    }

    fn line(mut self, line: impl Into<String>) -> Self {
        self.lines.push(line.into());
        self
    }

    fn field(self, name: &str, value: impl AsRef<str>) -> Self {
        let line = format!("{:<14} {}", format!("{name}:"), value.as_ref());
        self.line(line)
    }

    fn render(&self, out: &mut String) {
        out.push_str(&self.title.bright_cyan().bold().to_string());
        out.push('\n');
        out.push_str(&"─".repeat(RULE_WIDTH).dimmed().to_string());
        out.push('\n');
        for line in &self.lines {
            out.push_str("  ");
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
    }
}

fn status_icon(status: Status) -> &'static str {
    match status {
        Status::Safe => "✅",
        Status::Warning => "⚠️ ",
        Status::Leak => "🚨",
        Status::Error => "❌",
        Status::Unknown => "❔",
    }
}

fn paint(status: Status, text: &str) -> ColoredString {
    match status {
        Status::Safe => text.bright_green().bold(),
        Status::Warning => text.yellow().bold(),
        Status::Leak | Status::Error => text.bright_red().bold(),
        Status::Unknown => text.dimmed(),
    }
}

fn assessment_line(assessment: &Assessment) -> String {
    format!(
        "{} {}",
        status_icon(assessment.status),
        paint(assessment.status, &assessment.message)
    )
}

fn or_unknown(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("Unknown")
}

fn lookup_section(title: &str, lookup: Option<&IpLookup>, placeholder: &str) -> Section {
    let section = Section::new(title);
    let Some(lookup) = lookup else {
        return section.line(placeholder.red().to_string());
    };

    section
        .field("IP", &lookup.ip)
        .field("Country", or_unknown(&lookup.country))
        .field("City", or_unknown(&lookup.city))
        .field("Region", or_unknown(&lookup.region))
        .field("ISP", or_unknown(&lookup.isp))
        .field("ASN", or_unknown(&lookup.asn))
        .field("Timezone", or_unknown(&lookup.timezone))
        .field("Coordinates", or_unknown(&lookup.coords))
}

/// 渲染完整报告
pub fn render(report: &LeakReport) -> String {
    let mut out = String::new();
    let analysis = &report.analysis;

    out.push_str(&"IP Leak Test Results".bright_white().bold().to_string());
    out.push('\n');
    out.push_str(&format!("Run {} at {}\n", report.run_id, report.timestamp).dimmed().to_string());
    out.push('\n');
    out.push_str(&assessment_line(&analysis.overall));
    out.push_str("\n\n");

    lookup_section("Public IP (Cloudflare)", report.primary.as_ref(), ERROR_LOADING).render(&mut out);
    lookup_section("Public IP (other source)", report.secondary.as_ref(), ERROR_LOADING)
        .render(&mut out);
    lookup_section("IPv6", report.ipv6.as_ref(), IPV6_NOT_DETECTED).render(&mut out);

    let verdict = &analysis.ip_comparison;
    let mut comparison = Section::new("IP Comparison");
    for observation in &analysis.observations {
        comparison = comparison.line(format!(
            "{:<14} {} {}",
            format!("{}:", observation.source()),
            observation.literal(),
            observation.class().label().dimmed()
        ));
    }
    comparison
        .line(format!(
            "{} {}",
            status_icon(verdict.status),
            paint(
                verdict.status,
                verdict.reason.as_deref().unwrap_or("Incomplete data")
            )
        ))
        .render(&mut out);

    let mut webrtc = Section::new("WebRTC");
    if report.webrtc.is_empty() {
        webrtc = webrtc.line("No addresses discovered".dimmed().to_string());
    }
    for address in &report.webrtc {
        webrtc = webrtc.line(format!("{:<40} {}", address.ip, address.label.dimmed()));
    }
    webrtc.line(assessment_line(&analysis.webrtc)).render(&mut out);

    let mut dns = Section::new("DNS");
    for result in &report.dns {
        let line = match (result.resolved, result.response_time) {
            (true, Some(ms)) => format!("{} {} ({ms} ms)", "✓".green(), result.domain),
            (true, None) => format!("{} {}", "✓".green(), result.domain),
            (false, _) => format!(
                "{} {} {}",
                "✗".red(),
                result.domain,
                result.error.as_deref().unwrap_or_default().dimmed()
            ),
        };
        dns = dns.line(line);
    }
    dns.line(assessment_line(&analysis.dns)).render(&mut out);

    let fingerprint = &report.fingerprint;
    let mut host = Section::new("Host Fingerprint")
        .field("Hostname", &fingerprint.hostname)
        .field("OS", format!("{} ({})", fingerprint.os, fingerprint.family))
        .field("Architecture", &fingerprint.arch)
        .field("CPU cores", &fingerprint.cores)
        .field("Language", &fingerprint.languages.primary)
        .field("Languages", &fingerprint.languages.all)
        .field("Surface hash", &fingerprint.surface_hash);
    if fingerprint.interfaces.is_empty() {
        host = host.field("Interfaces", NOT_AVAILABLE);
    }
    for interface in &fingerprint.interfaces {
        host = host.line(format!(
            "{:<14} {} {}",
            format!("{}:", interface.name),
            interface.ip,
            interface.label.dimmed()
        ));
    }
    host.render(&mut out);

    let mut timezone = Section::new("Timezone");
    match &report.timezone {
        None => timezone = timezone.line(NOT_AVAILABLE_SECTION.dimmed().to_string()),
        Some(tz) => {
            timezone = timezone
                .field("Timezone", &tz.check.timezone)
                .field("UTC offset", &tz.check.utc_offset)
                .field("Local time", &tz.local_time);
            let verdict = if !tz.check.evaluated {
                "No verdict (timezone or country not in reference tables)"
                    .dimmed()
                    .to_string()
            } else if tz.check.leak_detected {
                format!(
                    "🚨 {}",
                    tz.check
                        .reason
                        .as_deref()
                        .unwrap_or("Timezone does not match IP location")
                        .bright_red()
                        .bold()
                )
            } else {
                format!("✅ {}", "Timezone matches IP location".bright_green())
            };
            timezone = timezone.line(verdict);
        }
    }
    timezone.render(&mut out);

    let mut ports = Section::new("Local Ports");
    for port in &report.ports {
        let status = match port.status {
            PortStatus::PotentiallyOpen => port.status.to_string().yellow().to_string(),
            PortStatus::ClosedFiltered => port.status.to_string().dimmed().to_string(),
        };
        let time = port
            .response_time
            .map(|ms| format!(" ({ms} ms)"))
            .unwrap_or_default();
        ports = ports.line(format!("{:<6} {status}{time}", port.port));
    }
    ports.line(assessment_line(&analysis.ports)).render(&mut out);

    let mut edge_dns = Section::new("Edge DNS Check");
    match &report.edge_dns {
        None => edge_dns = edge_dns.line(NOT_AVAILABLE_SECTION.dimmed().to_string()),
        Some(dns) => {
            edge_dns = edge_dns
                .field("Client IP", &dns.client_ip)
                .field("AS org", &dns.as_organization)
                .field("ASN", &dns.asn)
                .field("Colo", &dns.colo);
            if let Some(reason) = &dns.leak_reason {
                edge_dns = edge_dns.field("Note", reason);
            }
        }
    }
    edge_dns.render(&mut out);

    let mut edge_proxy = Section::new("Edge Proxy Detection");
    match &report.edge_proxy {
        None => edge_proxy = edge_proxy.line(NOT_AVAILABLE_SECTION.dimmed().to_string()),
        Some(proxy) => {
            let result = &proxy.result;
            edge_proxy = edge_proxy
                .field("IP", &proxy.ip)
                .field("AS org", &proxy.asn_org)
                .field("Risk", result.risk.to_string())
                .field("Tor", yes_no(result.is_tor))
                .field("VPN", yes_no(result.is_vpn))
                .field("Datacenter", yes_no(result.is_datacenter));
            for indicator in &result.indicators {
                edge_proxy = edge_proxy.line(format!("  • {indicator}"));
            }
        }
    }
    edge_proxy.render(&mut out);

    out
}

fn yes_no(value: bool) -> &'static str {
    if value { "Yes" } else { "No" }
}

/// 渲染一条实时事件
pub fn render_event(event: &ProbeEvent) -> String {
    match event {
        ProbeEvent::Progress {
            name,
            completed,
            total,
        } => format!("{} {name}", format!("[{completed}/{total}]").dimmed()),
        ProbeEvent::IceAddress(address) => format!(
            "{} {} {}",
            "WebRTC".bright_cyan(),
            address.ip.bold(),
            address.label.dimmed()
        ),
    }
}
