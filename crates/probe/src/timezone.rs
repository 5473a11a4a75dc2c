//! 本机时区探测

use crate::error::{ProbeError, Result};
use analysis::{TimezoneCheck, check_timezone};
use chrono::{Local, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

const LOCALTIME: &str = "/etc/localtime";
const TIMEZONE_FILE: &str = "/etc/timezone";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimezoneReport {
    #[serde(flatten)]
    pub check: TimezoneCheck,
    /// 本地时间，例如 "2024-05-01 14:03:22 +02:00"
    pub local_time: String,
    pub timestamp: String,
}

/// 探测本机时区，并与 IP 所在国家代码比较
pub fn probe_timezone(country_code: Option<&str>) -> Result<TimezoneReport> {
    let timezone = local_timezone().ok_or_else(|| ProbeError::unavailable("IANA timezone name"))?;
    let now = Local::now();
    let offset_hours = f64::from(now.offset().local_minus_utc()) / 3600.0;
    debug!("Local timezone {} (offset {}h)", timezone, offset_hours);

    Ok(TimezoneReport {
        check: check_timezone(&timezone, offset_hours, country_code),
        local_time: now.format("%Y-%m-%d %H:%M:%S %:z").to_string(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

/// 依次读取 `TZ`、`/etc/localtime` 链接目标、`/etc/timezone`
pub fn local_timezone() -> Option<String> {
    if let Ok(tz) = std::env::var("TZ") {
        let tz = tz.trim_start_matches(':').trim();
        if tz.contains('/') {
            return Some(zone_from_path(Path::new(tz)).unwrap_or_else(|| tz.to_string()));
        }
    }

    if let Ok(target) = std::fs::read_link(LOCALTIME)
        && let Some(zone) = zone_from_path(&target)
    {
        return Some(zone);
    }

    std::fs::read_to_string(TIMEZONE_FILE)
        .ok()
        .map(|content| content.trim().to_string())
        .filter(|zone| !zone.is_empty())
}

/// 从 `.../zoneinfo/Europe/Paris` 形式的路径中取出时区名
pub fn zone_from_path(path: &Path) -> Option<String> {
    let text = path.to_str()?;
    let (_, zone) = text.split_once("zoneinfo/")?;
    let zone = zone.trim_matches('/');
    (!zone.is_empty()).then(|| zone.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_from_path() {
        assert_eq!(
            zone_from_path(Path::new("/usr/share/zoneinfo/Europe/Paris")).as_deref(),
            Some("Europe/Paris")
        );
        assert_eq!(
            zone_from_path(Path::new("../usr/share/zoneinfo/America/Argentina/Buenos_Aires"))
                .as_deref(),
            Some("America/Argentina/Buenos_Aires")
        );
        assert_eq!(zone_from_path(Path::new("/etc/localtime")), None);
    }

    #[test]
    fn test_report_flattens_check() {
        let report = TimezoneReport {
            check: check_timezone("Europe/Paris", 1.0, Some("US")),
            local_time: "2024-05-01 14:03:22 +01:00".into(),
            timestamp: "2024-05-01T13:03:22.000Z".into(),
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["timezone"], "Europe/Paris");
        assert_eq!(value["leakDetected"], true);
        assert_eq!(value["localTime"], "2024-05-01 14:03:22 +01:00");
    }
}
