//! 时区与地理位置一致性
//!
//! IANA 时区名先查城市级表，再按首段（如 "Europe"）查大洲级表，两者取并集。
//! 两张表都没有条目时不给出结论。

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 城市级时区 → 国家代码
const ZONE_COUNTRIES: &[(&str, &[&str])] = &[
    ("Europe/London", &["GB", "IM", "JE", "GG"]),
    ("Europe/Dublin", &["IE"]),
    ("Europe/Lisbon", &["PT"]),
    ("Europe/Paris", &["FR", "MC"]),
    ("Europe/Brussels", &["BE"]),
    ("Europe/Amsterdam", &["NL"]),
    ("Europe/Luxembourg", &["LU"]),
    ("Europe/Berlin", &["DE"]),
    ("Europe/Zurich", &["CH", "LI"]),
    ("Europe/Vienna", &["AT"]),
    ("Europe/Rome", &["IT", "SM", "VA"]),
    ("Europe/Madrid", &["ES"]),
    ("Europe/Copenhagen", &["DK"]),
    ("Europe/Oslo", &["NO", "SJ"]),
    ("Europe/Stockholm", &["SE"]),
    ("Europe/Helsinki", &["FI", "AX"]),
    ("Europe/Warsaw", &["PL"]),
    ("Europe/Prague", &["CZ", "SK"]),
    ("Europe/Budapest", &["HU"]),
    ("Europe/Bucharest", &["RO"]),
    ("Europe/Athens", &["GR"]),
    ("Europe/Istanbul", &["TR"]),
    ("Europe/Kiev", &["UA"]),
    ("Europe/Kyiv", &["UA"]),
    ("Europe/Moscow", &["RU"]),
    ("America/New_York", &["US"]),
    ("America/Chicago", &["US"]),
    ("America/Denver", &["US"]),
    ("America/Phoenix", &["US"]),
    ("America/Los_Angeles", &["US"]),
    ("America/Anchorage", &["US"]),
    ("America/Toronto", &["CA"]),
    ("America/Vancouver", &["CA"]),
    ("America/Mexico_City", &["MX"]),
    ("America/Bogota", &["CO"]),
    ("America/Lima", &["PE"]),
    ("America/Santiago", &["CL"]),
    ("America/Sao_Paulo", &["BR"]),
    ("America/Argentina/Buenos_Aires", &["AR"]),
    ("Asia/Tokyo", &["JP"]),
    ("Asia/Seoul", &["KR"]),
    ("Asia/Shanghai", &["CN"]),
    ("Asia/Hong_Kong", &["HK"]),
    ("Asia/Taipei", &["TW"]),
    ("Asia/Singapore", &["SG"]),
    ("Asia/Kuala_Lumpur", &["MY"]),
    ("Asia/Bangkok", &["TH", "VN", "LA", "KH"]),
    ("Asia/Jakarta", &["ID"]),
    ("Asia/Manila", &["PH"]),
    ("Asia/Kolkata", &["IN"]),
    ("Asia/Calcutta", &["IN"]),
    ("Asia/Karachi", &["PK"]),
    ("Asia/Dubai", &["AE", "OM"]),
    ("Asia/Jerusalem", &["IL"]),
    ("Asia/Tehran", &["IR"]),
    ("Australia/Sydney", &["AU"]),
    ("Australia/Melbourne", &["AU"]),
    ("Australia/Brisbane", &["AU"]),
    ("Australia/Perth", &["AU"]),
    ("Pacific/Auckland", &["NZ"]),
    ("Pacific/Honolulu", &["US"]),
    ("Africa/Cairo", &["EG"]),
    ("Africa/Johannesburg", &["ZA", "LS", "SZ"]),
    ("Africa/Lagos", &["NG"]),
    ("Africa/Nairobi", &["KE"]),
    ("Africa/Casablanca", &["MA", "EH"]),
];

/// 大洲级回退表，键为时区名的首段
const REGION_COUNTRIES: &[(&str, &[&str])] = &[
    (
        "Europe",
        &[
            "AD", "AL", "AT", "AX", "BA", "BE", "BG", "BY", "CH", "CY", "CZ", "DE", "DK", "EE",
            "ES", "FI", "FO", "FR", "GB", "GG", "GI", "GR", "HR", "HU", "IE", "IM", "IS", "IT",
            "JE", "LI", "LT", "LU", "LV", "MC", "MD", "ME", "MK", "MT", "NL", "NO", "PL", "PT",
            "RO", "RS", "RU", "SE", "SI", "SK", "SM", "TR", "UA", "VA", "XK",
        ],
    ),
    (
        "America",
        &[
            "AG", "AI", "AR", "AW", "BB", "BL", "BO", "BQ", "BR", "BS", "BZ", "CA", "CL", "CO",
            "CR", "CU", "CW", "DM", "DO", "EC", "GD", "GF", "GL", "GP", "GT", "GY", "HN", "HT",
            "JM", "KN", "KY", "LC", "MF", "MQ", "MS", "MX", "NI", "PA", "PE", "PM", "PR", "PY",
            "SR", "SV", "SX", "TC", "TT", "US", "UY", "VC", "VE", "VG", "VI",
        ],
    ),
    (
        "Asia",
        &[
            "AE", "AF", "AM", "AZ", "BD", "BH", "BN", "BT", "CN", "CY", "GE", "HK", "ID", "IL",
            "IN", "IQ", "IR", "JO", "JP", "KG", "KH", "KP", "KR", "KW", "KZ", "LA", "LB", "LK",
            "MM", "MN", "MO", "MV", "MY", "NP", "OM", "PH", "PK", "PS", "QA", "RU", "SA", "SG",
            "SY", "TH", "TJ", "TL", "TM", "TR", "TW", "UZ", "VN", "YE",
        ],
    ),
    (
        "Africa",
        &[
            "AO", "BF", "BI", "BJ", "BW", "CD", "CF", "CG", "CI", "CM", "CV", "DJ", "DZ", "EG",
            "EH", "ER", "ET", "GA", "GH", "GM", "GN", "GQ", "GW", "KE", "KM", "LR", "LS", "LY",
            "MA", "MG", "ML", "MR", "MU", "MW", "MZ", "NA", "NE", "NG", "RE", "RW", "SC", "SD",
            "SL", "SN", "SO", "SS", "ST", "SZ", "TD", "TG", "TN", "TZ", "UG", "YT", "ZA", "ZM",
            "ZW",
        ],
    ),
    ("Australia", &["AU"]),
    (
        "Pacific",
        &[
            "AS", "CK", "FJ", "FM", "GU", "KI", "MH", "MP", "NC", "NR", "NU", "NZ", "PF", "PG",
            "PN", "PW", "SB", "TK", "TO", "TV", "US", "VU", "WF", "WS",
        ],
    ),
    (
        "Atlantic",
        &["BM", "CV", "ES", "FK", "FO", "GS", "IS", "PT", "SH"],
    ),
    (
        "Indian",
        &["CC", "CX", "IO", "KM", "MG", "MU", "MV", "RE", "SC", "TF", "YT"],
    ),
    ("Antarctica", &["AQ"]),
];

/// 时区一致性检查结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimezoneCheck {
    pub timezone: String,
    pub utc_offset_hours: f64,
    /// 形如 "UTC+1"、"UTC-5"、"UTC+5.5"
    pub utc_offset: String,
    pub expected_country_codes: BTreeSet<String>,
    /// 是否得出了结论（时区有表项且已知国家）
    pub evaluated: bool,
    pub leak_detected: bool,
    pub reason: Option<String>,
}

/// 返回某时区预期的国家代码集合（城市级 ∪ 大洲级）
pub fn expected_countries(timezone: &str) -> BTreeSet<String> {
    let mut expected = BTreeSet::new();

    if let Some((_, codes)) = ZONE_COUNTRIES.iter().find(|(zone, _)| *zone == timezone) {
        expected.extend(codes.iter().map(|c| c.to_string()));
    }

    let region = timezone.split('/').next().unwrap_or_default();
    if let Some((_, codes)) = REGION_COUNTRIES.iter().find(|(r, _)| *r == region) {
        expected.extend(codes.iter().map(|c| c.to_string()));
    }

    expected
}

pub fn format_utc_offset(hours: f64) -> String {
    let sign = if hours >= 0.0 { "+" } else { "-" };
    let abs = hours.abs();
    if abs.fract() == 0.0 {
        format!("UTC{sign}{}", abs as i64)
    } else {
        format!("UTC{sign}{abs}")
    }
}

/// 检查时区与 IP 所在国家是否一致
pub fn check_timezone(timezone: &str, utc_offset_hours: f64, country: Option<&str>) -> TimezoneCheck {
    let expected = expected_countries(timezone);
    let country = country
        .map(|c| c.trim().to_ascii_uppercase())
        .filter(|c| !c.is_empty());

    let mut check = TimezoneCheck {
        timezone: timezone.to_string(),
        utc_offset_hours,
        utc_offset: format_utc_offset(utc_offset_hours),
        expected_country_codes: expected,
        evaluated: false,
        leak_detected: false,
        reason: None,
    };

    let Some(country) = country else {
        return check;
    };
    if check.expected_country_codes.is_empty() {
        return check;
    }

    check.evaluated = true;
    if !check.expected_country_codes.contains(&country) {
        check.leak_detected = true;
        check.reason = Some(format!(
            "Timezone {timezone} does not match IP country {country}"
        ));
    }
    check
}
