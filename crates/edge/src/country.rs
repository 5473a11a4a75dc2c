//! 国家代码 → 国家名称

use analysis::TOR_COUNTRY_CODE;

const COUNTRY_NAMES: &[(&str, &str)] = &[
    ("US", "United States"),
    ("GB", "United Kingdom"),
    ("CA", "Canada"),
    ("AU", "Australia"),
    ("DE", "Germany"),
    ("FR", "France"),
    ("IT", "Italy"),
    ("ES", "Spain"),
    ("NL", "Netherlands"),
    ("SE", "Sweden"),
    ("NO", "Norway"),
    ("DK", "Denmark"),
    ("FI", "Finland"),
    ("PL", "Poland"),
    ("RU", "Russia"),
    ("CN", "China"),
    ("JP", "Japan"),
    ("KR", "South Korea"),
    ("IN", "India"),
    ("BR", "Brazil"),
    ("MX", "Mexico"),
    ("AR", "Argentina"),
    ("CL", "Chile"),
    ("CO", "Colombia"),
    ("ZA", "South Africa"),
    ("EG", "Egypt"),
    ("NG", "Nigeria"),
    ("KE", "Kenya"),
    ("SG", "Singapore"),
    ("MY", "Malaysia"),
    ("TH", "Thailand"),
    ("ID", "Indonesia"),
    ("PH", "Philippines"),
    ("VN", "Vietnam"),
    ("TR", "Turkey"),
    ("SA", "Saudi Arabia"),
    ("AE", "United Arab Emirates"),
    ("IR", "Iran"),
    ("IQ", "Iraq"),
    ("IL", "Israel"),
    ("PK", "Pakistan"),
    ("BD", "Bangladesh"),
    ("UA", "Ukraine"),
    ("RO", "Romania"),
    ("CZ", "Czech Republic"),
    ("GR", "Greece"),
    ("PT", "Portugal"),
    ("BE", "Belgium"),
    ("AT", "Austria"),
    ("CH", "Switzerland"),
    ("IE", "Ireland"),
    ("NZ", "New Zealand"),
];

/// 未收录的代码原样返回，缺失时返回 "Unknown"
pub fn country_name(code: Option<&str>) -> String {
    let Some(code) = code else {
        return "Unknown".to_string();
    };
    if code == TOR_COUNTRY_CODE {
        return "Tor Network".to_string();
    }
    COUNTRY_NAMES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| code.to_string())
}
