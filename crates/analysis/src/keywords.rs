//! 关键字表
//!
//! 有序的 `(keyword, label)` 列表，首个命中生效。匹配时输入已转为小写。

pub type KeywordList = &'static [(&'static str, &'static str)];

/// 住宅宽带运营商白名单
pub const RESIDENTIAL: KeywordList = &[
    ("isp", "ISP"),
    ("broadband", "Broadband"),
    ("telecom", "Telecom"),
    ("mobile", "Mobile"),
    ("cable", "Cable"),
    ("communications", "Communications"),
    ("internet services", "Internet Services"),
    ("telecommunication", "Telecommunication"),
];

pub const VPN_PROVIDERS: KeywordList = &[
    ("vpn", "VPN"),
    ("virtual private", "Virtual Private Network"),
    ("proxy", "Proxy"),
    ("anonymizer", "Anonymizer"),
    ("nordvpn", "NordVPN"),
    ("expressvpn", "ExpressVPN"),
    ("mullvad", "Mullvad"),
    ("protonvpn", "ProtonVPN"),
    ("surfshark", "Surfshark"),
    ("cyberghost", "CyberGhost"),
    ("private internet access", "Private Internet Access"),
    ("pia", "Private Internet Access"),
    ("windscribe", "Windscribe"),
    ("vyprvpn", "VyprVPN"),
    ("tunnelbear", "TunnelBear"),
    ("hidemyass", "HideMyAss"),
    ("ipvanish", "IPVanish"),
    ("zenmate", "ZenMate"),
    ("strongvpn", "StrongVPN"),
];

pub const DATACENTERS: KeywordList = &[
    ("amazon", "Amazon"),
    ("aws", "AWS"),
    ("google cloud", "Google Cloud"),
    ("microsoft azure", "Microsoft Azure"),
    ("digitalocean", "DigitalOcean"),
    ("ovh", "OVH"),
    ("hetzner", "Hetzner"),
    ("linode", "Linode"),
    ("vultr", "Vultr"),
    ("cloudflare", "Cloudflare"),
    ("m247", "M247"),
    ("leaseweb", "LeaseWeb"),
    ("choopa", "Choopa"),
    ("datacamp", "DataCamp"),
    ("frantech", "FranTech"),
    ("online.net", "Online.net"),
    ("scaleway", "Scaleway"),
    ("contabo", "Contabo"),
    ("interserver", "InterServer"),
    ("fastly", "Fastly"),
    ("stackpath", "StackPath"),
];

/// 公共 DNS 服务商
pub const PUBLIC_DNS_PROVIDERS: KeywordList = &[
    ("google", "Google"),
    ("cloudflare", "Cloudflare"),
    ("quad9", "Quad9"),
    ("opendns", "OpenDNS"),
];

/// 返回第一个出现在 `haystack`（需已小写）中的关键字对应的标签
pub fn first_match(haystack: &str, list: KeywordList) -> Option<&'static str> {
    list.iter()
        .find(|(keyword, _)| haystack.contains(keyword))
        .map(|(_, label)| *label)
}
