use crate::error::NetworkError;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// HTTP 服务绑定配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HttpBindConfig {
    /// 域名
    ///
    /// 用于生成对外展示的 URL。
    pub domain_name: String,

    /// 公网 IP 地址
    ///
    /// 服务对外宣告的 IP 地址。在 NAT 或反向代理之后，这通常是入口的公网 IP。
    pub advertised_ip: String,

    /// 绑定 IP 地址
    ///
    /// 通常使用 "0.0.0.0" 监听所有接口。
    pub ip: String,

    /// 绑定端口
    pub port: u16,
}

impl Default for HttpBindConfig {
    fn default() -> Self {
        Self {
            domain_name: "localhost".to_string(),
            advertised_ip: "127.0.0.1".to_string(),
            ip: "0.0.0.0".to_string(),
            port: 8787,
        }
    }
}

impl HttpBindConfig {
    /// 解析监听地址
    pub fn socket_addr(&self) -> Result<SocketAddr, NetworkError> {
        format!("{}:{}", self.ip, self.port)
            .parse()
            .map_err(|_| NetworkError::InvalidAddress {
                address: format!("{}:{}", self.ip, self.port),
            })
    }

    /// 对外访问地址
    pub fn public_url(&self) -> String {
        format!("http://{}:{}", self.domain_name, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_addr() {
        let config = HttpBindConfig::default();
        assert_eq!(config.socket_addr().unwrap().port(), 8787);

        let bad = HttpBindConfig {
            ip: "not-an-ip".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            bad.socket_addr(),
            Err(NetworkError::InvalidAddress { .. })
        ));
    }
}
