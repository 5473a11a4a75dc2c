//! 本地泄漏检测
//!
//! 在运行 `leakscope check` 的主机上完成浏览器端检测的等价工作：
//! 从多个第三方服务观测公网地址、通过 WebRTC 收集 ICE 候选、检查 DNS 可达性、
//! 收集主机指纹面、比较时区与 IP 所在地，并探测本地端口。

pub mod dns;
pub mod edge_client;
pub mod error;
pub mod host;
pub mod ports;
pub mod retry;
pub mod run;
pub mod services;
pub mod timezone;
pub mod webrtc;

pub use dns::{DnsProbe, DnsProbeResult};
pub use edge_client::EdgeClient;
pub use error::{ProbeError, Result};
pub use host::{HostFingerprint, NOT_AVAILABLE};
pub use ports::{PortProbe, PortProbeResult, PortStatus};
pub use retry::fetch_with_retry;
pub use run::{LeakReport, LeakTestRun, ProbeEvent, RunAnalysis, TOTAL_TESTS};
pub use services::{IpLookup, IpServices};
pub use timezone::TimezoneReport;
pub use webrtc::{CandidateSource, IceProbe, WebRtcCandidateSource};
