//! WebRTC ICE 候选采集
//!
//! 建立一个只有数据通道的本地 PeerConnection，向 STUN 服务器发起候选收集，
//! 在固定时间窗口内记录出现过的地址。窗口结束后强制关闭连接，
//! 不等待 gathering-complete。

use crate::error::Result;
use analysis::{IceAddress, IceAddressCollector};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::ice_transport::ice_candidate::RTCIceCandidate;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;

/// candidate 行的来源
///
/// `start` 之后把每个 candidate 行写入 `tx`；再次 `start` 前必须关闭上一次的连接。
#[async_trait]
pub trait CandidateSource: Send {
    async fn start(&mut self, tx: mpsc::UnboundedSender<String>) -> Result<()>;

    async fn close(&mut self) -> Result<()>;
}

/// 基于 webrtc-rs 的候选来源
pub struct WebRtcCandidateSource {
    stun_servers: Vec<String>,
    connection: Option<Arc<RTCPeerConnection>>,
}

impl WebRtcCandidateSource {
    pub fn new(stun_servers: Vec<String>) -> Self {
        Self {
            stun_servers,
            connection: None,
        }
    }
}

#[async_trait]
impl CandidateSource for WebRtcCandidateSource {
    async fn start(&mut self, tx: mpsc::UnboundedSender<String>) -> Result<()> {
        self.close().await?;

        let api = APIBuilder::new().build();
        let config = RTCConfiguration {
            ice_servers: vec![RTCIceServer {
                urls: self.stun_servers.clone(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let connection = Arc::new(api.new_peer_connection(config).await?);
        // 先登记连接，后续步骤失败时也能由 close 回收
        self.connection = Some(connection.clone());

        if let Err(e) = negotiate(&connection, tx).await {
            warn!("ICE gathering setup failed: {}", e);
            if let Err(close_err) = self.close().await {
                warn!("Failed to close peer connection after setup failure: {}", close_err);
            }
            return Err(e);
        }

        info!(
            "Started ICE gathering with {} STUN server(s)",
            self.stun_servers.len()
        );
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(connection) = self.connection.take() {
            debug!("Closing previous peer connection");
            connection.close().await?;
        }
        Ok(())
    }
}

/// 注册候选回调并设置本地 offer，触发候选收集
async fn negotiate(
    connection: &RTCPeerConnection,
    tx: mpsc::UnboundedSender<String>,
) -> Result<()> {
    connection.on_ice_candidate(Box::new(move |candidate: Option<RTCIceCandidate>| {
        let tx = tx.clone();
        Box::pin(async move {
            // None 表示本轮收集结束
            let Some(candidate) = candidate else {
                debug!("ICE gathering reported complete");
                return;
            };
            match candidate.to_json() {
                Ok(init) => {
                    let _ = tx.send(init.candidate);
                }
                Err(e) => warn!("Failed to serialize ICE candidate: {}", e),
            }
        })
    }));

    connection.create_data_channel("", None).await?;
    let offer = connection.create_offer(None).await?;
    connection.set_local_description(offer).await?;
    Ok(())
}

/// 在固定窗口内采集并去重 ICE 地址
///
/// 去重状态归属于本探测实例，每次 [`gather`](Self::gather) 开始时清空。
pub struct IceProbe<S: CandidateSource> {
    source: S,
    collector: IceAddressCollector,
    window: Duration,
}

impl<S: CandidateSource> IceProbe<S> {
    pub fn new(source: S, window: Duration) -> Self {
        Self {
            source,
            collector: IceAddressCollector::new(),
            window,
        }
    }

    /// 采集一轮，每个新地址首次出现时回调 `on_address`
    ///
    /// 来源提前关闭通道时提前结束。
    pub async fn gather<F>(&mut self, mut on_address: F) -> Result<Vec<IceAddress>>
    where
        F: FnMut(&IceAddress) + Send,
    {
        self.collector.reset();

        let (tx, mut rx) = mpsc::unbounded_channel();
        if let Err(e) = self.source.start(tx).await {
            // 来源可能已经建立了部分资源
            if let Err(close_err) = self.source.close().await {
                warn!("Failed to close candidate source: {}", close_err);
            }
            return Err(e);
        }

        let deadline = tokio::time::sleep(self.window);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut deadline => {
                    debug!("ICE gathering window of {:?} elapsed", self.window);
                    break;
                }
                line = rx.recv() => match line {
                    Some(line) => {
                        if let Some(address) = self.collector.observe(&line, Utc::now()) {
                            debug!("Discovered {} ({})", address.ip, address.label);
                            on_address(&address);
                        }
                    }
                    None => break,
                },
            }
        }

        if let Err(e) = self.source.close().await {
            warn!("Failed to close candidate source: {}", e);
        }

        info!("ICE gathering found {} address(es)", self.collector.len());
        Ok(self.collector.addresses().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProbeError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 按时间表发送 candidate 行的假来源
    struct ScriptedSource {
        script: Vec<(u64, &'static str)>,
        starts: Arc<AtomicUsize>,
        closes: Arc<AtomicUsize>,
        fail: bool,
        fail_after_open: bool,
        hang_up: bool,
    }

    impl ScriptedSource {
        fn new(script: Vec<(u64, &'static str)>) -> Self {
            Self {
                script,
                starts: Arc::new(AtomicUsize::new(0)),
                closes: Arc::new(AtomicUsize::new(0)),
                fail: false,
                fail_after_open: false,
                hang_up: false,
            }
        }
    }

    #[async_trait]
    impl CandidateSource for ScriptedSource {
        async fn start(&mut self, tx: mpsc::UnboundedSender<String>) -> Result<()> {
            if self.fail {
                return Err(ProbeError::unavailable("peer connection"));
            }
            self.starts.fetch_add(1, Ordering::SeqCst);
            if self.fail_after_open {
                return Err(ProbeError::parse("offer rejected"));
            }
            let script = self.script.clone();
            let hang_up = self.hang_up;
            tokio::spawn(async move {
                for (delay_ms, line) in script {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    if tx.send(line.to_string()).is_err() {
                        return;
                    }
                }
                if hang_up {
                    return;
                }
                // 保持通道打开，模拟真实连接
                std::future::pending::<()>().await;
            });
            Ok(())
        }

        async fn close(&mut self) -> Result<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    const HOST: &str = "candidate:1 1 udp 2122260223 192.168.1.20 54400 typ host";
    const SRFLX: &str =
        "candidate:2 1 udp 1686052607 203.0.113.9 61000 typ srflx raddr 192.168.1.20 rport 54400";
    const LATE: &str = "candidate:3 1 udp 1686052607 198.51.100.1 61001 typ srflx";

    #[tokio::test(start_paused = true)]
    async fn test_window_bounds_gathering() {
        let source = ScriptedSource::new(vec![(10, HOST), (10, HOST), (1000, SRFLX), (10_000, LATE)]);
        let closes = source.closes.clone();
        let mut probe = IceProbe::new(source, Duration::from_secs(5));

        let mut realtime = Vec::new();
        let addresses = probe
            .gather(|a| realtime.push(a.ip.clone()))
            .await
            .unwrap();

        let ips: Vec<_> = addresses.iter().map(|a| a.ip.as_str()).collect();
        assert_eq!(ips, vec!["192.168.1.20", "203.0.113.9"]);
        assert_eq!(realtime, vec!["192.168.1.20", "203.0.113.9"]);
        assert_eq!(addresses[0].label, "Private IPv4 (Class C)");
        assert!(addresses[1].is_public());
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_run_starts_fresh() {
        let source = ScriptedSource::new(vec![(10, HOST)]);
        let starts = source.starts.clone();
        let mut probe = IceProbe::new(source, Duration::from_secs(5));

        let first = probe.gather(|_| {}).await.unwrap();
        let mut events = 0;
        let second = probe.gather(|_| events += 1).await.unwrap();

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_eq!(events, 1);
        assert_eq!(starts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_start_failure_propagates() {
        let mut source = ScriptedSource::new(vec![]);
        source.fail = true;
        let mut probe = IceProbe::new(source, Duration::from_secs(5));
        let result = probe.gather(|_| {}).await;
        assert!(matches!(result, Err(ProbeError::Unavailable { .. })));
    }

    #[tokio::test]
    async fn test_setup_failure_after_open_closes_source() {
        let mut source = ScriptedSource::new(vec![]);
        source.fail_after_open = true;
        let starts = source.starts.clone();
        let closes = source.closes.clone();
        let mut probe = IceProbe::new(source, Duration::from_secs(5));

        let result = probe.gather(|_| {}).await;
        assert!(matches!(result, Err(ProbeError::Parse { .. })));
        assert_eq!(starts.load(Ordering::SeqCst), 1);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_channel_ends_gathering_early() {
        let mut source = ScriptedSource::new(vec![(10, HOST), (10, SRFLX)]);
        source.hang_up = true;
        let closes = source.closes.clone();
        let window = Duration::from_secs(5);
        let mut probe = IceProbe::new(source, window);

        let started = tokio::time::Instant::now();
        let addresses = probe.gather(|_| {}).await.unwrap();

        assert!(started.elapsed() < window);
        assert_eq!(addresses.len(), 2);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }
}
