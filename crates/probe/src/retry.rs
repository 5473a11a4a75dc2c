use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// 重试包装
///
/// 最多调用 `probe` `max_retries` 次（含首次），`None` 视为失败；两次尝试之间
/// 固定等待 `delay`，最后一次失败后不再等待。返回第一个 `Some`，全部失败返回 `None`。
pub async fn fetch_with_retry<T, F, Fut>(mut probe: F, max_retries: u32, delay: Duration) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    for attempt in 0..max_retries {
        if let Some(value) = probe().await {
            return Some(value);
        }
        if attempt + 1 < max_retries {
            debug!("Attempt {}/{} returned nothing, retrying", attempt + 1, max_retries);
            tokio::time::sleep(delay).await;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn scripted(results: Vec<Option<u32>>) -> (Arc<AtomicU32>, impl FnMut() -> std::future::Ready<Option<u32>>) {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let probe = move || {
            let n = counter.fetch_add(1, Ordering::SeqCst) as usize;
            std::future::ready(results.get(n).copied().flatten())
        };
        (calls, probe)
    }

    #[tokio::test(start_paused = true)]
    async fn test_third_success_is_out_of_reach() {
        let (calls, probe) = scripted(vec![None, None, Some(7)]);
        let start = Instant::now();

        let result = fetch_with_retry(probe, 2, Duration::from_secs(1)).await;

        assert_eq!(result, None);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        // 只在两次尝试之间等待一次
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(1));
        assert!(elapsed < Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_attempt_succeeds() {
        let (calls, probe) = scripted(vec![None, Some(42)]);
        let result = fetch_with_retry(probe, 2, Duration::from_secs(1)).await;
        assert_eq!(result, Some(42));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_success_skips_delay() {
        let (calls, probe) = scripted(vec![Some(1)]);
        let start = Instant::now();
        let result = fetch_with_retry(probe, 3, Duration::from_secs(1)).await;
        assert_eq!(result, Some(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_zero_attempts() {
        let (calls, probe) = scripted(vec![Some(1)]);
        assert_eq!(fetch_with_retry(probe, 0, Duration::ZERO).await, None);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
