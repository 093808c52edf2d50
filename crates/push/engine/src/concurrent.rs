//! Concurrent APNs fan-out.

use std::collections::HashMap;
use std::sync::Arc;

use push_core::{Message, ProviderConfig};
use push_transport::{ApnsDelivery, ApnsTransport};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Send one request per token with bounded concurrency and a per-request
/// timeout, waiting for every request to resolve.
///
/// There is no fail-fast: a timeout or send error becomes a synthetic
/// failed delivery for that token only, and the aggregate always carries
/// exactly one delivery per submitted token.
pub async fn send_concurrent<A>(
    transport: Arc<A>,
    cfg: Arc<ProviderConfig>,
    message: Arc<Message>,
    tokens: Vec<String>,
) -> Vec<ApnsDelivery>
where
    A: ApnsTransport + 'static,
{
    let mut expected: HashMap<String, usize> = HashMap::new();
    for token in &tokens {
        *expected.entry(token.clone()).or_default() += 1;
    }

    let semaphore = Arc::new(Semaphore::new(cfg.concurrency.max(1)));
    let mut in_flight = JoinSet::new();

    for token in tokens {
        let transport = Arc::clone(&transport);
        let cfg = Arc::clone(&cfg);
        let message = Arc::clone(&message);
        let semaphore = Arc::clone(&semaphore);

        in_flight.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .expect("send semaphore closed");

            match tokio::time::timeout(cfg.timeout(), transport.send_one(&cfg, &token, &message))
                .await
            {
                Ok(delivery) => delivery,
                Err(_) => {
                    tracing::debug!(token = %token, "APNs request timed out");
                    ApnsDelivery::failed(token, "TimeoutError")
                }
            }
        });
    }

    let mut deliveries = Vec::new();
    while let Some(joined) = in_flight.join_next().await {
        match joined {
            Ok(delivery) => {
                if let Some(count) = expected.get_mut(&delivery.token) {
                    *count = count.saturating_sub(1);
                }
                deliveries.push(delivery);
            }
            Err(e) => tracing::error!(error = %e, "APNs send task failed to join"),
        }
    }

    // A panicked task would otherwise swallow its token; keep the
    // one-delivery-per-token invariant with synthetic failures.
    for (token, count) in expected {
        for _ in 0..count {
            deliveries.push(ApnsDelivery::failed(token.clone(), "CommunicationError"));
        }
    }

    deliveries
}

#[cfg(test)]
mod tests {
    use super::*;
    use push_core::{Credentials, TransportError};
    use push_transport::ApnsStatus;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn test_cfg(concurrency: usize, timeout_ms: u64) -> ProviderConfig {
        let mut cfg = ProviderConfig::new(Credentials::ApnsCertificate {
            certificate_path: "/dev/null".into(),
            password: String::new(),
            topic: "com.example.app".into(),
        });
        cfg.concurrency = concurrency;
        cfg.timeout_ms = timeout_ms;
        cfg
    }

    /// Transport that tracks concurrency and stalls on selected tokens.
    struct StubTransport {
        current: AtomicUsize,
        peak: AtomicUsize,
        stall: Vec<String>,
    }

    impl StubTransport {
        fn new(stall: Vec<String>) -> Self {
            Self {
                current: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                stall,
            }
        }
    }

    impl ApnsTransport for StubTransport {
        async fn prepare(&self, _cfg: &ProviderConfig) -> Result<(), TransportError> {
            Ok(())
        }

        async fn send_one(
            &self,
            _cfg: &ProviderConfig,
            token: &str,
            _message: &Message,
        ) -> ApnsDelivery {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            if self.stall.iter().any(|t| t == token) {
                tokio::time::sleep(Duration::from_secs(60)).await;
            } else {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }

            self.current.fetch_sub(1, Ordering::SeqCst);
            ApnsDelivery {
                token: token.to_string(),
                status: ApnsStatus::Delivered { apns_id: None },
            }
        }
    }

    #[tokio::test]
    async fn test_every_token_gets_exactly_one_delivery() {
        let transport = Arc::new(StubTransport::new(vec![]));
        let tokens: Vec<String> = (0..50).map(|i| format!("tok-{i}")).collect();

        let deliveries = send_concurrent(
            transport,
            Arc::new(test_cfg(8, 5000)),
            Arc::new(Message::plain("hi")),
            tokens.clone(),
        )
        .await;

        assert_eq!(deliveries.len(), tokens.len());
        let mut seen: Vec<&str> = deliveries.iter().map(|d| d.token.as_str()).collect();
        seen.sort_unstable();
        let mut wanted: Vec<&str> = tokens.iter().map(String::as_str).collect();
        wanted.sort_unstable();
        assert_eq!(seen, wanted);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let transport = Arc::new(StubTransport::new(vec![]));
        let tokens: Vec<String> = (0..40).map(|i| format!("tok-{i}")).collect();

        let _ = send_concurrent(
            Arc::clone(&transport),
            Arc::new(test_cfg(4, 5000)),
            Arc::new(Message::plain("hi")),
            tokens,
        )
        .await;

        assert!(transport.peak.load(Ordering::SeqCst) <= 4);
    }

    #[tokio::test]
    async fn test_timeout_becomes_synthetic_failure_without_fail_fast() {
        let transport = Arc::new(StubTransport::new(vec!["slow".into()]));
        let tokens = vec!["fast-1".to_string(), "slow".to_string(), "fast-2".to_string()];

        let deliveries = send_concurrent(
            transport,
            Arc::new(test_cfg(8, 100)),
            Arc::new(Message::plain("hi")),
            tokens,
        )
        .await;

        assert_eq!(deliveries.len(), 3);
        let slow = deliveries.iter().find(|d| d.token == "slow").unwrap();
        assert_eq!(
            slow.status,
            ApnsStatus::Failed {
                reason: "TimeoutError".into()
            }
        );
        assert_eq!(
            deliveries
                .iter()
                .filter(|d| matches!(d.status, ApnsStatus::Delivered { .. }))
                .count(),
            2
        );
    }
}
