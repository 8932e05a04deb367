//! Readiness polling for locally started servers
//!
//! Polls a health probe at a fixed interval until it reports ready or the
//! attempt budget is spent.

use crate::error::{LabError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::sleep;

/// Outcome of a single health probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeStatus {
    Ready,
    /// Not ready yet; the reason is logged
    NotReady(String),
}

#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// What is being probed, for messages (usually the health URL)
    fn target(&self) -> String;

    async fn probe(&self) -> ProbeStatus;
}

/// Poll settings
#[derive(Debug, Clone)]
pub struct WaitConfig {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            interval: Duration::from_secs(1),
        }
    }
}

/// Block until `probe` reports ready.
///
/// Returns the 1-based attempt that succeeded. The interval is slept after
/// every unsuccessful probe, including the last one, so a timeout never
/// happens before `max_attempts * interval` has elapsed.
pub async fn wait_ready(probe: &dyn HealthProbe, config: &WaitConfig) -> Result<u32> {
    for attempt in 1..=config.max_attempts {
        match probe.probe().await {
            ProbeStatus::Ready => {
                tracing::debug!("{} ready after {} attempt(s)", probe.target(), attempt);
                return Ok(attempt);
            }
            ProbeStatus::NotReady(reason) => {
                tracing::debug!(
                    "{} not ready ({}/{}): {}",
                    probe.target(),
                    attempt,
                    config.max_attempts,
                    reason
                );
            }
        }
        sleep(config.interval).await;
    }

    Err(LabError::ReadinessTimeout {
        target: probe.target(),
        attempts: config.max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingProbe {
        calls: AtomicU32,
        ready_on: Option<u32>,
    }

    #[async_trait]
    impl HealthProbe for CountingProbe {
        fn target(&self) -> String {
            "http://127.0.0.1:8200/v1/sys/health".to_string()
        }

        async fn probe(&self) -> ProbeStatus {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            match self.ready_on {
                Some(ready) if n >= ready => ProbeStatus::Ready,
                _ => ProbeStatus::NotReady("connection refused".to_string()),
            }
        }
    }

    /// Exhaustion takes the full attempt budget on the clock
    #[tokio::test(start_paused = true)]
    async fn test_timeout_after_exact_attempts() {
        let probe = CountingProbe {
            calls: AtomicU32::new(0),
            ready_on: None,
        };
        let start = tokio::time::Instant::now();

        let err = wait_ready(&probe, &WaitConfig::default()).await.unwrap_err();

        assert!(matches!(err, LabError::ReadinessTimeout { attempts: 30, .. }));
        assert_eq!(probe.calls.load(Ordering::SeqCst), 30);
        assert!(start.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_on_third_attempt() {
        let probe = CountingProbe {
            calls: AtomicU32::new(0),
            ready_on: Some(3),
        };

        let attempt = wait_ready(&probe, &WaitConfig::default()).await.unwrap();

        assert_eq!(attempt, 3);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 3);
    }
}
