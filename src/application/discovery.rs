//! Surface discovery: poll a locator until a surface shows up

use std::time::Duration;

use thiserror::Error;
use tokio::time::sleep;

use super::ports::SurfaceLocator;

/// Discovery errors
#[derive(Debug, Clone, Error)]
pub enum DiscoveryError {
    #[error("No capture surface found after {attempts} attempts")]
    NotFound { attempts: u32 },
}

/// Probe `locator` immediately, then every `interval`, until it yields a surface.
///
/// `max_attempts = None` polls forever.
pub async fn discover_surface<L: SurfaceLocator>(
    locator: &L,
    interval: Duration,
    max_attempts: Option<u32>,
) -> Result<L::Surface, DiscoveryError> {
    let mut attempts: u32 = 0;
    loop {
        attempts = attempts.saturating_add(1);
        if let Some(surface) = locator.probe().await {
            tracing::debug!(attempts, "capture surface found");
            return Ok(surface);
        }
        if max_attempts.is_some_and(|max| attempts >= max) {
            return Err(DiscoveryError::NotFound { attempts });
        }
        tracing::trace!(attempts, "capture surface not ready, retrying");
        sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{CaptureError, CaptureSurface, MediaStream};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    struct TestSurface;

    impl CaptureSurface for TestSurface {
        fn capture_stream(&self) -> Result<MediaStream, CaptureError> {
            Ok(MediaStream {
                input_format: "lavfi".to_string(),
                input: "testsrc".to_string(),
                frame_rate: 30,
            })
        }

        fn describe(&self) -> String {
            "test".to_string()
        }
    }

    /// Appears after `ready_after` probes
    struct DelayedLocator {
        probes: AtomicU32,
        ready_after: u32,
    }

    impl DelayedLocator {
        fn new(ready_after: u32) -> Self {
            Self {
                probes: AtomicU32::new(0),
                ready_after,
            }
        }
    }

    #[async_trait]
    impl SurfaceLocator for DelayedLocator {
        type Surface = TestSurface;

        async fn probe(&self) -> Option<TestSurface> {
            let n = self.probes.fetch_add(1, Ordering::SeqCst) + 1;
            (n >= self.ready_after).then_some(TestSurface)
        }
    }

    #[tokio::test]
    async fn found_on_first_probe() {
        let locator = DelayedLocator::new(1);
        let result = discover_surface(&locator, Duration::from_millis(1), Some(3)).await;
        assert!(result.is_ok());
        assert_eq!(locator.probes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn found_after_retries() {
        let locator = DelayedLocator::new(4);
        let result = discover_surface(&locator, Duration::from_millis(1), None).await;
        assert!(result.is_ok());
        assert_eq!(locator.probes.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn bounded_retry_gives_up() {
        let locator = DelayedLocator::new(100);
        let err = discover_surface(&locator, Duration::from_millis(1), Some(3))
            .await
            .unwrap_err();
        let DiscoveryError::NotFound { attempts } = err;
        assert_eq!(attempts, 3);
        assert_eq!(locator.probes.load(Ordering::SeqCst), 3);
    }
}
