//! Fixed pacing between consecutive sub-fetches against one provider.

use std::time::Duration;

use tokio::time::Instant;

/// Enforces a minimum pause between the end of one sub-fetch and the start
/// of the next.
///
/// Callers wait with [`ready`](Throttle::ready) before a request and mark
/// its completion with [`done`](Throttle::done). The first request never
/// waits.
#[derive(Debug)]
pub struct Throttle {
    delay: Duration,
    finished: Option<Instant>,
}

impl Throttle {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            finished: None,
        }
    }

    #[must_use]
    pub fn from_millis(delay_ms: u64) -> Self {
        Self::new(Duration::from_millis(delay_ms))
    }

    /// Wait until `delay` has passed since the previous request finished.
    pub async fn ready(&self) {
        if let Some(finished) = self.finished {
            let due = finished + self.delay;
            if due > Instant::now() {
                tracing::trace!(delay_ms = self.delay.as_millis(), "throttling sub-fetch");
                tokio::time::sleep_until(due).await;
            }
        }
    }

    /// Record that the current request has finished, successfully or not.
    pub fn done(&mut self) {
        self.finished = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn first_call_does_not_wait() {
        let throttle = Throttle::from_millis(5_000);
        let started = Instant::now();
        throttle.ready().await;
        assert!(started.elapsed() < Duration::from_millis(1_000));
    }

    #[tokio::test]
    async fn consecutive_calls_are_spaced_by_the_delay() {
        let calls = Arc::new(AtomicU32::new(0));
        let mut throttle = Throttle::from_millis(30);
        let started = Instant::now();

        for _ in 0..3 {
            throttle.ready().await;
            calls.fetch_add(1, Ordering::SeqCst);
            throttle.done();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(started.elapsed() >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn zero_delay_never_sleeps() {
        let mut throttle = Throttle::from_millis(0);
        let started = Instant::now();
        for _ in 0..100 {
            throttle.ready().await;
            throttle.done();
        }
        assert!(started.elapsed() < Duration::from_millis(1_000));
    }

    #[tokio::test]
    async fn delay_counts_from_the_end_of_a_slow_request() {
        let mut throttle = Throttle::from_millis(50);

        throttle.ready().await;
        tokio::time::sleep(Duration::from_millis(80)).await;
        throttle.done();
        let finished = Instant::now();

        throttle.ready().await;
        assert!(finished.elapsed() >= Duration::from_millis(50));
    }
}
