//! Token-bucket rate limiting for external lookups.
use crate::error::{ChemError, Result};
use log::debug;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Pre-filled token bucket replenished by a background ticker.
///
/// The bucket is a bounded channel: capacity equals the configured
/// requests-per-second, the refill task feeds one token per tick and drops
/// tokens the bucket has no room for. Must be created inside a tokio
/// runtime. [`RateLimiter::shutdown`] stops the refill task; it is safe to
/// call more than once.
pub struct RateLimiter {
    tokens: Mutex<mpsc::Receiver<()>>,
    stop: CancellationToken,
    refill: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl RateLimiter {
    pub fn new(requests_per_second: u32) -> Self {
        let rps = requests_per_second.max(1);
        let (tx, rx) = mpsc::channel::<()>(rps as usize);
        for _ in 0..rps {
            // Cannot fail: the channel was sized for exactly this many.
            let _ = tx.try_send(());
        }

        let stop = CancellationToken::new();
        let ticker_stop = stop.clone();
        let period = Duration::from_millis((1000 / u64::from(rps)).max(1));
        let refill = tokio::spawn(async move {
            // First tick one period out; the bucket starts full already.
            let mut ticker =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = ticker_stop.cancelled() => break,
                    _ = ticker.tick() => {
                        // A full bucket just drops the token.
                        let _ = tx.try_send(());
                    }
                }
            }
            debug!("rate limiter refill task stopped");
        });

        Self {
            tokens: Mutex::new(rx),
            stop,
            refill: std::sync::Mutex::new(Some(refill)),
        }
    }

    /// Blocks until a token is available or `cancel` fires, whichever comes
    /// first. Cancellation wins immediately even while queued behind other
    /// waiters.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<()> {
        tokio::select! {
            _ = cancel.cancelled() => Err(ChemError::Cancelled),
            token = async {
                let mut rx = self.tokens.lock().await;
                rx.recv().await
            } => token.map(|_| ()).ok_or(ChemError::RateLimiterClosed),
        }
    }

    /// Stops the refill task. Tokens already in the bucket remain usable;
    /// once they are drained, `acquire` returns [`ChemError::RateLimiterClosed`].
    pub fn shutdown(&self) {
        self.stop.cancel();
        if let Ok(mut guard) = self.refill.lock() {
            guard.take();
        }
    }
}

impl Drop for RateLimiter {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn prefilled_tokens_are_immediately_available() {
        let limiter = RateLimiter::new(5);
        let cancel = CancellationToken::new();
        for _ in 0..5 {
            limiter.acquire(&cancel).await.unwrap();
        }
        limiter.shutdown();
    }

    #[tokio::test]
    async fn cancellation_interrupts_empty_bucket() {
        let limiter = RateLimiter::new(1);
        let cancel = CancellationToken::new();
        limiter.acquire(&cancel).await.unwrap(); // drain the bucket

        let start = Instant::now();
        let waiter_cancel = cancel.clone();
        let waiter = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            waiter_cancel.cancel();
        });
        let result = limiter.acquire(&cancel).await;
        waiter.await.unwrap();
        assert!(matches!(result, Err(ChemError::Cancelled)));
        assert!(start.elapsed() < Duration::from_millis(900));
        limiter.shutdown();
    }

    #[tokio::test]
    async fn refill_replenishes_tokens() {
        let limiter = RateLimiter::new(10); // 100 ms per token
        let cancel = CancellationToken::new();
        for _ in 0..10 {
            limiter.acquire(&cancel).await.unwrap();
        }
        // Bucket empty; the next acquire must wait for the ticker.
        let start = Instant::now();
        limiter.acquire(&cancel).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(30));
        limiter.shutdown();
    }

    #[tokio::test]
    async fn shutdown_is_idempotent_and_closes_after_drain() {
        let limiter = RateLimiter::new(1);
        limiter.shutdown();
        limiter.shutdown();
        let cancel = CancellationToken::new();
        // The pre-filled token is still there, then the bucket is closed.
        limiter.acquire(&cancel).await.unwrap();
        let result = limiter.acquire(&cancel).await;
        assert!(matches!(result, Err(ChemError::RateLimiterClosed)));
    }
}
