/// Minimum spacing between outbound exchange requests

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

#[derive(Debug)]
pub struct RequestPacer {
    min_interval: Duration,
    next_slot: Mutex<Instant>,
}

impl RequestPacer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            next_slot: Mutex::new(Instant::now()),
        }
    }

    /// Waits for the next free slot. Callers are served in lock order.
    pub async fn wait(&self) {
        if self.min_interval.is_zero() {
            return;
        }

        let mut next = self.next_slot.lock().await;
        let now = Instant::now();
        if *next > now {
            sleep_until(*next).await;
        }
        *next = (*next).max(now) + self.min_interval;
    }
}
