use std::time::Duration;
use tracing::info;

/// Fixed delay between sends plus a longer pause after every full batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttle {
    pub delay: Duration,
    pub batch_size: usize,
    pub batch_pause: Duration,
}

impl Throttle {
    pub fn new(delay: Duration, batch_size: usize, batch_pause: Duration) -> Self {
        Self { delay, batch_size, batch_pause }
    }

    /// No waiting at all
    pub fn none() -> Self {
        Self::new(Duration::ZERO, 0, Duration::ZERO)
    }

    /// Wait after item `index` (zero-based) of `total`. Nothing follows
    /// the last item.
    pub fn pause_after(&self, index: usize, total: usize) -> Option<Duration> {
        if index + 1 >= total {
            return None;
        }
        let pause = if self.batch_size > 0 && (index + 1) % self.batch_size == 0 {
            self.batch_pause
        } else {
            self.delay
        };
        (!pause.is_zero()).then_some(pause)
    }

    pub async fn wait(&self, index: usize, total: usize) {
        if let Some(pause) = self.pause_after(index, total) {
            if pause == self.batch_pause && pause != self.delay {
                info!("Batch of {} sent, pausing {}s", self.batch_size, pause.as_secs());
            }
            tokio::time::sleep(pause).await;
        }
    }
}
