use async_trait::async_trait;
use parking_lot::Mutex;
use std::fmt::Debug;
use std::time::Duration;

/// How backoff delays between attempts are spent.
#[async_trait]
pub trait Sleeper: Send + Sync + Debug {
    /// Block the calling thread.
    fn sleep(&self, duration: Duration);

    /// Suspend the current task without blocking the runtime.
    async fn sleep_async(&self, duration: Duration);
}

/// Sleeps for real.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealSleeper;

#[async_trait]
impl Sleeper for RealSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }

    async fn sleep_async(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Records requested delays and returns immediately.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.sleeps.lock().len()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.sleeps.lock().push(duration);
    }

    async fn sleep_async(&self, duration: Duration) {
        self.sleeps.lock().push(duration);
    }
}
