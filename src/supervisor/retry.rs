use std::time::Duration;
use tokio::time::sleep;

/// Retry budget with a constant pause between attempts
#[derive(Debug, Clone)]
pub struct FixedDelayRetry {
    delay: Duration,
    max_attempts: u32,
    current_attempt: u32,
}

#[derive(Debug)]
pub struct MaxRetriesExceeded;

impl std::fmt::Display for MaxRetriesExceeded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Maximum retry attempts exceeded")
    }
}

impl std::error::Error for MaxRetriesExceeded {}

impl FixedDelayRetry {
    /// `max_attempts` counts the first attempt; values below 1 are raised to 1.
    pub fn new(delay: Duration, max_attempts: u32) -> Self {
        Self {
            delay,
            max_attempts: max_attempts.max(1),
            current_attempt: 1,
        }
    }

    /// 1-based number of the attempt about to run (or just run)
    pub fn attempt(&self) -> u32 {
        self.current_attempt
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Sleep before the next attempt, or fail if the budget is spent.
    pub async fn sleep(&mut self) -> Result<(), MaxRetriesExceeded> {
        if self.current_attempt >= self.max_attempts {
            return Err(MaxRetriesExceeded);
        }

        log::warn!(
            "⏳ Retry attempt {} of {} in {:?}",
            self.current_attempt + 1,
            self.max_attempts,
            self.delay
        );

        sleep(self.delay).await;
        self.current_attempt += 1;
        Ok(())
    }
}
