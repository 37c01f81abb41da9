//! Periodic cache refresh deadline
//!
//! The scheduler only holds a deadline. The service loop sleeps until it and
//! then hands control back to the controller, which submits the refresh and
//! re-arms once that refresh completes.

use std::time::Duration;
use tokio::time::Instant;

use upkeep_config::RefreshConfig;

#[derive(Debug, Clone)]
pub struct RefreshScheduler {
    interval: Duration,
    enabled: bool,
    deadline: Option<Instant>,
}

impl RefreshScheduler {
    #[must_use]
    pub fn new(config: &RefreshConfig) -> Self {
        Self {
            interval: config.interval(),
            enabled: config.enabled,
            deadline: None,
        }
    }

    /// Schedule the next refresh one interval after `now`
    pub fn arm(&mut self, now: Instant) {
        if self.enabled {
            self.deadline = Some(now + self.interval);
        }
    }

    pub fn disarm(&mut self) {
        self.deadline = None;
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Consume the deadline if it has passed
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(enabled: bool) -> RefreshConfig {
        RefreshConfig {
            enabled,
            interval_secs: 60,
        }
    }

    #[test]
    fn test_arm_and_take() {
        let mut scheduler = RefreshScheduler::new(&config(true));
        let now = Instant::now();
        assert!(!scheduler.take_due(now));

        scheduler.arm(now);
        assert_eq!(scheduler.deadline(), Some(now + Duration::from_secs(60)));
        assert!(!scheduler.take_due(now + Duration::from_secs(59)));
        assert!(scheduler.take_due(now + Duration::from_secs(60)));
        assert!(scheduler.deadline().is_none());
    }

    #[test]
    fn test_disabled_never_arms() {
        let mut scheduler = RefreshScheduler::new(&config(false));
        scheduler.arm(Instant::now());
        assert!(scheduler.deadline().is_none());
    }

    #[test]
    fn test_disarm() {
        let mut scheduler = RefreshScheduler::new(&config(true));
        scheduler.arm(Instant::now());
        scheduler.disarm();
        assert!(scheduler.deadline().is_none());
    }
}
