//! Free-tier usage counter
//!
//! Counts admitted requests as timestamps. Timestamps are never evicted, so
//! the count is cumulative for the life of the stored session even though a
//! nominal window is configured.

use chrono::{DateTime, Duration, Utc};

use crate::config::UsageConfig;

/// Gate over the `questionUsage` list of a session. Built over `&mut Vec`
/// to record usage, or over a shared slice for read-only queries.
#[derive(Debug)]
pub struct UsageCounter<S> {
    stamps: S,
    limit: usize,
    window: Duration,
}

impl<S: AsRef<[DateTime<Utc>]>> UsageCounter<S> {
    pub fn new(stamps: S, config: &UsageConfig) -> Self {
        Self {
            stamps,
            limit: config.free_tier_limit,
            window: Duration::seconds(config.window_secs as i64),
        }
    }

    pub fn count(&self) -> usize {
        self.stamps.as_ref().len()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Whether a free-tier user has used up the allowance. Premium users are
    /// never over the limit.
    pub fn is_over_limit(&self, is_premium: bool) -> bool {
        !is_premium && self.count() >= self.limit
    }

    /// Requests left before gating; `None` when unlimited
    pub fn remaining(&self, is_premium: bool) -> Option<usize> {
        if is_premium {
            None
        } else {
            Some(self.limit.saturating_sub(self.count()))
        }
    }

    /// Nominal rate-limit window
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Requests recorded inside the window ending at `now`. Informational
    /// only; gating uses the cumulative count.
    pub fn usage_in_window(&self, now: DateTime<Utc>) -> usize {
        let start = now - self.window;
        self.stamps
            .as_ref()
            .iter()
            .filter(|s| **s > start && **s <= now)
            .count()
    }
}

impl UsageCounter<&mut Vec<DateTime<Utc>>> {
    /// Record one admitted request
    pub fn record_usage(&mut self, now: DateTime<Utc>) {
        self.stamps.push(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(limit: usize) -> UsageConfig {
        UsageConfig {
            free_tier_limit: limit,
            window_secs: 3600,
        }
    }

    #[test]
    fn test_under_limit() {
        let mut stamps = Vec::new();
        let cfg = config(5);
        let mut counter = UsageCounter::new(&mut stamps, &cfg);
        for _ in 0..4 {
            counter.record_usage(Utc::now());
        }
        assert_eq!(counter.count(), 4);
        assert!(!counter.is_over_limit(false));
        assert_eq!(counter.remaining(false), Some(1));
    }

    #[test]
    fn test_reaching_limit() {
        let mut stamps = Vec::new();
        let cfg = config(5);
        let mut counter = UsageCounter::new(&mut stamps, &cfg);
        for _ in 0..5 {
            counter.record_usage(Utc::now());
        }
        assert!(counter.is_over_limit(false));
        assert_eq!(counter.remaining(false), Some(0));
    }

    #[test]
    fn test_premium_bypasses_limit() {
        let stamps = vec![Utc::now(); 50];
        let cfg = config(5);
        let counter = UsageCounter::new(stamps.as_slice(), &cfg);
        assert!(!counter.is_over_limit(true));
        assert_eq!(counter.remaining(true), None);
    }

    #[test]
    fn test_old_usage_is_not_evicted() {
        let now = Utc::now();
        let stamps = vec![now - Duration::hours(5); 5];
        let cfg = config(5);
        let counter = UsageCounter::new(&stamps, &cfg);

        assert_eq!(counter.usage_in_window(now), 0);
        assert!(counter.is_over_limit(false));
    }

    #[test]
    fn test_usage_in_window_counts_recent_only() {
        let now = Utc::now();
        let mut stamps = vec![
            now - Duration::minutes(90),
            now - Duration::minutes(30),
            now - Duration::minutes(1),
        ];
        let cfg = config(5);
        let counter = UsageCounter::new(&mut stamps, &cfg);
        assert_eq!(counter.window(), Duration::hours(1));
        assert_eq!(counter.usage_in_window(now), 2);
    }
}
