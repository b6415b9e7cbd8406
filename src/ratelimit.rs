/// Per-actor action quotas
///
/// One limiter serves every action kind: each kind carries its own
/// `RateLimitPolicy` (actions per fixed window plus an optional lockout), and
/// counters are keyed by `(kind, actor)`. A window resets once it expires.
/// When the policy has a lockout, the first rejected attempt locks the actor
/// out of that kind for the lockout duration.
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

use crate::{
    arguments::is_debug_stars_enabled,
    config::RateLimitPolicy,
    errors::{AppError, AppResult},
    logger::{self, LogTag},
};

/// Purge expired counters once the table grows past this many keys
const PURGE_THRESHOLD: usize = 4096;

#[derive(Debug, Clone)]
struct Counter {
    window_start: Instant,
    count: u32,
    locked_until: Option<Instant>,
}

impl Counter {
    fn fresh(now: Instant) -> Self {
        Self {
            window_start: now,
            count: 0,
            locked_until: None,
        }
    }

    fn is_stale(&self, policy: &RateLimitPolicy, now: Instant) -> bool {
        let window_over = now >= self.window_start + policy.window();
        let lock_over = self.locked_until.map(|until| now >= until).unwrap_or(true);
        window_over && lock_over
    }
}

pub struct QuotaLimiter {
    policies: HashMap<String, RateLimitPolicy>,
    counters: Mutex<HashMap<(String, String), Counter>>,
}

impl QuotaLimiter {
    pub fn new(policies: HashMap<String, RateLimitPolicy>) -> Self {
        Self {
            policies,
            counters: Mutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self, kind: &str) -> Option<&RateLimitPolicy> {
        self.policies.get(kind)
    }

    /// Record one attempt of `kind` by `actor`, or reject it with a retry hint.
    /// Kinds without a policy are unlimited.
    pub fn check(&self, kind: &str, actor: &str) -> AppResult<()> {
        let Some(policy) = self.policies.get(kind) else {
            return Ok(());
        };

        let now = Instant::now();
        let mut counters = self.counters.lock();
        if counters.len() > PURGE_THRESHOLD {
            self.purge_locked(&mut counters, now);
        }

        let counter = counters
            .entry((kind.to_string(), actor.to_string()))
            .or_insert_with(|| Counter::fresh(now));

        if let Some(until) = counter.locked_until {
            if now < until {
                return Err(limited(kind, until - now, true));
            }
            counter.locked_until = None;
        }

        let window_end = counter.window_start + policy.window();
        if now >= window_end {
            *counter = Counter::fresh(now);
        }

        if counter.count < policy.max_actions {
            counter.count += 1;
            return Ok(());
        }

        if let Some(lockout) = policy.lockout() {
            counter.locked_until = Some(now + lockout);
            logger::warning(
                LogTag::Stars,
                &format!("Actor {} locked out of {} for {}s", actor, kind, lockout.as_secs()),
            );
            return Err(limited(kind, lockout, true));
        }

        if is_debug_stars_enabled() {
            logger::debug(
                LogTag::Stars,
                &format!("Actor {} over {} quota ({})", actor, kind, policy.max_actions),
            );
        }
        Err(limited(kind, window_end - now, false))
    }

    /// Attempts left in the current window (`None` for unlimited kinds)
    pub fn remaining(&self, kind: &str, actor: &str) -> Option<u32> {
        let policy = self.policies.get(kind)?;
        let now = Instant::now();
        let counters = self.counters.lock();
        let used = match counters.get(&(kind.to_string(), actor.to_string())) {
            Some(counter) if counter.locked_until.map(|u| now < u).unwrap_or(false) => {
                return Some(0)
            }
            Some(counter) if now < counter.window_start + policy.window() => counter.count,
            _ => 0,
        };
        Some(policy.max_actions.saturating_sub(used))
    }

    /// Drop counters whose window and lockout have both passed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut counters = self.counters.lock();
        self.purge_locked(&mut counters, now)
    }

    fn purge_locked(&self, counters: &mut HashMap<(String, String), Counter>, now: Instant) -> usize {
        let before = counters.len();
        counters.retain(|(kind, _), counter| match self.policies.get(kind) {
            Some(policy) => !counter.is_stale(policy, now),
            None => false,
        });
        before - counters.len()
    }

    pub fn tracked_keys(&self) -> usize {
        self.counters.lock().len()
    }
}

fn limited(kind: &str, wait: Duration, locked_out: bool) -> AppError {
    // round up so a client never retries a fraction of a second too early
    let mut secs = wait.as_secs();
    if wait.subsec_nanos() > 0 {
        secs += 1;
    }
    AppError::RateLimited {
        kind: kind.to_string(),
        retry_after_secs: secs.max(1),
        locked_out,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ACTION_PLATFORM_INVITE, ACTION_PROFILE_STAR};

    fn limiter() -> QuotaLimiter {
        let mut policies = HashMap::new();
        policies.insert(ACTION_PROFILE_STAR.to_string(), RateLimitPolicy::new(3, 60, 0));
        policies.insert(ACTION_PLATFORM_INVITE.to_string(), RateLimitPolicy::new(2, 60, 900));
        QuotaLimiter::new(policies)
    }

    #[tokio::test(start_paused = true)]
    async fn test_exactly_n_actions_per_window() {
        let limiter = limiter();
        for _ in 0..3 {
            limiter.check(ACTION_PROFILE_STAR, "alice").unwrap();
        }

        tokio::time::advance(Duration::from_secs(20)).await;
        match limiter.check(ACTION_PROFILE_STAR, "alice") {
            Err(AppError::RateLimited {
                retry_after_secs,
                locked_out,
                ..
            }) => {
                assert_eq!(retry_after_secs, 40);
                assert!(!locked_out);
            }
            other => panic!("expected rate limit, got {:?}", other),
        }

        // other actors have their own counters
        limiter.check(ACTION_PROFILE_STAR, "bob").unwrap();
        assert_eq!(limiter.remaining(ACTION_PROFILE_STAR, "alice"), Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_resets() {
        let limiter = limiter();
        for _ in 0..3 {
            limiter.check(ACTION_PROFILE_STAR, "alice").unwrap();
        }
        assert!(limiter.check(ACTION_PROFILE_STAR, "alice").is_err());

        tokio::time::advance(Duration::from_secs(60)).await;
        limiter.check(ACTION_PROFILE_STAR, "alice").unwrap();
        assert_eq!(limiter.remaining(ACTION_PROFILE_STAR, "alice"), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_lockout_outlasts_window() {
        let limiter = limiter();
        limiter.check(ACTION_PLATFORM_INVITE, "alice").unwrap();
        limiter.check(ACTION_PLATFORM_INVITE, "alice").unwrap();

        let err = limiter.check(ACTION_PLATFORM_INVITE, "alice").unwrap_err();
        assert_eq!(err.retry_after(), Some(900));
        assert!(matches!(err, AppError::RateLimited { locked_out: true, .. }));

        // the window has rolled over but the lockout still holds
        tokio::time::advance(Duration::from_secs(120)).await;
        let err = limiter.check(ACTION_PLATFORM_INVITE, "alice").unwrap_err();
        assert_eq!(err.retry_after(), Some(780));

        tokio::time::advance(Duration::from_secs(780)).await;
        limiter.check(ACTION_PLATFORM_INVITE, "alice").unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_kind_is_unlimited_and_purge() {
        let limiter = limiter();
        for _ in 0..100 {
            limiter.check("unlisted", "alice").unwrap();
        }
        assert_eq!(limiter.remaining("unlisted", "alice"), None);

        limiter.check(ACTION_PROFILE_STAR, "alice").unwrap();
        assert_eq!(limiter.tracked_keys(), 1);
        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(limiter.purge_expired(), 1);
        assert_eq!(limiter.tracked_keys(), 0);
    }
}
