//! Per-channel rename quota using governor.
//!
//! The platform only accepts a couple of renames per channel in a ten minute
//! window; renames beyond that are queued server side for minutes. The quota
//! keeps the rename job from issuing calls the platform would stall.

use crate::RenameQuotaConfig;
use dynavoice_core::ChannelId;
use dynavoice_error::{LifecycleError, LifecycleErrorKind, LifecycleResult};
use governor::clock::{Clock, DefaultClock};
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

type KeyedLimiter = RateLimiter<ChannelId, DefaultKeyedStateStore<ChannelId>, DefaultClock>;

/// Keyed rename limiter; unlimited when built without configuration.
#[derive(Clone, Default)]
pub struct RenameQuota {
    limiter: Option<Arc<KeyedLimiter>>,
}

impl std::fmt::Debug for RenameQuota {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenameQuota")
            .field("limited", &self.limiter.is_some())
            .finish()
    }
}

impl RenameQuota {
    /// Build a quota; `None` or a zero burst disables it.
    pub fn new(config: Option<&RenameQuotaConfig>) -> Self {
        let limiter = config.and_then(|c| {
            let burst = NonZeroU32::new(c.burst)?;
            let replenish = Duration::from_secs(c.period_secs) / burst.get();
            Quota::with_period(replenish)
                .map(|q| Arc::new(RateLimiter::keyed(q.allow_burst(burst))))
        });
        Self { limiter }
    }

    /// A quota that never limits.
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// Whether the quota limits anything.
    pub fn is_limited(&self) -> bool {
        self.limiter.is_some()
    }

    /// Take a rename slot for `channel` without waiting.
    ///
    /// # Errors
    ///
    /// Returns `RateLimited` carrying the wait time when no slot is free.
    pub fn check(&self, channel: ChannelId) -> LifecycleResult<()> {
        match self.wait_time(channel) {
            None => Ok(()),
            Some(wait) => Err(LifecycleError::new(LifecycleErrorKind::RateLimited {
                operation: format!("rename {channel}"),
                retry_after_ms: Some(wait.as_millis() as u64),
            })),
        }
    }

    /// Drop limiter state for channels that have fully replenished.
    pub fn housekeeping(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.retain_recent();
            limiter.shrink_to_fit();
        }
    }

    fn wait_time(&self, channel: ChannelId) -> Option<Duration> {
        let limiter = self.limiter.as_ref()?;
        limiter
            .check_key(&channel)
            .err()
            .map(|not_until| not_until.wait_time_from(DefaultClock::default().now()))
    }
}
