//! Per-resource job coalescing.
//!
//! Each id is in one of three states: idle (no entry), scheduled (a timer is
//! counting down the quiet interval) or running. Enqueueing a scheduled id does
//! nothing; enqueueing a running id marks it dirty, and a dirty id gets exactly
//! one follow-up job once the running one finishes. A deferred id waits for the
//! longer of its deferral and the quiet interval.

use async_trait::async_trait;
use dynavoice_core::ChannelId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Work executed for an id once its quiet interval elapsed.
#[async_trait]
pub trait JobRunner: Send + Sync {
    /// Run the job for `id`.
    async fn run(&self, id: ChannelId);
}

#[derive(Debug)]
enum Slot {
    Scheduled { generation: u64, timer: JoinHandle<()> },
    Running { follow_up: Option<Duration> },
}

struct Shared {
    delay: Duration,
    runner: Arc<dyn JobRunner>,
    slots: Mutex<HashMap<ChannelId, Slot>>,
    generation: AtomicU64,
}

/// Coalescing scheduler with at most one queued or running job per id.
#[derive(Clone)]
pub struct Debouncer {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Debouncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debouncer")
            .field("delay", &self.shared.delay)
            .field("slots", &self.shared.slots.lock().len())
            .finish()
    }
}

impl Debouncer {
    /// Create a scheduler that runs `runner` after `delay` of quiet.
    pub fn new(delay: Duration, runner: Arc<dyn JobRunner>) -> Self {
        Self {
            shared: Arc::new(Shared {
                delay,
                runner,
                slots: Mutex::new(HashMap::new()),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Request a job for `id`.
    ///
    /// Returns true if a new job was scheduled.
    pub fn enqueue(&self, id: ChannelId) -> bool {
        let mut slots = self.shared.slots.lock();
        match slots.get_mut(&id) {
            None => {
                let slot = self.schedule(id, self.shared.delay);
                slots.insert(id, slot);
                trace!(%id, "Job scheduled");
                true
            }
            Some(Slot::Scheduled { .. }) => false,
            Some(Slot::Running { follow_up }) => {
                let delay = self.shared.delay;
                *follow_up = Some(follow_up.map_or(delay, |d| d.max(delay)));
                trace!(%id, "Job running, marked dirty");
                false
            }
        }
    }

    /// Request a job for `id` no sooner than `after` from now.
    ///
    /// A job that is already queued keeps its timer. Returns true if a new
    /// job was scheduled.
    pub fn defer(&self, id: ChannelId, after: Duration) -> bool {
        let after = after.max(self.shared.delay);
        let mut slots = self.shared.slots.lock();
        match slots.get_mut(&id) {
            None => {
                let slot = self.schedule(id, after);
                slots.insert(id, slot);
                debug!(%id, ?after, "Job deferred");
                true
            }
            Some(Slot::Scheduled { .. }) => false,
            Some(Slot::Running { follow_up }) => {
                *follow_up = Some(follow_up.map_or(after, |d| d.max(after)));
                debug!(%id, ?after, "Follow-up job deferred");
                false
            }
        }
    }

    /// Drop the queued job for `id` and suppress any follow-up.
    ///
    /// A job that is already running completes.
    pub fn cancel(&self, id: ChannelId) {
        if let Some(Slot::Scheduled { timer, .. }) = self.shared.slots.lock().remove(&id) {
            timer.abort();
            debug!(%id, "Queued job cancelled");
        }
    }

    /// Whether a job for `id` is queued or running.
    pub fn is_pending(&self, id: ChannelId) -> bool {
        self.shared.slots.lock().contains_key(&id)
    }

    /// Number of ids with a queued or running job.
    pub fn pending_count(&self) -> usize {
        self.shared.slots.lock().len()
    }

    /// Abort every queued job.
    pub fn shutdown(&self) {
        let mut slots = self.shared.slots.lock();
        for (_, slot) in slots.drain() {
            if let Slot::Scheduled { timer, .. } = slot {
                timer.abort();
            }
        }
    }

    fn schedule(&self, id: ChannelId, delay: Duration) -> Slot {
        let generation = self.shared.generation.fetch_add(1, Ordering::Relaxed);
        let this = self.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            this.fire(id, generation).await;
        });
        Slot::Scheduled { generation, timer }
    }

    async fn fire(&self, id: ChannelId, generation: u64) {
        {
            let mut slots = self.shared.slots.lock();
            match slots.get(&id) {
                Some(Slot::Scheduled { generation: g, .. }) if *g == generation => {
                    slots.insert(id, Slot::Running { follow_up: None });
                }
                _ => return,
            }
        }

        trace!(%id, "Running job");
        self.shared.runner.run(id).await;

        let mut slots = self.shared.slots.lock();
        let follow_up = match slots.get(&id) {
            Some(Slot::Running { follow_up }) => *follow_up,
            // cancelled, or re-enqueued after a cancel
            _ => return,
        };
        match follow_up {
            Some(delay) => {
                let slot = self.schedule(id, delay);
                slots.insert(id, slot);
                trace!(%id, "Follow-up job scheduled");
            }
            None => {
                slots.remove(&id);
            }
        }
    }
}
