//! Join requests for locked secondaries.
//!
//! A request moves from `Requested` to exactly one of `Approved`, `Denied`
//! or `Expired`. Only the secondary's owner may answer, the first answer
//! wins, and an unanswered request expires after the configured timeout.
//! The table drops expired requests, and requests whose waiter went away,
//! the next time it is touched.

use crate::{LifecycleController, OwnershipManager};
use derive_getters::Getters;
use dynavoice_core::{ChannelId, GuildId, MemberId};
use dynavoice_error::{LifecycleError, LifecycleErrorKind, LifecycleResult};
use dynavoice_interface::GuildSettingsStore;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, info, instrument};

/// The owner's answer to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum JoinDecision {
    /// Let the requester in
    Approve,
    /// Turn the requester away
    Deny,
}

/// Terminal state of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum JoinOutcome {
    /// The requester was granted connect permission
    Approved,
    /// The owner declined
    Denied,
    /// Nobody answered in time
    Expired,
}

/// Identifies a pending request; handed to the command layer to prompt the owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Getters, Serialize, Deserialize)]
pub struct JoinTicket {
    request_id: u64,
    requester: MemberId,
    secondary: ChannelId,
    owner: MemberId,
}

/// A request waiting for its outcome.
#[derive(Debug)]
pub struct PendingJoin {
    ticket: JoinTicket,
    receiver: oneshot::Receiver<JoinDecision>,
}

impl PendingJoin {
    /// The request's ticket.
    pub fn ticket(&self) -> &JoinTicket {
        &self.ticket
    }
}

#[derive(Debug)]
struct Waiting {
    ticket: JoinTicket,
    sender: oneshot::Sender<JoinDecision>,
    expires_at: Instant,
}

impl Waiting {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at && !self.sender.is_closed()
    }
}

fn sweep(pending: &mut HashMap<u64, Waiting>) {
    let now = Instant::now();
    pending.retain(|id, waiting| {
        let live = waiting.is_live(now);
        if !live {
            debug!(request_id = *id, "Dropping stale join request");
        }
        live
    });
}

fn resolved(request_id: u64) -> LifecycleError {
    LifecycleError::new(LifecycleErrorKind::Conflict(format!(
        "join request {request_id} is already resolved or expired"
    )))
}

/// Table of pending join requests.
#[derive(Debug, Clone)]
pub struct JoinRequests {
    controller: LifecycleController,
    ownership: OwnershipManager,
    pending: Arc<Mutex<HashMap<u64, Waiting>>>,
    next_id: Arc<AtomicU64>,
    timeout: Duration,
}

impl JoinRequests {
    /// Create an empty table using the controller's join request timeout.
    pub fn new(controller: LifecycleController) -> Self {
        let timeout = controller.config().join_request_timeout();
        Self::with_timeout(controller, timeout)
    }

    /// Create an empty table with an explicit timeout.
    pub fn with_timeout(controller: LifecycleController, timeout: Duration) -> Self {
        Self {
            ownership: OwnershipManager::new(controller.clone()),
            controller,
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
            timeout,
        }
    }

    /// Open a request by `requester` to join `secondary`.
    ///
    /// # Errors
    ///
    /// - `PermissionDenied` if the guild does not allow join requests
    /// - `NotFound` if `secondary` is not a known secondary of the guild
    /// - `Validation` if the secondary is not locked or the requester owns it
    #[instrument(skip(self))]
    pub async fn request(
        &self,
        guild: GuildId,
        requester: MemberId,
        secondary: ChannelId,
    ) -> LifecycleResult<PendingJoin> {
        let store = self.controller.store();
        let settings = self
            .controller
            .call("get_settings", || store.get_settings(guild))
            .await?;
        if !settings.allow_join_requests {
            return Err(LifecycleError::new(LifecycleErrorKind::PermissionDenied(
                "join requests are disabled in this guild".to_string(),
            )));
        }

        let target = self
            .controller
            .registry()
            .secondary(secondary)
            .filter(|s| s.guild_id == guild)
            .ok_or_else(|| LifecycleError::not_found(format!("secondary {secondary}")))?;
        if !target.locked {
            return Err(LifecycleError::validation(format!(
                "secondary {secondary} is not locked"
            )));
        }
        if target.creator_id == requester {
            return Err(LifecycleError::validation(
                "the owner cannot request to join their own channel",
            ));
        }

        let ticket = JoinTicket {
            request_id: self.next_id.fetch_add(1, Ordering::Relaxed),
            requester,
            secondary,
            owner: target.creator_id,
        };
        let (sender, receiver) = oneshot::channel();
        let mut pending = self.pending.lock();
        sweep(&mut pending);
        pending.insert(
            ticket.request_id,
            Waiting {
                ticket,
                sender,
                expires_at: Instant::now() + self.timeout,
            },
        );
        drop(pending);
        info!(request_id = ticket.request_id, owner = %ticket.owner, "Join requested");
        Ok(PendingJoin { ticket, receiver })
    }

    /// Answer a pending request.
    ///
    /// # Errors
    ///
    /// - `PermissionDenied` if `responder` does not own the secondary; the
    ///   request stays pending
    /// - `Conflict` if the request was already resolved, expired, never
    ///   existed, or its requester stopped waiting
    #[instrument(skip(self))]
    pub fn respond(
        &self,
        request_id: u64,
        responder: MemberId,
        decision: JoinDecision,
    ) -> LifecycleResult<JoinTicket> {
        let mut pending = self.pending.lock();
        sweep(&mut pending);
        let Some(waiting) = pending.get(&request_id) else {
            return Err(resolved(request_id));
        };
        if responder != waiting.ticket.owner {
            return Err(LifecycleError::new(LifecycleErrorKind::PermissionDenied(
                "only the channel owner can answer a join request".to_string(),
            )));
        }

        let Some(waiting) = pending.remove(&request_id) else {
            return Err(resolved(request_id));
        };
        if waiting.sender.send(decision).is_err() {
            return Err(LifecycleError::new(LifecycleErrorKind::Conflict(format!(
                "join request {request_id} is no longer awaited"
            ))));
        }
        debug!(request_id, %decision, "Join request answered");
        Ok(waiting.ticket)
    }

    /// Wait for the owner's answer and apply it.
    ///
    /// An approval grants the requester a connect allow on the secondary.
    #[instrument(skip(self, pending), fields(request_id = pending.ticket.request_id))]
    pub async fn await_outcome(&self, pending: PendingJoin) -> LifecycleResult<JoinOutcome> {
        let PendingJoin {
            ticket,
            mut receiver,
        } = pending;

        let decision = match tokio::time::timeout(self.timeout, &mut receiver).await {
            Ok(Ok(decision)) => Some(decision),
            Ok(Err(_)) => None,
            Err(_) => {
                if self.pending.lock().remove(&ticket.request_id).is_some() {
                    None
                } else {
                    // answered between the deadline and the removal
                    receiver.try_recv().ok()
                }
            }
        };

        let outcome = match decision {
            Some(JoinDecision::Approve) => {
                self.ownership
                    .allow_member(ticket.secondary, ticket.requester)
                    .await?;
                JoinOutcome::Approved
            }
            Some(JoinDecision::Deny) => JoinOutcome::Denied,
            None => JoinOutcome::Expired,
        };
        info!(%outcome, requester = %ticket.requester, "Join request resolved");
        Ok(outcome)
    }

    /// Number of unresolved requests.
    pub fn pending_count(&self) -> usize {
        let mut pending = self.pending.lock();
        sweep(&mut pending);
        pending.len()
    }
}
