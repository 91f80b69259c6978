//! The lifecycle controller.
//!
//! Consumes membership changes and drives each secondary through
//! `Absent -> Active <-> Locked -> Deleted`. Every read-then-write on a
//! secondary runs under that secondary's lock; spawning runs under the
//! primary's lock. When both are needed the primary is always locked first.

use crate::{Debouncer, JobRunner, Registry, ResourceLocks};
use async_trait::async_trait;
use dynavoice_core::{
    ChannelId, LifecycleEvent, MAX_NAME_LENGTH, MemberId, NameContext, OccupancySnapshot, Primary,
    Secondary, SecondaryBuilder, SecondaryPatch, VoiceStateChange, render, truncate_name,
};
use dynavoice_error::{LifecycleError, LifecycleErrorKind, LifecycleResult};
use dynavoice_interface::{
    AliasStore, EventPublisher, GuildSettingsStore, OverrideSubject, PermissionOverride,
    PrimaryStore, SecondaryStore, Store, TextChannelSpecBuilder, VoiceChannelSpecBuilder,
    VoicePlatform,
};
use dynavoice_rate_limit::{CallPolicy, DynavoiceConfig, LifecycleConfig, RenameQuota};
use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// Result of reconciling one secondary against store and platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ReconcileOutcome {
    /// Store and platform agree
    InSync,
    /// The platform channel was gone or empty; the secondary was removed
    Deleted,
    /// The persisted record was missing and has been written again
    Restored,
}

/// Summary of a startup reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Secondaries examined
    pub checked: usize,
    /// Secondaries deleted because they were gone or empty
    pub deleted: usize,
    /// Secondaries whose record was re-created
    pub restored: usize,
    /// Secondaries left marked for a later attempt
    pub failed: usize,
}

pub(crate) struct Inner {
    platform: Arc<dyn VoicePlatform>,
    store: Arc<dyn Store>,
    publisher: Arc<dyn EventPublisher>,
    registry: Registry,
    locks: ResourceLocks,
    debouncer: Debouncer,
    policy: CallPolicy,
    quota: RenameQuota,
    config: LifecycleConfig,
}

/// Debounced rename job; holds the controller weakly so a shut down
/// controller is not kept alive by pending timers.
struct RenameRunner {
    inner: Weak<Inner>,
}

#[async_trait]
impl JobRunner for RenameRunner {
    async fn run(&self, id: ChannelId) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        let controller = LifecycleController { inner };
        if let Err(e) = controller.refresh_secondary(id).await {
            controller.note_failure(id, "refresh", &e);
        }
    }
}

/// Concurrency-safe state machine for secondary channels.
///
/// Cheap to clone; clones share the registry, locks and scheduler.
///
/// # Example
///
/// ```no_run
/// use dynavoice_interface::InMemoryStore;
/// use dynavoice_lifecycle::{LifecycleController, TracingPublisher};
/// use dynavoice_rate_limit::DynavoiceConfig;
/// use std::sync::Arc;
///
/// # async fn example(platform: Arc<dyn dynavoice_interface::VoicePlatform>) {
/// let controller = LifecycleController::new(
///     platform,
///     Arc::new(InMemoryStore::new()),
///     Arc::new(TracingPublisher),
///     &DynavoiceConfig::default(),
/// );
/// let report = controller.start().await.unwrap();
/// println!("{} secondaries checked", report.checked);
/// # }
/// ```
#[derive(Clone)]
pub struct LifecycleController {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for LifecycleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleController")
            .field("registry", &self.inner.registry)
            .field("debouncer", &self.inner.debouncer)
            .field("policy", &self.inner.policy)
            .field("quota", &self.inner.quota)
            .finish()
    }
}

impl LifecycleController {
    /// Wire a controller to its collaborators.
    pub fn new(
        platform: Arc<dyn VoicePlatform>,
        store: Arc<dyn Store>,
        publisher: Arc<dyn EventPublisher>,
        config: &DynavoiceConfig,
    ) -> Self {
        let inner = Arc::new_cyclic(|weak: &Weak<Inner>| Inner {
            platform,
            store,
            publisher,
            registry: Registry::new(),
            locks: ResourceLocks::default(),
            debouncer: Debouncer::new(
                config.lifecycle.rename_debounce(),
                Arc::new(RenameRunner {
                    inner: weak.clone(),
                }),
            ),
            policy: CallPolicy::new(&config.calls),
            quota: RenameQuota::new(config.rename_quota.as_ref()),
            config: config.lifecycle,
        });
        Self { inner }
    }

    /// Load the registry from the store and reconcile every secondary.
    ///
    /// Secondaries whose platform channel is gone or empty are deleted;
    /// survivors get a rename job since membership may have changed while
    /// the process was down.
    #[instrument(skip(self))]
    pub async fn start(&self) -> LifecycleResult<ReconcileReport> {
        let store = &self.inner.store;
        let primaries = self.call("list_primaries", || store.list_primaries()).await?;
        let secondaries = self
            .call("list_secondaries", || store.list_secondaries())
            .await?;
        self.inner.registry.load(primaries, secondaries);

        let mut report = ReconcileReport::default();
        for id in self.inner.registry.secondary_ids() {
            self.inner.registry.take_reconcile(id);
            report.checked += 1;
            match self.reconcile(id).await {
                Ok(ReconcileOutcome::InSync) => {
                    self.request_rename(id);
                }
                Ok(ReconcileOutcome::Deleted) => report.deleted += 1,
                Ok(ReconcileOutcome::Restored) => {
                    report.restored += 1;
                    self.request_rename(id);
                }
                Err(e) => {
                    report.failed += 1;
                    self.note_failure(id, "reconcile", &e);
                }
            }
        }

        info!(
            primaries = self.inner.registry.primary_count(),
            checked = report.checked,
            deleted = report.deleted,
            restored = report.restored,
            failed = report.failed,
            "Startup reconciliation finished"
        );
        Ok(report)
    }

    /// Abort queued jobs and drop the registry.
    pub fn shutdown(&self) {
        self.inner.debouncer.shutdown();
        self.inner.registry.clear();
        info!("Lifecycle controller shut down");
    }

    /// Drop rename quota state for channels that have fully replenished.
    pub fn housekeeping(&self) {
        self.inner.quota.housekeeping();
    }

    /// Process a voice state change: the leave side first, then the enter side.
    ///
    /// Failures are logged; no failure is fatal to the caller.
    #[instrument(skip(self, change), fields(member = %change.member_id))]
    pub async fn on_voice_state_changed(&self, change: &VoiceStateChange) {
        if !change.is_move() {
            return;
        }
        if let Some(before) = change.before
            && let Err(e) = self.on_member_left(before, change.member_id).await
        {
            self.note_failure(before, "member_left", &e);
        }
        if let Some(after) = change.after
            && let Err(e) = self.on_member_entered(after, change.member_id).await
        {
            self.note_failure(after, "member_entered", &e);
        }
    }

    /// A member connected to `channel`.
    ///
    /// Joining a primary spawns (or coalesces into) a secondary. Joining a
    /// secondary schedules a rename and grants access to its text channel,
    /// unless the join is the arrival of a member the controller moved there.
    #[instrument(skip(self))]
    pub async fn on_member_entered(&self, channel: ChannelId, member: MemberId) -> LifecycleResult<()> {
        if self.inner.registry.primary(channel).is_some() {
            self.spawn_from_primary(channel, member).await?;
            return Ok(());
        }
        if !self.inner.registry.is_secondary(channel) {
            return Ok(());
        }
        if self.reconcile_if_marked(channel).await? == ReconcileOutcome::Deleted {
            return Ok(());
        }
        if self
            .inner
            .registry
            .take_expected_arrival(channel, member, self.inner.config.spawn_coalesce())
        {
            debug!(%channel, %member, "Expected arrival, no rename");
            return Ok(());
        }

        self.request_rename(channel);

        let _guard = self.inner.locks.lock(channel).await;
        if let Some(text) = self
            .inner
            .registry
            .secondary(channel)
            .and_then(|s| s.text_channel_id)
        {
            self.set_text_visibility(text, member, PermissionOverride::view(true))
                .await?;
        }
        Ok(())
    }

    /// A member disconnected from `channel`.
    ///
    /// An emptied secondary is deleted; otherwise a rename is scheduled and
    /// the member's text channel access is revoked.
    #[instrument(skip(self))]
    pub async fn on_member_left(&self, channel: ChannelId, member: MemberId) -> LifecycleResult<()> {
        if !self.inner.registry.is_secondary(channel) {
            return Ok(());
        }
        if self.reconcile_if_marked(channel).await? == ReconcileOutcome::Deleted {
            return Ok(());
        }

        let _guard = self.inner.locks.lock(channel).await;
        let Some(secondary) = self.inner.registry.secondary(channel) else {
            return Ok(());
        };

        let snapshot = match self.snapshot(channel).await {
            Ok(snapshot) => snapshot,
            Err(e) if e.is_not_found() => {
                self.delete_locked(channel).await?;
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        if snapshot.is_empty() {
            self.delete_locked(channel).await?;
            return Ok(());
        }

        if let Some(text) = secondary.text_channel_id {
            self.set_text_visibility(text, member, PermissionOverride::inherit())
                .await?;
        }
        self.request_rename(channel);
        Ok(())
    }

    /// Spawn a secondary from `primary_id` for `member`.
    ///
    /// Joins are serialized on the primary. A join arriving while a secondary
    /// of the same primary spawned within the coalescing window still exists
    /// is moved into that secondary instead. Returns the secondary the member
    /// was placed in, or `None` when nothing was done.
    #[instrument(skip(self))]
    pub async fn spawn_from_primary(
        &self,
        primary_id: ChannelId,
        member: MemberId,
    ) -> LifecycleResult<Option<ChannelId>> {
        let _primary_guard = self.inner.locks.lock(primary_id).await;
        let Some(primary) = self.inner.registry.primary(primary_id) else {
            return Ok(None);
        };
        let guild = primary.guild_id;
        let platform = &self.inner.platform;
        let store = &self.inner.store;

        if let Some(existing) = self
            .inner
            .registry
            .recent_spawn(primary_id, self.inner.config.spawn_coalesce())
        {
            debug!(%existing, "Coalescing join into recently spawned secondary");
            self.call("move_member", || platform.move_member(guild, member, existing))
                .await?;
            return Ok(Some(existing));
        }

        let snapshot = self.snapshot(primary_id).await?;
        let Some(occupant) = snapshot.occupant(member) else {
            debug!("Member already left the primary");
            return Ok(None);
        };
        if occupant.is_bot() {
            debug!("Ignoring bot joining a primary");
            return Ok(None);
        }

        let aliases = self.call("list_aliases", || store.list_aliases(guild)).await?;
        let existing = self
            .call("count_by_parent", || store.count_by_parent(primary_id, guild))
            .await?;
        let ctx = NameContext {
            creator_display_name: occupant.display_name().clone(),
            channel_number: existing + 1,
            activities: occupant.activity_labels(),
            aliases,
            member_count: 1,
            locked: false,
        };
        let name = render(primary.template_for(!ctx.activities.is_empty()), &ctx);
        let text_channels = match self.call("get_settings", || store.get_settings(guild)).await {
            Ok(settings) => settings.text_channels_enabled,
            Err(e) => {
                warn!(error = %e, "Failed to read guild settings, skipping text channel");
                false
            }
        };

        let spec = VoiceChannelSpecBuilder::default()
            .guild_id(guild)
            .name(name.clone())
            .adjacent_to(primary_id)
            .build()
            .map_err(|e| LifecycleError::validation(e.to_string()))?;
        let channel = self
            .call("create_voice_channel", || platform.create_voice_channel(&spec))
            .await?;

        let secondary = match self.persist_new(channel, &primary, member).await {
            Ok(secondary) => secondary,
            Err(e) => {
                error!(%channel, error = %e, "Failed to persist secondary, deleting platform channel");
                self.discard_channel(channel).await;
                return Err(e);
            }
        };
        self.inner
            .registry
            .insert_spawned(secondary.clone(), member);
        info!(%channel, %name, "Secondary created");
        self.inner.publisher.publish(&LifecycleEvent::Created {
            id: channel,
            name: name.clone(),
            parent_id: primary_id,
            created_at: secondary.created_at,
        });

        if text_channels
            && let Err(e) = self.attach_text_channel(channel, &name, member).await
        {
            warn!(%channel, error = %e, "Failed to create paired text channel");
        }

        if let Err(e) = self
            .call("move_member", || platform.move_member(guild, member, channel))
            .await
        {
            warn!(%channel, error = %e, "Failed to move creator, removing empty secondary");
            self.delete_secondary(channel).await?;
            return Err(e);
        }

        Ok(Some(channel))
    }

    /// Create a text channel paired with `secondary_id`, visible to `owner`.
    ///
    /// Returns the existing channel when one is already paired.
    #[instrument(skip(self, name))]
    pub async fn attach_text_channel(
        &self,
        secondary_id: ChannelId,
        name: &str,
        owner: MemberId,
    ) -> LifecycleResult<ChannelId> {
        let _guard = self.inner.locks.lock(secondary_id).await;
        let secondary = self
            .inner
            .registry
            .secondary(secondary_id)
            .ok_or_else(|| LifecycleError::not_found(format!("secondary {secondary_id}")))?;
        if let Some(text) = secondary.text_channel_id {
            return Ok(text);
        }

        let platform = &self.inner.platform;
        let store = &self.inner.store;
        let spec = TextChannelSpecBuilder::default()
            .guild_id(secondary.guild_id)
            .name(name)
            .paired_with(secondary_id)
            .build()
            .map_err(|e| LifecycleError::validation(e.to_string()))?;
        let text = self
            .call("create_text_channel", || platform.create_text_channel(&spec))
            .await?;

        let patch = SecondaryPatch::default().with_text_channel_id(Some(text));
        let updated = match self
            .call("update_secondary", || store.update_secondary(secondary_id, &patch))
            .await
        {
            Ok(updated) => updated,
            Err(e) => {
                self.discard_channel(text).await;
                return Err(e);
            }
        };
        self.inner.registry.replace(updated);

        self.set_text_visibility(text, owner, PermissionOverride::view(true))
            .await?;
        debug!(%secondary_id, %text, "Text channel paired");
        Ok(text)
    }

    /// Schedule a debounced rename of `id`.
    pub fn request_rename(&self, id: ChannelId) {
        self.inner.debouncer.enqueue(id);
    }

    /// Recompute a secondary's name, rename it when it changed and publish
    /// its state.
    ///
    /// An empty or vanished channel is deleted instead. Returns the computed
    /// name, or `None` when the secondary is gone. When the rename quota is
    /// exhausted the state is still published and the rename is retried once
    /// the quota replenishes.
    #[instrument(skip(self))]
    pub async fn refresh_secondary(&self, id: ChannelId) -> LifecycleResult<Option<String>> {
        if !self.inner.registry.is_secondary(id) {
            return Ok(None);
        }

        let _guard = self.inner.locks.lock(id).await;
        let Some(secondary) = self.inner.registry.secondary(id) else {
            return Ok(None);
        };

        let snapshot = match self.snapshot(id).await {
            Ok(snapshot) => snapshot,
            Err(e) if e.is_not_found() => {
                self.delete_locked(id).await?;
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        if snapshot.is_empty() {
            self.delete_locked(id).await?;
            return Ok(None);
        }

        let primary = self.parent_of(&secondary).await?;
        let ctx = self.name_context(&secondary, &snapshot).await?;
        let name = match &secondary.name_override {
            Some(name) => truncate_name(name, MAX_NAME_LENGTH).to_string(),
            None => render(primary.template_for(!ctx.activities.is_empty()), &ctx),
        };

        if name != snapshot.name {
            match self.inner.quota.check(id) {
                Ok(()) => {
                    let platform = &self.inner.platform;
                    self.call("rename_channel", || platform.rename_channel(id, &name))
                        .await?;
                    debug!(from = %snapshot.name, to = %name, "Secondary renamed");
                }
                Err(e) => {
                    let wait = match e.kind {
                        LifecycleErrorKind::RateLimited {
                            retry_after_ms: Some(ms),
                            ..
                        } => Duration::from_millis(ms),
                        _ => self.inner.config.rename_debounce(),
                    };
                    debug!(error = %e, ?wait, "Rename quota exhausted, deferring");
                    self.inner.debouncer.defer(id, wait);
                }
            }
        }

        self.inner.publisher.publish(&LifecycleEvent::Updated {
            id,
            parent_id: secondary.parent_id,
            name: name.clone(),
            locked: secondary.locked,
            activities: ctx.activities,
            member_count: ctx.member_count,
        });
        Ok(Some(name))
    }

    /// Delete a secondary: platform channel, paired text channel, record and
    /// registry entry.
    ///
    /// Idempotent. Returns whether anything was removed; `resource.deleted`
    /// is only published in that case.
    #[instrument(skip(self))]
    pub async fn delete_secondary(&self, id: ChannelId) -> LifecycleResult<bool> {
        let _guard = self.inner.locks.lock(id).await;
        self.delete_locked(id).await
    }

    /// Reconcile one secondary against store and platform.
    #[instrument(skip(self))]
    pub async fn reconcile(&self, id: ChannelId) -> LifecycleResult<ReconcileOutcome> {
        let _guard = self.inner.locks.lock(id).await;
        self.reconcile_locked(id).await
    }

    /// Record a failed operation on `id`.
    ///
    /// Permission failures are only logged; anything else also marks the
    /// entry for reconciliation before its next operation.
    pub fn note_failure(&self, id: ChannelId, operation: &str, err: &LifecycleError) {
        match err.kind {
            LifecycleErrorKind::PermissionDenied(_) => {
                warn!(%id, operation, error = %err, "Missing permission, operation abandoned");
            }
            LifecycleErrorKind::Validation(_) => {
                warn!(%id, operation, error = %err, "Operation rejected");
            }
            _ => {
                error!(%id, operation, error = %err, "Operation failed, marking for reconciliation");
                self.inner.registry.mark_reconcile(id);
            }
        }
    }

    /// Registry of known primaries and secondaries.
    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Rename scheduler.
    pub fn debouncer(&self) -> &Debouncer {
        &self.inner.debouncer
    }

    /// Lifecycle timings in effect.
    pub fn config(&self) -> &LifecycleConfig {
        &self.inner.config
    }

    pub(crate) fn platform(&self) -> &Arc<dyn VoicePlatform> {
        &self.inner.platform
    }

    pub(crate) fn store(&self) -> &Arc<dyn Store> {
        &self.inner.store
    }

    pub(crate) fn locks(&self) -> &ResourceLocks {
        &self.inner.locks
    }

    /// Run a collaborator call under the call policy.
    pub(crate) async fn call<T, F, Fut>(&self, operation: &'static str, f: F) -> LifecycleResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = LifecycleResult<T>>,
    {
        self.inner.policy.call(operation, f).await
    }

    pub(crate) async fn snapshot(&self, channel: ChannelId) -> LifecycleResult<OccupancySnapshot> {
        let platform = &self.inner.platform;
        self.call("occupancy_snapshot", || platform.occupancy_snapshot(channel))
            .await
    }

    async fn reconcile_if_marked(&self, id: ChannelId) -> LifecycleResult<ReconcileOutcome> {
        if !self.inner.registry.take_reconcile(id) {
            return Ok(ReconcileOutcome::InSync);
        }
        self.reconcile(id).await.inspect_err(|_| {
            self.inner.registry.mark_reconcile(id);
        })
    }

    async fn reconcile_locked(&self, id: ChannelId) -> LifecycleResult<ReconcileOutcome> {
        let store = &self.inner.store;
        let known = match self.inner.registry.secondary(id) {
            Some(secondary) => secondary,
            None => self
                .call("get_secondary", || store.get_secondary(id))
                .await?
                .ok_or_else(|| LifecycleError::not_found(format!("secondary {id}")))?,
        };

        let gone_or_empty = match self.snapshot(id).await {
            Ok(snapshot) => snapshot.is_empty(),
            Err(e) if e.is_not_found() => true,
            Err(e) => return Err(e),
        };
        if gone_or_empty {
            self.delete_locked(id).await?;
            return Ok(ReconcileOutcome::Deleted);
        }

        let stored = self.call("get_secondary", || store.get_secondary(id)).await?;
        let (record, outcome) = match stored {
            Some(record) => (record, ReconcileOutcome::InSync),
            None => match self
                .call("create_secondary", || store.create_secondary(&known))
                .await
            {
                Ok(record) => {
                    info!(%id, "Missing secondary record restored");
                    (record, ReconcileOutcome::Restored)
                }
                Err(e) if e.is_not_found() => {
                    warn!(%id, parent = %known.parent_id, "Parent primary is gone, deleting secondary");
                    self.delete_locked(id).await?;
                    return Ok(ReconcileOutcome::Deleted);
                }
                Err(e) => return Err(e),
            },
        };

        if self.inner.registry.is_secondary(id) {
            self.inner.registry.replace(record);
        } else {
            self.inner.registry.insert(record);
        }
        debug!(%id, %outcome, "Secondary reconciled");
        Ok(outcome)
    }

    async fn delete_locked(&self, id: ChannelId) -> LifecycleResult<bool> {
        self.inner.debouncer.cancel(id);
        let platform = &self.inner.platform;
        let store = &self.inner.store;

        let record = match self.inner.registry.secondary(id) {
            Some(secondary) => Some(secondary),
            None => self.call("get_secondary", || store.get_secondary(id)).await?,
        };
        let Some(record) = record else {
            debug!(%id, "Secondary already deleted");
            return Ok(false);
        };

        let mut removed = false;
        match self.call("delete_channel", || platform.delete_channel(id)).await {
            Ok(()) => removed = true,
            Err(e) if e.is_not_found() => {}
            Err(e) => {
                self.note_failure(id, "delete_channel", &e);
                return Err(e);
            }
        }

        if let Some(text) = record.text_channel_id {
            match self.call("delete_channel", || platform.delete_channel(text)).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => warn!(%id, %text, error = %e, "Failed to delete paired text channel"),
            }
        }

        match self
            .call("delete_secondary", || store.delete_secondary(id))
            .await
        {
            Ok(()) => removed = true,
            Err(e) if e.is_not_found() => {}
            Err(e) => {
                error!(%id, error = %e, "Failed to delete secondary record, startup reconciliation will remove it");
            }
        }

        if self.inner.registry.remove(id).is_some() {
            removed = true;
        }
        self.inner.debouncer.cancel(id);

        if removed {
            info!(%id, "Secondary deleted");
            self.inner
                .publisher
                .publish(&LifecycleEvent::Deleted { id });
        }
        Ok(removed)
    }

    async fn persist_new(
        &self,
        channel: ChannelId,
        primary: &Primary,
        creator: MemberId,
    ) -> LifecycleResult<Secondary> {
        let store = &self.inner.store;
        let secondary = SecondaryBuilder::default()
            .id(channel)
            .guild_id(primary.guild_id)
            .parent_id(primary.id)
            .creator_id(creator)
            .build()
            .map_err(|e| LifecycleError::validation(e.to_string()))?;

        match self
            .call("create_secondary", || store.create_secondary(&secondary))
            .await
        {
            Ok(stored) => Ok(stored),
            Err(e) if matches!(e.kind, LifecycleErrorKind::Conflict(_)) => {
                warn!(%channel, error = %e, "Secondary record already exists, re-reading");
                match self.call("get_secondary", || store.get_secondary(channel)).await? {
                    Some(stored) if stored.parent_id == primary.id => Ok(stored),
                    _ => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn discard_channel(&self, channel: ChannelId) {
        let platform = &self.inner.platform;
        match self.call("delete_channel", || platform.delete_channel(channel)).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => error!(%channel, error = %e, "Failed to delete orphaned platform channel"),
        }
    }

    async fn set_text_visibility(
        &self,
        text: ChannelId,
        member: MemberId,
        permissions: PermissionOverride,
    ) -> LifecycleResult<()> {
        let platform = &self.inner.platform;
        match self
            .call("set_permission_override", || {
                platform.set_permission_override(text, OverrideSubject::Member(member), permissions)
            })
            .await
        {
            Err(e) if e.is_not_found() => {
                debug!(%text, "Paired text channel is gone");
                Ok(())
            }
            other => other,
        }
    }

    async fn parent_of(&self, secondary: &Secondary) -> LifecycleResult<Primary> {
        if let Some(primary) = self.inner.registry.primary(secondary.parent_id) {
            return Ok(primary);
        }
        let store = &self.inner.store;
        let parent = secondary.parent_id;
        let primary = self
            .call("get_primary", || store.get_primary(parent))
            .await?
            .ok_or_else(|| LifecycleError::not_found(format!("primary {parent}")))?;
        self.inner.registry.upsert_primary(primary.clone());
        Ok(primary)
    }

    async fn name_context(
        &self,
        secondary: &Secondary,
        snapshot: &OccupancySnapshot,
    ) -> LifecycleResult<NameContext> {
        let store = &self.inner.store;
        let platform = &self.inner.platform;
        let guild = secondary.guild_id;

        let aliases = self.call("list_aliases", || store.list_aliases(guild)).await?;
        let count = self
            .call("count_by_parent", || {
                store.count_by_parent(secondary.parent_id, guild)
            })
            .await?;
        let creator_display_name = match snapshot.display_name_of(secondary.creator_id) {
            Some(name) => name.to_string(),
            None => match self
                .call("member_display_name", || {
                    platform.member_display_name(guild, secondary.creator_id)
                })
                .await
            {
                Ok(name) => name,
                Err(e) if e.is_not_found() => String::new(),
                Err(e) => return Err(e),
            },
        };

        Ok(NameContext {
            creator_display_name,
            channel_number: count.max(1),
            activities: snapshot.activity_labels(),
            aliases,
            member_count: snapshot.member_count(),
            locked: secondary.locked,
        })
    }
}
