//! Shared fixtures: a recording fake platform and a wired controller.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use dynavoice_core::{
    Activity, ChannelId, GuildId, LifecycleEvent, MemberId, OccupancySnapshot, Occupant,
    PrimaryBuilder, VoiceStateChange,
};
use dynavoice_error::{LifecycleError, LifecycleErrorKind, LifecycleResult};
use dynavoice_interface::{
    InMemoryStore, OverrideSubject, PermissionOverride, PrimaryStore, TextChannelSpec,
    VoiceChannelSpec, VoicePlatform,
};
use dynavoice_lifecycle::{BroadcastPublisher, LifecycleController};
use dynavoice_rate_limit::{CallConfig, DynavoiceConfig, LifecycleConfig};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

pub const GUILD: GuildId = GuildId(100);
pub const LOBBY: ChannelId = ChannelId(1);
pub const ADMIN: MemberId = MemberId(9);

/// Platform call as recorded by the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateVoice(ChannelId, String),
    CreateText(ChannelId, ChannelId),
    Rename(ChannelId, String),
    Delete(ChannelId),
    Move(MemberId, ChannelId),
    SetOverride(ChannelId, OverrideSubject, PermissionOverride),
    ClearOverrides(ChannelId),
}

#[derive(Debug, Clone, Default)]
pub struct FakeChannel {
    pub name: String,
    pub members: Vec<Occupant>,
    pub overrides: HashMap<OverrideSubject, PermissionOverride>,
    pub text: bool,
}

#[derive(Debug, Default)]
struct State {
    channels: HashMap<ChannelId, FakeChannel>,
    calls: Vec<Call>,
    moves: Vec<VoiceStateChange>,
    next_id: u64,
    fail_moves: bool,
    failing_snapshots: HashSet<ChannelId>,
}

impl State {
    fn channel_of(&self, member: MemberId) -> Option<ChannelId> {
        self.channels
            .iter()
            .find(|(_, c)| c.members.iter().any(|m| *m.id() == member))
            .map(|(id, _)| *id)
    }

    fn take_member(&mut self, member: MemberId) -> Option<(ChannelId, Occupant)> {
        let from = self.channel_of(member)?;
        let channel = self.channels.get_mut(&from)?;
        let index = channel.members.iter().position(|m| *m.id() == member)?;
        Some((from, channel.members.remove(index)))
    }
}

/// In-process stand-in for the chat platform.
///
/// Moves performed by the controller are applied immediately and queued as
/// voice state changes; tests feed them back with [`Harness::deliver_moves`].
#[derive(Debug)]
pub struct FakePlatform {
    state: Mutex<State>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                next_id: 1_000,
                ..State::default()
            }),
        }
    }

    pub fn add_voice_channel(&self, id: ChannelId, name: &str) {
        self.state.lock().channels.insert(
            id,
            FakeChannel {
                name: name.to_string(),
                ..FakeChannel::default()
            },
        );
    }

    /// Connect (or move) a member; returns the event the platform would emit.
    pub fn connect(&self, occupant: Occupant, channel: ChannelId) -> VoiceStateChange {
        let mut state = self.state.lock();
        let member = *occupant.id();
        let before = state.take_member(member).map(|(from, _)| from);
        if let Some(target) = state.channels.get_mut(&channel) {
            target.members.push(occupant);
        }
        change(member, before, Some(channel))
    }

    pub fn disconnect(&self, member: MemberId) -> VoiceStateChange {
        let before = self.state.lock().take_member(member).map(|(from, _)| from);
        change(member, before, None)
    }

    pub fn set_activities(&self, member: MemberId, activities: Vec<Activity>) {
        let mut state = self.state.lock();
        for channel in state.channels.values_mut() {
            for occupant in channel.members.iter_mut() {
                if *occupant.id() == member {
                    let mut updated = Occupant::new(member, occupant.display_name().clone());
                    for activity in &activities {
                        updated = updated.with_activity(activity.clone());
                    }
                    *occupant = updated;
                }
            }
        }
    }

    pub fn fail_moves(&self, fail: bool) {
        self.state.lock().fail_moves = fail;
    }

    /// Make occupancy reads of `id` time out until reset.
    pub fn fail_snapshots(&self, id: ChannelId, fail: bool) {
        let mut state = self.state.lock();
        if fail {
            state.failing_snapshots.insert(id);
        } else {
            state.failing_snapshots.remove(&id);
        }
    }

    /// Delete a channel behind the controller's back.
    pub fn remove_channel(&self, id: ChannelId) -> Option<FakeChannel> {
        self.state.lock().channels.remove(&id)
    }

    pub fn channel(&self, id: ChannelId) -> Option<FakeChannel> {
        self.state.lock().channels.get(&id).cloned()
    }

    pub fn exists(&self, id: ChannelId) -> bool {
        self.state.lock().channels.contains_key(&id)
    }

    pub fn channel_count(&self) -> usize {
        self.state.lock().channels.len()
    }

    pub fn members_of(&self, id: ChannelId) -> Vec<MemberId> {
        self.channel(id)
            .map(|c| c.members.iter().map(|m| *m.id()).collect())
            .unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn renames_of(&self, id: ChannelId) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Rename(channel, name) if channel == id => Some(name),
                _ => None,
            })
            .collect()
    }

    fn take_moves(&self) -> Vec<VoiceStateChange> {
        std::mem::take(&mut self.state.lock().moves)
    }

    fn create(&self, name: &str, text: bool) -> ChannelId {
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = ChannelId(state.next_id);
        state.channels.insert(
            id,
            FakeChannel {
                name: name.to_string(),
                text,
                ..FakeChannel::default()
            },
        );
        id
    }
}

fn change(member: MemberId, before: Option<ChannelId>, after: Option<ChannelId>) -> VoiceStateChange {
    VoiceStateChange {
        guild_id: GUILD,
        member_id: member,
        before,
        after,
        timestamp: Utc::now(),
    }
}

fn missing(id: ChannelId) -> LifecycleError {
    LifecycleError::not_found(format!("channel {id}"))
}

#[async_trait]
impl VoicePlatform for FakePlatform {
    async fn create_voice_channel(&self, spec: &VoiceChannelSpec) -> LifecycleResult<ChannelId> {
        let id = self.create(spec.name(), false);
        self.state
            .lock()
            .calls
            .push(Call::CreateVoice(id, spec.name().clone()));
        Ok(id)
    }

    async fn create_text_channel(&self, spec: &TextChannelSpec) -> LifecycleResult<ChannelId> {
        let id = self.create(spec.name(), true);
        self.state
            .lock()
            .calls
            .push(Call::CreateText(id, *spec.paired_with()));
        Ok(id)
    }

    async fn rename_channel(&self, channel: ChannelId, name: &str) -> LifecycleResult<()> {
        let mut state = self.state.lock();
        let target = state.channels.get_mut(&channel).ok_or_else(|| missing(channel))?;
        target.name = name.to_string();
        state.calls.push(Call::Rename(channel, name.to_string()));
        Ok(())
    }

    async fn delete_channel(&self, channel: ChannelId) -> LifecycleResult<()> {
        let mut state = self.state.lock();
        state.channels.remove(&channel).ok_or_else(|| missing(channel))?;
        state.calls.push(Call::Delete(channel));
        Ok(())
    }

    async fn move_member(
        &self,
        _guild: GuildId,
        member: MemberId,
        channel: ChannelId,
    ) -> LifecycleResult<()> {
        let mut state = self.state.lock();
        if state.fail_moves {
            return Err(LifecycleError::new(LifecycleErrorKind::PermissionDenied(
                "move members".to_string(),
            )));
        }
        if !state.channels.contains_key(&channel) {
            return Err(missing(channel));
        }
        let (from, occupant) = state
            .take_member(member)
            .ok_or_else(|| LifecycleError::not_found(format!("member {member} is not connected")))?;
        if let Some(target) = state.channels.get_mut(&channel) {
            target.members.push(occupant);
        }
        state.calls.push(Call::Move(member, channel));
        state.moves.push(change(member, Some(from), Some(channel)));
        Ok(())
    }

    async fn set_permission_override(
        &self,
        channel: ChannelId,
        subject: OverrideSubject,
        permissions: PermissionOverride,
    ) -> LifecycleResult<()> {
        let mut state = self.state.lock();
        let target = state.channels.get_mut(&channel).ok_or_else(|| missing(channel))?;
        if permissions.is_inherit() {
            target.overrides.remove(&subject);
        } else {
            target.overrides.insert(subject, permissions);
        }
        state
            .calls
            .push(Call::SetOverride(channel, subject, permissions));
        Ok(())
    }

    async fn clear_permission_overrides(&self, channel: ChannelId) -> LifecycleResult<()> {
        let mut state = self.state.lock();
        let target = state.channels.get_mut(&channel).ok_or_else(|| missing(channel))?;
        target.overrides.clear();
        state.calls.push(Call::ClearOverrides(channel));
        Ok(())
    }

    async fn occupancy_snapshot(&self, channel: ChannelId) -> LifecycleResult<OccupancySnapshot> {
        let state = self.state.lock();
        if state.failing_snapshots.contains(&channel) {
            return Err(LifecycleError::new(LifecycleErrorKind::Timeout(format!(
                "occupancy of {channel}"
            ))));
        }
        let target = state.channels.get(&channel).ok_or_else(|| missing(channel))?;
        Ok(OccupancySnapshot::new(
            channel,
            target.name.clone(),
            target.members.clone(),
        ))
    }

    async fn member_display_name(
        &self,
        _guild: GuildId,
        member: MemberId,
    ) -> LifecycleResult<String> {
        Ok(format!("member-{member}"))
    }
}

/// Controller wired to the fake platform, an in-memory store and a
/// broadcast publisher.
pub struct Harness {
    pub platform: Arc<FakePlatform>,
    pub store: Arc<InMemoryStore>,
    pub controller: LifecycleController,
    pub events: broadcast::Receiver<LifecycleEvent>,
}

impl Harness {
    /// Feed the controller the voice state changes of its own moves.
    pub async fn deliver_moves(&self) {
        for change in self.platform.take_moves() {
            self.controller.on_voice_state_changed(&change).await;
        }
    }

    /// Connect a member and deliver the resulting event.
    pub async fn join(&self, occupant: Occupant, channel: ChannelId) {
        let change = self.platform.connect(occupant, channel);
        self.controller.on_voice_state_changed(&change).await;
        self.deliver_moves().await;
    }

    /// Disconnect a member and deliver the resulting event.
    pub async fn leave(&self, member: MemberId) {
        let change = self.platform.disconnect(member);
        self.controller.on_voice_state_changed(&change).await;
    }

    /// Events published so far.
    pub fn drain_events(&mut self) -> Vec<LifecycleEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    /// Let queued rename jobs run.
    pub async fn settle(&self) {
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}

pub fn test_config() -> DynavoiceConfig {
    DynavoiceConfig {
        lifecycle: LifecycleConfig {
            rename_debounce_ms: 100,
            spawn_coalesce_ms: 1_500,
            join_request_timeout_secs: 5,
        },
        calls: CallConfig {
            timeout_ms: 1_000,
            initial_backoff_ms: 10,
            max_retries: 0,
            max_delay_ms: 100,
        },
        rename_quota: None,
    }
}

/// Harness with the lobby primary registered and the controller started.
pub async fn harness() -> Harness {
    harness_with(test_config()).await
}

pub async fn harness_with(config: DynavoiceConfig) -> Harness {
    let platform = Arc::new(FakePlatform::new());
    platform.add_voice_channel(LOBBY, "Lobby");

    let store = Arc::new(InMemoryStore::new());
    let lobby = PrimaryBuilder::default()
        .id(LOBBY)
        .guild_id(GUILD)
        .creator_id(ADMIN)
        .build()
        .unwrap();
    store.create_primary(&lobby).await.unwrap();

    let publisher = BroadcastPublisher::new(256);
    let events = publisher.subscribe();
    let controller = LifecycleController::new(
        platform.clone(),
        store.clone(),
        Arc::new(publisher),
        &config,
    );
    controller.start().await.unwrap();

    Harness {
        platform,
        store,
        controller,
        events,
    }
}

pub fn member(id: u64, name: &str) -> Occupant {
    Occupant::new(MemberId(id), name)
}
