//! Controller behavior against a recording fake platform.

mod common;

use common::{Call, GUILD, LOBBY, harness, harness_with, member, test_config};
use dynavoice_core::{
    Activity, Alias, ChannelId, GuildSettings, LifecycleEvent, MemberId, SecondaryBuilder,
};
use dynavoice_interface::{AliasStore, PrimaryStore, SecondaryStore};
use dynavoice_lifecycle::{OwnershipManager, ReconcileOutcome};
use dynavoice_rate_limit::RenameQuotaConfig;
use std::time::Duration;
use tokio::task::JoinSet;

fn only_secondary(h: &common::Harness) -> ChannelId {
    let ids = h.controller.registry().secondary_ids();
    assert_eq!(ids.len(), 1, "expected exactly one secondary, got {ids:?}");
    ids[0]
}

#[tokio::test(start_paused = true)]
async fn test_join_primary_spawns_named_secondary() {
    let mut h = harness().await;

    h.join(member(1, "ana"), LOBBY).await;

    let id = only_secondary(&h);
    assert_eq!(h.platform.channel(id).unwrap().name, "General 1");
    assert_eq!(h.platform.members_of(id), vec![MemberId(1)]);
    assert!(h.platform.members_of(LOBBY).is_empty());

    let stored = h.store.get_secondary(id).await.unwrap().unwrap();
    assert_eq!(stored.parent_id, LOBBY);
    assert_eq!(stored.creator_id, MemberId(1));
    assert!(!stored.locked);

    let events = h.drain_events();
    assert!(matches!(
        &events[..],
        [LifecycleEvent::Created { id: created, name, parent_id, .. }]
            if *created == id && name == "General 1" && *parent_id == LOBBY
    ));

    // the creator's own arrival does not trigger a rename
    h.settle().await;
    assert!(h.platform.renames_of(id).is_empty());
    assert!(h.drain_events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_every_secondary_has_an_existing_parent() {
    let h = harness().await;

    h.join(member(1, "ana"), LOBBY).await;
    tokio::time::advance(Duration::from_secs(2)).await;
    h.join(member(2, "bo"), LOBBY).await;

    let ids = h.controller.registry().secondary_ids();
    assert_eq!(ids.len(), 2);
    for id in ids {
        let secondary = h.store.get_secondary(id).await.unwrap().unwrap();
        assert!(h.store.get_primary(secondary.parent_id).await.unwrap().is_some());
    }
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_joins_yield_one_secondary() {
    let h = harness().await;
    let members: Vec<u64> = (1..=10).collect();
    for m in &members {
        h.platform.connect(member(*m, &format!("m{m}")), LOBBY);
    }

    let mut joins = JoinSet::new();
    for m in &members {
        let controller = h.controller.clone();
        let m = MemberId(*m);
        joins.spawn(async move { controller.on_member_entered(LOBBY, m).await });
    }
    while let Some(result) = joins.join_next().await {
        result.unwrap().unwrap();
    }
    h.deliver_moves().await;

    let id = only_secondary(&h);
    let mut inside = h.platform.members_of(id);
    inside.sort();
    assert_eq!(inside, members.iter().map(|m| MemberId(*m)).collect::<Vec<_>>());
    assert_eq!(
        h.store.count_by_parent(LOBBY, GUILD).await.unwrap(),
        1
    );
    let creates = h
        .platform
        .calls()
        .into_iter()
        .filter(|c| matches!(c, Call::CreateVoice(..)))
        .count();
    assert_eq!(creates, 1);
}

#[tokio::test(start_paused = true)]
async fn test_join_after_coalesce_window_spawns_second_channel() {
    let h = harness().await;

    h.join(member(1, "ana"), LOBBY).await;
    tokio::time::advance(Duration::from_secs(2)).await;
    h.join(member(2, "bo"), LOBBY).await;

    let ids = h.controller.registry().secondary_ids();
    assert_eq!(ids.len(), 2);
    assert_eq!(h.platform.channel(ids[1]).unwrap().name, "General 2");
}

#[tokio::test(start_paused = true)]
async fn test_activity_and_alias_drive_the_name() {
    let h = harness().await;
    h.join(member(1, "ana"), LOBBY).await;
    let id = only_secondary(&h);
    assert_eq!(h.platform.channel(id).unwrap().name, "General 1");

    h.platform
        .set_activities(MemberId(1), vec![Activity::playing("Chess")]);
    let name = h.controller.refresh_secondary(id).await.unwrap();
    assert_eq!(name.as_deref(), Some("Chess 1"));
    assert_eq!(h.platform.channel(id).unwrap().name, "Chess 1");

    h.store
        .upsert_alias(&Alias::new(GUILD, "Chess".to_string(), "Board Games".to_string()))
        .await
        .unwrap();
    h.controller.refresh_secondary(id).await.unwrap();
    assert_eq!(h.platform.channel(id).unwrap().name, "Board Games 1");
    assert_eq!(h.platform.renames_of(id), vec!["Chess 1", "Board Games 1"]);
}

#[tokio::test(start_paused = true)]
async fn test_update_event_is_emitted_without_rename() {
    let mut h = harness().await;
    h.join(member(1, "ana"), LOBBY).await;
    let id = only_secondary(&h);
    h.drain_events();

    h.controller.refresh_secondary(id).await.unwrap();

    assert!(h.platform.renames_of(id).is_empty());
    assert_eq!(
        h.drain_events(),
        vec![LifecycleEvent::Updated {
            id,
            parent_id: LOBBY,
            name: "General 1".to_string(),
            locked: false,
            activities: vec![],
            member_count: 1,
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn test_burst_of_joins_is_renamed_once() {
    let h = harness().await;
    h.join(member(1, "ana"), LOBBY).await;
    let id = only_secondary(&h);
    h.platform
        .set_activities(MemberId(1), vec![Activity::playing("Chess")]);

    for m in 2..=6 {
        h.join(member(m, "guest"), id).await;
    }
    assert!(h.controller.debouncer().is_pending(id));

    h.settle().await;
    assert_eq!(h.platform.renames_of(id), vec!["Chess 1"]);
    assert!(!h.controller.debouncer().is_pending(id));
}

#[tokio::test(start_paused = true)]
async fn test_last_member_leaving_deletes_secondary() {
    let mut h = harness().await;
    h.join(member(1, "ana"), LOBBY).await;
    let id = only_secondary(&h);
    h.join(member(2, "bo"), id).await;
    h.drain_events();

    h.leave(MemberId(2)).await;
    assert!(h.platform.exists(id));
    h.leave(MemberId(1)).await;

    assert!(!h.platform.exists(id));
    assert!(h.store.get_secondary(id).await.unwrap().is_none());
    assert!(!h.controller.registry().is_secondary(id));
    assert!(h.drain_events().contains(&LifecycleEvent::Deleted { id }));
}

#[tokio::test(start_paused = true)]
async fn test_locked_sole_occupant_leaving_deletes_without_rename() {
    let mut h = harness().await;
    h.join(member(1, "ana"), LOBBY).await;
    let id = only_secondary(&h);
    OwnershipManager::new(h.controller.clone())
        .lock(id)
        .await
        .unwrap();
    // lock queued a rename
    assert!(h.controller.debouncer().is_pending(id));
    h.drain_events();

    h.leave(MemberId(1)).await;
    h.settle().await;

    assert!(!h.platform.exists(id));
    assert!(h.platform.renames_of(id).is_empty());
    let events = h.drain_events();
    assert_eq!(events, vec![LifecycleEvent::Deleted { id }]);
}

#[tokio::test(start_paused = true)]
async fn test_delete_is_idempotent() {
    let mut h = harness().await;
    h.join(member(1, "ana"), LOBBY).await;
    let id = only_secondary(&h);
    h.drain_events();

    assert!(h.controller.delete_secondary(id).await.unwrap());
    assert!(!h.controller.delete_secondary(id).await.unwrap());

    assert_eq!(h.drain_events(), vec![LifecycleEvent::Deleted { id }]);
    let deletes = h
        .platform
        .calls()
        .into_iter()
        .filter(|c| *c == Call::Delete(id))
        .count();
    assert_eq!(deletes, 1);
}

#[tokio::test(start_paused = true)]
async fn test_delete_of_unknown_channel_touches_nothing() {
    let h = harness().await;
    assert!(!h.controller.delete_secondary(LOBBY).await.unwrap());
    assert!(h.platform.exists(LOBBY));
}

#[tokio::test(start_paused = true)]
async fn test_persistence_failure_removes_platform_channel() {
    let mut h = harness().await;
    h.store.fail_secondary_writes(true);
    h.platform.connect(member(1, "ana"), LOBBY);

    let result = h.controller.spawn_from_primary(LOBBY, MemberId(1)).await;

    assert!(result.is_err());
    assert_eq!(h.platform.channel_count(), 1);
    assert_eq!(h.controller.registry().secondary_count(), 0);
    assert_eq!(h.platform.members_of(LOBBY), vec![MemberId(1)]);
    assert!(h.drain_events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_failed_move_removes_empty_secondary() {
    let h = harness().await;
    h.platform.fail_moves(true);
    h.platform.connect(member(1, "ana"), LOBBY);

    let result = h.controller.spawn_from_primary(LOBBY, MemberId(1)).await;

    assert!(result.is_err());
    assert_eq!(h.platform.channel_count(), 1);
    assert_eq!(h.controller.registry().secondary_count(), 0);
    assert_eq!(h.store.count_by_parent(LOBBY, GUILD).await.unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_non_move_state_change_is_ignored() {
    let h = harness().await;
    let change = h.platform.connect(member(1, "ana"), LOBBY);
    let unchanged = dynavoice_core::VoiceStateChange {
        before: change.after,
        ..change
    };

    h.controller.on_voice_state_changed(&unchanged).await;

    assert_eq!(h.controller.registry().secondary_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_startup_reconciliation_removes_stale_secondaries() {
    let h = harness().await;
    let record = |id: u64| {
        SecondaryBuilder::default()
            .id(ChannelId(id))
            .guild_id(GUILD)
            .parent_id(LOBBY)
            .creator_id(MemberId(1))
            .build()
            .unwrap()
    };

    // 50 vanished while offline, 51 is empty, 52 is still in use
    for id in [50, 51, 52] {
        h.store.create_secondary(&record(id)).await.unwrap();
    }
    h.platform.add_voice_channel(ChannelId(51), "General 2");
    h.platform.add_voice_channel(ChannelId(52), "General 3");
    h.platform.connect(member(1, "ana"), ChannelId(52));

    let report = h.controller.start().await.unwrap();

    assert_eq!(report.checked, 3);
    assert_eq!(report.deleted, 2);
    assert_eq!(report.failed, 0);
    assert!(!h.platform.exists(ChannelId(51)));
    assert_eq!(h.controller.registry().secondary_ids(), vec![ChannelId(52)]);
    assert!(h.store.get_secondary(ChannelId(50)).await.unwrap().is_none());

    // survivors are renamed to their current numbering
    h.settle().await;
    assert_eq!(h.platform.renames_of(ChannelId(52)), vec!["General 1"]);
}

#[tokio::test(start_paused = true)]
async fn test_reconcile_restores_missing_record() {
    let h = harness().await;
    h.join(member(1, "ana"), LOBBY).await;
    let id = only_secondary(&h);

    h.store.delete_secondary(id).await.unwrap();
    let outcome = h.controller.reconcile(id).await.unwrap();

    assert_eq!(outcome, ReconcileOutcome::Restored);
    assert!(h.store.get_secondary(id).await.unwrap().is_some());
    assert_eq!(
        h.controller.reconcile(id).await.unwrap(),
        ReconcileOutcome::InSync
    );
}

#[tokio::test(start_paused = true)]
async fn test_text_channel_follows_membership() {
    let h = harness().await;
    h.store
        .put_settings(GuildSettings {
            guild_id: GUILD,
            allow_join_requests: false,
            text_channels_enabled: true,
        })
        .await;

    h.join(member(1, "ana"), LOBBY).await;
    let id = only_secondary(&h);
    let text = h
        .controller
        .registry()
        .secondary(id)
        .and_then(|s| s.text_channel_id)
        .expect("text channel paired");
    assert!(h.platform.channel(text).unwrap().text);

    let ana = dynavoice_interface::OverrideSubject::Member(MemberId(1));
    let bo = dynavoice_interface::OverrideSubject::Member(MemberId(2));
    assert!(h.platform.channel(text).unwrap().overrides.contains_key(&ana));

    h.join(member(2, "bo"), id).await;
    assert!(h.platform.channel(text).unwrap().overrides.contains_key(&bo));

    h.leave(MemberId(2)).await;
    assert!(!h.platform.channel(text).unwrap().overrides.contains_key(&bo));

    h.leave(MemberId(1)).await;
    assert!(!h.platform.exists(text));
    assert!(!h.platform.exists(id));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_clears_registry() {
    let h = harness().await;
    h.join(member(1, "ana"), LOBBY).await;

    h.controller.shutdown();

    assert_eq!(h.controller.registry().secondary_count(), 0);
    assert_eq!(h.controller.registry().primary_count(), 0);
    assert_eq!(h.controller.debouncer().pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_joining_member_activity_names_the_secondary() {
    let h = harness().await;
    h.join(member(1, "ana"), LOBBY).await;
    let id = only_secondary(&h);

    h.join(
        member(2, "bo").with_activity(Activity::playing("Chess")),
        id,
    )
    .await;
    h.settle().await;

    assert_eq!(h.platform.channel(id).unwrap().name, "Chess 1");
}

#[tokio::test(start_paused = true)]
async fn test_joining_member_activity_uses_guild_alias() {
    let h = harness().await;
    h.store
        .upsert_alias(&Alias::new(GUILD, "Chess".to_string(), "Board Games".to_string()))
        .await
        .unwrap();
    h.join(member(1, "ana"), LOBBY).await;
    let id = only_secondary(&h);

    h.join(
        member(2, "bo").with_activity(Activity::playing("Chess")),
        id,
    )
    .await;
    h.settle().await;

    assert_eq!(h.platform.channel(id).unwrap().name, "Board Games 1");
}

#[tokio::test(start_paused = true)]
async fn test_settings_read_failure_still_places_creator() {
    let mut h = harness().await;
    h.store
        .put_settings(GuildSettings {
            guild_id: GUILD,
            allow_join_requests: false,
            text_channels_enabled: true,
        })
        .await;
    h.store.fail_settings_reads(true);

    h.join(member(1, "ana"), LOBBY).await;

    let id = only_secondary(&h);
    assert_eq!(h.platform.members_of(id), vec![MemberId(1)]);
    assert!(h.platform.members_of(LOBBY).is_empty());
    // lobby and the voice secondary, no text channel
    assert_eq!(h.platform.channel_count(), 2);
    let entry = h.controller.registry().entry(id).unwrap();
    assert!(entry.secondary.text_channel_id.is_none());
    assert!(!entry.needs_reconcile);
    assert!(h.store.get_secondary(id).await.unwrap().is_some());

    let events = h.drain_events();
    assert!(matches!(&events[..], [LifecycleEvent::Created { id: created, .. }] if *created == id));
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_rename_quota_publishes_state_and_waits_for_the_quota() {
    let mut config = test_config();
    config.rename_quota = Some(RenameQuotaConfig {
        burst: 1,
        period_secs: 600,
    });
    let mut h = harness_with(config).await;
    h.join(member(1, "ana"), LOBBY).await;
    let id = only_secondary(&h);

    h.platform
        .set_activities(MemberId(1), vec![Activity::playing("Chess")]);
    let name = h.controller.refresh_secondary(id).await.unwrap();
    assert_eq!(name.as_deref(), Some("Chess 1"));
    h.drain_events();

    h.platform
        .set_activities(MemberId(1), vec![Activity::playing("Go")]);
    let name = h.controller.refresh_secondary(id).await.unwrap();

    assert_eq!(name.as_deref(), Some("Go 1"));
    assert_eq!(h.platform.renames_of(id), vec!["Chess 1"]);
    assert_eq!(h.platform.channel(id).unwrap().name, "Chess 1");
    assert_eq!(
        h.drain_events(),
        vec![LifecycleEvent::Updated {
            id,
            parent_id: LOBBY,
            name: "Go 1".to_string(),
            locked: false,
            activities: vec!["Go".to_string()],
            member_count: 1,
        }]
    );
    assert!(h.controller.debouncer().is_pending(id));

    // the retry waits for the quota, not for the rename debounce
    h.settle().await;
    assert!(h.drain_events().is_empty());
    assert_eq!(h.platform.renames_of(id), vec!["Chess 1"]);
    assert!(h.controller.debouncer().is_pending(id));
}

#[tokio::test(start_paused = true)]
async fn test_failed_event_marks_secondary_and_next_event_restores_record() {
    let h = harness().await;
    h.join(member(1, "ana"), LOBBY).await;
    let id = only_secondary(&h);
    h.join(member(2, "bo"), id).await;

    h.platform.fail_snapshots(id, true);
    h.leave(MemberId(2)).await;
    assert!(h.controller.registry().entry(id).unwrap().needs_reconcile);

    h.platform.fail_snapshots(id, false);
    h.store.delete_secondary(id).await.unwrap();
    h.join(member(3, "cy"), id).await;

    assert!(!h.controller.registry().entry(id).unwrap().needs_reconcile);
    let restored = h.store.get_secondary(id).await.unwrap().unwrap();
    assert_eq!(restored.parent_id, LOBBY);
    assert_eq!(restored.creator_id, MemberId(1));
    assert!(h.platform.exists(id));
}

#[tokio::test(start_paused = true)]
async fn test_marked_secondary_emptied_meanwhile_is_deleted_on_next_event() {
    let mut h = harness().await;
    h.join(member(1, "ana"), LOBBY).await;
    let id = only_secondary(&h);
    h.join(member(2, "bo"), id).await;

    h.platform.fail_snapshots(id, true);
    h.leave(MemberId(2)).await;
    assert!(h.controller.registry().entry(id).unwrap().needs_reconcile);
    h.platform.fail_snapshots(id, false);
    h.drain_events();

    // the last member's own disconnect event is lost
    h.platform.disconnect(MemberId(1));
    h.controller.on_member_left(id, MemberId(2)).await.unwrap();

    assert!(h.controller.registry().entry(id).is_none());
    assert!(!h.platform.exists(id));
    assert!(h.store.get_secondary(id).await.unwrap().is_none());
    assert_eq!(h.drain_events(), vec![LifecycleEvent::Deleted { id }]);
}

#[tokio::test(start_paused = true)]
async fn test_failed_reconcile_keeps_the_mark() {
    let h = harness().await;
    h.join(member(1, "ana"), LOBBY).await;
    let id = only_secondary(&h);
    h.join(member(2, "bo"), id).await;

    h.platform.fail_snapshots(id, true);
    h.leave(MemberId(2)).await;
    let result = h.controller.on_member_entered(id, MemberId(3)).await;

    assert!(result.is_err());
    assert!(h.controller.registry().entry(id).unwrap().needs_reconcile);
}
