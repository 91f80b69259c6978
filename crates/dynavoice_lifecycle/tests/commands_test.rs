//! Command dispatch: authorization, validation and side effects.

mod common;

use common::{ADMIN, GUILD, LOBBY, harness, member};
use dynavoice_core::{ChannelId, MemberId};
use dynavoice_error::LifecycleErrorKind;
use dynavoice_lifecycle::{
    Command, CommandDispatcher, CommandOutcome, InfoTarget, InfoView, Invoker, JoinDecision,
    JoinOutcome, TemplateKind,
};

fn invoker(member: u64, voice_channel: Option<ChannelId>) -> Invoker {
    Invoker {
        member_id: MemberId(member),
        guild_id: GUILD,
        voice_channel,
        is_admin: false,
    }
}

fn admin() -> Invoker {
    Invoker {
        member_id: ADMIN,
        guild_id: GUILD,
        voice_channel: None,
        is_admin: true,
    }
}

#[tokio::test(start_paused = true)]
async fn test_owner_commands_require_ownership() {
    let h = harness().await;
    h.join(member(1, "ana"), LOBBY).await;
    let id = h.controller.registry().secondary_ids()[0];
    h.join(member(2, "bo"), id).await;
    let dispatcher = CommandDispatcher::new(h.controller.clone());

    let err = dispatcher
        .execute(&invoker(2, Some(id)), Command::Lock)
        .await
        .unwrap_err();
    assert!(matches!(err.kind, LifecycleErrorKind::PermissionDenied(_)));

    let err = dispatcher
        .execute(&invoker(1, None), Command::Lock)
        .await
        .unwrap_err();
    assert!(matches!(err.kind, LifecycleErrorKind::Validation(_)));

    let outcome = dispatcher
        .execute(&invoker(1, Some(id)), Command::Lock)
        .await
        .unwrap();
    assert!(matches!(outcome, CommandOutcome::Secondary(s) if s.locked));

    dispatcher
        .execute(&invoker(1, Some(id)), Command::TransferOwner(MemberId(2)))
        .await
        .unwrap();
    // ana no longer owns the channel
    let err = dispatcher
        .execute(&invoker(1, Some(id)), Command::Unlock)
        .await
        .unwrap_err();
    assert!(matches!(err.kind, LifecycleErrorKind::PermissionDenied(_)));
    dispatcher
        .execute(&invoker(2, Some(id)), Command::Unlock)
        .await
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_set_template_renames_existing_secondaries() {
    let h = harness().await;
    h.join(member(1, "ana"), LOBBY).await;
    let id = h.controller.registry().secondary_ids()[0];
    let dispatcher = CommandDispatcher::new(h.controller.clone());

    let err = dispatcher
        .execute(
            &invoker(1, Some(id)),
            Command::SetTemplate {
                primary: LOBBY,
                kind: TemplateKind::General,
                template: "@@creator@@'s room".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err.kind, LifecycleErrorKind::PermissionDenied(_)));

    let err = dispatcher
        .execute(
            &admin(),
            Command::SetTemplate {
                primary: LOBBY,
                kind: TemplateKind::General,
                template: "   ".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err.kind, LifecycleErrorKind::Validation(_)));

    dispatcher
        .execute(
            &admin(),
            Command::SetTemplate {
                primary: LOBBY,
                kind: TemplateKind::General,
                template: "@@creator@@'s room".to_string(),
            },
        )
        .await
        .unwrap();
    h.settle().await;

    assert_eq!(h.platform.channel(id).unwrap().name, "ana's room");
    assert_eq!(
        h.controller.registry().primary(LOBBY).unwrap().general_name,
        "@@creator@@'s room"
    );
}

#[tokio::test(start_paused = true)]
async fn test_set_name_overrides_template() {
    let h = harness().await;
    h.join(member(1, "ana"), LOBBY).await;
    let id = h.controller.registry().secondary_ids()[0];
    let dispatcher = CommandDispatcher::new(h.controller.clone());
    let owner = invoker(1, Some(id));

    dispatcher
        .execute(&owner, Command::SetName(Some("Movie night".to_string())))
        .await
        .unwrap();
    h.settle().await;
    assert_eq!(h.platform.channel(id).unwrap().name, "Movie night");

    dispatcher
        .execute(&owner, Command::SetName(None))
        .await
        .unwrap();
    h.settle().await;
    assert_eq!(h.platform.channel(id).unwrap().name, "General 1");
}

#[tokio::test(start_paused = true)]
async fn test_alias_commands() {
    let h = harness().await;
    let dispatcher = CommandDispatcher::new(h.controller.clone());

    dispatcher
        .execute(
            &admin(),
            Command::AliasAdd {
                activity: "Chess".to_string(),
                alias: "Board Games".to_string(),
            },
        )
        .await
        .unwrap();
    let CommandOutcome::Aliases(aliases) =
        dispatcher.execute(&admin(), Command::AliasList).await.unwrap()
    else {
        panic!("expected aliases");
    };
    assert_eq!(aliases.len(), 1);
    assert_eq!(aliases[0].alias_text, "Board Games");

    dispatcher
        .execute(&admin(), Command::AliasRemove("Chess".to_string()))
        .await
        .unwrap();
    let err = dispatcher
        .execute(&admin(), Command::AliasRemove("Chess".to_string()))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test(start_paused = true)]
async fn test_create_primary_registers_existing_channel() {
    let h = harness().await;
    h.platform.add_voice_channel(ChannelId(2), "Gaming");
    let dispatcher = CommandDispatcher::new(h.controller.clone());

    let err = dispatcher
        .execute(
            &admin(),
            Command::CreatePrimary {
                channel: ChannelId(3),
                general_name: None,
                activity_template: None,
            },
        )
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let create = Command::CreatePrimary {
        channel: ChannelId(2),
        general_name: Some("Squad ##".to_string()),
        activity_template: None,
    };
    dispatcher.execute(&admin(), create.clone()).await.unwrap();
    let err = dispatcher.execute(&admin(), create).await.unwrap_err();
    assert!(matches!(err.kind, LifecycleErrorKind::Conflict(_)));

    h.join(member(1, "ana"), ChannelId(2)).await;
    let id = h.controller.registry().secondary_ids()[0];
    assert_eq!(h.platform.channel(id).unwrap().name, "Squad 1");
}

#[tokio::test(start_paused = true)]
async fn test_join_request_through_dispatcher() {
    let h = harness().await;
    h.join(member(1, "ana"), LOBBY).await;
    let id = h.controller.registry().secondary_ids()[0];
    let dispatcher = CommandDispatcher::new(h.controller.clone());

    dispatcher
        .execute(&admin(), Command::AllowJoinRequests(true))
        .await
        .unwrap();
    dispatcher
        .execute(&invoker(1, Some(id)), Command::Lock)
        .await
        .unwrap();

    let CommandOutcome::JoinRequested(pending) = dispatcher
        .execute(&invoker(2, None), Command::JoinRequest(id))
        .await
        .unwrap()
    else {
        panic!("expected a pending request");
    };
    let request_id = *pending.ticket().request_id();

    dispatcher
        .execute(
            &invoker(1, Some(id)),
            Command::JoinRespond {
                request_id,
                decision: JoinDecision::Approve,
            },
        )
        .await
        .unwrap();

    let outcome = dispatcher
        .join_requests()
        .await_outcome(pending)
        .await
        .unwrap();
    assert_eq!(outcome, JoinOutcome::Approved);
}

#[tokio::test(start_paused = true)]
async fn test_info_views() {
    let h = harness().await;
    h.join(member(1, "ana"), LOBBY).await;
    let id = h.controller.registry().secondary_ids()[0];
    let dispatcher = CommandDispatcher::new(h.controller.clone());

    let CommandOutcome::Info(InfoView::Primary { secondaries, .. }) = dispatcher
        .execute(&invoker(1, None), Command::Info(InfoTarget::Primary(LOBBY)))
        .await
        .unwrap()
    else {
        panic!("expected primary info");
    };
    assert_eq!(secondaries.len(), 1);

    let CommandOutcome::Info(InfoView::Secondary(secondary)) = dispatcher
        .execute(&invoker(1, None), Command::Info(InfoTarget::Secondary(id)))
        .await
        .unwrap()
    else {
        panic!("expected secondary info");
    };
    assert_eq!(secondary.creator_id, MemberId(1));

    dispatcher
        .execute(&admin(), Command::TextChannels(true))
        .await
        .unwrap();
    let CommandOutcome::Info(InfoView::Guild { settings, primaries, .. }) = dispatcher
        .execute(&invoker(1, None), Command::Info(InfoTarget::Guild))
        .await
        .unwrap()
    else {
        panic!("expected guild info");
    };
    assert!(settings.text_channels_enabled);
    assert_eq!(primaries.len(), 1);
}
