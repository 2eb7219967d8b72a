//! `/group` and `/language` driven end to end against an in-memory store.

use std::sync::Arc;

use legend_groups_core::messages::MessageCatalog;
use legend_groups_core::store::{GroupStore, SqliteStore};
use legend_groups_core::{GroupService, GroupsConfig, PlayerId, SignLocation};
use legend_groups_host::commands::{complete_group, complete_language, execute_group, execute_language};
use legend_groups_host::{CommandSender, HostEffect, OnlinePlayer, ADMIN_PERMISSION};

async fn service() -> GroupService {
    let store = SqliteStore::open_in_memory().expect("open");
    store
        .migrate(&[("English".into(), "en".into()), ("Deutsch".into(), "de".into())])
        .await
        .expect("migrate");
    let messages = MessageCatalog::builtin("en").expect("messages");
    GroupService::new(Arc::new(store), GroupsConfig::default(), messages)
}

fn player(name: &str) -> OnlinePlayer {
    OnlinePlayer::new(PlayerId::new(), name, SignLocation::new("world", 0, 64, 0))
}

async fn joined(service: &GroupService, name: &str) -> OnlinePlayer {
    let p = player(name);
    service.player_joined(p.id, &p.name).await.expect("join");
    p
}

async fn run(service: &GroupService, sender: &CommandSender, online: &[OnlinePlayer], line: &str) -> Vec<String> {
    let args: Vec<&str> = line.split(' ').filter(|t| !t.is_empty()).collect();
    execute_group(service, sender, online, &args).await.replies
}

// ---------------------------------------------------------------------------
// Dispatch and permissions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_or_missing_subcommand_prints_help() {
    let service = service().await;
    let help = run(&service, &CommandSender::Console, &[], "").await;
    assert_eq!(help.len(), 9);
    assert!(help[0].contains("Group commands"));
    assert_eq!(run(&service, &CommandSender::Console, &[], "frobnicate").await, help);
}

#[tokio::test]
async fn admin_subcommands_need_permission() {
    let service = service().await;
    let steve = CommandSender::Player(joined(&service, "Steve").await);
    let replies = run(&service, &steve, &[], "create vip &6VIP 10").await;
    assert_eq!(replies, vec!["§cYou are not allowed to do that."]);

    let admin = CommandSender::Player(joined(&service, "Alex").await.with_permission(ADMIN_PERMISSION));
    let replies = run(&service, &admin, &[], "create vip &6VIP 10").await;
    assert_eq!(replies, vec!["§aGroup §fvip §awas created."]);
}

#[tokio::test]
async fn create_validates_arguments() {
    let service = service().await;
    let console = CommandSender::Console;
    let missing = "§cMissing or invalid arguments. Use §e/group help§c.";
    assert_eq!(run(&service, &console, &[], "create vip &6VIP").await, vec![missing]);
    assert_eq!(run(&service, &console, &[], "create vip &6VIP ten").await, vec![missing]);
    run(&service, &console, &[], "create vip &6VIP 10 \"Paying supporters\"").await;
    assert_eq!(
        service.group("vip").await.expect("vip").description,
        "Paying supporters"
    );
    assert_eq!(
        run(&service, &console, &[], "create vip &eVIP 5").await,
        vec!["§cA group named §fvip §calready exists."]
    );
}

// ---------------------------------------------------------------------------
// Membership
// ---------------------------------------------------------------------------

#[tokio::test]
async fn add_and_remove_refresh_the_online_list_name() {
    let service = service().await;
    let console = CommandSender::Console;
    let steve = joined(&service, "Steve").await;
    let online = vec![steve.clone()];
    run(&service, &console, &online, "create vip &6VIP 10").await;

    let outcome = execute_group(&service, &console, &online, &["add", "Steve", "vip"]).await;
    assert_eq!(outcome.replies, vec!["§aSteve was added to vip."]);
    assert_eq!(
        outcome.effects,
        vec![HostEffect::SetListName {
            player: steve.id,
            list_name: "§f[§6VIP§f] Steve".to_string(),
        }]
    );

    let outcome = execute_group(&service, &console, &online, &["remove", "Steve", "vip"]).await;
    assert_eq!(outcome.replies, vec!["§aSteve was removed from vip."]);
    assert_eq!(
        outcome.effects,
        vec![HostEffect::SetListName {
            player: steve.id,
            list_name: "§f[§4none§f] Steve".to_string(),
        }]
    );
    assert_eq!(
        run(&service, &console, &online, "remove Steve vip").await,
        vec!["§cSteve is not a member of vip."]
    );
}

#[tokio::test]
async fn add_rejects_bad_durations_and_unknown_names() {
    let service = service().await;
    let console = CommandSender::Console;
    joined(&service, "Steve").await;
    run(&service, &console, &[], "create vip &6VIP 10").await;

    let wrong = "§cThe duration must be four non-negative numbers: days hours minutes seconds.";
    assert_eq!(run(&service, &console, &[], "add Steve vip 1 x 0 0").await, vec![wrong]);
    assert_eq!(run(&service, &console, &[], "add Steve vip 0 -1 0 0").await, vec![wrong]);
    assert!(service.player_groups(service.store().player_by_name("Steve").await.expect("lookup").expect("steve").id)
        .await
        .expect("groups")
        .is_empty());

    assert_eq!(
        run(&service, &console, &[], "add Herobrine vip").await,
        vec!["§cUnknown player §fHerobrine§c."]
    );
    assert_eq!(
        run(&service, &console, &[], "add Steve mvp").await,
        vec!["§cUnknown group §fmvp§c."]
    );
    assert_eq!(
        run(&service, &console, &[], "add Steve vip 1 0 0 0").await,
        vec!["§aSteve was added to vip."]
    );
}

#[tokio::test]
async fn show_lists_groups_with_expiry() {
    let service = service().await;
    let steve = joined(&service, "Steve").await;
    let sender = CommandSender::Player(steve.clone());
    assert_eq!(
        run(&service, &sender, &[], "show").await,
        vec!["§7You are not in any group."]
    );

    run(&service, &CommandSender::Console, &[], "create vip &6VIP 10 Supporters").await;
    run(&service, &CommandSender::Console, &[], "add Steve vip").await;
    assert_eq!(
        run(&service, &sender, &[], "show").await,
        vec!["§7Group §fvip§7: Supporters §8(permanent)"]
    );
    assert_eq!(
        run(&service, &CommandSender::Console, &[], "show").await,
        vec!["§cOnly players can use this command."]
    );
}

// ---------------------------------------------------------------------------
// Delete and edit
// ---------------------------------------------------------------------------

#[tokio::test]
async fn delete_refuses_groups_with_members() {
    let service = service().await;
    let console = CommandSender::Console;
    joined(&service, "Steve").await;
    run(&service, &console, &[], "create vip &6VIP 10").await;
    run(&service, &console, &[], "add Steve vip").await;

    assert_eq!(
        run(&service, &console, &[], "delete vip").await,
        vec!["§cGroup §fvip §cstill has members."]
    );
    run(&service, &console, &[], "remove Steve vip").await;
    assert_eq!(
        run(&service, &console, &[], "delete vip").await,
        vec!["§aGroup §fvip §awas deleted."]
    );
    assert_eq!(
        run(&service, &console, &[], "delete vip").await,
        vec!["§cUnknown group §fvip§c."]
    );
}

#[tokio::test]
async fn edit_updates_fields_and_every_list_name() {
    let service = service().await;
    let console = CommandSender::Console;
    let steve = joined(&service, "Steve").await;
    let alex = joined(&service, "Alex").await;
    let online = vec![steve.clone(), alex.clone()];
    run(&service, &console, &online, "create vip &6VIP 10").await;
    run(&service, &console, &online, "add Steve vip").await;

    let outcome = execute_group(&service, &console, &online, &["edit", "vip", "prefix", "&eGold"]).await;
    assert_eq!(outcome.replies, vec!["§aSet prefix of vip to §f§eGold§a."]);
    assert_eq!(outcome.effects.len(), 2);
    assert!(outcome.effects.contains(&HostEffect::SetListName {
        player: steve.id,
        list_name: "§f[§eGold§f] Steve".to_string(),
    }));

    assert_eq!(
        run(&service, &console, &online, "edit vip weight heavy").await,
        vec!["§cCould not update weight of vip to §fheavy§c."]
    );
    assert_eq!(
        run(&service, &console, &online, "edit vip colour red").await,
        vec!["§cUnknown field §fcolour§c. Use name, prefix, description or weight."]
    );
    assert_eq!(
        run(&service, &console, &online, "edit mvp weight 1").await,
        vec!["§cUnknown group §fmvp§c."]
    );
}

// ---------------------------------------------------------------------------
// Signs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sign_add_requires_standing_on_a_sign() {
    let service = service().await;
    let mut admin = joined(&service, "Alex").await.with_op();
    let viewer = joined(&service, "Steve").await;
    let online = vec![admin.clone(), viewer.clone()];

    assert_eq!(
        run(&service, &CommandSender::Player(admin.clone()), &online, "sign add").await,
        vec!["§cYou are not standing on a rank sign."]
    );

    admin.standing_on_sign = true;
    let sender = CommandSender::Player(admin.clone());
    let outcome = execute_group(&service, &sender, &online, &["sign", "add"]).await;
    assert_eq!(outcome.replies, vec!["§aRank sign registered."]);
    assert_eq!(outcome.effects.len(), 2);
    assert!(outcome.effects.iter().all(|e| matches!(e, HostEffect::SignChange(_))));

    assert_eq!(
        run(&service, &sender, &online, "sign add").await,
        vec!["§cThis sign is already registered."]
    );
    assert_eq!(run(&service, &sender, &online, "sign remove").await, vec!["§aRank sign removed."]);
    assert_eq!(
        run(&service, &sender, &online, "sign remove").await,
        vec!["§cYou are not standing on a rank sign."]
    );
    assert!(service.signs().await.expect("signs").is_empty());
}

#[tokio::test]
async fn sign_needs_a_player_and_an_action() {
    let service = service().await;
    assert_eq!(
        run(&service, &CommandSender::Console, &[], "sign add").await,
        vec!["§cOnly players can use this command."]
    );
    let admin = CommandSender::Player(joined(&service, "Alex").await.with_op());
    assert_eq!(
        run(&service, &admin, &[], "sign").await,
        vec!["§cMissing or invalid arguments. Use §e/group help§c."]
    );
    assert_eq!(
        run(&service, &admin, &[], "sign flip").await,
        vec!["§cMissing or invalid arguments. Use §e/group help§c."]
    );
}

// ---------------------------------------------------------------------------
// Language
// ---------------------------------------------------------------------------

#[tokio::test]
async fn language_switch_replies_in_the_new_language() {
    let service = service().await;
    let steve = joined(&service, "Steve").await;
    let sender = CommandSender::Player(steve.clone());

    let outcome = execute_language(&service, &sender, &["deutsch"]).await;
    assert_eq!(outcome.replies, vec!["§aDeine Sprache ist jetzt §fDeutsch§a."]);
    assert_eq!(service.language_code(steve.id).await.expect("code"), "de");

    let outcome = execute_language(&service, &sender, &["klingon"]).await;
    assert_eq!(outcome.replies, vec!["§cUnbekannte Sprache §fklingon§c."]);

    let outcome = execute_language::<&str>(&service, &sender, &[]).await;
    assert_eq!(outcome.replies, vec!["§cVerwendung: /language <name>"]);

    let outcome = execute_language(&service, &CommandSender::Console, &["english"]).await;
    assert_eq!(outcome.replies, vec!["§cOnly players can use this command."]);
}

// ---------------------------------------------------------------------------
// Tab completion
// ---------------------------------------------------------------------------

#[tokio::test]
async fn completion_follows_permissions_and_position() {
    let service = service().await;
    service.create_group("vip", "&6VIP", 10, "").await.expect("vip");
    service.create_group("admin", "&4Admin", 0, "").await.expect("admin");
    let steve = joined(&service, "Steve").await;
    let online = vec![steve.clone()];
    let console = CommandSender::Console;

    assert_eq!(
        complete_group(&service, &CommandSender::Player(steve.clone()), &online, &[""]).await,
        vec!["help", "show"]
    );
    assert_eq!(complete_group(&service, &console, &online, &["s"]).await, vec!["show", "sign"]);
    assert_eq!(complete_group(&service, &console, &online, &["add", "St"]).await, vec!["Steve"]);
    assert_eq!(
        complete_group(&service, &console, &online, &["add", "Steve", "v"]).await,
        vec!["vip"]
    );
    assert_eq!(
        complete_group(&service, &console, &online, &["edit", "vip", ""]).await,
        vec!["name", "prefix", "description", "weight"]
    );
    assert_eq!(complete_group(&service, &console, &online, &["sign", ""]).await, vec!["add", "remove"]);
    assert!(complete_group(&service, &CommandSender::Player(steve), &online, &["add", ""]).await.is_empty());

    assert_eq!(complete_language(&service, &["d"]).await, vec!["Deutsch"]);
    assert!(complete_language(&service, &["a", "b"]).await.is_empty());
}
