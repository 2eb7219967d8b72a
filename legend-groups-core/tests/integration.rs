//! Integration Tests - End-to-End Group Flows
//!
//! These tests drive [`GroupService`] against a file-backed SQLite store:
//! open/migrate/reopen, the full group lifecycle, expiry, languages and
//! signs surviving a restart.

use std::sync::Arc;

use chrono::{Duration, Utc};

use legend_groups_core::config::{Backend, GroupsConfig};
use legend_groups_core::messages::MessageCatalog;
use legend_groups_core::service::JoinKind;
use legend_groups_core::store::{GroupStore, SqliteStore};
use legend_groups_core::{GroupError, GroupService, Membership, PlayerId, SignLocation};

fn sqlite_config(dir: &tempfile::TempDir) -> GroupsConfig {
    let mut config = GroupsConfig::default();
    config.database.backend = Backend::Sqlite;
    config.database.sqlite_path = dir.path().join("groups.db");
    config
}

// ---------------------------------------------------------------------------
// Full lifecycle: create → join → rank → edit → leave → delete
// ---------------------------------------------------------------------------

#[tokio::test]
async fn full_group_lifecycle() {
    let dir = tempfile::tempdir().expect("tempdir");
    let service = GroupService::open(sqlite_config(&dir)).await.expect("open");

    service.create_group("default", "&7Player", 100, "Everyone").await.expect("default");
    service.create_group("vip", "&6VIP", 10, "Supporters").await.expect("vip");
    service.create_group("admin", "&4Admin", 0, "Staff").await.expect("admin");
    assert_eq!(
        service.group_names().await.expect("names"),
        vec!["default", "vip", "admin"]
    );
    assert!(matches!(
        service.create_group("vip", "&6VIP", 10, "").await,
        Err(GroupError::DuplicateGroup(_))
    ));

    let steve = PlayerId::new();
    let joined = service.player_joined(steve, "Steve").await.expect("join");
    assert_eq!(joined.kind, JoinKind::New { joined_default: true });
    assert_eq!(joined.prefix, "&7Player");

    service.add_member("Steve", "vip", Some(Duration::days(30))).await.expect("vip");
    assert_eq!(service.prefix(steve).await.expect("prefix"), "&6VIP");

    service.add_member("Steve", "admin", None).await.expect("admin");
    let groups = service.player_groups(steve).await.expect("groups");
    let names: Vec<_> = groups.iter().map(|g| g.group.name.as_str()).collect();
    assert_eq!(names, vec!["admin", "vip", "default"]);
    assert_eq!(service.prefix(steve).await.expect("prefix"), "&4Admin");

    service.edit_group("admin", "name", "staff").await.expect("rename");
    assert!(matches!(service.group("admin").await, Err(GroupError::GroupNotFound(_))));
    assert!(matches!(
        service.edit_group("staff", "name", "vip").await,
        Err(GroupError::DuplicateGroup(_))
    ));
    assert!(matches!(
        service.edit_group("staff", "colour", "red").await,
        Err(GroupError::UnknownField(_))
    ));

    service.remove_member("Steve", "staff").await.expect("leave");
    service.delete_group("staff").await.expect("delete");
    assert_eq!(service.prefix(steve).await.expect("prefix"), "&6VIP");
}

// ---------------------------------------------------------------------------
// Persistence across restarts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn state_survives_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let steve = PlayerId::new();
    let sign = SignLocation::new("world", 12, 70, -40);
    {
        let service = GroupService::open(sqlite_config(&dir)).await.expect("open");
        service.create_group("vip", "&6VIP", 10, "").await.expect("vip");
        service.player_joined(steve, "Steve").await.expect("join");
        service.add_member("Steve", "vip", None).await.expect("vip");
        service.set_language(steve, "de").await.expect("language");
        service.add_sign(sign.clone()).await.expect("sign");
    }

    let service = GroupService::open(sqlite_config(&dir)).await.expect("reopen");
    assert_eq!(service.prefix(steve).await.expect("prefix"), "&6VIP");
    assert_eq!(service.language_code(steve).await.expect("code"), "de");
    assert_eq!(service.signs().await.expect("signs"), vec![sign]);
    assert_eq!(service.languages().await.expect("languages").len(), 2);
}

// ---------------------------------------------------------------------------
// Expiry
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sweep_purges_only_expired_memberships() {
    let store = Arc::new(SqliteStore::open_in_memory().expect("open"));
    store.migrate(&[]).await.expect("migrate");
    let service = GroupService::new(
        store.clone(),
        GroupsConfig::default(),
        MessageCatalog::builtin("en").expect("messages"),
    );
    let vip = service.create_group("vip", "&6VIP", 10, "").await.expect("vip");
    let member = service.create_group("member", "&aMember", 50, "").await.expect("member");

    let expired = PlayerId::new();
    let active = PlayerId::new();
    service.player_joined(expired, "Old").await.expect("old");
    service.player_joined(active, "New").await.expect("new");

    // Warm the cache while the timed membership is still valid.
    store
        .upsert_membership(&Membership {
            player: expired,
            group: vip.id,
            until: Some(Utc::now() + Duration::milliseconds(200)),
        })
        .await
        .expect("timed");
    store
        .upsert_membership(&Membership::permanent(expired, member.id))
        .await
        .expect("member");
    service.add_member("New", "vip", Some(Duration::days(1))).await.expect("active");
    assert_eq!(service.refresh_prefix(expired).await.expect("prefix"), "&6VIP");

    tokio::time::sleep(std::time::Duration::from_millis(300)).await;
    let swept = service.sweep_expired().await.expect("sweep");
    assert_eq!(swept, vec![expired]);
    assert_eq!(service.prefix(expired).await.expect("prefix"), "&aMember");
    assert_eq!(service.prefix(active).await.expect("prefix"), "&6VIP");
}

#[tokio::test]
async fn cached_prefix_expires_without_sweep() {
    let store = Arc::new(SqliteStore::open_in_memory().expect("open"));
    store.migrate(&[]).await.expect("migrate");
    let service = GroupService::new(
        store,
        GroupsConfig::default(),
        MessageCatalog::builtin("en").expect("messages"),
    );
    service.create_group("vip", "&6VIP", 10, "").await.expect("vip");
    let id = PlayerId::new();
    service.player_joined(id, "Alex").await.expect("join");
    service
        .add_member("Alex", "vip", Some(Duration::milliseconds(200)))
        .await
        .expect("timed");
    assert_eq!(service.prefix(id).await.expect("prefix"), "&6VIP");

    tokio::time::sleep(std::time::Duration::from_millis(300)).await;
    assert_eq!(service.prefix(id).await.expect("prefix"), "&4none");
}

// ---------------------------------------------------------------------------
// Localised messages
// ---------------------------------------------------------------------------

#[tokio::test]
async fn messages_follow_player_language() {
    let dir = tempfile::tempdir().expect("tempdir");
    let service = GroupService::open(sqlite_config(&dir)).await.expect("open");
    let id = PlayerId::new();
    service.player_joined(id, "Alex").await.expect("join");

    let english = service
        .message(Some(id), "miscellaneous.player-join")
        .await
        .expect("en")
        .raw()
        .to_string();
    service.set_language(id, "Deutsch").await.expect("de");
    let german = service
        .message(Some(id), "miscellaneous.player-join")
        .await
        .expect("de")
        .raw()
        .to_string();
    assert_ne!(english, german);
    assert!(german.contains("[playername]"));
}
