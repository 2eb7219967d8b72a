//! PostgreSQL backend tests.
//!
//! Skipped unless `LEGEND_GROUPS_TEST_DATABASE_URL` points at a database
//! the tests may write to. Each run uses a fresh schema so runs do not
//! interfere.

use chrono::{Duration, Utc};

use legend_groups_core::config::{Backend, DatabaseConfig};
use legend_groups_core::store::{GroupStore, PostgresStore};
use legend_groups_core::{GroupError, GroupUpdate, Membership, NewGroup, PlayerId, SignLocation};

const URL_ENV: &str = "LEGEND_GROUPS_TEST_DATABASE_URL";

async fn store() -> Option<PostgresStore> {
    let Ok(url) = std::env::var(URL_ENV) else {
        eprintln!("{URL_ENV} not set; skipping PostgreSQL tests");
        return None;
    };
    let config = DatabaseConfig {
        backend: Backend::Postgres,
        url,
        schema: format!("group_test_{}", PlayerId::new().0.simple()),
        max_connections: 2,
        ..DatabaseConfig::default()
    };
    let store = PostgresStore::connect(&config).await.expect("connect");
    store
        .migrate(&[("English".into(), "en".into()), ("Deutsch".into(), "de".into())])
        .await
        .expect("migrate");
    Some(store)
}

#[tokio::test]
async fn group_crud_round_trip() {
    let Some(store) = store().await else { return };

    let vip = store.create_group(&NewGroup::new("vip", "&6VIP", "", 10)).await.expect("create");
    assert!(matches!(
        store.create_group(&NewGroup::new("vip", "&6VIP", "", 10)).await,
        Err(GroupError::DuplicateGroup(_))
    ));
    assert!(store
        .update_group(vip.id, &GroupUpdate::Prefix("&eVIP".into()))
        .await
        .expect("update"));
    let loaded = store.group_by_name("vip").await.expect("load").expect("exists");
    assert_eq!(loaded.prefix, "&eVIP");
    assert_eq!(store.group_names().await.expect("names"), vec!["vip"]);
    assert!(store.delete_group(vip.id).await.expect("delete"));
    assert!(store.group_by_id(vip.id).await.expect("load").is_none());
}

#[tokio::test]
async fn memberships_and_expiry() {
    let Some(store) = store().await else { return };

    let vip = store.create_group(&NewGroup::new("vip", "&6VIP", "", 10)).await.expect("vip");
    let admin = store.create_group(&NewGroup::new("admin", "&4Admin", "", 0)).await.expect("admin");
    let player = PlayerId::new();
    store.insert_player(player, "Steve", Utc::now()).await.expect("player");
    store
        .upsert_membership(&Membership {
            player,
            group: vip.id,
            until: Some(Utc::now() - Duration::seconds(1)),
        })
        .await
        .expect("expired");
    store.upsert_membership(&Membership::permanent(player, admin.id)).await.expect("admin");

    assert!(matches!(
        store.delete_group(admin.id).await,
        Err(GroupError::GroupInUse { members: 1, .. })
    ));
    assert_eq!(store.purge_expired(None, Utc::now()).await.expect("purge"), vec![player]);
    let groups = store.player_groups(player).await.expect("groups");
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].group.name, "admin");
}

#[tokio::test]
async fn players_languages_and_signs() {
    let Some(store) = store().await else { return };

    let player = PlayerId::new();
    let seen = Utc::now();
    store.insert_player(player, "Alex", seen).await.expect("player");
    store.rename_player(player, "Alex2", seen).await.expect("rename");
    assert_eq!(
        store.player_by_name("Alex2").await.expect("load").map(|p| p.id),
        Some(player)
    );
    let newcomer = PlayerId::new();
    store
        .insert_player(newcomer, "Alex2", seen + Duration::seconds(1))
        .await
        .expect("newcomer");
    assert_eq!(
        store.player_by_name("Alex2").await.expect("load").map(|p| p.id),
        Some(newcomer)
    );
    store.touch_player(player, seen + Duration::seconds(2)).await.expect("touch");
    assert_eq!(
        store.player_by_name("Alex2").await.expect("load").map(|p| p.id),
        Some(player)
    );
    let es = store.insert_language("Español", "es").await.expect("language");
    assert!(store.set_player_language(player, es.id).await.expect("set"));
    assert_eq!(store.player_language(player).await.expect("lang"), Some(es));

    let sign = SignLocation::new("world", 0, 64, 0);
    assert!(store.add_sign(&sign).await.expect("add"));
    assert!(!store.add_sign(&sign).await.expect("add again"));
    assert!(store.remove_sign(&sign).await.expect("remove"));
}
