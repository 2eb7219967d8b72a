//! Embedded SQLite backend.
//!
//! One connection behind a `parking_lot::Mutex`. Every trait method runs its
//! SQL synchronously inside [`SqliteStore::with_conn`]; the lock is never
//! held across an `.await`. Timestamps are stored as unix milliseconds and
//! player ids as hyphenated UUID text.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use tracing::{debug, info};

use super::GroupStore;
use crate::error::{GroupError, Result};
use crate::types::{
    Group, GroupId, GroupUpdate, Language, LanguageId, Membership, NewGroup, PlayerGroup, PlayerId,
    PlayerRecord, SignLocation,
};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS language (
    languageid INTEGER PRIMARY KEY AUTOINCREMENT,
    name       TEXT NOT NULL,
    code       TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS "group" (
    groupid     INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL UNIQUE,
    prefix      TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    weight      INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS player (
    uuid       TEXT PRIMARY KEY,
    name       TEXT NOT NULL,
    languageid INTEGER REFERENCES language(languageid) ON DELETE SET NULL,
    lastseen   INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS player_name_idx ON player(name);
CREATE TABLE IF NOT EXISTS joingroup (
    uuid      TEXT NOT NULL REFERENCES player(uuid) ON DELETE CASCADE,
    groupid   INTEGER NOT NULL REFERENCES "group"(groupid) ON DELETE RESTRICT,
    joinuntil INTEGER,
    PRIMARY KEY (uuid, groupid)
);
CREATE INDEX IF NOT EXISTS joingroup_until_idx ON joingroup(joinuntil);
CREATE TABLE IF NOT EXISTS sign (
    world TEXT NOT NULL,
    posx  INTEGER NOT NULL,
    posy  INTEGER NOT NULL,
    posz  INTEGER NOT NULL,
    PRIMARY KEY (world, posx, posy, posz)
);
"#;

const GROUP_COLUMNS: &str = "groupid, name, prefix, description, weight";

/// Group store over a single SQLite connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open (or create) a database file.
    ///
    /// Tables are created by [`GroupStore::migrate`], not here.
    ///
    /// # Errors
    /// Returns [`GroupError::Sqlite`] on SQLite failures.
    pub fn open<P: AsRef<Path>>(path: P, wal_mode: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&path, flags)?;

        if wal_mode {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        info!(path = %path.display(), wal = wal_mode, "SQLite group store opened");
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    /// Returns [`GroupError::Sqlite`] on SQLite failures.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: PathBuf::from(":memory:"),
        })
    }

    /// Path of the database file (`:memory:` for in-memory stores).
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.conn.lock();
        f(&conn)
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn player_id_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<PlayerId> {
    let text: String = row.get(idx)?;
    text.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn time_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let millis: Option<i64> = row.get(idx)?;
    millis
        .map(|ms| DateTime::from_timestamp_millis(ms).ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, ms)))
        .transpose()
}

fn group_from_row(row: &Row<'_>) -> rusqlite::Result<Group> {
    Ok(Group {
        id: GroupId(row.get(0)?),
        name: row.get(1)?,
        prefix: row.get(2)?,
        description: row.get(3)?,
        weight: row.get(4)?,
    })
}

fn player_from_row(row: &Row<'_>) -> rusqlite::Result<PlayerRecord> {
    Ok(PlayerRecord {
        id: player_id_at(row, 0)?,
        name: row.get(1)?,
        language: row.get::<_, Option<i32>>(2)?.map(LanguageId),
    })
}

fn language_from_row(row: &Row<'_>) -> rusqlite::Result<Language> {
    Ok(Language {
        id: LanguageId(row.get(0)?),
        name: row.get(1)?,
        code: row.get(2)?,
    })
}

fn is_constraint(err: &rusqlite::Error, extended: std::os::raw::c_int) -> bool {
    matches!(err, rusqlite::Error::SqliteFailure(e, _) if e.extended_code == extended)
}

fn map_unique(err: rusqlite::Error, name: &str) -> GroupError {
    if is_constraint(&err, rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE) {
        GroupError::DuplicateGroup(name.to_string())
    } else {
        GroupError::Sqlite(err)
    }
}

// ---------------------------------------------------------------------------
// GroupStore impl
// ---------------------------------------------------------------------------

#[async_trait]
impl GroupStore for SqliteStore {
    async fn migrate(&self, seed_languages: &[(String, String)]) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute_batch(SCHEMA)?;
            let has_lastseen: i64 = conn.query_row(
                "SELECT COUNT(*) FROM pragma_table_info('player') WHERE name = 'lastseen'",
                [],
                |r| r.get(0),
            )?;
            if has_lastseen == 0 {
                conn.execute_batch("ALTER TABLE player ADD COLUMN lastseen INTEGER NOT NULL DEFAULT 0;")?;
                info!("Added player.lastseen column");
            }
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM language", [], |r| r.get(0))?;
            if count == 0 && !seed_languages.is_empty() {
                let tx = conn.unchecked_transaction()?;
                for (name, code) in seed_languages {
                    tx.execute("INSERT INTO language (name, code) VALUES (?1, ?2)", params![name, code])?;
                }
                tx.commit()?;
                info!(count = seed_languages.len(), "Seeded languages");
            }
            debug!(path = %self.path.display(), "SQLite schema ready");
            Ok(())
        })
    }

    async fn create_group(&self, group: &NewGroup) -> Result<Group> {
        self.with_conn(|conn| {
            conn.execute(
                r#"INSERT INTO "group" (name, prefix, description, weight) VALUES (?1, ?2, ?3, ?4)"#,
                params![group.name, group.prefix, group.description, group.weight],
            )
            .map_err(|e| map_unique(e, &group.name))?;
            let id = i32::try_from(conn.last_insert_rowid()).map_err(|_| {
                GroupError::Sqlite(rusqlite::Error::IntegralValueOutOfRange(0, conn.last_insert_rowid()))
            })?;
            Ok(Group {
                id: GroupId(id),
                name: group.name.clone(),
                prefix: group.prefix.clone(),
                description: group.description.clone(),
                weight: group.weight,
            })
        })
    }

    async fn group_by_id(&self, id: GroupId) -> Result<Option<Group>> {
        self.with_conn(|conn| {
            let sql = format!(r#"SELECT {GROUP_COLUMNS} FROM "group" WHERE groupid = ?1"#);
            Ok(conn.query_row(&sql, params![id.0], group_from_row).optional()?)
        })
    }

    async fn group_by_name(&self, name: &str) -> Result<Option<Group>> {
        self.with_conn(|conn| {
            let sql = format!(r#"SELECT {GROUP_COLUMNS} FROM "group" WHERE name = ?1"#);
            Ok(conn.query_row(&sql, params![name], group_from_row).optional()?)
        })
    }

    async fn update_group(&self, id: GroupId, update: &GroupUpdate) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = match update {
                GroupUpdate::Name(name) => conn
                    .execute(r#"UPDATE "group" SET name = ?1 WHERE groupid = ?2"#, params![name, id.0])
                    .map_err(|e| map_unique(e, name))?,
                GroupUpdate::Prefix(prefix) => conn.execute(
                    r#"UPDATE "group" SET prefix = ?1 WHERE groupid = ?2"#,
                    params![prefix, id.0],
                )?,
                GroupUpdate::Description(description) => conn.execute(
                    r#"UPDATE "group" SET description = ?1 WHERE groupid = ?2"#,
                    params![description, id.0],
                )?,
                GroupUpdate::Weight(weight) => conn.execute(
                    r#"UPDATE "group" SET weight = ?1 WHERE groupid = ?2"#,
                    params![weight, id.0],
                )?,
            };
            Ok(changed > 0)
        })
    }

    async fn group_names(&self) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(r#"SELECT name FROM "group" ORDER BY groupid"#)?;
            let names = stmt
                .query_map([], |r| r.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(names)
        })
    }

    async fn delete_group(&self, id: GroupId) -> Result<bool> {
        self.with_conn(|conn| {
            match conn.execute(r#"DELETE FROM "group" WHERE groupid = ?1"#, params![id.0]) {
                Ok(n) => Ok(n > 0),
                Err(e) if is_constraint(&e, rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY) => {
                    let members: i64 =
                        conn.query_row("SELECT COUNT(*) FROM joingroup WHERE groupid = ?1", params![id.0], |r| {
                            r.get(0)
                        })?;
                    Err(GroupError::GroupInUse {
                        name: id.to_string(),
                        members: u64::try_from(members).unwrap_or_default(),
                    })
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    async fn member_count(&self, id: GroupId) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM joingroup WHERE groupid = ?1", params![id.0], |r| r.get(0))?;
            Ok(u64::try_from(count).unwrap_or_default())
        })
    }

    async fn player(&self, id: PlayerId) -> Result<Option<PlayerRecord>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT uuid, name, languageid FROM player WHERE uuid = ?1",
                    params![id.to_string()],
                    player_from_row,
                )
                .optional()?)
        })
    }

    async fn player_by_name(&self, name: &str) -> Result<Option<PlayerRecord>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT uuid, name, languageid FROM player WHERE name = ?1
                     ORDER BY lastseen DESC, uuid LIMIT 1",
                    params![name],
                    player_from_row,
                )
                .optional()?)
        })
    }

    async fn insert_player(&self, id: PlayerId, name: &str, seen: DateTime<Utc>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO player (uuid, name, lastseen) VALUES (?1, ?2, ?3)",
                params![id.to_string(), name, seen.timestamp_millis()],
            )?;
            Ok(())
        })
    }

    async fn rename_player(&self, id: PlayerId, name: &str, seen: DateTime<Utc>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE player SET name = ?1, lastseen = ?2 WHERE uuid = ?3",
                params![name, seen.timestamp_millis(), id.to_string()],
            )?;
            Ok(())
        })
    }

    async fn touch_player(&self, id: PlayerId, seen: DateTime<Utc>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE player SET lastseen = ?1 WHERE uuid = ?2",
                params![seen.timestamp_millis(), id.to_string()],
            )?;
            Ok(())
        })
    }

    async fn set_player_language(&self, id: PlayerId, language: LanguageId) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE player SET languageid = ?1 WHERE uuid = ?2",
                params![language.0, id.to_string()],
            )?;
            Ok(changed > 0)
        })
    }

    async fn upsert_membership(&self, membership: &Membership) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO joingroup (uuid, groupid, joinuntil) VALUES (?1, ?2, ?3)
                 ON CONFLICT(uuid, groupid) DO UPDATE SET joinuntil = excluded.joinuntil",
                params![
                    membership.player.to_string(),
                    membership.group.0,
                    membership.until.map(|t| t.timestamp_millis()),
                ],
            )?;
            Ok(())
        })
    }

    async fn remove_membership(&self, player: PlayerId, group: GroupId) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM joingroup WHERE uuid = ?1 AND groupid = ?2",
                params![player.to_string(), group.0],
            )?;
            Ok(removed > 0)
        })
    }

    async fn player_groups(&self, player: PlayerId) -> Result<Vec<PlayerGroup>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(
                r#"SELECT g.groupid, g.name, g.prefix, g.description, g.weight, j.joinuntil
                   FROM joingroup j JOIN "group" g ON g.groupid = j.groupid
                   WHERE j.uuid = ?1
                   ORDER BY g.weight ASC, g.groupid ASC"#,
            )?;
            let groups = stmt
                .query_map(params![player.to_string()], |row| {
                    Ok(PlayerGroup {
                        group: group_from_row(row)?,
                        until: time_at(row, 5)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(groups)
        })
    }

    async fn purge_expired(&self, player: Option<PlayerId>, now: DateTime<Utc>) -> Result<Vec<PlayerId>> {
        let now_ms = now.timestamp_millis();
        let player = player.map(|p| p.to_string());
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let affected = {
                let mut stmt = tx.prepare_cached(
                    "SELECT DISTINCT uuid FROM joingroup
                     WHERE joinuntil IS NOT NULL AND joinuntil <= ?1 AND (?2 IS NULL OR uuid = ?2)",
                )?;
                let rows = stmt
                    .query_map(params![now_ms, player], |r| player_id_at(r, 0))?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            };
            if !affected.is_empty() {
                tx.execute(
                    "DELETE FROM joingroup
                     WHERE joinuntil IS NOT NULL AND joinuntil <= ?1 AND (?2 IS NULL OR uuid = ?2)",
                    params![now_ms, player],
                )?;
            }
            tx.commit()?;
            Ok(affected)
        })
    }

    async fn languages(&self) -> Result<Vec<Language>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached("SELECT languageid, name, code FROM language ORDER BY languageid")?;
            let languages = stmt
                .query_map([], language_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(languages)
        })
    }

    async fn insert_language(&self, name: &str, code: &str) -> Result<Language> {
        self.with_conn(|conn| {
            let id = conn.query_row(
                "INSERT INTO language (name, code) VALUES (?1, ?2) RETURNING languageid",
                params![name, code],
                |r| r.get::<_, i32>(0),
            )?;
            Ok(Language {
                id: LanguageId(id),
                name: name.to_string(),
                code: code.to_string(),
            })
        })
    }

    async fn player_language(&self, player: PlayerId) -> Result<Option<Language>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT l.languageid, l.name, l.code
                     FROM player p JOIN language l ON l.languageid = p.languageid
                     WHERE p.uuid = ?1",
                    params![player.to_string()],
                    language_from_row,
                )
                .optional()?)
        })
    }

    async fn signs(&self) -> Result<Vec<SignLocation>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached("SELECT world, posx, posy, posz FROM sign")?;
            let signs = stmt
                .query_map([], |r| Ok(SignLocation::new(r.get::<_, String>(0)?, r.get(1)?, r.get(2)?, r.get(3)?)))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(signs)
        })
    }

    async fn add_sign(&self, location: &SignLocation) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO sign (world, posx, posy, posz) VALUES (?1, ?2, ?3, ?4)",
                params![location.world, location.x, location.y, location.z],
            )?;
            Ok(inserted > 0)
        })
    }

    async fn remove_sign(&self, location: &SignLocation) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM sign WHERE world = ?1 AND posx = ?2 AND posy = ?3 AND posz = ?4",
                params![location.world, location.x, location.y, location.z],
            )?;
            Ok(removed > 0)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().expect("open");
        store
            .migrate(&[("English".into(), "en".into()), ("Deutsch".into(), "de".into())])
            .await
            .expect("migrate");
        store
    }

    #[tokio::test]
    async fn migrate_is_idempotent_and_seeds_once() {
        let store = store().await;
        store.migrate(&[("Français".into(), "fr".into())]).await.expect("migrate again");
        let codes: Vec<_> = store.languages().await.expect("languages").into_iter().map(|l| l.code).collect();
        assert_eq!(codes, vec!["en", "de"]);
    }

    #[tokio::test]
    async fn duplicate_group_names_are_rejected() {
        let store = store().await;
        store.create_group(&NewGroup::new("vip", "&6VIP", "", 5)).await.expect("create");
        let err = store
            .create_group(&NewGroup::new("vip", "&6VIP", "", 5))
            .await
            .expect_err("duplicate");
        assert!(matches!(err, GroupError::DuplicateGroup(name) if name == "vip"));
    }

    #[tokio::test]
    async fn player_groups_are_ordered_by_weight() {
        let store = store().await;
        let admin = store.create_group(&NewGroup::new("admin", "&4Admin", "", 0)).await.expect("admin");
        let vip = store.create_group(&NewGroup::new("vip", "&6VIP", "", 5)).await.expect("vip");
        let player = PlayerId::new();
        store.insert_player(player, "Steve", Utc::now()).await.expect("player");
        store.upsert_membership(&Membership::permanent(player, vip.id)).await.expect("vip");
        store.upsert_membership(&Membership::permanent(player, admin.id)).await.expect("admin");
        let names: Vec<_> = store
            .player_groups(player)
            .await
            .expect("groups")
            .into_iter()
            .map(|g| g.group.name)
            .collect();
        assert_eq!(names, vec!["admin", "vip"]);
    }

    #[tokio::test]
    async fn rejoining_replaces_expiry() {
        let store = store().await;
        let vip = store.create_group(&NewGroup::new("vip", "&6VIP", "", 5)).await.expect("vip");
        let player = PlayerId::new();
        store.insert_player(player, "Alex", Utc::now()).await.expect("player");
        let until = Utc::now() + Duration::days(1);
        store
            .upsert_membership(&Membership { player, group: vip.id, until: Some(until) })
            .await
            .expect("timed");
        store.upsert_membership(&Membership::permanent(player, vip.id)).await.expect("permanent");
        let groups = store.player_groups(player).await.expect("groups");
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].until, None);
    }

    #[tokio::test]
    async fn purge_removes_only_ended_memberships() {
        let store = store().await;
        let vip = store.create_group(&NewGroup::new("vip", "&6VIP", "", 5)).await.expect("vip");
        let member = store.create_group(&NewGroup::new("member", "&7Member", "", 10)).await.expect("member");
        let player = PlayerId::new();
        store.insert_player(player, "Alex", Utc::now()).await.expect("player");
        let now = Utc::now();
        store
            .upsert_membership(&Membership { player, group: vip.id, until: Some(now) })
            .await
            .expect("timed");
        store.upsert_membership(&Membership::permanent(player, member.id)).await.expect("permanent");

        let affected = store.purge_expired(None, now).await.expect("purge");
        assert_eq!(affected, vec![player]);
        let groups = store.player_groups(player).await.expect("groups");
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].group.name, "member");
        assert!(store.purge_expired(Some(player), now).await.expect("purge").is_empty());
    }

    #[tokio::test]
    async fn deleting_a_referenced_group_is_refused() {
        let store = store().await;
        let vip = store.create_group(&NewGroup::new("vip", "&6VIP", "", 5)).await.expect("vip");
        let player = PlayerId::new();
        store.insert_player(player, "Alex", Utc::now()).await.expect("player");
        store.upsert_membership(&Membership::permanent(player, vip.id)).await.expect("join");
        let err = store.delete_group(vip.id).await.expect_err("in use");
        assert!(matches!(err, GroupError::GroupInUse { members: 1, .. }));
        store.remove_membership(player, vip.id).await.expect("leave");
        assert!(store.delete_group(vip.id).await.expect("delete"));
        assert!(!store.delete_group(vip.id).await.expect("delete again"));
    }

    #[tokio::test]
    async fn signs_are_a_set() {
        let store = store().await;
        let loc = SignLocation::new("world", 10, 64, -3);
        assert!(store.add_sign(&loc).await.expect("add"));
        assert!(!store.add_sign(&loc).await.expect("add again"));
        assert_eq!(store.signs().await.expect("signs"), vec![loc.clone()]);
        assert!(store.remove_sign(&loc).await.expect("remove"));
        assert!(!store.remove_sign(&loc).await.expect("remove again"));
    }

    #[tokio::test]
    async fn shared_names_resolve_to_the_latest_seen_player() {
        let store = store().await;
        let seen = Utc::now();
        let old = PlayerId::new();
        let new = PlayerId::new();
        store.insert_player(old, "Steve", seen).await.expect("old");
        store.insert_player(new, "Alex", seen).await.expect("new");
        store
            .rename_player(new, "Steve", seen + Duration::seconds(1))
            .await
            .expect("rename");
        let steve = store.player_by_name("Steve").await.expect("lookup");
        assert_eq!(steve.map(|p| p.id), Some(new));
        assert!(store.player_by_name("Alex").await.expect("lookup").is_none());

        store.touch_player(old, seen + Duration::seconds(2)).await.expect("touch");
        let steve = store.player_by_name("Steve").await.expect("lookup");
        assert_eq!(steve.map(|p| p.id), Some(old));
    }

    #[tokio::test]
    async fn migrate_adds_last_seen_to_older_databases() {
        let store = SqliteStore::open_in_memory().expect("open");
        store
            .with_conn(|conn| {
                conn.execute_batch(
                    "CREATE TABLE player (uuid TEXT PRIMARY KEY, name TEXT NOT NULL, languageid INTEGER);
                     INSERT INTO player (uuid, name) VALUES ('00000000-0000-0000-0000-000000000001', 'Steve');",
                )?;
                Ok(())
            })
            .expect("legacy table");
        store.migrate(&[("English".into(), "en".into())]).await.expect("migrate");
        let player = PlayerId::new();
        store.insert_player(player, "Steve", Utc::now()).await.expect("player");
        assert_eq!(
            store.player_by_name("Steve").await.expect("lookup").map(|p| p.id),
            Some(player)
        );
    }

    #[tokio::test]
    async fn player_language_follows_selection() {
        let store = store().await;
        let player = PlayerId::new();
        store.insert_player(player, "Alex", Utc::now()).await.expect("player");
        assert_eq!(store.player_language(player).await.expect("none"), None);
        let de = store
            .languages()
            .await
            .expect("languages")
            .into_iter()
            .find(|l| l.code == "de")
            .expect("de seeded");
        assert!(store.set_player_language(player, de.id).await.expect("set"));
        assert_eq!(store.player_language(player).await.expect("lang"), Some(de));
        assert!(!store.set_player_language(PlayerId::new(), LanguageId(1)).await.expect("unknown"));
    }
}
