//! PostgreSQL backend over an `sqlx` connection pool.
//!
//! Tables live in a dedicated schema (`"group"` by default). The schema is
//! put on every pooled connection's `search_path`, so statements use bare
//! table names.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{FromRow, PgPool};
use tracing::{debug, info};

use super::GroupStore;
use crate::config::DatabaseConfig;
use crate::error::{GroupError, Result};
use crate::types::{
    Group, GroupId, GroupUpdate, Language, LanguageId, Membership, NewGroup, PlayerGroup, PlayerId,
    PlayerRecord, SignLocation,
};

/// Tables, created in order. The schema itself is created separately
/// because its name comes from configuration.
const MIGRATIONS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS language (
        languageid SERIAL PRIMARY KEY,
        name       TEXT NOT NULL,
        code       TEXT NOT NULL UNIQUE
    )",
    r#"CREATE TABLE IF NOT EXISTS "group" (
        groupid     SERIAL PRIMARY KEY,
        name        TEXT NOT NULL UNIQUE,
        prefix      TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        weight      INTEGER NOT NULL
    )"#,
    "CREATE TABLE IF NOT EXISTS player (
        uuid       TEXT PRIMARY KEY,
        name       TEXT NOT NULL,
        languageid INTEGER REFERENCES language(languageid) ON DELETE SET NULL,
        lastseen   TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    "ALTER TABLE player ADD COLUMN IF NOT EXISTS lastseen TIMESTAMPTZ NOT NULL DEFAULT now()",
    "CREATE INDEX IF NOT EXISTS player_name_idx ON player(name)",
    r#"CREATE TABLE IF NOT EXISTS joingroup (
        uuid      TEXT NOT NULL REFERENCES player(uuid) ON DELETE CASCADE,
        groupid   INTEGER NOT NULL REFERENCES "group"(groupid) ON DELETE RESTRICT,
        joinuntil TIMESTAMPTZ,
        PRIMARY KEY (uuid, groupid)
    )"#,
    "CREATE INDEX IF NOT EXISTS joingroup_until_idx ON joingroup(joinuntil)",
    "CREATE TABLE IF NOT EXISTS sign (
        world TEXT NOT NULL,
        posx  INTEGER NOT NULL,
        posy  INTEGER NOT NULL,
        posz  INTEGER NOT NULL,
        PRIMARY KEY (world, posx, posy, posz)
    )",
];

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

#[derive(FromRow)]
struct GroupRow {
    groupid: i32,
    name: String,
    prefix: String,
    description: String,
    weight: i32,
}

impl From<GroupRow> for Group {
    fn from(row: GroupRow) -> Self {
        Self {
            id: GroupId(row.groupid),
            name: row.name,
            prefix: row.prefix,
            description: row.description,
            weight: row.weight,
        }
    }
}

#[derive(FromRow)]
struct PlayerGroupRow {
    #[sqlx(flatten)]
    group: GroupRow,
    joinuntil: Option<DateTime<Utc>>,
}

#[derive(FromRow)]
struct PlayerRow {
    uuid: String,
    name: String,
    languageid: Option<i32>,
}

impl TryFrom<PlayerRow> for PlayerRecord {
    type Error = GroupError;

    fn try_from(row: PlayerRow) -> Result<Self> {
        Ok(Self {
            id: parse_player_id(&row.uuid)?,
            name: row.name,
            language: row.languageid.map(LanguageId),
        })
    }
}

#[derive(FromRow)]
struct LanguageRow {
    languageid: i32,
    name: String,
    code: String,
}

impl From<LanguageRow> for Language {
    fn from(row: LanguageRow) -> Self {
        Self {
            id: LanguageId(row.languageid),
            name: row.name,
            code: row.code,
        }
    }
}

#[derive(FromRow)]
struct SignRow {
    world: String,
    posx: i32,
    posy: i32,
    posz: i32,
}

fn parse_player_id(text: &str) -> Result<PlayerId> {
    text.parse()
        .map_err(|e| GroupError::Postgres(sqlx::Error::Decode(Box::new(e))))
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

// ---------------------------------------------------------------------------
// PostgresStore
// ---------------------------------------------------------------------------

/// Group store backed by a PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
    schema: String,
}

impl PostgresStore {
    /// Connect a pool using `config.url`, overriding credentials with
    /// `config.user`/`config.password` when set.
    ///
    /// # Errors
    /// Returns [`GroupError::Postgres`] if the URL is invalid or no
    /// connection can be established.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let mut options: PgConnectOptions = config.url.parse()?;
        if let Some(user) = &config.user {
            options = options.username(user);
        }
        if let Some(password) = &config.password {
            options = options.password(password);
        }
        options = options.options([("search_path", quote_ident(&config.schema))]);

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
            .connect_with(options)
            .await?;

        info!(
            schema = %config.schema,
            max_connections = config.max_connections,
            "PostgreSQL group store connected"
        );
        Ok(Self::from_pool(Arc::new(pool), config.schema.clone()))
    }

    /// Wrap an existing pool. Its connections must already have `schema`
    /// on their `search_path`.
    #[must_use]
    pub fn from_pool(pool: Arc<PgPool>, schema: impl Into<String>) -> Self {
        Self {
            pool,
            schema: schema.into(),
        }
    }

    /// The underlying pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl GroupStore for PostgresStore {
    async fn migrate(&self, seed_languages: &[(String, String)]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {}", quote_ident(&self.schema)))
            .execute(&mut *tx)
            .await?;
        for statement in MIGRATIONS {
            sqlx::query(statement).execute(&mut *tx).await?;
        }

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM language")
            .fetch_one(&mut *tx)
            .await?;
        if count == 0 {
            for (name, code) in seed_languages {
                sqlx::query("INSERT INTO language (name, code) VALUES ($1, $2) ON CONFLICT (code) DO NOTHING")
                    .bind(name)
                    .bind(code)
                    .execute(&mut *tx)
                    .await?;
            }
            info!(count = seed_languages.len(), "Seeded languages");
        }
        tx.commit().await?;
        debug!(schema = %self.schema, "PostgreSQL schema ready");
        Ok(())
    }

    async fn create_group(&self, group: &NewGroup) -> Result<Group> {
        let row = sqlx::query_as::<_, GroupRow>(
            r#"INSERT INTO "group" (name, prefix, description, weight) VALUES ($1, $2, $3, $4)
               RETURNING groupid, name, prefix, description, weight"#,
        )
        .bind(&group.name)
        .bind(&group.prefix)
        .bind(&group.description)
        .bind(group.weight)
        .fetch_one(self.pool.as_ref())
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                GroupError::DuplicateGroup(group.name.clone())
            } else {
                e.into()
            }
        })?;
        Ok(row.into())
    }

    async fn group_by_id(&self, id: GroupId) -> Result<Option<Group>> {
        let row = sqlx::query_as::<_, GroupRow>(
            r#"SELECT groupid, name, prefix, description, weight FROM "group" WHERE groupid = $1"#,
        )
        .bind(id.0)
        .fetch_optional(self.pool.as_ref())
        .await?;
        Ok(row.map(Group::from))
    }

    async fn group_by_name(&self, name: &str) -> Result<Option<Group>> {
        let row = sqlx::query_as::<_, GroupRow>(
            r#"SELECT groupid, name, prefix, description, weight FROM "group" WHERE name = $1"#,
        )
        .bind(name)
        .fetch_optional(self.pool.as_ref())
        .await?;
        Ok(row.map(Group::from))
    }

    async fn update_group(&self, id: GroupId, update: &GroupUpdate) -> Result<bool> {
        let query = match update {
            GroupUpdate::Name(name) => {
                sqlx::query(r#"UPDATE "group" SET name = $1 WHERE groupid = $2"#).bind(name.clone())
            }
            GroupUpdate::Prefix(prefix) => {
                sqlx::query(r#"UPDATE "group" SET prefix = $1 WHERE groupid = $2"#).bind(prefix.clone())
            }
            GroupUpdate::Description(description) => {
                sqlx::query(r#"UPDATE "group" SET description = $1 WHERE groupid = $2"#).bind(description.clone())
            }
            GroupUpdate::Weight(weight) => {
                sqlx::query(r#"UPDATE "group" SET weight = $1 WHERE groupid = $2"#).bind(*weight)
            }
        };
        let result = query.bind(id.0).execute(self.pool.as_ref()).await.map_err(|e| match update {
            GroupUpdate::Name(name) if is_unique_violation(&e) => GroupError::DuplicateGroup(name.clone()),
            _ => e.into(),
        })?;
        Ok(result.rows_affected() > 0)
    }

    async fn group_names(&self) -> Result<Vec<String>> {
        Ok(sqlx::query_scalar(r#"SELECT name FROM "group" ORDER BY groupid"#)
            .fetch_all(self.pool.as_ref())
            .await?)
    }

    async fn delete_group(&self, id: GroupId) -> Result<bool> {
        match sqlx::query(r#"DELETE FROM "group" WHERE groupid = $1"#)
            .bind(id.0)
            .execute(self.pool.as_ref())
            .await
        {
            Ok(result) => Ok(result.rows_affected() > 0),
            Err(e) if is_foreign_key_violation(&e) => Err(GroupError::GroupInUse {
                name: id.to_string(),
                members: self.member_count(id).await?,
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn member_count(&self, id: GroupId) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM joingroup WHERE groupid = $1")
            .bind(id.0)
            .fetch_one(self.pool.as_ref())
            .await?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn player(&self, id: PlayerId) -> Result<Option<PlayerRecord>> {
        sqlx::query_as::<_, PlayerRow>("SELECT uuid, name, languageid FROM player WHERE uuid = $1")
            .bind(id.to_string())
            .fetch_optional(self.pool.as_ref())
            .await?
            .map(PlayerRecord::try_from)
            .transpose()
    }

    async fn player_by_name(&self, name: &str) -> Result<Option<PlayerRecord>> {
        sqlx::query_as::<_, PlayerRow>(
            "SELECT uuid, name, languageid FROM player WHERE name = $1
             ORDER BY lastseen DESC, uuid LIMIT 1",
        )
            .bind(name)
            .fetch_optional(self.pool.as_ref())
            .await?
            .map(PlayerRecord::try_from)
            .transpose()
    }

    async fn insert_player(&self, id: PlayerId, name: &str, seen: DateTime<Utc>) -> Result<()> {
        sqlx::query("INSERT INTO player (uuid, name, lastseen) VALUES ($1, $2, $3)")
            .bind(id.to_string())
            .bind(name)
            .bind(seen)
            .execute(self.pool.as_ref())
            .await?;
        Ok(())
    }

    async fn rename_player(&self, id: PlayerId, name: &str, seen: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE player SET name = $1, lastseen = $2 WHERE uuid = $3")
            .bind(name)
            .bind(seen)
            .bind(id.to_string())
            .execute(self.pool.as_ref())
            .await?;
        Ok(())
    }

    async fn touch_player(&self, id: PlayerId, seen: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE player SET lastseen = $1 WHERE uuid = $2")
            .bind(seen)
            .bind(id.to_string())
            .execute(self.pool.as_ref())
            .await?;
        Ok(())
    }

    async fn set_player_language(&self, id: PlayerId, language: LanguageId) -> Result<bool> {
        let result = sqlx::query("UPDATE player SET languageid = $1 WHERE uuid = $2")
            .bind(language.0)
            .bind(id.to_string())
            .execute(self.pool.as_ref())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn upsert_membership(&self, membership: &Membership) -> Result<()> {
        sqlx::query(
            "INSERT INTO joingroup (uuid, groupid, joinuntil) VALUES ($1, $2, $3)
             ON CONFLICT (uuid, groupid) DO UPDATE SET joinuntil = EXCLUDED.joinuntil",
        )
        .bind(membership.player.to_string())
        .bind(membership.group.0)
        .bind(membership.until)
        .execute(self.pool.as_ref())
        .await?;
        Ok(())
    }

    async fn remove_membership(&self, player: PlayerId, group: GroupId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM joingroup WHERE uuid = $1 AND groupid = $2")
            .bind(player.to_string())
            .bind(group.0)
            .execute(self.pool.as_ref())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn player_groups(&self, player: PlayerId) -> Result<Vec<PlayerGroup>> {
        let rows = sqlx::query_as::<_, PlayerGroupRow>(
            r#"SELECT g.groupid, g.name, g.prefix, g.description, g.weight, j.joinuntil
               FROM joingroup j JOIN "group" g ON g.groupid = j.groupid
               WHERE j.uuid = $1
               ORDER BY g.weight ASC, g.groupid ASC"#,
        )
        .bind(player.to_string())
        .fetch_all(self.pool.as_ref())
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| PlayerGroup {
                group: row.group.into(),
                until: row.joinuntil,
            })
            .collect())
    }

    async fn purge_expired(&self, player: Option<PlayerId>, now: DateTime<Utc>) -> Result<Vec<PlayerId>> {
        let uuids: Vec<String> = sqlx::query_scalar(
            "DELETE FROM joingroup
             WHERE joinuntil IS NOT NULL AND joinuntil <= $1 AND ($2::text IS NULL OR uuid = $2)
             RETURNING uuid",
        )
        .bind(now)
        .bind(player.map(|p| p.to_string()))
        .fetch_all(self.pool.as_ref())
        .await?;

        let mut affected = uuids
            .iter()
            .map(|u| parse_player_id(u))
            .collect::<Result<Vec<_>>>()?;
        affected.sort_unstable();
        affected.dedup();
        Ok(affected)
    }

    async fn languages(&self) -> Result<Vec<Language>> {
        let rows = sqlx::query_as::<_, LanguageRow>("SELECT languageid, name, code FROM language ORDER BY languageid")
            .fetch_all(self.pool.as_ref())
            .await?;
        Ok(rows.into_iter().map(Language::from).collect())
    }

    async fn insert_language(&self, name: &str, code: &str) -> Result<Language> {
        let row = sqlx::query_as::<_, LanguageRow>(
            "INSERT INTO language (name, code) VALUES ($1, $2) RETURNING languageid, name, code",
        )
        .bind(name)
        .bind(code)
        .fetch_one(self.pool.as_ref())
        .await?;
        Ok(row.into())
    }

    async fn player_language(&self, player: PlayerId) -> Result<Option<Language>> {
        let row = sqlx::query_as::<_, LanguageRow>(
            "SELECT l.languageid, l.name, l.code
             FROM player p JOIN language l ON l.languageid = p.languageid
             WHERE p.uuid = $1",
        )
        .bind(player.to_string())
        .fetch_optional(self.pool.as_ref())
        .await?;
        Ok(row.map(Language::from))
    }

    async fn signs(&self) -> Result<Vec<SignLocation>> {
        let rows = sqlx::query_as::<_, SignRow>("SELECT world, posx, posy, posz FROM sign")
            .fetch_all(self.pool.as_ref())
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| SignLocation::new(r.world, r.posx, r.posy, r.posz))
            .collect())
    }

    async fn add_sign(&self, location: &SignLocation) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO sign (world, posx, posy, posz) VALUES ($1, $2, $3, $4) ON CONFLICT DO NOTHING",
        )
        .bind(&location.world)
        .bind(location.x)
        .bind(location.y)
        .bind(location.z)
        .execute(self.pool.as_ref())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_sign(&self, location: &SignLocation) -> Result<bool> {
        let result = sqlx::query("DELETE FROM sign WHERE world = $1 AND posx = $2 AND posy = $3 AND posz = $4")
            .bind(&location.world)
            .bind(location.x)
            .bind(location.y)
            .bind(location.z)
            .execute(self.pool.as_ref())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
