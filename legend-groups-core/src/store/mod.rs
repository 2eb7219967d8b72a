//! Persistence layer.
//!
//! [`GroupStore`] is the single seam between the service and a relational
//! database. Two backends implement it:
//!
//! - [`PostgresStore`]: production backend over an `sqlx` connection pool
//! - [`SqliteStore`]: embedded backend over `rusqlite`, also used by tests
//!
//! Both share the same schema:
//!
//! ```sql
//! language  (languageid PK, name, code UNIQUE)
//! "group"   (groupid PK, name UNIQUE, prefix, description, weight)
//! player    (uuid PK, name, languageid -> language, lastseen)
//! joingroup (uuid, groupid -> "group" RESTRICT, joinuntil NULL, PK(uuid, groupid))
//! sign      (world, posx, posy, posz, PK(all))
//! ```

mod postgres;
mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::{Backend, GroupsConfig};
use crate::error::Result;
use crate::types::{
    Group, GroupId, GroupUpdate, Language, LanguageId, Membership, NewGroup, PlayerGroup, PlayerId,
    PlayerRecord, SignLocation,
};

pub use postgres::PostgresStore;
pub use sqlite::SqliteStore;

/// Relational storage for groups, players, memberships, languages and signs.
///
/// Implementations must be safe to share between tasks. Methods returning
/// `Option` or `bool` report absence through the value, not an error; the
/// service decides which absences are errors.
#[async_trait]
pub trait GroupStore: Send + Sync {
    /// Create tables if missing and seed languages into an empty table.
    async fn migrate(&self, seed_languages: &[(String, String)]) -> Result<()>;

    // -- groups ------------------------------------------------------------

    /// Insert a group and return it with its assigned id.
    async fn create_group(&self, group: &NewGroup) -> Result<Group>;
    /// Load a group by id.
    async fn group_by_id(&self, id: GroupId) -> Result<Option<Group>>;
    /// Load a group by exact name.
    async fn group_by_name(&self, name: &str) -> Result<Option<Group>>;
    /// Apply a single-column update. Returns `false` if the group is gone.
    async fn update_group(&self, id: GroupId, update: &GroupUpdate) -> Result<bool>;
    /// All group names in creation order.
    async fn group_names(&self) -> Result<Vec<String>>;
    /// Delete a group. Returns `false` if it did not exist.
    async fn delete_group(&self, id: GroupId) -> Result<bool>;
    /// Number of memberships referencing the group.
    async fn member_count(&self, id: GroupId) -> Result<u64>;

    // -- players -----------------------------------------------------------

    /// Load a player by id.
    async fn player(&self, id: PlayerId) -> Result<Option<PlayerRecord>>;
    /// Load a player by exact name. Names are not unique (a player can
    /// take a name another player held before); the most recently seen
    /// player with that name wins.
    async fn player_by_name(&self, name: &str) -> Result<Option<PlayerRecord>>;
    /// Insert a new player without a language, seen at `seen`.
    async fn insert_player(&self, id: PlayerId, name: &str, seen: DateTime<Utc>) -> Result<()>;
    /// Update a player's name and last-seen time.
    async fn rename_player(&self, id: PlayerId, name: &str, seen: DateTime<Utc>) -> Result<()>;
    /// Update a player's last-seen time.
    async fn touch_player(&self, id: PlayerId, seen: DateTime<Utc>) -> Result<()>;
    /// Set a player's language. Returns `false` if the player is unknown.
    async fn set_player_language(&self, id: PlayerId, language: LanguageId) -> Result<bool>;

    // -- memberships -------------------------------------------------------

    /// Insert a membership, replacing the expiry of an existing one.
    async fn upsert_membership(&self, membership: &Membership) -> Result<()>;
    /// Remove a membership. Returns `false` if there was none.
    async fn remove_membership(&self, player: PlayerId, group: GroupId) -> Result<bool>;
    /// A player's groups ordered by weight, then group id.
    async fn player_groups(&self, player: PlayerId) -> Result<Vec<PlayerGroup>>;
    /// Delete memberships that ended at or before `now`, for one player or
    /// for everyone. Returns the affected players (deduplicated).
    async fn purge_expired(&self, player: Option<PlayerId>, now: DateTime<Utc>) -> Result<Vec<PlayerId>>;

    // -- languages ---------------------------------------------------------

    /// All languages ordered by id.
    async fn languages(&self) -> Result<Vec<Language>>;
    /// Insert a language.
    async fn insert_language(&self, name: &str, code: &str) -> Result<Language>;
    /// The language a player chose, if any.
    async fn player_language(&self, player: PlayerId) -> Result<Option<Language>>;

    // -- signs -------------------------------------------------------------

    /// All registered signs.
    async fn signs(&self) -> Result<Vec<SignLocation>>;
    /// Register a sign. Returns `false` if it was already registered.
    async fn add_sign(&self, location: &SignLocation) -> Result<bool>;
    /// Unregister a sign. Returns `false` if it was not registered.
    async fn remove_sign(&self, location: &SignLocation) -> Result<bool>;
}

/// Open the backend selected by `config.database` and run migrations.
///
/// # Errors
/// Returns a database error if connecting or migrating fails.
pub async fn open_store(config: &GroupsConfig) -> Result<Arc<dyn GroupStore>> {
    let store: Arc<dyn GroupStore> = match config.database.backend {
        Backend::Postgres => Arc::new(PostgresStore::connect(&config.database).await?),
        Backend::Sqlite => Arc::new(SqliteStore::open(
            &config.database.sqlite_path,
            config.database.wal_mode,
        )?),
    };
    let seed: Vec<(String, String)> = config
        .language
        .seed
        .iter()
        .map(|l| (l.name.clone(), l.code.clone()))
        .collect();
    store.migrate(&seed).await?;
    Ok(store)
}
