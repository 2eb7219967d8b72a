//! The [`GroupService`] facade.
//!
//! Hosts, the command layer and the CLI talk to the system only through
//! this type. It owns the store handle, the caches, the message catalogs
//! and the runtime counters, and it is cheap to clone.
//!
//! Cache rules:
//! - a player's prefix is dropped on join/leave/rename of that player
//! - every prefix is dropped when any group is edited or deleted
//! - a cached prefix stops answering at its earliest membership expiry
//! - a lookup that overlapped any invalidation is returned but not cached

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

use crate::cache::{CachedPrefix, LanguageCache, PrefixCache, SignRegistry};
use crate::config::GroupsConfig;
use crate::error::{GroupError, Result};
use crate::format::MessageFormatter;
use crate::messages::MessageCatalog;
use crate::metrics::{CounterSnapshot, GroupCounters};
use crate::store::{open_store, GroupStore};
use crate::types::{
    Group, GroupField, GroupUpdate, Language, Membership, NewGroup, PlayerGroup, PlayerId, PlayerRecord,
    SignLocation,
};

/// What happened when a player connected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinKind {
    /// First time seen. `joined_default` is false when the default group
    /// does not exist.
    New {
        /// Whether the player was put into the default group.
        joined_default: bool,
    },
    /// Known player whose name changed.
    Renamed {
        /// Name stored before this join.
        previous: String,
    },
    /// Known player, same name.
    Returning,
}

/// Result of [`GroupService::player_joined`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    /// The stored player after the join.
    pub player: PlayerRecord,
    /// How the join was handled.
    pub kind: JoinKind,
    /// Freshly resolved prefix.
    pub prefix: String,
}

/// A membership that was just added or removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipChange {
    /// The member.
    pub player: PlayerRecord,
    /// The group.
    pub group: Group,
    /// Expiry of the new membership; always `None` for removals.
    pub until: Option<DateTime<Utc>>,
}

struct Inner {
    store: Arc<dyn GroupStore>,
    config: GroupsConfig,
    messages: MessageCatalog,
    prefixes: PrefixCache,
    languages: LanguageCache,
    signs: SignRegistry,
    counters: GroupCounters,
}

/// Facade over the store, caches and message catalogs.
#[derive(Clone)]
pub struct GroupService {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for GroupService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupService")
            .field("backend", &self.inner.config.database.backend)
            .field("cached_prefixes", &self.inner.prefixes.len())
            .field("signs_loaded", &self.inner.signs.is_loaded())
            .finish_non_exhaustive()
    }
}

impl GroupService {
    /// Build a service over an already migrated store.
    #[must_use]
    pub fn new(store: Arc<dyn GroupStore>, config: GroupsConfig, messages: MessageCatalog) -> Self {
        let inner = Inner {
            prefixes: PrefixCache::new(config.cache.prefix_capacity),
            languages: LanguageCache::new(config.cache.language_capacity),
            signs: SignRegistry::new(),
            counters: GroupCounters::new(),
            store,
            config,
            messages,
        };
        Self { inner: Arc::new(inner) }
    }

    /// Open the configured store, migrate it and load message catalogs for
    /// every stored language.
    ///
    /// # Errors
    /// Returns storage errors from connecting or migrating, and config/IO
    /// errors from loading message files.
    pub async fn open(config: GroupsConfig) -> Result<Self> {
        let store = open_store(&config).await?;
        let codes: Vec<String> = store.languages().await?.into_iter().map(|l| l.code).collect();
        let messages = MessageCatalog::load(&config.language, &codes)?;
        info!(languages = codes.len(), "Group service ready");
        Ok(Self::new(store, config, messages))
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &GroupsConfig {
        &self.inner.config
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn GroupStore> {
        &self.inner.store
    }

    /// The message catalogs.
    #[must_use]
    pub fn messages(&self) -> &MessageCatalog {
        &self.inner.messages
    }

    /// Current counter values.
    #[must_use]
    pub fn counters(&self) -> CounterSnapshot {
        self.inner.counters.snapshot()
    }

    // ------------------------------------------------------------------
    // Groups
    // ------------------------------------------------------------------

    /// Create a group.
    ///
    /// # Errors
    /// [`GroupError::InvalidValue`] for a blank name,
    /// [`GroupError::DuplicateGroup`] if the name is taken.
    #[instrument(skip(self, prefix, description))]
    pub async fn create_group(&self, name: &str, prefix: &str, weight: i32, description: &str) -> Result<Group> {
        if name.trim().is_empty() {
            return Err(GroupError::InvalidValue {
                field: GroupField::Name.to_string(),
                value: name.to_string(),
            });
        }
        let group = self
            .inner
            .store
            .create_group(&NewGroup::new(name, prefix, description, weight))
            .await?;
        info!(group = %group.name, id = %group.id, weight, "Group created");
        Ok(group)
    }

    /// Look up a group by name.
    ///
    /// # Errors
    /// [`GroupError::GroupNotFound`] if no such group exists.
    pub async fn group(&self, name: &str) -> Result<Group> {
        self.inner
            .store
            .group_by_name(name)
            .await?
            .ok_or_else(|| GroupError::GroupNotFound(name.to_string()))
    }

    /// All group names in creation order.
    ///
    /// # Errors
    /// Storage errors only.
    pub async fn group_names(&self) -> Result<Vec<String>> {
        self.inner.store.group_names().await
    }

    /// Change one field of a group. `field` is matched case-insensitively.
    ///
    /// # Errors
    /// [`GroupError::GroupNotFound`], [`GroupError::UnknownField`],
    /// [`GroupError::InvalidValue`], or [`GroupError::DuplicateGroup`] when
    /// renaming onto an existing name.
    #[instrument(skip(self))]
    pub async fn edit_group(&self, name: &str, field: &str, value: &str) -> Result<Group> {
        let group = self.group(name).await?;
        let update = GroupUpdate::parse(field.parse()?, value)?;
        if !self.inner.store.update_group(group.id, &update).await? {
            return Err(GroupError::GroupNotFound(name.to_string()));
        }
        self.inner.prefixes.clear();
        info!(group = %name, field = %update.field(), "Group edited");
        self.inner
            .store
            .group_by_id(group.id)
            .await?
            .ok_or_else(|| GroupError::GroupNotFound(name.to_string()))
    }

    /// Delete a group that has no members.
    ///
    /// # Errors
    /// [`GroupError::GroupNotFound`], or [`GroupError::GroupInUse`] while
    /// memberships still reference it.
    #[instrument(skip(self))]
    pub async fn delete_group(&self, name: &str) -> Result<()> {
        let group = self.group(name).await?;
        let members = self.inner.store.member_count(group.id).await?;
        if members > 0 {
            return Err(GroupError::GroupInUse {
                name: group.name,
                members,
            });
        }
        match self.inner.store.delete_group(group.id).await {
            Ok(true) => {}
            Ok(false) => return Err(GroupError::GroupNotFound(name.to_string())),
            Err(GroupError::GroupInUse { members, .. }) => {
                return Err(GroupError::GroupInUse {
                    name: group.name,
                    members,
                })
            }
            Err(e) => return Err(e),
        }
        self.inner.prefixes.clear();
        info!(group = %name, "Group deleted");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Memberships
    // ------------------------------------------------------------------

    /// Add a player (by name) to a group, permanently or for `duration`.
    /// Joining a group the player is already in replaces the expiry.
    ///
    /// # Errors
    /// [`GroupError::PlayerNotFound`], [`GroupError::GroupNotFound`], or
    /// [`GroupError::InvalidDuration`] if the expiry overflows.
    #[instrument(skip(self))]
    pub async fn add_member(&self, player_name: &str, group_name: &str, duration: Option<Duration>) -> Result<MembershipChange> {
        let player = self
            .inner
            .store
            .player_by_name(player_name)
            .await?
            .ok_or_else(|| GroupError::PlayerNotFound(player_name.to_string()))?;
        let until = duration
            .map(|d| {
                Utc::now()
                    .checked_add_signed(d)
                    .ok_or_else(|| GroupError::InvalidDuration(d.to_string()))
            })
            .transpose()?;
        let group = self.join_group(player.id, group_name, until).await?;
        Ok(MembershipChange { player, group, until })
    }

    /// Put a known player into a group until `until` (`None` = permanent).
    ///
    /// # Errors
    /// [`GroupError::PlayerNotFound`] or [`GroupError::GroupNotFound`].
    pub async fn join_group(&self, player: PlayerId, group_name: &str, until: Option<DateTime<Utc>>) -> Result<Group> {
        if self.inner.store.player(player).await?.is_none() {
            return Err(GroupError::PlayerNotFound(player.to_string()));
        }
        let group = self.group(group_name).await?;
        self.inner
            .store
            .upsert_membership(&Membership {
                player,
                group: group.id,
                until,
            })
            .await?;
        self.inner.prefixes.invalidate(&player);
        GroupCounters::incr(&self.inner.counters.memberships_added);
        info!(%player, group = %group.name, until = ?until, "Player joined group");
        Ok(group)
    }

    /// Remove a player (by name) from a group.
    ///
    /// # Errors
    /// [`GroupError::PlayerNotFound`], [`GroupError::GroupNotFound`], or
    /// [`GroupError::NotAMember`].
    #[instrument(skip(self))]
    pub async fn remove_member(&self, player_name: &str, group_name: &str) -> Result<MembershipChange> {
        let player = self
            .inner
            .store
            .player_by_name(player_name)
            .await?
            .ok_or_else(|| GroupError::PlayerNotFound(player_name.to_string()))?;
        let group = self.group(group_name).await?;
        if !self.inner.store.remove_membership(player.id, group.id).await? {
            return Err(GroupError::NotAMember {
                player: player.name,
                group: group.name,
            });
        }
        self.inner.prefixes.invalidate(&player.id);
        GroupCounters::incr(&self.inner.counters.memberships_removed);
        info!(player = %player.name, group = %group.name, "Player left group");
        Ok(MembershipChange {
            player,
            group,
            until: None,
        })
    }

    /// A player's current groups, best rank first. Expired memberships are
    /// purged before listing.
    ///
    /// # Errors
    /// Storage errors only.
    pub async fn player_groups(&self, player: PlayerId) -> Result<Vec<PlayerGroup>> {
        self.purge_player(player).await?;
        self.inner.store.player_groups(player).await
    }

    async fn purge_player(&self, player: PlayerId) -> Result<()> {
        let purged = self.inner.store.purge_expired(Some(player), Utc::now()).await?;
        if !purged.is_empty() {
            self.inner.prefixes.invalidate(&player);
            GroupCounters::incr(&self.inner.counters.expired_purges);
            debug!(%player, "Purged expired memberships");
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Prefixes
    // ------------------------------------------------------------------

    /// The player's display prefix: the prefix of their lowest-weight
    /// group, or the configured none-prefix.
    ///
    /// # Errors
    /// Storage errors only.
    pub async fn prefix(&self, player: PlayerId) -> Result<String> {
        let now = Utc::now();
        if let Some(prefix) = self.inner.prefixes.get(&player, now) {
            GroupCounters::incr(&self.inner.counters.prefix_hits);
            return Ok(prefix);
        }
        GroupCounters::incr(&self.inner.counters.prefix_misses);

        self.purge_player(player).await?;
        let generation = self.inner.prefixes.generation();
        let groups = self.inner.store.player_groups(player).await?;
        let prefix = groups
            .first()
            .map_or_else(|| self.inner.config.groups.none_prefix.clone(), |g| g.group.prefix.clone());
        let valid_until = groups.iter().filter_map(|g| g.until).min();
        let cached = self.inner.prefixes.insert_if_current(
            player,
            generation,
            CachedPrefix {
                prefix: prefix.clone(),
                valid_until,
            },
        );
        if !cached {
            debug!(%player, "Prefix changed during lookup, not cached");
        }
        Ok(prefix)
    }

    /// Drop the cached prefix and resolve it again.
    ///
    /// # Errors
    /// Storage errors only.
    pub async fn refresh_prefix(&self, player: PlayerId) -> Result<String> {
        self.inner.prefixes.invalidate(&player);
        self.prefix(player).await
    }

    // ------------------------------------------------------------------
    // Players
    // ------------------------------------------------------------------

    /// Record a player connecting. New players are stored and put into the
    /// default group; known players are renamed if their name changed.
    ///
    /// # Errors
    /// Storage errors only. A missing default group is logged, not raised.
    #[instrument(skip(self))]
    pub async fn player_joined(&self, id: PlayerId, name: &str) -> Result<JoinOutcome> {
        let store = &self.inner.store;
        let now = Utc::now();
        let kind = match store.player(id).await? {
            None => {
                store.insert_player(id, name, now).await?;
                GroupCounters::incr(&self.inner.counters.players_created);
                let default_group = &self.inner.config.groups.default_group;
                let joined_default = match self.join_group(id, default_group, None).await {
                    Ok(_) => true,
                    Err(GroupError::GroupNotFound(_)) => {
                        warn!(group = %default_group, "Default group does not exist");
                        false
                    }
                    Err(e) => return Err(e),
                };
                info!(%id, name, "New player registered");
                JoinKind::New { joined_default }
            }
            Some(record) if record.name != name => {
                store.rename_player(id, name, now).await?;
                info!(%id, from = %record.name, to = name, "Player renamed");
                JoinKind::Renamed { previous: record.name }
            }
            Some(_) => {
                store.touch_player(id, now).await?;
                JoinKind::Returning
            }
        };
        let player = store
            .player(id)
            .await?
            .ok_or_else(|| GroupError::PlayerNotFound(id.to_string()))?;
        let prefix = self.refresh_prefix(id).await?;
        Ok(JoinOutcome { player, kind, prefix })
    }

    // ------------------------------------------------------------------
    // Languages & messages
    // ------------------------------------------------------------------

    /// All selectable languages.
    ///
    /// # Errors
    /// Storage errors only.
    pub async fn languages(&self) -> Result<Vec<Language>> {
        self.inner.store.languages().await
    }

    /// The message language code for a player, falling back to the
    /// configured default.
    ///
    /// # Errors
    /// Storage errors only.
    pub async fn language_code(&self, player: PlayerId) -> Result<String> {
        if let Some(code) = self.inner.languages.get(&player) {
            GroupCounters::incr(&self.inner.counters.language_hits);
            return Ok(code);
        }
        GroupCounters::incr(&self.inner.counters.language_misses);
        let code = self
            .inner
            .store
            .player_language(player)
            .await?
            .map_or_else(|| self.inner.config.language.default_code.clone(), |l| l.code);
        self.inner.languages.insert(player, code.clone());
        Ok(code)
    }

    /// Choose a player's language by name or code, case-insensitively.
    ///
    /// # Errors
    /// [`GroupError::LanguageNotFound`] or [`GroupError::PlayerNotFound`].
    #[instrument(skip(self))]
    pub async fn set_language(&self, player: PlayerId, name: &str) -> Result<Language> {
        let language = self
            .languages()
            .await?
            .into_iter()
            .find(|l| l.name.eq_ignore_ascii_case(name) || l.code.eq_ignore_ascii_case(name))
            .ok_or_else(|| GroupError::LanguageNotFound(name.to_string()))?;
        if !self.inner.store.set_player_language(player, language.id).await? {
            return Err(GroupError::PlayerNotFound(player.to_string()));
        }
        self.inner.languages.insert(player, language.code.clone());
        info!(%player, language = %language.code, "Language changed");
        Ok(language)
    }

    /// The template for `key` in the player's language (or the default
    /// language when `player` is `None`).
    ///
    /// # Errors
    /// Storage errors from resolving the player's language.
    pub async fn message(&self, player: Option<PlayerId>, key: &str) -> Result<MessageFormatter> {
        let code = match player {
            Some(player) => self.language_code(player).await?,
            None => self.inner.messages.default_code().to_string(),
        };
        Ok(MessageFormatter::new(self.inner.messages.lookup(&code, key)))
    }

    // ------------------------------------------------------------------
    // Signs
    // ------------------------------------------------------------------

    /// All registered rank signs.
    ///
    /// # Errors
    /// Storage errors on first load.
    pub async fn signs(&self) -> Result<Vec<SignLocation>> {
        if let Some(signs) = self.inner.signs.snapshot() {
            return Ok(signs);
        }
        let stored = self.inner.store.signs().await?;
        let count = stored.len();
        if self.inner.signs.load(stored) {
            debug!(count, "Loaded sign registry");
        }
        Ok(self.inner.signs.snapshot().unwrap_or_default())
    }

    /// Whether a rank sign is registered at `location`.
    ///
    /// # Errors
    /// Storage errors on first load.
    pub async fn is_sign_present(&self, location: &SignLocation) -> Result<bool> {
        if let Some(present) = self.inner.signs.contains(location) {
            return Ok(present);
        }
        Ok(self.signs().await?.contains(location))
    }

    /// Register a rank sign.
    ///
    /// # Errors
    /// [`GroupError::SignExists`] if one is already registered there.
    pub async fn add_sign(&self, location: SignLocation) -> Result<()> {
        if !self.inner.store.add_sign(&location).await? {
            return Err(GroupError::SignExists(location));
        }
        info!(%location, "Sign registered");
        self.inner.signs.insert(location);
        Ok(())
    }

    /// Unregister a rank sign.
    ///
    /// # Errors
    /// [`GroupError::SignNotFound`] if none is registered there.
    pub async fn remove_sign(&self, location: &SignLocation) -> Result<()> {
        if !self.inner.store.remove_sign(location).await? {
            return Err(GroupError::SignNotFound(location.clone()));
        }
        info!(%location, "Sign removed");
        self.inner.signs.remove(location);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Expiry
    // ------------------------------------------------------------------

    /// Purge every expired membership and drop the affected prefixes.
    ///
    /// # Errors
    /// Storage errors only.
    pub async fn sweep_expired(&self) -> Result<Vec<PlayerId>> {
        let affected = self.inner.store.purge_expired(None, Utc::now()).await?;
        for player in &affected {
            self.inner.prefixes.invalidate(player);
        }
        GroupCounters::add(&self.inner.counters.expired_purges, affected.len() as u64);
        GroupCounters::incr(&self.inner.counters.sweeps_completed);
        if !affected.is_empty() {
            info!(players = affected.len(), "Expired memberships swept");
        }
        Ok(affected)
    }

    /// Run [`sweep_expired`](Self::sweep_expired) every `interval` on the
    /// current tokio runtime until the handle is aborted.
    #[must_use]
    pub fn spawn_expiry_sweeper(&self, interval: std::time::Duration) -> JoinHandle<()> {
        let service = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if let Err(e) = service.sweep_expired().await {
                    warn!(error = %e, "Expiry sweep failed");
                }
            }
        })
    }
}
