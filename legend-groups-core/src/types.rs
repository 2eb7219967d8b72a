//! Core type definitions for the group system.
//!
//! Row types mirror the relational schema; identifiers are newtypes so a
//! group id can never be passed where a language id is expected.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::GroupError;

// ---------------------------------------------------------------------------
// Identity Types
// ---------------------------------------------------------------------------

/// Unique identifier of a player, as assigned by the game server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub Uuid);

impl PlayerId {
    /// Create a new random player ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PlayerId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Database identifier of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(pub i32);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Database identifier of a language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LanguageId(pub i32);

impl fmt::Display for LanguageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Groups
// ---------------------------------------------------------------------------

/// A stored group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Database id.
    pub id: GroupId,
    /// Unique display name.
    pub name: String,
    /// Prefix with `&` color codes, shown before member names.
    pub prefix: String,
    /// Free-form description.
    pub description: String,
    /// Rank ordering. Lower weight ranks higher.
    pub weight: i32,
}

/// A group that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGroup {
    /// Unique display name.
    pub name: String,
    /// Prefix with `&` color codes.
    pub prefix: String,
    /// Free-form description (may be empty).
    pub description: String,
    /// Rank ordering.
    pub weight: i32,
}

impl NewGroup {
    /// Create a new group definition.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        prefix: impl Into<String>,
        description: impl Into<String>,
        weight: i32,
    ) -> Self {
        Self {
            name: name.into(),
            prefix: prefix.into(),
            description: description.into(),
            weight,
        }
    }
}

/// Editable group columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupField {
    /// `name`
    Name,
    /// `prefix`
    Prefix,
    /// `description`
    Description,
    /// `weight`
    Weight,
}

impl GroupField {
    /// All editable fields, in display order.
    pub const ALL: [Self; 4] = [Self::Name, Self::Prefix, Self::Description, Self::Weight];

    /// Lowercase field name as used by commands and columns.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Prefix => "prefix",
            Self::Description => "description",
            Self::Weight => "weight",
        }
    }
}

impl fmt::Display for GroupField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GroupField {
    type Err = GroupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| GroupError::UnknownField(s.to_string()))
    }
}

/// A single-column change to a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupUpdate {
    /// Rename the group.
    Name(String),
    /// Replace the prefix.
    Prefix(String),
    /// Replace the description.
    Description(String),
    /// Change the rank weight.
    Weight(i32),
}

impl GroupUpdate {
    /// Build an update from a field and its textual value.
    ///
    /// # Errors
    /// Returns [`GroupError::InvalidValue`] when a weight is not an integer
    /// or a name is blank.
    pub fn parse(field: GroupField, value: &str) -> Result<Self, GroupError> {
        let invalid = || GroupError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        };
        match field {
            GroupField::Name if value.trim().is_empty() => Err(invalid()),
            GroupField::Name => Ok(Self::Name(value.to_string())),
            GroupField::Prefix => Ok(Self::Prefix(value.to_string())),
            GroupField::Description => Ok(Self::Description(value.to_string())),
            GroupField::Weight => value.trim().parse().map(Self::Weight).map_err(|_| invalid()),
        }
    }

    /// The column this update touches.
    #[must_use]
    pub fn field(&self) -> GroupField {
        match self {
            Self::Name(_) => GroupField::Name,
            Self::Prefix(_) => GroupField::Prefix,
            Self::Description(_) => GroupField::Description,
            Self::Weight(_) => GroupField::Weight,
        }
    }
}

// ---------------------------------------------------------------------------
// Players & memberships
// ---------------------------------------------------------------------------

/// A stored player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    /// Player id.
    pub id: PlayerId,
    /// Last known name.
    pub name: String,
    /// Chosen language, if any.
    pub language: Option<LanguageId>,
}

/// A player's membership in a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    /// Member.
    pub player: PlayerId,
    /// Group joined.
    pub group: GroupId,
    /// When the membership ends; `None` means permanent.
    pub until: Option<DateTime<Utc>>,
}

impl Membership {
    /// A permanent membership.
    #[must_use]
    pub fn permanent(player: PlayerId, group: GroupId) -> Self {
        Self {
            player,
            group,
            until: None,
        }
    }
}

/// A group as seen from one player's membership list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerGroup {
    /// The group.
    pub group: Group,
    /// Membership expiry; `None` means permanent.
    pub until: Option<DateTime<Utc>>,
}

impl PlayerGroup {
    /// Whether the membership has ended at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.until.is_some_and(|until| until <= now)
    }
}

// ---------------------------------------------------------------------------
// Languages
// ---------------------------------------------------------------------------

/// A selectable message language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    /// Database id.
    pub id: LanguageId,
    /// Display name (e.g. `English`).
    pub name: String,
    /// Catalog code (e.g. `en`).
    pub code: String,
}

// ---------------------------------------------------------------------------
// Signs
// ---------------------------------------------------------------------------

/// Block position of a rank display sign.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignLocation {
    /// World name.
    pub world: String,
    /// Block X.
    pub x: i32,
    /// Block Y.
    pub y: i32,
    /// Block Z.
    pub z: i32,
}

impl SignLocation {
    /// Create a sign location from block coordinates.
    #[must_use]
    pub fn new(world: impl Into<String>, x: i32, y: i32, z: i32) -> Self {
        Self {
            world: world.into(),
            x,
            y,
            z,
        }
    }

    /// Squared euclidean distance between two block positions, or `None`
    /// if they are in different worlds.
    #[must_use]
    pub fn distance_squared(&self, other: &Self) -> Option<f64> {
        if self.world != other.world {
            return None;
        }
        let dx = f64::from(self.x) - f64::from(other.x);
        let dy = f64::from(self.y) - f64::from(other.y);
        let dz = f64::from(self.z) - f64::from(other.z);
        Some(dx * dx + dy * dy + dz * dz)
    }
}

impl fmt::Display for SignLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@({}, {}, {})", self.world, self.x, self.y, self.z)
    }
}
