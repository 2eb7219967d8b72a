//! Error types for the group system core.

use thiserror::Error;

/// Top-level error type for all group system operations.
#[derive(Error, Debug)]
pub enum GroupError {
    /// No group with the given name (or id) exists.
    #[error("Group not found: {0}")]
    GroupNotFound(String),

    /// No player with the given name (or id) is known.
    #[error("Player not found: {0}")]
    PlayerNotFound(String),

    /// No language matches the given name or code.
    #[error("Language not found: {0}")]
    LanguageNotFound(String),

    /// A group with this name already exists.
    #[error("Group already exists: {0}")]
    DuplicateGroup(String),

    /// The group still has members and cannot be deleted.
    #[error("Group {name} still has {members} member(s)")]
    GroupInUse {
        /// Group name.
        name: String,
        /// Members still referencing it.
        members: u64,
    },

    /// The player is not a member of the group.
    #[error("{player} is not a member of {group}")]
    NotAMember {
        /// Player name or id.
        player: String,
        /// Group name.
        group: String,
    },

    /// The requested group field cannot be edited.
    #[error("Unknown group field: {0}")]
    UnknownField(String),

    /// A field value could not be parsed.
    #[error("Invalid value for {field}: {value}")]
    InvalidValue {
        /// Field being assigned.
        field: String,
        /// Raw value supplied.
        value: String,
    },

    /// A membership duration was negative or overflowed.
    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    /// No sign is registered at the location.
    #[error("No sign registered at {0}")]
    SignNotFound(crate::SignLocation),

    /// A sign is already registered at the location.
    #[error("Sign already registered at {0}")]
    SignExists(crate::SignLocation),

    /// SQLite persistence error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// PostgreSQL persistence error.
    #[error("Database error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GroupError {
    /// Whether the error comes from the storage backend rather than from
    /// the caller's input.
    #[must_use]
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Sqlite(_) | Self::Postgres(_) | Self::Io(_))
    }
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, GroupError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_are_told_apart_from_input_errors() {
        assert!(GroupError::Io(std::io::Error::other("disk gone")).is_storage());
        assert!(GroupError::Sqlite(rusqlite::Error::InvalidQuery).is_storage());
        assert!(!GroupError::GroupNotFound("vip".into()).is_storage());
        assert!(!GroupError::Config("bad".into()).is_storage());
    }
}
