//! Host-side snapshots handed to hooks, commands and systems.
//!
//! The server builds these from its own player objects each time it calls
//! into the crate; nothing here is stored between calls.

use std::collections::HashSet;

use legend_groups_core::types::{PlayerId, SignLocation};

use crate::commands::ADMIN_PERMISSION;

/// An online player as seen by the server at call time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnlinePlayer {
    /// Player id.
    pub id: PlayerId,
    /// Current name.
    pub name: String,
    /// Block the player is standing in.
    pub position: SignLocation,
    /// Whether the block at `position` is a sign.
    pub standing_on_sign: bool,
    /// Server operator flag.
    pub op: bool,
    /// Permission nodes granted by the server.
    pub permissions: HashSet<String>,
}

impl OnlinePlayer {
    /// A non-op player with no permissions.
    #[must_use]
    pub fn new(id: PlayerId, name: impl Into<String>, position: SignLocation) -> Self {
        Self {
            id,
            name: name.into(),
            position,
            standing_on_sign: false,
            op: false,
            permissions: HashSet::new(),
        }
    }

    /// Mark the player as a server operator.
    #[must_use]
    pub fn with_op(mut self) -> Self {
        self.op = true;
        self
    }

    /// Grant a permission node.
    #[must_use]
    pub fn with_permission(mut self, node: impl Into<String>) -> Self {
        self.permissions.insert(node.into());
        self
    }

    /// Whether the player holds `node`. Operators hold every node.
    #[must_use]
    pub fn has_permission(&self, node: &str) -> bool {
        self.op || self.permissions.contains(node)
    }
}

/// Who issued a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandSender {
    /// The server console. Holds every permission, has no position.
    Console,
    /// An online player.
    Player(OnlinePlayer),
}

impl CommandSender {
    /// Whether the sender holds `node`.
    #[must_use]
    pub fn has_permission(&self, node: &str) -> bool {
        match self {
            Self::Console => true,
            Self::Player(player) => player.has_permission(node),
        }
    }

    /// Whether the sender may run administrative subcommands.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.has_permission(ADMIN_PERMISSION)
    }

    /// The sending player's id, if any.
    #[must_use]
    pub fn player_id(&self) -> Option<PlayerId> {
        match self {
            Self::Console => None,
            Self::Player(player) => Some(player.id),
        }
    }

    /// The sending player, if any.
    #[must_use]
    pub fn player(&self) -> Option<&OnlinePlayer> {
        match self {
            Self::Console => None,
            Self::Player(player) => Some(player),
        }
    }
}
