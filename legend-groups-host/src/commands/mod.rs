//! `/group` and `/language` command handling.
//!
//! The server passes the raw, space-split arguments; handlers merge quoted
//! arguments, check permissions, call the [`GroupService`] and return a
//! [`CommandOutcome`]. Handlers never fail: every error becomes a localized
//! reply, and storage failures are logged and reported as an internal
//! error.

pub mod args;
pub mod completion;
pub mod group;
pub mod language;

use legend_groups_core::format::MessageFormatter;
use legend_groups_core::GroupService;
use tracing::warn;

use crate::components::{CommandSender, OnlinePlayer};
use crate::events::HostEffect;

pub use completion::{complete_group, complete_language};
pub use group::{execute_group, GroupSubcommand};
pub use language::execute_language;

/// Permission node for administrative subcommands.
pub const ADMIN_PERMISSION: &str = "legendgroups.admin";

/// Message keys shared by all commands.
pub(crate) mod keys {
    pub const MISSING_ARGUMENT: &str = "commands-general.missing-argument";
    pub const NO_PERMISSION: &str = "commands-general.no-permission";
    pub const INTERNAL_ERROR: &str = "commands-general.internal-error";
    pub const PLAYERS_ONLY: &str = "commands-general.players-only";
}

/// Replies for the sender plus effects for the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutcome {
    /// Rendered lines to send to the command sender, in order.
    pub replies: Vec<String>,
    /// Effects the server must apply.
    pub effects: Vec<HostEffect>,
}

impl CommandOutcome {
    /// An outcome with a single reply line.
    #[must_use]
    pub fn reply(line: impl Into<String>) -> Self {
        Self {
            replies: vec![line.into()],
            effects: Vec::new(),
        }
    }

    /// Append a reply line.
    pub fn push_reply(&mut self, line: impl Into<String>) {
        self.replies.push(line.into());
    }

    /// Append an effect.
    #[must_use]
    pub fn with_effect(mut self, effect: HostEffect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Everything a handler needs for one invocation.
pub(crate) struct Context<'a> {
    pub service: &'a GroupService,
    pub sender: &'a CommandSender,
    pub online: &'a [OnlinePlayer],
}

impl Context<'_> {
    /// Template for `key` in the sender's language. Falls back to the
    /// default language if the sender's language cannot be resolved.
    pub async fn template(&self, key: &str) -> MessageFormatter {
        match self.service.message(self.sender.player_id(), key).await {
            Ok(template) => template,
            Err(e) => {
                warn!(error = %e, key, "Falling back to default language");
                let messages = self.service.messages();
                MessageFormatter::new(messages.lookup(messages.default_code(), key))
            }
        }
    }

    /// Rendered message for `key` without placeholders.
    pub async fn text(&self, key: &str) -> String {
        self.template(key).await.render()
    }

    /// Single-line outcome for `key`.
    pub async fn reply(&self, key: &str) -> CommandOutcome {
        CommandOutcome::reply(self.text(key).await)
    }

    /// Online player by id.
    pub fn online_player(&self, id: legend_groups_core::PlayerId) -> Option<&OnlinePlayer> {
        self.online.iter().find(|p| p.id == id)
    }
}
