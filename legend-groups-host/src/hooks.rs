//! Join and chat hooks.
//!
//! The server calls these from its own join and chat callbacks and applies
//! the returned strings itself.

use legend_groups_core::error::Result;
use legend_groups_core::format::MessageFormatter;
use legend_groups_core::service::JoinOutcome;
use legend_groups_core::types::PlayerId;
use legend_groups_core::GroupService;
use tracing::debug;

use crate::components::OnlinePlayer;
use crate::events::HostEffect;

/// Message key of the welcome line.
pub const JOIN_MESSAGE_KEY: &str = "miscellaneous.player-join";

/// What the server should do for a player that just joined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinResponse {
    /// Store-side result of the join.
    pub outcome: JoinOutcome,
    /// Rendered tab-list name.
    pub list_name: String,
    /// Rendered welcome message for the joining player.
    pub welcome: String,
}

/// Tab-list name: `&f[<prefix>&f] <name>`, rendered.
#[must_use]
pub fn list_name(prefix: &str, name: &str) -> String {
    MessageFormatter::new(format!("&f[{prefix}&f] {name}")).render()
}

/// Chat format string with two `%s` slots (name, message), rendered.
/// A `%` inside the prefix is doubled so the host formatter keeps it.
#[must_use]
pub fn chat_format(prefix: &str) -> String {
    MessageFormatter::new(format!("[{}&f] %s: %s", prefix.replace('%', "%%"))).render()
}

/// Register the player, resolve their prefix and build the list name and
/// welcome message.
///
/// # Errors
/// Storage errors from the service.
pub async fn on_player_join(service: &GroupService, player: &OnlinePlayer) -> Result<JoinResponse> {
    let outcome = service.player_joined(player.id, &player.name).await?;
    let welcome = service
        .message(Some(player.id), JOIN_MESSAGE_KEY)
        .await?
        .replace_key("prefix", &outcome.prefix)
        .replace_key("playername", &player.name)
        .render();
    let list_name = list_name(&outcome.prefix, &player.name);
    debug!(player = %player.name, kind = ?outcome.kind, "Join handled");
    Ok(JoinResponse {
        outcome,
        list_name,
        welcome,
    })
}

/// Chat format for a message sent by `player`.
///
/// # Errors
/// Storage errors from the service.
pub async fn on_chat(service: &GroupService, player: &OnlinePlayer) -> Result<String> {
    let prefix = service.prefix(player.id).await?;
    Ok(chat_format(&prefix))
}

/// A fresh list-name effect for `player`, dropping the cached prefix first.
///
/// # Errors
/// Storage errors from the service.
pub async fn refresh_list_name(service: &GroupService, player: PlayerId, name: &str) -> Result<HostEffect> {
    let prefix = service.refresh_prefix(player).await?;
    Ok(HostEffect::SetListName {
        player,
        list_name: list_name(&prefix, name),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_name_wraps_prefix_in_white_brackets() {
        assert_eq!(list_name("&6VIP", "Steve"), "§f[§6VIP§f] Steve");
    }

    #[test]
    fn chat_format_keeps_host_slots() {
        assert_eq!(chat_format("&4Admin"), "[§4Admin§f] %s: %s");
        assert_eq!(chat_format("100%"), "[100%%§f] %s: %s");
    }
}
