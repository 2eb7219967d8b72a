//! Effects the server applies after a hook, command or system tick.
//!
//! Strings are already color-translated (`§` codes). Effects serialize
//! with an internal `type` tag for servers that forward them over IPC.

use legend_groups_core::types::{PlayerId, SignLocation};
use serde::{Deserialize, Serialize};

/// Client-side text for one sign, sent to one viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignUpdate {
    /// Player who sees the text.
    pub viewer: PlayerId,
    /// Sign block.
    pub location: SignLocation,
    /// The four sign lines.
    pub lines: [String; 4],
}

/// Something the server must do on behalf of the group system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEffect {
    /// Update a player's name in the tab list.
    SetListName {
        /// Player to update.
        player: PlayerId,
        /// Rendered list name.
        list_name: String,
    },
    /// Send a fake sign change to one player.
    SignChange(SignUpdate),
}

impl HostEffect {
    /// The player the effect targets.
    #[must_use]
    pub fn target(&self) -> PlayerId {
        match self {
            Self::SetListName { player, .. } => *player,
            Self::SignChange(update) => update.viewer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effects_carry_a_type_tag() {
        let player = PlayerId::new();
        let effect = HostEffect::SetListName {
            player,
            list_name: "§f[§6VIP§f] Steve".to_string(),
        };
        let json = serde_json::to_value(&effect).expect("serialize");
        assert_eq!(json["type"], "set_list_name");
        assert_eq!(json["player"], player.to_string());

        let sign = HostEffect::SignChange(SignUpdate {
            viewer: player,
            location: SignLocation::new("world", 1, 64, -3),
            lines: ["§f[§6VIP§f]".to_string(), "Steve".to_string(), String::new(), String::new()],
        });
        let json = serde_json::to_string(&sign).expect("serialize");
        let back: HostEffect = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, sign);
        assert_eq!(back.target(), player);
    }
}
