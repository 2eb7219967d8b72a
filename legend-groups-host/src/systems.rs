//! Rank sign refresh system.
//!
//! Every registered sign shows each nearby viewer their own rank:
//!
//! | Line | Content              |
//! |------|----------------------|
//! | 1    | `&f[<prefix>&f]`     |
//! | 2    | viewer name          |
//! | 3, 4 | empty                |
//!
//! The server calls [`SignRefresher::tick`] once per server tick; every
//! `refresh_interval_ticks` it returns updates for all online players within
//! `view_distance` blocks of a sign in the same world.

use legend_groups_core::config::SignConfig;
use legend_groups_core::error::Result;
use legend_groups_core::format::MessageFormatter;
use legend_groups_core::types::SignLocation;
use legend_groups_core::GroupService;
use tracing::debug;

use crate::components::OnlinePlayer;
use crate::events::SignUpdate;

/// The four lines a sign shows to a viewer with `prefix` and `name`.
#[must_use]
pub fn sign_lines(prefix: &str, name: &str) -> [String; 4] {
    [
        MessageFormatter::new(format!("&f[{prefix}&f]")).render(),
        name.to_string(),
        String::new(),
        String::new(),
    ]
}

/// The update `viewer` should see on the sign at `location`.
///
/// # Errors
/// Storage errors from resolving the viewer's prefix.
pub async fn sign_update(service: &GroupService, location: &SignLocation, viewer: &OnlinePlayer) -> Result<SignUpdate> {
    let prefix = service.prefix(viewer.id).await?;
    Ok(SignUpdate {
        viewer: viewer.id,
        location: location.clone(),
        lines: sign_lines(&prefix, &viewer.name),
    })
}

/// Updates for a newly registered sign, sent to every online player
/// regardless of distance.
///
/// # Errors
/// Storage errors from resolving prefixes.
pub async fn sign_added(service: &GroupService, location: &SignLocation, online: &[OnlinePlayer]) -> Result<Vec<SignUpdate>> {
    let mut updates = Vec::with_capacity(online.len());
    for viewer in online {
        updates.push(sign_update(service, location, viewer).await?);
    }
    Ok(updates)
}

/// Tick-driven sign refresher.
#[derive(Debug, Clone)]
pub struct SignRefresher {
    interval_ticks: u64,
    view_distance: f64,
    ticks: u64,
}

impl SignRefresher {
    /// Create a refresher from sign settings.
    #[must_use]
    pub fn new(config: &SignConfig) -> Self {
        Self {
            interval_ticks: config.refresh_interval_ticks.max(1),
            view_distance: config.view_distance,
            ticks: 0,
        }
    }

    /// Advance one tick. Returns `true` on ticks where a refresh is due.
    pub fn advance(&mut self) -> bool {
        self.ticks = self.ticks.wrapping_add(1);
        self.ticks % self.interval_ticks == 0
    }

    /// Whether a viewer standing at `viewer` sees the sign at `sign`.
    #[must_use]
    pub fn in_view(&self, viewer: &SignLocation, sign: &SignLocation) -> bool {
        viewer
            .distance_squared(sign)
            .is_some_and(|d2| d2 < self.view_distance * self.view_distance)
    }

    /// Advance one tick and, when due, compute all sign updates.
    ///
    /// # Errors
    /// Storage errors from loading signs or resolving prefixes.
    pub async fn tick(&mut self, service: &GroupService, online: &[OnlinePlayer]) -> Result<Vec<SignUpdate>> {
        if !self.advance() {
            return Ok(Vec::new());
        }
        self.refresh(service, online).await
    }

    /// Compute updates for every (online player, sign in view) pair now.
    ///
    /// # Errors
    /// Storage errors from loading signs or resolving prefixes.
    pub async fn refresh(&self, service: &GroupService, online: &[OnlinePlayer]) -> Result<Vec<SignUpdate>> {
        let signs = service.signs().await?;
        if signs.is_empty() {
            return Ok(Vec::new());
        }
        let mut updates = Vec::new();
        for viewer in online {
            for sign in signs.iter().filter(|s| self.in_view(&viewer.position, s)) {
                updates.push(sign_update(service, sign, viewer).await?);
            }
        }
        debug!(signs = signs.len(), updates = updates.len(), "Signs refreshed");
        Ok(updates)
    }
}
