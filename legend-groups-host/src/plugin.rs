//! Plugin lifecycle: enable, per-tick work, disable.

use std::time::Duration;

use legend_groups_core::error::Result;
use legend_groups_core::{GroupService, GroupsConfig};
use tokio::task::JoinHandle;
use tracing::info;

use crate::components::OnlinePlayer;
use crate::events::SignUpdate;
use crate::systems::SignRefresher;

/// Everything the server keeps between enable and disable.
#[derive(Debug)]
pub struct GroupsHost {
    service: GroupService,
    signs: SignRefresher,
    sweeper: Option<JoinHandle<()>>,
}

impl GroupsHost {
    /// Open the store, load messages and signs, and start the expiry
    /// sweeper when `expiry.sweep_interval_seconds` is non-zero. Must be
    /// called inside a tokio runtime.
    ///
    /// # Errors
    /// Storage, config and IO errors from opening the service.
    pub async fn enable(config: GroupsConfig) -> Result<Self> {
        let service = GroupService::open(config).await?;
        Ok(Self::with_service(service))
    }

    /// Wrap an already opened service.
    #[must_use]
    pub fn with_service(service: GroupService) -> Self {
        let config = service.config();
        let signs = SignRefresher::new(&config.signs);
        let sweeper = match config.expiry.sweep_interval_seconds {
            0 => None,
            secs => Some(service.spawn_expiry_sweeper(Duration::from_secs(secs))),
        };
        info!(sweeper = sweeper.is_some(), "Group host enabled");
        Self {
            service,
            signs,
            sweeper,
        }
    }

    /// The shared service.
    #[must_use]
    pub fn service(&self) -> &GroupService {
        &self.service
    }

    /// Per-tick work. Returns sign updates on refresh ticks.
    ///
    /// # Errors
    /// Storage errors from the sign refresh.
    pub async fn tick(&mut self, online: &[OnlinePlayer]) -> Result<Vec<SignUpdate>> {
        self.signs.tick(&self.service, online).await
    }

    /// Stop background work.
    pub fn disable(mut self) {
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.abort();
        }
        info!(counters = ?self.service.counters(), "Group host disabled");
    }
}
