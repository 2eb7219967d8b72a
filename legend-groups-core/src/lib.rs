//! # legend-groups core library
//!
//! Host-agnostic group and rank system for game servers.
//!
//! Every player belongs to zero or more [`Group`]s. Each group carries a
//! colored prefix and a weight; the lowest-weight group a player is in
//! decides the prefix shown in chat, the player list and on status signs.
//! Memberships can be permanent or expire at a fixed instant.
//!
//! - **Storage**: [`store::GroupStore`] with PostgreSQL and SQLite backends
//! - **Caching**: bounded LRU caches for prefixes and languages
//! - **Localisation**: per-player message catalogs loaded from TOML
//! - **Service**: [`GroupService`], the facade hosts talk to
//!
//! ## Ranking
//!
//! Lower weight ranks higher. A group with weight `0` beats a group with
//! weight `10`; ties go to the group created first.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod config;
pub mod error;
pub mod format;
pub mod messages;
pub mod metrics;
pub mod service;
pub mod store;
pub mod types;

pub use config::GroupsConfig;
pub use error::GroupError;
pub use service::GroupService;
pub use store::GroupStore;
pub use types::*;
