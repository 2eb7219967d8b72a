//! # legend-groups-host - game server integration
//!
//! This crate sits between a game server and the host-agnostic
//! `legend-groups-core` library. The server feeds it snapshots of its
//! online players and raw command arguments; the crate answers with
//! rendered strings and [`events::HostEffect`]s the server applies.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────┐
//! │               Game server                  │
//! │  join / chat / command / tick callbacks    │
//! │  ┌─────────────────────────────────────┐  │
//! │  │        legend-groups-host            │  │
//! │  │  ┌──────────┐ ┌──────────┐ ┌──────┐ │  │
//! │  │  │  hooks   │ │ commands │ │system│ │  │
//! │  │  └────┬─────┘ └────┬─────┘ └──┬───┘ │  │
//! │  │       ▼            ▼          ▼     │  │
//! │  │   ┌──────────────────────────────┐  │  │
//! │  │   │   legend-groups-core         │  │  │
//! │  │   │   GroupService               │  │  │
//! │  │   └──────────────────────────────┘  │  │
//! │  └─────────────────────────────────────┘  │
//! └───────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `components`: snapshots of online players and command senders
//! - `events`: effects handed back to the server
//! - `hooks`: join and chat handlers
//! - `commands`: `/group` and `/language` dispatch and tab completion
//! - `systems`: periodic rank sign refresh
//! - `plugin`: enable/tick/disable lifecycle and the expiry sweeper

#![deny(clippy::unwrap_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod commands;
pub mod components;
pub mod events;
pub mod hooks;
pub mod plugin;
pub mod systems;

pub use commands::{CommandOutcome, ADMIN_PERMISSION};
pub use components::{CommandSender, OnlinePlayer};
pub use events::{HostEffect, SignUpdate};
pub use plugin::GroupsHost;
