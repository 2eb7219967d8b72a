//! `legend-groups`: administer the group store from a shell.
//!
//! Uses the same configuration file and database as the game server, so it
//! can create groups before first start, fix memberships, or run an expiry
//! sweep from cron.

#![deny(clippy::unwrap_used)]
#![warn(clippy::pedantic)]

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::Duration;
use clap::{Parser, Subcommand, ValueEnum};
use legend_groups_core::config::Backend;
use legend_groups_core::format::{membership_duration, strip_color_codes};
use legend_groups_core::{GroupService, GroupStore, GroupsConfig, PlayerId, PlayerRecord};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "legend-groups", version)]
#[command(about = "Manage groups, memberships and languages of a legend-groups store")]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(long, short, env = "LEGEND_GROUPS_CONFIG")]
    config: Option<PathBuf>,

    /// Override the storage backend.
    #[arg(long, value_enum)]
    backend: Option<BackendArg>,

    /// Override the SQLite database path (implies `--backend sqlite`).
    #[arg(long)]
    sqlite_path: Option<PathBuf>,

    /// Print results as JSON.
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendArg {
    Postgres,
    Sqlite,
}

#[derive(Subcommand)]
enum Command {
    /// Create the schema and seed languages, then exit.
    Migrate,
    /// Group administration.
    #[command(subcommand)]
    Group(GroupCommand),
    /// Membership administration.
    #[command(subcommand)]
    Member(MemberCommand),
    /// Language administration.
    #[command(subcommand)]
    Language(LanguageCommand),
    /// Print a player's current prefix.
    Prefix {
        /// Player name.
        player: String,
    },
    /// Remove every expired membership now.
    Sweep,
    /// Print cache and membership counters of this run.
    Stats,
}

#[derive(Subcommand)]
enum GroupCommand {
    /// List all groups.
    List,
    /// Show one group and its member count.
    Show { name: String },
    /// Create a group.
    Create {
        name: String,
        prefix: String,
        weight: i32,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Set name, prefix, description or weight.
    Edit { name: String, field: String, value: String },
    /// Delete a group without members.
    Delete { name: String },
}

#[derive(Subcommand)]
enum MemberCommand {
    /// Add a player to a group, optionally for a limited time.
    Add {
        player: String,
        group: String,
        #[arg(long, default_value_t = 0)]
        days: i64,
        #[arg(long, default_value_t = 0)]
        hours: i64,
        #[arg(long, default_value_t = 0)]
        minutes: i64,
        #[arg(long, default_value_t = 0)]
        seconds: i64,
    },
    /// Remove a player from a group.
    Remove { player: String, group: String },
    /// List a player's groups.
    List { player: String },
}

#[derive(Subcommand)]
enum LanguageCommand {
    /// List available languages.
    List,
    /// Set a player's language by name or code.
    Set { player: String, language: String },
}

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

fn load_config(cli: &Cli) -> Result<GroupsConfig> {
    let mut config = match &cli.config {
        Some(path) => GroupsConfig::from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => GroupsConfig::default(),
    }
    .with_env_overrides();

    match cli.backend {
        Some(BackendArg::Postgres) => config.database.backend = Backend::Postgres,
        Some(BackendArg::Sqlite) => config.database.backend = Backend::Sqlite,
        None => {}
    }
    if let Some(path) = &cli.sqlite_path {
        config.database.backend = Backend::Sqlite;
        config.database.sqlite_path.clone_from(path);
    }
    Ok(config)
}

fn init_tracing(config: &GroupsConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));
    let registry = tracing_subscriber::registry().with(filter);
    if config.general.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

struct Output {
    json: bool,
}

impl Output {
    /// Print `value` as JSON, or `text()` as plain lines.
    fn emit<T: Serialize>(&self, value: &T, text: impl FnOnce() -> Vec<String>) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            for line in text() {
                println!("{line}");
            }
        }
        Ok(())
    }
}

async fn player(service: &GroupService, name: &str) -> Result<PlayerRecord> {
    match service.store().player_by_name(name).await? {
        Some(player) => Ok(player),
        None => bail!("unknown player {name}"),
    }
}

fn add_duration(days: i64, hours: i64, minutes: i64, seconds: i64) -> Result<Option<Duration>> {
    if days == 0 && hours == 0 && minutes == 0 && seconds == 0 {
        return Ok(None);
    }
    Ok(Some(membership_duration(days, hours, minutes, seconds)?))
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_tracing(&config);

    let service = GroupService::open(config).await.context("opening group store")?;
    let out = Output { json: cli.json };

    match cli.command {
        Command::Migrate => {
            info!("Store is migrated");
            out.emit(&"ok", || vec!["Store is up to date.".to_string()])?;
        }
        Command::Group(cmd) => group(&service, &out, cmd).await?,
        Command::Member(cmd) => member(&service, &out, cmd).await?,
        Command::Language(cmd) => language(&service, &out, cmd).await?,
        Command::Prefix { player: name } => {
            let record = player(&service, &name).await?;
            let prefix = service.prefix(record.id).await?;
            out.emit(&prefix, || vec![strip_color_codes(&prefix)])?;
        }
        Command::Sweep => {
            let purged: Vec<PlayerId> = service.sweep_expired().await?;
            out.emit(&purged, || vec![format!("Purged expired memberships of {} players.", purged.len())])?;
        }
        Command::Stats => {
            let snapshot = service.counters();
            out.emit(&snapshot, || snapshot.to_prometheus().lines().map(str::to_string).collect())?;
        }
    }
    Ok(())
}

async fn group(service: &GroupService, out: &Output, cmd: GroupCommand) -> Result<()> {
    match cmd {
        GroupCommand::List => {
            let names = service.group_names().await?;
            out.emit(&names, || names.clone())
        }
        GroupCommand::Show { name } => {
            let group = service.group(&name).await?;
            let members = service.store().member_count(group.id).await?;
            #[derive(Serialize)]
            struct Shown<'a> {
                #[serde(flatten)]
                group: &'a legend_groups_core::Group,
                members: u64,
            }
            out.emit(&Shown { group: &group, members }, || {
                vec![
                    format!("{} (id {})", group.name, group.id),
                    format!("  prefix:      {}", group.prefix),
                    format!("  weight:      {}", group.weight),
                    format!("  description: {}", group.description),
                    format!("  members:     {members}"),
                ]
            })
        }
        GroupCommand::Create {
            name,
            prefix,
            weight,
            description,
        } => {
            let group = service.create_group(&name, &prefix, weight, &description).await?;
            out.emit(&group, || vec![format!("Created group {} (id {}).", group.name, group.id)])
        }
        GroupCommand::Edit { name, field, value } => {
            let group = service.edit_group(&name, &field, &value).await?;
            out.emit(&group, || vec![format!("Set {field} of {name} to {value}.")])
        }
        GroupCommand::Delete { name } => {
            service.delete_group(&name).await?;
            out.emit(&name, || vec![format!("Deleted group {name}.")])
        }
    }
}

async fn member(service: &GroupService, out: &Output, cmd: MemberCommand) -> Result<()> {
    match cmd {
        MemberCommand::Add {
            player,
            group,
            days,
            hours,
            minutes,
            seconds,
        } => {
            let duration = add_duration(days, hours, minutes, seconds)?;
            let change = service.add_member(&player, &group, duration).await?;
            out.emit(&change.until, || {
                let until = change
                    .until
                    .map_or_else(|| "permanently".to_string(), |t| format!("until {t}"));
                vec![format!("Added {} to {} {until}.", change.player.name, change.group.name)]
            })
        }
        MemberCommand::Remove { player, group } => {
            let change = service.remove_member(&player, &group).await?;
            out.emit(&change.group, || {
                vec![format!("Removed {} from {}.", change.player.name, change.group.name)]
            })
        }
        MemberCommand::List { player: name } => {
            let record = player(service, &name).await?;
            let groups = service.player_groups(record.id).await?;
            out.emit(&groups, || {
                groups
                    .iter()
                    .map(|g| {
                        let until = g.until.map_or_else(|| "permanent".to_string(), |t| t.to_rfc3339());
                        format!("{:<16} weight {:<6} {until}", g.group.name, g.group.weight)
                    })
                    .collect()
            })
        }
    }
}

async fn language(service: &GroupService, out: &Output, cmd: LanguageCommand) -> Result<()> {
    match cmd {
        LanguageCommand::List => {
            let languages = service.languages().await?;
            out.emit(&languages, || {
                languages.iter().map(|l| format!("{} ({})", l.name, l.code)).collect()
            })
        }
        LanguageCommand::Set { player: name, language } => {
            let record = player(service, &name).await?;
            let chosen = service.set_language(record.id, &language).await?;
            out.emit(&chosen, || vec![format!("{} now uses {}.", record.name, chosen.name)])
        }
    }
}
