//! `/group` subcommands.

use std::fmt;

use chrono::{DateTime, Utc};
use legend_groups_core::error::{GroupError, Result};
use legend_groups_core::format::membership_duration;
use legend_groups_core::GroupService;
use tracing::{error, info, warn};

use super::args::merge_quoted;
use super::{keys, CommandOutcome, Context};
use crate::components::{CommandSender, OnlinePlayer};
use crate::events::HostEffect;
use crate::hooks::refresh_list_name;
use crate::systems::sign_added;

/// A `/group` subcommand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupSubcommand {
    /// Print usage.
    Help,
    /// List the sender's groups.
    Show,
    /// Create a group.
    Create,
    /// Add a player to a group.
    Add,
    /// Remove a player from a group.
    Remove,
    /// Delete an empty group.
    Delete,
    /// Change one field of a group.
    Edit,
    /// Register or unregister a rank sign.
    Sign,
}

impl GroupSubcommand {
    /// All subcommands, in help order.
    pub const ALL: [Self; 8] = [
        Self::Help,
        Self::Show,
        Self::Create,
        Self::Add,
        Self::Remove,
        Self::Delete,
        Self::Edit,
        Self::Sign,
    ];

    /// The literal typed after `/group`.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Help => "help",
            Self::Show => "show",
            Self::Create => "create",
            Self::Add => "add",
            Self::Remove => "remove",
            Self::Delete => "delete",
            Self::Edit => "edit",
            Self::Sign => "sign",
        }
    }

    /// Parse a subcommand literal, case-insensitively.
    #[must_use]
    pub fn parse(literal: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name().eq_ignore_ascii_case(literal))
    }

    /// Whether the subcommand needs [`super::ADMIN_PERMISSION`].
    #[must_use]
    pub fn requires_admin(self) -> bool {
        !matches!(self, Self::Help | Self::Show)
    }

    /// Whether `sender` may run this subcommand.
    #[must_use]
    pub fn permitted(self, sender: &CommandSender) -> bool {
        !self.requires_admin() || sender.is_admin()
    }
}

impl fmt::Display for GroupSubcommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Run `/group` with the raw, space-split arguments. Unknown or missing
/// subcommands print help.
pub async fn execute_group<S: AsRef<str>>(
    service: &GroupService,
    sender: &CommandSender,
    online: &[OnlinePlayer],
    raw_args: &[S],
) -> CommandOutcome {
    let args = merge_quoted(raw_args);
    let ctx = Context {
        service,
        sender,
        online,
    };
    let subcommand = args
        .first()
        .and_then(|literal| GroupSubcommand::parse(literal))
        .unwrap_or(GroupSubcommand::Help);

    if !subcommand.permitted(sender) {
        info!(subcommand = %subcommand, sender = ?sender.player_id(), "Group command denied");
        return ctx.reply(keys::NO_PERMISSION).await;
    }

    let result = match subcommand {
        GroupSubcommand::Help => Ok(help(&ctx).await),
        GroupSubcommand::Show => show(&ctx).await,
        GroupSubcommand::Create => create(&ctx, &args).await,
        GroupSubcommand::Add => add(&ctx, &args).await,
        GroupSubcommand::Remove => remove(&ctx, &args).await,
        GroupSubcommand::Delete => delete(&ctx, &args).await,
        GroupSubcommand::Edit => edit(&ctx, &args).await,
        GroupSubcommand::Sign => sign(&ctx, &args).await,
    };
    match result {
        Ok(outcome) => outcome,
        Err(e) => {
            if e.is_storage() {
                error!(subcommand = %subcommand, error = %e, "Group command failed");
            } else {
                warn!(subcommand = %subcommand, error = %e, "Group command rejected");
            }
            ctx.reply(keys::INTERNAL_ERROR).await
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------
//
// Each handler returns `Err` only for failures the sender cannot fix
// (storage errors); everything else is a localized reply.

async fn help(ctx: &Context<'_>) -> CommandOutcome {
    let text = ctx.text("group-commands.help.message").await;
    CommandOutcome {
        replies: text.lines().map(str::to_string).collect(),
        effects: Vec::new(),
    }
}

fn format_until(until: DateTime<Utc>) -> String {
    until.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

async fn show(ctx: &Context<'_>) -> Result<CommandOutcome> {
    let Some(player) = ctx.sender.player_id() else {
        return Ok(ctx.reply(keys::PLAYERS_ONLY).await);
    };
    let groups = ctx.service.player_groups(player).await?;
    if groups.is_empty() {
        return Ok(ctx.reply("group-commands.show.message-no-group").await);
    }
    let permanent = ctx.text("group-commands.show.permanent").await;
    let mut outcome = CommandOutcome::default();
    for entry in groups {
        let until = entry.until.map_or_else(|| permanent.clone(), format_until);
        outcome.push_reply(
            ctx.template("group-commands.show.message")
                .await
                .replace_key("groupname", &entry.group.name)
                .replace_key("description", &entry.group.description)
                .replace_key("until", &until)
                .render(),
        );
    }
    Ok(outcome)
}

async fn create(ctx: &Context<'_>, args: &[String]) -> Result<CommandOutcome> {
    let (name, prefix, weight, description) = match args {
        [_, name, prefix, weight] => (name, prefix, weight, ""),
        [_, name, prefix, weight, description] => (name, prefix, weight, description.as_str()),
        _ => return Ok(ctx.reply(keys::MISSING_ARGUMENT).await),
    };
    let Ok(weight) = weight.trim().parse::<i32>() else {
        return Ok(ctx.reply(keys::MISSING_ARGUMENT).await);
    };
    match ctx.service.create_group(name, prefix, weight, description).await {
        Ok(group) => Ok(CommandOutcome::reply(
            ctx.template("group-commands.create.message-success")
                .await
                .replace_key("groupname", &group.name)
                .render(),
        )),
        Err(GroupError::DuplicateGroup(_)) => Ok(CommandOutcome::reply(
            ctx.template("group-commands.create.message-duplicate")
                .await
                .replace_key("groupname", name)
                .render(),
        )),
        Err(GroupError::InvalidValue { .. }) => Ok(ctx.reply(keys::MISSING_ARGUMENT).await),
        Err(e) => Err(e),
    }
}

async fn add(ctx: &Context<'_>, args: &[String]) -> Result<CommandOutcome> {
    let (player_name, group_name, duration) = match args {
        [_, player, group] => (player, group, None),
        [_, player, group, d, h, m, s] => {
            let parsed = [d, h, m, s].map(|part| part.trim().parse::<i64>());
            let duration = match parsed {
                [Ok(d), Ok(h), Ok(m), Ok(s)] => membership_duration(d, h, m, s).ok(),
                _ => None,
            };
            let Some(duration) = duration else {
                return Ok(ctx.reply("group-commands.add.message-wrong-format").await);
            };
            (player, group, Some(duration))
        }
        _ => return Ok(ctx.reply(keys::MISSING_ARGUMENT).await),
    };

    match ctx.service.add_member(player_name, group_name, duration).await {
        Ok(change) => {
            let mut outcome = CommandOutcome::reply(
                ctx.template("group-commands.add.message-success")
                    .await
                    .replace_key("playername", &change.player.name)
                    .replace_key("groupname", &change.group.name)
                    .render(),
            );
            if let Some(online) = ctx.online_player(change.player.id) {
                outcome = outcome.with_effect(refresh_list_name(ctx.service, online.id, &online.name).await?);
            }
            Ok(outcome)
        }
        Err(GroupError::PlayerNotFound(_)) => Ok(CommandOutcome::reply(
            ctx.template("group-commands.add.message-unknown-player")
                .await
                .replace_key("playername", player_name)
                .render(),
        )),
        Err(GroupError::GroupNotFound(_)) => Ok(CommandOutcome::reply(
            ctx.template("group-commands.add.message-unknown-group")
                .await
                .replace_key("groupname", group_name)
                .render(),
        )),
        Err(GroupError::InvalidDuration(_)) => Ok(ctx.reply("group-commands.add.message-wrong-format").await),
        Err(e) => Err(e),
    }
}

async fn remove(ctx: &Context<'_>, args: &[String]) -> Result<CommandOutcome> {
    let [_, player_name, group_name] = args else {
        return Ok(ctx.reply(keys::MISSING_ARGUMENT).await);
    };
    let key = match ctx.service.remove_member(player_name, group_name).await {
        Ok(change) => {
            let mut outcome = CommandOutcome::reply(
                ctx.template("group-commands.remove.message-success")
                    .await
                    .replace_key("playername", &change.player.name)
                    .replace_key("groupname", &change.group.name)
                    .render(),
            );
            if let Some(online) = ctx.online_player(change.player.id) {
                outcome = outcome.with_effect(refresh_list_name(ctx.service, online.id, &online.name).await?);
            }
            return Ok(outcome);
        }
        Err(GroupError::PlayerNotFound(_)) => "group-commands.remove.message-unknown-player",
        Err(GroupError::GroupNotFound(_)) => "group-commands.remove.message-unknown-group",
        Err(GroupError::NotAMember { .. }) => "group-commands.remove.message-not-member",
        Err(e) => return Err(e),
    };
    Ok(CommandOutcome::reply(
        ctx.template(key)
            .await
            .replace_key("playername", player_name)
            .replace_key("groupname", group_name)
            .render(),
    ))
}

async fn delete(ctx: &Context<'_>, args: &[String]) -> Result<CommandOutcome> {
    let [_, group_name] = args else {
        return Ok(ctx.reply(keys::MISSING_ARGUMENT).await);
    };
    let key = match ctx.service.delete_group(group_name).await {
        Ok(()) => "group-commands.delete.message-success",
        Err(GroupError::GroupNotFound(_)) => "group-commands.delete.message-unknown-group",
        Err(GroupError::GroupInUse { .. }) => "group-commands.delete.message-player-in-group",
        Err(e) => return Err(e),
    };
    Ok(CommandOutcome::reply(
        ctx.template(key).await.replace_key("groupname", group_name).render(),
    ))
}

async fn edit(ctx: &Context<'_>, args: &[String]) -> Result<CommandOutcome> {
    let [_, group_name, field, value] = args else {
        return Ok(ctx.reply(keys::MISSING_ARGUMENT).await);
    };
    let key = match ctx.service.edit_group(group_name, field, value).await {
        Ok(_) => "group-commands.edit.message-success",
        Err(GroupError::GroupNotFound(_)) => "group-commands.edit.message-unknown-group",
        Err(GroupError::UnknownField(_)) => "group-commands.edit.message-unknown-field",
        Err(GroupError::InvalidValue { .. } | GroupError::DuplicateGroup(_)) => "group-commands.edit.message-fail",
        Err(e) => return Err(e),
    };
    let mut outcome = CommandOutcome::reply(
        ctx.template(key)
            .await
            .replace_key("groupname", group_name)
            .replace_key("fieldname", field)
            .replace_key("value", value)
            .render(),
    );
    if key == "group-commands.edit.message-success" {
        for online in ctx.online {
            outcome = outcome.with_effect(refresh_list_name(ctx.service, online.id, &online.name).await?);
        }
    }
    Ok(outcome)
}

async fn sign(ctx: &Context<'_>, args: &[String]) -> Result<CommandOutcome> {
    let Some(player) = ctx.sender.player() else {
        return Ok(ctx.reply(keys::PLAYERS_ONLY).await);
    };
    let [_, action] = args else {
        return Ok(ctx.reply(keys::MISSING_ARGUMENT).await);
    };
    let location = player.position.clone();

    if action.eq_ignore_ascii_case("add") {
        if !player.standing_on_sign {
            return Ok(ctx.reply("group-commands.sign.message-no-sign").await);
        }
        return match ctx.service.add_sign(location.clone()).await {
            Ok(()) => {
                let mut outcome = ctx.reply("group-commands.sign.message-added").await;
                outcome.effects.extend(
                    sign_added(ctx.service, &location, ctx.online)
                        .await?
                        .into_iter()
                        .map(HostEffect::SignChange),
                );
                Ok(outcome)
            }
            Err(GroupError::SignExists(_)) => Ok(ctx.reply("group-commands.sign.message-exists").await),
            Err(e) => Err(e),
        };
    }

    if action.eq_ignore_ascii_case("remove") {
        return match ctx.service.remove_sign(&location).await {
            Ok(()) => Ok(ctx.reply("group-commands.sign.message-removed").await),
            Err(GroupError::SignNotFound(_)) => Ok(ctx.reply("group-commands.sign.message-no-sign").await),
            Err(e) => Err(e),
        };
    }

    Ok(ctx.reply(keys::MISSING_ARGUMENT).await)
}
