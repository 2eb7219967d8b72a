//! `/language <name>`.

use legend_groups_core::error::GroupError;
use legend_groups_core::GroupService;
use tracing::{error, warn};

use super::args::merge_quoted;
use super::{keys, CommandOutcome, Context};
use crate::components::CommandSender;

const USAGE: &str = "language.usage";

/// Switch the sender's message language. The confirmation is rendered in
/// the newly chosen language.
pub async fn execute_language<S: AsRef<str>>(
    service: &GroupService,
    sender: &CommandSender,
    raw_args: &[S],
) -> CommandOutcome {
    let ctx = Context {
        service,
        sender,
        online: &[],
    };
    let args = merge_quoted(raw_args);
    let Some(player) = sender.player_id() else {
        return ctx.reply(keys::PLAYERS_ONLY).await;
    };
    let [name] = args.as_slice() else {
        return ctx.reply(USAGE).await;
    };

    match service.set_language(player, name).await {
        Ok(language) => CommandOutcome::reply(
            ctx.template("language.success")
                .await
                .replace_key("language", &language.name)
                .render(),
        ),
        Err(GroupError::LanguageNotFound(_)) => CommandOutcome::reply(
            ctx.template("language.unknown")
                .await
                .replace_key("language", name)
                .render(),
        ),
        Err(e) if e.is_storage() => {
            error!(%player, error = %e, "Language change failed");
            ctx.reply(keys::INTERNAL_ERROR).await
        }
        Err(e) => {
            warn!(%player, error = %e, "Language change rejected");
            ctx.reply(keys::INTERNAL_ERROR).await
        }
    }
}
