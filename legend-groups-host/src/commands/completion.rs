//! Tab completion for `/group` and `/language`.

use legend_groups_core::error::Result;
use legend_groups_core::types::GroupField;
use legend_groups_core::GroupService;
use tracing::warn;

use super::group::GroupSubcommand;
use crate::components::{CommandSender, OnlinePlayer};

/// Keep the options that start with `typed`, ignoring ASCII case.
fn filter_prefix(options: Vec<String>, typed: &str) -> Vec<String> {
    let typed = typed.to_ascii_lowercase();
    options
        .into_iter()
        .filter(|option| option.to_ascii_lowercase().starts_with(&typed))
        .collect()
}

/// Suggestions for the argument currently being typed, which is the last
/// element of `raw_args`.
pub async fn complete_group<S: AsRef<str>>(
    service: &GroupService,
    sender: &CommandSender,
    online: &[OnlinePlayer],
    raw_args: &[S],
) -> Vec<String> {
    let Some((typed, before)) = raw_args.split_last() else {
        return Vec::new();
    };
    let typed = typed.as_ref();

    let Some(first) = before.first() else {
        let names = GroupSubcommand::ALL
            .into_iter()
            .filter(|s| s.permitted(sender))
            .map(|s| s.name().to_string())
            .collect();
        return filter_prefix(names, typed);
    };

    let Some(subcommand) = GroupSubcommand::parse(first.as_ref()) else {
        return Vec::new();
    };
    if !subcommand.permitted(sender) {
        return Vec::new();
    }

    match options(service, subcommand, online, before.len()).await {
        Ok(options) => filter_prefix(options, typed),
        Err(e) => {
            warn!(subcommand = %subcommand, error = %e, "Completion failed");
            Vec::new()
        }
    }
}

/// Candidates for argument `position` (1 = first argument after the
/// subcommand literal).
async fn options(
    service: &GroupService,
    subcommand: GroupSubcommand,
    online: &[OnlinePlayer],
    position: usize,
) -> Result<Vec<String>> {
    let online_names = || -> Vec<String> { online.iter().map(|p| p.name.clone()).collect() };
    Ok(match (subcommand, position) {
        (GroupSubcommand::Add | GroupSubcommand::Remove, 1) => online_names(),
        (GroupSubcommand::Add | GroupSubcommand::Remove, 2)
        | (GroupSubcommand::Delete | GroupSubcommand::Edit, 1) => service.group_names().await?,
        (GroupSubcommand::Edit, 2) => GroupField::ALL.iter().map(|f| f.as_str().to_string()).collect(),
        (GroupSubcommand::Sign, 1) => vec!["add".to_string(), "remove".to_string()],
        _ => Vec::new(),
    })
}

/// Language names for `/language`.
pub async fn complete_language<S: AsRef<str>>(service: &GroupService, raw_args: &[S]) -> Vec<String> {
    let [typed] = raw_args else {
        return Vec::new();
    };
    match service.languages().await {
        Ok(languages) => filter_prefix(languages.into_iter().map(|l| l.name).collect(), typed.as_ref()),
        Err(e) => {
            warn!(error = %e, "Language completion failed");
            Vec::new()
        }
    }
}
