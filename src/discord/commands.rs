use std::{future::Future, pin::Pin};

use tracing::{debug, info, warn};

use crate::{
    commands::CommandRecord,
    data::DiscordData,
    template::{self, Scope, UserRef},
};

use super::{Context, Error};

type Command = poise::Command<DiscordData, Error>;
type ActionResult<'a> = Result<(), poise::FrameworkError<'a, DiscordData, Error>>;
type ActionFuture<'a> = Pin<Box<dyn Future<Output = ActionResult<'a>> + Send + 'a>>;
type PrefixAction = for<'a> fn(poise::PrefixContext<'a, DiscordData, Error>) -> ActionFuture<'a>;
type SlashAction = for<'a> fn(poise::ApplicationContext<'a, DiscordData, Error>) -> ActionFuture<'a>;

static DEFAULT_DESCRIPTION: &str = "Custom command";

/// Reply template carried by each loaded command.
#[derive(Debug, Clone)]
pub struct ScriptCommand {
    pub code: String,
}

/// Turns a loaded record into a framework command. `prefix` and `slash` pick
/// the dispatch paths the command answers on.
pub fn script_command(record: &CommandRecord, prefix: bool, slash: bool) -> Command {
    let name = record.name.clone();
    let description = record
        .description
        .clone()
        .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_owned());
    let slash_ok = valid_slash_name(&name) && valid_slash_description(&description);
    if slash && !slash_ok {
        warn!("Command {} is not a valid slash command, keeping it off slash dispatch", name);
    }
    let slash = slash && slash_ok;
    if !slash && !prefix {
        warn!("Command {} cannot be dispatched with the enabled events", name);
    }
    Command {
        prefix_action: prefix.then_some(prefix_reply as PrefixAction),
        slash_action: slash.then_some(slash_reply as SlashAction),
        qualified_name: name.clone(),
        identifying_name: name.clone(),
        name,
        aliases: if prefix { record.aliases.clone() } else { Vec::new() },
        description: Some(description),
        custom_data: Box::new(ScriptCommand {
            code: record.code.clone(),
        }),
        ..Default::default()
    }
}

// Discord only accepts lowercase names of 1 to 32 characters for slash commands.
fn valid_slash_name(name: &str) -> bool {
    (1..=32).contains(&name.chars().count())
        && name
            .chars()
            .all(|c| c.is_lowercase() || c.is_numeric() || c == '-' || c == '_')
}

fn valid_slash_description(description: &str) -> bool {
    (1..=100).contains(&description.chars().count())
}

fn prefix_reply(ctx: poise::PrefixContext<'_, DiscordData, Error>) -> ActionFuture<'_> {
    Box::pin(async move {
        reply(ctx.into())
            .await
            .map_err(|error| poise::FrameworkError::new_command(ctx.into(), error))
    })
}

fn slash_reply(ctx: poise::ApplicationContext<'_, DiscordData, Error>) -> ActionFuture<'_> {
    Box::pin(async move {
        reply(ctx.into())
            .await
            .map_err(|error| poise::FrameworkError::new_command(ctx.into(), error))
    })
}

fn scope_for(ctx: Context<'_>) -> Scope {
    let client = {
        let me = ctx.cache().current_user();
        UserRef {
            id: me.id.to_string(),
            tag: me.tag(),
        }
    };
    let author = ctx.author();
    Scope {
        client: Some(client),
        author: Some(UserRef {
            id: author.id.to_string(),
            tag: author.tag(),
        }),
        channel_id: Some(ctx.channel_id().to_string()),
        guild_id: ctx.guild_id().map(|id| id.to_string()),
    }
}

async fn reply(ctx: Context<'_>) -> Result<(), Error> {
    let script = ctx
        .command()
        .custom_data
        .downcast_ref::<ScriptCommand>()
        .ok_or("command has no script attached")?;
    let text = template::render(&script.code, &scope_for(ctx));
    info!(
        "Channel {}: {} invoked by {}",
        ctx.channel_id(),
        ctx.command().name,
        ctx.author().name
    );
    if text.trim().is_empty() {
        debug!("Command {} rendered an empty reply", ctx.command().name);
        return Ok(());
    }
    ctx.say(text).await?;
    Ok(())
}
