use poise::serenity_prelude as serenity;
use serenity::all::{Client, Ready};
use tracing::{error, info, warn};

use crate::{
    commands::CommandRecord,
    config::{BotConfiguration, EventFlag},
    data::{DiscordData, PresenceStatus, ReadyHook, ReadyTarget},
    presence,
    template::{self, Scope, UserRef},
};

use super::Error;

pub struct DiscordClient {
    pub client: Client,
}

/// Everything the client needs once it reaches the ready state.
pub struct ReadySetup {
    pub presence: Vec<PresenceStatus>,
    pub hook: Option<ReadyHook>,
}

impl DiscordClient {
    pub async fn new(
        config: &BotConfiguration,
        records: &[CommandRecord],
        ready_setup: ReadySetup,
        data: DiscordData,
    ) -> anyhow::Result<Self> {
        let on_interaction = config.handles(EventFlag::OnInteractionCreate);
        if config.mobile_platform {
            warn!("Mobile platform presence is requested but the gateway identify properties are fixed");
        }

        let framework = poise::Framework::builder()
            .options(framework_options(config, records))
            .setup(move |ctx, ready, framework| {
                Box::pin(async move {
                    info!("{} is connected to Discord!", ready.user.name);
                    presence::start(ctx, ready_setup.presence);
                    if let Some(hook) = &ready_setup.hook {
                        fire_ready_hook(ctx, ready, hook).await;
                    }
                    if let Some(store) = &data.store {
                        if let Some(table) = store.tables().first() {
                            if let Ok(Some(previous)) = store.get(table, "last_ready").await {
                                info!("Last started as {}", previous);
                            }
                            if let Err(why) = store.set(table, "last_ready", &ready.user.tag()).await {
                                error!("Could not record ready state: {}", why);
                            }
                        }
                    }
                    // A failed registration must not keep the framework data unset.
                    if on_interaction {
                        if let Err(why) =
                            poise::builtins::register_globally(ctx, &framework.options().commands)
                                .await
                        {
                            error!("Slash command registration failed: {:?}", why);
                        }
                    }
                    Ok::<_, Error>(data)
                })
            })
            .build();

        let client = serenity::ClientBuilder::new(config.auth_token.expose(), config.intents)
            .framework(framework)
            .await;

        Ok(DiscordClient { client: client? })
    }
}

/// Maps the configured events and prefix onto poise's dispatch options.
pub fn framework_options(
    config: &BotConfiguration,
    records: &[CommandRecord],
) -> poise::FrameworkOptions<DiscordData, Error> {
    let on_message = config.handles(EventFlag::OnMessage);
    let on_interaction = config.handles(EventFlag::OnInteractionCreate);
    poise::FrameworkOptions {
        commands: records
            .iter()
            .map(|record| super::commands::script_command(record, on_message, on_interaction))
            .collect(),
        prefix_options: poise::PrefixFrameworkOptions {
            prefix: on_message.then(|| config.prefix.clone()),
            mention_as_prefix: on_message,
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Renders the hook's code for the bot that just came online.
pub fn ready_message(hook: &ReadyHook, me: UserRef) -> String {
    let scope = Scope {
        client: Some(me),
        ..Default::default()
    };
    template::render(&hook.code, &scope)
}

async fn fire_ready_hook(ctx: &serenity::Context, ready: &Ready, hook: &ReadyHook) {
    let me = UserRef {
        id: ready.user.id.to_string(),
        tag: ready.user.tag(),
    };
    let text = ready_message(hook, me);
    match hook.target {
        ReadyTarget::Disabled => info!("{}", text),
        ReadyTarget::Channel(channel_id) => {
            if let Err(why) = channel_id.say(&ctx.http, &text).await {
                error!("Channel {}: Ready message failed: {:?}", channel_id, why);
            }
        }
    }
}
