use std::{path::Path, sync::Arc};

use tracing::{error, info};

use crate::{
    commands::{self, CommandRecord},
    config::{self, BotConfiguration, DiscoveryMode, Secrets, Variant},
    data::{DiscordData, PresenceStatus, ReadyHook},
    db::KvStore,
    discord::framework::{DiscordClient, ReadySetup},
    error::{CommandLoadError, ConfigError, StoreError},
    signal,
};

/// Startup state of one bot process, assembled before the client exists.
pub struct App {
    config: BotConfiguration,
    presence: Vec<PresenceStatus>,
    ready_hook: Option<ReadyHook>,
    commands: Vec<CommandRecord>,
    store: Option<Arc<KvStore>>,
}

impl App {
    pub fn new(config: BotConfiguration) -> Self {
        App {
            config,
            presence: Vec::new(),
            ready_hook: None,
            commands: Vec::new(),
            store: None,
        }
    }

    pub fn config(&self) -> &BotConfiguration {
        &self.config
    }

    pub fn register_presence(&mut self, status: PresenceStatus) -> Result<&mut Self, ConfigError> {
        status.validate()?;
        self.presence.push(status);
        Ok(self)
    }

    pub fn presence(&self) -> &[PresenceStatus] {
        &self.presence
    }

    /// Replaces any previously registered hook; only one fires.
    pub fn register_ready_hook(&mut self, hook: ReadyHook) -> &mut Self {
        self.ready_hook = Some(hook);
        self
    }

    pub fn ready_hook(&self) -> Option<&ReadyHook> {
        self.ready_hook.as_ref()
    }

    pub fn discover_commands(
        &mut self,
        dir: &Path,
        mode: DiscoveryMode,
    ) -> Result<usize, CommandLoadError> {
        self.commands = commands::discover_commands(dir, mode)?;
        Ok(self.commands.len())
    }

    pub fn commands(&self) -> &[CommandRecord] {
        &self.commands
    }

    /// Opens the key-value store when the configuration carries a database block.
    pub async fn open_store(&mut self) -> Result<(), StoreError> {
        if let Some(database) = &self.config.database {
            self.store = Some(Arc::new(KvStore::open(database).await?));
        }
        Ok(())
    }

    pub async fn instantiate_client(self) -> anyhow::Result<RunningApp> {
        let ready_setup = ReadySetup {
            presence: self.presence,
            hook: self.ready_hook,
        };
        let data = DiscordData {
            store: self.store.clone(),
        };
        let client = DiscordClient::new(&self.config, &self.commands, ready_setup, data).await?;
        Ok(RunningApp {
            client,
            store: self.store,
        })
    }
}

pub struct RunningApp {
    client: DiscordClient,
    store: Option<Arc<KvStore>>,
}

impl RunningApp {
    /// Runs until the client fails or a shutdown signal arrives, then releases
    /// the shards and the store.
    pub async fn run(mut self) -> anyhow::Result<()> {
        let shard_manager = self.client.client.shard_manager.clone();
        tokio::select! {
            Err(why) = self.client.client.start() => {
                error!("Client error: {:?}", why);
            },
            _ = signal::wait_for_signal() => {}
        }
        shard_manager.shutdown_all().await;
        if let Some(store) = self.store.take() {
            store.close().await;
        }
        info!("Bot stopped");
        Ok(())
    }
}

/// Builds the app for `variant` and loads its commands from `commands_dir`.
pub async fn bootstrap(
    variant: Variant,
    secrets: &Secrets,
    commands_dir: &Path,
) -> anyhow::Result<App> {
    let setup = config::build_configuration(variant, secrets)?;
    info!("Configured {} bot with prefix {}", variant, setup.config.prefix);

    let mut app = App::new(setup.config);
    for status in setup.presence {
        app.register_presence(status)?;
    }
    app.register_ready_hook(setup.ready_hook);
    app.discover_commands(commands_dir, setup.discovery)?;
    app.open_store().await?;
    Ok(app)
}
