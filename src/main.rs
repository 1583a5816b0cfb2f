mod app;
mod commands;
mod config;
mod data;
mod db;
mod discord;
mod error;
mod presence;
mod signal;
mod template;

use std::{env, path::PathBuf};

use config::{Secrets, Variant};
use data::DEFAULT_COMMANDS_DIR;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env variables if it exists.
    dotenvy::dotenv().ok();

    // Initialize the logger to use environment variables.
    tracing_subscriber::fmt::init();

    let secrets = Secrets::load()?;
    let variant: Variant = env::var("BOT_VARIANT")
        .unwrap_or_else(|_| "stream".to_owned())
        .parse()?;
    let commands_dir = env::var("COMMANDS_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_COMMANDS_DIR));

    let app = app::bootstrap(variant, &secrets, &commands_dir).await?;
    info!(
        "Starting {} bot (prefix {}) with {} commands and {} statuses",
        variant,
        app.config().prefix,
        app.commands().len(),
        app.presence().len()
    );
    if let Some(hook) = app.ready_hook() {
        info!("Ready hook target: {:?}", hook.target);
    }

    app.instantiate_client().await?.run().await
}
