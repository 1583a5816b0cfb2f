use std::{collections::HashSet, env, fmt, str::FromStr};

use poise::serenity_prelude as serenity;
use serenity::all::{GatewayIntents, OnlineStatus};

use crate::{
    data::{ActivityKind, PresenceStatus, ReadyHook},
    error::ConfigError,
};

pub static DEFAULT_DATABASE_URL: &str = "sqlite://database.sqlite?mode=rwc";

static STREAM_URL: &str =
    "https://www.youtube.com/@%D0%BC%D0%B8%D1%81%D1%82%D0%B5%D1%80-%D0%B4%D1%8D%D0%BF";
static LOG_CHANNEL_ID: u64 = 1380518098053894146;

/// A string that never shows up in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Everything read from the process environment.
#[derive(Debug, Clone)]
pub struct Secrets {
    pub discord_token: Secret,
    pub security_key: Option<Secret>,
    pub database_url: Option<String>,
}

impl Secrets {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let discord_token = lookup("DISCORD_TOKEN").ok_or(ConfigError::MissingVar("DISCORD_TOKEN"))?;
        if discord_token.trim().is_empty() {
            return Err(ConfigError::EmptyVar("DISCORD_TOKEN"));
        }
        Ok(Self {
            discord_token: Secret::new(discord_token),
            security_key: lookup("SECURITY_KEY").map(Secret::new),
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventFlag {
    OnMessage,
    OnInteractionCreate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseEngine {
    KeyValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    File,
    Memory,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseConfig {
    pub engine: DatabaseEngine,
    pub backend_url: String,
    pub mode: StorageMode,
    pub tables: Vec<String>,
    pub security_key: Secret,
}

#[derive(Debug, Clone)]
pub struct BotConfiguration {
    pub auth_token: Secret,
    pub prefix: String,
    pub intents: GatewayIntents,
    pub events: HashSet<EventFlag>,
    pub database: Option<DatabaseConfig>,
    pub mobile_platform: bool,
}

impl BotConfiguration {
    pub fn handles(&self, event: EventFlag) -> bool {
        self.events.contains(&event)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryMode {
    /// Every module file is registered; a malformed one fails the load.
    All,
    /// Only modules with a string `name` and `code` are kept.
    Filtered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Stream,
    Interactions,
    Database,
    Mobile,
    Filtered,
}

impl Variant {
    pub const ALL: [Variant; 5] = [
        Variant::Stream,
        Variant::Interactions,
        Variant::Database,
        Variant::Mobile,
        Variant::Filtered,
    ];
}

impl FromStr for Variant {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        Variant::ALL
            .into_iter()
            .find(|variant| variant.to_string() == name)
            .ok_or(ConfigError::UnknownVariant(name))
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Variant::Stream => "stream",
            Variant::Interactions => "interactions",
            Variant::Database => "database",
            Variant::Mobile => "mobile",
            Variant::Filtered => "filtered",
        };
        f.write_str(name)
    }
}

/// The full startup description of one deployment.
#[derive(Debug, Clone)]
pub struct BotSetup {
    pub config: BotConfiguration,
    /// Shown in order, each for its own refresh interval.
    pub presence: Vec<PresenceStatus>,
    pub ready_hook: ReadyHook,
    pub discovery: DiscoveryMode,
}

pub fn build_configuration(variant: Variant, secrets: &Secrets) -> Result<BotSetup, ConfigError> {
    let message_intents = GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES;
    let all_events = HashSet::from([EventFlag::OnMessage, EventFlag::OnInteractionCreate]);
    let auth_token = secrets.discord_token.clone();

    let setup = match variant {
        Variant::Stream => BotSetup {
            config: BotConfiguration {
                auth_token,
                prefix: "$".into(),
                intents: message_intents,
                events: all_events,
                database: None,
                mobile_platform: false,
            },
            presence: vec![
                PresenceStatus::streaming("Я Оставил ДРУЗЕЙ в Заброшенном Городе!", STREAM_URL)
                    .online(OnlineStatus::Idle)
                    .refresh_every(12),
                PresenceStatus::new("$help", ActivityKind::Playing)
                    .online(OnlineStatus::Idle)
                    .refresh_every(12),
            ],
            ready_hook: ReadyHook::channel(LOG_CHANNEL_ID, "\"Бот запущен как **$userTag[$clientID]**"),
            discovery: DiscoveryMode::All,
        },
        Variant::Interactions => BotSetup {
            config: BotConfiguration {
                auth_token,
                prefix: "!".into(),
                intents: GatewayIntents::GUILDS,
                events: HashSet::from([EventFlag::OnInteractionCreate]),
                database: None,
                mobile_platform: false,
            },
            presence: vec![
                PresenceStatus::new("Слэш-команды", ActivityKind::Custom).online(OnlineStatus::Idle),
            ],
            ready_hook: ReadyHook::log("Бот запущен как $userTag[$clientID]"),
            discovery: DiscoveryMode::All,
        },
        Variant::Database => {
            let security_key = secrets
                .security_key
                .clone()
                .ok_or(ConfigError::MissingVar("SECURITY_KEY"))?;
            if security_key.expose().is_empty() {
                return Err(ConfigError::EmptyVar("SECURITY_KEY"));
            }
            let backend_url = secrets
                .database_url
                .clone()
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_owned());
            BotSetup {
                config: BotConfiguration {
                    auth_token,
                    prefix: "$".into(),
                    intents: GatewayIntents::non_privileged() | GatewayIntents::MESSAGE_CONTENT,
                    events: all_events,
                    database: Some(DatabaseConfig {
                        engine: DatabaseEngine::KeyValue,
                        mode: if backend_url.contains(":memory:") {
                            StorageMode::Memory
                        } else {
                            StorageMode::File
                        },
                        backend_url,
                        tables: vec!["main".to_owned()],
                        security_key,
                    }),
                    mobile_platform: false,
                },
                presence: vec![PresenceStatus::new("за базой данных", ActivityKind::Watching)],
                ready_hook: ReadyHook::log("Бот запущен как $userTag[$clientID]"),
                discovery: DiscoveryMode::Filtered,
            }
        }
        Variant::Mobile => BotSetup {
            config: BotConfiguration {
                auth_token,
                prefix: "!".into(),
                intents: GatewayIntents::all(),
                events: all_events,
                database: None,
                mobile_platform: true,
            },
            presence: Vec::new(),
            ready_hook: ReadyHook::log("Бот запущен как $userTag[$clientID]"),
            discovery: DiscoveryMode::All,
        },
        Variant::Filtered => BotSetup {
            config: BotConfiguration {
                auth_token,
                prefix: "$".into(),
                intents: message_intents,
                events: HashSet::from([EventFlag::OnMessage]),
                database: None,
                mobile_platform: false,
            },
            presence: vec![
                PresenceStatus::streaming("Команды из папки", STREAM_URL).online(OnlineStatus::Idle),
            ],
            ready_hook: ReadyHook::log("Бот запущен как $userTag[$clientID]"),
            discovery: DiscoveryMode::Filtered,
        },
    };

    for status in &setup.presence {
        status.validate()?;
    }
    Ok(setup)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::data::ReadyTarget;

    fn secrets(vars: &[(&str, &str)]) -> Result<Secrets, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Secrets::from_lookup(|key| vars.get(key).cloned())
    }

    fn full_secrets() -> Secrets {
        secrets(&[("DISCORD_TOKEN", "token-from-env"), ("SECURITY_KEY", "key-from-env")]).unwrap()
    }

    #[test]
    fn missing_token_is_fatal() {
        assert!(matches!(
            secrets(&[]),
            Err(ConfigError::MissingVar("DISCORD_TOKEN"))
        ));
        assert!(matches!(
            secrets(&[("DISCORD_TOKEN", "  ")]),
            Err(ConfigError::EmptyVar("DISCORD_TOKEN"))
        ));
    }

    #[test]
    fn auth_token_comes_from_environment() {
        let secrets = full_secrets();
        for variant in Variant::ALL {
            let setup = build_configuration(variant, &secrets).unwrap();
            assert_eq!(setup.config.auth_token.expose(), "token-from-env", "{variant}");
        }
    }

    #[test]
    fn token_is_redacted_in_debug_output() {
        let secrets = full_secrets();
        let rendered = format!("{secrets:?}");
        assert!(!rendered.contains("token-from-env"));
        assert!(!rendered.contains("key-from-env"));
    }

    #[test]
    fn database_variant_uses_env_key_and_main_table() {
        let setup = build_configuration(Variant::Database, &full_secrets()).unwrap();
        let database = setup.config.database.expect("database block");
        assert_eq!(database.tables, vec!["main".to_owned()]);
        assert_eq!(database.security_key.expose(), "key-from-env");
        assert_eq!(database.engine, DatabaseEngine::KeyValue);
        assert_eq!(database.backend_url, DEFAULT_DATABASE_URL);
        assert_eq!(database.mode, StorageMode::File);
    }

    #[test]
    fn database_variant_needs_security_key() {
        let secrets = secrets(&[("DISCORD_TOKEN", "t")]).unwrap();
        assert!(matches!(
            build_configuration(Variant::Database, &secrets),
            Err(ConfigError::MissingVar("SECURITY_KEY"))
        ));
    }

    #[test]
    fn empty_security_key_is_reported_as_empty() {
        let secrets = secrets(&[("DISCORD_TOKEN", "t"), ("SECURITY_KEY", "")]).unwrap();
        assert!(matches!(
            build_configuration(Variant::Database, &secrets),
            Err(ConfigError::EmptyVar("SECURITY_KEY"))
        ));
        // Variants without a database do not care about the key.
        assert!(build_configuration(Variant::Stream, &secrets).is_ok());
    }

    #[test]
    fn database_url_override_is_used() {
        let secrets = secrets(&[
            ("DISCORD_TOKEN", "t"),
            ("SECURITY_KEY", "k"),
            ("DATABASE_URL", "sqlite://other.sqlite"),
        ])
        .unwrap();
        let setup = build_configuration(Variant::Database, &secrets).unwrap();
        assert_eq!(setup.config.database.unwrap().backend_url, "sqlite://other.sqlite");
    }

    #[test]
    fn variants_without_database_have_none() {
        let secrets = full_secrets();
        for variant in Variant::ALL.into_iter().filter(|v| *v != Variant::Database) {
            let setup = build_configuration(variant, &secrets).unwrap();
            assert!(setup.config.database.is_none(), "{variant}");
        }
    }

    #[test]
    fn stream_url_present_only_for_streaming_variants() {
        let secrets = full_secrets();
        let urls: Vec<(Variant, bool)> = Variant::ALL
            .into_iter()
            .map(|v| {
                let setup = build_configuration(v, &secrets).unwrap();
                let has_url = setup.presence.iter().any(|p| p.stream_url.is_some());
                (v, has_url)
            })
            .collect();
        assert!(urls.iter().any(|(_, has)| *has));
        assert!(urls.iter().any(|(_, has)| !*has));

        let stream = build_configuration(Variant::Stream, &secrets).unwrap();
        assert_eq!(stream.presence.len(), 2);
        let presence = &stream.presence[0];
        assert_eq!(presence.activity, ActivityKind::Streaming);
        assert_eq!(presence.online, OnlineStatus::Idle);
        assert!(stream.presence.iter().all(|p| p.refresh_interval.as_secs() == 12));
        assert_eq!(stream.presence[1].stream_url, None);
    }

    #[test]
    fn disabled_ready_hooks_log_the_template_verbatim() {
        let secrets = full_secrets();
        for variant in Variant::ALL {
            let hook = build_configuration(variant, &secrets).unwrap().ready_hook;
            assert!(hook.code.contains("Бот запущен как"));
            if hook.target == ReadyTarget::Disabled {
                assert_eq!(hook.code, "Бот запущен как $userTag[$clientID]");
            }
        }
    }

    #[test]
    fn variant_differences() {
        let secrets = full_secrets();
        let interactions = build_configuration(Variant::Interactions, &secrets).unwrap();
        assert_eq!(interactions.config.prefix, "!");
        assert!(interactions.config.handles(EventFlag::OnInteractionCreate));
        assert!(!interactions.config.handles(EventFlag::OnMessage));

        let mobile = build_configuration(Variant::Mobile, &secrets).unwrap();
        assert!(mobile.config.mobile_platform);
        assert!(mobile.presence.is_empty());
        assert_eq!(mobile.config.intents, GatewayIntents::all());

        let filtered = build_configuration(Variant::Filtered, &secrets).unwrap();
        assert_eq!(filtered.discovery, DiscoveryMode::Filtered);
        assert_eq!(filtered.config.prefix, "$");
    }

    #[test]
    fn variant_names_parse() {
        for variant in Variant::ALL {
            assert_eq!(variant.to_string().parse::<Variant>().unwrap(), variant);
        }
        assert_eq!(" Stream ".parse::<Variant>().unwrap(), Variant::Stream);
        assert!(matches!(
            "legacy".parse::<Variant>(),
            Err(ConfigError::UnknownVariant(name)) if name == "legacy"
        ));
    }
}
