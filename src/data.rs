use std::{sync::Arc, time::Duration};

use poise::serenity_prelude as serenity;
use serenity::all::{ActivityData, ChannelId, OnlineStatus};

use crate::{db::KvStore, error::ConfigError};

pub static DEFAULT_COMMANDS_DIR: &str = "./commands";
pub static DEFAULT_REFRESH_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    Playing,
    Streaming,
    Watching,
    Custom,
}

/// A single presence entry shown by the bot.
#[derive(Debug, Clone, PartialEq)]
pub struct PresenceStatus {
    pub name: String,
    pub activity: ActivityKind,
    /// Required when `activity` is [`ActivityKind::Streaming`].
    pub stream_url: Option<String>,
    pub online: OnlineStatus,
    pub refresh_interval: Duration,
}

impl PresenceStatus {
    pub fn new(name: impl Into<String>, activity: ActivityKind) -> Self {
        Self {
            name: name.into(),
            activity,
            stream_url: None,
            online: OnlineStatus::Online,
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_SECS),
        }
    }

    pub fn streaming(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            stream_url: Some(url.into()),
            ..Self::new(name, ActivityKind::Streaming)
        }
    }

    pub fn online(mut self, online: OnlineStatus) -> Self {
        self.online = online;
        self
    }

    pub fn refresh_every(mut self, secs: u64) -> Self {
        self.refresh_interval = Duration::from_secs(secs);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.refresh_interval.is_zero() {
            return Err(ConfigError::ZeroRefreshInterval(self.name.clone()));
        }
        self.activity_data().map(|_| ())
    }

    /// Converts the status into the gateway activity payload.
    pub fn activity_data(&self) -> Result<ActivityData, ConfigError> {
        let name = self.name.as_str();
        let activity = match self.activity {
            ActivityKind::Playing => ActivityData::playing(name),
            ActivityKind::Watching => ActivityData::watching(name),
            ActivityKind::Custom => ActivityData::custom(name),
            ActivityKind::Streaming => {
                let url = self
                    .stream_url
                    .as_deref()
                    .ok_or_else(|| ConfigError::MissingStreamUrl(self.name.clone()))?;
                ActivityData::streaming(name, url).map_err(|e| ConfigError::InvalidStreamUrl {
                    name: self.name.clone(),
                    reason: e.to_string(),
                })?
            }
        };
        Ok(activity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyTarget {
    /// Log locally instead of sending a message.
    Disabled,
    Channel(ChannelId),
}

/// Fired once when the client first reaches the ready state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyHook {
    pub target: ReadyTarget,
    pub code: String,
}

impl ReadyHook {
    pub fn log(code: impl Into<String>) -> Self {
        Self {
            target: ReadyTarget::Disabled,
            code: code.into(),
        }
    }

    pub fn channel(channel_id: u64, code: impl Into<String>) -> Self {
        Self {
            target: ReadyTarget::Channel(ChannelId::new(channel_id)),
            code: code.into(),
        }
    }
}

pub struct DiscordData {
    pub store: Option<Arc<KvStore>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streaming_status_requires_url() {
        let mut status = PresenceStatus::streaming("live", "https://www.youtube.com/@x");
        assert!(status.validate().is_ok());

        status.stream_url = None;
        assert!(matches!(
            status.validate(),
            Err(ConfigError::MissingStreamUrl(name)) if name == "live"
        ));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let status = PresenceStatus::new("idle", ActivityKind::Custom).refresh_every(0);
        assert!(matches!(
            status.validate(),
            Err(ConfigError::ZeroRefreshInterval(_))
        ));
    }

    #[test]
    fn non_streaming_status_ignores_url() {
        let status = PresenceStatus::new("chess", ActivityKind::Playing).online(OnlineStatus::Idle);
        assert!(status.validate().is_ok());
        assert_eq!(status.stream_url, None);
    }
}
