use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    MissingVar(&'static str),
    #[error("environment variable {0} is empty")]
    EmptyVar(&'static str),
    #[error("unknown bot variant `{0}`")]
    UnknownVariant(String),
    #[error("streaming status `{0}` needs a stream url")]
    MissingStreamUrl(String),
    #[error("invalid stream url for status `{name}`: {reason}")]
    InvalidStreamUrl { name: String, reason: String },
    #[error("status `{0}` has a zero refresh interval")]
    ZeroRefreshInterval(String),
}

#[derive(Debug, Error)]
pub enum CommandLoadError {
    #[error("cannot read command path {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed command module {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("the key-value store needs a non-empty security key")]
    EmptySecurityKey,
    #[error("invalid table name `{0}`")]
    InvalidTable(String),
    #[error("unknown table `{0}`")]
    UnknownTable(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}
