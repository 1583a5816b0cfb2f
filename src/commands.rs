use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{config::DiscoveryMode, error::CommandLoadError};

/// Shape of a command module file.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandModule {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// A module that passed loading and is ready for registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRecord {
    pub name: String,
    pub code: String,
    pub aliases: Vec<String>,
    pub description: Option<String>,
    pub source: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Checked {
    Accepted(CommandRecord),
    Rejected { source: PathBuf, reason: String },
}

/// Accepts a module iff both `name` and `code` are strings.
pub fn check_module(value: &Value, source: &Path) -> Checked {
    let reject = |reason: &str| Checked::Rejected {
        source: source.to_owned(),
        reason: reason.to_owned(),
    };
    let Some(name) = value.get("name").and_then(Value::as_str) else {
        return reject("`name` is missing or not a string");
    };
    let Some(code) = value.get("code").and_then(Value::as_str) else {
        return reject("`code` is missing or not a string");
    };
    let aliases = value
        .get("aliases")
        .and_then(Value::as_array)
        .map(|aliases| {
            aliases
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default();
    let description = value
        .get("description")
        .and_then(Value::as_str)
        .map(str::to_owned);
    Checked::Accepted(CommandRecord {
        name: name.to_owned(),
        code: code.to_owned(),
        aliases,
        description,
        source: source.to_owned(),
    })
}

impl CommandModule {
    fn into_record(self, source: PathBuf) -> CommandRecord {
        CommandRecord {
            name: self.name,
            code: self.code,
            aliases: self.aliases,
            description: self.description,
            source,
        }
    }
}

/// Scans `dir` for command modules and returns them in path order.
pub fn discover_commands(
    dir: &Path,
    mode: DiscoveryMode,
) -> Result<Vec<CommandRecord>, CommandLoadError> {
    let mut files = Vec::new();
    collect_files(dir, &mut files)?;
    files.sort();

    let mut records = Vec::with_capacity(files.len());
    for path in files {
        let raw = fs::read(&path).map_err(|source| CommandLoadError::Io {
            path: path.clone(),
            source,
        })?;
        match mode {
            DiscoveryMode::All => {
                let module: CommandModule =
                    serde_json::from_slice(&raw).map_err(|source| CommandLoadError::Malformed {
                        path: path.clone(),
                        source,
                    })?;
                records.push(module.into_record(path));
            }
            DiscoveryMode::Filtered => {
                let Ok(value) = serde_json::from_slice::<Value>(&raw) else {
                    debug!("Skipping unparsable command module {}", path.display());
                    continue;
                };
                match check_module(&value, &path) {
                    Checked::Accepted(record) => records.push(record),
                    Checked::Rejected { source, reason } => {
                        debug!("Skipping command module {}: {}", source.display(), reason);
                    }
                }
            }
        }
    }

    let mut seen = HashSet::new();
    records.retain(|record| {
        let fresh = seen.insert(record.name.clone());
        if !fresh {
            warn!(
                "Command {} from {} is already registered, ignoring",
                record.name,
                record.source.display()
            );
        }
        fresh
    });
    info!("Loaded {} commands from {}", records.len(), dir.display());
    Ok(records)
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), CommandLoadError> {
    let io_err = |source| CommandLoadError::Io {
        path: dir.to_owned(),
        source,
    };
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        let hidden = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_none_or(|name| name.starts_with('_'));
        if hidden {
            continue;
        }
        if path.is_dir() {
            collect_files(&path, files)?;
        } else if path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    Ok(())
}
