use global_placeholders::global;
use macros_rs::string;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fs, path::PathBuf};

/// User the supervised process runs as when the declaration doesn't name one.
pub const DEFAULT_USER: &str = "httpd";
/// Launch command used when the declaration doesn't carry its own.
pub const DEFAULT_COMMAND: &str = "/usr/bin/env ruby rv_harness.rb";

fn default_cluster_size() -> u32 {
    1
}

fn default_user() -> String {
    string!(DEFAULT_USER)
}

fn default_command() -> String {
    string!(DEFAULT_COMMAND)
}

/// One application declaration, loaded from `<conf_dir>/<app>.yml`.
/// Immutable once loaded; unknown keys land in `extra` and are forwarded to
/// the launched process as environment variables.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application name, also the stem of the declaration file
    pub app: String,
    /// Working directory the instances run in
    pub dir: PathBuf,
    /// Base port; cluster siblings bind to sequential ports above it
    pub port: u16,
    #[serde(default = "default_cluster_size")]
    pub cluster_size: u32,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default = "default_command")]
    pub command: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// Render a YAML scalar the way it would appear in an environment variable.
/// Mappings and sequences have no such rendering and return `None`.
pub fn scalar_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(value) => Some(value.clone()),
        serde_yaml::Value::Number(value) => Some(value.to_string()),
        serde_yaml::Value::Bool(value) => Some(value.to_string()),
        _ => None,
    }
}

pub fn conf_dir() -> String {
    global!("psup.config")
}

/// Resolve a name pattern against the configuration directory.
pub fn resolve(pattern: &str) -> Result<Vec<AppConfig>, String> {
    resolve_in(&conf_dir(), pattern)
}

/// Resolve a name pattern against an explicit directory. Matching follows
/// glob order (alphabetical); an empty match set is a fatal error for the
/// whole invocation, a malformed declaration likewise.
pub fn resolve_in(dir: &str, pattern: &str) -> Result<Vec<AppConfig>, String> {
    let matcher = format!("{dir}/{pattern}.yml");
    let entries =
        glob::glob(&matcher).map_err(|err| format!("Invalid pattern '{pattern}': {err}"))?;

    let mut configs = vec![];
    for entry in entries {
        let path = entry.map_err(|err| format!("Failed to read '{}': {}", err.path().display(), err))?;
        let contents = fs::read_to_string(&path)
            .map_err(|err| format!("Failed to read '{}': {}", path.display(), err))?;
        let config: AppConfig = serde_yaml::from_str(&contents)
            .map_err(|err| format!("Failed to parse '{}': {}", path.display(), err))?;
        configs.push(config);
    }

    if configs.is_empty() {
        return Err(format!("No applications found for '{pattern}' in {dir}/"));
    }

    Ok(configs)
}
