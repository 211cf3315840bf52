use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Connection settings, usually read from `rowmap.toml`.
///
/// With the embedded SQLite driver `database` is the database file
/// (`:memory:` for an in-memory database). `host`, `user` and `password`
/// are kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub database: String,
    pub host: String,
    pub user: String,
    pub password: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            database: "rowmap.db".to_string(),
            host: "localhost".to_string(),
            user: "root".to_string(),
            password: String::new(),
        }
    }
}

impl ConnectionConfig {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            ..Self::default()
        }
    }

    pub fn in_memory() -> Self {
        Self::new(":memory:")
    }

    pub fn is_in_memory(&self) -> bool {
        self.database == ":memory:"
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("rowmap.toml")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<ConnectionConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: ConnectionConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &ConnectionConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}
