use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct MemdexConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
    pub linking: LinkingConfig,
    /// Fields dropped while parsing the config file. Logged once tracing is up.
    #[serde(skip)]
    pub warnings: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    /// Index file. A `.json` path is migrated to a `.jsonl` sibling on first open.
    pub index_path: String,
}

/// Which embedding backend to use. `None` disables semantic scoring entirely.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    None,
    Local,
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "local" => Ok(Self::Local),
            _ => Err(format!("unknown embedding provider: {s}")),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: ProviderKind,
    pub model: String,
    pub cache_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub max_results: usize,
    pub min_score: f64,
    pub relation_depth: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LinkingConfig {
    pub auto_link: bool,
    pub similarity_threshold: f64,
    pub max_links: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let index_path = default_memdex_dir()
            .join("memory.jsonl")
            .to_string_lossy()
            .into_owned();
        Self { index_path }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        let cache_dir = default_memdex_dir()
            .join("models")
            .to_string_lossy()
            .into_owned();
        Self {
            provider: ProviderKind::Local,
            model: "all-MiniLM-L6-v2".into(),
            cache_dir,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_results: 10,
            min_score: 0.25,
            relation_depth: 1,
        }
    }
}

impl Default for LinkingConfig {
    fn default() -> Self {
        Self {
            auto_link: true,
            similarity_threshold: 0.65,
            max_links: 3,
        }
    }
}

/// Parse config TOML, dropping any field whose value does not fit its type.
///
/// A dropped field keeps its default and is recorded in `warnings`. Only
/// malformed TOML syntax is an error.
pub fn parse_config(contents: &str) -> Result<MemdexConfig> {
    let mut root: toml::Table = toml::from_str(contents).context("failed to parse config TOML")?;
    let mut warnings = Vec::new();

    let misshapen: Vec<String> = root
        .iter()
        .filter(|(name, value)| {
            matches!(
                name.as_str(),
                "server" | "storage" | "embedding" | "retrieval" | "linking"
            ) && !value.is_table()
        })
        .map(|(name, _)| name.clone())
        .collect();
    for name in misshapen {
        root.remove(&name);
        warnings.push(format!("config section [{name}] is not a table, using defaults"));
    }

    for (name, value) in root.iter_mut() {
        let Some(section) = value.as_table_mut() else {
            continue;
        };
        match name.as_str() {
            "server" => prune_section::<ServerConfig>(name, section, &mut warnings),
            "storage" => prune_section::<StorageConfig>(name, section, &mut warnings),
            "embedding" => prune_section::<EmbeddingConfig>(name, section, &mut warnings),
            "retrieval" => prune_section::<RetrievalConfig>(name, section, &mut warnings),
            "linking" => prune_section::<LinkingConfig>(name, section, &mut warnings),
            _ => {}
        }
    }

    let mut config: MemdexConfig = toml::Value::Table(root)
        .try_into()
        .context("failed to parse config TOML")?;
    config.warnings = warnings;
    Ok(config)
}

/// Remove keys of `section` that fail to deserialize into `T` on their own.
/// Every section type is `#[serde(default)]`, so each key can be checked alone.
fn prune_section<T: serde::de::DeserializeOwned>(
    name: &str,
    section: &mut toml::Table,
    warnings: &mut Vec<String>,
) {
    if toml::Value::Table(section.clone()).try_into::<T>().is_ok() {
        return;
    }
    let mut rejected = Vec::new();
    for (key, value) in section.iter() {
        let mut single = toml::Table::new();
        single.insert(key.clone(), value.clone());
        if let Err(e) = toml::Value::Table(single).try_into::<T>() {
            warnings.push(format!("ignoring {name}.{key}: {}, using default", e.message()));
            rejected.push(key.clone());
        }
    }
    for key in rejected {
        section.remove(&key);
    }
}

/// Returns `~/.memdex/`, or `./.memdex/` when no home directory is known.
pub fn default_memdex_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".memdex")
}

/// Returns the default config file path: `~/.memdex/config.toml`
pub fn default_config_path() -> PathBuf {
    default_memdex_dir().join("config.toml")
}

impl MemdexConfig {
    /// Load config from the default TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            parse_config(&contents)?
        } else {
            info!("no config file at {}, using defaults", path.display());
            MemdexConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (MEMDEX_INDEX, MEMDEX_LOG_LEVEL, MEMDEX_EMBEDDING).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("MEMDEX_INDEX") {
            self.storage.index_path = val;
        }
        if let Ok(val) = std::env::var("MEMDEX_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("MEMDEX_EMBEDDING") {
            match val.parse() {
                Ok(kind) => self.embedding.provider = kind,
                Err(e) => tracing::warn!(value = %val, "ignoring MEMDEX_EMBEDDING: {e}"),
            }
        }
    }

    /// Resolve the configured index path, expanding `~` if needed.
    pub fn resolved_index_path(&self) -> PathBuf {
        expand_tilde(&self.storage.index_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
