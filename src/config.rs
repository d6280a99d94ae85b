use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::storage::BackendKind;
use crate::{Error, Result};

/// Environment variable that overrides the configured backend
pub const BACKEND_ENV: &str = "PROVERBS_BACKEND";

/// On-disk configuration (`proverbs.toml`). Every key is optional.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ProverbsConfig {
    pub backend: Option<BackendKind>,
    pub relational: RelationalConfig,
    pub document: DocumentConfig,
    pub kv: KvConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RelationalConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DocumentConfig {
    pub dir: Option<PathBuf>,
    pub collection: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct KvConfig {
    pub dir: Option<PathBuf>,
}

/// Fully resolved connection parameters for one backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Relational { path: PathBuf },
    Document { dir: PathBuf, collection: String },
    Kv { dir: PathBuf },
}

impl StoreConfig {
    pub fn kind(&self) -> BackendKind {
        match self {
            StoreConfig::Relational { .. } => BackendKind::Relational,
            StoreConfig::Document { .. } => BackendKind::Document,
            StoreConfig::Kv { .. } => BackendKind::Kv,
        }
    }
}

impl ProverbsConfig {
    /// Config with every default spelled out, as written by `init`
    pub fn with_defaults() -> Self {
        let base = Path::new(DATA_DIR);
        Self {
            backend: Some(BackendKind::Relational),
            relational: RelationalConfig { path: Some(default_database_path_in(base)) },
            document: DocumentConfig {
                dir: Some(base.join("documents")),
                collection: Some(DEFAULT_COLLECTION.to_string()),
            },
            kv: KvConfig { dir: Some(base.join("kv")) },
        }
    }

    /// Pick the backend (explicit override, then env, then file, then default)
    /// and fill in its connection parameters.
    pub fn resolve(&self, backend_override: Option<BackendKind>) -> Result<StoreConfig> {
        let kind = match backend_override {
            Some(kind) => kind,
            None => match std::env::var(BACKEND_ENV) {
                Ok(v) if !v.trim().is_empty() => v.parse::<BackendKind>()?,
                _ => self.backend.unwrap_or(BackendKind::Relational),
            },
        };
        self.resolve_kind(kind)
    }

    /// Connection parameters for a specific backend, ignoring overrides
    pub fn resolve_kind(&self, kind: BackendKind) -> Result<StoreConfig> {
        let base = Path::new(DATA_DIR);
        let config = match kind {
            BackendKind::Relational => StoreConfig::Relational {
                path: self.relational.path.clone().unwrap_or_else(|| default_database_path_in(base)),
            },
            BackendKind::Document => {
                let collection = self
                    .document
                    .collection
                    .clone()
                    .unwrap_or_else(|| DEFAULT_COLLECTION.to_string());
                if collection.is_empty()
                    || !collection.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
                {
                    return Err(Error::Config(format!("invalid collection name {:?}", collection)));
                }
                StoreConfig::Document {
                    dir: self.document.dir.clone().unwrap_or_else(|| base.join("documents")),
                    collection,
                }
            }
            BackendKind::Kv => StoreConfig::Kv {
                dir: self.kv.dir.clone().unwrap_or_else(|| base.join("kv")),
            },
        };
        Ok(config)
    }
}

const DATA_DIR: &str = ".proverbs";
const DEFAULT_COLLECTION: &str = "proverbs";

pub fn default_config_path() -> PathBuf {
    PathBuf::from("proverbs.toml")
}

pub fn default_database_path_in(base: &Path) -> PathBuf {
    base.join("proverbs.db")
}

/// Load the config file. A missing file at the default location is not an
/// error; a missing file that was asked for explicitly is.
pub fn load_config(path: Option<&Path>) -> Result<ProverbsConfig> {
    let explicit = path.is_some();
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        if explicit {
            return Err(Error::Config(format!("config file {} not found", path.display())));
        }
        return Ok(ProverbsConfig::default());
    }

    let contents = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
    let config: ProverbsConfig = toml::from_str(&contents)
        .map_err(|e| Error::Config(format!("invalid {}: {}", path.display(), e)))?;
    tracing::debug!("Loaded config from {}", path.display());
    Ok(config)
}

pub fn write_config(path: &Path, config: &ProverbsConfig, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(Error::Config(format!(
            "config already exists at {} (use --force to overwrite)",
            path.display()
        )));
    }

    let contents = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("cannot serialize config: {}", e)))?;
    std::fs::write(path, contents)
        .map_err(|e| Error::Config(format!("cannot write {}: {}", path.display(), e)))?;
    Ok(())
}

/// Create the parent directory of a file-backed store if needed
pub fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
