use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use dimicall_core::{canonical_key, NormalizeOptions};
use dimicall_ingest::format::MB;
use dimicall_ingest::{ImportOptions, SizeLimits};
use serde::Deserialize;
use thiserror::Error;

const APP_DIR: &str = "dimicall";
const CONFIG_FILENAME: &str = "config.toml";

/// Ceiling for `max_file_size_mb`; bigger sources are never accepted.
pub const MAX_FILE_SIZE_MB: u64 = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub import: ImportConfig,
    /// Extra header spelling to canonical header key.
    pub synonyms: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportConfig {
    pub max_file_size_mb: u64,
    pub direct_limit_mb: u64,
    pub large_file_mb: u64,
    pub small_chunk_rows: usize,
    pub large_chunk_rows: usize,
    pub yield_ms: u64,
    pub excluded_columns: Vec<String>,
    pub slot_aware: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: MAX_FILE_SIZE_MB,
            direct_limit_mb: 10,
            large_file_mb: 20,
            small_chunk_rows: 100,
            large_chunk_rows: 50,
            yield_ms: 5,
            excluded_columns: vec!["Nu".to_string()],
            slot_aware: false,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            import: ImportConfig::default(),
            synonyms: BTreeMap::new(),
        }
    }
}

impl AppConfig {
    pub fn size_limits(&self) -> SizeLimits {
        SizeLimits {
            max_bytes: self.import.max_file_size_mb * MB,
            direct_limit_bytes: self.import.direct_limit_mb * MB,
            large_bytes: self.import.large_file_mb * MB,
            small_chunk_rows: self.import.small_chunk_rows,
            large_chunk_rows: self.import.large_chunk_rows,
            pause: Duration::from_millis(self.import.yield_ms),
        }
    }

    pub fn import_options(&self) -> ImportOptions {
        ImportOptions {
            limits: self.size_limits(),
            excluded_columns: self.import.excluded_columns.clone(),
            synonyms: self
                .synonyms
                .iter()
                .map(|(spelling, key)| (spelling.clone(), key.clone()))
                .collect(),
            overrides: Vec::new(),
            normalize: NormalizeOptions {
                slot_aware: self.import.slot_aware,
            },
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing home directory")]
    MissingHomeDir,
    #[error("invalid config path: {0}")]
    InvalidConfigPath(PathBuf),
    #[error("config file not found: {0}")]
    MissingConfigFile(PathBuf),
    #[error("config file permissions too permissive: {0}")]
    InsecurePermissions(PathBuf),
    #[error("invalid max_file_size_mb value: {0} (expected 1..=50)")]
    InvalidMaxFileSize(u64),
    #[error("size thresholds must satisfy direct_limit_mb < large_file_mb <= max_file_size_mb (got {direct} / {large} / {max})")]
    InvalidThresholds { direct: u64, large: u64, max: u64 },
    #[error("invalid {name} value: must be greater than zero")]
    InvalidChunkRows { name: &'static str },
    #[error("synonym {spelling:?} targets unknown header key {target:?}")]
    UnknownSynonymTarget { spelling: String, target: String },
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    import: Option<ImportFile>,
    headers: Option<HeadersFile>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ImportFile {
    max_file_size_mb: Option<u64>,
    direct_limit_mb: Option<u64>,
    large_file_mb: Option<u64>,
    small_chunk_rows: Option<usize>,
    large_chunk_rows: Option<usize>,
    yield_ms: Option<u64>,
    excluded_columns: Option<Vec<String>>,
    slot_aware: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct HeadersFile {
    synonyms: Option<BTreeMap<String, String>>,
}

/// Loads the config at `config_path`, or the default location when `None`.
/// A missing default file yields defaults; a missing explicit file is an error.
pub fn load(config_path: Option<PathBuf>) -> Result<AppConfig> {
    let required = config_path.is_some();
    let path = match resolve_config_path(config_path) {
        Ok(path) => path,
        Err(ConfigError::MissingHomeDir) if !required => return Ok(AppConfig::default()),
        Err(ConfigError::InvalidConfigPath(_)) if !required => return Ok(AppConfig::default()),
        Err(err) => return Err(err),
    };
    Ok(load_at_path(&path, required)?.unwrap_or_default())
}

pub fn resolve_config_path(custom: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = custom {
        if path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidConfigPath(path));
        }
        return Ok(path);
    }
    let base = match env::var_os("XDG_CONFIG_HOME") {
        Some(dir) if dir.is_empty() => return Err(ConfigError::InvalidConfigPath(dir.into())),
        Some(dir) => PathBuf::from(dir),
        None => dirs::home_dir()
            .ok_or(ConfigError::MissingHomeDir)?
            .join(".config"),
    };
    Ok(base.join(APP_DIR).join(CONFIG_FILENAME))
}

fn load_at_path(path: &Path, required: bool) -> Result<Option<AppConfig>> {
    if !path.exists() {
        if required {
            return Err(ConfigError::MissingConfigFile(path.to_path_buf()));
        }
        return Ok(None);
    }

    ensure_permissions(path)?;
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed: ConfigFile = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(merge_config(parsed)?))
}

fn merge_config(parsed: ConfigFile) -> Result<AppConfig> {
    let mut config = AppConfig::default();

    if let Some(import) = parsed.import {
        let target = &mut config.import;
        if let Some(value) = import.max_file_size_mb {
            target.max_file_size_mb = value;
        }
        if let Some(value) = import.direct_limit_mb {
            target.direct_limit_mb = value;
        }
        if let Some(value) = import.large_file_mb {
            target.large_file_mb = value;
        }
        if let Some(value) = import.small_chunk_rows {
            target.small_chunk_rows = value;
        }
        if let Some(value) = import.large_chunk_rows {
            target.large_chunk_rows = value;
        }
        if let Some(value) = import.yield_ms {
            target.yield_ms = value;
        }
        if let Some(columns) = import.excluded_columns {
            target.excluded_columns = columns;
        }
        if let Some(value) = import.slot_aware {
            target.slot_aware = value;
        }
    }

    if let Some(synonyms) = parsed.headers.and_then(|headers| headers.synonyms) {
        for (spelling, target) in synonyms {
            let Some(key) = canonical_key(&target) else {
                return Err(ConfigError::UnknownSynonymTarget { spelling, target });
            };
            config.synonyms.insert(spelling, key.to_string());
        }
    }

    validate_import(&config.import)?;
    Ok(config)
}

fn validate_import(import: &ImportConfig) -> Result<()> {
    if import.max_file_size_mb == 0 || import.max_file_size_mb > MAX_FILE_SIZE_MB {
        return Err(ConfigError::InvalidMaxFileSize(import.max_file_size_mb));
    }
    if import.direct_limit_mb >= import.large_file_mb
        || import.large_file_mb > import.max_file_size_mb
    {
        return Err(ConfigError::InvalidThresholds {
            direct: import.direct_limit_mb,
            large: import.large_file_mb,
            max: import.max_file_size_mb,
        });
    }
    if import.small_chunk_rows == 0 {
        return Err(ConfigError::InvalidChunkRows {
            name: "small_chunk_rows",
        });
    }
    if import.large_chunk_rows == 0 {
        return Err(ConfigError::InvalidChunkRows {
            name: "large_chunk_rows",
        });
    }
    Ok(())
}

#[cfg(unix)]
fn ensure_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = fs::metadata(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if metadata.permissions().mode() & 0o077 != 0 {
        return Err(ConfigError::InsecurePermissions(path.to_path_buf()));
    }
    Ok(())
}

#[cfg(not(unix))]
fn ensure_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
