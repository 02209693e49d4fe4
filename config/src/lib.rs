//! Configuration file loading.
//!
//! The file lives at `~/.vigil/config.toml` unless `VIGIL_CONFIG` names
//! another path. A missing file means defaults everywhere.

use std::path::{Path, PathBuf};
use std::{env, fs, io};

use serde::Deserialize;

use vigil_lsp::{EngineConfig, ServerConfig};

pub const CONFIG_PATH_ENV: &str = "VIGIL_CONFIG";

#[derive(Debug, Default, Deserialize)]
pub struct VigilConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub engine: EngineConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> &PathBuf {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

/// Replace `${VAR}` with the variable's value (empty when unset).
#[must_use]
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start + 2..].find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let var = &rest[start + 2..start + 2 + len];
        if !var.is_empty() {
            out.push_str(&env::var(var).unwrap_or_default());
        }
        rest = &rest[start + 3 + len..];
    }
    out.push_str(rest);
    out
}

impl VigilConfig {
    /// Load from [`VigilConfig::path`]. `Ok(None)` when there is no file.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        let Some(path) = Self::path() else {
            return Ok(None);
        };
        if !path.exists() {
            return Ok(None);
        }
        Self::load_from(&path).map(Some)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };
        Self::parse(&content).map_err(|err| {
            tracing::warn!("Failed to parse config at {:?}: {}", path, err);
            ConfigError::Parse {
                path: path.to_path_buf(),
                source: err,
            }
        })
    }

    fn parse(content: &str) -> Result<Self, toml::de::Error> {
        let mut config: Self = toml::from_str(content)?;
        config.server.error_url_base = config
            .server
            .error_url_base
            .as_deref()
            .map(expand_env_vars);
        Ok(config)
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        match env::var_os(CONFIG_PATH_ENV) {
            Some(path) if !path.is_empty() => Some(PathBuf::from(path)),
            _ => config_path(),
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".vigil").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = VigilConfig::parse("").unwrap();
        assert_eq!(config.server, ServerConfig::default());
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[test]
    fn sections_override_defaults() {
        let config = VigilConfig::parse(
            r#"
[server]
error_url_base = "https://errors.example/"
file_extensions = ["rb"]
max_frame_bytes = 1024

[engine]
declaration_keywords = ["def"]
"#,
        )
        .unwrap();
        assert_eq!(
            config.server.error_url_base.as_deref(),
            Some("https://errors.example/")
        );
        assert_eq!(config.server.file_extensions, vec!["rb"]);
        assert_eq!(config.server.max_frame_bytes, 1024);
        assert_eq!(config.engine.declaration_keywords, vec!["def"]);
    }

    #[test]
    fn unknown_env_var_expands_to_empty() {
        assert_eq!(
            expand_env_vars("a${VIGIL_TEST_SURELY_UNSET_VAR}b"),
            "ab"
        );
        assert_eq!(expand_env_vars("no vars"), "no vars");
        assert_eq!(expand_env_vars("open ${ end"), "open ${ end");
    }

    #[test]
    fn load_from_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[server\n").unwrap();
        let err = VigilConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert_eq!(err.path(), &path);

        let missing = dir.path().join("missing.toml");
        let err = VigilConfig::load_from(&missing).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert_eq!(err.path(), &missing);
    }

    #[test]
    fn load_from_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[engine]\ndeclaration_keywords = [\"fn\"]\n").unwrap();
        let config = VigilConfig::load_from(&path).unwrap();
        assert_eq!(config.engine.declaration_keywords, vec!["fn"]);
    }
}
