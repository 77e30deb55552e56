//! CLI configuration and settings management

use std::path::{Path, PathBuf};

use bx_lower::options::{DEFAULT_RUNTIME_CLASS, DEFAULT_RUNTIME_PACKAGE};
use bx_lower::ResolverKind;
use serde::{Deserialize, Serialize};

use crate::{CliError, Result};

pub const CONFIG_FILE_NAME: &str = "bxc.toml";
pub const HOME_CONFIG_FILE_NAME: &str = ".bxc.toml";

/// CLI configuration loaded from `bxc.toml`. Every table and key is optional;
/// missing entries keep their defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Transpile settings
    pub transpile: TranspileConfig,

    /// Runtime-support class the generated code calls into
    pub runtime: RuntimeConfig,

    /// Parser settings
    pub parse: ParseConfig,

    /// Diagnostic rendering
    pub diagnostics: DiagnosticsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranspileConfig {
    /// Package declared by every generated file
    pub package: Option<String>,

    /// Directory `.java` files are written to; stdout when unset
    pub output_dir: Option<PathBuf>,

    /// `dynamic`, `static` or `strict`
    pub resolver: String,

    /// Print Javadoc from `hint` attributes
    pub pretty: bool,

    /// Nesting bound for lowering
    pub max_depth: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub package: String,
    pub class: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseConfig {
    /// Nesting bound for the parser
    pub max_depth: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticStyle {
    /// miette graphical reports
    #[default]
    Fancy,
    /// One `file:line:col: level: message` line each
    Plain,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub style: DiagnosticStyle,
}

impl Default for TranspileConfig {
    fn default() -> Self {
        let lower = bx_lower::LowerOptions::default();
        Self {
            package: None,
            output_dir: None,
            resolver: "dynamic".to_string(),
            pretty: false,
            max_depth: lower.max_depth,
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            package: DEFAULT_RUNTIME_PACKAGE.to_string(),
            class: DEFAULT_RUNTIME_CLASS.to_string(),
        }
    }
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            max_depth: bx_lang::ParseOptions::default().max_depth,
        }
    }
}

impl CliConfig {
    /// Load configuration from `config_path`, else the first of `./bxc.toml`
    /// and `~/.bxc.toml` that exists, else defaults.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }
        for candidate in Self::search_paths() {
            if candidate.is_file() {
                tracing::debug!(path = %candidate.display(), "loading config");
                return Self::load_from_file(&candidate);
            }
        }
        Ok(Self::default())
    }

    /// Candidate locations in lookup order.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
        if let Some(home_dir) = dirs::home_dir() {
            paths.push(home_dir.join(HOME_CONFIG_FILE_NAME));
        }
        paths
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content).map_err(|e| match e {
            CliError::Config(message) => {
                CliError::Config(format!("{}: {}", path.display(), message))
            }
            other => other,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| CliError::Config(format!("Failed to parse config: {}", e)))?;
        config.resolver_kind()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| CliError::Config(format!("Failed to serialize config: {}", e)))?;
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                CliError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }
        std::fs::write(path, content)
            .map_err(|e| CliError::Config(format!("Failed to write config file: {}", e)))?;
        Ok(())
    }

    pub fn resolver_kind(&self) -> Result<ResolverKind> {
        ResolverKind::from_name(&self.transpile.resolver).ok_or_else(|| {
            CliError::Config(format!(
                "unknown resolver `{}` (expected dynamic, static or strict)",
                self.transpile.resolver
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = CliConfig::from_toml(
            r#"
[transpile]
package = "app.views"

[diagnostics]
style = "plain"
"#,
        )
        .unwrap();
        assert_eq!(config.transpile.package.as_deref(), Some("app.views"));
        assert_eq!(config.transpile.resolver, "dynamic");
        assert_eq!(config.runtime, RuntimeConfig::default());
        assert_eq!(config.diagnostics.style, DiagnosticStyle::Plain);
    }

    #[test]
    fn empty_file_is_default() {
        assert_eq!(CliConfig::from_toml("").unwrap(), CliConfig::default());
    }

    #[test]
    fn unknown_resolver_is_rejected() {
        let err = CliConfig::from_toml("[transpile]\nresolver = \"magic\"\n").unwrap_err();
        assert!(err.to_string().contains("unknown resolver `magic`"));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);
        let mut config = CliConfig::default();
        config.transpile.pretty = true;
        config.runtime.class = "Rt".to_string();
        config.save_to_file(&path).unwrap();
        assert_eq!(CliConfig::load(Some(&path)).unwrap(), config);
    }
}
