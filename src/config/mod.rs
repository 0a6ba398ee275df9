use anyhow::Context;
use config::{Config, File};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

pub mod validator;

use crate::cli::Cli;
use crate::forms::{FormCatalog, TabDefinition};

pub const DEFAULT_CONFIG_FILE: &str = "loanform.toml";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub log: LogSettings,
    pub form: FormSettings,
    /// Extra tabs, declared inline or loaded from `form.schemas_dir`
    #[serde(default)]
    pub tabs: Vec<TabConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogSettings {
    /// Default `tracing` filter when `RUST_LOG` is unset
    pub level: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FormSettings {
    /// Tab opened when no `--tab` is given
    pub default_tab: String,
    /// Directory of additional tab schemas, relative to the config file
    pub schemas_dir: PathBuf,
}

/// A tab schema file: `{ name, title?, schema }`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TabConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub schema: Value,
}

impl TabConfig {
    pub fn to_definition(&self) -> Result<TabDefinition, crate::schema::SchemaError> {
        TabDefinition::from_document(&self.name, self.title.as_deref(), &self.schema)
    }
}

impl Settings {
    pub fn new() -> Result<Self, anyhow::Error> {
        Self::from_root(".")
    }

    /// Load `loanform.toml` and the tab directory below `root`.
    pub fn from_root(root: &str) -> Result<Self, anyhow::Error> {
        let config_path = Path::new(root).join(DEFAULT_CONFIG_FILE);
        Self::load(&config_path, None)
    }

    /// Create settings from CLI arguments (config file, then CLI overrides)
    pub fn new_with_cli(cli: &Cli) -> Result<Self, anyhow::Error> {
        Self::load(&cli.config, Some(cli))
    }

    fn load(config_path: &Path, cli: Option<&Cli>) -> Result<Self, anyhow::Error> {
        let root = config_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let s = Config::builder()
            .add_source(File::from(config_path.to_path_buf()).required(false))
            .set_default("log.level", "info")?
            .set_default("form.default_tab", crate::forms::LOAN_TAB)?
            .set_default("form.schemas_dir", "config/forms")?
            .build()
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let mut settings: Settings = s.try_deserialize()?;

        if let Some(cli) = cli {
            settings.apply_cli_overrides(cli);
        }

        let schemas_dir = root.join(&settings.form.schemas_dir);
        settings.load_tabs_from_dir(&schemas_dir)?;

        validator::SettingsValidator::validate(&settings).map_err(|errors| {
            let error_messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            anyhow::anyhow!(
                "Configuration validation failed:\n{}",
                error_messages.join("\n")
            )
        })?;

        Ok(settings)
    }

    fn apply_cli_overrides(&mut self, cli: &Cli) {
        if let Some(level) = &cli.log_level {
            self.log.level = level.clone();
        }
        if let Some(dir) = &cli.schemas_dir {
            self.form.schemas_dir = dir.clone();
        }
    }

    fn load_tabs_from_dir(&mut self, dir: &Path) -> Result<(), anyhow::Error> {
        if !dir.is_dir() {
            tracing::debug!("No tab directory at {}", dir.display());
            return Ok(());
        }

        let pattern = format!("{}/*", dir.display());
        for entry in glob::glob(&pattern)? {
            match entry {
                Ok(path) => {
                    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
                        continue;
                    };
                    if !matches!(ext, "json" | "yaml" | "yml" | "toml") {
                        tracing::warn!("Skipping {}: unknown tab file format", path.display());
                        continue;
                    }
                    let content = std::fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    let tab: TabConfig = match ext {
                        "json" => serde_json::from_str(&content)?,
                        "toml" => toml::from_str(&content)?,
                        _ => serde_yaml::from_str(&content)?,
                    };
                    tracing::info!("Loaded tab '{}' from {}", tab.name, path.display());
                    self.tabs.push(tab);
                }
                Err(e) => tracing::warn!("Failed to read glob entry: {}", e),
            }
        }
        Ok(())
    }

    /// Built-in tabs followed by configured ones. A configured tab with a
    /// built-in name replaces it.
    pub fn catalog(&self) -> Result<FormCatalog, anyhow::Error> {
        let mut catalog = FormCatalog::builtin()?;
        for tab in &self.tabs {
            let definition = tab
                .to_definition()
                .with_context(|| format!("Invalid schema for tab '{}'", tab.name))?;
            catalog.register(definition);
        }
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let settings = Settings::from_root(temp_dir.path().to_str().unwrap()).unwrap();

        assert_eq!(settings.log.level, "info");
        assert_eq!(settings.form.default_tab, "loan");
        assert_eq!(settings.form.schemas_dir, PathBuf::from("config/forms"));
        assert!(settings.tabs.is_empty());
    }

    #[test]
    fn test_cli_overrides_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("loanform.toml");
        fs::write(&config_path, "[log]\nlevel = \"warn\"\n").unwrap();

        let cli = Cli::parse_from([
            "loanform",
            "--config",
            config_path.to_str().unwrap(),
            "--log-level",
            "debug",
            "tabs",
        ]);
        let settings = Settings::new_with_cli(&cli).unwrap();
        assert_eq!(settings.log.level, "debug");
    }

    #[test]
    fn test_catalog_includes_configured_tabs() {
        let temp_dir = TempDir::new().unwrap();
        let forms = temp_dir.path().join("config/forms");
        fs::create_dir_all(&forms).unwrap();
        fs::write(
            forms.join("kyc.json"),
            r#"{"name": "kyc", "schema": {"type": "object", "title": "KYC", "properties": {"pan": {"type": "string"}}}}"#,
        )
        .unwrap();

        let settings = Settings::from_root(temp_dir.path().to_str().unwrap()).unwrap();
        let catalog = settings.catalog().unwrap();
        assert_eq!(catalog.names().collect::<Vec<_>>(), vec!["business", "loan", "kyc"]);
        assert_eq!(catalog.get("kyc").unwrap().title(), "KYC");
    }
}
