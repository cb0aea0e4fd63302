use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::paths::resolve_home_dir;

/// Top-level application configuration: a few strongly-typed global sections
/// plus a per-module configuration bag.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Process-wide settings.
    #[serde(default)]
    pub app: AppSection,
    /// Logging configuration (optional, falls back to defaults if None).
    pub logging: Option<LoggingConfig>,
    /// Per-module configuration bag: module_name → arbitrary JSON/YAML value.
    #[serde(default)]
    pub modules: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppSection {
    /// Local data directory; normalized to an absolute path on load.
    #[serde(default)]
    pub home_dir: String,
    /// Default timeout for outgoing HTTP requests, in seconds.
    #[serde(default = "default_http_timeout_sec")]
    pub http_timeout_sec: u64,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            // Empty => $HOME/.partnerapp (or %APPDATA%/.partnerapp on Windows)
            home_dir: String::new(),
            http_timeout_sec: default_http_timeout_sec(),
        }
    }
}

fn default_http_timeout_sec() -> u64 {
    15
}

/// Logging configuration: subsystem (crate prefix) → settings.
/// Key "default" catches every target that has no explicit section.
pub type LoggingConfig = HashMap<String, Section>;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Section {
    pub console_level: String, // "trace" | "debug" | "info" | "warn" | "error" | "off"
    #[serde(default)]
    pub file: String, // relative paths resolve against app.home_dir
    #[serde(default)]
    pub file_level: String,
    #[serde(default)]
    pub max_size_mb: Option<u64>,
    #[serde(default)]
    pub max_backups: Option<usize>,
}

pub fn default_logging_config() -> LoggingConfig {
    let mut logging = HashMap::new();
    logging.insert(
        "default".to_string(),
        Section {
            console_level: "info".to_string(),
            file: "logs/partner.log".to_string(),
            file_level: "debug".to_string(),
            max_size_mb: Some(20),
            max_backups: Some(3),
        },
    );
    logging
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app: AppSection::default(),
            logging: Some(default_logging_config()),
            modules: HashMap::new(),
        }
    }
}

/// Command line arguments that can override configuration values.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config: Option<String>,
    pub home_dir: Option<String>,
    pub verbose: u8,
}

const DEFAULT_SUBDIR: &str = ".partnerapp";

impl AppConfig {
    /// Layered loading: defaults → YAML file → `APP__` environment variables.
    /// `app.home_dir` is normalized into an absolute path and created.
    pub fn load_layered<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        use figment::{
            providers::{Env, Format, Serialized, Yaml},
            Figment,
        };

        if !config_path.as_ref().is_file() {
            anyhow::bail!(
                "Config file not found: {}",
                config_path.as_ref().display()
            );
        }

        // Optional sections stay None unless YAML/ENV provide them.
        let base = AppConfig {
            app: AppSection::default(),
            logging: None,
            modules: HashMap::new(),
        };

        let figment = Figment::new()
            .merge(Serialized::defaults(base))
            .merge(Yaml::file(config_path.as_ref()))
            // APP__MODULES__PARTNER_CORE__BACKEND_URL=... maps to modules.partner_core.backend_url
            .merge(Env::prefixed("APP__").split("__"));

        let mut config: AppConfig = figment
            .extract()
            .context("Failed to extract config from figment")?;

        config.normalize_home_dir()?;
        Ok(config)
    }

    /// Load from the given file, or start from defaults when no file is given.
    pub fn load_or_default<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_layered(path),
            None => {
                let mut c = Self::default();
                c.normalize_home_dir()
                    .context("Failed to resolve app.home_dir (defaults)")?;
                Ok(c)
            }
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize config to YAML")
    }

    /// Apply command line overrides (home dir, verbosity).
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) -> Result<()> {
        if let Some(home) = &args.home_dir {
            self.app.home_dir = home.clone();
            self.normalize_home_dir()?;
        }

        let logging = self.logging.get_or_insert_with(default_logging_config);
        if let Some(default_section) = logging.get_mut("default") {
            match args.verbose {
                0 => {}
                1 => default_section.console_level = "debug".to_string(),
                _ => default_section.console_level = "trace".to_string(),
            }
        }
        Ok(())
    }

    /// Deserialize the configuration bag entry of one module.
    /// A missing entry yields `T::default()`.
    pub fn module_config<T>(&self, module_name: &str) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        match self.modules.get(module_name) {
            Some(value) => serde_json::from_value(value.clone())
                .with_context(|| format!("Invalid configuration for module '{module_name}'")),
            None => Ok(T::default()),
        }
    }

    fn normalize_home_dir(&mut self) -> Result<()> {
        let configured = Some(self.app.home_dir.clone()).filter(|h| !h.trim().is_empty());
        let resolved = resolve_home_dir(configured, DEFAULT_SUBDIR, true)
            .context("home_dir normalization failed")?;
        self.app.home_dir = resolved.to_string_lossy().to_string();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct DemoModuleConfig {
        #[serde(default)]
        url: String,
        #[serde(default)]
        retries: u32,
    }

    #[test]
    fn test_default_config_structure() {
        let config = AppConfig::default();
        assert_eq!(config.app.http_timeout_sec, 15);
        let logging = config.logging.as_ref().unwrap();
        assert_eq!(logging["default"].console_level, "info");
        assert_eq!(logging["default"].file, "logs/partner.log");
        assert!(config.modules.is_empty());
    }

    #[test]
    fn test_load_layered_reads_yaml_and_normalizes_home_dir() {
        let tmp = tempdir().unwrap();
        let home = tmp.path().join("app-home");
        let cfg_path = tmp.path().join("cfg.yaml");
        let yaml = format!(
            r#"
app:
  home_dir: "{}"
  http_timeout_sec: 3
logging:
  default:
    console_level: debug
    file: ""
modules:
  partner_core:
    url: "https://example.test"
    retries: 2
"#,
            home.to_string_lossy().replace('\\', "/")
        );
        fs::write(&cfg_path, yaml).unwrap();

        let config = AppConfig::load_layered(&cfg_path).unwrap();
        assert!(Path::new(&config.app.home_dir).is_absolute());
        assert!(home.is_dir());
        assert_eq!(config.app.http_timeout_sec, 3);
        assert_eq!(config.logging.unwrap()["default"].console_level, "debug");

        let module: DemoModuleConfig = AppConfig {
            modules: config.modules,
            ..AppConfig::default()
        }
        .module_config("partner_core")
        .unwrap();
        assert_eq!(
            module,
            DemoModuleConfig {
                url: "https://example.test".into(),
                retries: 2
            }
        );
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let tmp = tempdir().unwrap();
        let err = AppConfig::load_layered(tmp.path().join("absent.yaml")).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_missing_module_section_defaults() {
        let config = AppConfig::default();
        let module: DemoModuleConfig = config.module_config("absent").unwrap();
        assert_eq!(module, DemoModuleConfig::default());
    }

    #[test]
    fn test_invalid_module_section_is_an_error() {
        let mut config = AppConfig::default();
        config.modules.insert(
            "partner_core".into(),
            serde_json::json!({ "retries": "many" }),
        );
        let res: Result<DemoModuleConfig> = config.module_config("partner_core");
        assert!(res.is_err());
    }

    #[test]
    fn test_cli_verbose_levels() {
        for (verbose, expected) in [(0u8, "info"), (1, "debug"), (2, "trace"), (5, "trace")] {
            let mut config = AppConfig::default();
            config
                .apply_cli_overrides(&CliArgs {
                    verbose,
                    ..CliArgs::default()
                })
                .unwrap();
            let logging = config.logging.as_ref().unwrap();
            assert_eq!(logging["default"].console_level, expected);
        }
    }

    #[test]
    fn test_to_yaml_contains_sections() {
        let yaml = AppConfig::default().to_yaml().unwrap();
        assert!(yaml.contains("app:"));
        assert!(yaml.contains("logging:"));
    }
}
