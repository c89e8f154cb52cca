//! Client settings.
//!
//! Sources, later ones overriding earlier ones:
//!
//! 1. compiled defaults
//! 2. `ledgerbook.toml` in the working directory, if present
//! 3. `LEDGERBOOK_*` environment variables, `__` between sections
//!    (`LEDGERBOOK_API__BASE_URL`, `LEDGERBOOK_SESSION__TTL_SECS`)
//!
//! A `.env` file is loaded into the environment first.

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment, File, FileFormat};
use ledger::config::ViewConfig;
use ledger::LedgerConfig;
use serde::Deserialize;

const ENV_PREFIX: &str = "LEDGERBOOK";

#[derive(Clone, Debug, Deserialize)]
pub struct ApiSettings {
    pub base_url: String,
    pub records_path: String,
    pub identities_path: String,
    pub timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3001".into(),
            records_path: "records".into(),
            identities_path: "identities".into(),
            timeout_secs: 30,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct SessionSettings {
    pub ttl_secs: u64,
    /// Where the session files live. Defaults to the platform data directory.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            ttl_secs: 1800,
            data_dir: None,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub view: ViewConfig,
}

impl Settings {
    /// Load from `ledgerbook.toml` and the environment.
    pub fn new() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::build(Path::new(LedgerConfig::filename()), ENV_PREFIX)
    }

    /// Load from an explicit file, still honouring the environment.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Self::build(path, ENV_PREFIX)
    }

    fn build(file: &Path, env_prefix: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("api.base_url", "http://localhost:3001")?
            .set_default("api.records_path", "records")?
            .set_default("api.identities_path", "identities")?
            .set_default("api.timeout_secs", 30)?
            .set_default("session.ttl_secs", 1800)?
            .set_default("view.page_size", 5)?
            .set_default("view.currency_symbol", "R$")?
            .add_source(
                File::from(file)
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                Environment::with_prefix(env_prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.session.ttl_secs.max(1))
    }

    pub fn data_dir(&self) -> PathBuf {
        self.session.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("ledgerbook")
        })
    }

    pub fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            view: self.view.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::build(&dir.path().join("missing.toml"), "LEDGERBOOK_UNSET").unwrap();
        assert_eq!(settings.api.base_url, "http://localhost:3001");
        assert_eq!(settings.api.records_path, "records");
        assert_eq!(settings.ttl(), Duration::from_secs(1800));
        assert_eq!(settings.view.page_size, 5);
        assert!(settings.data_dir().ends_with("ledgerbook"));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledgerbook.toml");
        std::fs::write(
            &path,
            "[api]\nbase_url = \"https://ledger.example\"\n\n[session]\nttl_secs = 60\ndata_dir = \"/tmp/lb\"\n\n[view]\npage_size = 10\n",
        )
        .unwrap();
        let settings = Settings::build(&path, "LEDGERBOOK_UNSET").unwrap();
        assert_eq!(settings.api.base_url, "https://ledger.example");
        assert_eq!(settings.api.identities_path, "identities");
        assert_eq!(settings.ttl(), Duration::from_secs(60));
        assert_eq!(settings.data_dir(), PathBuf::from("/tmp/lb"));
        assert_eq!(settings.ledger_config().page_size(), 10);
        assert_eq!(settings.view.currency_symbol, "R$");
    }

    #[test]
    fn test_environment_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var("LEDGERBOOK_ENVTEST_SESSION__TTL_SECS", "90");
        let settings = Settings::build(&dir.path().join("none.toml"), "LEDGERBOOK_ENVTEST").unwrap();
        assert_eq!(settings.session.ttl_secs, 90);
    }
}
