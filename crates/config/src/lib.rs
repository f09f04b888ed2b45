//! Configuration loading for shelf.
//!
//! Settings are layered, later layers winning:
//! 1. built-in defaults,
//! 2. a configuration file (TOML, YAML or JSON, picked by extension),
//! 3. environment variables prefixed with `SHELF_`, using `__` to separate
//!    nested keys (`SHELF_CIRCULATION__LOAN_PERIOD_DAYS=14`).
//!
//! A missing configuration file is not an error; an unreadable or malformed
//! one is.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::{OptionExt, ResultExt};
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use shelf_circulation::{CirculationPolicy, NumericIdTieBreak, SourcePolicy};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use time::Duration;
use tracing::debug;

const ENV_PREFIX: &str = "SHELF_";
const CONFIG_FILE: &str = "config.toml";
const DATABASE_FILE: &str = "shelf.sqlite";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub circulation: CirculationConfig,
    pub sources: SourcesConfig,
    pub cache: CacheConfig,
}

/// Loan and reservation lengths used when a source doesn't report them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CirculationConfig {
    pub loan_period_days: Option<u32>,
    pub reservation_period_days: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Source name to priority; unlisted sources rank at zero.
    pub priorities: BTreeMap<String, i32>,
    /// A source numbering its titles in publication order. Between two of
    /// its copies, the higher number wins.
    pub numeric_id_source: Option<String>,
}
impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            priorities: BTreeMap::new(),
            numeric_id_source: Some("Gutenberg".to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Defaults to `shelf.sqlite` in the platform's data directory.
    pub database: Option<PathBuf>,
}

impl Config {
    /// Loads configuration from the default file location.
    pub fn load() -> Result<Self> {
        let path = default_config_path()?;
        Self::load_from(&path)
    }

    /// Loads configuration from the given file, which doesn't have to exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        Self::layered(path, Env::prefixed(ENV_PREFIX))
    }

    fn layered(path: &Path, env: Env) -> Result<Self> {
        debug!(path = %path.display(), "loading configuration");
        let figment = Figment::from(Serialized::defaults(Config::default()));
        let figment = match path.extension().and_then(|extension| extension.to_str()) {
            Some("toml") => figment.merge(Toml::file(path)),
            Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
            Some("json") => figment.merge(Json::file(path)),
            _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
        };
        let config: Self = figment
            .merge(env.split("__"))
            .extract()
            .or_raise(|| ErrorKind::Invalid)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.circulation.loan_period_days == Some(0) {
            exn::bail!(ErrorKind::InvalidValue("circulation.loan_period_days"));
        }
        if self.sources.numeric_id_source.as_deref().is_some_and(str::is_empty) {
            exn::bail!(ErrorKind::InvalidValue("sources.numeric_id_source"));
        }
        Ok(())
    }

    pub fn circulation_policy(&self) -> CirculationPolicy {
        let days = |days: Option<u32>| days.map(|days| Duration::days(i64::from(days)));
        CirculationPolicy::new(
            days(self.circulation.loan_period_days),
            days(self.circulation.reservation_period_days),
        )
    }

    pub fn source_policy(&self) -> SourcePolicy {
        let priorities = self.sources.priorities.clone().into_iter().collect();
        let policy = SourcePolicy::new(priorities);
        match &self.sources.numeric_id_source {
            Some(source) => policy.with_tie_break(NumericIdTieBreak::new(source)),
            None => policy,
        }
    }

    /// The configured database path, or the default one.
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.cache.database {
            Some(path) => Ok(path.clone()),
            None => Ok(project_dirs()?.data_dir().join(DATABASE_FILE)),
        }
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", "shelf").ok_or_raise(|| ErrorKind::NoConfigDir)
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;
    use std::fs;
    use std::ops::Deref;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.circulation_policy(), CirculationPolicy::default());
    }

    #[rstest]
    #[case::toml(
        "config.toml",
        "[circulation]\nloan_period_days = 21\n\n[sources.priorities]\n\"Standard Ebooks\" = 10\n"
    )]
    #[case::yaml(
        "config.yaml",
        "circulation:\n  loan_period_days: 21\nsources:\n  priorities:\n    Standard Ebooks: 10\n"
    )]
    #[case::json(
        "config.json",
        r#"{"circulation": {"loan_period_days": 21}, "sources": {"priorities": {"Standard Ebooks": 10}}}"#
    )]
    fn reads_every_format(#[case] name: &str, #[case] contents: &str) {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&write(&dir, name, contents)).unwrap();
        assert_eq!(config.circulation.loan_period_days, Some(21));
        assert_eq!(config.circulation.reservation_period_days, None);
        assert_eq!(config.sources.priorities.get("Standard Ebooks"), Some(&10));
        // Unset sections keep their defaults.
        assert_eq!(config.sources.numeric_id_source.as_deref(), Some("Gutenberg"));

        let policy = config.source_policy();
        assert_eq!(policy.priority("Standard Ebooks"), 10);
        assert_eq!(policy.priority("Overdrive"), 0);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let dir = TempDir::new().unwrap();
        let err = Config::load_from(&write(&dir, "config.ini", "")).unwrap_err();
        assert!(matches!(err.deref(), ErrorKind::UnsupportedFormat(_)));
    }

    #[rstest]
    #[case::malformed("config.toml", "[circulation\n")]
    #[case::wrong_type("config.toml", "[circulation]\nloan_period_days = \"two weeks\"\n")]
    fn bad_files_are_invalid(#[case] name: &str, #[case] contents: &str) {
        let dir = TempDir::new().unwrap();
        let err = Config::load_from(&write(&dir, name, contents)).unwrap_err();
        assert!(matches!(err.deref(), ErrorKind::Invalid));
    }

    #[rstest]
    #[case::zero_loan_period("[circulation]\nloan_period_days = 0\n", "circulation.loan_period_days")]
    #[case::empty_source("[sources]\nnumeric_id_source = \"\"\n", "sources.numeric_id_source")]
    fn values_are_validated(#[case] contents: &str, #[case] field: &str) {
        let dir = TempDir::new().unwrap();
        let err = Config::load_from(&write(&dir, "config.toml", contents)).unwrap_err();
        assert!(matches!(err.deref(), ErrorKind::InvalidValue(name) if *name == field));
    }

    #[test]
    fn periods_become_durations() {
        let config = Config {
            circulation: CirculationConfig {
                loan_period_days: Some(14),
                reservation_period_days: Some(3),
            },
            ..Config::default()
        };
        assert_eq!(
            config.circulation_policy(),
            CirculationPolicy::new(Some(Duration::days(14)), Some(Duration::days(3)))
        );
    }

    #[test]
    fn environment_overrides_the_file() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[circulation]\nloan_period_days = 21\nreservation_period_days = 3\n")?;
            // A prefix of its own keeps this away from tests running alongside.
            jail.set_env("SHELF_JAIL_CIRCULATION__LOAN_PERIOD_DAYS", "7");
            jail.set_env("SHELF_JAIL_CACHE__DATABASE", "/var/lib/shelf/catalog.sqlite");
            let path = jail.directory().join("config.toml");
            let config = Config::layered(&path, Env::prefixed("SHELF_JAIL_")).unwrap();
            assert_eq!(config.circulation.loan_period_days, Some(7));
            assert_eq!(config.circulation.reservation_period_days, Some(3));
            assert_eq!(config.database_path().unwrap(), PathBuf::from("/var/lib/shelf/catalog.sqlite"));
            Ok(())
        });
    }
}
