#![forbid(unsafe_code)]

//! Scenario configuration for the clock simulator.
//!
//! ```toml
//! [clock]
//! start_unix_ms = 0
//!
//! [[timers]]
//! name = "request-timeout"
//! after_ms = 5000
//!
//! [[tickers]]
//! name = "heartbeat"
//! period_ms = 2000
//!
//! [[steps]]
//! label = "warm up"
//! advance_ms = 4000
//! ```

mod clock;
mod error;
mod model;

pub use clock::ClockSettings;
pub use error::Error;
pub use model::{Step, TickerSpec, TimerSpec};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Environment variables with this prefix override file values, nested keys
/// separated by `__` (`CLOCKWORK_CLOCK__START_UNIX_MS=0`).
pub const ENV_PREFIX: &str = "CLOCKWORK_";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub clock: ClockSettings,
    pub timers: Vec<TimerSpec>,
    pub tickers: Vec<TickerSpec>,
    pub steps: Vec<Step>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the config from a TOML file, layered over the defaults and
    /// under the environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::InvalidPath(path.to_owned()));
        }

        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(input: &str) -> Result<Self, Error> {
        let config: Self = toml_edit::de::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, Error> {
        Ok(toml_edit::ser::to_string_pretty(self)?)
    }

    /// Checks what the clock would otherwise reject at runtime: ticker
    /// periods must be positive and names must be unique.
    pub fn validate(&self) -> Result<(), Error> {
        if let Some(ticker) = self.tickers.iter().find(|t| t.period.is_zero()) {
            return Err(Error::InvalidPeriod {
                name: ticker.name.clone(),
            });
        }

        let mut seen = HashSet::new();
        let names = self
            .timers
            .iter()
            .map(|t| &t.name)
            .chain(self.tickers.iter().map(|t| &t.name));
        for name in names {
            if !seen.insert(name) {
                return Err(Error::DuplicateName(name.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use pretty_assertions::assert_eq;
    use std::time::{Duration, UNIX_EPOCH};

    fn load(path: &str) -> figment::error::Result<Config> {
        Config::load(path).map_err(|e| e.to_string().into())
    }

    const SCENARIO: &str = r#"
        [clock]
        start_unix_ms = 1000

        [[timers]]
        name = "a"
        after_ms = 5000

        [[timers]]
        name = "b"
        after_ms = 3000

        [[tickers]]
        name = "tick"
        period_ms = 2000

        [[steps]]
        label = "first"
        advance_ms = 4000

        [[steps]]
        advance_ms = 2000
    "#;

    fn expected() -> Config {
        Config {
            clock: ClockSettings {
                start: Some(UNIX_EPOCH + Duration::from_secs(1)),
            },
            timers: vec![
                TimerSpec {
                    name: "a".into(),
                    after: Duration::from_secs(5),
                },
                TimerSpec {
                    name: "b".into(),
                    after: Duration::from_secs(3),
                },
            ],
            tickers: vec![TickerSpec {
                name: "tick".into(),
                period: Duration::from_secs(2),
            }],
            steps: vec![
                Step {
                    label: Some("first".into()),
                    advance: Duration::from_secs(4),
                },
                Step::new(Duration::from_secs(2)),
            ],
        }
    }

    #[test]
    fn parses_scenario() {
        assert_eq!(Config::from_toml_str(SCENARIO).unwrap(), expected());
    }

    // `Jail` serializes the tests that read `CLOCKWORK_*` variables.
    #[test]
    fn loads_scenario_file() {
        Jail::expect_with(|jail| {
            jail.create_file("scenario.toml", SCENARIO)?;

            assert_eq!(load("scenario.toml")?, expected());
            Ok(())
        });
    }

    #[test]
    fn env_overrides_file_values() {
        Jail::expect_with(|jail| {
            jail.create_file("scenario.toml", SCENARIO)?;
            jail.set_env("CLOCKWORK_CLOCK__START_UNIX_MS", 42);

            let config = load("scenario.toml")?;

            assert_eq!(
                config.clock.start,
                Some(UNIX_EPOCH + Duration::from_millis(42))
            );
            assert_eq!(config.timers, expected().timers);
            Ok(())
        });
    }

    #[test]
    fn missing_file_is_invalid_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");

        assert!(matches!(Config::load(&missing), Err(Error::InvalidPath(p)) if p == missing));
    }

    #[test]
    fn empty_file_yields_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file("empty.toml", "")?;

            let config = load("empty.toml")?;

            assert_eq!(config, Config::new());
            assert_eq!(config.clock.start, None);
            Ok(())
        });
    }

    #[test]
    fn zero_period_ticker_is_rejected() {
        let input = r#"
            [[tickers]]
            name = "broken"
            period_ms = 0
        "#;

        assert!(matches!(
            Config::from_toml_str(input),
            Err(Error::InvalidPeriod { name }) if name == "broken"
        ));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let input = r#"
            [[timers]]
            name = "x"
            after_ms = 1

            [[tickers]]
            name = "x"
            period_ms = 1
        "#;

        assert!(matches!(
            Config::from_toml_str(input),
            Err(Error::DuplicateName(name)) if name == "x"
        ));
    }

    #[test]
    fn rendered_toml_parses_back() {
        let rendered = expected().to_toml().unwrap();

        assert_eq!(Config::from_toml_str(&rendered).unwrap(), expected());
    }
}
