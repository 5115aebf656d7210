//! Application settings.
//!
//! Loaded from the environment (and a `.env` file when present), then
//! overridden by command-line flags in `main`.

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::ValueEnum;
use relais::Locale;

/// Deployment environment. Selects the log format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Environment {
    #[default]
    #[value(alias = "dev")]
    Development,
    #[value(alias = "prod")]
    Production,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            _ => anyhow::bail!("invalid environment `{s}`, expected development or production"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    pub log_level: String,
    /// Locale every request starts with before `?culture=` is applied.
    pub default_culture: Locale,
}

impl Settings {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup; `load` passes the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_owned());

        Ok(Self {
            host: or("HOST", "0.0.0.0"),
            port: or("PORT", "3000").parse().context("invalid PORT value")?,
            environment: or("ENVIRONMENT", "development").parse()?,
            log_level: or("LOG_LEVEL", "info"),
            default_culture: match lookup("DEFAULT_CULTURE") {
                Some(tag) if !tag.trim().is_empty() => {
                    Locale::parse(&tag).context("invalid DEFAULT_CULTURE value")?
                }
                _ => Locale::invariant(),
            },
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let s = settings(&[]).unwrap();
        assert_eq!(s.addr(), "0.0.0.0:3000");
        assert_eq!(s.environment, Environment::Development);
        assert_eq!(s.log_level, "info");
        assert!(s.default_culture.is_invariant());
    }

    #[test]
    fn reads_overrides() {
        let s = settings(&[
            ("PORT", "8080"),
            ("ENVIRONMENT", "prod"),
            ("DEFAULT_CULTURE", "fr_fr"),
        ])
        .unwrap();
        assert_eq!(s.port, 8080);
        assert_eq!(s.environment, Environment::Production);
        assert_eq!(s.default_culture.tag(), "fr-FR");
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(settings(&[("PORT", "eighty")]).is_err());
        assert!(settings(&[("ENVIRONMENT", "staging")]).is_err());
        assert!(settings(&[("DEFAULT_CULTURE", "not-a-locale")]).is_err());
    }
}
