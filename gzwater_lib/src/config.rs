//! Host configuration: credentials, session cookie, cadence and timeouts.
//!
//! Values come from an optional TOML file and are then overridden by
//! `GZWATER_*` environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use gzwater_api::{Endpoints, Session, DEFAULT_BASE_URL};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::context::{Credentials, Timeouts};

/// Default polling cadence: once a day.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 86_400;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
const DEFAULT_ALTERNATE_TIMEOUT_SECS: u64 = 10;
const DEFAULT_OVERALL_TIMEOUT_SECS: u64 = 120;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Missing required setting: {0}")]
    Missing(&'static str),
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// On-disk shape of the config file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    account_id: Option<String>,
    password: Option<String>,
    session_cookie: Option<String>,
    base_url: Option<String>,
    user_agent: Option<String>,
    referer: Option<String>,
    poll_interval_secs: Option<u64>,
    request_timeout_secs: Option<u64>,
    alternate_timeout_secs: Option<u64>,
    overall_timeout_secs: Option<u64>,
}

/// Resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub account_id: Option<String>,
    pub password: Option<SecretString>,
    /// Cookie of an existing portal session, if the host has one.
    pub session_cookie: Option<SecretString>,
    pub base_url: String,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub poll_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub alternate_timeout_secs: u64,
    pub overall_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            account_id: None,
            password: None,
            session_cookie: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: None,
            referer: None,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            alternate_timeout_secs: DEFAULT_ALTERNATE_TIMEOUT_SECS,
            overall_timeout_secs: DEFAULT_OVERALL_TIMEOUT_SECS,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_secs(field: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse().map_err(|e| ConfigError::Invalid {
        field,
        reason: format!("{:?} is not a number of seconds: {}", raw, e),
    })
}

impl Config {
    /// Loads the file at `path` (if any), applies environment overrides and validates.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let content =
                    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                        path: path.to_path_buf(),
                        source,
                    })?;
                Self::from_toml_str(&content)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML document on top of the defaults. Does not validate.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let file: FileConfig = toml::from_str(content)?;
        let defaults = Self::default();
        Ok(Self {
            account_id: non_empty(file.account_id),
            password: non_empty(file.password).map(SecretString::from),
            session_cookie: non_empty(file.session_cookie).map(SecretString::from),
            base_url: non_empty(file.base_url).unwrap_or(defaults.base_url),
            user_agent: non_empty(file.user_agent),
            referer: non_empty(file.referer),
            poll_interval_secs: file.poll_interval_secs.unwrap_or(defaults.poll_interval_secs),
            request_timeout_secs: file
                .request_timeout_secs
                .unwrap_or(defaults.request_timeout_secs),
            alternate_timeout_secs: file
                .alternate_timeout_secs
                .unwrap_or(defaults.alternate_timeout_secs),
            overall_timeout_secs: file
                .overall_timeout_secs
                .unwrap_or(defaults.overall_timeout_secs),
        })
    }

    /// Overrides settings from `GZWATER_*` variables, read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| non_empty(lookup(key));

        if let Some(v) = get("GZWATER_ACCOUNT_ID") {
            self.account_id = Some(v);
        }
        if let Some(v) = get("GZWATER_PASSWORD") {
            self.password = Some(SecretString::from(v));
        }
        if let Some(v) = get("GZWATER_SESSION_COOKIE") {
            self.session_cookie = Some(SecretString::from(v));
        }
        if let Some(v) = get("GZWATER_BASE_URL") {
            self.base_url = v;
        }
        if let Some(v) = get("GZWATER_POLL_INTERVAL_SECS") {
            self.poll_interval_secs = parse_secs("poll_interval_secs", &v)?;
        }
        if let Some(v) = get("GZWATER_REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = parse_secs("request_timeout_secs", &v)?;
        }
        if let Some(v) = get("GZWATER_ALTERNATE_TIMEOUT_SECS") {
            self.alternate_timeout_secs = parse_secs("alternate_timeout_secs", &v)?;
        }
        if let Some(v) = get("GZWATER_OVERALL_TIMEOUT_SECS") {
            self.overall_timeout_secs = parse_secs("overall_timeout_secs", &v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.account_id.is_none() {
            return Err(ConfigError::Missing("account_id"));
        }
        if self.password.is_none() {
            return Err(ConfigError::Missing("password"));
        }
        for (field, value) in [
            ("poll_interval_secs", self.poll_interval_secs),
            ("request_timeout_secs", self.request_timeout_secs),
            ("alternate_timeout_secs", self.alternate_timeout_secs),
            ("overall_timeout_secs", self.overall_timeout_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be greater than zero".to_string(),
                });
            }
        }
        Url::parse(&self.base_url).map_err(|e| ConfigError::Invalid {
            field: "base_url",
            reason: e.to_string(),
        })?;
        Ok(())
    }

    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        let account_id = self
            .account_id
            .as_ref()
            .ok_or(ConfigError::Missing("account_id"))?;
        let password = self
            .password
            .as_ref()
            .ok_or(ConfigError::Missing("password"))?;
        Ok(Credentials::new(
            account_id.clone(),
            password.expose_secret().to_string(),
        ))
    }

    pub fn session(&self) -> Session {
        let cookie = self
            .session_cookie
            .as_ref()
            .map(|c| c.expose_secret().to_string());
        let mut session = Session::new(cookie);
        if let Some(ua) = &self.user_agent {
            session = session.with_user_agent(ua.clone());
        }
        if let Some(referer) = &self.referer {
            session = session.with_referer(referer.clone());
        }
        session
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints::with_base_url(&self.base_url)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            primary: Duration::from_secs(self.request_timeout_secs),
            alternate: Duration::from_secs(self.alternate_timeout_secs),
        }
    }

    pub fn overall_timeout(&self) -> Duration {
        Duration::from_secs(self.overall_timeout_secs)
    }
}
