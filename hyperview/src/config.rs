//! Configuration for connecting to a Hyperview instance.
//!
//! Settings come from three places, in order of precedence:
//! 1. command line flags ([`Options`])
//! 2. the process environment
//! 3. a `.env` file, which is loaded into the process environment without overriding variables
//!    that are already set

use anyhow::{Context, Error};
use clap::Args;
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use strum::{Display, EnumString};
use surf::Url;
use tracing::level_filters::LevelFilter;

/// The environment file loaded when no other file is requested.
pub const DEFAULT_ENV_FILE: &str = ".env";

/// Connection options.
#[derive(Clone, Debug, Default, Args)]
#[group(id = "config_options")]
pub struct Options {
    /// Load environment variables from PATH.
    ///
    /// If not given, `./.env` is loaded when it exists.
    #[clap(long, global = true, value_name = "PATH")]
    pub env_file: Option<PathBuf>,

    /// Base URL of the Hyperview instance [default: $INSTANCE_URL].
    #[clap(long, global = true, value_name = "URL")]
    pub instance_url: Option<String>,

    /// OAuth2 client ID [default: $CLIENT_ID].
    #[clap(long, global = true, value_name = "ID")]
    pub client_id: Option<String>,

    /// OAuth2 client secret [default: $CLIENT_SECRET].
    #[clap(long, global = true, value_name = "SECRET")]
    pub client_secret: Option<String>,

    /// OAuth2 scope to request with the access token [default: $SCOPE].
    #[clap(long, global = true)]
    pub scope: Option<String>,

    /// Log verbosity [default: $LOG_LEVEL or ERROR].
    #[clap(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

impl Options {
    /// Load the environment file selected by these options.
    pub fn load_env(&self) -> Result<(), Error> {
        load_env_file(self.env_file.as_deref())
    }

    /// The log level selected by these options or the environment.
    pub fn log_level(&self) -> Result<LogLevel, Error> {
        self.log_level_from(env_var)
    }

    /// Resolve the full configuration from these options and the environment.
    pub fn config(&self) -> Result<Config, Error> {
        Config::resolve(self, env_var)
    }

    fn log_level_from(&self, lookup: impl Fn(&str) -> Option<String>) -> Result<LogLevel, Error> {
        match self.log_level.clone().or_else(|| lookup("LOG_LEVEL")) {
            Some(name) => LogLevel::named(&name),
            None => Ok(LogLevel::default()),
        }
    }
}

/// Load environment variables from a `.env` file.
///
/// If `path` is given, the file must exist. Otherwise, [`DEFAULT_ENV_FILE`] is loaded if it
/// exists, and it is not an error if it doesn't.
pub fn load_env_file(path: Option<&Path>) -> Result<(), Error> {
    match path {
        Some(path) => {
            if !path.is_file() {
                return Err(Error::msg(format!(
                    ".env file not found at {}",
                    path.display()
                )));
            }
            dotenvy::from_path(path)
                .with_context(|| format!("unable to load {}", path.display()))?;
        }
        None => match dotenvy::from_path(DEFAULT_ENV_FILE) {
            Ok(()) => {}
            Err(err) if err.not_found() => {}
            Err(err) => {
                return Err(Error::new(err).context(format!("unable to load {DEFAULT_ENV_FILE}")))
            }
        },
    }
    Ok(())
}

/// Everything needed to authenticate with and talk to a Hyperview instance.
#[derive(Clone, Debug)]
pub struct Config {
    /// The base URL of the instance.
    ///
    /// This always ends with `/`, so that API paths can be joined onto it without discarding any
    /// path prefix the instance is served under.
    pub instance_url: Url,
    pub client_id: String,
    pub client_secret: String,
    pub scope: Option<String>,
}

impl Config {
    /// Build a configuration from command line options, falling back to `lookup` for anything
    /// not given on the command line.
    pub fn resolve(
        opt: &Options,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, Error> {
        let setting = |flag: &Option<String>, var: &str| {
            flag.clone()
                .or_else(|| lookup(var))
                .filter(|value| !value.is_empty())
        };

        let client_id =
            setting(&opt.client_id, "CLIENT_ID").ok_or_else(|| Error::msg("Client ID not set."))?;
        let client_secret = setting(&opt.client_secret, "CLIENT_SECRET")
            .ok_or_else(|| Error::msg("Client secret not set."))?;
        let instance_url = setting(&opt.instance_url, "INSTANCE_URL")
            .ok_or_else(|| Error::msg("Instance URL not set."))?;
        let scope = setting(&opt.scope, "SCOPE");

        Ok(Self {
            instance_url: parse_instance_url(&instance_url)?,
            client_id,
            client_secret,
            scope,
        })
    }
}

fn parse_instance_url(url: &str) -> Result<Url, Error> {
    let trimmed = url.trim().trim_end_matches('/');
    let parsed = Url::parse(&format!("{trimmed}/"))
        .with_context(|| format!("invalid instance URL {url}"))?;
    if parsed.cannot_be_a_base() {
        return Err(Error::msg(format!("invalid instance URL {url}")));
    }
    Ok(parsed)
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok()
}

/// Supported values of `LOG_LEVEL`.
#[derive(Clone, Copy, Debug, Default, Display, EnumString, PartialEq, Eq)]
#[strum(ascii_case_insensitive, serialize_all = "UPPERCASE")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[strum(to_string = "WARNING", serialize = "WARN")]
    Warning,
    #[default]
    Error,
    Critical,
}

impl LogLevel {
    /// Look up a log level by name, ignoring case.
    pub fn named(name: &str) -> Result<Self, Error> {
        Self::from_str(name.trim()).map_err(|_| {
            Error::msg(format!(
                "Unable to set LOG_LEVEL to {}",
                name.trim().to_uppercase()
            ))
        })
    }

    /// The most verbose level of `tracing` events enabled by this log level.
    pub fn filter(&self) -> LevelFilter {
        match self {
            Self::Trace => LevelFilter::TRACE,
            Self::Debug => LevelFilter::DEBUG,
            Self::Info => LevelFilter::INFO,
            Self::Warning => LevelFilter::WARN,
            Self::Error | Self::Critical => LevelFilter::ERROR,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_fs::prelude::*;
    use std::collections::HashMap;

    fn vars<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        let map: HashMap<_, _> = pairs.iter().copied().collect();
        move |name: &str| map.get(name).map(|value| value.to_string())
    }

    #[test]
    fn test_resolve_from_environment() {
        let lookup = vars(&[
            ("CLIENT_ID", "id"),
            ("CLIENT_SECRET", "secret"),
            ("INSTANCE_URL", "https://example.hyperviewhq.com/"),
        ]);
        let config = Config::resolve(&Options::default(), lookup).unwrap();
        assert_eq!(config.client_id, "id");
        assert_eq!(config.client_secret, "secret");
        assert_eq!(
            config.instance_url.as_str(),
            "https://example.hyperviewhq.com/"
        );
        assert_eq!(config.scope, None);
    }

    #[test]
    fn test_flags_override_environment() {
        let opt = Options {
            client_id: Some("flag-id".into()),
            instance_url: Some("http://localhost:8080/prefix".into()),
            scope: Some("HyperviewManagerApi".into()),
            ..Default::default()
        };
        let lookup = vars(&[
            ("CLIENT_ID", "env-id"),
            ("CLIENT_SECRET", "secret"),
            ("INSTANCE_URL", "https://example.hyperviewhq.com"),
        ]);
        let config = Config::resolve(&opt, lookup).unwrap();
        assert_eq!(config.client_id, "flag-id");
        assert_eq!(config.instance_url.as_str(), "http://localhost:8080/prefix/");
        assert_eq!(
            config.instance_url.join("connect/token").unwrap().as_str(),
            "http://localhost:8080/prefix/connect/token"
        );
        assert_eq!(config.scope.as_deref(), Some("HyperviewManagerApi"));
    }

    #[test]
    fn test_missing_settings() {
        let err = Config::resolve(&Options::default(), vars(&[])).unwrap_err();
        assert_eq!(err.to_string(), "Client ID not set.");

        let err = Config::resolve(
            &Options::default(),
            vars(&[("CLIENT_ID", "id"), ("CLIENT_SECRET", "")]),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Client secret not set.");

        let err = Config::resolve(
            &Options::default(),
            vars(&[("CLIENT_ID", "id"), ("CLIENT_SECRET", "secret")]),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Instance URL not set.");
    }

    #[test]
    fn test_invalid_instance_url() {
        let lookup = vars(&[
            ("CLIENT_ID", "id"),
            ("CLIENT_SECRET", "secret"),
            ("INSTANCE_URL", "not a url"),
        ]);
        assert!(Config::resolve(&Options::default(), lookup).is_err());
    }

    #[test]
    fn test_log_level() {
        assert_eq!(LogLevel::named("debug").unwrap(), LogLevel::Debug);
        assert_eq!(LogLevel::named("Warning").unwrap(), LogLevel::Warning);
        assert_eq!(LogLevel::named("WARN").unwrap(), LogLevel::Warning);
        assert_eq!(LogLevel::named("critical").unwrap().filter(), LevelFilter::ERROR);
        assert_eq!(LogLevel::Warning.to_string(), "WARNING");
        assert_eq!(
            LogLevel::named("verbose").unwrap_err().to_string(),
            "Unable to set LOG_LEVEL to VERBOSE"
        );

        let opt = Options::default();
        assert_eq!(opt.log_level_from(vars(&[])).unwrap(), LogLevel::Error);
        assert_eq!(
            opt.log_level_from(vars(&[("LOG_LEVEL", "info")])).unwrap(),
            LogLevel::Info
        );
        let opt = Options {
            log_level: Some("trace".into()),
            ..Default::default()
        };
        assert_eq!(
            opt.log_level_from(vars(&[("LOG_LEVEL", "info")])).unwrap(),
            LogLevel::Trace
        );
    }

    #[test]
    fn test_missing_env_file() {
        let dir = assert_fs::TempDir::new().unwrap();
        let path = dir.child("missing.env");
        let err = load_env_file(Some(path.path())).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!(".env file not found at {}", path.path().display())
        );
    }

    #[test]
    fn test_load_env_file() {
        let dir = assert_fs::TempDir::new().unwrap();
        let file = dir.child("test.env");
        file.write_str("HYPERVIEW_CONFIG_TEST_VAR=loaded\n").unwrap();
        load_env_file(Some(file.path())).unwrap();
        assert_eq!(env_var("HYPERVIEW_CONFIG_TEST_VAR").as_deref(), Some("loaded"));
    }

    #[test]
    fn test_env_file_does_not_override_environment() {
        env::set_var("HYPERVIEW_CONFIG_PRESET_VAR", "environment");
        let dir = assert_fs::TempDir::new().unwrap();
        let file = dir.child("test.env");
        file.write_str("HYPERVIEW_CONFIG_PRESET_VAR=file\nHYPERVIEW_CONFIG_UNSET_VAR=file\n")
            .unwrap();
        load_env_file(Some(file.path())).unwrap();
        assert_eq!(
            env_var("HYPERVIEW_CONFIG_PRESET_VAR").as_deref(),
            Some("environment")
        );
        assert_eq!(env_var("HYPERVIEW_CONFIG_UNSET_VAR").as_deref(), Some("file"));
    }
}
