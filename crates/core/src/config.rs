use std::{path::PathBuf, time::Duration};

use reqwest::Url;
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "http://localhost:5000";
/// Limits only establishing the connection. Uploads and analyses run to completion.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{var} is not a valid URL: {value}")]
    InvalidUrl { var: &'static str, value: String },

    #[error("{var} must be a whole number of seconds (0 for none), got `{value}`")]
    InvalidTimeout { var: &'static str, value: String },

    #[error("{var} must be `include` or `omit`, got `{value}`")]
    InvalidCredentials { var: &'static str, value: String },
}

/// Whether cookies travel with a request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Credentials {
    #[default]
    Include,
    Omit,
}

impl Credentials {
    fn parse(var: &'static str, value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "include" | "true" | "1" => Ok(Credentials::Include),
            "omit" | "false" | "0" => Ok(Credentials::Omit),
            _ => Err(ConfigError::InvalidCredentials {
                var,
                value: value.to_string(),
            }),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub base_url: Url,
    /// Total limit per request, opt-in. `None` lets a long analysis finish.
    pub timeout: Option<Duration>,
    /// Default for requests that don't say otherwise.
    pub credentials: Credentials,
    pub download_dir: PathBuf,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_url("base_url", base_url)?,
            timeout: None,
            credentials: Credentials::default(),
            download_dir: default_download_dir(),
        })
    }

    /// KINOSCOPE_API_URL, KINOSCOPE_TIMEOUT_SECS, KINOSCOPE_CREDENTIALS, KINOSCOPE_DOWNLOAD_DIR.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = match lookup("KINOSCOPE_API_URL") {
            Some(value) => parse_url("KINOSCOPE_API_URL", &value)?,
            None => parse_url("KINOSCOPE_API_URL", DEFAULT_API_URL)?,
        };

        let timeout = match lookup("KINOSCOPE_TIMEOUT_SECS") {
            Some(value) => match value.trim().parse::<u64>() {
                Ok(0) => None,
                Ok(secs) => Some(Duration::from_secs(secs)),
                Err(_) => {
                    return Err(ConfigError::InvalidTimeout {
                        var: "KINOSCOPE_TIMEOUT_SECS",
                        value,
                    });
                }
            },
            None => None,
        };

        let credentials = match lookup("KINOSCOPE_CREDENTIALS") {
            Some(value) => Credentials::parse("KINOSCOPE_CREDENTIALS", &value)?,
            None => Credentials::default(),
        };

        let download_dir = lookup("KINOSCOPE_DOWNLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_download_dir);

        Ok(Self {
            base_url,
            timeout,
            credentials,
            download_dir,
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, ConfigError> {
        self.base_url = parse_url("--api-url", base_url)?;
        Ok(self)
    }
}

fn parse_url(var: &'static str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value.trim()).map_err(|_| ConfigError::InvalidUrl {
        var,
        value: value.to_string(),
    })?;

    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl {
            var,
            value: value.to_string(),
        });
    }

    Ok(url)
}

pub fn default_download_dir() -> PathBuf {
    dirs::download_dir().unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.base_url.as_str(), "http://localhost:5000/");
        assert_eq!(config.timeout, None);
        assert_eq!(config.credentials, Credentials::Include);
    }

    #[test]
    fn reads_every_variable() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("KINOSCOPE_API_URL", "https://analysis.example.com/api"),
            ("KINOSCOPE_TIMEOUT_SECS", "30"),
            ("KINOSCOPE_CREDENTIALS", "omit"),
            ("KINOSCOPE_DOWNLOAD_DIR", "/tmp/out"),
        ]))
        .unwrap();

        assert_eq!(config.base_url.as_str(), "https://analysis.example.com/api");
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.credentials, Credentials::Omit);
        assert_eq!(config.download_dir, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn zero_timeout_means_none() {
        let config =
            ClientConfig::from_lookup(lookup(&[("KINOSCOPE_TIMEOUT_SECS", "0")])).unwrap();
        assert_eq!(config.timeout, None);
        assert_eq!(ClientConfig::new("http://localhost:5000").unwrap().timeout, None);
    }

    #[test]
    fn rejects_bad_values_naming_the_variable() {
        let err = ClientConfig::from_lookup(lookup(&[("KINOSCOPE_API_URL", "ftp://x")]))
            .unwrap_err();
        assert!(err.to_string().contains("KINOSCOPE_API_URL"));

        let err = ClientConfig::from_lookup(lookup(&[("KINOSCOPE_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTimeout { .. }));

        let err = ClientConfig::from_lookup(lookup(&[("KINOSCOPE_CREDENTIALS", "maybe")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCredentials { .. }));
    }
}
