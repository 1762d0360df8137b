use serde_derive::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Connection and paging settings for the Graph API client.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Settings {
    pub base_url: String,
    pub api_version: String,
    pub page_size: u32,
    pub retries: u32,
    pub retry_delay: Duration,
    pub rate_limit_delay: Duration,
}

impl Settings {
    pub const DEFAULT_BASE_URL: &'static str = "https://graph.facebook.com";
    pub const DEFAULT_API_VERSION: &'static str = "v19.0";
    pub const DEFAULT_PAGE_SIZE: u32 = 100;
    pub const DEFAULT_RETRIES: u32 = 3;
    const DEFAULT_RETRY_DELAY_MILLIS: u64 = 500;
    const DEFAULT_RATE_LIMIT_DELAY_SECS: u64 = 60;
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            api_version: Self::DEFAULT_API_VERSION.to_string(),
            page_size: Self::DEFAULT_PAGE_SIZE,
            retries: Self::DEFAULT_RETRIES,
            retry_delay: Duration::from_millis(Self::DEFAULT_RETRY_DELAY_MILLIS),
            rate_limit_delay: Duration::from_secs(Self::DEFAULT_RATE_LIMIT_DELAY_SECS),
        }
    }
}

#[derive(Debug, Deserialize, Eq, PartialEq)]
pub struct Config {
    facebook: FacebookConfig,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> super::Result<Config> {
        let contents = fs::read_to_string(path)?;

        Ok(toml::from_str::<Config>(&contents)?)
    }

    pub fn access_token(&self) -> Option<&str> {
        self.facebook.access_token.as_deref()
    }

    pub fn settings(&self) -> Settings {
        self.facebook.settings()
    }
}

#[derive(Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
struct FacebookConfig {
    access_token: Option<String>,
    api_version: Option<String>,
    base_url: Option<String>,
    page_size: Option<u32>,
    retries: Option<u32>,
    retry_delay_millis: Option<u64>,
    rate_limit_delay_secs: Option<u64>,
}

impl FacebookConfig {
    fn settings(&self) -> Settings {
        let defaults = Settings::default();

        Settings {
            base_url: self.base_url.clone().unwrap_or(defaults.base_url),
            api_version: self.api_version.clone().unwrap_or(defaults.api_version),
            page_size: self.page_size.unwrap_or(defaults.page_size),
            retries: self.retries.unwrap_or(defaults.retries),
            retry_delay: self
                .retry_delay_millis
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_delay),
            rate_limit_delay: self
                .rate_limit_delay_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.rate_limit_delay),
        }
    }
}
