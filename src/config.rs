use std::time::Duration;

use anyhow::Context as _;

use crate::palette::DEFAULT_PRIMARY_COLOR;

pub const DEFAULT_API_BASE_URL: &str = "https://api.thilo.scouts.ch";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteConfig {
    pub api_base_url: String,
    pub primary_color: String,
    pub http_timeout: Duration,
}

impl SiteConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let api_base_url = lookup("THILO_API_BASE_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_owned());
        let primary_color = lookup("THILO_PRIMARY_COLOR")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PRIMARY_COLOR.to_owned());
        let http_timeout_secs = match lookup("THILO_HTTP_TIMEOUT_SECS") {
            Some(raw) if !raw.trim().is_empty() => raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("parse THILO_HTTP_TIMEOUT_SECS: {raw}"))?,
            _ => DEFAULT_HTTP_TIMEOUT_SECS,
        };

        Ok(Self {
            api_base_url,
            primary_color,
            http_timeout: Duration::from_secs(http_timeout_secs),
        })
    }

    /// Applies command-line overrides on top of the environment values.
    pub fn with_overrides(mut self, api_base_url: Option<&str>, primary_color: Option<&str>) -> Self {
        if let Some(url) = api_base_url {
            self.api_base_url = url.to_owned();
        }
        if let Some(color) = primary_color {
            self.primary_color = color.to_owned();
        }
        self
    }
}
