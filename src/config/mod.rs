//! Application configuration management

use std::collections::HashSet;
use std::env;
use std::time::Duration;

use crate::audit::{AuditSettings, ThresholdTable};
use crate::error::{AuditError, Result};
use crate::services::tmdb::DEFAULT_TMDB_URL;

pub const DEFAULT_PLEX_URL: &str = "https://127.0.0.1:32400";

/// Connection settings for the Plex server
#[derive(Debug, Clone)]
pub struct PlexConfig {
    /// Server base URL
    pub url: String,

    /// X-Plex-Token
    pub token: String,

    /// Library section id holding movies
    pub movie_section: String,

    /// Library section id holding TV shows
    pub tv_section: String,

    /// Accept self-signed certificates from the local server
    pub accept_invalid_certs: bool,
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub plex: PlexConfig,

    /// TMDB v4 read access token (only required for the season audit)
    pub tmdb_token: Option<String>,

    /// TMDB API base URL
    pub tmdb_url: String,

    /// Show titles excluded from the season audit
    pub exclusions: HashSet<String>,

    /// Pause before each TMDB lookup
    pub lookup_delay: Duration,

    /// Minimum bitrate per resolution
    pub thresholds: ThresholdTable,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key/value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let token = var("PLEX_API_TOKEN")
            .ok_or_else(|| AuditError::config("PLEX_API_TOKEN", "not set"))?;

        let plex = PlexConfig {
            url: var("PLEX_URL").unwrap_or_else(|| DEFAULT_PLEX_URL.to_string()),
            token,
            movie_section: var("PLEX_MOVIE_SECTION").unwrap_or_else(|| "4".to_string()),
            tv_section: var("PLEX_TV_SECTION").unwrap_or_else(|| "5".to_string()),
            accept_invalid_certs: match var("PLEX_ACCEPT_INVALID_CERTS") {
                Some(v) => parse_bool("PLEX_ACCEPT_INVALID_CERTS", &v)?,
                None => true,
            },
        };

        let lookup_delay = match var("AUDIT_LOOKUP_DELAY_MS") {
            Some(v) => Duration::from_millis(v.trim().parse().map_err(|_| {
                AuditError::config("AUDIT_LOOKUP_DELAY_MS", format!("'{v}' is not a number"))
            })?),
            None => Duration::from_millis(1000),
        };

        let thresholds = match var("BITRATE_THRESHOLDS") {
            Some(v) => ThresholdTable::parse(&v)?,
            None => ThresholdTable::default(),
        };

        Ok(Self {
            plex,
            tmdb_token: var("TMDB_API_TOKEN"),
            tmdb_url: var("TMDB_URL").unwrap_or_else(|| DEFAULT_TMDB_URL.to_string()),
            exclusions: var("NOOP_TITLES")
                .map(|v| parse_exclusions(&v))
                .unwrap_or_default(),
            lookup_delay,
            thresholds,
        })
    }

    /// TMDB token, or a configuration error naming the variable
    pub fn require_tmdb_token(&self) -> Result<&str> {
        self.tmdb_token
            .as_deref()
            .ok_or_else(|| AuditError::config("TMDB_API_TOKEN", "required for the season audit"))
    }

    pub fn audit_settings(&self) -> AuditSettings {
        AuditSettings {
            exclusions: self.exclusions.clone(),
            lookup_delay: self.lookup_delay,
            thresholds: self.thresholds.clone(),
        }
    }
}

fn parse_exclusions(raw: &str) -> HashSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(AuditError::config(key, format!("'{other}' is not a boolean"))),
    }
}
