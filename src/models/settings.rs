use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use chrono::{FixedOffset, Local, Offset};
use serde::{Deserialize, Serialize};

use crate::fx::RateCacheConfig;

const DEFAULT_RATE_ENDPOINT: &str = "https://open.er-api.com/v6/latest";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub base_currency: String,
    pub display_currency: String,
    pub rate_freshness_hours: u64,
    pub rate_failure_backoff_secs: u64,
    pub background_refresh_secs: u64, // 0 disables the background refresher
    pub rate_endpoint: String,
    pub utc_offset_minutes: Option<i32>, // None = host local zone
    pub database_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_currency: "USD".to_string(),
            display_currency: "USD".to_string(),
            rate_freshness_hours: 24,
            rate_failure_backoff_secs: 300,
            background_refresh_secs: 3600,
            rate_endpoint: DEFAULT_RATE_ENDPOINT.to_string(),
            utc_offset_minutes: None,
            database_path: None,
        }
    }
}

impl Settings {
    /// Load settings from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        Self::from_json(&raw)
            .with_context(|| format!("Failed to parse settings file {}", path.display()))
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let settings: Settings = serde_json::from_str(raw)?;
        Ok(settings.validate())
    }

    /// Normalize currency codes and replace unusable values with defaults.
    pub fn validate(mut self) -> Self {
        let defaults = Settings::default();

        self.base_currency = self.base_currency.trim().to_uppercase();
        if self.base_currency.is_empty() {
            self.base_currency = defaults.base_currency;
        }

        self.display_currency = self.display_currency.trim().to_uppercase();
        if self.display_currency.is_empty() {
            self.display_currency = self.base_currency.clone();
        }

        if self.rate_freshness_hours == 0 || freshness_secs(self.rate_freshness_hours).is_none() {
            log::warn!(
                "rate_freshness_hours must be positive and at most {}, using {}",
                u64::MAX / SECS_PER_HOUR,
                defaults.rate_freshness_hours
            );
            self.rate_freshness_hours = defaults.rate_freshness_hours;
        }

        if let Some(minutes) = self.utc_offset_minutes {
            if offset_from_minutes(minutes).is_none() {
                log::warn!("Ignoring out-of-range utc_offset_minutes: {}", minutes);
                self.utc_offset_minutes = None;
            }
        }

        self
    }

    pub fn rate_cache_config(&self) -> RateCacheConfig {
        RateCacheConfig {
            base_currency: self.base_currency.clone(),
            freshness: Duration::from_secs(
                freshness_secs(self.rate_freshness_hours).unwrap_or(DEFAULT_FRESHNESS_SECS),
            ),
            failure_backoff: Duration::from_secs(self.rate_failure_backoff_secs),
        }
    }

    pub fn background_refresh_interval(&self) -> Option<Duration> {
        match self.background_refresh_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Time zone used to resolve calendar days.
    pub fn time_zone(&self) -> FixedOffset {
        self.utc_offset_minutes
            .and_then(offset_from_minutes)
            .unwrap_or_else(|| Local::now().offset().fix())
    }
}

const SECS_PER_HOUR: u64 = 60 * 60;
const DEFAULT_FRESHNESS_SECS: u64 = 24 * SECS_PER_HOUR;

fn freshness_secs(hours: u64) -> Option<u64> {
    hours.checked_mul(SECS_PER_HOUR)
}

fn offset_from_minutes(minutes: i32) -> Option<FixedOffset> {
    minutes.checked_mul(60).and_then(FixedOffset::east_opt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let settings = Settings::from_json(r#"{ "display_currency": "eur" }"#).unwrap();
        assert_eq!(settings.base_currency, "USD");
        assert_eq!(settings.display_currency, "EUR");
        assert_eq!(settings.rate_freshness_hours, 24);
        assert_eq!(
            settings.rate_cache_config().freshness,
            Duration::from_secs(24 * 60 * 60)
        );
    }

    #[test]
    fn test_validate_replaces_unusable_values() {
        let settings = Settings::from_json(
            r#"{ "rate_freshness_hours": 0, "display_currency": "", "utc_offset_minutes": 100000 }"#,
        )
        .unwrap();
        assert_eq!(settings.rate_freshness_hours, 24);
        assert_eq!(settings.display_currency, "USD");
        assert_eq!(settings.utc_offset_minutes, None);
    }

    #[test]
    fn test_overflowing_durations_fall_back_to_defaults() {
        let settings = Settings::from_json(
            r#"{ "rate_freshness_hours": 18446744073709551615, "utc_offset_minutes": 2147483647 }"#,
        )
        .unwrap();
        assert_eq!(settings.rate_freshness_hours, 24);
        assert_eq!(settings.utc_offset_minutes, None);

        // Unvalidated values must not panic either
        let raw = Settings {
            rate_freshness_hours: u64::MAX,
            utc_offset_minutes: Some(i32::MIN),
            ..Settings::default()
        };
        assert_eq!(
            raw.rate_cache_config().freshness,
            Duration::from_secs(24 * 60 * 60)
        );
        assert_eq!(raw.time_zone(), Local::now().offset().fix());
    }

    #[test]
    fn test_fixed_offset_time_zone() {
        let settings = Settings::from_json(r#"{ "utc_offset_minutes": -300 }"#).unwrap();
        assert_eq!(settings.time_zone().local_minus_utc(), -300 * 60);
    }

    #[test]
    fn test_background_refresh_can_be_disabled() {
        let settings = Settings::from_json(r#"{ "background_refresh_secs": 0 }"#).unwrap();
        assert!(settings.background_refresh_interval().is_none());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "base_currency": "usd", "rate_failure_backoff_secs": 60 }}"#).unwrap();

        let settings = Settings::load(file.path()).unwrap();
        assert_eq!(settings.base_currency, "USD");
        assert_eq!(settings.rate_failure_backoff_secs, 60);
    }

    #[test]
    fn test_load_reports_missing_file() {
        let err = Settings::load(Path::new("/nonexistent/settings.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read settings file"));
    }
}
