// ⚙️ Configuration - TOML file + environment overrides
//
// Every field has a default so an empty (or missing) file still boots the site.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_CONFIG: &str = "WEDDING_CONFIG";
pub const ENV_DB: &str = "WEDDING_DB";
pub const ENV_BIND: &str = "WEDDING_BIND";
pub const ENV_ADMIN_PASSWORD: &str = "WEDDING_ADMIN_PASSWORD_SHA256";

/// Longest admin session accepted (one year)
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 365;
/// Longest forecast cache accepted (one week)
pub const MAX_CACHE_TTL_MINUTES: i64 = 60 * 24 * 7;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub event: EventConfig,
    #[serde(default)]
    pub weather: WeatherConfig,
    #[serde(default)]
    pub admin: AdminConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Directory served under /static
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            static_dir: default_static_dir(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventConfig {
    #[serde(default = "default_couple")]
    pub couple: String,
    #[serde(default = "default_event_date")]
    pub date: NaiveDate,
    #[serde(default)]
    pub venue: String,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    /// IANA zone passed to the forecast API
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            couple: default_couple(),
            date: default_event_date(),
            venue: String::new(),
            latitude: 0.0,
            longitude: 0.0,
            timezone: default_timezone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherConfig {
    #[serde(default = "default_weather_url")]
    pub base_url: String,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_minutes: i64,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: default_weather_url(),
            cache_ttl_minutes: default_cache_ttl(),
            timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminConfig {
    /// SHA-256 hex digest of the admin password; empty disables admin login
    #[serde(default)]
    pub password_sha256: String,
    #[serde(default = "default_session_ttl")]
    pub session_ttl_hours: i64,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            password_sha256: String::new(),
            session_ttl_hours: default_session_ttl(),
            cookie_name: default_cookie_name(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("web")
}

fn default_db_path() -> PathBuf {
    PathBuf::from("wedding.db")
}

fn default_couple() -> String {
    "The Happy Couple".to_string()
}

fn default_event_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 6, 20).unwrap_or_default()
}

fn default_timezone() -> String {
    "auto".to_string()
}

fn default_weather_url() -> String {
    "https://api.open-meteo.com/v1/forecast".to_string()
}

fn default_cache_ttl() -> i64 {
    60
}

fn default_timeout() -> u64 {
    10
}

fn default_session_ttl() -> i64 {
    24
}

fn default_cookie_name() -> String {
    "wedding_admin".to_string()
}

impl AppConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config TOML")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml_str(&content)
    }

    /// Apply `WEDDING_*` overrides; `lookup` is normally `std::env::var(..).ok()`
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_DB) {
            self.database.path = PathBuf::from(path);
        }
        if let Some(bind) = lookup(ENV_BIND) {
            self.server.bind = bind;
        }
        if let Some(digest) = lookup(ENV_ADMIN_PASSWORD) {
            self.admin.password_sha256 = digest.trim().to_lowercase();
        }
    }

    pub fn admin_enabled(&self) -> bool {
        !self.admin.password_sha256.is_empty()
    }

    /// Reject values that can't be turned into durations
    pub fn validate(&self) -> Result<()> {
        let session_ttl = self.admin.session_ttl_hours;
        if !(1..=MAX_SESSION_TTL_HOURS).contains(&session_ttl) {
            bail!(
                "[admin].session_ttl_hours must be between 1 and {}, got {}",
                MAX_SESSION_TTL_HOURS,
                session_ttl
            );
        }

        let cache_ttl = self.weather.cache_ttl_minutes;
        if !(1..=MAX_CACHE_TTL_MINUTES).contains(&cache_ttl) {
            bail!(
                "[weather].cache_ttl_minutes must be between 1 and {}, got {}",
                MAX_CACHE_TTL_MINUTES,
                cache_ttl
            );
        }

        if self.weather.timeout_secs == 0 {
            bail!("[weather].timeout_secs must be at least 1");
        }
        Ok(())
    }
}

/// Resolve config: explicit path, then `$WEDDING_CONFIG`, then defaults.
/// Environment overrides are applied last, then the result is validated.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let env_path = std::env::var(ENV_CONFIG).ok().map(PathBuf::from);

    let mut config = match path.map(Path::to_path_buf).or(env_path) {
        Some(p) => AppConfig::from_file(&p)?,
        None => AppConfig::default(),
    };

    config.apply_overrides(|key| std::env::var(key).ok());
    config.validate().context("Invalid configuration")?;
    Ok(config)
}
