use crate::error::ConfigError;
use regex::Regex;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub audio: AudioConfig,

    #[serde(default)]
    pub monitor: MonitorConfig,

    #[serde(default)]
    pub listener: ListenerConfig,

    #[serde(default)]
    pub alert: AlertConfig,

    #[serde(default)]
    pub location: LocationConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub classifier: ClassifierConfig,

    #[serde(default)]
    pub otp: OtpConfig,

    #[serde(default)]
    pub guardian: Vec<GuardianConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_user_id")]
    pub user_id: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            user_id: default_user_id(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AudioConfig {
    #[serde(default = "default_device_name")]
    pub device_name: String,

    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,

    #[serde(default = "default_channels")]
    pub channels: u16,

    #[serde(default = "default_gain")]
    pub gain: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device_name: default_device_name(),
            sample_rate: default_sample_rate(),
            chunk_size: default_chunk_size(),
            channels: default_channels(),
            gain: default_gain(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MonitorConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_monitor_threshold")]
    pub trigger_threshold: i32,

    #[serde(default = "default_record_seconds")]
    pub record_seconds: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            trigger_threshold: default_monitor_threshold(),
            record_seconds: default_record_seconds(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ListenerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_keyword")]
    pub keyword: String,

    #[serde(default = "default_listener_floor")]
    pub min_clip_peak: i32,

    #[serde(default = "default_cooldown_seconds")]
    pub cooldown_seconds: u64,

    #[serde(default = "default_phrase_timeout_seconds")]
    pub phrase_timeout_seconds: u64,

    #[serde(default = "default_record_seconds")]
    pub record_seconds: u32,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            keyword: default_keyword(),
            min_clip_peak: default_listener_floor(),
            cooldown_seconds: default_cooldown_seconds(),
            phrase_timeout_seconds: default_phrase_timeout_seconds(),
            record_seconds: default_record_seconds(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AlertConfig {
    #[serde(default = "default_stand_down_seconds")]
    pub stand_down_seconds: u64,

    #[serde(default = "default_decision_threshold")]
    pub decision_threshold: f32,

    #[serde(default = "default_country_code")]
    pub country_code: String,

    #[serde(default = "default_emergency_number")]
    pub emergency_number: String,

    #[serde(default = "default_notifier")]
    pub notifier: String,

    /// Notifier-specific settings, passed through to the plugin untouched.
    #[serde(default)]
    pub notifier_config: Option<toml::Value>,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            stand_down_seconds: default_stand_down_seconds(),
            decision_threshold: default_decision_threshold(),
            country_code: default_country_code(),
            emergency_number: default_emergency_number(),
            notifier: default_notifier(),
            notifier_config: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LocationConfig {
    #[serde(default = "default_update_interval_seconds")]
    pub update_interval_seconds: u64,

    #[serde(default)]
    pub static_latitude: Option<f64>,

    #[serde(default)]
    pub static_longitude: Option<f64>,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            update_interval_seconds: default_update_interval_seconds(),
            static_latitude: None,
            static_longitude: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClassifierConfig {
    #[serde(default = "default_engine")]
    pub engine: String,

    /// Engine-specific settings, passed through to the plugin untouched.
    #[serde(flatten)]
    pub extra: toml::Value,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            engine: default_engine(),
            extra: toml::Value::Table(Default::default()),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OtpConfig {
    #[serde(default = "default_otp_ttl_seconds")]
    pub ttl_seconds: u64,

    #[serde(default = "default_otp_code_length")]
    pub code_length: u32,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_otp_ttl_seconds(),
            code_length: default_otp_code_length(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GuardianConfig {
    pub name: String,
    pub number: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_user_id() -> u64 {
    1
}

fn default_device_name() -> String {
    "default".to_string()
}

fn default_sample_rate() -> u32 {
    44100
}

fn default_chunk_size() -> u32 {
    1024
}

fn default_channels() -> u16 {
    1
}

fn default_gain() -> f32 {
    5.0
}

fn default_true() -> bool {
    true
}

fn default_monitor_threshold() -> i32 {
    50
}

fn default_record_seconds() -> u32 {
    5
}

fn default_keyword() -> String {
    "help".to_string()
}

fn default_listener_floor() -> i32 {
    20
}

fn default_cooldown_seconds() -> u64 {
    10
}

fn default_phrase_timeout_seconds() -> u64 {
    5
}

fn default_stand_down_seconds() -> u64 {
    300
}

fn default_decision_threshold() -> f32 {
    0.0
}

fn default_country_code() -> String {
    "+91".to_string()
}

fn default_emergency_number() -> String {
    "+91100".to_string()
}

fn default_notifier() -> String {
    "file".to_string()
}

fn default_update_interval_seconds() -> u64 {
    30
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_engine() -> String {
    "null".to_string()
}

fn default_otp_ttl_seconds() -> u64 {
    300
}

fn default_otp_code_length() -> u32 {
    6
}

/// Interpolate `${VAR}` patterns with environment variable values.
fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let re = Regex::new(r"\$\{([^}]+)\}").unwrap();
    let mut result = input.to_string();
    let mut errors = Vec::new();

    for cap in re.captures_iter(input) {
        let var_name = &cap[1];
        match std::env::var(var_name) {
            Ok(val) => {
                result = result.replace(&cap[0], &val);
            }
            Err(_) => {
                errors.push(var_name.to_string());
            }
        }
    }

    if let Some(first_missing) = errors.into_iter().next() {
        return Err(ConfigError::EnvVarNotFound(first_missing));
    }

    Ok(result)
}

impl AppConfig {
    /// Load configuration from a TOML file, with environment variable interpolation.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let interpolated = interpolate_env_vars(&content)?;
        let config: AppConfig = toml::from_str(&interpolated)?;
        Ok(config)
    }

    /// Parse configuration from a TOML string (for testing).
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let interpolated = interpolate_env_vars(s)?;
        let config: AppConfig = toml::from_str(&interpolated)?;
        Ok(config)
    }
}
