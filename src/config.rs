use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use anyhow::{Context, Result};

use crate::validator::SettingSpec;

/// Environment variables with this prefix override file values,
/// e.g. `CAMERA_VALIDATOR__CAMERA__PASSWORD`.
pub const ENV_PREFIX: &str = "CAMERA_VALIDATOR";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub camera: CameraConfig,
    #[serde(default)]
    pub onvif: OnvifConfig,
    #[serde(default)]
    pub web: WebApiConfig,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
    #[serde(default)]
    pub suite: SuiteConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CameraConfig {
    pub address: String,
    pub username: String,
    pub password: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OnvifConfig {
    #[serde(default = "default_device_service")]
    pub device_service: String,
    #[serde(default = "default_analytics_service")]
    pub analytics_service: String,
    #[serde(default = "default_configuration_token")]
    pub configuration_token: String,
    #[serde(default = "default_rule_name")]
    pub rule_name: String,
    #[serde(default = "default_rule_type")]
    pub rule_type: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WebApiConfig {
    #[serde(default = "default_web_prefix")]
    pub prefix: String,
    /// Device setting name to web API key.
    #[serde(default = "default_web_keys")]
    pub keys: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LifecycleConfig {
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_ready_timeout_secs")]
    pub ready_timeout_secs: u64,
    #[serde(default)]
    pub settle_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SuiteConfig {
    #[serde(default)]
    pub invalid_probes: bool,
    #[serde(default)]
    pub timeout_range: bool,
    #[serde(default = "default_text_probe")]
    pub text_probe: String,
    /// Hardware ids without video analytics; the suite is skipped on them.
    #[serde(default)]
    pub unsupported_hardware: Vec<String>,
    #[serde(default)]
    pub fixtures: TamperFixtures,
}

/// Expected bounds for the tamper rule settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct TamperFixtures {
    #[serde(default = "default_sensitivity")]
    pub sensitivity: SettingSpec,
    #[serde(default = "default_trigger_delay")]
    pub trigger_delay: SettingSpec,
    #[serde(default = "default_timeout")]
    pub timeout: SettingSpec,
    #[serde(default = "default_enabled")]
    pub enabled: SettingSpec,
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_device_service() -> String {
    "/onvif/device_service".to_string()
}

fn default_analytics_service() -> String {
    "/onvif/analytics_service".to_string()
}

fn default_configuration_token() -> String {
    "ana0".to_string()
}

fn default_rule_name() -> String {
    "Camera Tampering Rule".to_string()
}

fn default_rule_type() -> String {
    "tavg:CameraTampering".to_string()
}

fn default_web_prefix() -> String {
    "/api/analytics/tamper".to_string()
}

fn default_web_keys() -> HashMap<String, String> {
    HashMap::from([
        ("Sensitivity".to_string(), "sensitivity".to_string()),
        ("Duration".to_string(), "trigger_delay".to_string()),
        ("Timeout".to_string(), "timeout".to_string()),
        ("Enabled".to_string(), "enabled".to_string()),
    ])
}

fn default_shutdown_grace_secs() -> u64 {
    10
}

fn default_poll_interval_secs() -> u64 {
    2
}

fn default_ready_timeout_secs() -> u64 {
    300
}

fn default_text_probe() -> String {
    "dummy".to_string()
}

fn default_sensitivity() -> SettingSpec {
    SettingSpec::new("Sensitivity", 1, 10, 8)
}

fn default_trigger_delay() -> SettingSpec {
    SettingSpec::new("Duration", 1, 30, 8)
}

fn default_timeout() -> SettingSpec {
    SettingSpec::new("Timeout", 60, 3600, 300)
}

fn default_enabled() -> SettingSpec {
    SettingSpec::new("Enabled", 0, 1, 1)
}

impl Default for OnvifConfig {
    fn default() -> Self {
        Self {
            device_service: default_device_service(),
            analytics_service: default_analytics_service(),
            configuration_token: default_configuration_token(),
            rule_name: default_rule_name(),
            rule_type: default_rule_type(),
        }
    }
}

impl Default for WebApiConfig {
    fn default() -> Self {
        Self {
            prefix: default_web_prefix(),
            keys: default_web_keys(),
        }
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            shutdown_grace_secs: default_shutdown_grace_secs(),
            poll_interval_secs: default_poll_interval_secs(),
            ready_timeout_secs: default_ready_timeout_secs(),
            settle_secs: 0,
        }
    }
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            invalid_probes: false,
            timeout_range: false,
            text_probe: default_text_probe(),
            unsupported_hardware: Vec::new(),
            fixtures: TamperFixtures::default(),
        }
    }
}

impl Default for TamperFixtures {
    fn default() -> Self {
        Self {
            sensitivity: default_sensitivity(),
            trigger_delay: default_trigger_delay(),
            timeout: default_timeout(),
            enabled: default_enabled(),
        }
    }
}

impl AppConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            anyhow::bail!("Configuration file {} does not exist", path.display());
        }

        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .context("Failed to read configuration file")?;

        settings
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        let config: AppConfig = serde_yaml::from_str(contents)
            .context("Failed to parse YAML configuration")?;

        Ok(config)
    }
}

impl CameraConfig {
    pub fn base_url(&self) -> String {
        if self.address.starts_with("http://") || self.address.starts_with("https://") {
            self.address.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", self.address)
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl LifecycleConfig {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout_secs)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }
}
