//! Capabilities the validator drives: reading and writing one bounded
//! setting, deleting analytics rules, and power-cycling the device.
//!
//! Two adapters implement [`SettingAccessor`] with the same contract:
//! [`SoapRuleAccessor`] (ONVIF rule parameters, SOAP faults signal
//! rejection) and [`WebApiAccessor`] (JSON over HTTP, non-2xx signals
//! rejection).

pub mod soap_rule;
pub mod web_api;

#[cfg(test)]
pub(crate) mod fake;

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::camera::ClientError;
use crate::validator::SettingSpec;

pub use soap_rule::SoapRuleAccessor;
pub use web_api::WebApiAccessor;

/// Value carried by a write. `Text` is used to probe type validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingValue {
    Int(i64),
    Text(String),
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Int(v) => write!(f, "{}", v),
            SettingValue::Text(s) => write!(f, "'{}'", s),
        }
    }
}

impl From<i64> for SettingValue {
    fn from(value: i64) -> Self {
        SettingValue::Int(value)
    }
}

/// Why the device refused a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    OutOfRange,
    InvalidType,
    /// SOAP fault with its code and reason.
    Fault { code: String, reason: String },
    /// Non-success HTTP status from the web API.
    Status { code: u16, body: String },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::OutOfRange => write!(f, "out of range"),
            Rejection::InvalidType => write!(f, "invalid type"),
            Rejection::Fault { code, reason } => write!(f, "SOAP fault {} ({})", code, reason),
            Rejection::Status { code, .. } => write!(f, "HTTP {}", code),
        }
    }
}

/// Normalized result of a write across accessor variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetOutcome {
    Success(SettingValue),
    Rejected(Rejection),
    TransportError(String),
}

impl SetOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SetOutcome::Success(_))
    }
}

impl fmt::Display for SetOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetOutcome::Success(v) => write!(f, "accepted {}", v),
            SetOutcome::Rejected(r) => write!(f, "rejected: {}", r),
            SetOutcome::TransportError(detail) => write!(f, "transport error: {}", detail),
        }
    }
}

#[derive(Debug, Error)]
pub enum AccessError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("setting {0} is not known to the device")]
    UnknownSetting(String),
    #[error("setting {name} has non-integer value {value:?}")]
    NotAnInteger { name: String, value: String },
    #[error("device did not answer within {0:?} after restart")]
    NotReady(Duration),
}

#[async_trait]
pub trait SettingAccessor: Send + Sync {
    /// Device-reported {min, max, default} for the setting.
    async fn supported_bounds(&self, setting: &str) -> Result<SettingSpec, AccessError>;

    async fn get(&self, setting: &str) -> Result<i64, AccessError>;

    async fn set(&self, setting: &str, value: &SettingValue) -> SetOutcome;
}

/// Deleting analytics rules; only the SOAP variant has rules to delete.
#[async_trait]
pub trait RuleStore: Send + Sync {
    async fn delete_rule(&self, rule_name: &str) -> Result<(), AccessError>;

    async fn rule_exists(&self, rule_name: &str) -> Result<bool, AccessError>;
}

/// Both calls block until the device answers again.
#[async_trait]
pub trait DeviceLifecycle: Send + Sync {
    async fn reboot(&self) -> Result<(), AccessError>;

    async fn restore_factory_defaults(&self) -> Result<(), AccessError>;
}

/// Maps a device refusal to the typed rejection when the cause is a bad
/// argument, keeping transport-specific detail otherwise.
pub(crate) fn classify(invalid_argument: bool, value: &SettingValue, detail: Rejection) -> Rejection {
    match (invalid_argument, value) {
        (true, SettingValue::Int(_)) => Rejection::OutOfRange,
        (true, SettingValue::Text(_)) => Rejection::InvalidType,
        (false, _) => detail,
    }
}

pub(crate) fn parse_int(name: &str, raw: &str) -> Result<i64, AccessError> {
    let trimmed = raw.trim();
    trimmed
        .parse::<i64>()
        .or_else(|_| {
            // Bounds sometimes come back as "10.0"
            trimmed
                .parse::<f64>()
                .ok()
                .filter(|f| f.fract() == 0.0)
                .map(|f| f as i64)
                .ok_or(())
        })
        .map_err(|_| AccessError::NotAnInteger {
            name: name.to_string(),
            value: raw.to_string(),
        })
}
