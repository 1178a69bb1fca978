use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;

use crate::accessor::{classify, AccessError, Rejection, SetOutcome, SettingAccessor, SettingValue};
use crate::camera::{CameraClient, ClientError};
use crate::config::WebApiConfig;
use crate::validator::SettingSpec;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueBody {
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundsBody {
    pub min: i64,
    pub max: i64,
    pub default: i64,
}

/// Settings exposed by the vendor web API.
pub struct WebApiAccessor {
    camera: CameraClient,
    prefix: String,
    keys: HashMap<String, String>,
}

impl WebApiAccessor {
    pub fn new(camera: CameraClient, config: &WebApiConfig) -> Self {
        Self {
            camera,
            prefix: config.prefix.trim_end_matches('/').to_string(),
            // file-loaded configs arrive with lowercased map keys
            keys: config
                .keys
                .iter()
                .map(|(setting, key)| (setting.to_lowercase(), key.clone()))
                .collect(),
        }
    }

    fn path(&self, setting: &str) -> Result<String, AccessError> {
        let key = self
            .keys
            .get(&setting.to_lowercase())
            .ok_or_else(|| AccessError::UnknownSetting(setting.to_string()))?;
        Ok(format!("{}/{}", self.prefix, key))
    }
}

#[async_trait]
impl SettingAccessor for WebApiAccessor {
    async fn supported_bounds(&self, setting: &str) -> Result<SettingSpec, AccessError> {
        let path = format!("{}/bounds", self.path(setting)?);
        let bounds: BoundsBody = self.camera.get_json(&path).await?;

        Ok(SettingSpec::new(setting, bounds.min, bounds.max, bounds.default))
    }

    async fn get(&self, setting: &str) -> Result<i64, AccessError> {
        let body: ValueBody = self.camera.get_json(&self.path(setting)?).await?;

        match &body.value {
            serde_json::Value::Number(n) => n.as_i64().ok_or_else(|| AccessError::NotAnInteger {
                name: setting.to_string(),
                value: n.to_string(),
            }),
            serde_json::Value::String(s) => crate::accessor::parse_int(setting, s),
            other => Err(AccessError::NotAnInteger {
                name: setting.to_string(),
                value: other.to_string(),
            }),
        }
    }

    async fn set(&self, setting: &str, value: &SettingValue) -> SetOutcome {
        let path = match self.path(setting) {
            Ok(path) => path,
            Err(e) => return SetOutcome::TransportError(e.to_string()),
        };
        let payload = match value {
            SettingValue::Int(v) => json!({ "value": v }),
            SettingValue::Text(s) => json!({ "value": s }),
        };

        match self.camera.put_json(&path, &payload).await {
            Ok((status, _)) if (200..300).contains(&status) => SetOutcome::Success(value.clone()),
            Ok((status, body)) => {
                tracing::debug!("PUT {}={} returned HTTP {}: {}", setting, value, status, body);
                let invalid = status == 400 || status == 422;
                SetOutcome::Rejected(classify(invalid, value, Rejection::Status { code: status, body }))
            }
            Err(ClientError::Transport { url, source }) => {
                SetOutcome::TransportError(format!("{}: {}", url, source))
            }
            Err(e) => SetOutcome::TransportError(e.to_string()),
        }
    }
}
