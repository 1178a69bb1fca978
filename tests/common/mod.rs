//! Mock camera serving the device, analytics and web API endpoints the
//! adapters talk to.

#![allow(dead_code)]

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use camera_validator::camera::CameraClient;
use camera_validator::config::AppConfig;
use camera_validator::onvif::analytics::parse_rules;
use camera_validator::onvif::soap::body_action;

pub const RULE_NAME: &str = "Camera Tampering Rule";

struct MockState {
    values: BTreeMap<String, i64>,
    bounds: BTreeMap<String, (i64, i64, i64)>,
    reboots: usize,
    factory_resets: usize,
    actions: Vec<String>,
}

#[derive(Clone)]
pub struct MockCamera {
    state: Arc<Mutex<MockState>>,
}

impl MockCamera {
    pub fn new() -> Self {
        let bounds: BTreeMap<String, (i64, i64, i64)> = [
            ("Sensitivity", (1, 10, 8)),
            ("Duration", (1, 30, 8)),
            ("Timeout", (60, 3600, 300)),
            ("Enabled", (0, 1, 1)),
        ]
        .into_iter()
        .map(|(name, b)| (name.to_string(), b))
        .collect();
        let values = bounds.iter().map(|(name, b)| (name.clone(), b.2)).collect();

        Self {
            state: Arc::new(Mutex::new(MockState {
                values,
                bounds,
                reboots: 0,
                factory_resets: 0,
                actions: Vec::new(),
            })),
        }
    }

    pub fn value(&self, name: &str) -> i64 {
        self.state.lock().unwrap().values[name]
    }

    pub fn set_value(&self, name: &str, value: i64) {
        self.state.lock().unwrap().values.insert(name.to_string(), value);
    }

    pub fn reboots(&self) -> usize {
        self.state.lock().unwrap().reboots
    }

    pub fn factory_resets(&self) -> usize {
        self.state.lock().unwrap().factory_resets
    }

    pub fn actions(&self) -> Vec<String> {
        self.state.lock().unwrap().actions.clone()
    }

    fn router(self) -> Router {
        Router::new()
            .route("/onvif/device_service", post(device_service))
            .route("/onvif/analytics_service", post(analytics_service))
            .route("/api/analytics/tamper/:key", get(web_get).put(web_put))
            .route("/api/analytics/tamper/:key/bounds", get(web_bounds))
            .with_state(self)
    }

    /// Serves on an ephemeral port and returns a config pointing at it.
    pub async fn spawn(self) -> AppConfig {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = self.router();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let yaml = format!(
            r#"
camera:
  address: 127.0.0.1:{}
  username: admin
  password: admin
  request_timeout_secs: 5
lifecycle:
  shutdown_grace_secs: 0
  poll_interval_secs: 0
  ready_timeout_secs: 5
"#,
            addr.port()
        );
        AppConfig::from_yaml_str(&yaml).unwrap()
    }
}

pub fn client(config: &AppConfig) -> CameraClient {
    CameraClient::new(config.camera.clone()).unwrap()
}

fn soap(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><env:Envelope xmlns:env="http://www.w3.org/2003/05/soap-envelope" xmlns:tds="http://www.onvif.org/ver10/device/wsdl" xmlns:tan="http://www.onvif.org/ver20/analytics/wsdl" xmlns:tt="http://www.onvif.org/ver10/schema" xmlns:avg="http://www.avigilon.com/onvif/ver10/schema"><env:Body>{}</env:Body></env:Envelope>"#,
        body
    )
}

fn fault(subcode: &str, reason: &str) -> Response {
    let body = soap(&format!(
        r#"<env:Fault><env:Code><env:Value>env:Sender</env:Value><env:Subcode><env:Value>{}</env:Value></env:Subcode></env:Code><env:Reason><env:Text xml:lang="en">{}</env:Text></env:Reason></env:Fault>"#,
        subcode, reason
    ));
    (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
}

fn authorized(body: &str) -> bool {
    body.contains("<wsse:Username>admin</wsse:Username>") && body.contains("PasswordDigest")
}

async fn device_service(State(camera): State<MockCamera>, body: String) -> Response {
    if !authorized(&body) {
        return fault("ter:NotAuthorized", "Sender not authorized");
    }
    let action = body_action(&body).unwrap().unwrap_or_default();
    let mut state = camera.state.lock().unwrap();
    state.actions.push(action.clone());

    match action.as_str() {
        "GetDeviceInformation" => soap(
            "<tds:GetDeviceInformationResponse><tds:Manufacturer>Avigilon</tds:Manufacturer><tds:Model>2.0C-H5A-DO1</tds:Model><tds:FirmwareVersion>4.10.0.36</tds:FirmwareVersion><tds:SerialNumber>1234567</tds:SerialNumber><tds:HardwareId>T202</tds:HardwareId></tds:GetDeviceInformationResponse>",
        )
        .into_response(),
        "SystemReboot" => {
            state.reboots += 1;
            soap("<tds:SystemRebootResponse><tds:Message>Rebooting in 5 seconds</tds:Message></tds:SystemRebootResponse>").into_response()
        }
        "SetSystemFactoryDefault" => {
            state.factory_resets += 1;
            let defaults: Vec<(String, i64)> = state.bounds.iter().map(|(n, b)| (n.clone(), b.2)).collect();
            state.values.extend(defaults);
            soap("<tds:SetSystemFactoryDefaultResponse/>").into_response()
        }
        other => fault("ter:ActionNotSupported", other),
    }
}

async fn analytics_service(State(camera): State<MockCamera>, body: String) -> Response {
    if !authorized(&body) {
        return fault("ter:NotAuthorized", "Sender not authorized");
    }
    let action = body_action(&body).unwrap().unwrap_or_default();
    let mut state = camera.state.lock().unwrap();
    state.actions.push(action.clone());

    match action.as_str() {
        "GetSupportedRules" => {
            let mut bounds = String::new();
            let mut defaults = String::new();
            for (name, (min, max, default)) in &state.bounds {
                if name != "Enabled" {
                    bounds.push_str(&format!(
                        r#"<avg:SimpleItemBounds Name="{}"><avg:Bounds><avg:Min Value="{}"/><avg:Max Value="{}"/></avg:Bounds></avg:SimpleItemBounds>"#,
                        name, min, max
                    ));
                }
                defaults.push_str(&format!(r#"<avg:SimpleItemDefaultValue Name="{}" Value="{}"/>"#, name, default));
            }
            soap(&format!(
                r#"<tan:GetSupportedRulesResponse><tan:SupportedRules><tt:RuleDescription Name="tt:CellMotionDetector"/><tt:RuleDescription Name="tavg:CameraTampering"><tt:Extension><avg:RuleDescriptionExtension>{}{}</avg:RuleDescriptionExtension></tt:Extension></tt:RuleDescription></tan:SupportedRules></tan:GetSupportedRulesResponse>"#,
                bounds, defaults
            ))
            .into_response()
        }
        "GetRules" => {
            let items: String = state
                .values
                .iter()
                .map(|(name, value)| format!(r#"<tt:SimpleItem Name="{}" Value="{}"/>"#, name, value))
                .collect();
            soap(&format!(
                r#"<tan:GetRulesResponse><tan:Rule Name="{}" Type="tavg:CameraTampering"><tt:Parameters>{}</tt:Parameters></tan:Rule></tan:GetRulesResponse>"#,
                RULE_NAME, items
            ))
            .into_response()
        }
        "ModifyRules" => {
            let rules = parse_rules(&body).unwrap();
            let Some(rule) = rules.into_iter().find(|r| r.name == RULE_NAME) else {
                return fault("ter:InvalidArgVal", "No such rule");
            };
            let mut updates = Vec::new();
            for item in &rule.parameters {
                let Some(&(min, max, _)) = state.bounds.get(&item.name) else {
                    return fault("ter:InvalidArgVal", &format!("Unknown parameter {}", item.name));
                };
                match item.value.parse::<i64>() {
                    Ok(v) if (min..=max).contains(&v) => updates.push((item.name.clone(), v)),
                    _ => return fault("ter:InvalidArgVal", &format!("{} out of range", item.name)),
                }
            }
            state.values.extend(updates);
            soap("<tan:ModifyRulesResponse/>").into_response()
        }
        "DeleteRules" => fault("ter:ActionNotSupported", "Built-in rule cannot be deleted"),
        other => fault("ter:ActionNotSupported", other),
    }
}

fn setting_for(key: &str) -> Option<&'static str> {
    match key {
        "sensitivity" => Some("Sensitivity"),
        "trigger_delay" => Some("Duration"),
        "timeout" => Some("Timeout"),
        "enabled" => Some("Enabled"),
        _ => None,
    }
}

async fn web_get(State(camera): State<MockCamera>, Path(key): Path<String>) -> Response {
    let Some(name) = setting_for(&key) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let value = camera.state.lock().unwrap().values[name];
    Json(json!({ "value": value })).into_response()
}

async fn web_bounds(State(camera): State<MockCamera>, Path(key): Path<String>) -> Response {
    let Some(name) = setting_for(&key) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let (min, max, default) = camera.state.lock().unwrap().bounds[name];
    Json(json!({ "min": min, "max": max, "default": default })).into_response()
}

async fn web_put(
    State(camera): State<MockCamera>,
    Path(key): Path<String>,
    Json(payload): Json<serde_json::Value>,
) -> Response {
    let Some(name) = setting_for(&key) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let mut state = camera.state.lock().unwrap();
    let (min, max, _) = state.bounds[name];

    match payload.get("value").and_then(|v| v.as_i64()) {
        Some(v) if (min..=max).contains(&v) => {
            state.values.insert(name.to_string(), v);
            StatusCode::OK.into_response()
        }
        Some(_) => (StatusCode::BAD_REQUEST, "value out of range").into_response(),
        None => (StatusCode::BAD_REQUEST, "value must be an integer").into_response(),
    }
}
