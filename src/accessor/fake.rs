//! In-memory device for exercising the validator without a camera.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::accessor::{AccessError, DeviceLifecycle, Rejection, RuleStore, SetOutcome, SettingAccessor, SettingValue};
use crate::camera::ClientError;
use crate::onvif::soap::SoapFault;
use crate::validator::SettingSpec;

#[derive(Default)]
struct State {
    bounds: HashMap<String, SettingSpec>,
    reported: HashMap<String, SettingSpec>,
    values: HashMap<String, i64>,
    writes: HashMap<String, Vec<i64>>,
    rules: HashSet<String>,
    reboots: usize,
    factory_resets: usize,
}

#[derive(Default)]
struct Defects {
    accept_out_of_range: bool,
    transport_error_on_invalid: bool,
    transport_down: bool,
    deletable_rules: bool,
    rule_lookup_error: bool,
    ignored_writes: HashSet<(String, i64)>,
    forget_on_reboot: HashSet<String>,
    survives_factory_reset: HashSet<String>,
}

pub(crate) struct FakeDevice {
    state: Mutex<State>,
    defects: Defects,
}

impl FakeDevice {
    pub(crate) fn new(specs: Vec<SettingSpec>, rules: &[&str]) -> Self {
        let mut state = State::default();
        for spec in specs {
            state.values.insert(spec.name.clone(), spec.default);
            state.bounds.insert(spec.name.clone(), spec);
        }
        state.rules = rules.iter().map(|r| r.to_string()).collect();

        Self {
            state: Mutex::new(state),
            defects: Defects::default(),
        }
    }

    /// A tamper rule at factory defaults.
    pub(crate) fn tamper() -> Self {
        Self::new(
            vec![
                SettingSpec::new("Sensitivity", 1, 10, 8),
                SettingSpec::new("Duration", 1, 30, 8),
                SettingSpec::new("Timeout", 60, 3600, 300),
                SettingSpec::new("Enabled", 0, 1, 1),
            ],
            &["Camera Tampering Rule"],
        )
    }

    /// Bounds the device advertises, independent of what it enforces.
    pub(crate) fn with_reported_bounds(self, spec: SettingSpec) -> Self {
        self.state.lock().unwrap().reported.insert(spec.name.clone(), spec);
        self
    }

    pub(crate) fn with_accept_out_of_range(mut self) -> Self {
        self.defects.accept_out_of_range = true;
        self
    }

    pub(crate) fn with_transport_error_on_invalid(mut self) -> Self {
        self.defects.transport_error_on_invalid = true;
        self
    }

    pub(crate) fn with_transport_down(mut self) -> Self {
        self.defects.transport_down = true;
        self
    }

    pub(crate) fn with_deletable_rules(mut self) -> Self {
        self.defects.deletable_rules = true;
        self
    }

    /// Rule lookups return an unparseable response.
    pub(crate) fn with_rule_lookup_error(mut self) -> Self {
        self.defects.rule_lookup_error = true;
        self
    }

    /// Reports success for this write without storing it.
    pub(crate) fn with_ignored_write(mut self, name: &str, value: i64) -> Self {
        self.defects.ignored_writes.insert((name.to_string(), value));
        self
    }

    pub(crate) fn with_forget_on_reboot(mut self, name: &str) -> Self {
        self.defects.forget_on_reboot.insert(name.to_string());
        self
    }

    pub(crate) fn with_survives_factory_reset(mut self, name: &str) -> Self {
        self.defects.survives_factory_reset.insert(name.to_string());
        self
    }

    /// Accepted integer writes, in order.
    pub(crate) fn writes(&self, name: &str) -> Vec<i64> {
        self.state
            .lock()
            .unwrap()
            .writes
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn reboots(&self) -> usize {
        self.state.lock().unwrap().reboots
    }

    pub(crate) fn factory_resets(&self) -> usize {
        self.state.lock().unwrap().factory_resets
    }

    fn unavailable() -> AccessError {
        AccessError::Client(ClientError::Status {
            status: 503,
            body: "Service Unavailable".to_string(),
        })
    }
}

#[async_trait]
impl SettingAccessor for FakeDevice {
    async fn supported_bounds(&self, setting: &str) -> Result<SettingSpec, AccessError> {
        if self.defects.transport_down {
            return Err(Self::unavailable());
        }
        let state = self.state.lock().unwrap();
        state
            .reported
            .get(setting)
            .or_else(|| state.bounds.get(setting))
            .cloned()
            .ok_or_else(|| AccessError::UnknownSetting(setting.to_string()))
    }

    async fn get(&self, setting: &str) -> Result<i64, AccessError> {
        if self.defects.transport_down {
            return Err(Self::unavailable());
        }
        self.state
            .lock()
            .unwrap()
            .values
            .get(setting)
            .copied()
            .ok_or_else(|| AccessError::UnknownSetting(setting.to_string()))
    }

    async fn set(&self, setting: &str, value: &SettingValue) -> SetOutcome {
        if self.defects.transport_down {
            return SetOutcome::TransportError("connection refused".to_string());
        }

        let mut state = self.state.lock().unwrap();
        let spec = match state.bounds.get(setting) {
            Some(spec) => spec.clone(),
            None => return SetOutcome::Rejected(Rejection::Status { code: 404, body: String::new() }),
        };

        let v = match value {
            SettingValue::Int(v) => *v,
            SettingValue::Text(_) => {
                if self.defects.transport_error_on_invalid {
                    return SetOutcome::TransportError("connection reset".to_string());
                }
                return SetOutcome::Rejected(Rejection::InvalidType);
            }
        };

        if !spec.contains(v) {
            if self.defects.transport_error_on_invalid {
                return SetOutcome::TransportError("connection reset".to_string());
            }
            if !self.defects.accept_out_of_range {
                return SetOutcome::Rejected(Rejection::OutOfRange);
            }
        }

        state.writes.entry(setting.to_string()).or_default().push(v);
        if !self.defects.ignored_writes.contains(&(setting.to_string(), v)) {
            state.values.insert(setting.to_string(), v);
        }
        SetOutcome::Success(value.clone())
    }
}

#[async_trait]
impl RuleStore for FakeDevice {
    async fn delete_rule(&self, rule_name: &str) -> Result<(), AccessError> {
        let mut state = self.state.lock().unwrap();
        if self.defects.deletable_rules && state.rules.remove(rule_name) {
            return Ok(());
        }
        Err(AccessError::Client(ClientError::Fault(SoapFault {
            code: "ter:ActionNotSupported".to_string(),
            reason: format!("{} cannot be deleted", rule_name),
        })))
    }

    async fn rule_exists(&self, rule_name: &str) -> Result<bool, AccessError> {
        if self.defects.rule_lookup_error {
            return Err(AccessError::Client(ClientError::Malformed("GetRules: unexpected EOF".to_string())));
        }
        Ok(self.state.lock().unwrap().rules.contains(rule_name))
    }
}

#[async_trait]
impl DeviceLifecycle for FakeDevice {
    async fn reboot(&self) -> Result<(), AccessError> {
        let mut state = self.state.lock().unwrap();
        state.reboots += 1;
        for name in &self.defects.forget_on_reboot {
            if let Some(default) = state.bounds.get(name).map(|s| s.default) {
                state.values.insert(name.clone(), default);
            }
        }
        Ok(())
    }

    async fn restore_factory_defaults(&self) -> Result<(), AccessError> {
        let mut state = self.state.lock().unwrap();
        state.factory_resets += 1;
        let defaults: Vec<(String, i64)> = state
            .bounds
            .values()
            .filter(|spec| !self.defects.survives_factory_reset.contains(&spec.name))
            .map(|spec| (spec.name.clone(), spec.default))
            .collect();
        state.values.extend(defaults);
        Ok(())
    }
}
