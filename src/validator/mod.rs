//! Bounded setting validation.
//!
//! Each operation drives one [`SettingAccessor`] through a [`Session`] and
//! records every check in the session's [`TestLog`]. A mismatch is logged
//! and the operation keeps going; an access error that is not the expected
//! answer to an invalid probe ends the operation with `Err`, and the caller
//! decides whether the run continues (see [`Session::finish`]).

pub mod report;
pub mod suite;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::accessor::{AccessError, DeviceLifecycle, RuleStore, SetOutcome, SettingAccessor, SettingValue};
use crate::camera::ClientError;

pub use report::{RunReport, TestLog, TestOutcome};
pub use suite::{SuiteOptions, TamperSuite, Variant};

/// A bounded, device-persisted integer setting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SettingSpec {
    pub name: String,
    pub min: i64,
    pub max: i64,
    pub default: i64,
}

impl SettingSpec {
    pub fn new(name: impl Into<String>, min: i64, max: i64, default: i64) -> Self {
        Self {
            name: name.into(),
            min,
            max,
            default,
        }
    }

    pub fn contains(&self, value: i64) -> bool {
        self.min <= value && value <= self.max
    }

    pub fn is_well_formed(&self) -> bool {
        self.min <= self.default && self.default <= self.max
    }
}

#[derive(Debug, Error)]
pub enum ValidationError {
    /// The test inputs themselves are wrong; the run cannot mean anything.
    #[error("broken test fixture: {0}")]
    Fixture(String),
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("transport error while writing {setting}: {detail}")]
    Transport { setting: String, detail: String },
}

/// Run context: the device connection and the result log, owned by the
/// top-level run and lent to each operation.
pub struct Session<'a> {
    pub accessor: &'a dyn SettingAccessor,
    pub device: &'a dyn DeviceLifecycle,
    pub log: TestLog,
}

impl<'a> Session<'a> {
    pub fn new(accessor: &'a dyn SettingAccessor, device: &'a dyn DeviceLifecycle) -> Self {
        Self {
            accessor,
            device,
            log: TestLog::new(),
        }
    }

    /// Logs an aborted sub-test as an error and lets the run continue.
    /// Fixture errors are passed through.
    pub fn finish(&mut self, name: &str, result: Result<(), ValidationError>) -> Result<(), ValidationError> {
        match result {
            Ok(()) => Ok(()),
            Err(e @ ValidationError::Fixture(_)) => Err(e),
            Err(e) => {
                self.log.error(format!("{} aborted: {}", name, e));
                Ok(())
            }
        }
    }

    /// Writes `value` and logs whether it reads back. A rejected write is
    /// one failed check.
    async fn set_and_verify(&mut self, name: &str, value: i64) -> Result<bool, ValidationError> {
        match self.accessor.set(name, &SettingValue::Int(value)).await {
            SetOutcome::Success(_) => {}
            SetOutcome::Rejected(reason) => {
                return Ok(self.log.log_result(
                    false,
                    format!("Setting {} to {} was rejected: {}", name, value, reason),
                ));
            }
            SetOutcome::TransportError(detail) => {
                return Err(ValidationError::Transport {
                    setting: name.to_string(),
                    detail,
                });
            }
        }

        let current = self.accessor.get(name).await?;
        Ok(self.log.log_result(
            current == value,
            format!("Current {} is {} (expected {})", name, current, value),
        ))
    }
}

/// Checks device bounds against the fixture, then round-trips every value
/// in the device-reported range.
pub async fn range_test(session: &mut Session<'_>, fixture: &SettingSpec) -> Result<(), ValidationError> {
    let name = fixture.name.as_str();
    session
        .log
        .test_start_header(format!("Testing min, max, and valid range of {}", name));

    let device = session.accessor.supported_bounds(name).await?;
    session.log.log_result(
        device.min == fixture.min,
        format!("Minimum {} is {} (expected {})", name, device.min, fixture.min),
    );
    session.log.log_result(
        device.max == fixture.max,
        format!("Maximum {} is {} (expected {})", name, device.max, fixture.max),
    );

    if device.min > device.max {
        session.log.log_result(
            false,
            format!("Device bounds for {} are inverted: min {} > max {}", name, device.min, device.max),
        );
        return Ok(());
    }
    if !device.is_well_formed() {
        session.log.log_result(
            false,
            format!("Device default {} for {} lies outside [{}, {}]", device.default, name, device.min, device.max),
        );
    }

    for value in device.min..=device.max {
        session.set_and_verify(name, value).await?;
    }

    Ok(())
}

fn check_non_default(spec: &SettingSpec, value: i64) -> Result<(), ValidationError> {
    if value == spec.default {
        return Err(ValidationError::Fixture(format!(
            "{} test value {} equals its default",
            spec.name, value
        )));
    }
    if !spec.contains(value) {
        return Err(ValidationError::Fixture(format!(
            "{} test value {} is outside [{}, {}]",
            spec.name, value, spec.min, spec.max
        )));
    }
    Ok(())
}

/// Sets `non_default_value`, reboots, and expects the value to survive.
pub async fn persistence_test(
    session: &mut Session<'_>,
    spec: &SettingSpec,
    non_default_value: i64,
) -> Result<(), ValidationError> {
    persistence_test_many(session, &[(spec.clone(), non_default_value)]).await
}

/// Like [`persistence_test`] for several settings around a single reboot.
pub async fn persistence_test_many(
    session: &mut Session<'_>,
    settings: &[(SettingSpec, i64)],
) -> Result<(), ValidationError> {
    for (spec, value) in settings {
        check_non_default(spec, *value)?;
    }

    session
        .log
        .test_start_header(format!("Testing settings persistence for {}", names(settings)));
    session.log.info("Setting non-default values");
    for (spec, value) in settings {
        session.set_and_verify(&spec.name, *value).await?;
    }

    session.log.info("Rebooting camera");
    session.device.reboot().await?;

    for (spec, value) in settings {
        let current = session.accessor.get(&spec.name).await?;
        session.log.log_result(
            current == *value,
            format!("{} after reboot is {} (expected {})", spec.name, current, value),
        );
    }

    Ok(())
}

/// Sets a non-default value, restores factory defaults, and expects the
/// manufacturer default back.
pub async fn restore_defaults_test(
    session: &mut Session<'_>,
    spec: &SettingSpec,
    non_default_value: i64,
) -> Result<(), ValidationError> {
    restore_defaults_test_many(session, &[(spec.clone(), non_default_value)]).await
}

/// Like [`restore_defaults_test`] for several settings around a single reset.
pub async fn restore_defaults_test_many(
    session: &mut Session<'_>,
    settings: &[(SettingSpec, i64)],
) -> Result<(), ValidationError> {
    for (spec, value) in settings {
        check_non_default(spec, *value)?;
    }

    session
        .log
        .test_start_header(format!("Testing restore to defaults for {}", names(settings)));
    session.log.info("Setting non-default values");
    for (spec, value) in settings {
        session.set_and_verify(&spec.name, *value).await?;
    }

    session.log.info("Restoring factory defaults");
    session.device.restore_factory_defaults().await?;

    for (spec, _) in settings {
        let current = session.accessor.get(&spec.name).await?;
        session.log.log_result(
            current == spec.default,
            format!(
                "{} after restored factory defaults is {} (expected {})",
                spec.name, current, spec.default
            ),
        );
    }

    Ok(())
}

/// Writes max + 1, min - 1 and a non-numeric value. Each write must be
/// refused and leave the stored value untouched.
pub async fn invalid_value_test(
    session: &mut Session<'_>,
    spec: &SettingSpec,
    text_probe: &str,
) -> Result<(), ValidationError> {
    let name = spec.name.as_str();
    session
        .log
        .test_start_header(format!("Testing invalid {} values", name));

    let known = session.accessor.get(name).await?;
    if !spec.contains(known) {
        session.log.warning(format!(
            "{} is {} before probing, outside [{}, {}]",
            name, known, spec.min, spec.max
        ));
    }

    let mut probes = Vec::with_capacity(3);
    match spec.max.checked_add(1) {
        Some(above) => probes.push((SettingValue::Int(above), "above maximum")),
        None => session.log.error(format!(
            "No integer above {} maximum {}; skipping that value",
            name, spec.max
        )),
    }
    match spec.min.checked_sub(1) {
        Some(below) => probes.push((SettingValue::Int(below), "below minimum")),
        None => session.log.error(format!(
            "No integer below {} minimum {}; skipping that value",
            name, spec.min
        )),
    }
    probes.push((SettingValue::Text(text_probe.to_string()), "non-numeric"));

    for (probe, label) in probes {
        session
            .log
            .info(format!("Setting {} {} value {}", label, name, probe));

        let outcome = session.accessor.set(name, &probe).await;
        if let SetOutcome::TransportError(detail) = &outcome {
            session.log.info(format!("Write of {} ended in transport error: {}", probe, detail));
        }
        session.log.log_result(
            !outcome.is_success(),
            format!("Response to {} {} value {} is: {} (expected rejection)", name, label, probe, outcome),
        );

        let unchanged = match session.accessor.get(name).await {
            Ok(current) => session.log.log_result(
                current == known,
                format!("{} after {} probe is {} (expected unchanged {})", name, label, current, known),
            ),
            Err(AccessError::NotAnInteger { value, .. }) => session.log.log_result(
                false,
                format!("{} after {} probe holds non-integer {:?} (expected {})", name, label, value, known),
            ),
            Err(e) => return Err(e.into()),
        };

        if !unchanged {
            // keep the next probe independent of this one
            session.log.info(format!("Restoring {} to {}", name, known));
            let restored = session.accessor.set(name, &SettingValue::Int(known)).await;
            if !restored.is_success() {
                session.log.warning(format!("Could not restore {}: {}", name, restored));
            }
        }
    }

    Ok(())
}

/// Deleting a built-in rule must fail and leave the rule readable.
pub async fn delete_rule_test(
    session: &mut Session<'_>,
    rules: &dyn RuleStore,
    rule_name: &str,
) -> Result<(), ValidationError> {
    session
        .log
        .test_start_header(format!("Testing {} deletion", rule_name));

    match rules.delete_rule(rule_name).await {
        Ok(()) => {
            session
                .log
                .log_result(false, format!("No error when deleting {}", rule_name));
        }
        Err(AccessError::Client(refusal @ (ClientError::Fault(_) | ClientError::Status { .. }))) => {
            session.log.info(refusal.to_string());
            session
                .log
                .log_result(true, format!("Unable to delete {}", rule_name));
        }
        Err(e) => return Err(e.into()),
    }

    match rules.rule_exists(rule_name).await {
        Ok(exists) => {
            let message = if exists {
                format!("{} still exists", rule_name)
            } else {
                format!("{} is missing after the delete attempt", rule_name)
            };
            session.log.log_result(exists, message);
        }
        Err(AccessError::Client(
            refusal @ (ClientError::Fault(_) | ClientError::Status { .. } | ClientError::NotFound(_)),
        )) => {
            session.log.info(refusal.to_string());
            session
                .log
                .log_result(false, format!("Unable to retrieve {} settings", rule_name));
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}

fn names(settings: &[(SettingSpec, i64)]) -> String {
    settings
        .iter()
        .map(|(spec, _)| spec.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
