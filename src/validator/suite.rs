use crate::accessor::RuleStore;
use crate::config::{SuiteConfig, TamperFixtures};
use crate::validator::{
    delete_rule_test, invalid_value_test, persistence_test_many, range_test, restore_defaults_test_many, RunReport,
    Session, SettingSpec, ValidationError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// ONVIF analytics rule parameters.
    Soap,
    /// Vendor web API.
    Web,
}

#[derive(Debug, Clone)]
pub struct SuiteOptions {
    pub variant: Variant,
    pub invalid_probes: bool,
    pub timeout_range: bool,
    pub text_probe: String,
    pub unsupported_hardware: Vec<String>,
}

impl SuiteOptions {
    pub fn from_config(variant: Variant, config: &SuiteConfig) -> Self {
        Self {
            variant,
            invalid_probes: config.invalid_probes,
            timeout_range: config.timeout_range,
            text_probe: config.text_probe.clone(),
            unsupported_hardware: config.unsupported_hardware.clone(),
        }
    }
}

/// Camera tamper settings: range, persistence, factory reset, rule deletion
/// and (optionally) invalid values.
pub struct TamperSuite<'a> {
    fixtures: &'a TamperFixtures,
    options: SuiteOptions,
    rules: Option<(&'a dyn RuleStore, String)>,
}

impl<'a> TamperSuite<'a> {
    pub fn new(fixtures: &'a TamperFixtures, options: SuiteOptions) -> Self {
        Self {
            fixtures,
            options,
            rules: None,
        }
    }

    /// Enables the rule deletion check.
    pub fn with_rules(mut self, rules: &'a dyn RuleStore, rule_name: impl Into<String>) -> Self {
        self.rules = Some((rules, rule_name.into()));
        self
    }

    /// Settings that persistence and factory reset cover for this variant.
    fn managed_settings(&self) -> Vec<&'a SettingSpec> {
        match self.options.variant {
            Variant::Soap => vec![&self.fixtures.sensitivity, &self.fixtures.trigger_delay, &self.fixtures.timeout],
            Variant::Web => vec![&self.fixtures.sensitivity, &self.fixtures.trigger_delay],
        }
    }

    pub async fn run(&self, mut session: Session<'_>, hardware_id: Option<&str>) -> Result<RunReport, ValidationError> {
        if let Some(hw) = hardware_id {
            if self.options.unsupported_hardware.iter().any(|h| h == hw) {
                let reason = format!("Camera tamper is not supported on {}", hw);
                session.log.info(&reason);
                return Ok(session.log.into_report(Some(reason)));
            }
        }

        session
            .log
            .test_start_header("Starting camera tamper settings test");

        let result = range_test(&mut session, &self.fixtures.sensitivity).await;
        session.finish("sensitivity range test", result)?;

        let result = range_test(&mut session, &self.fixtures.trigger_delay).await;
        session.finish("trigger delay range test", result)?;

        if self.options.timeout_range && self.options.variant == Variant::Soap {
            let result = range_test(&mut session, &self.fixtures.timeout).await;
            session.finish("timeout range test", result)?;
        }

        let maxima: Vec<(SettingSpec, i64)> = self
            .managed_settings()
            .into_iter()
            .map(|spec| (spec.clone(), spec.max))
            .collect();

        let result = persistence_test_many(&mut session, &maxima).await;
        session.finish("settings persistence test", result)?;

        let mut non_defaults = maxima;
        if self.options.variant == Variant::Soap {
            let enabled = &self.fixtures.enabled;
            let disabled = if enabled.default == enabled.min { enabled.max } else { enabled.min };
            non_defaults.push((enabled.clone(), disabled));
        }
        let result = restore_defaults_test_many(&mut session, &non_defaults).await;
        session.finish("restore defaults test", result)?;

        if let Some((rules, rule_name)) = &self.rules {
            let result = delete_rule_test(&mut session, *rules, rule_name).await;
            session.finish("delete rule test", result)?;
        }

        if self.options.invalid_probes {
            let result = invalid_value_test(&mut session, &self.fixtures.sensitivity, &self.options.text_probe).await;
            session.finish("invalid sensitivity test", result)?;

            let result = invalid_value_test(&mut session, &self.fixtures.trigger_delay, &self.options.text_probe).await;
            session.finish("invalid trigger delay test", result)?;
        } else {
            session.log.info("Invalid value probes disabled for this run");
        }

        let report = session.log.into_report(None);
        tracing::info!(
            "Tamper settings test finished: {} checks, {} failed, {} aborted sub-tests",
            report.checks,
            report.fail_count,
            report.errors.len()
        );
        Ok(report)
    }
}
