use async_trait::async_trait;

use crate::accessor::{classify, parse_int, AccessError, Rejection, RuleStore, SetOutcome, SettingAccessor, SettingValue};
use crate::camera::ClientError;
use crate::onvif::analytics::AnalyticsService;
use crate::validator::SettingSpec;

/// Settings stored as SimpleItem parameters of one named analytics rule.
pub struct SoapRuleAccessor {
    analytics: AnalyticsService,
    rule_name: String,
    rule_type: String,
}

impl SoapRuleAccessor {
    pub fn new(analytics: AnalyticsService, rule_name: impl Into<String>, rule_type: impl Into<String>) -> Self {
        Self {
            analytics,
            rule_name: rule_name.into(),
            rule_type: rule_type.into(),
        }
    }

    pub fn rule_name(&self) -> &str {
        &self.rule_name
    }

    fn is_invalid_argument(code: &str) -> bool {
        code.ends_with("InvalidArgVal") || code.ends_with("InvalidArgs") || code.ends_with("InvalidArgument")
    }
}

#[async_trait]
impl SettingAccessor for SoapRuleAccessor {
    async fn supported_bounds(&self, setting: &str) -> Result<SettingSpec, AccessError> {
        let description = self.analytics.get_supported_rule_by_name(&self.rule_type).await?;
        let item = description
            .item(setting)
            .ok_or_else(|| AccessError::UnknownSetting(setting.to_string()))?;

        let bound = |raw: &Option<String>| -> Result<i64, AccessError> {
            match raw {
                Some(raw) => parse_int(setting, raw),
                None => Err(AccessError::UnknownSetting(format!("{} bounds", setting))),
            }
        };

        Ok(SettingSpec::new(
            setting,
            bound(&item.min)?,
            bound(&item.max)?,
            bound(&item.default)?,
        ))
    }

    async fn get(&self, setting: &str) -> Result<i64, AccessError> {
        let rule = self.analytics.get_rule_by_name(&self.rule_name).await?;
        let raw = rule
            .parameter(setting)
            .ok_or_else(|| AccessError::UnknownSetting(setting.to_string()))?;

        parse_int(setting, raw)
    }

    async fn set(&self, setting: &str, value: &SettingValue) -> SetOutcome {
        let raw = match value {
            SettingValue::Int(v) => v.to_string(),
            SettingValue::Text(s) => s.clone(),
        };

        match self
            .analytics
            .modify_rule(&self.rule_name, &[(setting.to_string(), raw)])
            .await
        {
            Ok(()) => SetOutcome::Success(value.clone()),
            Err(ClientError::Fault(fault)) => {
                tracing::debug!("ModifyRules {}={} faulted: {}", setting, value, fault);
                let invalid = Self::is_invalid_argument(&fault.code);
                SetOutcome::Rejected(classify(
                    invalid,
                    value,
                    Rejection::Fault {
                        code: fault.code,
                        reason: fault.reason,
                    },
                ))
            }
            Err(ClientError::Status { status, body }) => SetOutcome::Rejected(Rejection::Status { code: status, body }),
            Err(e) => SetOutcome::TransportError(e.to_string()),
        }
    }
}

#[async_trait]
impl RuleStore for SoapRuleAccessor {
    async fn delete_rule(&self, rule_name: &str) -> Result<(), AccessError> {
        self.analytics.delete_rules(rule_name).await?;
        Ok(())
    }

    async fn rule_exists(&self, rule_name: &str) -> Result<bool, AccessError> {
        let rules = self.analytics.get_rules().await?;
        Ok(rules.iter().any(|rule| rule.name == rule_name))
    }
}
