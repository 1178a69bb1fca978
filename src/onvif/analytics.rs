use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::camera::{CameraClient, ClientError};
use crate::config::OnvifConfig;
use crate::onvif::soap::escape;
use crate::onvif::types::{Rule, RuleDescription, SimpleItem};

/// Rule engine calls on one analytics configuration.
#[derive(Clone)]
pub struct AnalyticsService {
    camera: CameraClient,
    service_path: String,
    configuration_token: String,
}

impl AnalyticsService {
    pub fn new(camera: CameraClient, config: &OnvifConfig) -> Self {
        Self {
            camera,
            service_path: config.analytics_service.clone(),
            configuration_token: config.configuration_token.clone(),
        }
    }

    pub async fn get_supported_rules(&self) -> Result<Vec<RuleDescription>, ClientError> {
        let request_body = format!(
            r#"<tan:GetSupportedRules><tan:ConfigurationToken>{}</tan:ConfigurationToken></tan:GetSupportedRules>"#,
            escape(&self.configuration_token)
        );

        let response = self
            .camera
            .send_soap_request(&self.service_path, &request_body)
            .await?;

        parse_supported_rules(&response)
    }

    pub async fn get_supported_rule_by_name(&self, rule_type: &str) -> Result<RuleDescription, ClientError> {
        self.get_supported_rules()
            .await?
            .into_iter()
            .find(|rule| rule.name == rule_type)
            .ok_or_else(|| ClientError::NotFound(format!("supported rule {}", rule_type)))
    }

    pub async fn get_rules(&self) -> Result<Vec<Rule>, ClientError> {
        let request_body = format!(
            r#"<tan:GetRules><tan:ConfigurationToken>{}</tan:ConfigurationToken></tan:GetRules>"#,
            escape(&self.configuration_token)
        );

        let response = self
            .camera
            .send_soap_request(&self.service_path, &request_body)
            .await?;

        parse_rules(&response)
    }

    pub async fn get_rule_by_name(&self, rule_name: &str) -> Result<Rule, ClientError> {
        self.get_rules()
            .await?
            .into_iter()
            .find(|rule| rule.name == rule_name)
            .ok_or_else(|| ClientError::NotFound(format!("rule {}", rule_name)))
    }

    /// Reads the rule, replaces the given SimpleItems and writes it back.
    pub async fn modify_rule(&self, rule_name: &str, updates: &[(String, String)]) -> Result<(), ClientError> {
        let mut rule = self.get_rule_by_name(rule_name).await?;

        let applied = rule.apply(updates);
        if applied != updates.len() {
            tracing::warn!("Some parameters for rule {} may not have been set!", rule_name);
        }

        self.modify_rules(&rule).await
    }

    /// Only SimpleItem parameters are sent back; the tamper rule carries no ElementItems.
    pub async fn modify_rules(&self, rule: &Rule) -> Result<(), ClientError> {
        let items: String = rule
            .parameters
            .iter()
            .map(|item| format!(r#"<tt:SimpleItem Name="{}" Value="{}"/>"#, escape(&item.name), escape(&item.value)))
            .collect();

        let request_body = format!(
            r#"<tan:ModifyRules><tan:ConfigurationToken>{}</tan:ConfigurationToken><tan:Rule Name="{}" Type="{}"><tt:Parameters>{}</tt:Parameters></tan:Rule></tan:ModifyRules>"#,
            escape(&self.configuration_token),
            escape(&rule.name),
            escape(&rule.rule_type),
            items
        );

        self.camera
            .send_soap_request(&self.service_path, &request_body)
            .await?;

        Ok(())
    }

    pub async fn delete_rules(&self, rule_name: &str) -> Result<(), ClientError> {
        let request_body = format!(
            r#"<tan:DeleteRules><tan:ConfigurationToken>{}</tan:ConfigurationToken><tan:RuleName>{}</tan:RuleName></tan:DeleteRules>"#,
            escape(&self.configuration_token),
            escape(rule_name)
        );

        self.camera
            .send_soap_request(&self.service_path, &request_body)
            .await?;

        Ok(())
    }
}

fn attribute(e: &BytesStart, name: &str) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == name.as_bytes())
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}

/// Parses `RuleDescription` elements with their vendor `SimpleItemBounds`
/// and `SimpleItemDefaultValue` extension items.
pub fn parse_supported_rules(xml: &str) -> Result<Vec<RuleDescription>, ClientError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut rules = Vec::new();
    let mut current: Option<RuleDescription> = None;
    let mut bounded_item: Option<String> = None;
    let mut buf = Vec::new();

    loop {
        let (e, empty) = match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => (e.into_owned(), false),
            Ok(Event::Empty(e)) => (e.into_owned(), true),
            Ok(Event::End(e)) => {
                match e.local_name().as_ref() {
                    b"RuleDescription" => {
                        if let Some(rule) = current.take() {
                            rules.push(rule);
                        }
                    }
                    b"SimpleItemBounds" => bounded_item = None,
                    _ => {}
                }
                buf.clear();
                continue;
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ClientError::Malformed(format!("GetSupportedRules: {}", e))),
            _ => {
                buf.clear();
                continue;
            }
        };

        match e.local_name().as_ref() {
            b"RuleDescription" => {
                let rule = RuleDescription {
                    name: attribute(&e, "Name").unwrap_or_default(),
                    bounds: Vec::new(),
                };
                if empty {
                    rules.push(rule);
                } else {
                    current = Some(rule);
                }
            }
            b"SimpleItemBounds" => {
                if !empty {
                    bounded_item = attribute(&e, "Name");
                }
            }
            b"Min" | b"Max" => {
                if let (Some(rule), Some(item)) = (current.as_mut(), bounded_item.as_ref()) {
                    let value = attribute(&e, "Value");
                    let bounds = rule.item_mut(item);
                    if e.local_name().as_ref() == b"Min" {
                        bounds.min = value;
                    } else {
                        bounds.max = value;
                    }
                }
            }
            b"SimpleItemDefaultValue" => {
                if let (Some(rule), Some(item)) = (current.as_mut(), attribute(&e, "Name")) {
                    rule.item_mut(&item).default = attribute(&e, "Value");
                }
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(rules)
}

/// Parses configured `Rule` elements and their top-level SimpleItems.
pub fn parse_rules(xml: &str) -> Result<Vec<Rule>, ClientError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut rules = Vec::new();
    let mut current: Option<Rule> = None;
    let mut element_item_depth = 0usize;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"Rule" => {
                    current = Some(Rule {
                        name: attribute(&e, "Name").unwrap_or_default(),
                        rule_type: attribute(&e, "Type").unwrap_or_default(),
                        parameters: Vec::new(),
                    });
                }
                b"ElementItem" => element_item_depth += 1,
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"SimpleItem" && element_item_depth == 0 {
                    if let (Some(rule), Some(name)) = (current.as_mut(), attribute(&e, "Name")) {
                        rule.parameters.push(SimpleItem {
                            name,
                            value: attribute(&e, "Value").unwrap_or_default(),
                        });
                    }
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"Rule" => {
                    if let Some(rule) = current.take() {
                        rules.push(rule);
                    }
                }
                b"ElementItem" => element_item_depth = element_item_depth.saturating_sub(1),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ClientError::Malformed(format!("GetRules: {}", e))),
            _ => {}
        }
        buf.clear();
    }

    Ok(rules)
}
