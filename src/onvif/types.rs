use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceInformation {
    pub manufacturer: String,
    pub model: String,
    pub firmware_version: String,
    pub serial_number: String,
    pub hardware_id: String,
}

/// One configured analytics rule as returned by `GetRules`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rule {
    pub name: String,
    pub rule_type: String,
    pub parameters: Vec<SimpleItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SimpleItem {
    pub name: String,
    pub value: String,
}

/// Vendor extension bounds for one parameter of a supported rule.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemBounds {
    pub name: String,
    pub min: Option<String>,
    pub max: Option<String>,
    pub default: Option<String>,
}

/// A rule type from `GetSupportedRules` with its parameter bounds.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleDescription {
    pub name: String,
    pub bounds: Vec<ItemBounds>,
}

impl Rule {
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|item| item.name == name)
            .map(|item| item.value.as_str())
    }

    /// Replaces the values of parameters already on the rule. Returns how many were set.
    pub fn apply(&mut self, updates: &[(String, String)]) -> usize {
        let mut applied = 0;
        for item in self.parameters.iter_mut() {
            if let Some((_, value)) = updates.iter().find(|(name, _)| *name == item.name) {
                item.value = value.clone();
                applied += 1;
            }
        }
        applied
    }
}

impl RuleDescription {
    pub fn item(&self, name: &str) -> Option<&ItemBounds> {
        self.bounds.iter().find(|b| b.name == name)
    }

    pub(crate) fn item_mut(&mut self, name: &str) -> &mut ItemBounds {
        if let Some(pos) = self.bounds.iter().position(|b| b.name == name) {
            return &mut self.bounds[pos];
        }
        self.bounds.push(ItemBounds {
            name: name.to_string(),
            ..Default::default()
        });
        let last = self.bounds.len() - 1;
        &mut self.bounds[last]
    }
}
