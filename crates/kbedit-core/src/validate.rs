// Kbedit Validation
// Field checks run before any store mutation, plus the rule-set health report

use serde::Serialize;
use serde_json::{Map, Value};

use crate::analysis::conflict::{find_key_conflicts, KeyConflict};
use crate::model::{ConfigurationPatch, NewConfiguration, NewRule, Rule, RuleId, RulePatch};

/// Errors raised while validating rule or configuration input
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ValidationError {
    ValidationError::InvalidField {
        field,
        reason: reason.into(),
    }
}

fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(())
}

/// A trigger is either a bare key-code string or a descriptor object.
/// `{}` is a valid hardware-button trigger.
fn check_trigger(from: &Value) -> Result<(), ValidationError> {
    match from {
        Value::Object(_) => Ok(()),
        Value::String(code) if !code.trim().is_empty() => Ok(()),
        other => Err(invalid(
            "fromKey",
            format!("expected an object or key code, got {}", other),
        )),
    }
}

fn check_objects(field: &'static str, items: &[Value]) -> Result<(), ValidationError> {
    match items.iter().position(|item| !item.is_object()) {
        Some(index) => Err(invalid(field, format!("element {} is not an object", index))),
        None => Ok(()),
    }
}

/// Validate a rule before creation.
///
/// Actions may still be empty here; a hand-made rule is allowed to exist
/// without them until the rule set is checked with [`ValidationReport`].
pub fn validate_new_rule(rule: &NewRule) -> Result<(), ValidationError> {
    require_text("description", &rule.description)?;
    require_text("type", &rule.kind)?;
    let from = rule
        .from_key
        .as_ref()
        .ok_or(ValidationError::MissingField("fromKey"))?;
    check_trigger(from)?;
    check_objects("toActions", &rule.to_actions)?;
    if let Some(conditions) = &rule.conditions {
        check_objects("conditions", conditions)?;
    }
    Ok(())
}

/// Validate the fields a patch sets
pub fn validate_rule_patch(patch: &RulePatch) -> Result<(), ValidationError> {
    if let Some(description) = &patch.description {
        require_text("description", description)?;
    }
    if let Some(kind) = &patch.kind {
        require_text("type", kind)?;
    }
    if let Some(from) = &patch.from_key {
        check_trigger(from)?;
    }
    if let Some(actions) = &patch.to_actions {
        check_objects("toActions", actions)?;
    }
    if let Some(Some(conditions)) = &patch.conditions {
        check_objects("conditions", conditions)?;
    }
    Ok(())
}

pub fn validate_new_configuration(config: &NewConfiguration) -> Result<(), ValidationError> {
    require_text("name", &config.name)?;
    if !config.data.is_object() {
        return Err(invalid("data", "expected a JSON object"));
    }
    Ok(())
}

pub fn validate_configuration_patch(patch: &ConfigurationPatch) -> Result<(), ValidationError> {
    if let Some(name) = &patch.name {
        require_text("name", name)?;
    }
    if let Some(data) = &patch.data {
        if !data.is_object() {
            return Err(invalid("data", "expected a JSON object"));
        }
    }
    Ok(())
}

/// Errors from the quick document check used by the JSON editor
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("Invalid JSON format")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Missing required fields: title or rules")]
    MissingFields,

    #[error("Rules must be an array")]
    RulesNotArray,
}

/// Quick structural check of a simplified Karabiner document.
///
/// Needs a non-empty `title` or a `rules` field; `rules`, when present,
/// must be an array.
pub fn validate_karabiner_json(text: &str) -> Result<Value, DocumentError> {
    let data: Value = serde_json::from_str(text).map_err(DocumentError::InvalidJson)?;

    let has_title = data
        .get("title")
        .is_some_and(|title| !title.is_null() && title.as_str() != Some(""));
    let rules = data.get("rules").filter(|rules| !rules.is_null());

    if !has_title && rules.is_none() {
        return Err(DocumentError::MissingFields);
    }
    if rules.is_some_and(|rules| !rules.is_array()) {
        return Err(DocumentError::RulesNotArray);
    }
    Ok(data)
}

/// Problems that do not block storing a rule but make it useless to Karabiner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleProblem {
    MissingTrigger,
    NoActions,
    EmptyDescription,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleIssue {
    pub rule_id: RuleId,
    pub problem: RuleProblem,
}

/// Health summary of a configuration's rule set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub total: usize,
    pub enabled: usize,
    pub conflicts: Vec<KeyConflict>,
    pub issues: Vec<RuleIssue>,
}

/// True when the rule emits anything: `to` or one of the `to_*` variants
pub fn has_actions(rule: &Rule) -> bool {
    emits_actions(&rule.to_actions, &rule.extra)
}

/// [`has_actions`] over the raw parts of a rule
pub fn emits_actions(to_actions: &[Value], extra: &Map<String, Value>) -> bool {
    !to_actions.is_empty()
        || extra.iter().any(|(key, value)| {
            key.starts_with("to_") && value.as_array().is_some_and(|items| !items.is_empty())
        })
}

impl ValidationReport {
    pub fn build(rules: &[Rule]) -> Self {
        let mut issues = Vec::new();
        for rule in rules {
            if rule.description.trim().is_empty() {
                issues.push(RuleIssue {
                    rule_id: rule.id,
                    problem: RuleProblem::EmptyDescription,
                });
            }
            if rule.from_key.is_none() {
                issues.push(RuleIssue {
                    rule_id: rule.id,
                    problem: RuleProblem::MissingTrigger,
                });
            }
            if !has_actions(rule) {
                issues.push(RuleIssue {
                    rule_id: rule.id,
                    problem: RuleProblem::NoActions,
                });
            }
        }

        Self {
            total: rules.len(),
            enabled: rules.iter().filter(|rule| rule.enabled).count(),
            conflicts: find_key_conflicts(rules),
            issues,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty() && self.issues.is_empty()
    }
}
