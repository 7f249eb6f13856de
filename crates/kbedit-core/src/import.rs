// Kbedit Configuration Importer
// Locates the rule list in a Karabiner document, detects near-duplicate
// configurations, and stores the flattened rules

use indexmap::IndexSet;
use serde_json::{json, Value};

use crate::karabiner::{parse_rule_groups, RuleGroup};
use crate::model::{
    Configuration, ConfigurationId, ConfigurationPatch, NewConfiguration, NewRule, Rule,
};
use crate::normalize::{group_descriptions, groups_to_rules_spaced, ORDER_SPACING};
use crate::store::{Store, StoreError};
use crate::validate::{emits_actions, validate_new_configuration, ValidationError};

/// Share of sorted rule-group descriptions that must match position-wise
/// for two configurations of equal group count to count as duplicates
pub const DUPLICATE_SIMILARITY_THRESHOLD: f64 = 0.8;

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("No valid rules found in configuration")]
    NoRules,

    #[error("Invalid configuration: {0}")]
    Validation(#[from] ValidationError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Earlier inserts are not rolled back; re-query the configuration
    #[error("Import into configuration {configuration_id} stopped after {inserted} rules: {source}")]
    InsertFailed {
        configuration_id: ConfigurationId,
        inserted: usize,
        #[source]
        source: StoreError,
    },
}

/// Tunables of the import
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImportOptions {
    pub similarity_threshold: f64,
    pub order_spacing: i64,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            similarity_threshold: DUPLICATE_SIMILARITY_THRESHOLD,
            order_spacing: ORDER_SPACING,
        }
    }
}

/// What an import did
#[derive(Debug, Clone, PartialEq)]
pub enum ImportOutcome {
    /// Rules were stored, either in a new configuration or replacing the
    /// rules of an existing one
    Imported {
        configuration: Configuration,
        rules: Vec<Rule>,
        replaced: bool,
    },
    /// A near-duplicate exists and replacing was not requested; nothing changed
    Conflict { existing: Configuration },
}

/// The rule list found in a document, with the title to store it under
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted<'a> {
    pub title: String,
    pub rules: &'a [Value],
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Find the rule array of a Karabiner document.
///
/// A full export's `profiles[0].complex_modifications.rules` wins over a
/// top-level `rules` array. Only the presence of those arrays is checked;
/// the rule-groups inside are read leniently later.
pub fn extract_rules<'a>(name: &str, document: &'a Value) -> Result<Extracted<'a>, ImportError> {
    if let Some(rules) = document
        .pointer("/profiles/0/complex_modifications/rules")
        .and_then(Value::as_array)
    {
        let title = non_empty_str(document.pointer("/profiles/0/name")).unwrap_or(name);
        log::debug!("importing {} rule-groups from profile '{}'", rules.len(), title);
        return Ok(Extracted {
            title: title.to_string(),
            rules,
        });
    }

    if let Some(rules) = document.get("rules").and_then(Value::as_array) {
        let title = non_empty_str(document.get("title")).unwrap_or(name);
        log::debug!("importing {} rule-groups from document '{}'", rules.len(), title);
        return Ok(Extracted {
            title: title.to_string(),
            rules,
        });
    }

    Err(ImportError::NoRules)
}

fn descriptions_similar(existing: &mut [&str], incoming: &[&str], threshold: f64) -> bool {
    if incoming.is_empty() || existing.len() != incoming.len() {
        return false;
    }
    existing.sort_unstable();
    let matches = existing
        .iter()
        .zip(incoming)
        .filter(|(a, b)| a == b)
        .count();
    matches as f64 / incoming.len() as f64 >= threshold
}

/// First existing configuration that looks like the incoming one.
///
/// A configuration matches when its name equals `title`, or when it has
/// the same number of rule-groups and, with both description lists sorted,
/// at least `threshold` of the positions hold equal strings.
pub fn find_duplicate_configuration<S: Store + ?Sized>(
    store: &S,
    title: &str,
    groups: &[RuleGroup],
    threshold: f64,
) -> Result<Option<Configuration>, StoreError> {
    let mut incoming: Vec<&str> = groups
        .iter()
        .map(|g| g.description.as_str())
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect();
    incoming.sort_unstable();

    for configuration in store.all_configurations()? {
        if configuration.name == title {
            log::debug!("configuration {} has the same name", configuration.id);
            return Ok(Some(configuration));
        }

        let rules = store.rules_for_configuration(configuration.id)?;
        let mut existing = group_descriptions(&rules);
        if descriptions_similar(&mut existing, &incoming, threshold) {
            log::debug!(
                "configuration {} has matching rule-group descriptions",
                configuration.id
            );
            return Ok(Some(configuration));
        }
    }
    Ok(None)
}

// A manipulator with neither a trigger nor anything to emit cannot be
// stored; it is dropped here with a warning.
fn flatten_storable(
    configuration_id: ConfigurationId,
    groups: &[RuleGroup],
    order_spacing: i64,
) -> Vec<NewRule> {
    groups_to_rules_spaced(configuration_id, groups, order_spacing)
        .into_iter()
        .filter(|rule| {
            let storable = rule.from_key.is_some() || emits_actions(&rule.to_actions, &rule.extra);
            if !storable {
                log::warn!(
                    "rule-group '{}': skipping manipulator with no trigger and no actions",
                    rule.description
                );
            }
            storable
        })
        .collect()
}

/// Import a parsed Karabiner document under `name`.
///
/// With a near-duplicate present, either reports a conflict or, when
/// `replace_existing` is set, swaps that configuration's rules for the new
/// ones. Otherwise creates a new configuration and inserts its rules one
/// by one, stopping at the first failed insert.
pub fn import_configuration<S: Store + ?Sized>(
    store: &S,
    name: &str,
    document: &Value,
    replace_existing: bool,
    options: &ImportOptions,
) -> Result<ImportOutcome, ImportError> {
    let extracted = extract_rules(name, document)?;
    let groups = parse_rule_groups(extracted.rules);
    let new_configuration = NewConfiguration {
        name: extracted.title.clone(),
        data: json!({"title": extracted.title, "rules": extracted.rules}),
    };
    validate_new_configuration(&new_configuration)?;

    let duplicate = find_duplicate_configuration(
        store,
        &new_configuration.name,
        &groups,
        options.similarity_threshold,
    )?;

    if let Some(existing) = duplicate {
        if !replace_existing {
            log::info!(
                "'{}' looks like existing configuration {} ('{}'), not importing",
                new_configuration.name,
                existing.id,
                existing.name
            );
            return Ok(ImportOutcome::Conflict { existing });
        }

        let rules = flatten_storable(existing.id, &groups, options.order_spacing);
        let patch = ConfigurationPatch {
            name: Some(new_configuration.name),
            data: Some(new_configuration.data),
        };
        let (configuration, rules) = store
            .replace_rules(existing.id, patch, rules)?
            .ok_or(StoreError::UnknownConfiguration(existing.id))?;

        log::info!(
            "replaced configuration {} with {} rules",
            configuration.id,
            rules.len()
        );
        return Ok(ImportOutcome::Imported {
            configuration,
            rules,
            replaced: true,
        });
    }

    let configuration = store.create_configuration(new_configuration)?;
    let new_rules = flatten_storable(configuration.id, &groups, options.order_spacing);
    let mut rules = Vec::with_capacity(new_rules.len());
    for new_rule in new_rules {
        match store.create_rule(new_rule) {
            Ok(rule) => rules.push(rule),
            Err(source) => {
                log::warn!(
                    "import into configuration {} failed after {} rules: {}",
                    configuration.id,
                    rules.len(),
                    source
                );
                return Err(ImportError::InsertFailed {
                    configuration_id: configuration.id,
                    inserted: rules.len(),
                    source,
                });
            }
        }
    }

    log::info!(
        "imported configuration {} ('{}') with {} rules",
        configuration.id,
        configuration.name,
        rules.len()
    );
    Ok(ImportOutcome::Imported {
        configuration,
        rules,
        replaced: false,
    })
}
