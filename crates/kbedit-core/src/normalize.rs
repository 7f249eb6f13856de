// Kbedit Rule Normalizer
// Converts between nested Karabiner rule-groups and flat rule records

use indexmap::{IndexMap, IndexSet};

use crate::karabiner::{Manipulator, RuleGroup};
use crate::model::{ConfigurationId, NewRule, Rule};

/// Gap between the orders of consecutive imported rule-groups.
///
/// Manipulator `j` of group `i` gets order `i * ORDER_SPACING + j`, which
/// leaves room to insert rules between original groups without
/// renumbering everything.
pub const ORDER_SPACING: i64 = 100;

/// Anything that can be re-nested into a rule-group
pub trait FlatRule {
    /// The grouping key
    fn description(&self) -> &str;

    /// The manipulator this record stands for
    fn to_manipulator(&self) -> Manipulator;
}

impl FlatRule for Rule {
    fn description(&self) -> &str {
        &self.description
    }

    fn to_manipulator(&self) -> Manipulator {
        manipulator_from_parts(
            &self.description,
            &self.kind,
            self.from_key.as_ref(),
            (!self.to_absent || !self.to_actions.is_empty()).then_some(&self.to_actions),
            self.conditions.as_ref(),
            &self.extra,
        )
    }
}

impl FlatRule for NewRule {
    fn description(&self) -> &str {
        &self.description
    }

    fn to_manipulator(&self) -> Manipulator {
        manipulator_from_parts(
            &self.description,
            &self.kind,
            self.from_key.as_ref(),
            (!self.to_absent || !self.to_actions.is_empty()).then_some(&self.to_actions),
            self.conditions.as_ref(),
            &self.extra,
        )
    }
}

fn manipulator_from_parts(
    description: &str,
    kind: &str,
    from: Option<&serde_json::Value>,
    to: Option<&Vec<serde_json::Value>>,
    conditions: Option<&Vec<serde_json::Value>>,
    extra: &serde_json::Map<String, serde_json::Value>,
) -> Manipulator {
    Manipulator {
        description: Some(description.to_string()),
        kind: kind.to_string(),
        from: from.cloned(),
        to: to.cloned(),
        conditions: conditions.cloned(),
        extra: extra.clone(),
    }
}

/// Flatten rule-groups into one rule per manipulator, using [`ORDER_SPACING`]
pub fn groups_to_rules(configuration_id: ConfigurationId, groups: &[RuleGroup]) -> Vec<NewRule> {
    groups_to_rules_spaced(configuration_id, groups, ORDER_SPACING)
}

/// Flatten rule-groups with an explicit order spacing.
///
/// A manipulator's own description wins over its group's. `from` is kept
/// exactly as given: an absent trigger stays `None` and is never turned
/// into the empty "hardware button" object.
pub fn groups_to_rules_spaced(
    configuration_id: ConfigurationId,
    groups: &[RuleGroup],
    order_spacing: i64,
) -> Vec<NewRule> {
    let mut rules = Vec::new();

    for (i, group) in groups.iter().enumerate() {
        for (j, manipulator) in group.manipulators.iter().enumerate() {
            let description = manipulator
                .description
                .clone()
                .unwrap_or_else(|| group.description.clone());

            rules.push(NewRule {
                configuration_id,
                description,
                kind: manipulator.kind.clone(),
                enabled: true,
                from_key: manipulator.from.clone(),
                to_actions: manipulator.to.clone().unwrap_or_default(),
                to_absent: manipulator.to.is_none(),
                conditions: manipulator.conditions.clone(),
                order: i as i64 * order_spacing + j as i64,
                extra: manipulator.extra.clone(),
            });
        }
    }

    log::trace!(
        "flattened {} rule-groups into {} rules",
        groups.len(),
        rules.len()
    );
    rules
}

/// Re-nest flat rules (already sorted by order) into rule-groups.
///
/// Rules are partitioned by description in first-seen order. Rules sharing
/// a description land in the same group even when they are not adjacent,
/// keeping their relative input order.
pub fn rules_to_groups<R: FlatRule>(rules: &[R]) -> Vec<RuleGroup> {
    let mut groups: IndexMap<&str, Vec<Manipulator>> = IndexMap::new();

    for rule in rules {
        groups
            .entry(rule.description())
            .or_default()
            .push(rule.to_manipulator());
    }

    groups
        .into_iter()
        .map(|(description, manipulators)| RuleGroup::new(description, manipulators))
        .collect()
}

/// Distinct group descriptions in first-seen order
pub fn group_descriptions<R: FlatRule>(rules: &[R]) -> Vec<&str> {
    rules
        .iter()
        .map(|rule| rule.description())
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn group(description: &str, keys: &[&str]) -> RuleGroup {
        RuleGroup::new(
            description,
            keys.iter()
                .map(|key| {
                    Manipulator::new(
                        "basic",
                        Some(json!({"key_code": key})),
                        Some(vec![json!({"key_code": "escape"})]),
                    )
                })
                .collect(),
        )
    }

    fn stored(rules: Vec<NewRule>) -> Vec<Rule> {
        rules
            .into_iter()
            .enumerate()
            .map(|(i, rule)| Rule::from_new(i as u32 + 1, rule))
            .collect()
    }

    #[test]
    fn test_flatten_orders_by_group_and_manipulator() {
        let groups = vec![group("first", &["a", "b"]), group("second", &["c"])];
        let rules = groups_to_rules(1, &groups);

        let orders: Vec<_> = rules.iter().map(|r| r.order).collect();
        assert_eq!(orders, vec![0, 1, 100]);
        assert!(rules.iter().all(|r| r.configuration_id == 1 && r.enabled));
        assert_eq!(rules[2].description, "second");
    }

    #[test]
    fn test_flatten_custom_spacing() {
        let groups = vec![group("first", &["a"]), group("second", &["b", "c"])];
        let rules = groups_to_rules_spaced(1, &groups, 10);
        let orders: Vec<_> = rules.iter().map(|r| r.order).collect();
        assert_eq!(orders, vec![0, 10, 11]);
    }

    #[test]
    fn test_flatten_prefers_manipulator_description() {
        let mut g = group("group", &["a"]);
        g.manipulators[0].description = Some("own".to_string());
        let rules = groups_to_rules(1, &[g]);
        assert_eq!(rules[0].description, "own");
    }

    #[test]
    fn test_flatten_keeps_absent_trigger_absent() {
        let groups = vec![RuleGroup::new(
            "odd",
            vec![
                Manipulator::new("basic", None, None),
                Manipulator::new("basic", Some(json!({})), None),
            ],
        )];
        let rules = groups_to_rules(1, &groups);

        assert_eq!(rules[0].from_key, None);
        assert_eq!(rules[1].from_key, Some(json!({})));
        assert!(rules[0].to_actions.is_empty());
        assert_eq!(rules[0].conditions, None);
    }

    #[test]
    fn test_regroup_merges_non_adjacent_descriptions() {
        let rules = stored(vec![
            NewRule::new(1, "x", "basic", Some(json!({"key_code": "a"}))),
            NewRule::new(1, "y", "basic", Some(json!({"key_code": "b"}))),
            NewRule::new(1, "x", "basic", Some(json!({"key_code": "c"}))),
        ]);

        let groups = rules_to_groups(&rules);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].description, "x");
        assert_eq!(groups[1].description, "y");

        let keys: Vec<_> = groups[0]
            .manipulators
            .iter()
            .map(|m| m.from.as_ref().unwrap()["key_code"].clone())
            .collect();
        assert_eq!(keys, vec![json!("a"), json!("c")]);
    }

    #[test]
    fn test_regroup_omits_absent_conditions() {
        let rules = stored(vec![NewRule::new(1, "x", "basic", Some(json!({"key_code": "a"})))
            .with_actions(vec![json!({"key_code": "b"})])]);

        let value = serde_json::to_value(rules_to_groups(&rules)).unwrap();
        let manipulator = &value[0]["manipulators"][0];
        assert!(manipulator.get("conditions").is_none());
        assert_eq!(manipulator["description"], json!("x"));
        assert_eq!(manipulator["to"], json!([{"key_code": "b"}]));
    }

    #[test]
    fn test_round_trip_keeps_explicit_empty_actions() {
        let explicit = Manipulator::new("basic", Some(json!({"key_code": "a"})), Some(vec![]));
        let absent = Manipulator::new("basic", Some(json!({"key_code": "b"})), None);
        let mut groups = vec![RuleGroup::new("g", vec![explicit, absent])];
        for manipulator in &mut groups[0].manipulators {
            manipulator.description = Some("g".to_string());
        }

        let rules = stored(groups_to_rules(1, &groups));
        assert!(!rules[0].to_absent);
        assert!(rules[1].to_absent);

        let regrouped = rules_to_groups(&rules);
        assert_eq!(regrouped, groups);
        let value = serde_json::to_value(&regrouped).unwrap();
        assert_eq!(value[0]["manipulators"][0]["to"], json!([]));
        assert!(value[0]["manipulators"][1].get("to").is_none());
    }

    #[test]
    fn test_regroup_writes_empty_actions_of_hand_made_rules() {
        let rules = stored(vec![NewRule::new(1, "x", "basic", Some(json!({"key_code": "a"})))]);
        let groups = rules_to_groups(&rules);
        assert_eq!(groups[0].manipulators[0].to, Some(vec![]));
    }

    #[test]
    fn test_regroup_keeps_explicit_empty_conditions() {
        let rules = stored(vec![
            NewRule::new(1, "x", "basic", Some(json!({"key_code": "a"}))).with_conditions(vec![]),
        ]);
        let groups = rules_to_groups(&rules);
        assert_eq!(groups[0].manipulators[0].conditions, Some(vec![]));
    }

    #[test]
    fn test_round_trip_restores_extra_fields() {
        let mut g = group("caps", &["caps_lock"]);
        g.manipulators[0]
            .extra
            .insert("to_if_alone".to_string(), json!([{"key_code": "escape"}]));
        g.manipulators[0].description = Some("caps".to_string());

        let rules = groups_to_rules(4, std::slice::from_ref(&g));
        assert_eq!(rules_to_groups(&rules), vec![g]);
    }

    #[test]
    fn test_group_descriptions_first_seen() {
        let rules = stored(vec![
            NewRule::new(1, "b", "basic", None),
            NewRule::new(1, "a", "basic", None),
            NewRule::new(1, "b", "basic", None),
        ]);
        assert_eq!(group_descriptions(&rules), vec!["b", "a"]);
    }
}
