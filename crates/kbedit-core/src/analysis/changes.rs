// Kbedit Change Classification
// Session-scoped tracking of which rules were imported, AI-added or hand-made

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::model::{ConfigurationId, Rule, RuleId};

/// Where a rule in the current session came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeKind {
    /// Present in the baseline taken when the configuration was selected
    Imported,
    /// Created by accepting a recommendation
    AiAdded,
    /// Created or edited in the manual editor this session
    ManualAdded,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Imported => write!(f, "imported"),
            ChangeKind::AiAdded => write!(f, "ai-added"),
            ChangeKind::ManualAdded => write!(f, "manual-added"),
        }
    }
}

/// A rule together with its classification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedRule {
    pub rule: Rule,
    pub kind: ChangeKind,
}

/// Rules split into the untouched original set and everything added since
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RuleDiff {
    pub original: Vec<Rule>,
    pub added: Vec<ClassifiedRule>,
}

impl RuleDiff {
    /// True when nothing was added or edited
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
    }

    pub fn count(&self, kind: ChangeKind) -> usize {
        self.added.iter().filter(|c| c.kind == kind).count()
    }
}

/// Rule-id sets accumulated during one editing session.
///
/// Never persisted. Selecting a different configuration drops everything
/// and retakes the baseline.
#[derive(Debug, Clone, Default)]
pub struct SessionTracker {
    configuration_id: Option<ConfigurationId>,
    baseline: HashSet<RuleId>,
    ai_added: HashSet<RuleId>,
    edited: HashSet<RuleId>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn configuration_id(&self) -> Option<ConfigurationId> {
        self.configuration_id
    }

    /// Start tracking `configuration_id` with `rules` as the baseline.
    ///
    /// Re-selecting the configuration already tracked keeps the session;
    /// returns whether a reset happened.
    pub fn select(&mut self, configuration_id: ConfigurationId, rules: &[Rule]) -> bool {
        if self.configuration_id == Some(configuration_id) {
            return false;
        }

        self.configuration_id = Some(configuration_id);
        self.baseline = rules.iter().map(|rule| rule.id).collect();
        self.ai_added.clear();
        self.edited.clear();
        true
    }

    pub fn mark_ai_added(&mut self, id: RuleId) {
        self.ai_added.insert(id);
    }

    pub fn mark_edited(&mut self, id: RuleId) {
        self.edited.insert(id);
    }

    /// Drop a deleted rule from every set
    pub fn forget(&mut self, id: RuleId) {
        self.baseline.remove(&id);
        self.ai_added.remove(&id);
        self.edited.remove(&id);
    }

    pub fn is_baseline(&self, id: RuleId) -> bool {
        self.baseline.contains(&id)
    }

    /// Classify a rule id. AI-added wins over an edit; rules in neither
    /// set count as imported.
    pub fn classify(&self, id: RuleId) -> ChangeKind {
        if self.ai_added.contains(&id) {
            ChangeKind::AiAdded
        } else if self.edited.contains(&id) {
            ChangeKind::ManualAdded
        } else {
            ChangeKind::Imported
        }
    }

    /// Split `rules` for diff presentation, keeping their order
    pub fn diff(&self, rules: &[Rule]) -> RuleDiff {
        let mut diff = RuleDiff::default();
        for rule in rules {
            match self.classify(rule.id) {
                ChangeKind::Imported => diff.original.push(rule.clone()),
                kind => diff.added.push(ClassifiedRule {
                    rule: rule.clone(),
                    kind,
                }),
            }
        }
        diff
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewRule;

    fn rules(ids: &[RuleId]) -> Vec<Rule> {
        ids.iter()
            .map(|&id| Rule::from_new(id, NewRule::new(1, "r", "basic", None)))
            .collect()
    }

    #[test]
    fn test_classification_precedence() {
        let mut tracker = SessionTracker::new();
        tracker.select(1, &rules(&[1, 2]));
        tracker.mark_edited(2);
        tracker.mark_ai_added(3);
        tracker.mark_edited(3);
        tracker.mark_edited(4);

        assert_eq!(tracker.classify(1), ChangeKind::Imported);
        assert_eq!(tracker.classify(2), ChangeKind::ManualAdded);
        assert_eq!(tracker.classify(3), ChangeKind::AiAdded);
        assert_eq!(tracker.classify(4), ChangeKind::ManualAdded);
        assert!(tracker.is_baseline(2));
    }

    #[test]
    fn test_selecting_other_configuration_resets() {
        let mut tracker = SessionTracker::new();
        assert!(tracker.select(1, &rules(&[1])));
        tracker.mark_ai_added(5);

        assert!(!tracker.select(1, &rules(&[1, 5])));
        assert_eq!(tracker.classify(5), ChangeKind::AiAdded);

        assert!(tracker.select(2, &rules(&[9])));
        assert_eq!(tracker.classify(5), ChangeKind::Imported);
        assert!(tracker.is_baseline(9));
        assert!(!tracker.is_baseline(1));
    }

    #[test]
    fn test_diff_partitions_rules() {
        let mut tracker = SessionTracker::new();
        tracker.select(1, &rules(&[1, 2]));
        tracker.mark_ai_added(3);
        tracker.mark_edited(4);

        let diff = tracker.diff(&rules(&[1, 2, 3, 4]));
        assert_eq!(diff.original.len(), 2);
        assert_eq!(diff.added.len(), 2);
        assert_eq!(diff.count(ChangeKind::AiAdded), 1);
        assert_eq!(diff.count(ChangeKind::ManualAdded), 1);
        assert!(!diff.is_empty());
    }

    #[test]
    fn test_forget_removes_ids() {
        let mut tracker = SessionTracker::new();
        tracker.select(1, &rules(&[1]));
        tracker.mark_ai_added(2);
        tracker.forget(2);
        tracker.forget(1);
        assert_eq!(tracker.classify(2), ChangeKind::Imported);
        assert!(!tracker.is_baseline(1));
    }

    #[test]
    fn test_change_kind_display() {
        assert_eq!(ChangeKind::AiAdded.to_string(), "ai-added");
        assert_eq!(ChangeKind::ManualAdded.to_string(), "manual-added");
        assert_eq!(ChangeKind::Imported.to_string(), "imported");
    }
}
