// Kbedit Edit Session
// Rule editing against one selected configuration, with change tracking

use crate::analysis::{find_key_conflicts, ChangeKind, KeyConflict, RuleDiff, SessionTracker};
use crate::assistant::{CombinationError, KeySuggestion};
use crate::karabiner::RuleGroup;
use crate::model::{ConfigurationId, NewRule, Rule, RuleId, RulePatch};
use crate::normalize::groups_to_rules;
use crate::store::{Store, StoreError};
use crate::validate::{validate_new_rule, validate_rule_patch, ValidationError, ValidationReport};

#[derive(Debug, thiserror::Error)]
pub enum EditError {
    #[error("No configuration selected")]
    NoConfigurationSelected,

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: u32 },

    #[error("Invalid rule: {0}")]
    Validation(#[from] ValidationError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid suggestion: {0}")]
    Suggestion(#[from] CombinationError),
}

/// Editing state for one user working on one configuration at a time.
///
/// Every rule created here is assigned to the selected configuration and
/// recorded in the session's change tracking.
pub struct EditSession<'a, S: Store + ?Sized> {
    store: &'a S,
    tracker: SessionTracker,
}

impl<'a, S: Store + ?Sized> EditSession<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            tracker: SessionTracker::new(),
        }
    }

    pub fn store(&self) -> &'a S {
        self.store
    }

    pub fn tracker(&self) -> &SessionTracker {
        &self.tracker
    }

    /// Select a configuration. Switching to another one retakes the
    /// baseline and drops all tracking; returns whether that happened.
    pub fn select(&mut self, id: ConfigurationId) -> Result<bool, EditError> {
        if self.store.configuration(id)?.is_none() {
            return Err(EditError::NotFound {
                entity: "Configuration",
                id,
            });
        }
        let rules = self.store.rules_for_configuration(id)?;
        let reset = self.tracker.select(id, &rules);
        if reset {
            log::debug!("selected configuration {} with {} rules", id, rules.len());
        }
        Ok(reset)
    }

    pub fn selected(&self) -> Option<ConfigurationId> {
        self.tracker.configuration_id()
    }

    fn current(&self) -> Result<ConfigurationId, EditError> {
        self.selected().ok_or(EditError::NoConfigurationSelected)
    }

    /// Rules of the selected configuration in display order
    pub fn rules(&self) -> Result<Vec<Rule>, EditError> {
        Ok(self.store.rules_for_configuration(self.current()?)?)
    }

    /// Order that places a new rule after every existing one
    pub fn next_order(&self) -> Result<i64, EditError> {
        Ok(self
            .rules()?
            .iter()
            .map(|rule| rule.order)
            .max()
            .map_or(0, |max| max + 1))
    }

    /// Rule of the selected configuration, or `NotFound`
    fn owned_rule(&self, id: RuleId) -> Result<Rule, EditError> {
        let configuration_id = self.current()?;
        match self.store.rule(id)? {
            Some(rule) if rule.configuration_id == configuration_id => Ok(rule),
            _ => Err(EditError::NotFound { entity: "Rule", id }),
        }
    }

    /// Append a hand-made rule
    pub fn create_rule(&mut self, mut new: NewRule) -> Result<Rule, EditError> {
        new.configuration_id = self.current()?;
        validate_new_rule(&new)?;
        new.order = self.next_order()?;

        let rule = self.store.create_rule(new)?;
        self.tracker.mark_edited(rule.id);
        Ok(rule)
    }

    /// Update a rule of the selected configuration
    pub fn update_rule(&mut self, id: RuleId, patch: RulePatch) -> Result<Rule, EditError> {
        validate_rule_patch(&patch)?;
        self.owned_rule(id)?;

        let rule = self
            .store
            .update_rule(id, patch)?
            .ok_or(EditError::NotFound { entity: "Rule", id })?;
        self.tracker.mark_edited(rule.id);
        Ok(rule)
    }

    pub fn set_enabled(&mut self, id: RuleId, enabled: bool) -> Result<Rule, EditError> {
        self.update_rule(id, RulePatch::enabled(enabled))
    }

    /// Delete a rule of the selected configuration; `false` if it was gone
    pub fn delete_rule(&mut self, id: RuleId) -> Result<bool, EditError> {
        match self.owned_rule(id) {
            Ok(_) => {}
            Err(EditError::NotFound { .. }) => return Ok(false),
            Err(err) => return Err(err),
        }
        let deleted = self.store.delete_rule(id)?;
        self.tracker.forget(id);
        Ok(deleted)
    }

    /// Renumber the listed rules by position
    pub fn reorder(&mut self, rule_ids: &[RuleId]) -> Result<(), EditError> {
        Ok(self.store.reorder_rules(self.current()?, rule_ids)?)
    }

    /// Create the rule skeleton for an accepted suggestion
    pub fn accept_suggestion(&mut self, suggestion: &KeySuggestion) -> Result<Rule, EditError> {
        let configuration_id = self.current()?;
        let new = suggestion.to_new_rule(configuration_id, self.next_order()?)?;
        validate_new_rule(&new)?;

        let rule = self.store.create_rule(new)?;
        self.tracker.mark_ai_added(rule.id);
        log::info!("added suggested rule {} for {}", rule.id, suggestion.combination);
        Ok(rule)
    }

    /// Add rule-groups from an accepted snippet after the existing rules.
    ///
    /// All flattened rules are validated before the first insert.
    pub fn accept_groups(&mut self, groups: &[RuleGroup]) -> Result<Vec<Rule>, EditError> {
        let configuration_id = self.current()?;
        let base = self.next_order()?;
        let mut new_rules = groups_to_rules(configuration_id, groups);
        for new in &mut new_rules {
            new.order += base;
            validate_new_rule(new)?;
        }

        let mut created = Vec::with_capacity(new_rules.len());
        for new in new_rules {
            let rule = self.store.create_rule(new)?;
            self.tracker.mark_ai_added(rule.id);
            created.push(rule);
        }
        Ok(created)
    }

    pub fn classify(&self, id: RuleId) -> ChangeKind {
        self.tracker.classify(id)
    }

    pub fn diff(&self) -> Result<RuleDiff, EditError> {
        Ok(self.tracker.diff(&self.rules()?))
    }

    pub fn conflicts(&self) -> Result<Vec<KeyConflict>, EditError> {
        Ok(find_key_conflicts(&self.rules()?))
    }

    pub fn report(&self) -> Result<ValidationReport, EditError> {
        Ok(ValidationReport::build(&self.rules()?))
    }
}
