// Kbedit Store
// Persistence contract for configurations and their rules

pub mod memory;

pub use memory::{MemoryStore, StoreSnapshot};

use crate::model::{
    Configuration, ConfigurationId, ConfigurationPatch, NewConfiguration, NewRule, Rule, RuleId,
    RulePatch,
};

/// Errors a store backend can raise
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Configuration not found: {0}")]
    UnknownConfiguration(ConfigurationId),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Key-value persistence of configurations and rules.
///
/// Lookups of unknown ids report `None`/`false` rather than an error.
/// Deleting a configuration deletes its rules.
pub trait Store: Send + Sync {
    fn all_configurations(&self) -> Result<Vec<Configuration>, StoreError>;

    fn configuration(&self, id: ConfigurationId) -> Result<Option<Configuration>, StoreError>;

    fn create_configuration(&self, new: NewConfiguration) -> Result<Configuration, StoreError>;

    fn update_configuration(
        &self,
        id: ConfigurationId,
        patch: ConfigurationPatch,
    ) -> Result<Option<Configuration>, StoreError>;

    fn delete_configuration(&self, id: ConfigurationId) -> Result<bool, StoreError>;

    /// Rules of a configuration sorted by `order`, ties in insertion order
    fn rules_for_configuration(&self, id: ConfigurationId) -> Result<Vec<Rule>, StoreError>;

    fn rule(&self, id: RuleId) -> Result<Option<Rule>, StoreError>;

    /// Fails with [`StoreError::UnknownConfiguration`] when the owner is missing
    fn create_rule(&self, new: NewRule) -> Result<Rule, StoreError>;

    fn update_rule(&self, id: RuleId, patch: RulePatch) -> Result<Option<Rule>, StoreError>;

    fn delete_rule(&self, id: RuleId) -> Result<bool, StoreError>;

    /// Set `order` of each listed rule to its position. Ids that are
    /// unknown or belong to another configuration are skipped.
    fn reorder_rules(&self, configuration_id: ConfigurationId, rule_ids: &[RuleId])
        -> Result<(), StoreError>;

    /// Swap a configuration's whole rule list and apply `patch` to it.
    ///
    /// Returns `None` when the configuration does not exist. This default
    /// runs the steps one after another; backends that can should override
    /// it so readers never see the configuration without rules.
    fn replace_rules(
        &self,
        id: ConfigurationId,
        patch: ConfigurationPatch,
        rules: Vec<NewRule>,
    ) -> Result<Option<(Configuration, Vec<Rule>)>, StoreError> {
        let Some(configuration) = self.update_configuration(id, patch)? else {
            return Ok(None);
        };

        for old in self.rules_for_configuration(id)? {
            self.delete_rule(old.id)?;
        }

        let mut created = Vec::with_capacity(rules.len());
        for mut rule in rules {
            rule.configuration_id = id;
            created.push(self.create_rule(rule)?);
        }
        Ok(Some((configuration, created)))
    }
}
