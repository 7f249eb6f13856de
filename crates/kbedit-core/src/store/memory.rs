// Kbedit Memory Store
// RwLock-guarded in-memory tables with optional JSON snapshot persistence

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::{Store, StoreError};
use crate::model::{
    Configuration, ConfigurationId, ConfigurationPatch, NewConfiguration, NewRule, Rule, RuleId,
    RulePatch,
};

/// Serializable image of a [`MemoryStore`], id counters included so ids
/// are never handed out twice across reloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    pub next_configuration_id: ConfigurationId,
    pub next_rule_id: RuleId,
    pub configurations: Vec<Configuration>,
    pub rules: Vec<Rule>,
}

impl Default for StoreSnapshot {
    fn default() -> Self {
        Self {
            next_configuration_id: 1,
            next_rule_id: 1,
            configurations: Vec::new(),
            rules: Vec::new(),
        }
    }
}

#[derive(Debug)]
struct Tables {
    // IndexMap keeps insertion order, which breaks ties between equal orders
    configurations: IndexMap<ConfigurationId, Configuration>,
    rules: IndexMap<RuleId, Rule>,
    next_configuration_id: ConfigurationId,
    next_rule_id: RuleId,
}

impl Tables {
    fn insert_rule(&mut self, new: NewRule) -> Result<Rule, StoreError> {
        if !self.configurations.contains_key(&new.configuration_id) {
            return Err(StoreError::UnknownConfiguration(new.configuration_id));
        }
        let id = self.next_rule_id;
        self.next_rule_id += 1;
        let rule = Rule::from_new(id, new);
        self.rules.insert(id, rule.clone());
        Ok(rule)
    }

    fn remove_rules_of(&mut self, configuration_id: ConfigurationId) -> usize {
        let before = self.rules.len();
        self.rules
            .retain(|_, rule| rule.configuration_id != configuration_id);
        before - self.rules.len()
    }

    fn apply_configuration_patch(
        &mut self,
        id: ConfigurationId,
        patch: ConfigurationPatch,
    ) -> Option<Configuration> {
        let configuration = self.configurations.get_mut(&id)?;
        if let Some(name) = patch.name {
            configuration.name = name;
        }
        if let Some(data) = patch.data {
            configuration.data = data;
        }
        Some(configuration.clone())
    }

    fn sorted_rules(&self, configuration_id: ConfigurationId) -> Vec<Rule> {
        let mut rules: Vec<Rule> = self
            .rules
            .values()
            .filter(|rule| rule.configuration_id == configuration_id)
            .cloned()
            .collect();
        rules.sort_by_key(|rule| rule.order);
        rules
    }
}

/// In-memory [`Store`] with incrementing integer ids starting at 1
#[derive(Debug)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::from_snapshot(StoreSnapshot::default())
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let configurations: IndexMap<_, _> = snapshot
            .configurations
            .into_iter()
            .map(|config| (config.id, config))
            .collect();
        let rules: IndexMap<_, _> = snapshot
            .rules
            .into_iter()
            .map(|rule| (rule.id, rule))
            .collect();

        // Never reuse an id even if the counters in the file are stale
        let next_configuration_id = configurations
            .keys()
            .max()
            .map_or(1, |max| max + 1)
            .max(snapshot.next_configuration_id);
        let next_rule_id = rules
            .keys()
            .max()
            .map_or(1, |max| max + 1)
            .max(snapshot.next_rule_id);

        Self {
            tables: RwLock::new(Tables {
                configurations,
                rules,
                next_configuration_id,
                next_rule_id,
            }),
        }
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let tables = self.tables.read();
        StoreSnapshot {
            next_configuration_id: tables.next_configuration_id,
            next_rule_id: tables.next_rule_id,
            configurations: tables.configurations.values().cloned().collect(),
            rules: tables.rules.values().cloned().collect(),
        }
    }

    /// Load a snapshot file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let content = fs::read_to_string(path)?;
        let snapshot: StoreSnapshot = serde_json::from_str(&content)?;
        Ok(Self::from_snapshot(snapshot))
    }

    /// Load a snapshot file, or start empty when it does not exist yet
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            log::debug!("no store snapshot at {}, starting empty", path.display());
            Ok(Self::new())
        }
    }

    /// Write a pretty-printed snapshot, replacing the file atomically
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.snapshot())?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, path)?;
        log::debug!("saved store snapshot to {}", path.display());
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    fn all_configurations(&self) -> Result<Vec<Configuration>, StoreError> {
        Ok(self.tables.read().configurations.values().cloned().collect())
    }

    fn configuration(&self, id: ConfigurationId) -> Result<Option<Configuration>, StoreError> {
        Ok(self.tables.read().configurations.get(&id).cloned())
    }

    fn create_configuration(&self, new: NewConfiguration) -> Result<Configuration, StoreError> {
        let mut tables = self.tables.write();
        let id = tables.next_configuration_id;
        tables.next_configuration_id += 1;
        let configuration = Configuration {
            id,
            name: new.name,
            data: new.data,
        };
        tables.configurations.insert(id, configuration.clone());
        Ok(configuration)
    }

    fn update_configuration(
        &self,
        id: ConfigurationId,
        patch: ConfigurationPatch,
    ) -> Result<Option<Configuration>, StoreError> {
        Ok(self.tables.write().apply_configuration_patch(id, patch))
    }

    fn delete_configuration(&self, id: ConfigurationId) -> Result<bool, StoreError> {
        let mut tables = self.tables.write();
        if tables.configurations.shift_remove(&id).is_none() {
            return Ok(false);
        }
        let removed = tables.remove_rules_of(id);
        log::debug!("deleted configuration {} and {} rules", id, removed);
        Ok(true)
    }

    fn rules_for_configuration(&self, id: ConfigurationId) -> Result<Vec<Rule>, StoreError> {
        Ok(self.tables.read().sorted_rules(id))
    }

    fn rule(&self, id: RuleId) -> Result<Option<Rule>, StoreError> {
        Ok(self.tables.read().rules.get(&id).cloned())
    }

    fn create_rule(&self, new: NewRule) -> Result<Rule, StoreError> {
        self.tables.write().insert_rule(new)
    }

    fn update_rule(&self, id: RuleId, patch: RulePatch) -> Result<Option<Rule>, StoreError> {
        let mut tables = self.tables.write();
        Ok(tables.rules.get_mut(&id).map(|rule| {
            rule.apply(patch);
            rule.clone()
        }))
    }

    fn delete_rule(&self, id: RuleId) -> Result<bool, StoreError> {
        Ok(self.tables.write().rules.shift_remove(&id).is_some())
    }

    fn reorder_rules(
        &self,
        configuration_id: ConfigurationId,
        rule_ids: &[RuleId],
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        for (index, id) in rule_ids.iter().enumerate() {
            match tables.rules.get_mut(id) {
                Some(rule) if rule.configuration_id == configuration_id => {
                    rule.order = index as i64;
                }
                _ => log::debug!(
                    "reorder: rule {} is not part of configuration {}",
                    id,
                    configuration_id
                ),
            }
        }
        Ok(())
    }

    /// Delete, patch and insert under one write guard
    fn replace_rules(
        &self,
        id: ConfigurationId,
        patch: ConfigurationPatch,
        rules: Vec<NewRule>,
    ) -> Result<Option<(Configuration, Vec<Rule>)>, StoreError> {
        let mut tables = self.tables.write();
        if !tables.configurations.contains_key(&id) {
            return Ok(None);
        }

        let removed = tables.remove_rules_of(id);
        let Some(configuration) = tables.apply_configuration_patch(id, patch) else {
            return Ok(None);
        };

        let mut created = Vec::with_capacity(rules.len());
        for mut rule in rules {
            rule.configuration_id = id;
            created.push(tables.insert_rule(rule)?);
        }

        log::debug!(
            "replaced {} rules of configuration {} with {}",
            removed,
            id,
            created.len()
        );
        Ok(Some((configuration, created)))
    }
}
