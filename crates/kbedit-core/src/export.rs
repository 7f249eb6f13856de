// Kbedit Configuration Exporter
// Rebuilds a Karabiner document from a stored configuration

use crate::karabiner::KarabinerDocument;
use crate::model::ConfigurationId;
use crate::normalize::rules_to_groups;
use crate::store::{Store, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Configuration not found: {0}")]
    NotFound(ConfigurationId),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Export a configuration as `{title, rules}`.
///
/// The title is the configuration's current name. Rules are regrouped in
/// their stored order, disabled ones included.
pub fn export_configuration<S: Store + ?Sized>(
    store: &S,
    id: ConfigurationId,
) -> Result<KarabinerDocument, ExportError> {
    let configuration = store.configuration(id)?.ok_or(ExportError::NotFound(id))?;
    let rules = store.rules_for_configuration(id)?;
    let groups = rules_to_groups(&rules);

    log::debug!(
        "exporting configuration {} as {} rule-groups from {} rules",
        id,
        groups.len(),
        rules.len()
    );

    Ok(KarabinerDocument {
        title: configuration.name,
        rules: groups,
    })
}
