// Kbedit Assistant
// The recommendation seam: a message and the current rules in, suggestions out

pub mod combination;
pub mod heuristic;

pub use combination::{parse_combination, CombinationError, ParsedCombination};
pub use heuristic::HeuristicAssistant;

use serde::{Deserialize, Serialize};

use crate::karabiner::DEFAULT_MANIPULATOR_TYPE;
use crate::model::{ConfigurationId, NewRule, Rule};

/// A proposed key combination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeySuggestion {
    /// e.g. `command+option+k`
    pub combination: String,
    pub description: String,
    pub reasoning: String,
}

impl KeySuggestion {
    /// Rule skeleton bound to the suggested combination.
    ///
    /// The rule has no actions yet; the editor fills those in.
    pub fn to_new_rule(
        &self,
        configuration_id: ConfigurationId,
        order: i64,
    ) -> Result<NewRule, CombinationError> {
        let parsed = parse_combination(&self.combination)?;
        Ok(NewRule::new(
            configuration_id,
            self.description.clone(),
            DEFAULT_MANIPULATOR_TYPE,
            Some(parsed.to_trigger()),
        )
        .with_order(order))
    }
}

/// Free text plus any structured suggestions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssistantReply {
    pub text: String,
    #[serde(default)]
    pub suggestions: Vec<KeySuggestion>,
}

#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("Invalid suggestion: {0}")]
    InvalidSuggestion(#[from] CombinationError),
}

/// Anything that can answer a shortcut request against a rule set
pub trait Assistant {
    fn suggest(&self, message: &str, rules: &[Rule]) -> Result<AssistantReply, AssistantError>;
}
