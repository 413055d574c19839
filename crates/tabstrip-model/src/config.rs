//! Tab strip configuration

use serde::{Deserialize, Serialize};

use crate::policy::{ActivationRule, NextActivePolicy};
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TabStripConfig {
    /// Order in which replacement candidates are tried when the active tab
    /// closes. The right/left fallback always applies last.
    pub activation_ladder: Vec<ActivationRule>,
    /// When false, every grouping request is rejected and insertions ignore
    /// requested groups
    pub supports_tab_groups: bool,
}

impl TabStripConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn next_active_policy(&self) -> NextActivePolicy {
        NextActivePolicy::new(self.activation_ladder.clone())
    }
}

impl Default for TabStripConfig {
    fn default() -> Self {
        Self {
            activation_ladder: ActivationRule::DEFAULT_LADDER.to_vec(),
            supports_tab_groups: true,
        }
    }
}
