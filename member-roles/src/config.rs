// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};

/// Number of resource ids included in the diagnostic event of a resolution call.
pub const DEFAULT_DIAGNOSTIC_SAMPLE_SIZE: usize = 10;

/// How the instance is operated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Deployment {
    /// Single-tenant installation, custom roles are defined instance-wide.
    #[default]
    SelfManaged,

    /// Multi-tenant installation where every root namespace defines its own custom roles.
    Saas,
}

/// Configuration of the resolution engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub(crate) deployment: Deployment,
    pub(crate) diagnostic_sample_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            deployment: Deployment::default(),
            diagnostic_sample_size: DEFAULT_DIAGNOSTIC_SAMPLE_SIZE,
        }
    }
}

impl Config {
    pub fn new(deployment: Deployment) -> Self {
        Self {
            deployment,
            ..Default::default()
        }
    }

    pub fn with_diagnostic_sample_size(mut self, size: usize) -> Self {
        self.diagnostic_sample_size = size;
        self
    }

    pub fn deployment(&self) -> Deployment {
        self.deployment
    }

    pub fn diagnostic_sample_size(&self) -> usize {
        self.diagnostic_sample_size
    }

    /// On SaaS only root namespaces which define custom roles need to be queried.
    pub(crate) fn requires_root_member_roles(&self) -> bool {
        matches!(self.deployment, Deployment::Saas)
    }
}
