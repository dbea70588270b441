// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Built-in access levels a membership holds and a custom role is anchored to. Greater access
/// levels are assumed to also contain all lower ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum AccessLevel {
    /// Permission to see that a group exists, nothing else.
    MinimalAccess,

    /// Permission to view and comment.
    Guest,

    /// Permission to plan and track work.
    Planner,

    /// Permission to read code and pull artifacts.
    Reporter,

    /// Permission to push code.
    Developer,

    /// Permission to manage settings and protected resources.
    Maintainer,

    /// Full control over a group or project.
    Owner,
}

impl AccessLevel {
    /// Levels a custom role can be based on, from lowest to highest.
    pub const CUSTOM_ROLE_LEVELS: [AccessLevel; 6] = [
        AccessLevel::Guest,
        AccessLevel::Planner,
        AccessLevel::Reporter,
        AccessLevel::Developer,
        AccessLevel::Maintainer,
        AccessLevel::Owner,
    ];

    /// Ordinal value of this level as it is persisted.
    pub fn value(&self) -> i64 {
        match self {
            AccessLevel::MinimalAccess => 5,
            AccessLevel::Guest => 10,
            AccessLevel::Planner => 15,
            AccessLevel::Reporter => 20,
            AccessLevel::Developer => 30,
            AccessLevel::Maintainer => 40,
            AccessLevel::Owner => 50,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AccessLevel::MinimalAccess => "Minimal Access",
            AccessLevel::Guest => "Guest",
            AccessLevel::Planner => "Planner",
            AccessLevel::Reporter => "Reporter",
            AccessLevel::Developer => "Developer",
            AccessLevel::Maintainer => "Maintainer",
            AccessLevel::Owner => "Owner",
        }
    }

    /// Returns `true` if a custom role can be anchored to this level.
    pub fn is_custom_role_level(&self) -> bool {
        Self::CUSTOM_ROLE_LEVELS.contains(self)
    }

    /// Human-readable listing of all levels a custom role can be based on, for example in
    /// validation messages.
    pub fn levels_sentence() -> String {
        let levels: Vec<String> = Self::CUSTOM_ROLE_LEVELS
            .iter()
            .map(|level| format!("{} ({})", level.value(), level.name()))
            .collect();

        match levels.split_last() {
            Some((last, rest)) if !rest.is_empty() => format!("{}, and {}", rest.join(", "), last),
            Some((last, _)) => last.clone(),
            None => String::new(),
        }
    }
}

impl Display for AccessLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl TryFrom<i64> for AccessLevel {
    type Error = AccessLevelError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        let level = match value {
            5 => AccessLevel::MinimalAccess,
            10 => AccessLevel::Guest,
            15 => AccessLevel::Planner,
            20 => AccessLevel::Reporter,
            30 => AccessLevel::Developer,
            40 => AccessLevel::Maintainer,
            50 => AccessLevel::Owner,
            _ => return Err(AccessLevelError::Unknown(value)),
        };
        Ok(level)
    }
}

impl From<AccessLevel> for i64 {
    fn from(level: AccessLevel) -> Self {
        level.value()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccessLevelError {
    #[error("unknown access level {0}")]
    Unknown(i64),
}
