//! Explicit per-request context: who is calling, what they may do, and
//! which site features are on.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A node in the context hierarchy a capability can be granted at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "level", content = "instance", rename_all = "snake_case")]
pub enum ContextLevel {
    System,
    Course(i64),
    Module(i64),
}

/// The chain of contexts from the site root down to a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextPath(Vec<ContextLevel>);

impl ContextPath {
    pub fn system() -> Self {
        Self(vec![ContextLevel::System])
    }

    pub fn course(courseid: i64) -> Self {
        Self(vec![ContextLevel::System, ContextLevel::Course(courseid)])
    }

    pub fn module(courseid: i64, cmid: i64) -> Self {
        Self(vec![
            ContextLevel::System,
            ContextLevel::Course(courseid),
            ContextLevel::Module(cmid),
        ])
    }

    pub fn levels(&self) -> &[ContextLevel] {
        &self.0
    }

    /// The innermost context.
    pub fn leaf(&self) -> ContextLevel {
        self.0.last().copied().unwrap_or(ContextLevel::System)
    }
}

/// Capabilities resolved for one caller.
///
/// A prohibition anywhere on the path wins over any grant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    unrestricted: bool,
    allowed: BTreeSet<(String, ContextLevel)>,
    prohibited: BTreeSet<(String, ContextLevel)>,
}

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every capability everywhere (site administrators).
    pub fn unrestricted() -> Self {
        Self {
            unrestricted: true,
            ..Self::default()
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        self.unrestricted
    }

    pub fn grant(&mut self, capability: &str, at: ContextLevel) {
        self.allowed.insert((capability.to_string(), at));
    }

    pub fn prohibit(&mut self, capability: &str, at: ContextLevel) {
        self.prohibited.insert((capability.to_string(), at));
    }

    pub fn with_grant(mut self, capability: &str, at: ContextLevel) -> Self {
        self.grant(capability, at);
        self
    }

    pub fn has_capability(&self, capability: &str, path: &ContextPath) -> bool {
        if self.unrestricted {
            return true;
        }
        let hit = |set: &BTreeSet<(String, ContextLevel)>| {
            path.levels()
                .iter()
                .any(|level| set.contains(&(capability.to_string(), *level)))
        };
        !hit(&self.prohibited) && hit(&self.allowed)
    }

    /// True when the set grants nothing anywhere.
    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty() && !self.unrestricted
    }
}

/// Site feature switches consulted by functions before doing any work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlags {
    #[serde(default = "default_true")]
    pub enable_badges: bool,
    #[serde(default = "default_true")]
    pub badges_allow_external_backpack: bool,
}

fn default_true() -> bool {
    true
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            enable_badges: true,
            badges_allow_external_backpack: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub caller_id: i64,
    pub capabilities: CapabilitySet,
    pub features: FeatureFlags,
}

impl RequestContext {
    pub fn new(caller_id: i64, capabilities: CapabilitySet, features: FeatureFlags) -> Self {
        Self {
            caller_id,
            capabilities,
            features,
        }
    }

    pub fn is_caller(&self, userid: i64) -> bool {
        self.caller_id == userid
    }

    pub fn has_capability(&self, capability: &str, path: &ContextPath) -> bool {
        self.capabilities.has_capability(capability, path)
    }
}
