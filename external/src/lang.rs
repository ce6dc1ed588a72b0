//! String lookup for warning and error messages.

use std::collections::HashMap;

/// Maps `(identifier, component)` to a human-readable string.
pub trait StringManager: Send + Sync {
    fn get_string(&self, identifier: &str, component: &str) -> String;
}

/// In-memory string table seeded with the English strings the bundled
/// functions use.
#[derive(Debug, Clone, Default)]
pub struct LangStrings {
    strings: HashMap<(String, String), String>,
}

const ENGLISH: &[(&str, &str, &str)] = &[
    (
        "error:badgeawardnotfound",
        "badges",
        "Cannot verify this awarded badge. This badge may have been revoked.",
    ),
    (
        "error:backpackisnotconnected",
        "badges",
        "The user does not have a backpack connected.",
    ),
    (
        "error:sitebackpackisnotconnected",
        "badges",
        "You do not have a backpack connected to this site.",
    ),
    ("badgesdisabled", "badges", "Badges are not enabled on this site."),
    (
        "externalbackpackdisabled",
        "badges",
        "External backpacks are not enabled on this site.",
    ),
    (
        "usercantremovesubmission",
        "assign",
        "You don't have permission to remove this user's submission.",
    ),
    (
        "userdonthavesubmission",
        "assign",
        "This user doesn't have a submission to remove.",
    ),
    (
        "nopermissiontoseethechatlog",
        "chat",
        "You don't have permission to see the chat logs.",
    ),
    ("invalidcoursemodule", "error", "Invalid course module ID"),
];

impl LangStrings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with the bundled English strings.
    pub fn english() -> Self {
        let mut strings = Self::new();
        for (identifier, component, text) in ENGLISH {
            strings.set(identifier, component, text);
        }
        strings
    }

    pub fn set(&mut self, identifier: &str, component: &str, text: &str) {
        self.strings.insert(
            (identifier.to_string(), component.to_string()),
            text.to_string(),
        );
    }

    /// Apply overrides keyed by component, then identifier.
    pub fn with_overrides(mut self, overrides: &HashMap<String, HashMap<String, String>>) -> Self {
        for (component, entries) in overrides {
            for (identifier, text) in entries {
                self.set(identifier, component, text);
            }
        }
        self
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

impl StringManager for LangStrings {
    fn get_string(&self, identifier: &str, component: &str) -> String {
        match self
            .strings
            .get(&(identifier.to_string(), component.to_string()))
        {
            Some(text) => text.clone(),
            None => {
                tracing::debug!("missing string {identifier},{component}");
                format!("[[{identifier},{component}]]")
            }
        }
    }
}
