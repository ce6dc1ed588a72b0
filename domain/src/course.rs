//! Courses, course modules, roles and capability resolution.

use lms_external::{CapabilitySet, ContextLevel};
use serde::{Deserialize, Serialize};

/// Capability names checked by the bundled functions.
pub mod capabilities {
    pub const BADGES_CONFIGURE_DETAILS: &str = "moodle/badges:configuredetails";
    pub const ASSIGN_SUBMIT: &str = "mod/assign:submit";
    pub const ASSIGN_GRADE: &str = "mod/assign:grade";
    pub const ASSIGN_EDIT_OTHER_SUBMISSION: &str = "mod/assign:editothersubmission";
    pub const CHAT_CHAT: &str = "mod/chat:chat";
    pub const CHAT_READLOG: &str = "mod/chat:readlog";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    pub fullname: String,
    pub shortname: String,
}

/// A module placed in a course. `id` is the cmid; `instance` is the id of
/// the module's own record (assign, chat).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseModule {
    pub id: i64,
    pub course: i64,
    pub modname: String,
    pub instance: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: i64,
    pub shortname: String,
    /// Capabilities allowed wherever the role is assigned.
    #[serde(default)]
    pub capabilities: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Allow,
    Prohibit,
}

/// A per-context change to what a role may do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleOverride {
    pub roleid: i64,
    pub capability: String,
    pub permission: Permission,
    pub context: ContextLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleAssignment {
    pub roleid: i64,
    pub userid: i64,
    pub context: ContextLevel,
}

pub trait CourseDirectory: Send + Sync {
    fn course(&self, id: i64) -> Option<Course>;

    fn course_module(&self, cmid: i64) -> Option<CourseModule>;

    /// Module of the given type, or `None` when the cmid belongs to
    /// another module type.
    fn course_module_of(&self, modname: &str, cmid: i64) -> Option<CourseModule> {
        self.course_module(cmid).filter(|cm| cm.modname == modname)
    }

    fn capabilities_for(&self, userid: i64) -> CapabilitySet;
}

/// Whether `inner` lies at or below `outer` in the context tree.
fn contains(
    outer: ContextLevel,
    inner: ContextLevel,
    course_of_module: &impl Fn(i64) -> Option<i64>,
) -> bool {
    match (outer, inner) {
        (ContextLevel::System, _) => true,
        (ContextLevel::Course(a), ContextLevel::Course(b)) => a == b,
        (ContextLevel::Course(a), ContextLevel::Module(m)) => course_of_module(m) == Some(a),
        (ContextLevel::Module(a), ContextLevel::Module(b)) => a == b,
        _ => false,
    }
}

/// Build the capability set of `userid` from role definitions, role
/// assignments and overrides.
///
/// Role defaults apply at the assignment context. An override applies at the
/// deeper of the assignment and override contexts, and only when one
/// contains the other.
pub fn resolve_capabilities(
    userid: i64,
    roles: &[Role],
    assignments: &[RoleAssignment],
    overrides: &[RoleOverride],
    course_of_module: impl Fn(i64) -> Option<i64>,
) -> CapabilitySet {
    let mut set = CapabilitySet::new();
    for assignment in assignments.iter().filter(|a| a.userid == userid) {
        let Some(role) = roles.iter().find(|r| r.id == assignment.roleid) else {
            continue;
        };
        for capability in &role.capabilities {
            set.grant(capability, assignment.context);
        }
        for o in overrides.iter().filter(|o| o.roleid == role.id) {
            let at = if contains(assignment.context, o.context, &course_of_module) {
                o.context
            } else if contains(o.context, assignment.context, &course_of_module) {
                assignment.context
            } else {
                continue;
            };
            match o.permission {
                Permission::Allow => set.grant(&o.capability, at),
                Permission::Prohibit => set.prohibit(&o.capability, at),
            }
        }
    }
    set
}

/// Default capabilities of the built-in role archetypes.
pub fn archetype_capabilities(shortname: &str) -> Vec<String> {
    use capabilities::*;
    let caps: &[&str] = match shortname {
        "student" => &[ASSIGN_SUBMIT, CHAT_CHAT, CHAT_READLOG],
        "teacher" => &[ASSIGN_GRADE, CHAT_CHAT, CHAT_READLOG],
        "editingteacher" => &[
            ASSIGN_GRADE,
            CHAT_CHAT,
            CHAT_READLOG,
            BADGES_CONFIGURE_DETAILS,
        ],
        "manager" => &[
            ASSIGN_GRADE,
            ASSIGN_EDIT_OTHER_SUBMISSION,
            CHAT_CHAT,
            CHAT_READLOG,
            BADGES_CONFIGURE_DETAILS,
        ],
        _ => &[],
    };
    caps.iter().map(|c| (*c).to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::capabilities::*;
    use super::*;
    use lms_external::ContextPath;

    fn roles() -> Vec<Role> {
        vec![
            Role {
                id: 1,
                shortname: "teacher".to_string(),
                capabilities: archetype_capabilities("teacher"),
            },
            Role {
                id: 2,
                shortname: "custom".to_string(),
                capabilities: Vec::new(),
            },
        ]
    }

    fn course_of(cmid: i64) -> Option<i64> {
        (cmid == 50).then_some(5)
    }

    #[test]
    fn defaults_apply_below_assignment() {
        let assignments = [RoleAssignment {
            roleid: 1,
            userid: 7,
            context: ContextLevel::Course(5),
        }];
        let caps = resolve_capabilities(7, &roles(), &assignments, &[], course_of);
        assert!(caps.has_capability(ASSIGN_GRADE, &ContextPath::module(5, 50)));
        assert!(!caps.has_capability(ASSIGN_EDIT_OTHER_SUBMISSION, &ContextPath::module(5, 50)));
        assert!(!caps.has_capability(ASSIGN_GRADE, &ContextPath::course(6)));
    }

    #[test]
    fn overrides_allow_and_prohibit() {
        let assignments = [RoleAssignment {
            roleid: 1,
            userid: 7,
            context: ContextLevel::Course(5),
        }];
        let overrides = [
            RoleOverride {
                roleid: 1,
                capability: ASSIGN_EDIT_OTHER_SUBMISSION.to_string(),
                permission: Permission::Allow,
                context: ContextLevel::Course(5),
            },
            RoleOverride {
                roleid: 1,
                capability: CHAT_READLOG.to_string(),
                permission: Permission::Prohibit,
                context: ContextLevel::Module(50),
            },
        ];
        let caps = resolve_capabilities(7, &roles(), &assignments, &overrides, course_of);
        assert!(caps.has_capability(ASSIGN_EDIT_OTHER_SUBMISSION, &ContextPath::module(5, 50)));
        assert!(!caps.has_capability(CHAT_READLOG, &ContextPath::module(5, 50)));
        assert!(caps.has_capability(CHAT_READLOG, &ContextPath::course(5)));
    }

    #[test]
    fn module_assignment_with_course_override() {
        let assignments = [RoleAssignment {
            roleid: 2,
            userid: 8,
            context: ContextLevel::Module(50),
        }];
        let overrides = [RoleOverride {
            roleid: 2,
            capability: CHAT_READLOG.to_string(),
            permission: Permission::Allow,
            context: ContextLevel::Course(5),
        }];
        let caps = resolve_capabilities(8, &roles(), &assignments, &overrides, course_of);
        assert!(caps.has_capability(CHAT_READLOG, &ContextPath::module(5, 50)));
        assert!(!caps.has_capability(CHAT_READLOG, &ContextPath::course(5)));
        assert!(resolve_capabilities(9, &roles(), &assignments, &overrides, course_of).is_empty());
    }
}
