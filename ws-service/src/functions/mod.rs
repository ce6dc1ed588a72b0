//! The external functions this service answers.

pub mod assign;
pub mod badges;
pub mod chat;

use std::sync::Arc;

use lms_domain::{DomainError, InMemorySite};
use lms_external::{ExternalError, FunctionRegistry, StringManager};

/// Register every bundled function against `site`.
pub fn register_all(
    registry: &mut FunctionRegistry,
    site: &Arc<InMemorySite>,
    strings: &Arc<dyn StringManager>,
) {
    registry.register(badges::GetUserBadgeByHash {
        badges: site.clone(),
        users: site.clone(),
        wwwroot: site.wwwroot().to_string(),
        strings: Arc::clone(strings),
    });
    registry.register(badges::GetExternalBadges {
        backpacks: site.clone(),
        strings: Arc::clone(strings),
    });
    registry.register(assign::RemoveSubmission {
        assignments: site.clone(),
        strings: Arc::clone(strings),
    });
    registry.register(assign::RemoveSubmissions {
        assignments: site.clone(),
    });
    registry.register(chat::ViewSessions {
        courses: site.clone(),
        chats: site.clone(),
        events: site.clone(),
        strings: Arc::clone(strings),
    });
}

/// Collaborator failures surface as fatal errors.
pub(crate) fn domain_error(err: DomainError) -> ExternalError {
    match err {
        DomainError::UserNotFound(id) => ExternalError::record_not_found("user", id),
        DomainError::CourseNotFound(id) => ExternalError::record_not_found("course", id),
        DomainError::ModuleNotFound(id) => ExternalError::record_not_found("course_modules", id),
        DomainError::BadgeNotFound(id) => ExternalError::record_not_found("badge", id),
        DomainError::BackpackNotFound(id) => ExternalError::record_not_found("badge_backpack", id),
        DomainError::ReportNotFound(id) => {
            ExternalError::record_not_found("reportbuilder_report", id)
        }
        DomainError::RoleNotFound(name) => ExternalError::record_not_found("role", name),
        other => ExternalError::Internal(other.to_string()),
    }
}
