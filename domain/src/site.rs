//! In-memory site implementing every collaborator trait.

use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use lms_external::{CapabilitySet, RequestContext};

use crate::assign::{
    AssignInstance, AssignmentRepository, RemovalRefused, Submission, SubmissionStatus,
    can_edit_submission,
};
use crate::backpack::{
    BackpackCollection, BackpackRepository, ExternalBadge, SiteBackpack, UserBackpack,
};
use crate::badges::{BadgeDefinition, BadgeRepository, IssuedBadge};
use crate::chat::{Chat, ChatRepository, Event, EventSink};
use crate::course::{
    Course, CourseDirectory, CourseModule, Role, RoleAssignment, RoleOverride,
    resolve_capabilities,
};
use crate::error::{DomainError, Result};
use crate::reportbuilder::{Column, Datasource, Filter, Report, ReportStore};
use crate::users::{TokenStore, User, UserDirectory};

pub const DEFAULT_WWWROOT: &str = "https://lms.example.com";

#[derive(Debug, Default)]
pub(crate) struct SiteState {
    sequences: HashMap<&'static str, i64>,
    pub(crate) users: BTreeMap<i64, User>,
    pub(crate) tokens: HashMap<String, i64>,
    pub(crate) courses: BTreeMap<i64, Course>,
    pub(crate) modules: BTreeMap<i64, CourseModule>,
    pub(crate) roles: Vec<Role>,
    pub(crate) role_assignments: Vec<RoleAssignment>,
    pub(crate) role_overrides: Vec<RoleOverride>,
    pub(crate) assigns: BTreeMap<i64, AssignInstance>,
    pub(crate) submissions: BTreeMap<i64, Submission>,
    pub(crate) chats: BTreeMap<i64, Chat>,
    pub(crate) badges: BTreeMap<i64, BadgeDefinition>,
    pub(crate) issued: BTreeMap<i64, IssuedBadge>,
    pub(crate) site_backpacks: BTreeMap<i64, SiteBackpack>,
    pub(crate) user_backpacks: BTreeMap<i64, UserBackpack>,
    pub(crate) collections: BTreeMap<i64, BackpackCollection>,
    pub(crate) external_badges: HashMap<i64, Vec<ExternalBadge>>,
    pub(crate) reports: BTreeMap<i64, Report>,
    pub(crate) columns: BTreeMap<i64, Column>,
    pub(crate) filters: BTreeMap<i64, Filter>,
    pub(crate) events: Vec<Event>,
}

impl SiteState {
    /// Next id for `table`, starting at 1.
    pub(crate) fn next_id(&mut self, table: &'static str) -> i64 {
        let id = self.sequences.entry(table).or_insert(0);
        *id += 1;
        *id
    }

    fn latest_submission_mut(&mut self, assignid: i64, userid: i64) -> Option<&mut Submission> {
        self.submissions
            .values_mut()
            .filter(|s| s.assignment == assignid && s.userid == userid)
            .max_by_key(|s| s.attemptnumber)
    }

    fn report_source(&self, reportid: i64) -> Result<&'static Datasource> {
        let report = self
            .reports
            .get(&reportid)
            .ok_or(DomainError::ReportNotFound(reportid))?;
        Datasource::find(&report.source)
            .ok_or_else(|| DomainError::UnknownSource(report.source.clone()))
    }

    pub(crate) fn insert_column(&mut self, reportid: i64, identifier: &str) -> Result<Column> {
        if !self.report_source(reportid)?.has_column(identifier) {
            return Err(DomainError::InvalidIdentifier {
                kind: "column",
                identifier: identifier.to_string(),
                reportid,
            });
        }
        let columnorder = self
            .columns
            .values()
            .filter(|c| c.reportid == reportid)
            .map(|c| c.columnorder)
            .max()
            .unwrap_or(0)
            + 1;
        let column = Column {
            id: self.next_id("reportbuilder_column"),
            reportid,
            uniqueidentifier: identifier.to_string(),
            columnorder,
            sortenabled: false,
        };
        self.columns.insert(column.id, column.clone());
        Ok(column)
    }

    pub(crate) fn insert_filter(
        &mut self,
        reportid: i64,
        identifier: &str,
        iscondition: bool,
    ) -> Result<Filter> {
        if !self.report_source(reportid)?.has_filter(identifier) {
            return Err(DomainError::InvalidIdentifier {
                kind: if iscondition { "condition" } else { "filter" },
                identifier: identifier.to_string(),
                reportid,
            });
        }
        let filterorder = self
            .filters
            .values()
            .filter(|f| f.reportid == reportid && f.iscondition == iscondition)
            .map(|f| f.filterorder)
            .max()
            .unwrap_or(0)
            + 1;
        let filter = Filter {
            id: self.next_id("reportbuilder_filter"),
            reportid,
            uniqueidentifier: identifier.to_string(),
            iscondition,
            filterorder,
        };
        self.filters.insert(filter.id, filter.clone());
        Ok(filter)
    }
}

/// Lock-guarded site state shared by every collaborator trait.
#[derive(Debug)]
pub struct InMemorySite {
    wwwroot: String,
    state: RwLock<SiteState>,
}

impl Default for InMemorySite {
    fn default() -> Self {
        Self::new(DEFAULT_WWWROOT)
    }
}

impl InMemorySite {
    pub fn new(wwwroot: impl Into<String>) -> Self {
        Self {
            wwwroot: wwwroot.into(),
            state: RwLock::new(SiteState::default()),
        }
    }

    pub fn wwwroot(&self) -> &str {
        &self.wwwroot
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, SiteState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, SiteState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Events triggered so far, oldest first.
    pub fn events(&self) -> Vec<Event> {
        self.read().events.clone()
    }

    pub fn submission(&self, id: i64) -> Option<Submission> {
        self.read().submissions.get(&id).cloned()
    }

    pub fn role_by_shortname(&self, shortname: &str) -> Option<Role> {
        self.read()
            .roles
            .iter()
            .find(|r| r.shortname == shortname)
            .cloned()
    }

    pub fn site_backpack_count(&self) -> usize {
        self.read().site_backpacks.len()
    }

    pub fn collection_count(&self) -> usize {
        self.read().collections.len()
    }
}

impl UserDirectory for InMemorySite {
    fn user(&self, id: i64) -> Option<User> {
        self.read().users.get(&id).cloned()
    }
}

impl TokenStore for InMemorySite {
    fn user_for_token(&self, token: &str) -> Option<i64> {
        self.read().tokens.get(token).copied()
    }
}

impl CourseDirectory for InMemorySite {
    fn course(&self, id: i64) -> Option<Course> {
        self.read().courses.get(&id).cloned()
    }

    fn course_module(&self, cmid: i64) -> Option<CourseModule> {
        self.read().modules.get(&cmid).cloned()
    }

    fn capabilities_for(&self, userid: i64) -> CapabilitySet {
        let state = self.read();
        if state.users.get(&userid).is_some_and(|u| u.siteadmin) {
            return CapabilitySet::unrestricted();
        }
        resolve_capabilities(
            userid,
            &state.roles,
            &state.role_assignments,
            &state.role_overrides,
            |cmid| state.modules.get(&cmid).map(|cm| cm.course),
        )
    }
}

impl BadgeRepository for InMemorySite {
    fn badge(&self, id: i64) -> Option<BadgeDefinition> {
        self.read().badges.get(&id).cloned()
    }

    fn award_by_hash(&self, hash: &str) -> Option<IssuedBadge> {
        self.read()
            .issued
            .values()
            .find(|i| i.uniquehash == hash)
            .cloned()
    }
}

impl BackpackRepository for InMemorySite {
    fn connected_site_backpack(&self, userid: i64) -> Option<SiteBackpack> {
        let state = self.read();
        let backpack = state.user_backpacks.values().find(|b| b.userid == userid)?;
        state
            .site_backpacks
            .get(&backpack.externalbackpackid)
            .cloned()
    }

    fn user_backpack(&self, userid: i64) -> Option<UserBackpack> {
        self.read()
            .user_backpacks
            .values()
            .find(|b| b.userid == userid)
            .cloned()
    }

    fn collections(&self, backpackid: i64) -> Vec<BackpackCollection> {
        self.read()
            .collections
            .values()
            .filter(|c| c.backpackid == backpackid)
            .cloned()
            .collect()
    }

    fn badges_in_collection(&self, collection: &BackpackCollection) -> Vec<ExternalBadge> {
        self.read()
            .external_badges
            .get(&collection.id)
            .cloned()
            .unwrap_or_default()
    }
}

impl AssignmentRepository for InMemorySite {
    fn assign(&self, id: i64) -> Option<AssignInstance> {
        self.read().assigns.get(&id).cloned()
    }

    fn user_submission(&self, assignid: i64, userid: i64) -> Option<Submission> {
        self.read()
            .submissions
            .values()
            .filter(|s| s.assignment == assignid && s.userid == userid)
            .max_by_key(|s| s.attemptnumber)
            .cloned()
    }

    fn remove_submission(
        &self,
        assign: &AssignInstance,
        userid: i64,
        ctx: &RequestContext,
    ) -> std::result::Result<Submission, RemovalRefused> {
        if !can_edit_submission(assign, userid, ctx) {
            let fullname = self
                .user(userid)
                .map_or_else(|| userid.to_string(), |u| u.fullname());
            return Err(RemovalRefused::NoPermission { fullname });
        }
        let mut state = self.write();
        let submission = state
            .latest_submission_mut(assign.id, userid)
            .ok_or(RemovalRefused::NoSubmission { userid })?;
        if !submission.status.is_removable() {
            return Err(RemovalRefused::NothingToRemove { userid });
        }
        submission.status = if submission.attemptnumber > 0 {
            SubmissionStatus::Reopened
        } else {
            SubmissionStatus::New
        };
        submission.timemodified = Utc::now().timestamp();
        tracing::info!(
            "removed submission {} of user {userid} in assign {}",
            submission.id,
            assign.id
        );
        Ok(submission.clone())
    }
}

impl ChatRepository for InMemorySite {
    fn chat(&self, id: i64) -> Option<Chat> {
        self.read().chats.get(&id).cloned()
    }
}

impl EventSink for InMemorySite {
    fn trigger(&self, event: Event) {
        tracing::info!(
            event = %event.eventname,
            userid = event.userid,
            objectid = event.objectid,
            "event triggered"
        );
        self.write().events.push(event);
    }
}

impl ReportStore for InMemorySite {
    fn create_report(&self, name: &str, source: &str, default: bool, userid: i64) -> Result<Report> {
        let datasource =
            Datasource::find(source).ok_or_else(|| DomainError::UnknownSource(source.to_string()))?;
        let mut state = self.write();
        let report = Report {
            id: state.next_id("reportbuilder_report"),
            name: name.to_string(),
            source: source.to_string(),
            usercreated: userid,
            timecreated: Utc::now().timestamp(),
        };
        state.reports.insert(report.id, report.clone());
        if default {
            for column in datasource.default_columns {
                state.insert_column(report.id, column)?;
            }
            for filter in datasource.default_filters {
                state.insert_filter(report.id, filter, false)?;
            }
            for condition in datasource.default_conditions {
                state.insert_filter(report.id, condition, true)?;
            }
        }
        Ok(report)
    }

    fn add_column(&self, reportid: i64, uniqueidentifier: &str) -> Result<Column> {
        self.write().insert_column(reportid, uniqueidentifier)
    }

    fn add_filter(&self, reportid: i64, uniqueidentifier: &str) -> Result<Filter> {
        self.write().insert_filter(reportid, uniqueidentifier, false)
    }

    fn add_condition(&self, reportid: i64, uniqueidentifier: &str) -> Result<Filter> {
        self.write().insert_filter(reportid, uniqueidentifier, true)
    }

    fn report(&self, id: i64) -> Option<Report> {
        self.read().reports.get(&id).cloned()
    }

    fn columns(&self, reportid: i64) -> Vec<Column> {
        let mut columns: Vec<Column> = self
            .read()
            .columns
            .values()
            .filter(|c| c.reportid == reportid)
            .cloned()
            .collect();
        columns.sort_by_key(|c| c.columnorder);
        columns
    }

    fn filters(&self, reportid: i64) -> Vec<Filter> {
        let mut filters: Vec<Filter> = self
            .read()
            .filters
            .values()
            .filter(|f| f.reportid == reportid && !f.iscondition)
            .cloned()
            .collect();
        filters.sort_by_key(|f| f.filterorder);
        filters
    }

    fn conditions(&self, reportid: i64) -> Vec<Filter> {
        let mut conditions: Vec<Filter> = self
            .read()
            .filters
            .values()
            .filter(|f| f.reportid == reportid && f.iscondition)
            .cloned()
            .collect();
        conditions.sort_by_key(|f| f.filterorder);
        conditions
    }
}
