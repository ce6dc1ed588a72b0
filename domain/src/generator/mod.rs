//! Fixture generators for the in-memory site.
//!
//! [`DataGenerator`] creates users, courses, roles, modules, submissions,
//! badges and backpacks with sensible defaults. Ids come from per-table
//! sequences, so fixtures built in the same order get the same ids.

pub mod reportbuilder;

use chrono::Utc;
use lms_external::ContextLevel;
use serde_json::{Map, Value, json};
use uuid::Uuid;

use crate::assign::{AssignInstance, Submission, SubmissionStatus};
use crate::backpack::{
    BackpackCollection, ExternalBadge, OPEN_BADGES_V2, SiteBackpack, UserBackpack,
};
use crate::badges::{Alignment, BadgeDefinition, BadgeStatus, BadgeType, Endorsement, IssuedBadge};
use crate::chat::Chat;
use crate::course::{
    Course, CourseModule, Permission, Role, RoleAssignment, RoleOverride, archetype_capabilities,
};
use crate::error::{DomainError, GeneratorError};
use crate::site::InMemorySite;
use crate::users::User;

/// Roles every generated site starts with.
pub const BUILTIN_ROLES: &[&str] = &["manager", "editingteacher", "teacher", "student"];

/// Backpack registered on a fresh site.
pub const DEFAULT_BACKPACK_API_URL: &str = "https://api.badgr.io/v2";
pub const DEFAULT_BACKPACK_WEB_URL: &str = "https://badgr.io";

type Result<T> = std::result::Result<T, GeneratorError>;

/// Fields for [`DataGenerator::create_badge`]; everything else is defaulted.
#[derive(Debug, Clone)]
pub struct NewBadge {
    pub name: String,
    pub description: String,
    pub badge_type: BadgeType,
    pub courseid: Option<i64>,
    pub usercreated: i64,
    pub messagesubject: String,
    pub message: String,
    pub version: Option<String>,
    pub language: Option<String>,
}

impl Default for NewBadge {
    fn default() -> Self {
        Self {
            name: "Test badge".to_string(),
            description: "Testing badges".to_string(),
            badge_type: BadgeType::Site,
            courseid: None,
            usercreated: 0,
            messagesubject: "Test message subject for badge".to_string(),
            message: "Test message body for badge".to_string(),
            version: Some("1".to_string()),
            language: Some("en".to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DataGenerator<'a> {
    site: &'a InMemorySite,
}

impl<'a> DataGenerator<'a> {
    /// Wrap `site`, installing the built-in roles and the default site
    /// backpack if they are missing.
    pub fn new(site: &'a InMemorySite) -> Self {
        let generator = Self { site };
        generator.install_defaults();
        generator
    }

    pub fn site(&self) -> &'a InMemorySite {
        self.site
    }

    fn install_defaults(&self) {
        let mut state = self.site.write();
        for shortname in BUILTIN_ROLES {
            if state.roles.iter().any(|r| r.shortname == *shortname) {
                continue;
            }
            let role = Role {
                id: state.next_id("role"),
                shortname: (*shortname).to_string(),
                capabilities: archetype_capabilities(shortname),
            };
            state.roles.push(role);
        }
        if state.site_backpacks.is_empty() {
            let backpack = SiteBackpack {
                id: state.next_id("badge_external_backpack"),
                apiversion: OPEN_BADGES_V2.to_string(),
                backpackapiurl: DEFAULT_BACKPACK_API_URL.to_string(),
                backpackweburl: DEFAULT_BACKPACK_WEB_URL.to_string(),
            };
            state.site_backpacks.insert(backpack.id, backpack);
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Users, courses, roles
    // ─────────────────────────────────────────────────────────────────────

    pub fn create_user(&self) -> User {
        let mut state = self.site.write();
        let id = state.next_id("user");
        let user = User {
            id,
            username: format!("user{id}"),
            firstname: format!("Firstname{id}"),
            lastname: format!("Lastname{id}"),
            email: format!("user{id}@example.com"),
            siteadmin: false,
        };
        state.users.insert(id, user.clone());
        user
    }

    pub fn create_named_user(&self, username: &str) -> User {
        let mut user = self.create_user();
        user.username = username.to_string();
        self.site.write().users.insert(user.id, user.clone());
        user
    }

    pub fn create_admin(&self) -> User {
        let mut user = self.create_named_user("admin");
        user.siteadmin = true;
        self.site.write().users.insert(user.id, user.clone());
        user
    }

    pub fn update_user(&self, user: &User) -> Result<()> {
        let mut state = self.site.write();
        match state.users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(())
            }
            None => Err(DomainError::UserNotFound(user.id).into()),
        }
    }

    pub fn create_course(&self) -> Course {
        let mut state = self.site.write();
        let id = state.next_id("course");
        let course = Course {
            id,
            fullname: format!("Test course {id}"),
            shortname: format!("tc_{id}"),
        };
        state.courses.insert(id, course.clone());
        course
    }

    /// A role with the given capabilities. `shortname` defaults to
    /// `role{id}`.
    pub fn create_role(&self, shortname: Option<&str>, capabilities: &[&str]) -> Role {
        let mut state = self.site.write();
        let id = state.next_id("role");
        let role = Role {
            id,
            shortname: shortname.map_or_else(|| format!("role{id}"), str::to_string),
            capabilities: capabilities.iter().map(|c| (*c).to_string()).collect(),
        };
        state.roles.push(role.clone());
        role
    }

    pub fn role_assign(&self, roleid: i64, userid: i64, context: ContextLevel) -> Result<()> {
        let mut state = self.site.write();
        if !state.roles.iter().any(|r| r.id == roleid) {
            return Err(DomainError::RoleNotFound(roleid.to_string()).into());
        }
        if !state.users.contains_key(&userid) {
            return Err(DomainError::UserNotFound(userid).into());
        }
        state.role_assignments.push(RoleAssignment {
            roleid,
            userid,
            context,
        });
        Ok(())
    }

    /// Allow or prohibit `capability` for a role in `context`.
    pub fn assign_capability(
        &self,
        capability: &str,
        permission: Permission,
        roleid: i64,
        context: ContextLevel,
    ) {
        let mut state = self.site.write();
        state.role_overrides.retain(|o| {
            !(o.roleid == roleid && o.capability == capability && o.context == context)
        });
        state.role_overrides.push(RoleOverride {
            roleid,
            capability: capability.to_string(),
            permission,
            context,
        });
    }

    /// Enrol `user` in `course` with the role named `role`.
    pub fn enrol(&self, user: &User, course: &Course, role: &str) -> Result<()> {
        let role = self
            .site
            .role_by_shortname(role)
            .ok_or_else(|| DomainError::RoleNotFound(role.to_string()))?;
        if self.site.read().courses.get(&course.id).is_none() {
            return Err(DomainError::CourseNotFound(course.id).into());
        }
        self.role_assign(role.id, user.id, ContextLevel::Course(course.id))
    }

    pub fn create_and_enrol(&self, course: &Course, role: &str) -> Result<User> {
        let user = self.create_user();
        self.enrol(&user, course, role)?;
        Ok(user)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Modules and submissions
    // ─────────────────────────────────────────────────────────────────────

    /// Create a `chat` or `assign` module in `courseid`.
    pub fn create_module(&self, modname: &str, courseid: i64) -> Result<CourseModule> {
        let mut state = self.site.write();
        if !state.courses.contains_key(&courseid) {
            return Err(DomainError::CourseNotFound(courseid).into());
        }
        let cmid = state.next_id("course_modules");
        let instance = match modname {
            "chat" => {
                let id = state.next_id("chat");
                state.chats.insert(
                    id,
                    Chat {
                        id,
                        course: courseid,
                        name: format!("Chat {id}"),
                        intro: String::new(),
                    },
                );
                id
            }
            "assign" => {
                let id = state.next_id("assign");
                state.assigns.insert(
                    id,
                    AssignInstance {
                        id,
                        course: courseid,
                        cmid,
                        name: format!("Assignment {id}"),
                    },
                );
                id
            }
            other => return Err(DomainError::UnknownModuleType(other.to_string()).into()),
        };
        let cm = CourseModule {
            id: cmid,
            course: courseid,
            modname: modname.to_string(),
            instance,
        };
        state.modules.insert(cmid, cm.clone());
        Ok(cm)
    }

    /// Remove a module's instance record, leaving the course module behind.
    pub fn delete_module_instance(&self, cm: &CourseModule) {
        let mut state = self.site.write();
        match cm.modname.as_str() {
            "chat" => {
                state.chats.remove(&cm.instance);
            }
            "assign" => {
                state.assigns.remove(&cm.instance);
            }
            _ => {}
        }
    }

    /// Assignment record behind `cm`.
    pub fn assign_instance(&self, cm: &CourseModule) -> Result<AssignInstance> {
        self.site
            .read()
            .assigns
            .get(&cm.instance)
            .cloned()
            .ok_or_else(|| DomainError::ModuleNotFound(cm.id).into())
    }

    /// Save a draft for `userid`, reusing their latest attempt when it holds
    /// nothing yet.
    pub fn add_submission(&self, assign: &AssignInstance, userid: i64) -> Submission {
        let now = Utc::now().timestamp();
        let mut state = self.site.write();
        let latest = state
            .submissions
            .values_mut()
            .filter(|s| s.assignment == assign.id && s.userid == userid)
            .max_by_key(|s| s.attemptnumber);
        if let Some(existing) = latest {
            existing.status = SubmissionStatus::Draft;
            existing.timemodified = now;
            return existing.clone();
        }
        let submission = Submission {
            id: state.next_id("assign_submission"),
            assignment: assign.id,
            userid,
            status: SubmissionStatus::Draft,
            attemptnumber: 0,
            timemodified: now,
        };
        state.submissions.insert(submission.id, submission.clone());
        submission
    }

    /// Move the latest attempt of `userid` to `submitted`.
    pub fn submit_for_grading(&self, assign: &AssignInstance, userid: i64) -> Option<Submission> {
        let mut state = self.site.write();
        let latest = state
            .submissions
            .values_mut()
            .filter(|s| s.assignment == assign.id && s.userid == userid)
            .max_by_key(|s| s.attemptnumber)?;
        latest.status = SubmissionStatus::Submitted;
        latest.timemodified = Utc::now().timestamp();
        Some(latest.clone())
    }

    /// Open a new attempt after the current one, in `draft`.
    pub fn add_attempt(&self, assign: &AssignInstance, userid: i64) -> Submission {
        let mut state = self.site.write();
        let attemptnumber = state
            .submissions
            .values()
            .filter(|s| s.assignment == assign.id && s.userid == userid)
            .map(|s| s.attemptnumber + 1)
            .max()
            .unwrap_or(0);
        let submission = Submission {
            id: state.next_id("assign_submission"),
            assignment: assign.id,
            userid,
            status: SubmissionStatus::Draft,
            attemptnumber,
            timemodified: Utc::now().timestamp(),
        };
        state.submissions.insert(submission.id, submission.clone());
        submission
    }

    // ─────────────────────────────────────────────────────────────────────
    // Badges
    // ─────────────────────────────────────────────────────────────────────

    pub fn create_badge(&self, record: NewBadge) -> Result<BadgeDefinition> {
        let now = Utc::now().timestamp();
        let mut state = self.site.write();
        if let Some(courseid) = record.courseid.filter(|id| !state.courses.contains_key(id)) {
            return Err(DomainError::CourseNotFound(courseid).into());
        }
        if record.badge_type == BadgeType::Course && record.courseid.is_none() {
            return Err(GeneratorError::InvalidProperty {
                property: "courseid",
                reason: "course badges need a course".to_string(),
            });
        }
        let badge = BadgeDefinition {
            id: state.next_id("badge"),
            name: record.name,
            description: record.description,
            timecreated: now,
            timemodified: now,
            usercreated: record.usercreated,
            usermodified: record.usercreated,
            issuername: "Test issuer".to_string(),
            issuerurl: "http://issuer-url.domain.co.nz".to_string(),
            issuercontact: Some("issuer@example.com".to_string()),
            expiredate: None,
            expireperiod: None,
            badge_type: record.badge_type,
            courseid: record.courseid,
            messagesubject: record.messagesubject,
            message: record.message,
            attachment: 1,
            notification: 0,
            nextcron: None,
            status: BadgeStatus::Active,
            version: record.version,
            language: record.language,
            imageauthorname: Some("Image author".to_string()),
            imageauthoremail: Some("imageauthor@example.com".to_string()),
            imageauthorurl: Some("http://image-author-url.domain.co.nz".to_string()),
            imagecaption: Some("Caption".to_string()),
            endorsement: None,
            alignments: Vec::new(),
            related: Vec::new(),
        };
        state.badges.insert(badge.id, badge.clone());
        Ok(badge)
    }

    fn with_badge<T>(&self, badgeid: i64, f: impl FnOnce(&mut BadgeDefinition) -> T) -> Result<T> {
        let mut state = self.site.write();
        let badge = state
            .badges
            .get_mut(&badgeid)
            .ok_or(DomainError::BadgeNotFound(badgeid))?;
        Ok(f(badge))
    }

    pub fn add_endorsement(&self, badgeid: i64) -> Result<Endorsement> {
        let id = self.site.write().next_id("badge_endorsement");
        self.with_badge(badgeid, |badge| {
            let endorsement = Endorsement {
                id,
                badgeid,
                issuername: "Issuer name".to_string(),
                issuerurl: "http://endorsement-issuer-url.domain.co.nz".to_string(),
                issueremail: "endorsementissuer@example.com".to_string(),
                claimid: Some("http://claim-url.domain.co.nz".to_string()),
                claimcomment: Some("Claim comment".to_string()),
                dateissued: Utc::now().timestamp(),
            };
            badge.endorsement = Some(endorsement.clone());
            endorsement
        })
    }

    pub fn add_alignment(&self, badgeid: i64, targetname: &str) -> Result<Alignment> {
        let id = self.site.write().next_id("badge_alignment");
        self.with_badge(badgeid, |badge| {
            let alignment = Alignment {
                id,
                badgeid,
                targetname: targetname.to_string(),
                targeturl: format!("https://framework.example/{id}"),
                targetdescription: Some(format!("Alignment {id}")),
                targetframework: Some("Framework".to_string()),
                targetcode: Some(format!("CODE{id}")),
            };
            badge.alignments.push(alignment.clone());
            alignment
        })
    }

    /// Relate two badges in both directions.
    pub fn add_related_badges(&self, badgeid: i64, related: i64) -> Result<()> {
        self.with_badge(related, |_| ())?;
        self.with_badge(badgeid, |badge| {
            if !badge.related.contains(&related) {
                badge.related.push(related);
            }
        })?;
        self.with_badge(related, |badge| {
            if !badge.related.contains(&badgeid) {
                badge.related.push(badgeid);
            }
        })
    }

    /// Award a badge, locking its criteria.
    pub fn issue_badge(&self, badgeid: i64, userid: i64) -> Result<IssuedBadge> {
        self.with_badge(badgeid, |badge| badge.status = badge.status.locked())?;
        let mut state = self.site.write();
        if !state.users.contains_key(&userid) {
            return Err(DomainError::UserNotFound(userid).into());
        }
        let issued = IssuedBadge {
            id: state.next_id("badge_issued"),
            badgeid,
            userid,
            uniquehash: Uuid::new_v4().simple().to_string(),
            dateissued: Utc::now().timestamp(),
            dateexpire: None,
            visible: true,
        };
        state.issued.insert(issued.id, issued.clone());
        Ok(issued)
    }

    /// Replace an award's hash, for fixtures that need a known value.
    pub fn set_award_hash(&self, issuedid: i64, hash: &str) -> Result<()> {
        let mut state = self.site.write();
        let issued = state
            .issued
            .get_mut(&issuedid)
            .ok_or(DomainError::BadgeNotFound(issuedid))?;
        issued.uniquehash = hash.to_string();
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Backpacks
    // ─────────────────────────────────────────────────────────────────────

    pub fn create_site_backpack(
        &self,
        apiversion: &str,
        backpackapiurl: &str,
        backpackweburl: &str,
    ) -> SiteBackpack {
        let mut state = self.site.write();
        let backpack = SiteBackpack {
            id: state.next_id("badge_external_backpack"),
            apiversion: apiversion.to_string(),
            backpackapiurl: backpackapiurl.to_string(),
            backpackweburl: backpackweburl.to_string(),
        };
        state.site_backpacks.insert(backpack.id, backpack.clone());
        backpack
    }

    /// Connect `userid` to a site backpack; the first registered one when
    /// `externalbackpackid` is `None`.
    pub fn create_fake_backpack(
        &self,
        userid: i64,
        externalbackpackid: Option<i64>,
    ) -> Result<UserBackpack> {
        let mut state = self.site.write();
        let user = state
            .users
            .get(&userid)
            .cloned()
            .ok_or(DomainError::UserNotFound(userid))?;
        let externalbackpackid = match externalbackpackid {
            Some(id) if state.site_backpacks.contains_key(&id) => id,
            Some(id) => return Err(DomainError::BackpackNotFound(id).into()),
            None => *state
                .site_backpacks
                .keys()
                .next()
                .ok_or(DomainError::BackpackNotFound(0))?,
        };
        let backpack = UserBackpack {
            id: state.next_id("badge_backpack"),
            userid,
            externalbackpackid,
            email: user.email,
            backpackuid: Uuid::new_v4().simple().to_string(),
            autosync: false,
        };
        state.user_backpacks.insert(backpack.id, backpack.clone());
        Ok(backpack)
    }

    /// A collection holding one generated badge.
    pub fn create_fake_backpack_collection(&self, backpackid: i64) -> Result<BackpackCollection> {
        let mut state = self.site.write();
        let email = state
            .user_backpacks
            .get(&backpackid)
            .map(|b| b.email.clone())
            .ok_or(DomainError::BackpackNotFound(backpackid))?;
        let id = state.next_id("badge_external");
        let collection = BackpackCollection {
            id,
            backpackid,
            collectionid: format!("collection{id}"),
            entityid: Uuid::new_v4().simple().to_string(),
        };
        state.collections.insert(id, collection.clone());
        state
            .external_badges
            .insert(id, vec![fake_external_badge(id, &email)]);
        Ok(collection)
    }

    /// Append a badge to an existing collection.
    pub fn add_external_badge(&self, collectionid: i64, badge: ExternalBadge) -> Result<()> {
        let mut state = self.site.write();
        if !state.collections.contains_key(&collectionid) {
            return Err(DomainError::BackpackNotFound(collectionid).into());
        }
        state
            .external_badges
            .entry(collectionid)
            .or_default()
            .push(badge);
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Web-service tokens
    // ─────────────────────────────────────────────────────────────────────

    pub fn create_token(&self, userid: i64) -> Result<String> {
        let token = Uuid::new_v4().simple().to_string();
        self.set_token(userid, &token)?;
        Ok(token)
    }

    pub fn set_token(&self, userid: i64, token: &str) -> Result<()> {
        let mut state = self.site.write();
        if !state.users.contains_key(&userid) {
            return Err(DomainError::UserNotFound(userid).into());
        }
        state.tokens.insert(token.to_string(), userid);
        Ok(())
    }
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// An Open Badges 2 assertion as a backpack would return it, including keys
/// that are not part of any output description.
pub fn fake_external_badge(seq: i64, email: &str) -> ExternalBadge {
    let base = "https://backpack.example.com";
    ExternalBadge {
        id: format!("{base}/assertions/{seq}"),
        name: format!("External badge {seq}"),
        badge_type: Some("Assertion".to_string()),
        image: format!("{base}/images/{seq}.png"),
        hosted_url: Some(format!("{base}/public/assertions/{seq}")),
        description: Some("Awarded for testing".to_string()),
        issued_on: "2024-03-01T10:00:00Z".to_string(),
        issuer: object(json!({
            "id": format!("{base}/issuers/1"),
            "@context": "https://w3id.org/openbadges/v2",
            "type": "Issuer",
            "name": "Backpack issuer",
            "url": "https://issuer.example.com",
            "email": "issuer@example.com",
            "publicKey": format!("{base}/keys/1"),
        })),
        recipient: object(json!({
            "identity": email,
            "hashed": "false",
            "type": "email",
            "plainid": email,
            "salt": "",
        })),
        criteria: object(json!({
            "id": format!("{base}/criteria/{seq}"),
            "narrative": "Complete the test course",
            "rubric": "internal",
        })),
    }
}
