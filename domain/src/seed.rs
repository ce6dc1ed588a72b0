//! Site seed files.
//!
//! A seed describes the fixtures a service starts with. Records refer to
//! each other by username, course shortname and module key rather than by
//! id, so a seed stays readable when ids shift. Files ending in `.json` are
//! parsed as JSON, everything else as TOML.

use std::collections::HashMap;
use std::path::Path;

use lms_external::ContextLevel;
use serde::{Deserialize, Serialize};

use crate::assign::SubmissionStatus;
use crate::backpack::ExternalBadge;
use crate::badges::BadgeType;
use crate::course::{Course, CourseModule, Permission};
use crate::error::{DomainError, GeneratorError};
use crate::generator::reportbuilder::ReportBuilderGenerator;
use crate::generator::{DataGenerator, NewBadge};
use crate::site::{DEFAULT_WWWROOT, InMemorySite};
use crate::users::User;

type Result<T> = std::result::Result<T, GeneratorError>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteSeed {
    #[serde(default)]
    pub wwwroot: Option<String>,
    #[serde(default)]
    pub users: Vec<SeedUser>,
    #[serde(default)]
    pub roles: Vec<SeedRole>,
    #[serde(default)]
    pub courses: Vec<SeedCourse>,
    #[serde(default)]
    pub modules: Vec<SeedModule>,
    #[serde(default)]
    pub overrides: Vec<SeedOverride>,
    #[serde(default)]
    pub submissions: Vec<SeedSubmission>,
    #[serde(default)]
    pub badges: Vec<SeedBadge>,
    #[serde(default)]
    pub backpacks: Vec<SeedBackpack>,
    #[serde(default)]
    pub reports: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedUser {
    pub username: String,
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub siteadmin: bool,
    /// Web-service token for this user.
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedRole {
    pub shortname: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedCourse {
    pub shortname: String,
    #[serde(default)]
    pub fullname: Option<String>,
    #[serde(default)]
    pub enrol: Vec<SeedEnrolment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedEnrolment {
    pub user: String,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedModule {
    /// Name other records use to refer to this module.
    pub key: String,
    pub modname: String,
    pub course: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Role assignments at the module context.
    #[serde(default)]
    pub roles: Vec<SeedEnrolment>,
}

/// Where an override applies: the whole site, a course, or a module key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedOverride {
    pub role: String,
    pub capability: String,
    pub permission: Permission,
    #[serde(default)]
    pub course: Option<String>,
    #[serde(default)]
    pub module: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedSubmission {
    pub module: String,
    pub user: String,
    #[serde(default = "default_submission_status")]
    pub status: SubmissionStatus,
}

fn default_submission_status() -> SubmissionStatus {
    SubmissionStatus::Submitted
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedBadge {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Course shortname; site badge when absent.
    #[serde(default)]
    pub course: Option<String>,
    #[serde(default)]
    pub awards: Vec<SeedAward>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedAward {
    pub user: String,
    /// Fixed award hash; random when absent.
    #[serde(default)]
    pub hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedBackpack {
    pub user: String,
    /// API URL of the site backpack to connect to. Registered on first use;
    /// the default backpack when absent.
    #[serde(default)]
    pub site: Option<String>,
    /// Number of generated collections.
    #[serde(default)]
    pub collections: u32,
    /// Extra badges, added to the first collection.
    #[serde(default)]
    pub badges: Vec<ExternalBadge>,
}

impl SiteSeed {
    pub fn load(path: &Path) -> Result<Self> {
        let display = path.display().to_string();
        let contents = std::fs::read_to_string(path).map_err(|source| GeneratorError::SeedIo {
            path: display.clone(),
            source,
        })?;
        let is_json = path.extension().is_some_and(|ext| ext == "json");
        let parsed = if is_json {
            serde_json::from_str(&contents).map_err(|e| e.to_string())
        } else {
            toml::from_str(&contents).map_err(|e| e.to_string())
        };
        parsed.map_err(|reason| GeneratorError::SeedParse {
            path: display,
            reason,
        })
    }

    /// Build a fresh site holding everything in the seed.
    pub fn build(&self) -> Result<InMemorySite> {
        let site = InMemorySite::new(self.wwwroot.as_deref().unwrap_or(DEFAULT_WWWROOT));
        self.apply(&DataGenerator::new(&site))?;
        Ok(site)
    }

    pub fn apply(&self, generator: &DataGenerator<'_>) -> Result<()> {
        let mut refs = SeedRefs::default();

        for seed in &self.users {
            let mut user = generator.create_named_user(&seed.username);
            if let Some(firstname) = &seed.firstname {
                user.firstname.clone_from(firstname);
            }
            if let Some(lastname) = &seed.lastname {
                user.lastname.clone_from(lastname);
            }
            if let Some(email) = &seed.email {
                user.email.clone_from(email);
            }
            user.siteadmin = seed.siteadmin;
            generator.update_user(&user)?;
            if let Some(token) = &seed.token {
                generator.set_token(user.id, token)?;
            }
            insert_unique(&mut refs.users, "user", &seed.username, user)?;
        }

        for seed in &self.roles {
            let capabilities: Vec<&str> = seed.capabilities.iter().map(String::as_str).collect();
            generator.create_role(Some(&seed.shortname), &capabilities);
        }

        for seed in &self.courses {
            let mut course = generator.create_course();
            course.shortname.clone_from(&seed.shortname);
            if let Some(fullname) = &seed.fullname {
                course.fullname.clone_from(fullname);
            }
            generator.site().write().courses.insert(course.id, course.clone());
            for enrolment in &seed.enrol {
                generator.enrol(refs.user(&enrolment.user)?, &course, &enrolment.role)?;
            }
            insert_unique(&mut refs.courses, "course", &seed.shortname, course)?;
        }

        for seed in &self.modules {
            let course = refs.course(&seed.course)?;
            let cm = generator.create_module(&seed.modname, course.id)?;
            if let Some(name) = &seed.name {
                rename_instance(generator, &cm, name);
            }
            for assignment in &seed.roles {
                let role = role_id(generator, &assignment.role)?;
                let user = refs.user(&assignment.user)?;
                generator.role_assign(role, user.id, ContextLevel::Module(cm.id))?;
            }
            insert_unique(&mut refs.modules, "module", &seed.key, cm)?;
        }

        for seed in &self.overrides {
            let context = match (&seed.course, &seed.module) {
                (_, Some(module)) => ContextLevel::Module(refs.module(module)?.id),
                (Some(course), None) => ContextLevel::Course(refs.course(course)?.id),
                (None, None) => ContextLevel::System,
            };
            let role = role_id(generator, &seed.role)?;
            generator.assign_capability(&seed.capability, seed.permission, role, context);
        }

        for seed in &self.submissions {
            let cm = refs.module(&seed.module)?;
            let assign = generator.assign_instance(cm)?;
            let user = refs.user(&seed.user)?;
            match seed.status {
                SubmissionStatus::New | SubmissionStatus::Reopened => {
                    let submission = generator.add_submission(&assign, user.id);
                    set_submission_status(generator, submission.id, seed.status);
                }
                SubmissionStatus::Draft => {
                    generator.add_submission(&assign, user.id);
                }
                SubmissionStatus::Submitted => {
                    generator.add_submission(&assign, user.id);
                    generator.submit_for_grading(&assign, user.id);
                }
            }
        }

        for seed in &self.badges {
            let courseid = seed
                .course
                .as_deref()
                .map(|c| refs.course(c).map(|course| course.id))
                .transpose()?;
            let mut record = NewBadge {
                name: seed.name.clone(),
                badge_type: if courseid.is_some() {
                    BadgeType::Course
                } else {
                    BadgeType::Site
                },
                courseid,
                ..NewBadge::default()
            };
            if let Some(description) = &seed.description {
                record.description.clone_from(description);
            }
            let badge = generator.create_badge(record)?;
            for award in &seed.awards {
                let issued = generator.issue_badge(badge.id, refs.user(&award.user)?.id)?;
                if let Some(hash) = &award.hash {
                    generator.set_award_hash(issued.id, hash)?;
                }
            }
        }

        for seed in &self.backpacks {
            let user = refs.user(&seed.user)?;
            let site_backpack = seed
                .site
                .as_deref()
                .map(|apiurl| site_backpack_for(generator, apiurl));
            let backpack = generator.create_fake_backpack(user.id, site_backpack)?;
            let mut first = None;
            for _ in 0..seed.collections.max(u32::from(!seed.badges.is_empty())) {
                let collection = generator.create_fake_backpack_collection(backpack.id)?;
                first.get_or_insert(collection.id);
            }
            if let Some(collectionid) = first {
                for badge in &seed.badges {
                    generator.add_external_badge(collectionid, badge.clone())?;
                }
            }
        }

        let author = self
            .users
            .iter()
            .find(|u| u.siteadmin)
            .and_then(|u| refs.users.get(&u.username))
            .map_or(0, |u| u.id);
        let reports = ReportBuilderGenerator::new(generator.site(), author);
        for record in &self.reports {
            reports.create_report(record)?;
        }

        tracing::info!(
            "seeded {} users, {} courses, {} modules, {} badges",
            refs.users.len(),
            refs.courses.len(),
            refs.modules.len(),
            self.badges.len()
        );
        Ok(())
    }
}

#[derive(Default)]
struct SeedRefs {
    users: HashMap<String, User>,
    courses: HashMap<String, Course>,
    modules: HashMap<String, CourseModule>,
}

impl SeedRefs {
    fn user(&self, username: &str) -> Result<&User> {
        self.users.get(username).ok_or_else(|| unknown("user", username))
    }

    fn course(&self, shortname: &str) -> Result<&Course> {
        self.courses
            .get(shortname)
            .ok_or_else(|| unknown("course", shortname))
    }

    fn module(&self, key: &str) -> Result<&CourseModule> {
        self.modules.get(key).ok_or_else(|| unknown("module", key))
    }
}

fn unknown(kind: &'static str, key: &str) -> GeneratorError {
    GeneratorError::InvalidProperty {
        property: kind,
        reason: format!("no {kind} named '{key}' in seed"),
    }
}

fn insert_unique<T>(
    map: &mut HashMap<String, T>,
    kind: &'static str,
    key: &str,
    value: T,
) -> Result<()> {
    if map.insert(key.to_string(), value).is_some() {
        return Err(DomainError::Duplicate {
            kind,
            key: key.to_string(),
        }
        .into());
    }
    Ok(())
}

fn role_id(generator: &DataGenerator<'_>, shortname: &str) -> Result<i64> {
    generator
        .site()
        .role_by_shortname(shortname)
        .map(|r| r.id)
        .ok_or_else(|| DomainError::RoleNotFound(shortname.to_string()).into())
}

fn site_backpack_for(generator: &DataGenerator<'_>, apiurl: &str) -> i64 {
    let existing = generator
        .site()
        .read()
        .site_backpacks
        .values()
        .find(|b| b.backpackapiurl == apiurl)
        .map(|b| b.id);
    existing.unwrap_or_else(|| {
        generator
            .create_site_backpack(crate::backpack::OPEN_BADGES_V2, apiurl, apiurl)
            .id
    })
}

fn rename_instance(generator: &DataGenerator<'_>, cm: &CourseModule, name: &str) {
    let mut state = generator.site().write();
    match cm.modname.as_str() {
        "chat" => {
            if let Some(chat) = state.chats.get_mut(&cm.instance) {
                chat.name = name.to_string();
            }
        }
        "assign" => {
            if let Some(assign) = state.assigns.get_mut(&cm.instance) {
                assign.name = name.to_string();
            }
        }
        _ => {}
    }
}

fn set_submission_status(generator: &DataGenerator<'_>, id: i64, status: SubmissionStatus) {
    if let Some(submission) = generator.site().write().submissions.get_mut(&id) {
        submission.status = status;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assign::AssignmentRepository;
    use crate::badges::BadgeRepository;
    use crate::course::CourseDirectory;
    use crate::users::TokenStore;
    use pretty_assertions::assert_eq;

    const SEED: &str = r#"
wwwroot = "https://school.example.org"

[[users]]
username = "admin"
siteadmin = true
token = "admintoken"

[[users]]
username = "alice"
firstname = "Alice"
lastname = "Archer"
token = "alicetoken"

[[courses]]
shortname = "bio101"
enrol = [{ user = "alice", role = "student" }]

[[modules]]
key = "essay"
modname = "assign"
course = "bio101"

[[submissions]]
module = "essay"
user = "alice"

[[badges]]
name = "Gold"
course = "bio101"
awards = [{ user = "alice", hash = "goldhash" }]

[[backpacks]]
user = "alice"
collections = 2

[[reports]]
name = "Users"
source = 'core_user\reportbuilder\datasource\users'
"#;

    #[test]
    fn toml_seed_builds_site() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
        let path = dir.path().join("site.toml");
        std::fs::write(&path, SEED).unwrap_or_else(|e| panic!("{e}"));

        let seed = SiteSeed::load(&path).unwrap_or_else(|e| panic!("{e}"));
        let site = seed.build().unwrap_or_else(|e| panic!("{e}"));

        assert_eq!(site.wwwroot(), "https://school.example.org");
        let alice = site
            .user_for_token("alicetoken")
            .unwrap_or_else(|| panic!("alice token"));
        let award = site
            .award_by_hash("goldhash")
            .unwrap_or_else(|| panic!("award"));
        assert_eq!(award.userid, alice);
        assert_eq!(site.collection_count(), 2);
        assert_eq!(
            site.user_submission(1, alice).map(|s| s.status),
            Some(SubmissionStatus::Submitted)
        );
        assert!(site.course_module_of("assign", 1).is_some());
        let admin = site
            .user_for_token("admintoken")
            .unwrap_or_else(|| panic!("admin token"));
        assert!(site.capabilities_for(admin).is_unrestricted());
    }

    #[test]
    fn json_seed_and_unknown_references() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
        let path = dir.path().join("site.json");
        std::fs::write(
            &path,
            r#"{"users": [{"username": "bob"}], "courses": [{"shortname": "c1", "enrol": [{"user": "carol", "role": "student"}]}]}"#,
        )
        .unwrap_or_else(|e| panic!("{e}"));
        let seed = SiteSeed::load(&path).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(seed.users.len(), 1);
        let err = seed.build().err().map(|e| e.to_string()).unwrap_or_default();
        assert!(err.contains("carol"), "{err}");
    }

    #[test]
    fn load_errors_name_the_file() {
        let missing = SiteSeed::load(Path::new("/nonexistent/seed.toml"));
        assert!(matches!(missing, Err(GeneratorError::SeedIo { .. })));

        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "users = 3").unwrap_or_else(|e| panic!("{e}"));
        assert!(matches!(
            SiteSeed::load(&path),
            Err(GeneratorError::SeedParse { .. })
        ));
    }

    #[test]
    fn duplicate_usernames_are_rejected() {
        let seed = SiteSeed {
            users: vec![
                SeedUser {
                    username: "dup".to_string(),
                    ..SeedUser::default()
                },
                SeedUser {
                    username: "dup".to_string(),
                    ..SeedUser::default()
                },
            ],
            ..SiteSeed::default()
        };
        assert!(matches!(
            seed.build(),
            Err(GeneratorError::Domain(DomainError::Duplicate { kind: "user", .. }))
        ));
    }
}
