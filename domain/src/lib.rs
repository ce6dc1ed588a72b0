//! `lms-domain`: the collaborators external functions delegate to.
//!
//! Each area (users, courses, badges, backpacks, assignments, chat, report
//! builder) exposes a synchronous trait. [`InMemorySite`] implements all of
//! them over a single lock-guarded state, and [`DataGenerator`] /
//! [`SiteSeed`] populate it for tests and for the service binary.

pub mod assign;
pub mod backpack;
pub mod badges;
pub mod chat;
pub mod course;
pub mod error;
pub mod generator;
pub mod reportbuilder;
pub mod seed;
pub mod site;
pub mod users;

pub use assign::{AssignInstance, AssignmentRepository, RemovalRefused, Submission, SubmissionStatus};
pub use backpack::{BackpackCollection, BackpackRepository, ExternalBadge, SiteBackpack, UserBackpack};
pub use badges::{BadgeDefinition, BadgeRepository, BadgeStatus, BadgeType, IssuedBadge, UserBadge};
pub use chat::{Chat, ChatRepository, Event, EventSink};
pub use course::{Course, CourseDirectory, CourseModule, Permission, Role};
pub use error::{DomainError, GeneratorError};
pub use generator::DataGenerator;
pub use generator::reportbuilder::ReportBuilderGenerator;
pub use reportbuilder::{Column, Datasource, Filter, Report, ReportStore};
pub use seed::SiteSeed;
pub use site::InMemorySite;
pub use users::{TokenStore, User, UserDirectory};
