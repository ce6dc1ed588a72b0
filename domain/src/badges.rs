//! Badge definitions, awards, and the per-viewer export of an award.

use lms_external::{ContextPath, RequestContext};
use serde::{Deserialize, Serialize};

use crate::course::capabilities::BADGES_CONFIGURE_DETAILS;
use crate::error::{DomainError, Result};
use crate::users::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum BadgeType {
    Site,
    Course,
}

impl From<BadgeType> for i64 {
    fn from(value: BadgeType) -> Self {
        match value {
            BadgeType::Site => 1,
            BadgeType::Course => 2,
        }
    }
}

impl TryFrom<i64> for BadgeType {
    type Error = String;

    fn try_from(value: i64) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Site),
            2 => Ok(Self::Course),
            other => Err(format!("unknown badge type {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum BadgeStatus {
    Inactive,
    Active,
    InactiveLocked,
    ActiveLocked,
    Archived,
}

impl From<BadgeStatus> for i64 {
    fn from(value: BadgeStatus) -> Self {
        match value {
            BadgeStatus::Inactive => 0,
            BadgeStatus::Active => 1,
            BadgeStatus::InactiveLocked => 2,
            BadgeStatus::ActiveLocked => 3,
            BadgeStatus::Archived => 4,
        }
    }
}

impl TryFrom<i64> for BadgeStatus {
    type Error = String;

    fn try_from(value: i64) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Inactive),
            1 => Ok(Self::Active),
            2 => Ok(Self::InactiveLocked),
            3 => Ok(Self::ActiveLocked),
            4 => Ok(Self::Archived),
            other => Err(format!("unknown badge status {other}")),
        }
    }
}

impl BadgeStatus {
    /// Status after the first award: active badges become locked.
    pub fn locked(self) -> Self {
        match self {
            Self::Active => Self::ActiveLocked,
            Self::Inactive => Self::InactiveLocked,
            other => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endorsement {
    pub id: i64,
    pub badgeid: i64,
    pub issuername: String,
    pub issuerurl: String,
    pub issueremail: String,
    pub claimid: Option<String>,
    pub claimcomment: Option<String>,
    pub dateissued: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alignment {
    pub id: i64,
    pub badgeid: i64,
    #[serde(default)]
    pub targetname: String,
    #[serde(default)]
    pub targeturl: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targetdescription: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targetframework: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targetcode: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeDefinition {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub timecreated: i64,
    pub timemodified: i64,
    pub usercreated: i64,
    pub usermodified: i64,
    pub issuername: String,
    pub issuerurl: String,
    pub issuercontact: Option<String>,
    pub expiredate: Option<i64>,
    pub expireperiod: Option<i64>,
    #[serde(rename = "type")]
    pub badge_type: BadgeType,
    pub courseid: Option<i64>,
    pub messagesubject: String,
    pub message: String,
    pub attachment: i64,
    pub notification: i64,
    pub nextcron: Option<i64>,
    pub status: BadgeStatus,
    pub version: Option<String>,
    pub language: Option<String>,
    pub imageauthorname: Option<String>,
    pub imageauthoremail: Option<String>,
    pub imageauthorurl: Option<String>,
    pub imagecaption: Option<String>,
    pub endorsement: Option<Endorsement>,
    #[serde(default)]
    pub alignments: Vec<Alignment>,
    /// Ids of related badges.
    #[serde(default)]
    pub related: Vec<i64>,
}

impl BadgeDefinition {
    /// Context the badge's capabilities are checked in.
    pub fn context(&self) -> ContextPath {
        match (self.badge_type, self.courseid) {
            (BadgeType::Course, Some(courseid)) => ContextPath::course(courseid),
            _ => ContextPath::system(),
        }
    }
}

/// One award of a badge to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedBadge {
    pub id: i64,
    pub badgeid: i64,
    pub userid: i64,
    pub uniquehash: String,
    pub dateissued: i64,
    pub dateexpire: Option<i64>,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedBadge {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub badge_type: Option<BadgeType>,
}

/// An award as shown to a particular viewer.
///
/// Fields a viewer may not see are `None` and left out when serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBadge {
    pub id: i64,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timecreated: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timemodified: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usercreated: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usermodified: Option<i64>,
    pub issuername: String,
    pub issuerurl: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuercontact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiredate: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expireperiod: Option<i64>,
    #[serde(rename = "type")]
    pub badge_type: BadgeType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub courseid: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messagesubject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nextcron: Option<i64>,
    pub status: BadgeStatus,
    pub issuedid: i64,
    pub uniquehash: String,
    pub dateissued: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dateexpire: Option<i64>,
    pub visible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imageauthorname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imageauthoremail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imageauthorurl: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imagecaption: Option<String>,
    pub badgeurl: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endorsement: Option<Endorsement>,
    pub alignment: Vec<Alignment>,
    pub relatedbadges: Vec<RelatedBadge>,
}

pub trait BadgeRepository: Send + Sync {
    fn badge(&self, id: i64) -> Option<BadgeDefinition>;

    fn award_by_hash(&self, hash: &str) -> Option<IssuedBadge>;

    /// Export `award` for the caller in `ctx`.
    ///
    /// Viewers other than the recipient who lack
    /// `moodle/badges:configuredetails` in the badge context get the public
    /// subset: no message, notification or authoring fields, and alignments
    /// and related badges reduced to their identifying fields.
    fn user_badge_for_external(
        &self,
        award: &IssuedBadge,
        owner: &User,
        wwwroot: &str,
        ctx: &RequestContext,
    ) -> Result<UserBadge> {
        let badge = self
            .badge(award.badgeid)
            .ok_or(DomainError::BadgeNotFound(award.badgeid))?;
        let full = ctx.is_caller(award.userid)
            || ctx.has_capability(BADGES_CONFIGURE_DETAILS, &badge.context());
        let relatedbadges = badge
            .related
            .iter()
            .filter_map(|id| self.badge(*id))
            .map(|related| RelatedBadge {
                id: related.id,
                name: related.name,
                version: related.version.filter(|_| full),
                language: related.language.filter(|_| full),
                badge_type: full.then_some(related.badge_type),
            })
            .collect();
        let alignment = badge
            .alignments
            .iter()
            .cloned()
            .map(|a| Alignment {
                targetdescription: a.targetdescription.filter(|_| full),
                targetframework: a.targetframework.filter(|_| full),
                targetcode: a.targetcode.filter(|_| full),
                ..a
            })
            .collect();

        Ok(UserBadge {
            id: badge.id,
            badgeurl: format!(
                "{}/webservice/pluginfile.php/badges/badgeimage/{}/f3",
                wwwroot.trim_end_matches('/'),
                badge.id
            ),
            name: badge.name,
            description: badge.description,
            timecreated: full.then_some(badge.timecreated),
            timemodified: full.then_some(badge.timemodified),
            usercreated: full.then_some(badge.usercreated),
            usermodified: full.then_some(badge.usermodified),
            issuername: badge.issuername,
            issuerurl: badge.issuerurl,
            issuercontact: badge.issuercontact,
            expiredate: badge.expiredate,
            expireperiod: badge.expireperiod,
            badge_type: badge.badge_type,
            courseid: badge.courseid,
            message: full.then_some(badge.message),
            messagesubject: full.then_some(badge.messagesubject),
            attachment: full.then_some(badge.attachment),
            notification: full.then_some(badge.notification),
            nextcron: badge.nextcron.filter(|_| full),
            status: badge.status,
            issuedid: award.id,
            uniquehash: award.uniquehash.clone(),
            dateissued: award.dateissued,
            dateexpire: award.dateexpire,
            visible: award.visible,
            email: full.then(|| owner.email.clone()),
            version: badge.version,
            language: badge.language,
            imageauthorname: badge.imageauthorname,
            imageauthoremail: badge.imageauthoremail,
            imageauthorurl: badge.imageauthorurl,
            imagecaption: badge.imagecaption,
            endorsement: badge.endorsement,
            alignment,
            relatedbadges,
        })
    }
}
