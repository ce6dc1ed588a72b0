//! `core_badges_get_user_badge_by_hash` and `core_badges_get_external_badges`.

use std::sync::Arc;

use lms_domain::{BackpackRepository, BadgeRepository, ExternalBadge, UserBadge, UserDirectory};
use lms_external::schema::warnings;
use lms_external::{
    Description, ErrorCategory, ExternalError, ExternalFunction, FeatureFlags, Field, Outcome,
    ParamType, RequestContext, Result, StringManager, ValidatedArgs, Warning,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::domain_error;

const COMPONENT: &str = "core_badges";

/// Fails unless badges are enabled site-wide.
fn require_badges(features: FeatureFlags, strings: &dyn StringManager) -> Result<()> {
    if features.enable_badges {
        Ok(())
    } else {
        Err(ExternalError::exception(
            ErrorCategory::FeatureDisabled,
            "badgesdisabled",
            "badges",
            strings,
        ))
    }
}

fn value(param_type: ParamType, desc: &str) -> Description {
    Description::value(param_type, desc)
}

fn field(name: &str, description: Description) -> Field {
    Field::new(name, description)
}

// ─────────────────────────────────────────────────────────────────────────────
// core_badges_get_user_badge_by_hash
// ─────────────────────────────────────────────────────────────────────────────

pub struct GetUserBadgeByHash {
    pub badges: Arc<dyn BadgeRepository>,
    pub users: Arc<dyn UserDirectory>,
    pub wwwroot: String,
    pub strings: Arc<dyn StringManager>,
}

#[derive(Deserialize)]
struct HashParams {
    hash: String,
}

#[derive(Debug, Default, Serialize)]
struct UserBadgeList {
    badge: Vec<UserBadge>,
}

/// Output shape of an exported award.
fn user_badge_structure() -> Description {
    use ParamType::{Bool, Email, Int, Raw, Text, Url};
    let endorsement = Description::single(
        "Badge endorsement",
        vec![
            field("id", value(Int, "Endorsement id")),
            field("badgeid", value(Int, "Badge id")),
            field("issuername", value(Text, "Endorsement issuer name")),
            field("issuerurl", value(Url, "Endorsement issuer URL")),
            field("issueremail", value(Email, "Endorsement issuer email")),
            field("claimid", value(Url, "Claim URL").optional()),
            field("claimcomment", value(Raw, "Claim comment").optional()),
            field("dateissued", value(Int, "Date issued")),
        ],
    )
    .optional();
    let alignment = Description::multiple(
        Description::single(
            "Badge alignment",
            vec![
                field("id", value(Int, "Alignment id")),
                field("badgeid", value(Int, "Badge id")),
                field("targetname", value(Text, "Target name")),
                field("targeturl", value(Url, "Target URL")),
                field("targetdescription", value(Raw, "Target description").optional()),
                field("targetframework", value(Text, "Target framework").optional()),
                field("targetcode", value(Text, "Target code").optional()),
            ],
        ),
        "Badge alignments",
    );
    let related = Description::multiple(
        Description::single(
            "Related badge",
            vec![
                field("id", value(Int, "Badge id")),
                field("name", value(Text, "Badge name")),
                field("version", value(Text, "Version").optional()),
                field("language", value(Text, "Language").optional()),
                field("type", value(Int, "Type").optional()),
            ],
        ),
        "Related badges",
    );

    Description::single(
        "Issued badge",
        vec![
            field("id", value(Int, "Badge id")),
            field("name", value(Text, "Badge name")),
            field("description", value(Raw, "Badge description")),
            field("timecreated", value(Int, "Time created").optional()),
            field("timemodified", value(Int, "Time modified").optional()),
            field("usercreated", value(Int, "User created").optional()),
            field("usermodified", value(Int, "User modified").optional()),
            field("issuername", value(Text, "Issuer name")),
            field("issuerurl", value(Url, "Issuer URL")),
            field("issuercontact", value(Raw, "Issuer contact").optional()),
            field("expiredate", value(Int, "Expire date").optional()),
            field("expireperiod", value(Int, "Expire period").optional()),
            field("type", value(Int, "Type")),
            field("courseid", value(Int, "Course id").optional()),
            field("message", value(Raw, "Message").optional()),
            field("messagesubject", value(Text, "Message subject").optional()),
            field("attachment", value(Int, "Attachment").optional()),
            field("notification", value(Int, "Whether to notify when badge is awarded").optional()),
            field("nextcron", value(Int, "Next cron").optional()),
            field("status", value(Int, "Status")),
            field("issuedid", value(Int, "Issued id")),
            field("uniquehash", value(Text, "Unique hash")),
            field("dateissued", value(Int, "Date issued")),
            field("dateexpire", value(Int, "Date expire").optional()),
            field("visible", value(Bool, "Visible")),
            field("email", value(Email, "User email").optional()),
            field("version", value(Text, "Version").optional()),
            field("language", value(Text, "Language").optional()),
            field("imageauthorname", value(Text, "Name of the image author").optional()),
            field("imageauthoremail", value(Email, "Email of the image author").optional()),
            field("imageauthorurl", value(Url, "URL of the image author").optional()),
            field("imagecaption", value(Text, "Caption of the image").optional()),
            field("badgeurl", value(Url, "Badge URL")),
            field("endorsement", endorsement),
            field("alignment", alignment),
            field("relatedbadges", related),
        ],
    )
}

impl ExternalFunction for GetUserBadgeByHash {
    fn name(&self) -> &'static str {
        "core_badges_get_user_badge_by_hash"
    }

    fn component(&self) -> &'static str {
        COMPONENT
    }

    fn description(&self) -> &'static str {
        "Returns the badge awarded to a user by hash."
    }

    fn describe_input(&self) -> Description {
        Description::single(
            "params",
            vec![field("hash", value(ParamType::Alphanum, "Badge issued hash"))],
        )
    }

    fn describe_output(&self) -> Description {
        Description::single(
            "result",
            vec![
                field("status", value(ParamType::Bool, "Whether the badge was found")),
                field(
                    "badge",
                    Description::multiple(user_badge_structure(), "Badge awarded"),
                ),
                field("warnings", warnings()),
            ],
        )
    }

    fn execute(&self, ctx: &RequestContext, args: ValidatedArgs) -> Result<Value> {
        let HashParams { hash } = args.parse()?;
        require_badges(ctx.features, self.strings.as_ref())?;

        let Some(award) = self.badges.award_by_hash(&hash) else {
            return Outcome::<UserBadgeList>::failed(
                Warning::new(
                    "badgeawardnotfound",
                    self.strings.get_string("error:badgeawardnotfound", "badges"),
                )
                .with_item(hash),
            )
            .into_value();
        };

        let owner = self
            .users
            .user(award.userid)
            .ok_or_else(|| ExternalError::record_not_found("user", award.userid))?;
        let badge = self
            .badges
            .user_badge_for_external(&award, &owner, &self.wwwroot, ctx)
            .map_err(domain_error)?;
        Outcome::Ok(UserBadgeList { badge: vec![badge] }).into_value()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// core_badges_get_external_badges
// ─────────────────────────────────────────────────────────────────────────────

pub struct GetExternalBadges {
    pub backpacks: Arc<dyn BackpackRepository>,
    pub strings: Arc<dyn StringManager>,
}

#[derive(Deserialize)]
struct UserParams {
    userid: i64,
}

#[derive(Debug, Default, Serialize)]
struct ExternalBadgeList {
    badges: Vec<ExternalBadgeRecord>,
}

#[derive(Debug, Serialize)]
struct ExternalBadgeRecord {
    id: String,
    name: String,
    #[serde(rename = "type")]
    badge_type: Option<String>,
    image: String,
    hostedurl: Option<String>,
    description: Option<String>,
    issuedon: String,
    issuer: Map<String, Value>,
    recipient: Map<String, Value>,
    criteria: Map<String, Value>,
}

impl From<ExternalBadge> for ExternalBadgeRecord {
    fn from(badge: ExternalBadge) -> Self {
        Self {
            id: badge.id,
            name: badge.name,
            badge_type: badge.badge_type,
            image: badge.image,
            hostedurl: badge.hosted_url,
            description: badge.description,
            issuedon: badge.issued_on,
            issuer: badge.issuer,
            recipient: badge.recipient,
            criteria: badge.criteria,
        }
    }
}

fn external_badge_structure() -> Description {
    use ParamType::{Email, Raw, Text, Url};
    Description::single(
        "External badge",
        vec![
            field("id", value(Url, "Badgr id")),
            field("name", value(Text, "Badge name")),
            field("image", value(Url, "Image URL")),
            field("issuedon", value(Text, "Issued date")),
            field("type", value(Text, "Badgr type").optional()),
            field("hostedurl", value(Url, "Hosted URL").optional()),
            field("description", value(Text, "Description").optional()),
            field(
                "issuer",
                Description::single(
                    "Issuer",
                    vec![
                        field("id", value(Url, "Issuer Badgr URL").optional()),
                        field("@context", value(Raw, "Issuer context").optional()),
                        field("type", value(Text, "Issuer type").optional()),
                        field("name", value(Text, "Issuer name").optional()),
                        field("url", value(Url, "Issuer URL").optional()),
                        field("email", value(Email, "Issuer email").optional()),
                        field("image", value(Url, "Issuer image").optional()),
                        field("description", value(Text, "Issuer description").optional()),
                    ],
                ),
            ),
            field(
                "recipient",
                Description::single(
                    "Recipient",
                    vec![
                        field("identity", value(Text, "Recipient identity").optional()),
                        field("hashed", value(Text, "Recipient hash").optional()),
                        field("type", value(Text, "Recipient type").optional()),
                        field("plainid", value(Text, "Recipient plain text identity").optional()),
                        field("salt", value(Text, "Recipient salt").optional()),
                    ],
                ),
            ),
            field(
                "criteria",
                Description::single(
                    "Criteria",
                    vec![
                        field("id", value(Url, "Criteria id URL").optional()),
                        field("narrative", value(Text, "How the user earn the badge").optional()),
                    ],
                ),
            ),
        ],
    )
}

impl ExternalFunction for GetExternalBadges {
    fn name(&self) -> &'static str {
        "core_badges_get_external_badges"
    }

    fn component(&self) -> &'static str {
        COMPONENT
    }

    fn description(&self) -> &'static str {
        "Returns the badges a user keeps in their external backpack."
    }

    fn describe_input(&self) -> Description {
        Description::single(
            "params",
            vec![field("userid", value(ParamType::Int, "User id"))],
        )
    }

    fn describe_output(&self) -> Description {
        Description::single(
            "result",
            vec![
                field(
                    "status",
                    value(ParamType::Bool, "Whether the fetch was successful"),
                ),
                field(
                    "badges",
                    Description::multiple(external_badge_structure(), "External badges"),
                ),
                field("warnings", warnings()),
            ],
        )
    }

    fn execute(&self, ctx: &RequestContext, args: ValidatedArgs) -> Result<Value> {
        let UserParams { userid } = args.parse()?;
        let strings = self.strings.as_ref();
        require_badges(ctx.features, strings)?;
        if !ctx.features.badges_allow_external_backpack {
            return Err(ExternalError::exception(
                ErrorCategory::FeatureDisabled,
                "externalbackpackdisabled",
                "badges",
                strings,
            ));
        }

        // The caller must be connected to a site backpack before any collection is read.
        let site = self.backpacks.connected_site_backpack(ctx.caller_id);
        let backpack = self.backpacks.user_backpack(userid);
        let outcome = match (site, backpack) {
            (Some(_), Some(backpack)) => {
                let badges = self
                    .backpacks
                    .collections(backpack.id)
                    .iter()
                    .flat_map(|collection| self.backpacks.badges_in_collection(collection))
                    .map(ExternalBadgeRecord::from)
                    .collect();
                Outcome::Ok(ExternalBadgeList { badges })
            }
            (None, _) => Outcome::failed(
                Warning::new(
                    "sitebackpackisnotconnected",
                    strings.get_string("error:sitebackpackisnotconnected", "badges"),
                )
                .with_item(userid.to_string()),
            ),
            (Some(_), None) => Outcome::failed(
                Warning::new(
                    "backpackisnotconnected",
                    strings.get_string("error:backpackisnotconnected", "badges"),
                )
                .with_item(userid.to_string()),
            ),
        };
        outcome.into_value()
    }
}
