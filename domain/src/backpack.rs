//! External backpacks: site-level backpack services, user connections to
//! them, the collections a user shares, and the badges in those collections.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Open Badges API versions a site backpack may speak.
pub const OPEN_BADGES_V2: &str = "2";
pub const OPEN_BADGES_V2P1: &str = "2.1";

/// A backpack service registered on the site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteBackpack {
    pub id: i64,
    pub apiversion: String,
    pub backpackapiurl: String,
    pub backpackweburl: String,
}

/// A user's connection to a site backpack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBackpack {
    pub id: i64,
    pub userid: i64,
    pub externalbackpackid: i64,
    pub email: String,
    pub backpackuid: String,
    #[serde(default)]
    pub autosync: bool,
}

/// A collection the user selected for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackpackCollection {
    pub id: i64,
    pub backpackid: i64,
    pub collectionid: String,
    pub entityid: String,
}

/// A badge as returned by the backpack service. The sub-objects are kept as
/// the service sent them, undeclared keys included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalBadge {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub badge_type: Option<String>,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosted_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub issued_on: String,
    #[serde(default)]
    pub issuer: Map<String, Value>,
    #[serde(default)]
    pub recipient: Map<String, Value>,
    #[serde(default)]
    pub criteria: Map<String, Value>,
}

pub trait BackpackRepository: Send + Sync {
    /// The site backpack `userid` is connected to, if any.
    fn connected_site_backpack(&self, userid: i64) -> Option<SiteBackpack>;

    fn user_backpack(&self, userid: i64) -> Option<UserBackpack>;

    fn collections(&self, backpackid: i64) -> Vec<BackpackCollection>;

    /// Badges stored in `collection`.
    fn badges_in_collection(&self, collection: &BackpackCollection) -> Vec<ExternalBadge>;
}
