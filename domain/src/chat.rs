//! Chat instances and the event log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::course::CourseModule;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    pub course: i64,
    pub name: String,
    #[serde(default)]
    pub intro: String,
}

pub trait ChatRepository: Send + Sync {
    fn chat(&self, id: i64) -> Option<Chat>;
}

/// A triggered event with the records it was raised about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub eventname: String,
    pub component: String,
    pub action: String,
    pub target: String,
    pub contextinstanceid: i64,
    pub objectid: i64,
    pub userid: i64,
    pub courseid: i64,
    pub other: Value,
    pub timecreated: DateTime<Utc>,
    #[serde(default)]
    pub snapshots: Vec<(String, Value)>,
}

impl Event {
    /// `\mod_chat\event\sessions_viewed` for `chat` in module `cm`.
    pub fn sessions_viewed(cm: &CourseModule, chat: &Chat, userid: i64, start: i64, end: i64) -> Self {
        Self {
            eventname: "\\mod_chat\\event\\sessions_viewed".to_string(),
            component: "mod_chat".to_string(),
            action: "viewed".to_string(),
            target: "sessions".to_string(),
            contextinstanceid: cm.id,
            objectid: chat.id,
            userid,
            courseid: cm.course,
            other: json!({"start": start, "end": end}),
            timecreated: Utc::now(),
            snapshots: vec![(
                "chat".to_string(),
                serde_json::to_value(chat).unwrap_or(Value::Null),
            )],
        }
    }
}

pub trait EventSink: Send + Sync {
    fn trigger(&self, event: Event);
}
