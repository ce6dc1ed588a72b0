//! `mod_chat_view_sessions`.

use std::sync::Arc;

use lms_domain::course::capabilities::CHAT_READLOG;
use lms_domain::{ChatRepository, CourseDirectory, Event, EventSink};
use lms_external::schema::status_with_warnings;
use lms_external::{
    ContextPath, Description, ErrorCategory, ExternalError, ExternalFunction, Field, Outcome,
    ParamType, RequestContext, Result, StatusOnly, StringManager, ValidatedArgs, Warning,
};
use serde::Deserialize;
use serde_json::{Value, json};

pub struct ViewSessions {
    pub courses: Arc<dyn CourseDirectory>,
    pub chats: Arc<dyn ChatRepository>,
    pub events: Arc<dyn EventSink>,
    pub strings: Arc<dyn StringManager>,
}

#[derive(Deserialize)]
struct ViewParams {
    cmid: i64,
    start: i64,
    end: i64,
}

impl ViewSessions {
    fn invalid_module(&self) -> ExternalError {
        ExternalError::exception(
            ErrorCategory::NotFound,
            "invalidcoursemodule",
            "error",
            self.strings.as_ref(),
        )
    }
}

impl ExternalFunction for ViewSessions {
    fn name(&self) -> &'static str {
        "mod_chat_view_sessions"
    }

    fn component(&self) -> &'static str {
        "mod_chat"
    }

    fn description(&self) -> &'static str {
        "Trigger the chat session viewed event."
    }

    fn describe_input(&self) -> Description {
        Description::single(
            "params",
            vec![
                Field::new("cmid", Description::value(ParamType::Int, "Course module id")),
                Field::new(
                    "start",
                    Description::value(ParamType::Int, "Session start time").with_default(json!(0)),
                ),
                Field::new(
                    "end",
                    Description::value(ParamType::Int, "Session end time").with_default(json!(0)),
                ),
            ],
        )
    }

    fn describe_output(&self) -> Description {
        status_with_warnings("status: true if success")
    }

    fn execute(&self, ctx: &RequestContext, args: ValidatedArgs) -> Result<Value> {
        let ViewParams { cmid, start, end } = args.parse()?;
        let cm = self
            .courses
            .course_module_of("chat", cmid)
            .ok_or_else(|| self.invalid_module())?;
        let chat = self
            .chats
            .chat(cm.instance)
            .ok_or_else(|| self.invalid_module())?;

        let context = ContextPath::module(cm.course, cm.id);
        if !ctx.has_capability(CHAT_READLOG, &context) {
            return Outcome::<StatusOnly>::failed(
                Warning::new(
                    "nopermissiontoseethechatlog",
                    self.strings.get_string("nopermissiontoseethechatlog", "chat"),
                )
                .with_item(cm.id.to_string()),
            )
            .into_value();
        }

        self.events
            .trigger(Event::sessions_viewed(&cm, &chat, ctx.caller_id, start, end));
        Outcome::Ok(StatusOnly {}).into_value()
    }
}
