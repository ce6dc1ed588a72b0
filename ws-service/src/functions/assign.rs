//! `mod_assign_remove_submission` and `mod_assign_remove_submissions`.

use std::sync::Arc;

use lms_domain::assign::can_edit_submission;
use lms_domain::{AssignInstance, AssignmentRepository, RemovalRefused};
use lms_external::schema::status_with_warnings;
use lms_external::{
    BatchOutcome, Description, ExternalError, ExternalFunction, Field, Outcome, ParamType,
    RequestContext, Result, StatusOnly, StringManager, ValidatedArgs, Warning,
};
use serde::Deserialize;
use serde_json::Value;

const COMPONENT: &str = "mod_assign";

/// Structural precondition shared by both functions.
fn require_assign(assignments: &dyn AssignmentRepository, assignid: i64) -> Result<AssignInstance> {
    assignments
        .assign(assignid)
        .ok_or_else(|| ExternalError::record_not_found("assign", assignid))
}

fn assignid_field() -> Field {
    Field::new(
        "assignid",
        Description::value(ParamType::Int, "Assignment instance id"),
    )
}

pub struct RemoveSubmission {
    pub assignments: Arc<dyn AssignmentRepository>,
    pub strings: Arc<dyn StringManager>,
}

#[derive(Deserialize)]
struct RemoveParams {
    assignid: i64,
    userid: i64,
}

impl RemoveSubmission {
    fn warning(&self, code: &str, assignid: i64) -> Warning {
        Warning::new(code, self.strings.get_string(code, "assign")).with_itemid(assignid)
    }
}

impl ExternalFunction for RemoveSubmission {
    fn name(&self) -> &'static str {
        "mod_assign_remove_submission"
    }

    fn component(&self) -> &'static str {
        COMPONENT
    }

    fn description(&self) -> &'static str {
        "Remove submission."
    }

    fn describe_input(&self) -> Description {
        Description::single(
            "params",
            vec![
                assignid_field(),
                Field::new("userid", Description::value(ParamType::Int, "User id")),
            ],
        )
    }

    fn describe_output(&self) -> Description {
        status_with_warnings("True if the submission was successfully removed and false if it was not.")
    }

    fn execute(&self, ctx: &RequestContext, args: ValidatedArgs) -> Result<Value> {
        let RemoveParams { assignid, userid } = args.parse()?;
        let assign = require_assign(self.assignments.as_ref(), assignid)?;

        let mut warnings = Vec::new();
        if !can_edit_submission(&assign, userid, ctx) {
            warnings.push(self.warning("usercantremovesubmission", assignid));
        }
        let submission = self.assignments.user_submission(assign.id, userid);
        if submission.is_none() {
            warnings.push(self.warning("userdonthavesubmission", assignid));
        }

        // Attempts that are new or reopened hold nothing to remove; that
        // case reports failure without a warning.
        let removable = submission.is_some_and(|s| s.status.is_removable());
        let removed = warnings.is_empty()
            && removable
            && self
                .assignments
                .remove_submission(&assign, userid, ctx)
                .inspect_err(|refused| tracing::debug!("remove_submission refused: {refused}"))
                .is_ok();

        let outcome = if removed {
            Outcome::Ok(StatusOnly {})
        } else {
            Outcome::Failed(warnings)
        };
        outcome.into_value()
    }
}

pub struct RemoveSubmissions {
    pub assignments: Arc<dyn AssignmentRepository>,
}

#[derive(Deserialize)]
struct RemoveManyParams {
    assignid: i64,
    userids: Vec<i64>,
}

impl ExternalFunction for RemoveSubmissions {
    fn name(&self) -> &'static str {
        "mod_assign_remove_submissions"
    }

    fn component(&self) -> &'static str {
        COMPONENT
    }

    fn description(&self) -> &'static str {
        "Remove submissions."
    }

    fn describe_input(&self) -> Description {
        Description::single(
            "params",
            vec![
                assignid_field(),
                Field::new(
                    "userids",
                    Description::multiple(
                        Description::value(ParamType::Int, "User id"),
                        "Array of user ids",
                    ),
                ),
            ],
        )
    }

    fn describe_output(&self) -> Description {
        status_with_warnings("True if every submission was removed, false otherwise.")
    }

    fn execute(&self, ctx: &RequestContext, args: ValidatedArgs) -> Result<Value> {
        let RemoveManyParams { assignid, userids } = args.parse()?;
        let assign = require_assign(self.assignments.as_ref(), assignid)?;

        let mut batch = BatchOutcome::new();
        for userid in userids {
            let attempt = match self.assignments.user_submission(assign.id, userid) {
                None => Err(RemovalRefused::NoSubmission { userid }),
                Some(_) => self.assignments.remove_submission(&assign, userid, ctx),
            };
            match attempt {
                Ok(_) => batch.record_success(),
                Err(refused) => batch.record_failure(
                    Warning::new("couldnotremovesubmission", refused.to_string())
                        .with_item("user")
                        .with_itemid(userid),
                ),
            }
        }
        tracing::debug!(
            "remove_submissions on assign {assignid}: {} of {} removed",
            batch.succeeded(),
            batch.attempted()
        );
        batch.into_outcome().into_value()
    }
}
