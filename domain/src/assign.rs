//! Assignment instances and their submissions.

use lms_external::{ContextPath, RequestContext};
use serde::{Deserialize, Serialize};

use crate::course::capabilities::{ASSIGN_EDIT_OTHER_SUBMISSION, ASSIGN_SUBMIT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    New,
    Draft,
    Submitted,
    Reopened,
}

impl SubmissionStatus {
    /// Only draft and submitted attempts carry content that can be removed.
    pub fn is_removable(self) -> bool {
        matches!(self, Self::Draft | Self::Submitted)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignInstance {
    pub id: i64,
    pub course: i64,
    pub cmid: i64,
    pub name: String,
}

impl AssignInstance {
    pub fn context(&self) -> ContextPath {
        ContextPath::module(self.course, self.cmid)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub id: i64,
    pub assignment: i64,
    pub userid: i64,
    pub status: SubmissionStatus,
    pub attemptnumber: i64,
    pub timemodified: i64,
}

/// Why a removal did not happen.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemovalRefused {
    #[error("The submission of {fullname} cannot be removed")]
    NoPermission { fullname: String },

    #[error("Userid {userid} error: No submission to remove")]
    NoSubmission { userid: i64 },

    #[error("Userid {userid} error: Nothing to remove")]
    NothingToRemove { userid: i64 },
}

/// Whether the caller may change `userid`'s submission: their own with
/// `mod/assign:submit`, anyone's with `mod/assign:editothersubmission`.
pub fn can_edit_submission(assign: &AssignInstance, userid: i64, ctx: &RequestContext) -> bool {
    let context = assign.context();
    if ctx.is_caller(userid) && ctx.has_capability(ASSIGN_SUBMIT, &context) {
        return true;
    }
    ctx.has_capability(ASSIGN_EDIT_OTHER_SUBMISSION, &context)
}

pub trait AssignmentRepository: Send + Sync {
    fn assign(&self, id: i64) -> Option<AssignInstance>;

    /// The latest attempt of `userid`, if any.
    fn user_submission(&self, assignid: i64, userid: i64) -> Option<Submission>;

    /// Reset the user's latest attempt: `new`, or `reopened` for attempts after
    /// the first. Returns the updated submission.
    fn remove_submission(
        &self,
        assign: &AssignInstance,
        userid: i64,
        ctx: &RequestContext,
    ) -> Result<Submission, RemovalRefused>;
}
