#![allow(clippy::unwrap_used, clippy::expect_used)]
//! `mod_assign_remove_submission(s)` through the service.

mod common;

use common::{Harness, warning_codes};
use lms_domain::course::capabilities::ASSIGN_EDIT_OTHER_SUBMISSION;
use lms_domain::{AssignInstance, Permission, SubmissionStatus, User};
use lms_external::{ContextLevel, ErrorCategory};
use pretty_assertions::assert_eq;
use serde_json::json;

struct Fixture {
    h: Harness,
    assign: AssignInstance,
    cmid: i64,
    manager: User,
    student1: User,
    student2: User,
}

fn fixture() -> Fixture {
    let h = Harness::new();
    let g = h.generator();
    let course = g.create_course();
    let cm = g.create_module("assign", course.id).unwrap();
    let assign = g.assign_instance(&cm).unwrap();
    let manager = g.create_and_enrol(&course, "manager").unwrap();
    let student1 = g.create_and_enrol(&course, "student").unwrap();
    let student2 = g.create_and_enrol(&course, "student").unwrap();
    g.add_submission(&assign, student1.id);
    g.add_submission(&assign, student2.id);
    g.submit_for_grading(&assign, student2.id).unwrap();
    Fixture {
        cmid: cm.id,
        h,
        assign,
        manager,
        student1,
        student2,
    }
}

fn latest_status(f: &Fixture, userid: i64) -> SubmissionStatus {
    use lms_domain::AssignmentRepository;
    f.h.site.user_submission(f.assign.id, userid).unwrap().status
}

#[test]
fn student_removes_own_draft() {
    let f = fixture();
    let token = f.h.token(&f.student1);
    let result = f.h.call(
        "mod_assign_remove_submission",
        &token,
        json!({"assignid": f.assign.id, "userid": f.student1.id}),
    );
    assert_eq!(result, json!({"status": true, "warnings": []}));
    assert_eq!(latest_status(&f, f.student1.id), SubmissionStatus::New);
}

#[test]
fn student_cannot_remove_someone_else() {
    let f = fixture();
    let token = f.h.token(&f.student1);
    let result = f.h.call(
        "mod_assign_remove_submission",
        &token,
        json!({"assignid": f.assign.id, "userid": f.student2.id}),
    );
    assert_eq!(result["status"], json!(false));
    assert_eq!(warning_codes(&result), vec!["usercantremovesubmission"]);
    assert_eq!(result["warnings"][0]["itemid"], json!(f.assign.id));
    assert_eq!(latest_status(&f, f.student2.id), SubmissionStatus::Submitted);
}

#[test]
fn missing_submission_is_reported_for_permitted_caller() {
    let f = fixture();
    let outsider = f.h.generator().create_user();
    let token = f.h.token(&f.manager);
    let result = f.h.call(
        "mod_assign_remove_submission",
        &token,
        json!({"assignid": f.assign.id, "userid": outsider.id}),
    );
    assert_eq!(result["status"], json!(false));
    assert_eq!(warning_codes(&result), vec!["userdonthavesubmission"]);
}

#[test]
fn both_warnings_when_unpermitted_and_missing() {
    let f = fixture();
    let outsider = f.h.generator().create_user();
    let token = f.h.token(&f.student1);
    let result = f.h.call(
        "mod_assign_remove_submission",
        &token,
        json!({"assignid": f.assign.id, "userid": outsider.id}),
    );
    assert_eq!(
        warning_codes(&result),
        vec!["usercantremovesubmission", "userdonthavesubmission"]
    );
}

#[test]
fn single_re_removal_fails_silently() {
    let f = fixture();
    let token = f.h.token(&f.manager);
    let args = json!({"assignid": f.assign.id, "userid": f.student2.id});
    let first = f.h.call("mod_assign_remove_submission", &token, args.clone());
    assert_eq!(first["status"], json!(true));

    let second = f.h.call("mod_assign_remove_submission", &token, args);
    assert_eq!(second, json!({"status": false, "warnings": []}));
}

#[test]
fn batch_with_unknown_user_removes_the_rest() {
    let f = fixture();
    let token = f.h.token(&f.manager);
    let unknown = 9999;
    let result = f.h.call(
        "mod_assign_remove_submissions",
        &token,
        json!({
            "assignid": f.assign.id,
            "userids": [f.student1.id, unknown, f.student2.id]
        }),
    );
    assert_eq!(result["status"], json!(false));
    assert_eq!(warning_codes(&result), vec!["couldnotremovesubmission"]);
    assert_eq!(result["warnings"][0]["item"], json!("user"));
    assert_eq!(result["warnings"][0]["itemid"], json!(unknown));
    assert_eq!(
        result["warnings"][0]["message"],
        json!("Userid 9999 error: No submission to remove")
    );
    assert_eq!(latest_status(&f, f.student1.id), SubmissionStatus::New);
    assert_eq!(latest_status(&f, f.student2.id), SubmissionStatus::New);
}

#[test]
fn batch_all_removed() {
    let f = fixture();
    let token = f.h.token(&f.manager);
    let result = f.h.call(
        "mod_assign_remove_submissions",
        &token,
        json!({"assignid": f.assign.id, "userids": [f.student1.id, f.student2.id]}),
    );
    assert_eq!(result, json!({"status": true, "warnings": []}));
}

#[test]
fn batch_re_removal_warns_once() {
    let f = fixture();
    let token = f.h.token(&f.manager);
    let args = json!({"assignid": f.assign.id, "userids": [f.student1.id]});
    let first = f.h.call("mod_assign_remove_submissions", &token, args.clone());
    assert_eq!(first["status"], json!(true));

    let second = f.h.call("mod_assign_remove_submissions", &token, args);
    assert_eq!(second["status"], json!(false));
    assert_eq!(warning_codes(&second), vec!["couldnotremovesubmission"]);
    assert_eq!(
        second["warnings"][0]["message"],
        json!(format!("Userid {} error: Nothing to remove", f.student1.id))
    );
}

#[test]
fn unknown_assignment_is_fatal_for_both() {
    let f = fixture();
    let token = f.h.token(&f.manager);
    let single = f.h.call_err(
        "mod_assign_remove_submission",
        &token,
        json!({"assignid": 424242, "userid": f.student1.id}),
    );
    assert_eq!(single.category(), ErrorCategory::NotFound);

    let batch = f.h.call_err(
        "mod_assign_remove_submissions",
        &token,
        json!({"assignid": 424242, "userids": [f.student1.id]}),
    );
    assert_eq!(batch.category(), ErrorCategory::NotFound);
}

#[test]
fn prohibit_in_module_blocks_manager() {
    let f = fixture();
    let g = f.h.generator();
    let manager_role = f.h.site.role_by_shortname("manager").unwrap();
    g.assign_capability(
        ASSIGN_EDIT_OTHER_SUBMISSION,
        Permission::Prohibit,
        manager_role.id,
        ContextLevel::Module(f.cmid),
    );
    let token = f.h.token(&f.manager);
    let result = f.h.call(
        "mod_assign_remove_submission",
        &token,
        json!({"assignid": f.assign.id, "userid": f.student1.id}),
    );
    assert_eq!(warning_codes(&result), vec!["usercantremovesubmission"]);

    let batch = f.h.call(
        "mod_assign_remove_submissions",
        &token,
        json!({"assignid": f.assign.id, "userids": [f.student1.id]}),
    );
    assert_eq!(batch["status"], json!(false));
    assert_eq!(batch["warnings"][0]["itemid"], json!(f.student1.id));
    assert_eq!(latest_status(&f, f.student1.id), SubmissionStatus::Draft);
}

#[test]
fn reopened_attempt_after_removal() {
    let f = fixture();
    let g = f.h.generator();
    g.add_attempt(&f.assign, f.student2.id);
    let token = f.h.token(&f.manager);
    let result = f.h.call(
        "mod_assign_remove_submission",
        &token,
        json!({"assignid": f.assign.id, "userid": f.student2.id}),
    );
    assert_eq!(result["status"], json!(true));
    assert_eq!(latest_status(&f, f.student2.id), SubmissionStatus::Reopened);
}

#[test]
fn non_integer_userids_are_rejected() {
    let f = fixture();
    let token = f.h.token(&f.manager);
    let err = f.h.call_err(
        "mod_assign_remove_submissions",
        &token,
        json!({"assignid": f.assign.id, "userids": ["abc"]}),
    );
    assert_eq!(err.category(), ErrorCategory::InvalidInput);
}
