#![allow(clippy::unwrap_used, clippy::expect_used)]
//! `core_badges_*` functions through the service.

mod common;

use common::{Harness, warning_codes};
use lms_domain::generator::NewBadge;
use lms_domain::{BackpackRepository, BadgeType, User};
use lms_external::{ErrorCategory, FeatureFlags};
use pretty_assertions::assert_eq;
use serde_json::json;

const BY_HASH: &str = "core_badges_get_user_badge_by_hash";
const EXTERNAL: &str = "core_badges_get_external_badges";

struct Awarded {
    h: Harness,
    owner: User,
    classmate: User,
    teacher: User,
    hash: String,
}

fn awarded(features: FeatureFlags) -> Awarded {
    let h = Harness::with_features(features);
    let g = h.generator();
    let course = g.create_course();
    let owner = g.create_and_enrol(&course, "student").unwrap();
    let classmate = g.create_and_enrol(&course, "student").unwrap();
    let teacher = g.create_and_enrol(&course, "editingteacher").unwrap();
    let badge = g
        .create_badge(NewBadge {
            name: "Course badge".to_string(),
            badge_type: BadgeType::Course,
            courseid: Some(course.id),
            ..NewBadge::default()
        })
        .unwrap();
    g.add_alignment(badge.id, "Alignment 1").unwrap();
    let hash = g.issue_badge(badge.id, owner.id).unwrap().uniquehash;
    Awarded {
        h,
        owner,
        classmate,
        teacher,
        hash,
    }
}

#[test]
fn owner_gets_badge_by_hash() {
    let a = awarded(FeatureFlags::default());
    let token = a.h.token(&a.owner);
    let result = a.h.call(BY_HASH, &token, json!({"hash": a.hash}));

    assert_eq!(result["status"], json!(true));
    assert_eq!(result["warnings"], json!([]));
    let badges = result["badge"].as_array().unwrap();
    assert_eq!(badges.len(), 1);
    assert_eq!(badges[0]["name"], json!("Course badge"));
    assert_eq!(badges[0]["uniquehash"], json!(a.hash));
    assert_eq!(badges[0]["message"], json!("Test message body for badge"));
    assert_eq!(badges[0]["alignment"][0]["targetname"], json!("Alignment 1"));
}

#[test]
fn classmate_gets_public_subset() {
    let a = awarded(FeatureFlags::default());
    let token = a.h.token(&a.classmate);
    let result = a.h.call(BY_HASH, &token, json!({"hash": a.hash}));

    let badge = &result["badge"][0];
    assert_eq!(result["status"], json!(true));
    assert!(badge.get("message").is_none(), "{badge}");
    assert!(badge.get("usercreated").is_none(), "{badge}");
    assert!(badge["alignment"][0].get("targetcode").is_none());
    assert_eq!(badge["name"], json!("Course badge"));
}

#[test]
fn teacher_with_configuredetails_sees_message() {
    let a = awarded(FeatureFlags::default());
    let token = a.h.token(&a.teacher);
    let result = a.h.call(BY_HASH, &token, json!({"hash": a.hash}));
    assert_eq!(result["badge"][0]["message"], json!("Test message body for badge"));
}

#[test]
fn unknown_hash_warns_with_hash_as_item() {
    let a = awarded(FeatureFlags::default());
    let token = a.h.token(&a.owner);
    let result = a.h.call(BY_HASH, &token, json!({"hash": "doesnotexist"}));

    assert_eq!(result["status"], json!(false));
    assert_eq!(result["badge"], json!([]));
    assert_eq!(warning_codes(&result), vec!["badgeawardnotfound"]);
    assert_eq!(result["warnings"][0]["item"], json!("doesnotexist"));
}

#[test]
fn hash_must_be_alphanumeric() {
    let a = awarded(FeatureFlags::default());
    let token = a.h.token(&a.owner);
    let err = a.h.call_err(BY_HASH, &token, json!({"hash": "../etc"}));
    assert_eq!(err.category(), ErrorCategory::InvalidInput);
}

#[test]
fn badges_disabled_is_fatal() {
    let a = awarded(FeatureFlags {
        enable_badges: false,
        ..FeatureFlags::default()
    });
    let token = a.h.token(&a.owner);

    let err = a.h.call_err(BY_HASH, &token, json!({"hash": a.hash}));
    assert_eq!(err.category(), ErrorCategory::FeatureDisabled);
    assert_eq!(err.errorcode(), "badgesdisabled");

    let err = a.h.call_err(EXTERNAL, &token, json!({"userid": a.owner.id}));
    assert_eq!(err.errorcode(), "badgesdisabled");
}

struct Backpacks {
    h: Harness,
    student1: User,
    student2: User,
    teacher: User,
    outsider: User,
}

fn backpacks(features: FeatureFlags) -> Backpacks {
    let h = Harness::with_features(features);
    let g = h.generator();
    let course = g.create_course();
    let student1 = g.create_and_enrol(&course, "student").unwrap();
    let student2 = g.create_and_enrol(&course, "student").unwrap();
    let teacher = g.create_and_enrol(&course, "editingteacher").unwrap();
    let outsider = g.create_user();
    for student in [&student1, &student2] {
        let backpack = g.create_fake_backpack(student.id, None).unwrap();
        g.create_fake_backpack_collection(backpack.id).unwrap();
    }
    Backpacks {
        h,
        student1,
        student2,
        teacher,
        outsider,
    }
}

#[test]
fn connected_users_get_external_badges() {
    let b = backpacks(FeatureFlags::default());
    let token = b.h.token(&b.student1);

    for target in [&b.student1, &b.student2] {
        let result = b.h.call(EXTERNAL, &token, json!({"userid": target.id}));
        assert_eq!(result["status"], json!(true), "{result}");
        assert_eq!(result["warnings"], json!([]));
        let badges = result["badges"].as_array().unwrap();
        assert_eq!(badges.len(), 1);
        assert_eq!(
            badges[0]["recipient"]["identity"],
            json!(target.email)
        );
    }
}

#[test]
fn caller_without_backpack_is_not_connected() {
    let b = backpacks(FeatureFlags::default());
    let token = b.h.token(&b.teacher);
    let result = b.h.call(EXTERNAL, &token, json!({"userid": b.student1.id}));

    assert_eq!(result["status"], json!(false));
    assert_eq!(result["badges"], json!([]));
    assert_eq!(warning_codes(&result), vec!["sitebackpackisnotconnected"]);
    assert_eq!(result["warnings"][0]["item"], json!(b.student1.id.to_string()));
}

#[test]
fn target_without_backpack_is_not_connected() {
    let b = backpacks(FeatureFlags::default());
    let token = b.h.token(&b.student1);
    let result = b.h.call(EXTERNAL, &token, json!({"userid": b.outsider.id}));

    assert_eq!(result["status"], json!(false));
    assert_eq!(warning_codes(&result), vec!["backpackisnotconnected"]);
}

#[test]
fn any_connected_caller_sees_the_same_collection() {
    let b = backpacks(FeatureFlags::default());
    let own = b.h.call(EXTERNAL, &b.h.token(&b.student2), json!({"userid": b.student2.id}));
    let other = b.h.call(EXTERNAL, &b.h.token(&b.student1), json!({"userid": b.student2.id}));
    assert_eq!(own["status"], json!(true));
    assert_eq!(own, other);
}

#[test]
fn badges_from_every_collection_are_returned() {
    let b = backpacks(FeatureFlags::default());
    let g = b.h.generator();
    let backpack = b.h.site.user_backpack(b.student2.id).unwrap();
    g.create_fake_backpack_collection(backpack.id).unwrap();

    let token = b.h.token(&b.student2);
    let result = b.h.call(EXTERNAL, &token, json!({"userid": b.student2.id}));
    assert_eq!(result["badges"].as_array().unwrap().len(), 2);
}

#[test]
fn undeclared_badge_keys_are_dropped() {
    let b = backpacks(FeatureFlags::default());
    let token = b.h.token(&b.student1);
    let result = b.h.call(EXTERNAL, &token, json!({"userid": b.student1.id}));
    let badge = &result["badges"][0];

    assert!(badge["hostedurl"].is_string(), "{badge}");
    assert_eq!(badge["issuer"]["name"], json!("Backpack issuer"));
    assert!(badge["issuer"].get("publicKey").is_none(), "{badge}");
    assert!(badge["criteria"].get("rubric").is_none(), "{badge}");
    assert!(badge.get("hostedUrl").is_none());
}

#[test]
fn external_backpack_disabled_is_fatal() {
    let b = backpacks(FeatureFlags {
        badges_allow_external_backpack: false,
        ..FeatureFlags::default()
    });
    let token = b.h.token(&b.student1);
    let err = b.h.call_err(EXTERNAL, &token, json!({"userid": b.student1.id}));
    assert_eq!(err.category(), ErrorCategory::FeatureDisabled);
    assert_eq!(err.errorcode(), "externalbackpackdisabled");
    assert_eq!(err.component(), "badges");
}
