//! End-to-end checks of the validate → execute → clean pipeline with a
//! batch-style function.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::BTreeSet;
use std::sync::Mutex;

use lms_external::{
    BatchOutcome, CapabilitySet, ContextLevel, ContextPath, Description, ExternalError,
    ExternalFunction, FeatureFlags, Field, FunctionRegistry, ParamType, RequestContext,
    ValidatedArgs, Warning, schema,
};
use pretty_assertions::assert_eq;
use serde::Deserialize;
use serde_json::{Value, json};

const DELETE: &str = "mod/test:delete";

/// Deletes items from a shared set, one warning per item that is not there.
struct DeleteItems {
    items: Mutex<BTreeSet<i64>>,
}

#[derive(Deserialize)]
struct DeleteParams {
    groupid: i64,
    itemids: Vec<i64>,
}

impl ExternalFunction for DeleteItems {
    fn name(&self) -> &'static str {
        "mod_test_delete_items"
    }

    fn component(&self) -> &'static str {
        "mod_test"
    }

    fn description(&self) -> &'static str {
        "Delete several items"
    }

    fn describe_input(&self) -> Description {
        Description::single(
            "params",
            vec![
                Field::new("groupid", Description::value(ParamType::Int, "group id")),
                Field::new(
                    "itemids",
                    Description::multiple(Description::value(ParamType::Int, "item id"), "items"),
                ),
            ],
        )
    }

    fn describe_output(&self) -> Description {
        schema::status_with_warnings("true if every item was deleted")
    }

    fn execute(&self, ctx: &RequestContext, args: ValidatedArgs) -> lms_external::Result<Value> {
        let params: DeleteParams = args.parse()?;
        if params.groupid != 1 {
            return Err(ExternalError::record_not_found("group", params.groupid));
        }
        let mut batch = BatchOutcome::new();
        let mut items = self.items.lock().unwrap();
        for itemid in params.itemids {
            if !ctx.has_capability(DELETE, &ContextPath::course(params.groupid)) {
                batch.record_failure(Warning::new("nopermission", "denied").with_itemid(itemid));
            } else if items.remove(&itemid) {
                batch.record_success();
            } else {
                batch.record_failure(
                    Warning::new("couldnotdelete", "Could not delete")
                        .with_item("missing")
                        .with_itemid(itemid),
                );
            }
        }
        batch.into_outcome().into_value()
    }
}

fn registry(items: &[i64]) -> FunctionRegistry {
    let mut registry = FunctionRegistry::new();
    registry.register(DeleteItems {
        items: Mutex::new(items.iter().copied().collect()),
    });
    registry
}

fn allowed() -> RequestContext {
    RequestContext::new(
        3,
        CapabilitySet::new().with_grant(DELETE, ContextLevel::Course(1)),
        FeatureFlags::default(),
    )
}

#[test]
fn all_items_pass() {
    let out = registry(&[1, 2, 3])
        .call("mod_test_delete_items", &allowed(), &json!({"groupid": 1, "itemids": [1, 2, 3]}))
        .unwrap();
    assert_eq!(out, json!({"status": true, "warnings": []}));
}

#[test]
fn one_warning_per_failed_item_in_order() {
    let registry = registry(&[1, 3]);
    let out = registry
        .call("mod_test_delete_items", &allowed(), &json!({"groupid": "1", "itemids": [1, 2, 3]}))
        .unwrap();
    assert_eq!(
        out,
        json!({
            "status": false,
            "warnings": [
                {"item": "missing", "itemid": 2, "warningcode": "couldnotdelete", "message": "Could not delete"}
            ]
        })
    );

    // Earlier successes stuck: a second run fails for every item.
    let out = registry
        .call("mod_test_delete_items", &allowed(), &json!({"groupid": 1, "itemids": [1, 3]}))
        .unwrap();
    assert_eq!(out["warnings"].as_array().map(Vec::len), Some(2));
}

#[test]
fn missing_capability_turns_into_warnings() {
    let ctx = RequestContext::new(3, CapabilitySet::new(), FeatureFlags::default());
    let out = registry(&[1])
        .call("mod_test_delete_items", &ctx, &json!({"groupid": 1, "itemids": [1]}))
        .unwrap();
    assert_eq!(out["status"], json!(false));
    assert_eq!(out["warnings"][0]["warningcode"], json!("nopermission"));
}

#[test]
fn structural_failures_are_fatal() {
    let registry = registry(&[1]);

    let err = registry
        .call("mod_test_delete_items", &allowed(), &json!({"groupid": 7, "itemids": [1]}))
        .unwrap_err();
    assert_eq!(err.errorcode(), "invalidrecord");

    let err = registry
        .call("mod_test_delete_items", &allowed(), &json!({"groupid": 1}))
        .unwrap_err();
    assert_eq!(
        err,
        ExternalError::MissingParameter {
            path: "itemids".to_string()
        }
    );

    let err = registry
        .call(
            "mod_test_delete_items",
            &allowed(),
            &json!({"groupid": 1, "itemids": [1], "force": true}),
        )
        .unwrap_err();
    assert_eq!(err.errorcode(), "invalidparameter");
}
