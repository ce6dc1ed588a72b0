//! Result envelopes and warnings.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ExternalError, Result};

/// A non-fatal explanation of why (part of) an operation did not happen.
///
/// Serialized in the LMS `external_warnings` shape: `item` names the thing the
/// warning is about, `itemid` its numeric id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub itemid: Option<i64>,
    pub warningcode: String,
    pub message: String,
}

impl Warning {
    pub fn new(warningcode: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            item: None,
            itemid: None,
            warningcode: warningcode.into(),
            message: message.into(),
        }
    }

    pub fn with_item(mut self, item: impl Into<String>) -> Self {
        self.item = Some(item.into());
        self
    }

    pub fn with_itemid(mut self, itemid: i64) -> Self {
        self.itemid = Some(itemid);
        self
    }
}

/// Payload for envelopes that carry nothing beyond `status` and `warnings`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusOnly {}

/// Outcome of an external function that passed structural checks.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub enum Outcome<T> {
    Ok(T),
    /// The primary action did not take effect. The list may be empty when the
    /// function has nothing actionable to report.
    Failed(Vec<Warning>),
}

impl<T> Outcome<T> {
    pub fn failed(warning: Warning) -> Self {
        Self::Failed(vec![warning])
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    pub fn warnings(&self) -> &[Warning] {
        match self {
            Self::Ok(_) => &[],
            Self::Failed(warnings) => warnings,
        }
    }
}

impl<T: Default> Outcome<T> {
    pub fn into_envelope(self) -> ResultEnvelope<T> {
        match self {
            Self::Ok(payload) => ResultEnvelope {
                status: true,
                payload,
                warnings: Vec::new(),
            },
            Self::Failed(warnings) => ResultEnvelope {
                status: false,
                payload: T::default(),
                warnings,
            },
        }
    }
}

impl<T: Default + Serialize> Outcome<T> {
    /// Serialize the envelope for the registry's output cleaning step.
    pub fn into_value(self) -> Result<Value> {
        serde_json::to_value(self.into_envelope())
            .map_err(|e| ExternalError::Internal(format!("serialize result: {e}")))
    }
}

/// `status` + `warnings` with the operation payload flattened alongside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEnvelope<T> {
    pub status: bool,
    #[serde(flatten)]
    pub payload: T,
    #[serde(default)]
    pub warnings: Vec<Warning>,
}

/// Aggregates independently attempted items of a bulk operation.
///
/// Each failed item contributes exactly one warning. The aggregate succeeds
/// only when every item did; earlier successes stay applied either way.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    attempted: usize,
    succeeded: usize,
    warnings: Vec<Warning>,
}

impl BatchOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self) {
        self.attempted += 1;
        self.succeeded += 1;
    }

    pub fn record_failure(&mut self, warning: Warning) {
        self.attempted += 1;
        self.warnings.push(warning);
    }

    pub fn attempted(&self) -> usize {
        self.attempted
    }

    pub fn succeeded(&self) -> usize {
        self.succeeded
    }

    pub fn failed(&self) -> usize {
        self.warnings.len()
    }

    pub fn status(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn into_outcome(self) -> Outcome<StatusOnly> {
        if self.warnings.is_empty() {
            Outcome::Ok(StatusOnly {})
        } else {
            Outcome::Failed(self.warnings)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[derive(Debug, Default, Serialize)]
    struct Badges {
        badges: Vec<String>,
    }

    #[test]
    fn ok_outcome_has_status_true_and_no_warnings() {
        let value = Outcome::Ok(Badges {
            badges: vec!["a".to_string()],
        })
        .into_value()
        .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(value, json!({"status": true, "badges": ["a"], "warnings": []}));
    }

    #[test]
    fn failed_outcome_defaults_payload() {
        let value = Outcome::<Badges>::failed(
            Warning::new("backpackisnotconnected", "not connected").with_item("42"),
        )
        .into_value()
        .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(
            value,
            json!({
                "status": false,
                "badges": [],
                "warnings": [{"item": "42", "warningcode": "backpackisnotconnected", "message": "not connected"}]
            })
        );
    }

    #[test]
    fn status_only_envelope() {
        let value = Outcome::<StatusOnly>::Failed(Vec::new())
            .into_value()
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(value, json!({"status": false, "warnings": []}));
    }

    #[test]
    fn batch_status_tracks_failures() {
        let mut batch = BatchOutcome::new();
        batch.record_success();
        batch.record_failure(Warning::new("couldnotremovesubmission", "no").with_itemid(2));
        batch.record_success();
        assert_eq!(batch.attempted(), 3);
        assert_eq!(batch.succeeded(), 2);
        assert_eq!(batch.failed(), 1);
        assert!(!batch.status());

        let outcome = batch.into_outcome();
        assert!(!outcome.is_ok());
        assert_eq!(outcome.warnings().len(), 1);
    }

    #[test]
    fn empty_batch_succeeds() {
        assert!(BatchOutcome::new().into_outcome().is_ok());
    }
}
