//! Shared fixtures for the service integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use lms_domain::{DataGenerator, InMemorySite, User};
use lms_external::{ExternalError, FeatureFlags, LangStrings};
use lms_ws_service::service::WsService;
use serde_json::Value;

pub struct Harness {
    pub site: Arc<InMemorySite>,
    pub service: WsService,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_features(FeatureFlags::default())
    }

    pub fn with_features(features: FeatureFlags) -> Self {
        let site = Arc::new(InMemorySite::default());
        let service = WsService::new(
            Arc::clone(&site),
            features,
            Arc::new(LangStrings::english()),
        );
        Self { site, service }
    }

    pub fn generator(&self) -> DataGenerator<'_> {
        DataGenerator::new(&self.site)
    }

    /// A web-service token for `user`.
    pub fn token(&self, user: &User) -> String {
        self.generator()
            .create_token(user.id)
            .unwrap_or_else(|e| panic!("token for {}: {e}", user.id))
    }

    pub fn call(&self, function: &str, token: &str, args: Value) -> Value {
        self.service
            .call(function, token, &args)
            .unwrap_or_else(|e| panic!("{function} failed: {e}"))
    }

    pub fn call_err(&self, function: &str, token: &str, args: Value) -> ExternalError {
        match self.service.call(function, token, &args) {
            Ok(value) => panic!("{function} should fail, got {value}"),
            Err(e) => e,
        }
    }
}

/// Warning codes of an envelope, in order.
pub fn warning_codes(envelope: &Value) -> Vec<String> {
    envelope["warnings"]
        .as_array()
        .unwrap_or_else(|| panic!("no warnings array in {envelope}"))
        .iter()
        .filter_map(|w| w["warningcode"].as_str().map(str::to_string))
        .collect()
}
