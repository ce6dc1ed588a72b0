//! The service state shared by every connection.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use lms_domain::{CourseDirectory, GeneratorError, InMemorySite, SiteSeed, TokenStore, UserDirectory};
use lms_external::{
    ExternalError, FeatureFlags, FunctionRegistry, LangStrings, RequestContext, StringManager,
};
use serde_json::Value;
use thiserror::Error;

use crate::config::ServiceConfig;
use crate::functions;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Seed(#[from] GeneratorError),
}

pub struct WsService {
    registry: FunctionRegistry,
    site: Arc<InMemorySite>,
    features: FeatureFlags,
    started_at: Instant,
    calls_served: AtomicU64,
    calls_failed: AtomicU64,
}

impl WsService {
    pub fn new(site: Arc<InMemorySite>, features: FeatureFlags, strings: Arc<dyn StringManager>) -> Self {
        let mut registry = FunctionRegistry::new();
        functions::register_all(&mut registry, &site, &strings);
        Self {
            registry,
            site,
            features,
            started_at: Instant::now(),
            calls_served: AtomicU64::new(0),
            calls_failed: AtomicU64::new(0),
        }
    }

    /// Build the site from the configured seed and apply string overrides.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, ServiceError> {
        let mut seed = match config.resolved_seed_path() {
            Some(path) => {
                tracing::info!("loading site seed from {}", path.display());
                SiteSeed::load(&path)?
            }
            None => {
                tracing::warn!("no seed_path configured; starting with an empty site");
                SiteSeed::default()
            }
        };
        if let Some(wwwroot) = &config.wwwroot {
            seed.wwwroot = Some(wwwroot.clone());
        }
        let site = Arc::new(seed.build()?);
        let strings = LangStrings::english().with_overrides(&config.strings);
        Ok(Self::new(site, config.features, Arc::new(strings)))
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    pub fn site(&self) -> &Arc<InMemorySite> {
        &self.site
    }

    pub fn features(&self) -> FeatureFlags {
        self.features
    }

    /// Resolve `token` to a caller and their capabilities.
    pub fn context_for_token(&self, token: &str) -> Result<RequestContext, ExternalError> {
        let caller = self
            .site
            .user_for_token(token)
            .filter(|id| self.site.user(*id).is_some())
            .ok_or(ExternalError::InvalidToken)?;
        Ok(RequestContext::new(
            caller,
            self.site.capabilities_for(caller),
            self.features,
        ))
    }

    /// Run an external function on behalf of the token's owner.
    pub fn call(&self, function: &str, token: &str, args: &Value) -> Result<Value, ExternalError> {
        let result = self
            .context_for_token(token)
            .and_then(|ctx| self.registry.call(function, &ctx, args));
        let counter = if result.is_ok() {
            &self.calls_served
        } else {
            &self.calls_failed
        };
        counter.fetch_add(1, Ordering::Relaxed);
        result
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn calls_served(&self) -> u64 {
        self.calls_served.load(Ordering::Relaxed)
    }

    pub fn calls_failed(&self) -> u64 {
        self.calls_failed.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lms_domain::DataGenerator;
    use serde_json::json;

    #[test]
    fn unknown_token_is_rejected_and_counted() {
        let service = WsService::new(
            Arc::new(InMemorySite::default()),
            FeatureFlags::default(),
            Arc::new(LangStrings::english()),
        );
        let err = service
            .call("mod_chat_view_sessions", "nope", &json!({"cmid": 1}))
            .err();
        assert_eq!(err, Some(ExternalError::InvalidToken));
        assert_eq!(service.calls_failed(), 1);
        assert_eq!(service.calls_served(), 0);
    }

    #[test]
    fn token_resolves_caller_capabilities() {
        let site = Arc::new(InMemorySite::default());
        let generator = DataGenerator::new(&site);
        let admin = generator.create_admin();
        let token = generator
            .create_token(admin.id)
            .unwrap_or_else(|e| panic!("{e}"));

        let service = WsService::new(
            Arc::clone(&site),
            FeatureFlags::default(),
            Arc::new(LangStrings::english()),
        );
        let ctx = service
            .context_for_token(&token)
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(ctx.caller_id, admin.id);
        assert!(ctx.capabilities.is_unrestricted());
        assert_eq!(service.registry().len(), 5);
    }

    #[test]
    fn config_wwwroot_overrides_seed() {
        let config = ServiceConfig {
            wwwroot: Some("https://campus.example.net".to_string()),
            ..ServiceConfig::default()
        };
        let service = WsService::from_config(&config).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(service.site().wwwroot(), "https://campus.example.net");
    }
}
