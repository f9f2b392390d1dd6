//! Grain Registry
//!
//! Maps a grain kind to the factory that builds fresh instances of it.

use super::Grain;
use crate::error::InvokeError;
use crate::identity::GrainIdentity;
use std::collections::HashMap;
use std::sync::Arc;

/// Builds a fresh, empty grain for an identity.
///
/// Called once per activation. State is never carried over from a previous
/// activation of the same identity.
pub trait GrainFactory: Send + Sync + 'static {
    fn create(&self, identity: &GrainIdentity) -> Box<dyn Grain>;
}

impl<F> GrainFactory for F
where
    F: Fn(&GrainIdentity) -> Box<dyn Grain> + Send + Sync + 'static,
{
    fn create(&self, identity: &GrainIdentity) -> Box<dyn Grain> {
        self(identity)
    }
}

/// Grain kinds known to a member.
///
/// Every member of a cluster must register the same kinds; a member asked to
/// activate a kind it does not know answers `UnknownKind`.
#[derive(Clone, Default)]
pub struct GrainRegistry {
    factories: HashMap<String, Arc<dyn GrainFactory>>,
}

impl GrainRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` for `kind`, replacing any previous registration.
    pub fn register(&mut self, kind: impl Into<String>, factory: impl GrainFactory) -> &mut Self {
        self.factories.insert(kind.into(), Arc::new(factory));
        self
    }

    /// Builder-style variant of [`register`](Self::register).
    pub fn with(mut self, kind: impl Into<String>, factory: impl GrainFactory) -> Self {
        self.register(kind, factory);
        self
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn create(&self, identity: &GrainIdentity) -> Result<Box<dyn Grain>, InvokeError> {
        let factory = self
            .factories
            .get(&identity.kind)
            .ok_or_else(|| InvokeError::UnknownKind {
                kind: identity.kind.clone(),
            })?;
        Ok(factory.create(identity))
    }
}

impl std::fmt::Debug for GrainRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<_> = self.kinds().collect();
        kinds.sort_unstable();
        f.debug_struct("GrainRegistry").field("kinds", &kinds).finish()
    }
}
