//! Contract shared by every identity backend.

use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use tracing::Span;

use crate::attribute::{AttributeMap, Attributes};
use crate::error::{Error, Result};

/// Backend attribute used as unique identifier when none is configured.
pub const DEFAULT_IDENTITY_ATTRIBUTE: &str = "uid";

/// Interface implemented by every identity backend.
///
/// An adapter holds the identity of a single authentication attempt, so a
/// fresh adapter must be used for each concurrent login.
pub trait Adapter: Send {
    /// Establish backend connectivity. Safe to call more than once.
    fn setup(&mut self) -> Result<bool>;

    /// Verify `username` and `password`.
    ///
    /// Returns `Ok(false)` for an unknown, ambiguous or rejected account;
    /// only backend failures and misconfiguration are errors.
    fn authenticate(&mut self, username: &str, password: &str) -> Result<bool>;

    /// Unique identifier of the last authenticated identity.
    fn identifier(&self) -> Result<&str>;

    /// Configured attribute mapping.
    fn attribute_map(&self) -> &AttributeMap;

    /// Normalized attributes of the last authenticated identity.
    fn attributes(&mut self) -> Result<Attributes>;

    /// Seconds a caller may reuse fetched attributes.
    fn attribute_sync_cache(&self) -> u64;

    /// Whether attributes synced at `synced_at` must be fetched again.
    fn attributes_expired(
        &self,
        synced_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> bool {
        match self.attribute_sync_cache() {
            0 => true,
            ttl => {
                let ttl =
                    i64::try_from(ttl).ok().and_then(TimeDelta::try_seconds);
                // Out of range TTLs never expire.
                ttl.is_some_and(|ttl| now - synced_at >= ttl)
            },
        }
    }
}

/// Options understood by every adapter.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdapterOptions {
    pub identity_attribute: Option<String>,
    pub attribute_map: Option<AttributeMap>,
    pub attribute_sync_cache: Option<u64>,
}

/// State shared by adapters: identity attribute, attribute map, sync cache
/// and the span every log event is recorded in.
#[derive(Debug, Clone)]
pub struct AdapterCore {
    span: Span,
    identity_attribute: String,
    attribute_map: AttributeMap,
    attribute_sync_cache: u64,
}

impl AdapterCore {
    /// Create a new [`AdapterCore`] logging under `category`.
    pub fn new(category: &str) -> Self {
        Self::with_span(tracing::info_span!("adapter", category = %category))
    }

    /// Create a new [`AdapterCore`] logging inside an existing span.
    pub fn with_span(span: Span) -> Self {
        Self {
            span,
            identity_attribute: DEFAULT_IDENTITY_ATTRIBUTE.to_owned(),
            attribute_map: AttributeMap::default(),
            attribute_sync_cache: 0,
        }
    }

    /// Apply typed options. Unset fields keep their current value.
    ///
    /// # Errors
    ///
    /// Returns `Err` for a blank `identity_attribute`; nothing is applied.
    pub fn configure(&mut self, options: AdapterOptions) -> Result<&mut Self> {
        if options
            .identity_attribute
            .as_deref()
            .is_some_and(|attribute| attribute.trim().is_empty())
        {
            return Err(Error::EmptyIdentityAttribute);
        }

        if let Some(attribute) = options.identity_attribute {
            self.identity_attribute = attribute;
        }
        if let Some(map) = options.attribute_map {
            self.attribute_map = map;
        }
        if let Some(ttl) = options.attribute_sync_cache {
            self.attribute_sync_cache = ttl;
        }
        Ok(self)
    }

    /// Apply options read from a configuration mapping.
    ///
    /// Unknown keys are rejected and nothing is applied on error.
    pub fn set_options(&mut self, options: Mapping) -> Result<&mut Self> {
        let options: AdapterOptions =
            serde_yaml::from_value(Value::Mapping(options))
                .map_err(Error::Options)?;
        self.configure(options)
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn identity_attribute(&self) -> &str {
        &self.identity_attribute
    }

    pub fn attribute_map(&self) -> &AttributeMap {
        &self.attribute_map
    }

    pub fn attribute_sync_cache(&self) -> u64 {
        self.attribute_sync_cache
    }
}
