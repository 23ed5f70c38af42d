//! Search-then-bind adapter.

use serde_yaml::Mapping;

use super::{AccountFilter, DirectoryClient, Scope, SearchEntry};
use crate::adapter::{Adapter, AdapterCore, AdapterOptions};
use crate::attribute::{self, AttributeMap, Attributes};
use crate::error::{Error, Result};

const CATEGORY: &str = "directory";
const ACCOUNT_FILTER_OPTION: &str = "account_filter";
const ANY_OBJECT: &str = "(objectClass=*)";

/// Identity resolved by the last successful bind.
#[derive(Debug, Clone)]
struct Identity {
    identifier: String,
    entry: SearchEntry,
}

/// Adapter authenticating against a directory.
///
/// The username is resolved into a distinguished name by searching with the
/// account filter, then the password is checked by binding as that DN.
pub struct DirectoryAdapter<C> {
    client: C,
    core: AdapterCore,
    account_filter: AccountFilter,
    identity: Option<Identity>,
}

impl<C: DirectoryClient> DirectoryAdapter<C> {
    /// Create a new [`DirectoryAdapter`] with default options.
    pub fn new(client: C) -> Self {
        Self {
            client,
            core: AdapterCore::new(CATEGORY),
            account_filter: AccountFilter::default(),
            identity: None,
        }
    }

    /// Replace the shared adapter state, e.g. to log inside another span.
    pub fn with_core(mut self, core: AdapterCore) -> Self {
        self.core = core;
        self
    }

    /// Apply typed options. Nothing is applied on error.
    pub fn configure(
        &mut self,
        account_filter: Option<AccountFilter>,
        options: AdapterOptions,
    ) -> Result<&mut Self> {
        self.core.configure(options)?;
        if let Some(filter) = account_filter {
            self.account_filter = filter;
        }
        Ok(self)
    }

    /// Apply options read from a configuration mapping.
    ///
    /// `account_filter` is consumed here, the other keys go to
    /// [`AdapterCore::set_options`]. Nothing is applied on error.
    pub fn set_options(&mut self, mut options: Mapping) -> Result<&mut Self> {
        let account_filter = options
            .remove(ACCOUNT_FILTER_OPTION)
            .map(serde_yaml::from_value::<AccountFilter>)
            .transpose()
            .map_err(Error::Options)?;

        self.core.set_options(options)?;
        if let Some(filter) = account_filter {
            self.account_filter = filter;
        }
        Ok(self)
    }

    pub fn account_filter(&self) -> &AccountFilter {
        &self.account_filter
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Distinguished name of the last authenticated identity.
    pub fn dn(&self) -> Result<&str> {
        self.identity
            .as_ref()
            .map(|identity| identity.entry.dn.as_str())
            .ok_or(Error::NotAuthenticated)
    }
}

impl<C: DirectoryClient> Adapter for DirectoryAdapter<C> {
    fn setup(&mut self) -> Result<bool> {
        self.client.connect().map_err(Error::into_setup)?;
        Ok(true)
    }

    fn authenticate(&mut self, username: &str, password: &str) -> Result<bool> {
        let _enter = self.core.span().enter();
        self.identity = None;

        // An empty simple bind is anonymous and would always succeed.
        if password.is_empty() {
            tracing::warn!(
                username,
                "refuse to bind ldap user without password"
            );
            return Ok(false);
        }

        let filter = self.account_filter.build(username);
        let base = self.client.base().to_owned();
        let identity_attribute = self.core.identity_attribute();

        let mut entries = self.client.search(
            &base,
            Scope::Subtree,
            &filter,
            &["dn", identity_attribute],
        )?;

        let entry = match entries.len() {
            0 => {
                tracing::warn!(%filter, "user not found with ldap filter");
                return Ok(false);
            },
            1 => entries.remove(0),
            matches => {
                tracing::warn!(
                    %filter,
                    matches,
                    "more than one user found with ldap filter"
                );
                return Ok(false);
            },
        };
        tracing::info!(dn = %entry.dn, %filter, "found ldap user");

        let result = self.client.bind(&entry.dn, password)?;
        tracing::info!(dn = %entry.dn, result, "bind ldap user");

        if !result {
            return Ok(false);
        }

        let identifier = attribute::values(&entry.attrs, identity_attribute)
            .and_then(|values| values.first())
            .cloned()
            .ok_or_else(|| Error::IdentityAttributeNotFound {
                attribute: identity_attribute.to_owned(),
            })?;

        self.identity = Some(Identity { identifier, entry });
        Ok(true)
    }

    fn identifier(&self) -> Result<&str> {
        self.identity
            .as_ref()
            .map(|identity| identity.identifier.as_str())
            .ok_or(Error::NotAuthenticated)
    }

    fn attribute_map(&self) -> &AttributeMap {
        self.core.attribute_map()
    }

    fn attributes(&mut self) -> Result<Attributes> {
        let _enter = self.core.span().enter();
        let identity = self.identity.as_ref().ok_or(Error::NotAuthenticated)?;
        let map = self.core.attribute_map();

        // Requesting no attribute means requesting all of them.
        let names = map.backend_names();
        if names.is_empty() {
            return Ok(Attributes::new());
        }

        let dn = identity.entry.dn.as_str();
        let entry = self
            .client
            .search(dn, Scope::Base, ANY_OBJECT, &names)?
            .into_iter()
            .next()
            .ok_or_else(|| Error::EntryNotFound { dn: dn.to_owned() })?;

        tracing::info!(dn, params = ?entry.attrs, "get ldap user attributes");

        map.map(&entry)
    }

    fn attribute_sync_cache(&self) -> u64 {
        self.core.attribute_sync_cache()
    }
}
