//! Directory (LDAP) backed identity adapter.

mod adapter;
pub mod filter;
pub mod ldap;

pub use adapter::DirectoryAdapter;
pub use filter::AccountFilter;
pub use ldap::{LdapConfig, LdapDirectory};

pub use ldap3::{Scope, SearchEntry};

use crate::error::Result;

/// Port to a directory service.
///
/// Implementations own connection pooling, timeouts and retries.
pub trait DirectoryClient: Send {
    /// Open the connection. Calling it on a live connection is a no-op.
    fn connect(&mut self) -> Result<()>;

    /// DN searches are rooted at.
    fn base(&self) -> &str;

    /// Search entries under `base` matching `filter`, returning only
    /// `attributes`.
    fn search(
        &mut self,
        base: &str,
        scope: Scope,
        filter: &str,
        attributes: &[&str],
    ) -> Result<Vec<SearchEntry>>;

    /// Check the credentials of `dn`. Returns `false` when the directory
    /// rejects them, any other failure is an error.
    ///
    /// Must not change the identity later searches run under: attribute
    /// reads happen as the service account, never as the bound user.
    fn bind(&mut self, dn: &str, password: &str) -> Result<bool>;
}
