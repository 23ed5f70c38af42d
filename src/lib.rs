//! Pluggable identity adapters.
//!
//! An [`Adapter`] verifies a username and password against a backend, then
//! exposes the unique identifier and the normalized attributes of the
//! authenticated identity. [`DirectoryAdapter`] is the LDAP backend: it
//! resolves the username into a distinguished name with a search, then
//! checks the password by binding as that name.
#![forbid(unsafe_code)]

pub mod adapter;
pub mod attribute;
pub mod config;
pub mod directory;
pub mod error;
pub mod telemetry;

pub use adapter::{Adapter, AdapterCore, AdapterOptions};
pub use attribute::{AttributeMap, AttributeMapEntry, AttributeType, Attributes};
pub use directory::{
    AccountFilter, DirectoryAdapter, DirectoryClient, LdapConfig, LdapDirectory,
};
pub use error::{Error, Result};
