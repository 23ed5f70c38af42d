//! Error handler for identity adapters.

use ldap3::LdapError;
use thiserror::Error;

use crate::attribute::AttributeType;

pub type Result<T> = std::result::Result<T, Error>;

type Source = Box<dyn std::error::Error + Send + Sync>;

/// Enum representing adapter failures.
///
/// Rejected credentials are never an error: adapters answer `Ok(false)` for
/// an unknown, ambiguous or wrongly authenticated account.
#[derive(Debug, Error)]
pub enum Error {
    #[error("directory backend is unreachable: {0}")]
    Setup(#[source] Source),
    #[error("directory operation failed: {0}")]
    Directory(#[source] Source),
    #[error("directory client is not connected")]
    NotConnected,
    #[error("entry `{dn}` no longer exists")]
    EntryNotFound { dn: String },

    #[error("identity attribute `{attribute}` not found")]
    IdentityAttributeNotFound { attribute: String },
    #[error("no identity has been authenticated")]
    NotAuthenticated,
    #[error("attribute `{attribute}` cannot be converted to {kind}")]
    AttributeConversion {
        attribute: String,
        kind: AttributeType,
    },

    #[error("invalid adapter options: {0}")]
    Options(#[source] serde_yaml::Error),
    #[error("account filter needs one `%s` placeholder, found {placeholders}")]
    InvalidAccountFilter { placeholders: usize },
    #[error("`{address}` is not an ldap:// or ldaps:// address")]
    InvalidAddress { address: String },
    #[error("service account `{dn}` has no password")]
    MissingBindPassword { dn: String },
    #[error("identity attribute cannot be empty")]
    EmptyIdentityAttribute,
}

impl Error {
    /// Wrap any transport failure into [`Error::Directory`].
    pub fn directory<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Directory(Box::new(err))
    }

    /// Reclassify a transport failure raised while setting up an adapter.
    pub(crate) fn into_setup(self) -> Self {
        match self {
            Self::Directory(source) => Self::Setup(source),
            other => other,
        }
    }
}

impl From<LdapError> for Error {
    fn from(err: LdapError) -> Self {
        Self::directory(err)
    }
}
