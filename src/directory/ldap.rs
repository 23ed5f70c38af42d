//! LDAP support.

use std::time::Duration;

use ldap3::{LdapConn, LdapConnSettings, LdapResult, Scope, SearchEntry};
use url::Url;

use super::DirectoryClient;
use crate::error::{Error, Result};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// `invalidCredentials` result code.
const INVALID_CREDENTIALS: u32 = 49;

/// Connection settings for [`LdapDirectory`].
#[derive(Clone)]
pub struct LdapConfig {
    pub addr: String,
    pub base_dn: String,
    bind_dn: Option<String>,
    bind_password: Option<String>,
    start_tls: bool,
    timeout: Duration,
}

impl LdapConfig {
    /// Create a new [`LdapConfig`].
    ///
    /// # Errors
    ///
    /// Returns `Err` if `addr` is not an `ldap://` or `ldaps://` URL.
    pub fn new(
        addr: impl Into<String>,
        base_dn: impl Into<String>,
    ) -> Result<Self> {
        let addr = addr.into();

        let valid = Url::parse(&addr)
            .map(|url| matches!(url.scheme(), "ldap" | "ldaps"))
            .unwrap_or(false);
        if !valid {
            return Err(Error::InvalidAddress { address: addr });
        }

        Ok(Self {
            addr,
            base_dn: base_dn.into(),
            bind_dn: None,
            bind_password: None,
            start_tls: false,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Service account used to search the directory.
    pub fn bind(
        mut self,
        dn: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.bind_dn = Some(dn.into());
        self.bind_password = Some(password.into());
        self
    }

    /// Upgrade plain `ldap://` connections with STARTTLS.
    pub fn start_tls(mut self, enabled: bool) -> Self {
        self.start_tls = enabled;
        self
    }

    /// Update connection timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn settings(&self) -> LdapConnSettings {
        LdapConnSettings::new()
            .set_conn_timeout(self.timeout)
            .set_starttls(self.start_tls)
    }
}

impl std::fmt::Debug for LdapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapConfig")
            .field("addr", &self.addr)
            .field("base_dn", &self.base_dn)
            .field("bind_dn", &self.bind_dn)
            .field("bind_password", &"[REDACTED]")
            .field("start_tls", &self.start_tls)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Blocking LDAP client.
pub struct LdapDirectory {
    conn: Option<LdapConn>,
    config: LdapConfig,
}

impl LdapDirectory {
    /// Create a new [`LdapDirectory`]. Nothing is opened before
    /// [`DirectoryClient::connect`].
    pub fn new(config: LdapConfig) -> Self {
        Self { conn: None, config }
    }

    pub fn config(&self) -> &LdapConfig {
        &self.config
    }

    fn conn(&mut self) -> Result<&mut LdapConn> {
        self.conn.as_mut().ok_or(Error::NotConnected)
    }

    fn open(&self) -> Result<LdapConn> {
        Ok(LdapConn::with_settings(
            self.config.settings(),
            &self.config.addr,
        )?)
    }
}

/// Only `invalidCredentials` is a rejection, other codes are failures.
fn bind_outcome(dn: &str, result: LdapResult) -> Result<bool> {
    if result.rc == INVALID_CREDENTIALS {
        tracing::debug!(dn, rc = result.rc, "ldap bind rejected");
        return Ok(false);
    }

    result.success()?;
    Ok(true)
}

impl DirectoryClient for LdapDirectory {
    fn connect(&mut self) -> Result<()> {
        if self.conn.is_some() {
            return Ok(());
        }

        tracing::debug!(addr = %self.config.addr, "connecting to ldap server");
        let mut conn = self.open()?;

        if let (Some(dn), Some(password)) =
            (&self.config.bind_dn, &self.config.bind_password)
        {
            conn.simple_bind(dn, password)?.success()?;
        }

        self.conn = Some(conn);
        Ok(())
    }

    fn base(&self) -> &str {
        &self.config.base_dn
    }

    fn search(
        &mut self,
        base: &str,
        scope: Scope,
        filter: &str,
        attributes: &[&str],
    ) -> Result<Vec<SearchEntry>> {
        let (entries, _) = self
            .conn()?
            .search(base, scope, filter, attributes.to_vec())?
            .success()?;

        Ok(entries.into_iter().map(SearchEntry::construct).collect())
    }

    /// Binds on a throwaway connection, so the searching connection keeps
    /// the service account identity.
    fn bind(&mut self, dn: &str, password: &str) -> Result<bool> {
        let mut conn = self.open()?;
        let result = conn.simple_bind(dn, password);
        let _ = conn.unbind();

        bind_outcome(dn, result?)
    }
}

impl Drop for LdapDirectory {
    fn drop(&mut self) {
        if let Some(mut conn) = self.conn.take() {
            let _ = conn.unbind();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address() {
        assert!(LdapConfig::new("ldap://localhost:389", "dc=example").is_ok());
        assert!(
            LdapConfig::new("ldaps://ldap.example.com", "dc=example").is_ok()
        );
        assert!(matches!(
            LdapConfig::new("localhost:389", "dc=example"),
            Err(Error::InvalidAddress { .. })
        ));
        assert!(LdapConfig::new("https://example.com", "dc=example").is_err());
    }

    #[test]
    fn test_search_requires_connection() {
        let config = LdapConfig::new("ldap://localhost:389", "dc=example")
            .unwrap()
            .bind("cn=admin,dc=example", "admin");
        let mut directory = LdapDirectory::new(config);

        assert_eq!(directory.base(), "dc=example");
        assert!(matches!(
            directory.search("dc=example", Scope::Base, "(cn=*)", &[]),
            Err(Error::NotConnected)
        ));
    }

    #[test]
    fn test_bind_opens_own_connection() {
        let config = LdapConfig::new("ldap://127.0.0.1:1", "dc=example")
            .unwrap()
            .timeout(Duration::from_secs(1));
        let mut directory = LdapDirectory::new(config);

        // Never connected, yet the bind dials the server itself.
        assert!(matches!(
            directory.bind("uid=jdoe,dc=example", "secret"),
            Err(Error::Directory(_))
        ));
        assert!(directory.conn.is_none());
    }

    fn result(rc: u32) -> LdapResult {
        LdapResult {
            rc,
            matched: String::new(),
            text: String::new(),
            refs: Vec::new(),
            ctrls: Vec::new(),
        }
    }

    #[test]
    fn test_bind_outcome() {
        let dn = "uid=jdoe,dc=example";

        assert!(bind_outcome(dn, result(0)).unwrap());
        assert!(!bind_outcome(dn, result(INVALID_CREDENTIALS)).unwrap());
        // busy, unavailable, unwillingToPerform
        for rc in [51, 52, 53] {
            assert!(matches!(
                bind_outcome(dn, result(rc)),
                Err(Error::Directory(_))
            ));
        }
    }

    #[test]
    fn test_password_is_redacted() {
        let config = LdapConfig::new("ldap://localhost", "dc=example")
            .unwrap()
            .bind("cn=admin,dc=example", "s3cr3t");

        assert!(!format!("{config:?}").contains("s3cr3t"));
    }
}
