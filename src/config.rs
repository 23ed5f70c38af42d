//! Configuration manager.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_yaml::Mapping;

use crate::directory::{DirectoryAdapter, LdapConfig, LdapDirectory};

const DEFAULT_CONFIG_PATH: &str = "config.yaml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot open `{}`", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("`{}` is not a valid configuration", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error(transparent)]
    Adapter(#[from] crate::error::Error),
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    /// Related to LDAP3 configuration.
    pub ldap: Ldap,
    /// Options handed to the adapter, such as `account_filter` or
    /// `attribute_map`.
    #[serde(default)]
    pub adapter: Mapping,
    #[serde(skip)]
    path: PathBuf,
}

/// LDAP configuration.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ldap {
    /// URL of LDAP instance, e.g. `ldap://localhost:389`.
    pub address: String,
    /// Service account DN used to search users.
    pub user: Option<String>,
    /// Password of service account.
    #[serde(skip_serializing)]
    pub password: Option<String>,
    /// DN searches are rooted at.
    pub base_dn: String,
    #[serde(default)]
    pub start_tls: bool,
    /// Connection timeout, in seconds.
    pub timeout: Option<u64>,
}

impl Ldap {
    /// Build client settings.
    pub fn client_config(&self) -> crate::error::Result<LdapConfig> {
        let mut config = LdapConfig::new(&self.address, &self.base_dn)?
            .start_tls(self.start_tls);

        if let Some(user) = &self.user {
            // An empty simple bind is anonymous.
            let password = self
                .password
                .as_deref()
                .filter(|password| !password.is_empty())
                .ok_or_else(|| crate::error::Error::MissingBindPassword {
                    dn: user.clone(),
                })?;
            config = config.bind(user, password);
        }
        if let Some(timeout) = self.timeout {
            config = config.timeout(Duration::from_secs(timeout));
        }

        Ok(config)
    }
}

impl Configuration {
    pub fn path(mut self, path: PathBuf) -> Self {
        self.path = path;
        self
    }

    /// Reads the `config.yaml` file from the specified path or the default
    /// location.
    pub fn read(self) -> Result<Self, ConfigError> {
        let file_path = if self.path.as_os_str().is_empty() {
            Path::new(DEFAULT_CONFIG_PATH).to_path_buf()
        } else {
            self.path
        };

        let file = File::open(&file_path).map_err(|source| ConfigError::Open {
            path: file_path.clone(),
            source,
        })?;
        let config: Configuration =
            serde_yaml::from_reader(file).map_err(|source| {
                ConfigError::Parse {
                    path: file_path.clone(),
                    source,
                }
            })?;

        tracing::debug!(path = %file_path.display(), "configuration loaded");
        Ok(config.path(file_path))
    }

    /// Create a configured [`DirectoryAdapter`] over LDAP.
    pub fn directory_adapter(
        &self,
    ) -> Result<DirectoryAdapter<LdapDirectory>, ConfigError> {
        let client = LdapDirectory::new(self.ldap.client_config()?);
        let mut adapter = DirectoryAdapter::new(client);
        adapter.set_options(self.adapter.clone())?;
        Ok(adapter)
    }
}
