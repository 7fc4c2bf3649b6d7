// Copyright Rouven Bauer
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//    https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::ops::RangeInclusive;
use std::time::Duration;

use uriparse::URI;

use crate::error::{OgmError, Result};

const DEFAULT_USER_AGENT: &str = env!("BOLT_OGM_DEFAULT_USER_AGENT");
pub(crate) const DEFAULT_HOSTNAME: &str = "localhost";
pub(crate) const DEFAULT_PORT: u16 = 7687;
pub(crate) const DEFAULT_USERNAME: &str = "neo4j";
pub(crate) const DEFAULT_PASSWORD: &str = "neo4j";
pub(crate) const DEFAULT_POOL_SIZE: RangeInclusive<usize> = 1..=10;

/// Everything a [`Connector`](`crate::driver::io::Connector`) needs to open one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub(crate) hostname: String,
    pub(crate) port: u16,
    pub(crate) username: String,
    pub(crate) password: String,
    pub(crate) encrypted: bool,
    pub(crate) user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            hostname: String::from(DEFAULT_HOSTNAME),
            port: DEFAULT_PORT,
            username: String::from(DEFAULT_USERNAME),
            password: String::from(DEFAULT_PASSWORD),
            encrypted: true,
            user_agent: String::from(DEFAULT_USER_AGENT),
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    pub fn with_encryption(mut self) -> Self {
        self.encrypted = true;
        self
    }

    pub fn with_encryption_disabled(mut self) -> Self {
        self.encrypted = false;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn encrypted(&self) -> bool {
        self.encrypted
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Parses a URI of the form `<scheme>://[user[:password]@]host[:port]`.
    ///
    /// Supported schemes are `bolt` (unencrypted), `bolt+s` and `bolt+ssc` (encrypted).
    /// Credentials that are not part of the URI keep their defaults.
    pub fn parse_uri(uri: &str) -> Result<Self> {
        let uri = URI::try_from(uri)
            .map_err(|e| OgmError::invalid_config(format!("couldn't parse URI {e}")))?;

        let encrypted = match uri.scheme().as_str() {
            "bolt" => false,
            "bolt+s" | "bolt+ssc" => true,
            scheme => {
                return Err(OgmError::invalid_config(format!(
                    "unknown scheme in URI {} expected `bolt`, `bolt+s`, or `bolt+ssc`",
                    scheme
                )))
            }
        };

        let authority = uri
            .authority()
            .ok_or_else(|| OgmError::invalid_config("missing host in URI"))?;
        let mut config = Self::default();
        config.encrypted = encrypted;
        config.hostname = authority.host().to_string();
        config.port = authority.port().unwrap_or(DEFAULT_PORT);
        if let Some(username) = authority.username() {
            config.username = username.to_string();
        }
        if let Some(password) = authority.password() {
            config.password = password.to_string();
        }

        if uri.path() != "/" {
            return Err(OgmError::invalid_config(format!(
                "URI cannot contain a path, found: {}",
                uri.path()
            )));
        }
        if let Some(query) = uri.query() {
            if query != "" {
                return Err(OgmError::invalid_config(format!(
                    "URI cannot contain a query, found: {}",
                    query
                )));
            }
        }
        if let Some(fragment) = uri.fragment() {
            return Err(OgmError::invalid_config(format!(
                "URI cannot contain a fragment, found: {}",
                fragment
            )));
        }

        Ok(config)
    }
}

impl TryFrom<&str> for ClientConfig {
    type Error = OgmError;

    fn try_from(value: &str) -> Result<Self> {
        Self::parse_uri(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    pub(crate) pool_size: RangeInclusive<usize>,
    pub(crate) acquisition_timeout: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
            acquisition_timeout: None,
        }
    }
}

impl PoolConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// The pool connects `pool_size.start()` clients up front and never has more than
    /// `pool_size.end()` clients.
    pub fn with_pool_size(mut self, pool_size: RangeInclusive<usize>) -> Self {
        self.pool_size = pool_size;
        self
    }

    /// Give up acquiring a client after waiting `timeout` for one to become available.
    pub fn with_acquisition_timeout(mut self, timeout: Duration) -> Self {
        self.acquisition_timeout = Some(timeout);
        self
    }

    /// Wait forever for a client to become available (default).
    pub fn without_acquisition_timeout(mut self) -> Self {
        self.acquisition_timeout = None;
        self
    }

    pub fn pool_size(&self) -> &RangeInclusive<usize> {
        &self.pool_size
    }

    pub fn acquisition_timeout(&self) -> Option<Duration> {
        self.acquisition_timeout
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let (lower, upper) = (*self.pool_size.start(), *self.pool_size.end());
        if upper < 1 {
            return Err(OgmError::invalid_config(format!(
                "pool size upper bound must be at least 1, found: {}",
                upper
            )));
        }
        if lower > upper {
            return Err(OgmError::invalid_config(format!(
                "pool size lower bound ({}) must not exceed its upper bound ({})",
                lower, upper
            )));
        }
        Ok(())
    }
}
