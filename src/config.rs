//! Client configuration: credentials, endpoint, identification and timeouts.

use std::env;
use std::fmt;
use std::time::Duration;

use reqwest::header::HeaderValue;
use url::Url;

use crate::error::ClientError;

/// Default service endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://ilabs-api.innodata.com/v1";

/// Default User-Agent sent on authenticated requests.
pub const DEFAULT_USER_AGENT: &str = "@innodatalabs/ilabs-api";

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (5 minutes for large documents).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Environment variable holding the user key.
pub const ENV_USER_KEY: &str = "ILABS_USER_KEY";

/// Environment variable overriding the endpoint.
pub const ENV_ENDPOINT: &str = "ILABS_ENDPOINT";

/// Environment variable overriding the User-Agent.
pub const ENV_USER_AGENT: &str = "ILABS_USER_AGENT";

/// Settings for a [`Client`](crate::Client).
///
/// The user key is optional so that [`Client::ping`](crate::Client::ping) can be
/// used without credentials; every other call requires it.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    user_key: Option<String>,
    endpoint: String,
    user_agent: String,
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::anonymous()
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("user_key", &self.user_key.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .field("user_agent", &self.user_agent)
            .field("connect_timeout", &self.connect_timeout)
            .field("read_timeout", &self.read_timeout)
            .finish()
    }
}

impl ClientConfig {
    /// Creates a configuration for the default endpoint with the given user key.
    #[must_use]
    pub fn new(user_key: impl Into<String>) -> Self {
        Self {
            user_key: Some(user_key.into()),
            ..Self::anonymous()
        }
    }

    /// Creates a configuration without credentials (liveness checks only).
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            user_key: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(READ_TIMEOUT_SECS),
        }
    }

    /// Builds a configuration from `ILABS_USER_KEY`, `ILABS_ENDPOINT` and
    /// `ILABS_USER_AGENT`. Unset or blank variables fall back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::anonymous();
        if let Some(user_key) = env_var_non_empty(ENV_USER_KEY) {
            config.user_key = Some(user_key);
        }
        if let Some(endpoint) = env_var_non_empty(ENV_ENDPOINT) {
            config = config.with_endpoint(endpoint);
        }
        if let Some(user_agent) = env_var_non_empty(ENV_USER_AGENT) {
            config.user_agent = user_agent;
        }
        config
    }

    /// Sets the user key.
    #[must_use]
    pub fn with_user_key(mut self, user_key: impl Into<String>) -> Self {
        self.user_key = Some(user_key.into());
        self
    }

    /// Sets the service endpoint. A trailing `/` is dropped.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        self.endpoint = endpoint.trim_end_matches('/').to_string();
        self
    }

    /// Sets the User-Agent sent on authenticated requests.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Sets connect and read timeouts for the default transport.
    #[must_use]
    pub fn with_timeouts(mut self, connect_timeout: Duration, read_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self.read_timeout = read_timeout;
        self
    }

    /// The user key, if configured.
    #[must_use]
    pub fn user_key(&self) -> Option<&str> {
        self.user_key.as_deref()
    }

    /// The service endpoint, without trailing slash.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The User-Agent header value.
    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Connect timeout for the default transport.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Read timeout for the default transport.
    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Validates the configuration and returns the parsed endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidConfig`] when the endpoint is not an
    /// absolute http(s) URL, a header value is not representable, or a
    /// timeout is zero.
    pub fn validate(&self) -> Result<Url, ClientError> {
        let endpoint = Url::parse(&self.endpoint)
            .map_err(|e| ClientError::invalid_config("endpoint", e.to_string()))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(ClientError::invalid_config(
                "endpoint",
                format!("unsupported scheme `{}`", endpoint.scheme()),
            ));
        }
        if endpoint.cannot_be_a_base() {
            return Err(ClientError::invalid_config(
                "endpoint",
                "must be a base URL",
            ));
        }

        if self.user_agent.trim().is_empty() {
            return Err(ClientError::invalid_config("user_agent", "must not be empty"));
        }
        if HeaderValue::from_str(&self.user_agent).is_err() {
            return Err(ClientError::invalid_config(
                "user_agent",
                "contains characters not allowed in a header",
            ));
        }
        if let Some(user_key) = &self.user_key
            && HeaderValue::from_str(user_key).is_err()
        {
            return Err(ClientError::invalid_config(
                "user_key",
                "contains characters not allowed in a header",
            ));
        }

        if self.connect_timeout.is_zero() {
            return Err(ClientError::invalid_config("connect_timeout", "must be > 0"));
        }
        if self.read_timeout.is_zero() {
            return Err(ClientError::invalid_config("read_timeout", "must be > 0"));
        }

        Ok(endpoint)
    }
}

fn env_var_non_empty(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
