//! Connection settings read from the environment.

use serde::Deserialize;

use crate::auth::Credentials;
use crate::error::ApiError;

pub const ENV_URL: &str = "MINIFLUX_URL";
pub const ENV_API_KEY: &str = "MINIFLUX_API_KEY";
pub const ENV_USERNAME: &str = "MINIFLUX_USERNAME";
pub const ENV_PASSWORD: &str = "MINIFLUX_PASSWORD";

/// Server URL plus credentials. Immutable once a client is built from it.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ClientConfig {
    pub server_url: String,
    #[serde(default)]
    pub credentials: Credentials,
}

impl ClientConfig {
    pub fn new(server_url: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            server_url: server_url.into(),
            credentials,
        }
    }

    /// Read `MINIFLUX_URL`, `MINIFLUX_API_KEY`, `MINIFLUX_USERNAME` and
    /// `MINIFLUX_PASSWORD` from the process environment.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` with an arbitrary lookup; empty values count as
    /// unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ApiError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let server_url = get(ENV_URL)
            .ok_or_else(|| ApiError::InvalidUrl(format!("{ENV_URL} is not set")))?;
        Ok(Self {
            server_url,
            credentials: Credentials {
                token: get(ENV_API_KEY),
                username: get(ENV_USERNAME),
                password: get(ENV_PASSWORD),
            },
        })
    }
}
