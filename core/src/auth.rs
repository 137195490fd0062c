//! Authentication schemes accepted by the Miniflux API.
//!
//! A client carries exactly one `Auth` value for its whole lifetime.
//! `Credentials` is the loose input shape (as found in config files or env)
//! and resolves to `Auth` with the token taking precedence.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Deserialize;

pub const TOKEN_HEADER: &str = "x-auth-token";
pub const AUTHORIZATION_HEADER: &str = "authorization";

/// Active authentication scheme.
#[derive(Clone, PartialEq, Eq, Default)]
pub enum Auth {
    /// API key sent as `X-Auth-Token`.
    Token(String),
    /// HTTP Basic credentials.
    Basic { username: String, password: String },
    /// No auth header; the server will reject most calls.
    #[default]
    None,
}

impl Auth {
    pub fn token(token: impl Into<String>) -> Self {
        Auth::Token(token.into())
    }

    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Auth::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// The single header this scheme attaches, if any.
    pub fn header(&self) -> Option<(String, String)> {
        match self {
            Auth::Token(token) => Some((TOKEN_HEADER.to_string(), token.clone())),
            Auth::Basic { username, password } => {
                let encoded = STANDARD.encode(format!("{username}:{password}"));
                Some((AUTHORIZATION_HEADER.to_string(), format!("Basic {encoded}")))
            }
            Auth::None => None,
        }
    }
}

// Secrets stay out of logs and panic messages.
impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Auth::Token(_) => f.write_str("Auth::Token(***)"),
            Auth::Basic { username, .. } => write!(f, "Auth::Basic {{ username: {username:?}, password: *** }}"),
            Auth::None => f.write_str("Auth::None"),
        }
    }
}

/// Credentials as supplied by the caller: a token, a username/password
/// pair, or both.
#[derive(Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl Credentials {
    pub fn token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..Self::default()
        }
    }

    pub fn login(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            token: None,
            username: Some(username.into()),
            password: Some(password.into()),
        }
    }

    /// Token wins over a login pair; a half-filled login pair counts as none.
    pub fn into_auth(self) -> Auth {
        match self {
            Credentials { token: Some(token), .. } => Auth::Token(token),
            Credentials {
                username: Some(username),
                password: Some(password),
                ..
            } => Auth::Basic { username, password },
            _ => Auth::None,
        }
    }
}

impl From<Credentials> for Auth {
    fn from(credentials: Credentials) -> Self {
        credentials.into_auth()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}
