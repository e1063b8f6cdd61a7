//! Logic for getting credentials to log into chat with.

use async_trait::async_trait;
use std::convert::Infallible;
use std::fmt::{Debug, Display};

/// Placeholder password sent alongside the anonymous `justinfan` nickname.
/// Twitch ignores its value, but the handshake always carries a `PASS` line.
pub const ANONYMOUS_TOKEN: &str = "SCHMOOPIIE";

/// Nickname used when reading chat without an account.
pub const ANONYMOUS_LOGIN: &str = "justinfan12345";

/// A pair of login name and OAuth token.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialsPair {
    /// Login name of the user that the library should log into chat as.
    pub login: String,
    /// OAuth access token, without leading `oauth:` prefix.
    pub token: String,
}

// the token is a secret, keep it out of log output
impl Debug for CredentialsPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsPair")
            .field("login", &self.login)
            .field("token", &"[redacted]")
            .finish()
    }
}

/// Encapsulates logic for getting the credentials to log into chat, whenever
/// a new connection is made.
#[async_trait]
pub trait LoginCredentials: Debug + Send + Sync + 'static {
    /// Error type that can occur when trying to fetch the credentials.
    type Error: Send + Sync + Debug + Display;

    /// Get a fresh set of credentials to be used right-away.
    async fn get_credentials(&self) -> Result<CredentialsPair, Self::Error>;
}

/// Simple `LoginCredentials` implementation that always returns the same `CredentialsPair`
/// and never fails.
#[derive(Debug, Clone)]
pub struct StaticLoginCredentials {
    /// The credentials that are always returned.
    pub credentials: CredentialsPair,
}

impl StaticLoginCredentials {
    /// Create new static login credentials from the given Twitch login name and OAuth access token.
    /// The `token` should be without the `oauth:` prefix.
    pub fn new(login: String, token: String) -> StaticLoginCredentials {
        StaticLoginCredentials {
            credentials: CredentialsPair { login, token },
        }
    }

    /// Creates login credentials for logging into chat as an anonymous user.
    pub fn anonymous() -> StaticLoginCredentials {
        StaticLoginCredentials::new(ANONYMOUS_LOGIN.to_owned(), ANONYMOUS_TOKEN.to_owned())
    }

    /// Whether these are the anonymous placeholder credentials.
    pub fn is_anonymous(&self) -> bool {
        self.credentials.login.starts_with("justinfan")
    }
}

#[async_trait]
impl LoginCredentials for StaticLoginCredentials {
    type Error = Infallible;

    async fn get_credentials(&self) -> Result<CredentialsPair, Infallible> {
        Ok(self.credentials.clone())
    }
}
