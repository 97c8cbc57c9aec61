//! Client configuration

use std::fmt;
use std::time::Duration;

use zeroize::Zeroize;

/// Bearer credential that zeros its memory on drop and stays out of `Debug` output.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ApiToken(String);

impl ApiToken {
    /// Wrap a token string
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Borrow the raw token
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiToken(<redacted>)")
    }
}

impl Drop for ApiToken {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl From<&str> for ApiToken {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

impl From<String> for ApiToken {
    fn from(token: String) -> Self {
        Self::new(token)
    }
}

/// Configuration options for the store client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the store (default: http://localhost:3000)
    pub base_url: String,
    /// Bearer token sent with every request
    pub token: ApiToken,
    /// Per-request timeout. `None` waits for as long as the transport does.
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            token: ApiToken::default(),
            timeout: None,
        }
    }
}

/// Strip every trailing `/` and append exactly one.
pub(crate) fn normalize_base_url(base_url: &str) -> String {
    format!("{}/", base_url.trim_end_matches('/'))
}
