//! Marshaled boundary arguments.
//!
//! Callers hand the bridge raw text and integers. Each type here is the
//! checked native form of one argument; construction is the marshaling step.

use std::fmt;
use std::path::{Path, PathBuf};

use url::Url;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::MarshalError;
use crate::ids::Version;

/// URL schemes an engine session may bind to.
pub const REMOTE_SCHEMES: &[&str] = &["realm", "realms", "ws", "wss", "http", "https"];

/// Remote synchronization endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct RemoteUrl(Url);

impl RemoteUrl {
    /// Parse caller text into a remote endpoint.
    pub fn parse(raw: &str) -> Result<Self, MarshalError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(MarshalError::Empty { argument: "remote_url" });
        }
        let url = Url::parse(trimmed).map_err(|e| MarshalError::InvalidUrl {
            reason: e.to_string(),
        })?;
        if !REMOTE_SCHEMES.contains(&url.scheme()) {
            return Err(MarshalError::InvalidUrl {
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(MarshalError::InvalidUrl {
                reason: "missing host".to_string(),
            });
        }
        Ok(Self(url))
    }

    /// The parsed URL.
    pub fn as_url(&self) -> &Url {
        &self.0
    }

    /// The URL as text.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for RemoteUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl fmt::Debug for RemoteUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RemoteUrl({})", self.0)
    }
}

/// Credential presented to the remote endpoint.
///
/// Debug output is redacted and the text is zeroed on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct AccessToken(String);

impl AccessToken {
    /// Check caller text and wrap it as a token.
    pub fn parse(raw: &str) -> Result<Self, MarshalError> {
        if raw.is_empty() {
            return Err(MarshalError::Empty {
                argument: "access_token",
            });
        }
        if let Some(position) = raw.find(|c: char| c.is_whitespace() || c.is_control()) {
            return Err(MarshalError::InvalidCharacter {
                argument: "access_token",
                position,
            });
        }
        Ok(Self(raw.to_string()))
    }

    /// The token text.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccessToken([{} chars REDACTED])", self.0.len())
    }
}

/// Path of the local data file a session synchronizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalPath(PathBuf);

impl LocalPath {
    /// Check caller text and wrap it as a path.
    pub fn parse(raw: &str) -> Result<Self, MarshalError> {
        if raw.is_empty() {
            return Err(MarshalError::Empty {
                argument: "local_path",
            });
        }
        if let Some(position) = raw.find('\0') {
            return Err(MarshalError::InvalidCharacter {
                argument: "local_path",
                position,
            });
        }
        Ok(Self(PathBuf::from(raw)))
    }

    /// The path.
    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for LocalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl Version {
    /// Convert the signed integer a managed runtime passes.
    pub fn from_caller(raw: i64) -> Result<Self, MarshalError> {
        u64::try_from(raw)
            .map(Version::new)
            .map_err(|_| MarshalError::NegativeVersion(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_url_accepts_realm_scheme() {
        let url = RemoteUrl::parse("realm://example/a").unwrap();
        assert_eq!(url.as_url().scheme(), "realm");
        assert_eq!(url.as_url().host_str(), Some("example"));
        assert_eq!(url.as_str(), "realm://example/a");
    }

    #[test]
    fn remote_url_trims_surrounding_whitespace() {
        let url = RemoteUrl::parse("  wss://sync.example.com/db \n").unwrap();
        assert_eq!(url.as_str(), "wss://sync.example.com/db");
    }

    #[test]
    fn remote_url_rejects_garbage() {
        let err = RemoteUrl::parse("not a url").unwrap_err();
        assert!(matches!(err, MarshalError::InvalidUrl { .. }));
    }

    #[test]
    fn remote_url_rejects_unknown_scheme() {
        let err = RemoteUrl::parse("ftp://example/a").unwrap_err();
        assert!(err.to_string().contains("ftp"));
    }

    #[test]
    fn remote_url_rejects_missing_host() {
        let err = RemoteUrl::parse("realm:///a").unwrap_err();
        assert!(err.to_string().contains("host"));
    }

    #[test]
    fn remote_url_rejects_empty() {
        let err = RemoteUrl::parse("   ").unwrap_err();
        assert!(matches!(err, MarshalError::Empty { argument: "remote_url" }));
    }

    #[test]
    fn access_token_rejects_whitespace_and_control() {
        assert!(AccessToken::parse("token123").is_ok());
        let err = AccessToken::parse("tok en").unwrap_err();
        assert!(matches!(
            err,
            MarshalError::InvalidCharacter { position: 3, .. }
        ));
        assert!(AccessToken::parse("tok\0en").is_err());
        assert!(AccessToken::parse("").is_err());
    }

    #[test]
    fn access_token_debug_is_redacted() {
        let token = AccessToken::parse("super-secret").unwrap();
        let debug = format!("{:?}", token);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn local_path_rejects_nul() {
        assert!(LocalPath::parse("/tmp/a.realm").is_ok());
        let err = LocalPath::parse("/tmp/a\0.realm").unwrap_err();
        assert!(matches!(err, MarshalError::InvalidCharacter { position: 6, .. }));
        assert!(LocalPath::parse("").is_err());
    }

    #[test]
    fn version_from_caller_rejects_negative() {
        assert_eq!(Version::from_caller(5).unwrap(), Version::new(5));
        assert!(matches!(
            Version::from_caller(-1),
            Err(MarshalError::NegativeVersion(-1))
        ));
    }
}
