//! Privilege claims recovered from session cookies.

use serde::{Deserialize, Serialize};

use crate::session::cookie::CookieCodec;

/// Alias and privilege of the caller. Empty strings mean anonymous.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaim {
    pub alias: String,
    pub privilege: String,
}

impl SessionClaim {
    pub fn new(alias: impl Into<String>, privilege: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            privilege: privilege.into(),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_anonymous(&self) -> bool {
        self.privilege.is_empty()
    }
}

/// Derive the caller's claim from a raw `Cookie` header.
///
/// Never fails: a missing cookie, bad signature, expired or malformed payload
/// all produce the anonymous claim.
pub fn resolve_claim(codec: &CookieCodec, cookie_header: Option<&str>) -> SessionClaim {
    let Some(value) = cookie_header.and_then(|header| codec.find(header)) else {
        return SessionClaim::anonymous();
    };

    match codec.open(value) {
        Ok(claim) => claim,
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring invalid session cookie");
            SessionClaim::anonymous()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn codec() -> CookieCodec {
        CookieCodec::new("wsroute", b"test-secret", Duration::from_secs(3600)).unwrap()
    }

    #[test]
    fn test_valid_cookie() {
        let codec = codec();
        let claim = SessionClaim::new("alice", "user");
        let header = format!("theme=dark; wsroute={}", codec.seal(&claim).unwrap());
        assert_eq!(resolve_claim(&codec, Some(header.as_str())), claim);
    }

    #[test]
    fn test_missing_cookie() {
        let codec = codec();
        assert!(resolve_claim(&codec, None).is_anonymous());
        assert!(resolve_claim(&codec, Some("other=1")).is_anonymous());
    }

    #[test]
    fn test_garbage_cookie() {
        let codec = codec();
        for header in ["wsroute=", "wsroute=abc", "wsroute=a.b", "wsroute=%%%.%%%"] {
            assert_eq!(resolve_claim(&codec, Some(header)), SessionClaim::anonymous());
        }
    }

    #[test]
    fn test_cookie_from_other_secret() {
        let other = CookieCodec::new("wsroute", b"another", Duration::from_secs(3600)).unwrap();
        let value = other.seal(&SessionClaim::new("mallory", "admin")).unwrap();
        let header = format!("wsroute={value}");
        assert!(resolve_claim(&codec(), Some(header.as_str())).is_anonymous());
    }
}
