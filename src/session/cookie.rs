//! Signed session cookies.
//!
//! Cookie value layout:
//! ```text
//! base64url(json { alias, privilege, iat }) "." base64url(hmac_sha256(name "|" body))
//! ```
//! The MAC covers the cookie name so a value cannot be replayed under another
//! application's cookie. `iat` bounds the lifetime on the server side too.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use crate::config::SessionConfig;
use crate::session::claim::SessionClaim;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum CookieError {
    #[error("session key rejected")]
    InvalidKey,

    #[error("cookie value is not in body.signature form")]
    Format,

    #[error("cookie is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("cookie signature mismatch")]
    Signature,

    #[error("cookie payload is malformed: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("cookie expired")]
    Expired,
}

#[derive(Serialize, Deserialize)]
struct Payload {
    alias: String,
    privilege: String,
    iat: u64,
}

/// Signs and verifies session cookies.
#[derive(Clone)]
pub struct CookieCodec {
    name: String,
    mac: HmacSha256,
    max_age: Duration,
    domain: Option<String>,
    secure: bool,
}

impl std::fmt::Debug for CookieCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieCodec")
            .field("name", &self.name)
            .field("max_age", &self.max_age)
            .finish_non_exhaustive()
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

impl CookieCodec {
    pub fn new(name: impl Into<String>, secret: &[u8], max_age: Duration) -> Result<Self, CookieError> {
        let mac = HmacSha256::new_from_slice(secret).map_err(|_| CookieError::InvalidKey)?;
        Ok(Self {
            name: name.into(),
            mac,
            max_age,
            domain: None,
            secure: false,
        })
    }

    pub fn from_config(name: &str, config: &SessionConfig) -> Result<Self, CookieError> {
        let mut codec = Self::new(
            name,
            config.secret.as_bytes(),
            Duration::from_secs(config.max_age_secs),
        )?;
        codec.domain = config.cookie_domain.clone();
        codec.secure = config.secure;
        Ok(codec)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn signature(&self, body: &str) -> HmacSha256 {
        let mut mac = self.mac.clone();
        mac.update(self.name.as_bytes());
        mac.update(b"|");
        mac.update(body.as_bytes());
        mac
    }

    /// Encode `claim` into a cookie value issued now.
    pub fn seal(&self, claim: &SessionClaim) -> Result<String, CookieError> {
        self.seal_at(claim, now_secs())
    }

    pub fn seal_at(&self, claim: &SessionClaim, issued_at: u64) -> Result<String, CookieError> {
        let payload = Payload {
            alias: claim.alias.clone(),
            privilege: claim.privilege.clone(),
            iat: issued_at,
        };
        let body = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&payload)?);
        let tag = URL_SAFE_NO_PAD.encode(self.signature(&body).finalize().into_bytes());
        Ok(format!("{body}.{tag}"))
    }

    /// Verify and decode a cookie value.
    pub fn open(&self, value: &str) -> Result<SessionClaim, CookieError> {
        self.open_at(value, now_secs())
    }

    pub fn open_at(&self, value: &str, now: u64) -> Result<SessionClaim, CookieError> {
        let (body, tag) = value.split_once('.').ok_or(CookieError::Format)?;
        let tag = URL_SAFE_NO_PAD.decode(tag)?;
        self.signature(body)
            .verify_slice(&tag)
            .map_err(|_| CookieError::Signature)?;

        let payload: Payload = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(body)?)?;
        if payload.iat.saturating_add(self.max_age.as_secs()) < now {
            return Err(CookieError::Expired);
        }
        Ok(SessionClaim {
            alias: payload.alias,
            privilege: payload.privilege,
        })
    }

    /// Find this codec's cookie in a `Cookie` request header.
    pub fn find<'h>(&self, header: &'h str) -> Option<&'h str> {
        header
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.name)
            .map(|(_, value)| value.trim_matches('"'))
    }

    fn attributes(&self) -> String {
        let mut attrs = String::from("; Path=/; HttpOnly; SameSite=Lax");
        if let Some(domain) = &self.domain {
            attrs.push_str("; Domain=");
            attrs.push_str(domain);
        }
        if self.secure {
            attrs.push_str("; Secure");
        }
        attrs
    }

    /// `Set-Cookie` header value establishing a session.
    pub fn set_cookie_header(&self, claim: &SessionClaim) -> Result<String, CookieError> {
        Ok(format!(
            "{}={}; Max-Age={}{}",
            self.name,
            self.seal(claim)?,
            self.max_age.as_secs(),
            self.attributes()
        ))
    }

    /// `Set-Cookie` header value that expires the session immediately.
    pub fn clear_cookie_header(&self) -> String {
        format!(
            "{}=; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT{}",
            self.name,
            self.attributes()
        )
    }
}
