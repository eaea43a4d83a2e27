//! Client for a wsroute server: account endpoints over HTTP, requests over
//! the WebSocket.

use futures_util::{SinkExt, StreamExt};
use reqwest::header::SET_COOKIE;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header::COOKIE, HeaderValue};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

pub const REQUEST_EVENT: &str = "request";
pub const RESPONSE_EVENT: &str = "response";

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("malformed frame")]
    Frame,

    #[error("session cookie is not a valid header value")]
    InvalidCookie,

    #[error("unexpected event {0:?}")]
    UnexpectedEvent(String),

    #[error("reply payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("connection closed")]
    Closed,
}

/// Payload of a `response` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub template: String,
    pub controllers: Vec<String>,
}

/// The value a browser would send instead of the raw password.
pub fn passhash(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// Encode a frame: length-prefixed event name, then length-prefixed payload.
pub fn encode_frame(event: &str, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(8 + event.len() + payload.len());
    buf.extend_from_slice(&(event.len() as u32).to_be_bytes());
    buf.extend_from_slice(event.as_bytes());
    buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    buf.extend_from_slice(payload);
    buf
}

pub fn decode_frame(buf: &[u8]) -> Result<(String, Vec<u8>), SdkError> {
    let (event, rest) = split_prefixed(buf)?;
    let (payload, rest) = split_prefixed(rest)?;
    if !rest.is_empty() {
        return Err(SdkError::Frame);
    }
    let event = String::from_utf8(event.to_vec()).map_err(|_| SdkError::Frame)?;
    Ok((event, payload.to_vec()))
}

fn split_prefixed(buf: &[u8]) -> Result<(&[u8], &[u8]), SdkError> {
    let (len, rest) = buf.split_first_chunk::<4>().ok_or(SdkError::Frame)?;
    let len = u32::from_be_bytes(*len) as usize;
    if rest.len() < len {
        return Err(SdkError::Frame);
    }
    Ok(rest.split_at(len))
}

pub struct Client {
    http: reqwest::Client,
    base_url: String,
    cookie: Option<String>,
}

impl Client {
    /// `base_url` is the server's HTTP root, e.g. `http://127.0.0.1:8080`.
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            cookie: None,
        }
    }

    /// The session cookie (`name=value`) from the last successful login.
    pub fn cookie(&self) -> Option<&str> {
        self.cookie.as_deref()
    }

    pub async fn register(&mut self, alias: &str, password: &str) -> Result<(), SdkError> {
        self.authenticate("register", alias, password).await
    }

    pub async fn login(&mut self, alias: &str, password: &str) -> Result<(), SdkError> {
        self.authenticate("login", alias, password).await
    }

    pub async fn logout(&mut self) -> Result<(), SdkError> {
        let resp = self
            .http
            .post(format!("{}/logout", self.base_url))
            .send()
            .await?;
        check_status(resp).await?;
        self.cookie = None;
        Ok(())
    }

    /// Fetch a plain page (the base template) with the current cookie.
    pub async fn page(&self, path: &str) -> Result<String, SdkError> {
        let mut req = self.http.get(format!("{}{}", self.base_url, path));
        if let Some(cookie) = &self.cookie {
            req = req.header(reqwest::header::COOKIE, cookie);
        }
        let resp = check_status(req.send().await?).await?;
        Ok(resp.text().await?)
    }

    /// Open the WebSocket, presenting the current session cookie.
    pub async fn connect(&self) -> Result<Session, SdkError> {
        let url = format!("{}/ws", self.base_url.replacen("http", "ws", 1));
        let mut request = url.into_client_request()?;
        if let Some(cookie) = &self.cookie {
            let value = HeaderValue::from_str(cookie).map_err(|_| SdkError::InvalidCookie)?;
            request.headers_mut().insert(COOKIE, value);
        }
        let (stream, _) = tokio_tungstenite::connect_async(request).await?;
        Ok(Session { stream })
    }

    async fn authenticate(&mut self, action: &str, alias: &str, password: &str) -> Result<(), SdkError> {
        let hash = passhash(password);
        let resp = self
            .http
            .post(format!("{}/{}", self.base_url, action))
            .form(&[("alias", alias), ("passhash", hash.as_str())])
            .send()
            .await?;
        let resp = check_status(resp).await?;

        self.cookie = resp
            .headers()
            .get(SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(|pair| pair.trim().to_string());
        Ok(())
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, SdkError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(SdkError::Status {
        status: status.as_u16(),
        body,
    })
}

/// An open WebSocket session.
pub struct Session {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Session {
    /// Send a `request` frame for `path`.
    pub async fn send(&mut self, path: &str) -> Result<(), SdkError> {
        let frame = encode_frame(REQUEST_EVENT, path.as_bytes());
        self.stream.send(WsMessage::Binary(frame.into())).await?;
        Ok(())
    }

    /// Wait for the next `response` frame.
    pub async fn recv(&mut self) -> Result<Reply, SdkError> {
        while let Some(msg) = self.stream.next().await {
            let bytes = match msg? {
                WsMessage::Binary(bytes) => bytes,
                WsMessage::Close(_) => return Err(SdkError::Closed),
                _ => continue,
            };
            let (event, payload) = decode_frame(&bytes)?;
            if event != RESPONSE_EVENT {
                return Err(SdkError::UnexpectedEvent(event));
            }
            return Ok(serde_json::from_slice(&payload)?);
        }
        Err(SdkError::Closed)
    }

    /// Send a request and wait for its reply.
    pub async fn request(&mut self, path: &str) -> Result<Reply, SdkError> {
        self.send(path).await?;
        self.recv().await
    }

    pub async fn close(mut self) -> Result<(), SdkError> {
        self.stream.close(None).await?;
        Ok(())
    }
}
