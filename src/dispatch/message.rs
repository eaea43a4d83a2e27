//! Wire frame carried in WebSocket binary messages.
//!
//! # Layout
//! ```text
//! ┌──────────────┬─────────────┬────────────────┬───────────────┐
//! │ event len u32│ event bytes │ payload len u32│ payload bytes │
//! │  big endian  │   (UTF-8)   │   big endian   │               │
//! └──────────────┴─────────────┴────────────────┴───────────────┘
//! ```

use std::borrow::Cow;

use thiserror::Error;

/// Event carrying a path to dispatch.
pub const REQUEST_EVENT: &str = "request";

/// Event carrying a rendered reply.
pub const RESPONSE_EVENT: &str = "response";

const LEN_PREFIX: usize = 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame truncated: needed {needed} bytes, had {available}")]
    Truncated { needed: usize, available: usize },

    #[error("event name is not valid UTF-8")]
    InvalidEvent,

    #[error("{0} trailing bytes after payload")]
    TrailingBytes(usize),

    #[error("field of {0} bytes exceeds the frame length limit")]
    TooLarge(usize),
}

/// One event + payload pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub event: String,
    pub payload: Vec<u8>,
}

fn read_field<'a>(buf: &'a [u8], offset: &mut usize) -> Result<&'a [u8], FrameError> {
    let available = buf.len() - *offset;
    if available < LEN_PREFIX {
        return Err(FrameError::Truncated {
            needed: LEN_PREFIX,
            available,
        });
    }
    let mut len_bytes = [0u8; LEN_PREFIX];
    len_bytes.copy_from_slice(&buf[*offset..*offset + LEN_PREFIX]);
    let len = u32::from_be_bytes(len_bytes) as usize;
    *offset += LEN_PREFIX;

    let available = buf.len() - *offset;
    if available < len {
        return Err(FrameError::Truncated {
            needed: len,
            available,
        });
    }
    let field = &buf[*offset..*offset + len];
    *offset += len;
    Ok(field)
}

fn write_field(out: &mut Vec<u8>, field: &[u8]) -> Result<(), FrameError> {
    let len = u32::try_from(field.len()).map_err(|_| FrameError::TooLarge(field.len()))?;
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(field);
    Ok(())
}

impl Message {
    pub fn new(event: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            event: event.into(),
            payload: payload.into(),
        }
    }

    /// A `request` frame for `path`.
    pub fn request(path: &str) -> Self {
        Self::new(REQUEST_EVENT, path.as_bytes())
    }

    /// The payload read as a path. Invalid UTF-8 is replaced, not rejected.
    pub fn path(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }

    pub fn encode(&self) -> Result<Vec<u8>, FrameError> {
        let mut out = Vec::with_capacity(2 * LEN_PREFIX + self.event.len() + self.payload.len());
        write_field(&mut out, self.event.as_bytes())?;
        write_field(&mut out, &self.payload)?;
        Ok(out)
    }

    pub fn decode(buf: &[u8]) -> Result<Self, FrameError> {
        let mut offset = 0;
        let event = read_field(buf, &mut offset)?;
        let event = std::str::from_utf8(event).map_err(|_| FrameError::InvalidEvent)?;
        let payload = read_field(buf, &mut offset)?;
        if offset != buf.len() {
            return Err(FrameError::TrailingBytes(buf.len() - offset));
        }
        Ok(Self::new(event, payload))
    }
}
