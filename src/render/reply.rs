//! Reply payload sent back over the connection.

use serde::{Deserialize, Serialize};

/// Body of a `response` frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundReply {
    /// Rendered markup.
    pub template: String,
    /// Client-side controllers to activate, in order.
    pub controllers: Vec<String>,
}

impl OutboundReply {
    pub fn new(template: String, controllers: Vec<String>) -> Self {
        Self {
            template,
            controllers,
        }
    }

    pub fn to_payload(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
