//! Rendering subsystem.
//!
//! # Data Flow
//! ```text
//! (template name, loaded data)
//!     → Renderer::render (templates.rs: minijinja, loaded once at startup)
//!     → OutboundReply { template: markup, controllers }
//!     → JSON payload of a "response" frame
//! ```
//!
//! # Design Decisions
//! - The dispatcher treats the engine as opaque: name + data in, text out
//! - A render failure yields whatever markup was produced before the error;
//!   the reply is still sent

pub mod filters;
pub mod reply;
pub mod templates;

use serde_json::Value;
use thiserror::Error;

pub use reply::OutboundReply;
pub use templates::TemplateRenderer;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template {0:?} not found")]
    NotFound(String),

    #[error("template {name:?} failed: {source}")]
    Template {
        name: String,
        #[source]
        source: minijinja::Error,
        /// Output written before the failure.
        partial: String,
    },

    #[error("failed to read templates from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl RenderError {
    /// Markup produced before the failure, empty when nothing was rendered.
    pub fn partial(&self) -> &str {
        match self {
            Self::Template { partial, .. } => partial,
            _ => "",
        }
    }
}

/// Turns a template name and data into markup.
pub trait Renderer: Send + Sync {
    fn render(&self, template: &str, data: &Value) -> Result<String, RenderError>;
}
