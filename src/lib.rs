//! WebSocket request dispatch: regex routes, privilege tiers, keyed JSON
//! store, template replies and cookie sessions.

pub mod app;
pub mod config;
pub mod dispatch;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod render;
pub mod routing;
pub mod session;
pub mod store;

pub use app::{App, AppError};
pub use config::schema::AppConfig;
pub use dispatch::{Dispatcher, HandlerContext, Message};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
