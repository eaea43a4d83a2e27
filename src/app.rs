//! Application assembly.
//!
//! # Responsibilities
//! - Open the store, load templates and build the cookie codec from config
//! - Collect added routes before serving
//! - Freeze the route table, prepare store tables and start the HTTP server
//!
//! # Data Flow
//! ```text
//! AppConfig
//!     → App::new (store, renderer, codec, declared routes compiled)
//!     → App::add_route (zero or more)
//!     → App::into_server (table frozen, tables prepared)
//!     → HttpServer::run
//! ```

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::AppConfig;
use crate::dispatch::Dispatcher;
use crate::http::{AppState, HttpServer};
use crate::net::ConnectionTracker;
use crate::render::{RenderError, Renderer, TemplateRenderer};
use crate::routing::{RouteHandler, RouteTableBuilder, TableError};
use crate::session::accounts::AUTH_TABLE;
use crate::session::{Accounts, CookieCodec, CookieError};
use crate::store::{open_store, DataLoader, Store, StoreError};

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("route table: {0}")]
    Routes(#[from] TableError),

    #[error("store: {0}")]
    Store(#[from] StoreError),

    #[error("templates: {0}")]
    Render(#[from] RenderError),

    #[error("session cookie: {0}")]
    Cookie(#[from] CookieError),

    #[error("server: {0}")]
    Io(#[from] std::io::Error),
}

/// A configured application that has not started serving yet.
pub struct App {
    config: AppConfig,
    store: Arc<dyn Store>,
    renderer: Arc<dyn Renderer>,
    codec: Arc<CookieCodec>,
    routes: RouteTableBuilder,
}

impl App {
    /// Build the application from config: store backend and template directory
    /// come from the config file.
    pub fn new(config: AppConfig) -> Result<Self, AppError> {
        let store = open_store(&config.store)?;
        let renderer = TemplateRenderer::from_dir(&config.templates.dir)?;
        tracing::info!(
            backend = ?config.store.backend,
            templates = %config.templates.dir,
            "Store and templates loaded"
        );
        Self::with_parts(config, store, Arc::new(renderer))
    }

    /// Build the application around an existing store and renderer.
    pub fn with_parts(
        config: AppConfig,
        store: Arc<dyn Store>,
        renderer: Arc<dyn Renderer>,
    ) -> Result<Self, AppError> {
        let codec = CookieCodec::from_config(&config.name, &config.session)?;
        let mut routes = RouteTableBuilder::new();
        routes.load_declared(&config.routes)?;

        Ok(Self {
            config,
            store,
            renderer,
            codec: Arc::new(codec),
            routes,
        })
    }

    /// Register a handler route. Added routes are tried before declared ones.
    pub fn add_route<H>(&mut self, pattern: &str, handler: H) -> Result<&mut Self, AppError>
    where
        H: RouteHandler + 'static,
    {
        self.routes.register_added(pattern, handler)?;
        Ok(self)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> Arc<dyn Store> {
        self.store.clone()
    }

    pub fn accounts(&self) -> Accounts {
        Accounts::new(self.store.clone())
    }

    pub fn codec(&self) -> Arc<CookieCodec> {
        self.codec.clone()
    }

    /// Freeze the route table and prepare every table it names.
    pub fn into_dispatcher(self) -> Result<(AppConfig, AppState), AppError> {
        let table = self.routes.build();

        let mut tables = vec![AUTH_TABLE.to_string()];
        tables.extend(table.literal_tables());
        self.store.prepare_tables(&tables)?;
        tracing::info!(
            added = table.added().len(),
            declared = table.declared().len(),
            tables = ?tables,
            "Routes ready"
        );

        let dispatcher = Dispatcher::new(
            Arc::new(table),
            DataLoader::new(self.store.clone()),
            self.renderer,
        );
        let state = AppState {
            dispatcher,
            accounts: Accounts::new(self.store),
            codec: self.codec,
            tracker: Arc::new(ConnectionTracker::new(self.config.listener.max_connections)),
            base_template: Arc::from(self.config.templates.base_template.as_str()),
        };
        Ok((self.config, state))
    }

    pub fn into_server(self) -> Result<HttpServer, AppError> {
        let (config, state) = self.into_dispatcher()?;
        Ok(HttpServer::new(&config, state))
    }

    /// Serve on `listener` until `shutdown` resolves.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), AppError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.into_server()?.run(listener, shutdown).await?;
        Ok(())
    }
}
