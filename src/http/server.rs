//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the axum Router with all handlers
//! - Wire up middleware (request ID, timeout, tracing)
//! - Serve plain or over TLS until the shutdown future resolves

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use serde_json::Value;
use tokio::net::TcpListener;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{AppConfig, TlsConfig};
use crate::dispatch::Dispatcher;
use crate::http::{auth, websocket};
use crate::net::ConnectionTracker;
use crate::observability::metrics;
use crate::session::{resolve_claim, Accounts, CookieCodec};

/// Grace period for in-flight requests once shutdown starts (TLS listener).
const TLS_SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub accounts: Accounts,
    pub codec: Arc<CookieCodec>,
    pub tracker: Arc<ConnectionTracker>,
    pub base_template: Arc<str>,
}

/// HTTP server fronting the dispatcher.
pub struct HttpServer {
    router: Router,
    tls: Option<TlsConfig>,
}

impl HttpServer {
    pub fn new(config: &AppConfig, state: AppState) -> Self {
        Self {
            router: Self::build_router(config, state),
            tls: config.listener.tls.clone(),
        }
    }

    /// Build the axum router with all middleware layers.
    fn build_router(config: &AppConfig, state: AppState) -> Router {
        let mut router = Router::new()
            .route("/ws", get(websocket::ws_handler))
            .route("/register", post(auth::register))
            .route("/login", post(auth::login))
            .route("/logout", post(auth::logout).get(auth::logout))
            .fallback(base_page);

        if config.static_files.enabled {
            router = router.nest_service("/static", ServeDir::new(&config.static_files.dir));
        }

        router
            .with_state(state)
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                Duration::from_secs(config.listener.request_timeout_secs),
            ))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` resolves.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;

        match self.tls {
            None => {
                tracing::info!(address = %addr, "HTTP server starting");
                axum::serve(listener, self.router)
                    .with_graceful_shutdown(shutdown)
                    .await?;
            }
            Some(tls) => {
                tracing::info!(address = %addr, cert = %tls.cert_path, "HTTPS server starting");
                let rustls = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path).await?;
                let handle = axum_server::Handle::new();
                let trigger = handle.clone();
                tokio::spawn(async move {
                    shutdown.await;
                    trigger.graceful_shutdown(Some(TLS_SHUTDOWN_GRACE));
                });
                axum_server::from_tcp_rustls(listener.into_std()?, rustls)
                    .handle(handle)
                    .serve(self.router.into_make_service())
                    .await?;
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Plain page loads render the base template with the caller's claim.
async fn base_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let cookie = headers.get(header::COOKIE).and_then(|v| v.to_str().ok());
    let claim = resolve_claim(&state.codec, cookie);
    let data = serde_json::to_value(&claim).unwrap_or(Value::Null);

    match state.dispatcher.renderer().render(&state.base_template, &data) {
        Ok(markup) => Html(markup).into_response(),
        Err(e) => {
            tracing::error!(template = %state.base_template, error = %e, "Base page render failed");
            metrics::record_render_failure();
            (StatusCode::INTERNAL_SERVER_ERROR, "Page unavailable").into_response()
        }
    }
}
