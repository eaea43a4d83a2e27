//! The dispatch pass.
//!
//! # States
//! ```text
//! Idle → MatchingAdded → MatchingDeclared → Resolving → Loading → Rendering → Replying → Idle
//! ```
//!
//! # Design Decisions
//! - One inbound message drives exactly one pass; no state survives it
//! - Once a declared route matches, exactly one reply is written, whatever
//!   the store or renderer do
//! - Added-route handlers are opaque; they reply only if they choose to
//! - Unmatched paths are dropped without a reply

use std::sync::Arc;

use serde_json::Value;

use crate::dispatch::message::{Message, RESPONSE_EVENT};
use crate::net::Connection;
use crate::observability::metrics;
use crate::render::{OutboundReply, Renderer};
use crate::routing::{ResolvedRoute, RouteMatch, RouteTable, Tier};
use crate::session::SessionClaim;
use crate::store::DataLoader;

/// What a dispatch pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// An added route's handler ran.
    Added { index: usize },
    /// A declared route replied using the given tier.
    Declared { index: usize, tier: Tier },
    /// Nothing matched; no reply was sent.
    Unmatched,
}

impl DispatchOutcome {
    fn label(&self) -> &'static str {
        match self {
            DispatchOutcome::Added { .. } => "added",
            DispatchOutcome::Declared { .. } => "declared",
            DispatchOutcome::Unmatched => "unmatched",
        }
    }
}

/// What an added-route handler can see and do.
pub struct HandlerContext<'a> {
    connection: &'a Connection,
    message: &'a Message,
    renderer: &'a dyn Renderer,
}

impl<'a> HandlerContext<'a> {
    pub fn connection(&self) -> &'a Connection {
        self.connection
    }

    pub fn message(&self) -> &'a Message {
        self.message
    }

    pub fn claim(&self) -> &'a SessionClaim {
        self.connection.claim()
    }

    /// Render `template` with `data` and send it as the reply.
    pub fn reply(&self, template: &str, controllers: Vec<String>, data: &Value) -> bool {
        match render_reply(self.renderer, template, controllers, data) {
            Some(reply) => self.connection.send(reply),
            None => false,
        }
    }
}

/// Render and encode a `response` frame.
///
/// A render failure sends whatever markup was written before the error
/// (often nothing); only an encoding failure, which cannot happen for
/// string payloads, suppresses the frame.
pub fn render_reply(
    renderer: &dyn Renderer,
    template: &str,
    controllers: Vec<String>,
    data: &Value,
) -> Option<Message> {
    let markup = match renderer.render(template, data) {
        Ok(markup) => markup,
        Err(e) => {
            tracing::warn!(
                template,
                error = %e,
                partial_len = e.partial().len(),
                "Render failed, replying with partial markup"
            );
            metrics::record_render_failure();
            e.partial().to_string()
        }
    };

    match OutboundReply::new(markup, controllers).to_payload() {
        Ok(payload) => Some(Message::new(RESPONSE_EVENT, payload)),
        Err(e) => {
            tracing::error!(template, error = %e, "Failed to encode reply");
            None
        }
    }
}

/// Routes inbound paths to handlers or to load + render + reply.
#[derive(Clone)]
pub struct Dispatcher {
    routes: Arc<RouteTable>,
    loader: DataLoader,
    renderer: Arc<dyn Renderer>,
}

impl Dispatcher {
    pub fn new(routes: Arc<RouteTable>, loader: DataLoader, renderer: Arc<dyn Renderer>) -> Self {
        Self {
            routes,
            loader,
            renderer,
        }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn renderer(&self) -> &dyn Renderer {
        self.renderer.as_ref()
    }

    /// Run one dispatch pass for `message` received on `conn`.
    pub fn dispatch(&self, conn: &Connection, message: &Message) -> DispatchOutcome {
        let path = message.path();

        let outcome = match self.routes.lookup(&path) {
            Some(RouteMatch::Added {
                index,
                route,
                captures,
            }) => {
                tracing::debug!(
                    connection_id = %conn.id(),
                    path = %path,
                    route = route.pattern().as_str(),
                    "Dispatching to added route"
                );
                let ctx = HandlerContext {
                    connection: conn,
                    message,
                    renderer: self.renderer.as_ref(),
                };
                route.handler().handle(&ctx, &captures);
                DispatchOutcome::Added { index }
            }
            Some(RouteMatch::Declared {
                index,
                route,
                captures,
            }) => {
                let resolved = route.resolve(conn.claim(), &captures);
                tracing::debug!(
                    connection_id = %conn.id(),
                    path = %path,
                    route = route.pattern().as_str(),
                    tier = %resolved.tier,
                    table = %resolved.table,
                    key = %resolved.key,
                    template = %resolved.template,
                    "Dispatching to declared route"
                );
                let tier = resolved.tier;
                self.reply(conn, resolved);
                DispatchOutcome::Declared { index, tier }
            }
            None => {
                tracing::trace!(connection_id = %conn.id(), path = %path, "No route matched");
                DispatchOutcome::Unmatched
            }
        };

        metrics::record_dispatch(outcome.label());
        outcome
    }

    /// Load → render → reply for a resolved declared route.
    fn reply(&self, conn: &Connection, resolved: ResolvedRoute) {
        let data = self.load(&resolved);
        if let Some(reply) = render_reply(
            self.renderer.as_ref(),
            &resolved.template,
            resolved.controllers,
            &data,
        ) {
            conn.send(reply);
        }
    }

    fn load(&self, resolved: &ResolvedRoute) -> Value {
        if resolved.table.is_empty() {
            Value::Null
        } else if resolved.key.is_empty() {
            Value::Array(self.loader.fetch_all(&resolved.table))
        } else {
            self.loader.fetch_one(&resolved.table, &resolved.key)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RouteConfig, RouteDecl};
    use crate::render::RenderError;
    use crate::store::{MemoryStore, Store};
    use std::sync::Mutex;

    /// Echoes its inputs so tests can see what the renderer received.
    #[derive(Default)]
    struct EchoRenderer {
        calls: Mutex<Vec<(String, Value)>>,
    }

    impl Renderer for EchoRenderer {
        fn render(&self, template: &str, data: &Value) -> Result<String, RenderError> {
            self.calls
                .lock()
                .unwrap()
                .push((template.to_string(), data.clone()));
            if template.is_empty() {
                return Err(RenderError::NotFound(String::new()));
            }
            Ok(format!("{template}:{data}"))
        }
    }

    fn tier(table: &str, key: &str, template: &str, controllers: &str) -> RouteConfig {
        RouteConfig {
            table: table.into(),
            key: key.into(),
            template: template.into(),
            controllers: controllers.into(),
            privilege: String::new(),
        }
    }

    fn setup(decls: Vec<RouteDecl>) -> (Arc<MemoryStore>, Arc<EchoRenderer>, Dispatcher) {
        let store = Arc::new(MemoryStore::new());
        let renderer = Arc::new(EchoRenderer::default());
        let mut builder = RouteTable::builder();
        builder.load_declared(&decls).unwrap();
        let dispatcher = Dispatcher::new(
            Arc::new(builder.build()),
            DataLoader::new(store.clone()),
            renderer.clone(),
        );
        (store, renderer, dispatcher)
    }

    fn reply_of(msg: Message) -> OutboundReply {
        assert_eq!(msg.event, RESPONSE_EVENT);
        serde_json::from_slice(&msg.payload).unwrap()
    }

    #[test]
    fn test_fetch_one_and_render() {
        let (store, _, dispatcher) = setup(vec![RouteDecl {
            pattern: "^/widget/(.+)$".into(),
            general: tier("widgets", "$1", "widget", "widget,nav"),
            ..Default::default()
        }]);
        store.insert("widgets", "abc", r#"{"n":1}"#).unwrap();

        let (conn, mut rx) = Connection::channel(SessionClaim::anonymous());
        let outcome = dispatcher.dispatch(&conn, &Message::request("/widget/abc"));
        assert_eq!(outcome, DispatchOutcome::Declared { index: 0, tier: Tier::General });

        let reply = reply_of(rx.try_recv().unwrap());
        assert_eq!(reply.template, r#"widget:{"n":1}"#);
        assert_eq!(reply.controllers, vec!["widget", "nav"]);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_fetch_all_when_key_empty() {
        let (store, renderer, dispatcher) = setup(vec![RouteDecl {
            pattern: "^/widgets$".into(),
            general: tier("widgets", "", "list", ""),
            ..Default::default()
        }]);
        store.insert("widgets", "b", "2").unwrap();
        store.insert("widgets", "a", "1").unwrap();

        let (conn, mut rx) = Connection::channel(SessionClaim::anonymous());
        dispatcher.dispatch(&conn, &Message::request("/widgets"));
        let reply = reply_of(rx.try_recv().unwrap());
        assert_eq!(reply.template, "list:[1,2]");
        assert!(reply.controllers.is_empty());
        assert_eq!(renderer.calls.lock().unwrap()[0].1, serde_json::json!([1, 2]));
    }

    #[test]
    fn test_empty_table_skips_fetch() {
        let (_, renderer, dispatcher) = setup(vec![RouteDecl {
            pattern: "^/about$".into(),
            general: tier("", "$1", "about", "about"),
            ..Default::default()
        }]);

        let (conn, mut rx) = Connection::channel(SessionClaim::anonymous());
        dispatcher.dispatch(&conn, &Message::request("/about"));
        assert_eq!(reply_of(rx.try_recv().unwrap()).template, "about:null");
        assert_eq!(renderer.calls.lock().unwrap()[0].1, Value::Null);
    }

    #[test]
    fn test_dynamic_table_out_of_range_skips_fetch() {
        let (_, _, dispatcher) = setup(vec![RouteDecl {
            pattern: "^/x$".into(),
            general: tier("$3", "k", "x", ""),
            ..Default::default()
        }]);

        let (conn, mut rx) = Connection::channel(SessionClaim::anonymous());
        dispatcher.dispatch(&conn, &Message::request("/x"));
        assert_eq!(reply_of(rx.try_recv().unwrap()).template, "x:null");
    }

    #[test]
    fn test_render_failure_still_replies() {
        let (_, _, dispatcher) = setup(vec![RouteDecl {
            pattern: "^/empty$".into(),
            ..Default::default()
        }]);

        let (conn, mut rx) = Connection::channel(SessionClaim::new("a", "admin"));
        let outcome = dispatcher.dispatch(&conn, &Message::request("/empty"));
        assert_eq!(outcome, DispatchOutcome::Declared { index: 0, tier: Tier::General });
        assert_eq!(reply_of(rx.try_recv().unwrap()), OutboundReply::default());
    }

    #[test]
    fn test_render_failure_sends_partial_markup() {
        let renderer = crate::render::TemplateRenderer::from_sources([(
            "half",
            "<ul><li>{{ data }}</li>{{ no_such_function() }}</ul>",
        )])
        .unwrap();

        let message = render_reply(&renderer, "half", vec!["list".into()], &serde_json::json!(7)).unwrap();
        let reply = reply_of(message);
        assert_eq!(reply.template, "<ul><li>7</li>");
        assert_eq!(reply.controllers, vec!["list"]);
    }

    #[test]
    fn test_unmatched_is_silent() {
        let (_, renderer, dispatcher) = setup(vec![]);
        let (conn, mut rx) = Connection::channel(SessionClaim::anonymous());
        assert_eq!(
            dispatcher.dispatch(&conn, &Message::request("/nowhere")),
            DispatchOutcome::Unmatched
        );
        assert!(rx.try_recv().is_err());
        assert!(renderer.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_event_name_is_ignored() {
        let (_, _, dispatcher) = setup(vec![RouteDecl {
            pattern: "^/$".into(),
            general: tier("", "", "index", ""),
            ..Default::default()
        }]);
        let (conn, mut rx) = Connection::channel(SessionClaim::anonymous());
        dispatcher.dispatch(&conn, &Message::new("anything", "/"));
        assert!(rx.try_recv().is_ok());
    }
}
