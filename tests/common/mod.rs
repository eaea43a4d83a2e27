//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use wsroute::config::loader::parse_toml;
use wsroute::config::AppConfig;
use wsroute::dispatch::{Message, RESPONSE_EVENT};
use wsroute::lifecycle::Shutdown;
use wsroute::render::{OutboundReply, TemplateRenderer};
use wsroute::store::MemoryStore;
use wsroute::App;

pub const ROUTES: &str = r#"
name = "wsroute"

[session]
secret = "integration-secret"

[[routes]]
pattern = '^/widget/(.+)$'
general = { table = "widgets", key = "$1", template = "widget", controllers = "widget" }

[[routes]]
pattern = '^/widgets$'
general = { table = "widgets", template = "widgets", controllers = "widgets, list" }

[[routes]]
pattern = '^/admin/users$'
admin = { table = "auth", template = "users", controllers = "users,table" }

[[routes]]
pattern = '^/reports/(\w+)$'
general = { template = "denied" }
authorized = { table = "reports", key = "$1", template = "report", privilege = "editor,user" }
"#;

pub const TEMPLATES: &[(&str, &str)] = &[
    ("base", r#"<html data-alias="{{ alias }}">{{ privilege }}</html>"#),
    ("widget", "<h1>{{ name }}</h1>"),
    ("widgets", "{{ data | length }} widgets"),
    ("users", "{% for u in data %}{{ u.privilege }};{% endfor %}"),
    ("report", "report {{ title }}"),
    ("denied", "denied"),
    ("echo", "echo {{ path }}"),
];

pub fn config() -> AppConfig {
    parse_toml(ROUTES).expect("test routes parse")
}

/// App over an in-memory store and in-memory templates.
pub fn app() -> (Arc<MemoryStore>, App) {
    let store = Arc::new(MemoryStore::new());
    let renderer = TemplateRenderer::from_sources(TEMPLATES.iter().copied()).unwrap();
    let app = App::with_parts(config(), store.clone(), Arc::new(renderer)).unwrap();
    (store, app)
}

/// Template and static directories laid out the way a deployment has them.
pub fn site_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_site(dir.path());
    dir
}

fn write_site(root: &Path) {
    let views = root.join("views");
    std::fs::create_dir_all(&views).unwrap();
    for (name, source) in TEMPLATES {
        std::fs::write(views.join(format!("{name}.html")), source).unwrap();
    }
    std::fs::write(root.join("app.js"), "console.log('ok');").unwrap();
}

/// Config pointing at a site directory created by [`site_dir`].
pub fn served_config(site: &Path) -> AppConfig {
    let mut config = config();
    config.templates.dir = site.join("views").display().to_string();
    config.static_files.dir = site.display().to_string();
    config
}

/// Bind an ephemeral port and serve `app` until the returned handle triggers.
pub async fn start_server(app: App) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let signaled = shutdown.signaled();

    tokio::spawn(async move {
        let _ = app.serve(listener, signaled).await;
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    (addr, shutdown)
}

/// Decode the next queued reply, failing if none is queued.
pub fn next_reply(rx: &mut mpsc::Receiver<Message>) -> OutboundReply {
    let message = rx.try_recv().expect("a reply was queued");
    assert_eq!(message.event, RESPONSE_EVENT);
    serde_json::from_slice(&message.payload).unwrap()
}
