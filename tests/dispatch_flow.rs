//! In-process dispatch scenarios: no sockets, one connection handle per claim.

use serde_json::json;

use wsroute::dispatch::{DispatchOutcome, HandlerContext, Message};
use wsroute::net::Connection;
use wsroute::render::OutboundReply;
use wsroute::routing::Tier;
use wsroute::session::{resolve_claim, SessionClaim};
use wsroute::store::Store;

mod common;

#[test]
fn test_widget_store_miss_still_replies() {
    let (_, app) = common::app();
    let (_, state) = app.into_dispatcher().unwrap();
    let (conn, mut rx) = Connection::channel(SessionClaim::anonymous());

    let outcome = state.dispatcher.dispatch(&conn, &Message::request("/widget/abc"));

    assert_eq!(outcome, DispatchOutcome::Declared { index: 0, tier: Tier::General });
    let reply = common::next_reply(&mut rx);
    assert_eq!(reply.template, "<h1></h1>");
    assert_eq!(reply.controllers, vec!["widget"]);
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_fetch_then_render_uses_current_value() {
    let (store, app) = common::app();
    let (_, state) = app.into_dispatcher().unwrap();
    let (conn, mut rx) = Connection::channel(SessionClaim::anonymous());

    store.insert("widgets", "abc", r#"{"name":"First"}"#).unwrap();
    state.dispatcher.dispatch(&conn, &Message::request("/widget/abc"));
    assert_eq!(common::next_reply(&mut rx).template, "<h1>First</h1>");

    store.insert("widgets", "abc", r#"{"name":"Second"}"#).unwrap();
    state.dispatcher.dispatch(&conn, &Message::request("/widget/abc"));
    assert_eq!(common::next_reply(&mut rx).template, "<h1>Second</h1>");
}

#[test]
fn test_same_path_twice_is_byte_identical() {
    let (store, app) = common::app();
    let (_, state) = app.into_dispatcher().unwrap();
    store.insert("widgets", "a", r#"{"name":"A"}"#).unwrap();
    store.insert("widgets", "b", r#"{"name":"B"}"#).unwrap();
    let (conn, mut rx) = Connection::channel(SessionClaim::new("al", "user"));

    state.dispatcher.dispatch(&conn, &Message::request("/widgets"));
    state.dispatcher.dispatch(&conn, &Message::request("/widgets"));

    let first = rx.try_recv().unwrap();
    let second = rx.try_recv().unwrap();
    assert_eq!(first.encode().unwrap(), second.encode().unwrap());

    let reply: OutboundReply = serde_json::from_slice(&first.payload).unwrap();
    assert_eq!(reply.template, "2 widgets");
    assert_eq!(reply.controllers, vec!["widgets", "list"]);
}

#[test]
fn test_admin_tier_and_anonymous_fallthrough() {
    let (_, app) = common::app();
    let accounts = app.accounts();
    let (_, state) = app.into_dispatcher().unwrap();
    accounts.register("alice", "h1").unwrap();
    accounts.register("root", "h2").unwrap();
    accounts.set_privilege("root", "admin").unwrap();

    let (admin, mut admin_rx) = Connection::channel(SessionClaim::new("root", "admin"));
    let outcome = state.dispatcher.dispatch(&admin, &Message::request("/admin/users"));
    assert_eq!(outcome, DispatchOutcome::Declared { index: 2, tier: Tier::Admin });
    let reply = common::next_reply(&mut admin_rx);
    assert_eq!(reply.template, "user;admin;");
    assert_eq!(reply.controllers, vec!["users", "table"]);

    let (anon, mut anon_rx) = Connection::channel(SessionClaim::anonymous());
    let outcome = state.dispatcher.dispatch(&anon, &Message::request("/admin/users"));
    assert_eq!(outcome, DispatchOutcome::Declared { index: 2, tier: Tier::General });
    assert_eq!(common::next_reply(&mut anon_rx), OutboundReply::default());
}

#[test]
fn test_authorized_whitelist() {
    let (store, app) = common::app();
    let (_, state) = app.into_dispatcher().unwrap();
    store.insert("reports", "q3", r#"{"title":"Q3"}"#).unwrap();

    for (privilege, expected) in [("editor", "report Q3"), ("user", "report Q3"), ("guest", "denied"), ("", "denied")] {
        let (conn, mut rx) = Connection::channel(SessionClaim::new("x", privilege));
        state.dispatcher.dispatch(&conn, &Message::request("/reports/q3"));
        assert_eq!(common::next_reply(&mut rx).template, expected, "privilege {privilege:?}");
    }

    // "edit" is a substring of a listed privilege, not a member.
    let (conn, mut rx) = Connection::channel(SessionClaim::new("x", "edit"));
    state.dispatcher.dispatch(&conn, &Message::request("/reports/q3"));
    assert_eq!(common::next_reply(&mut rx).template, "denied");
}

#[test]
fn test_added_route_takes_precedence() {
    let (_, mut app) = common::app();
    app.add_route("^/widget/(special)$", |ctx: &HandlerContext<'_>, caps: &[String]| {
        ctx.reply("echo", vec![caps[1].clone()], &json!({ "path": ctx.message().path() }));
    })
    .unwrap();
    let (_, state) = app.into_dispatcher().unwrap();
    let (conn, mut rx) = Connection::channel(SessionClaim::anonymous());

    let outcome = state.dispatcher.dispatch(&conn, &Message::request("/widget/special"));
    assert_eq!(outcome, DispatchOutcome::Added { index: 0 });
    let reply = common::next_reply(&mut rx);
    assert_eq!(reply.template, "echo /widget/special");
    assert_eq!(reply.controllers, vec!["special"]);

    let outcome = state.dispatcher.dispatch(&conn, &Message::request("/widget/other"));
    assert_eq!(outcome, DispatchOutcome::Declared { index: 0, tier: Tier::General });
}

#[test]
fn test_silent_added_route_sends_nothing() {
    let (_, mut app) = common::app();
    app.add_route("^/noop$", |_: &HandlerContext<'_>, _: &[String]| {}).unwrap();
    let (_, state) = app.into_dispatcher().unwrap();
    let (conn, mut rx) = Connection::channel(SessionClaim::anonymous());

    assert_eq!(
        state.dispatcher.dispatch(&conn, &Message::request("/noop")),
        DispatchOutcome::Added { index: 0 }
    );
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_unmatched_path_gets_no_reply() {
    let (_, app) = common::app();
    let (_, state) = app.into_dispatcher().unwrap();
    let (conn, mut rx) = Connection::channel(SessionClaim::new("root", "admin"));

    assert_eq!(
        state.dispatcher.dispatch(&conn, &Message::request("/nothing/here")),
        DispatchOutcome::Unmatched
    );
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_claim_from_signed_cookie_selects_tier() {
    let (_, app) = common::app();
    let codec = app.codec();
    let (_, state) = app.into_dispatcher().unwrap();

    let sealed = codec.seal(&SessionClaim::new("root", "admin")).unwrap();
    let header = format!("theme=dark; {}={}", codec.name(), sealed);
    let claim = resolve_claim(&codec, Some(header.as_str()));
    let (conn, _rx) = Connection::channel(claim);
    assert_eq!(
        state.dispatcher.dispatch(&conn, &Message::request("/admin/users")),
        DispatchOutcome::Declared { index: 2, tier: Tier::Admin }
    );

    let forged = format!("{}={}x", codec.name(), sealed);
    let (conn, _rx) = Connection::channel(resolve_claim(&codec, Some(forged.as_str())));
    assert_eq!(
        state.dispatcher.dispatch(&conn, &Message::request("/admin/users")),
        DispatchOutcome::Declared { index: 2, tier: Tier::General }
    );
}
