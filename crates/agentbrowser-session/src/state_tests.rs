use super::*;

use chrono::Utc;

fn entry(role: &str, name: &str) -> RefEntry {
    RefEntry {
        selector: format!("role={}[name=\"{}\"]", role, name),
        role: role.to_string(),
        name: Some(name.to_string()),
        nth: None,
    }
}

#[test]
fn test_new_store_is_unlaunched() {
    let store = SessionStore::default();
    assert!(!store.is_launched());
    assert!(store.focus().is_none());
    assert_eq!(store.ref_count(), 0);
}

#[test]
fn test_refs_are_replaced_wholesale() {
    let store = SessionStore::default();
    let mut first = RefMap::new();
    first.insert("e1".into(), entry("button", "Save"));
    first.insert("e2".into(), entry("link", "Home"));
    store.replace_refs(first);
    assert!(store.ref_entry("@e2").is_some());

    let mut second = RefMap::new();
    second.insert("e1".into(), entry("textbox", "Email"));
    store.replace_refs(second);

    assert!(store.ref_entry("@e2").is_none());
    assert_eq!(store.ref_entry("e1").unwrap().role, "textbox");
}

#[test]
fn test_focus_follows_page_and_frame() {
    let store = SessionStore::default();
    store.mark_launched(Some("P1".into()));
    store.set_frame(Some("F2".into()));
    assert_eq!(
        store.focus(),
        Some(Focus {
            page_id: "P1".into(),
            frame_id: Some("F2".into())
        })
    );

    store.set_active_page(Some("P2".into()));
    assert_eq!(store.focus(), Some(Focus::page("P2")));

    // A second launch keeps the page already in focus.
    store.mark_launched(Some("P9".into()));
    assert_eq!(store.active_page().as_deref(), Some("P2"));
}

#[test]
fn test_close_forgets_browser_state_but_keeps_logs() {
    let store = SessionStore::new(10);
    store.mark_launched(Some("P1".into()));
    let mut refs = RefMap::new();
    refs.insert("e1".into(), entry("button", "Go"));
    store.replace_refs(refs);
    store.record_events(vec![EngineEvent::PageError {
        message: "boom".into(),
        timestamp: Utc::now(),
    }]);

    store.mark_closed();

    assert!(!store.is_launched());
    assert!(store.focus().is_none());
    assert!(store.ref_entry("e1").is_none());
    assert_eq!(store.errors(false).len(), 1);
}

#[test]
fn test_log_queries_filter_and_clear() {
    let store = SessionStore::new(10);
    let now = Utc::now();
    store.record_events(vec![
        EngineEvent::Request {
            method: "GET".into(),
            url: "https://a.test/api/items".into(),
            resource_type: "Fetch".into(),
            timestamp: now,
        },
        EngineEvent::Request {
            method: "GET".into(),
            url: "https://a.test/logo.png".into(),
            resource_type: "Image".into(),
            timestamp: now,
        },
        EngineEvent::Console {
            level: "log".into(),
            text: "hello".into(),
            timestamp: now,
        },
    ]);

    let api = store.requests(Some("/api/"), false);
    assert_eq!(api.len(), 1);
    assert_eq!(api[0].resource_type, "Fetch");
    assert_eq!(store.requests(None, true).len(), 2);
    assert!(store.requests(None, false).is_empty());

    assert_eq!(store.console(true)[0].text, "hello");
    assert!(store.console(false).is_empty());
}
