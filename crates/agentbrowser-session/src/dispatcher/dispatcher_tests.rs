use super::*;

use agentbrowser_engine::{EngineEvent, FrameInfo, MockElement, MockEngine};
use agentbrowser_protocol::parse;
use chrono::Utc;
use serde_json::json;

const SHOP: &str = "https://shop.test/";

fn setup() -> (Arc<MockEngine>, Dispatcher, SessionStore) {
    setup_with(DispatcherConfig::default())
}

fn setup_with(config: DispatcherConfig) -> (Arc<MockEngine>, Dispatcher, SessionStore) {
    let engine = Arc::new(MockEngine::new());
    engine.set_document(
        SHOP,
        "Shop",
        vec![
            MockElement::new("#q", "textbox", "Search"),
            MockElement::new("#d1", "button", "Delete"),
            MockElement::new("#d2", "button", "Delete"),
            MockElement::new("#d3", "button", "Delete"),
            MockElement::new("#terms", "checkbox", "Accept terms"),
            MockElement::new("#ghost", "button", "Ghost").hidden(),
        ],
    );
    let dyn_engine: Arc<dyn BrowserEngine> = engine.clone();
    (engine, Dispatcher::new(dyn_engine, config), SessionStore::default())
}

async fn send(dispatcher: &Dispatcher, store: &SessionStore, raw: &str) -> Response {
    let command = parse(raw).expect("test command parses");
    dispatcher.execute(store, command).await
}

async fn ok(dispatcher: &Dispatcher, store: &SessionStore, raw: &str) -> Value {
    let response = send(dispatcher, store, raw).await;
    response
        .into_result()
        .unwrap_or_else(|e| panic!("{} failed: {}", raw, e))
}

async fn err(dispatcher: &Dispatcher, store: &SessionStore, raw: &str) -> String {
    let response = send(dispatcher, store, raw).await;
    assert!(!response.is_success(), "{} should fail", raw);
    response.error().unwrap_or_default().to_string()
}

async fn open_shop(dispatcher: &Dispatcher, store: &SessionStore) {
    ok(
        dispatcher,
        store,
        &format!(r#"{{"id":"nav","action":"navigate","url":"{}"}}"#, SHOP),
    )
    .await;
}

#[tokio::test]
async fn test_navigate_launches_implicitly() {
    let (engine, dispatcher, store) = setup();
    engine.set_status(SHOP, 201);

    let result = ok(
        &dispatcher,
        &store,
        r#"{"id":"1","action":"navigate","url":"https://shop.test/"}"#,
    )
    .await;

    assert_eq!(result, json!({"url": SHOP, "status": 201}));
    assert_eq!(engine.launches(), 1);
    assert!(store.is_launched());
    assert_eq!(store.active_page().as_deref(), Some("P1"));
}

#[tokio::test]
async fn test_implicit_launch_uses_configured_options() {
    let mut config = DispatcherConfig::default();
    config.launch.headless = false;
    let (engine, dispatcher, store) = setup_with(config);

    ok(&dispatcher, &store, r#"{"id":"1","action":"getUrl"}"#).await;

    let options = engine.launch_options().expect("launched");
    assert!(!options.headless);
}

#[tokio::test]
async fn test_explicit_launch_is_idempotent_and_merges_fields() {
    let (engine, dispatcher, store) = setup();

    let result = ok(
        &dispatcher,
        &store,
        r#"{"id":"1","action":"launch","headless":false,"viewport":{"width":800,"height":600}}"#,
    )
    .await;
    assert_eq!(result, json!({"launched": true}));
    ok(&dispatcher, &store, r#"{"id":"2","action":"launch"}"#).await;

    assert_eq!(engine.launches(), 1);
    let options = engine.launch_options().expect("launched");
    assert!(!options.headless);
    assert_eq!(options.viewport, Some((800, 600)));
}

#[tokio::test]
async fn test_response_echoes_request_id() {
    let (_engine, dispatcher, store) = setup();

    let response = send(&dispatcher, &store, r#"{"id":"req-42","action":"getTitle"}"#).await;
    assert_eq!(response.id(), "req-42");
    assert!(response.is_success());

    let response = send(&dispatcher, &store, r##"{"id":"req-43","action":"click","selector":"#nope"}"##).await;
    assert_eq!(response.id(), "req-43");
    assert!(!response.is_success());
}

#[tokio::test]
async fn test_unknown_ref_before_any_snapshot() {
    let (_engine, dispatcher, store) = setup();

    let message = err(
        &dispatcher,
        &store,
        r#"{"id":"1","action":"click","selector":"@e99"}"#,
    )
    .await;

    assert_eq!(
        message,
        "Invalid or expired ref @e99: refs are replaced by every snapshot. \
         Run 'snapshot' to get current refs."
    );
}

#[tokio::test]
async fn test_duplicate_names_get_occurrence_indexes() {
    let (engine, dispatcher, store) = setup();
    open_shop(&dispatcher, &store).await;

    let result = ok(
        &dispatcher,
        &store,
        r#"{"id":"1","action":"snapshot","interactive":true}"#,
    )
    .await;

    let tree = result["tree"].as_str().expect("tree");
    assert!(tree.contains("- button \"Delete\" [ref=e2]\n"));
    assert!(!tree.contains("[nth=0]"));
    assert!(tree.contains("- button \"Delete\" [ref=e3] [nth=1]"));
    assert!(tree.contains("- button \"Delete\" [ref=e4] [nth=2]"));
    assert!(!tree.contains("Ghost"));
    assert_eq!(result["url"], SHOP);
    assert_eq!(result["title"], "Shop");

    let refs = &result["refs"];
    assert_eq!(refs["e1"]["role"], "textbox");
    assert!(refs["e1"].get("nth").is_none());
    assert_eq!(refs["e3"]["nth"], 1);
    assert_eq!(
        refs["e4"]["selector"],
        "role=button[name=\"Delete\"] >> nth=2"
    );

    ok(&dispatcher, &store, r#"{"id":"2","action":"click","selector":"@e3"}"#).await;
    let last = engine.calls().last().cloned().unwrap_or_default();
    assert_eq!(last, "click role=button[name=\"Delete\"] >> nth=1");
}

#[tokio::test]
async fn test_next_snapshot_replaces_refs() {
    let (engine, dispatcher, store) = setup();
    open_shop(&dispatcher, &store).await;
    ok(&dispatcher, &store, r#"{"id":"1","action":"snapshot","interactive":true}"#).await;
    assert_eq!(store.ref_count(), 5);

    engine.set_document(
        "https://shop.test/cart",
        "Cart",
        vec![MockElement::new("a.checkout", "link", "Checkout")],
    );
    ok(
        &dispatcher,
        &store,
        r#"{"id":"2","action":"navigate","url":"https://shop.test/cart"}"#,
    )
    .await;
    // Navigation alone keeps the table.
    assert_eq!(store.ref_count(), 5);

    ok(&dispatcher, &store, r#"{"id":"3","action":"snapshot","interactive":true}"#).await;
    assert_eq!(store.ref_count(), 1);

    let message = err(&dispatcher, &store, r#"{"id":"4","action":"click","selector":"@e4"}"#).await;
    assert!(message.starts_with("Invalid or expired ref @e4"));
    ok(&dispatcher, &store, r#"{"id":"5","action":"click","selector":"@e1"}"#).await;
}

#[tokio::test]
async fn test_scoped_snapshot() {
    let (_engine, dispatcher, store) = setup();
    open_shop(&dispatcher, &store).await;

    let result = ok(
        &dispatcher,
        &store,
        r##"{"id":"1","action":"snapshot","selector":"#terms"}"##,
    )
    .await;

    assert_eq!(result["tree"], "- checkbox \"Accept terms\" [ref=e1]");
    assert_eq!(store.ref_count(), 1);
}

#[tokio::test]
async fn test_element_actions_and_queries() {
    let (engine, dispatcher, store) = setup();
    open_shop(&dispatcher, &store).await;

    let result = ok(
        &dispatcher,
        &store,
        r##"{"id":"1","action":"fill","selector":"#q","value":"shoes"}"##,
    )
    .await;
    assert_eq!(result, json!({"filled": true}));
    ok(
        &dispatcher,
        &store,
        r##"{"id":"2","action":"type","selector":"#q","text":" red"}"##,
    )
    .await;
    let result = ok(&dispatcher, &store, r##"{"id":"3","action":"getValue","selector":"#q"}"##).await;
    assert_eq!(result, json!({"value": "shoes red"}));

    ok(
        &dispatcher,
        &store,
        r##"{"id":"4","action":"type","selector":"#q","text":"boots","clear":true}"##,
    )
    .await;
    assert_eq!(engine.element(SHOP, "#q").map(|e| e.value).as_deref(), Some("boots"));

    let result = ok(&dispatcher, &store, r##"{"id":"5","action":"check","selector":"#terms"}"##).await;
    assert_eq!(result, json!({"checked": true}));
    let result = ok(&dispatcher, &store, r##"{"id":"6","action":"isChecked","selector":"#terms"}"##).await;
    assert_eq!(result, json!({"checked": true}));

    let result = ok(
        &dispatcher,
        &store,
        r#"{"id":"7","action":"getCount","selector":"text=delete"}"#,
    )
    .await;
    assert_eq!(result, json!({"count": 3}));

    let result = ok(&dispatcher, &store, r##"{"id":"8","action":"isVisible","selector":"#ghost"}"##).await;
    assert_eq!(result, json!({"visible": false}));

    let result = ok(&dispatcher, &store, r#"{"id":"9","action":"press","key":"Enter"}"#).await;
    assert_eq!(result, json!({"pressed": "Enter"}));
}

#[tokio::test]
async fn test_scroll_uses_default_amount() {
    let (engine, dispatcher, store) = setup();
    open_shop(&dispatcher, &store).await;

    ok(&dispatcher, &store, r#"{"id":"1","action":"scroll"}"#).await;
    ok(&dispatcher, &store, r#"{"id":"2","action":"scroll","direction":"left","amount":50}"#).await;

    let calls = engine.calls();
    assert!(calls.contains(&"scroll page 0,300".to_string()));
    assert!(calls.contains(&"scroll page -50,0".to_string()));
}

#[tokio::test]
async fn test_engine_failures_are_translated() {
    let (engine, dispatcher, store) = setup();
    engine.set_document(
        "https://shop.test/modal",
        "Modal",
        vec![
            MockElement::new("#buy", "button", "Buy").covered_by("<div#overlay.modal>"),
            MockElement::new("li.item", "listitem", "One"),
            MockElement::new("li.item", "listitem", "Two"),
        ],
    );
    ok(
        &dispatcher,
        &store,
        r#"{"id":"1","action":"navigate","url":"https://shop.test/modal"}"#,
    )
    .await;

    let message = err(
        &dispatcher,
        &store,
        r##"{"id":"2","action":"click","selector":"#buy","timeout":100}"##,
    )
    .await;
    assert!(message.starts_with("\"#buy\" is covered by <div#overlay.modal>"));

    let message = err(
        &dispatcher,
        &store,
        r#"{"id":"3","action":"getText","selector":"li.item"}"#,
    )
    .await;
    assert!(message.starts_with("\"li.item\" matched 2 elements."));

    let message = err(
        &dispatcher,
        &store,
        r##"{"id":"4","action":"hover","selector":"#missing"}"##,
    )
    .await;
    assert!(message.contains("\"#missing\" was not found"));
}

#[tokio::test]
async fn test_screenshot_to_file_or_inline() {
    let (_engine, dispatcher, store) = setup();
    open_shop(&dispatcher, &store).await;
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("shots").join("page.png");
    let path = path.to_string_lossy().to_string();

    let result = ok(
        &dispatcher,
        &store,
        &json!({"id": "1", "action": "screenshot", "path": path}).to_string(),
    )
    .await;
    assert_eq!(result, json!({"path": path}));
    let bytes = std::fs::read(&path).expect("screenshot written");
    assert!(bytes.starts_with(b"\x89PNG"));

    let result = ok(&dispatcher, &store, r#"{"id":"2","action":"screenshot"}"#).await;
    assert_eq!(result, json!({"data": "iVBORw0KGgo="}));
}

#[tokio::test]
async fn test_get_dom_prunes_hidden_nodes() {
    let (_engine, dispatcher, store) = setup();
    open_shop(&dispatcher, &store).await;

    let result = ok(&dispatcher, &store, r#"{"id":"1","action":"getDom"}"#).await;
    let dom = result["dom"].to_string();
    assert!(dom.contains("Accept terms"));
    assert!(!dom.contains("Ghost"));
    assert_eq!(result["url"], SHOP);

    let result = ok(
        &dispatcher,
        &store,
        r#"{"id":"2","action":"getDom","includeHidden":true}"#,
    )
    .await;
    assert!(result["dom"].to_string().contains("Ghost"));
}

#[tokio::test]
async fn test_page_switching() {
    let (_engine, dispatcher, store) = setup();
    open_shop(&dispatcher, &store).await;

    let result = ok(
        &dispatcher,
        &store,
        r#"{"id":"1","action":"newPage","url":"https://docs.test/"}"#,
    )
    .await;
    assert_eq!(result, json!({"created": true, "index": 1}));
    assert_eq!(store.active_page().as_deref(), Some("P2"));

    let result = ok(&dispatcher, &store, r#"{"id":"2","action":"getPages"}"#).await;
    let pages = result["pages"].as_array().expect("pages");
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0]["active"], false);
    assert_eq!(pages[1]["active"], true);

    let result = ok(&dispatcher, &store, r#"{"id":"3","action":"switchPage","url":"shop.test"}"#).await;
    assert_eq!(result, json!({"switched": true, "index": 0, "url": SHOP}));

    let result = ok(&dispatcher, &store, r#"{"id":"4","action":"closePage"}"#).await;
    assert_eq!(result, json!({"closed": true, "remaining": 1}));
    assert_eq!(store.active_page().as_deref(), Some("P2"));
    let result = ok(&dispatcher, &store, r#"{"id":"5","action":"getUrl"}"#).await;
    assert_eq!(result, json!({"url": "https://docs.test/"}));

    ok(&dispatcher, &store, r#"{"id":"6","action":"closePage"}"#).await;
    let message = err(&dispatcher, &store, r#"{"id":"7","action":"getTitle"}"#).await;
    assert_eq!(message, "No page is open. Run 'newPage' to open one.");

    let message = err(&dispatcher, &store, r#"{"id":"8","action":"switchPage","index":5}"#).await;
    assert!(message.starts_with("Page not found: 5."));
}

#[tokio::test]
async fn test_frame_focus() {
    let (engine, dispatcher, store) = setup();
    engine.set_document(
        "https://shop.test/pay",
        "Pay",
        vec![
            MockElement::new("iframe#card", "iframe", "").hosts_frame("F1"),
            MockElement::new("#pay", "button", "Pay").in_frame("F1"),
        ],
    );
    engine.add_frame(
        "https://shop.test/pay",
        FrameInfo {
            id: "F1".to_string(),
            name: "card".to_string(),
            url: "https://psp.test/card".to_string(),
            parent_id: Some("P1".to_string()),
        },
    );
    ok(
        &dispatcher,
        &store,
        r#"{"id":"1","action":"navigate","url":"https://shop.test/pay"}"#,
    )
    .await;

    let result = ok(&dispatcher, &store, r#"{"id":"2","action":"getFrames"}"#).await;
    assert_eq!(result["frames"].as_array().map(Vec::len), Some(2));

    let result = ok(
        &dispatcher,
        &store,
        r#"{"id":"3","action":"switchToFrame","name":"card"}"#,
    )
    .await;
    assert_eq!(result["frame"]["id"], "F1");
    ok(&dispatcher, &store, r##"{"id":"4","action":"click","selector":"#pay"}"##).await;

    ok(&dispatcher, &store, r#"{"id":"5","action":"switchToMainFrame"}"#).await;
    assert_eq!(store.active_frame(), None);
    let message = err(
        &dispatcher,
        &store,
        r##"{"id":"6","action":"click","selector":"#pay","timeout":100}"##,
    )
    .await;
    assert!(message.contains("was not found"));

    ok(
        &dispatcher,
        &store,
        r##"{"id":"7","action":"switchToFrame","selector":"iframe#card"}"##,
    )
    .await;
    assert_eq!(store.active_frame().as_deref(), Some("F1"));
    ok(&dispatcher, &store, r#"{"id":"8","action":"reload"}"#).await;
    assert_eq!(store.active_frame(), None);

    let message = err(
        &dispatcher,
        &store,
        r#"{"id":"9","action":"switchToFrame","name":"nope"}"#,
    )
    .await;
    assert!(message.starts_with("Frame not found: nope."));
}

#[tokio::test]
async fn test_log_queries_do_not_launch() {
    let (engine, dispatcher, store) = setup();

    let result = ok(&dispatcher, &store, r#"{"id":"1","action":"console"}"#).await;
    assert_eq!(result, json!({"messages": []}));
    assert_eq!(engine.launches(), 0);

    open_shop(&dispatcher, &store).await;
    engine.push_event(EngineEvent::Console {
        level: "warn".to_string(),
        text: "low stock".to_string(),
        timestamp: Utc::now(),
    });
    engine.push_event(EngineEvent::Request {
        method: "GET".to_string(),
        url: "https://api.shop.test/cart".to_string(),
        resource_type: "fetch".to_string(),
        timestamp: Utc::now(),
    });

    let result = ok(&dispatcher, &store, r#"{"id":"2","action":"console","clear":true}"#).await;
    assert_eq!(result["messages"][0]["type"], "warn");
    assert_eq!(result["messages"][0]["text"], "low stock");
    let result = ok(&dispatcher, &store, r#"{"id":"3","action":"console"}"#).await;
    assert_eq!(result, json!({"messages": []}));

    let result = ok(&dispatcher, &store, r#"{"id":"4","action":"requests","filter":"api."}"#).await;
    assert_eq!(result["requests"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_storage_and_evaluate() {
    let (engine, dispatcher, store) = setup();
    open_shop(&dispatcher, &store).await;
    engine.set_local_storage("theme", "dark");
    engine.set_eval_result("document.title", json!("Shop"));

    let result = ok(&dispatcher, &store, r#"{"id":"1","action":"getLocalStorage","key":"theme"}"#).await;
    assert_eq!(result, json!({"value": "dark"}));
    let result = ok(&dispatcher, &store, r#"{"id":"2","action":"getLocalStorage"}"#).await;
    assert_eq!(result, json!({"storage": {"theme": "dark"}}));
    ok(&dispatcher, &store, r#"{"id":"3","action":"clearLocalStorage"}"#).await;
    let result = ok(&dispatcher, &store, r#"{"id":"4","action":"getLocalStorage","key":"theme"}"#).await;
    assert_eq!(result, json!({"value": null}));

    let result = ok(
        &dispatcher,
        &store,
        r#"{"id":"5","action":"evaluate","script":"document.title"}"#,
    )
    .await;
    assert_eq!(result, json!({"result": "Shop"}));
}

#[tokio::test]
async fn test_close_marks_store_closed() {
    let (engine, dispatcher, store) = setup();
    open_shop(&dispatcher, &store).await;

    let result = ok(&dispatcher, &store, r#"{"id":"1","action":"close"}"#).await;
    assert_eq!(result, json!({"closed": true}));
    assert!(!store.is_launched());

    // The next browser command starts a fresh browser.
    ok(&dispatcher, &store, r#"{"id":"2","action":"getUrl"}"#).await;
    assert_eq!(engine.launches(), 2);
}

#[tokio::test]
async fn test_relaunch_after_browser_loss() {
    let (engine, dispatcher, store) = setup();
    open_shop(&dispatcher, &store).await;
    ok(&dispatcher, &store, r#"{"id":"1","action":"snapshot"}"#).await;

    // The browser dies behind the session's back.
    engine.close().await.expect("mock close");
    assert!(store.is_launched());

    let result = ok(&dispatcher, &store, r#"{"id":"2","action":"getUrl"}"#).await;
    assert_eq!(result, json!({"url": "about:blank"}));
    assert_eq!(engine.launches(), 2);
    assert_eq!(store.active_page().as_deref(), Some("P2"));

    let message = err(
        &dispatcher,
        &store,
        r#"{"id":"3","action":"click","selector":"@e1"}"#,
    )
    .await;
    assert!(message.starts_with("Invalid or expired ref @e1"), "{}", message);

    ok(&dispatcher, &store, r#"{"id":"4","action":"launch"}"#).await;
    open_shop(&dispatcher, &store).await;
    assert_eq!(engine.launches(), 2);
}
