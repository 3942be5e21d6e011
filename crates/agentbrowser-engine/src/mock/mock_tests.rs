use super::*;

use agentbrowser_snapshot::{build_tree, take_snapshot, SnapshotOptions};

const URL: &str = "https://shop.test/";
const WAIT: Duration = Duration::from_millis(200);

async fn engine_on_shop() -> (MockEngine, Focus) {
    let engine = MockEngine::new();
    engine.set_document(
        URL,
        "Shop",
        vec![
            MockElement::new("#q", "textbox", "Search"),
            MockElement::new("#go", "button", "Go"),
            MockElement::new(".del", "button", "Delete"),
            MockElement::new(".del", "button", "Delete"),
            MockElement::new("#terms", "checkbox", "I agree"),
            MockElement::new("#size", "combobox", "Size").options(&["S", "M", "L"]),
            MockElement::new("#ghost", "button", "Ghost").hidden(),
            MockElement::new("#buy", "button", "Buy").covered_by("<div#overlay>"),
        ],
    );
    engine.launch(&LaunchOptions::default()).await.unwrap();
    engine
        .navigate("P1", URL, WaitUntil::Load, WAIT)
        .await
        .unwrap();
    (engine, Focus::page("P1"))
}

#[tokio::test]
async fn test_launch_is_idempotent() {
    let engine = MockEngine::new();
    assert!(matches!(engine.pages().await, Err(EngineError::NotLaunched)));

    engine.launch(&LaunchOptions::default()).await.unwrap();
    engine.launch(&LaunchOptions::default()).await.unwrap();
    assert_eq!(engine.launches(), 1);

    let pages = engine.pages().await.unwrap();
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].url, BLANK_URL);
    assert_eq!(engine.viewport("P1"), Some((1280, 720)));

    engine.close().await.unwrap();
    assert!(!engine.is_running());
}

#[tokio::test]
async fn test_navigation_history() {
    let (engine, _) = engine_on_shop().await;
    engine.set_status("https://shop.test/missing", 404);

    let outcome = engine
        .navigate("P1", "https://shop.test/missing", WaitUntil::Load, WAIT)
        .await
        .unwrap();
    assert_eq!(outcome.status, Some(404));
    assert_eq!(engine.title("P1").await.unwrap(), "");

    engine.go_back("P1", WAIT).await.unwrap();
    assert_eq!(engine.url("P1").await.unwrap(), URL);
    assert_eq!(engine.title("P1").await.unwrap(), "Shop");
    engine.go_forward("P1", WAIT).await.unwrap();
    assert_eq!(engine.url("P1").await.unwrap(), "https://shop.test/missing");
}

#[tokio::test]
async fn test_actions_update_the_document() {
    let (engine, focus) = engine_on_shop().await;

    engine
        .fill(&focus, &Locator::css("#q"), "shoes", WAIT)
        .await
        .unwrap();
    engine
        .type_text(&focus, &Locator::css("#q"), " red", Duration::ZERO, WAIT)
        .await
        .unwrap();
    assert_eq!(engine.element(URL, "#q").unwrap().value, "shoes red");

    let checked = engine
        .set_checked(&focus, &Locator::role("checkbox", Some("I agree".into()), None), true, WAIT)
        .await
        .unwrap();
    assert!(checked);
    assert!(engine.element(URL, "#terms").unwrap().checked);

    let selected = engine
        .select_option(&focus, &Locator::css("#size"), "M", WAIT)
        .await
        .unwrap();
    assert_eq!(selected, vec!["M".to_string()]);

    let err = engine
        .select_option(&focus, &Locator::css("#size"), "XL", WAIT)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("No option with value or label"));

    assert!(engine.calls().contains(&"fill #q=shoes".to_string()));
}

#[tokio::test]
async fn test_ambiguous_locator_is_a_strict_mode_violation() {
    let (engine, focus) = engine_on_shop().await;

    let err = engine
        .click(&focus, &Locator::css(".del"), &ClickOptions::default(), WAIT)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::StrictMode { count: 2, .. }));

    let second = Locator::role("button", Some("Delete".into()), Some(1));
    engine
        .click(&focus, &second, &ClickOptions::default(), WAIT)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_blocked_elements_time_out_with_last_state() {
    let (engine, focus) = engine_on_shop().await;

    let err = engine
        .click(&focus, &Locator::css("#buy"), &ClickOptions::default(), WAIT)
        .await
        .unwrap_err();
    let message = err.to_string();
    assert!(message.starts_with("Timeout 200ms exceeded"));
    assert!(message.contains("<div#overlay> intercepts pointer events"));

    let err = engine
        .click(&focus, &Locator::css("#ghost"), &ClickOptions::default(), WAIT)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("is not visible"));

    let err = engine
        .click(&focus, &Locator::css("#nope"), &ClickOptions::default(), WAIT)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Element not found"));
}

#[tokio::test]
async fn test_queries() {
    let (engine, focus) = engine_on_shop().await;

    let visible = engine
        .query(&focus, &Locator::css("#ghost"), &ElementQuery::Visible, WAIT)
        .await
        .unwrap();
    assert_eq!(visible, json!(false));
    let missing = engine
        .query(&focus, &Locator::css("#nope"), &ElementQuery::Visible, WAIT)
        .await
        .unwrap();
    assert_eq!(missing, json!(false));

    let text = engine
        .query(&focus, &Locator::css("#go"), &ElementQuery::Text, WAIT)
        .await
        .unwrap();
    assert_eq!(text, json!("Go"));
    let bbox = engine
        .query(&focus, &Locator::css("#ghost"), &ElementQuery::BoundingBox, WAIT)
        .await
        .unwrap();
    assert!(bbox.is_null());

    assert_eq!(engine.count(&focus, &Locator::css(".del")).await.unwrap(), 2);
    assert_eq!(engine.count(&focus, &Locator::parse("text=delete").unwrap()).await.unwrap(), 2);
}

#[tokio::test]
async fn test_wait_for_states() {
    let (engine, focus) = engine_on_shop().await;

    engine
        .wait_for(&focus, &Locator::css("#go"), WaitState::Visible, WAIT)
        .await
        .unwrap();
    engine
        .wait_for(&focus, &Locator::css("#ghost"), WaitState::Hidden, WAIT)
        .await
        .unwrap();
    engine
        .wait_for(&focus, &Locator::css("#nope"), WaitState::Detached, WAIT)
        .await
        .unwrap();

    let err = engine
        .wait_for(&focus, &Locator::css("#ghost"), WaitState::Visible, WAIT)
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Timeout 200ms exceeded while waiting for #ghost to be visible"
    );
}

#[tokio::test]
async fn test_page_model_feeds_the_snapshot() {
    let (engine, focus) = engine_on_shop().await;

    let raw = engine.accessibility_tree(&focus).await.unwrap();
    let roots = build_tree(&raw);
    let snapshot = take_snapshot(&roots, None, &SnapshotOptions::default());
    assert!(snapshot.tree.contains("- button \"Go\" [ref="));
    assert!(!snapshot.tree.contains("Ghost"));

    let sources = engine.dom_sources(&focus).await.unwrap();
    let body = &sources.document.children[0].children[0];
    assert_eq!(body.node_name, "BODY");
    assert_eq!(body.children.len(), 8);
    let ghost = engine.element(URL, "#ghost").unwrap();
    let record = sources
        .layout
        .iter()
        .find(|r| r.backend_node_id == ghost.backend_node_id)
        .unwrap();
    assert_eq!(record.display.as_deref(), Some("none"));

    let ids = engine
        .backend_node_ids(&focus, &Locator::css("#go"))
        .await
        .unwrap();
    assert_eq!(ids, vec![engine.element(URL, "#go").unwrap().backend_node_id]);
}

#[tokio::test]
async fn test_frames() {
    let engine = MockEngine::new();
    engine.set_document(
        URL,
        "Shop",
        vec![
            MockElement::new("#pay", "iframe", "Payment").hosts_frame("F2"),
            MockElement::new("#card", "textbox", "Card").in_frame("F2"),
        ],
    );
    engine.add_frame(
        URL,
        FrameInfo {
            id: "F2".to_string(),
            name: "pay".to_string(),
            url: "https://pay.test/".to_string(),
            parent_id: Some("P1".to_string()),
        },
    );
    engine.launch(&LaunchOptions::default()).await.unwrap();
    engine
        .navigate("P1", URL, WaitUntil::Load, WAIT)
        .await
        .unwrap();

    let main = Focus::page("P1");
    let frames = engine.frames("P1").await.unwrap();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].id, "P1");

    let frame = engine
        .frame_of_element(&main, &Locator::css("#pay"))
        .await
        .unwrap();
    assert_eq!(frame.id, "F2");

    // The card field only exists inside the frame.
    assert_eq!(engine.count(&main, &Locator::css("#card")).await.unwrap(), 0);
    let inner = Focus {
        page_id: "P1".to_string(),
        frame_id: Some("F2".to_string()),
    };
    engine
        .fill(&inner, &Locator::css("#card"), "4242", WAIT)
        .await
        .unwrap();

    let unknown = Focus {
        page_id: "P1".to_string(),
        frame_id: Some("F9".to_string()),
    };
    assert!(matches!(
        engine.html(&unknown).await,
        Err(EngineError::FrameNotFound(_))
    ));
}

#[tokio::test]
async fn test_injected_failures_and_events() {
    let (engine, focus) = engine_on_shop().await;
    engine.fail_next("click", "boom");

    let err = engine
        .click(&focus, &Locator::css("#go"), &ClickOptions::default(), WAIT)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "boom");
    engine
        .click(&focus, &Locator::css("#go"), &ClickOptions::default(), WAIT)
        .await
        .unwrap();

    engine.push_event(EngineEvent::Console {
        level: "log".to_string(),
        text: "hi".to_string(),
        timestamp: chrono::Utc::now(),
    });
    assert_eq!(engine.drain_events().len(), 1);
    assert!(engine.drain_events().is_empty());

    engine.set_eval_result("document.title", json!("Shop"));
    assert_eq!(
        engine.evaluate(&focus, "document.title").await.unwrap(),
        json!("Shop")
    );
    assert_eq!(engine.evaluate(&focus, "1 + 1").await.unwrap(), Value::Null);
}
