use super::*;
use serde_json::json;

#[test]
fn test_command_flattens_action_fields() {
    let cmd = Command::new(
        "1",
        Action::Navigate {
            url: "https://example.com".to_string(),
            wait_until: None,
            timeout: Some(5000),
        },
    );
    let value = serde_json::to_value(&cmd).unwrap();
    assert_eq!(
        value,
        json!({"id": "1", "action": "navigate", "url": "https://example.com", "timeout": 5000})
    );
}

#[test]
fn test_unit_action_serializes_tag_only() {
    let cmd = Command::new("7", Action::GetUrl);
    let value = serde_json::to_value(&cmd).unwrap();
    assert_eq!(value, json!({"id": "7", "action": "getUrl"}));
}

#[test]
fn test_camel_case_field_names() {
    let cmd = Command::new(
        "2",
        Action::Snapshot {
            selector: None,
            interactive: Some(true),
            max_depth: Some(3),
            compact: None,
            include_hidden: Some(false),
        },
    );
    let value = serde_json::to_value(&cmd).unwrap();
    assert_eq!(value["maxDepth"], 3);
    assert_eq!(value["includeHidden"], false);
    assert!(value.get("compact").is_none());
}

#[test]
fn test_action_name_matches_wire_tag() {
    let actions = vec![
        Action::Close,
        Action::Dblclick {
            selector: "#a".to_string(),
            timeout: None,
        },
        Action::MouseClick {
            x: 1.0,
            y: 2.0,
            button: Some(MouseButton::Right),
            click_count: None,
        },
        Action::GetDom {
            selector: None,
            max_depth: None,
            include_hidden: None,
        },
        Action::SwitchToMainFrame,
        Action::WaitForSelector {
            selector: "#a".to_string(),
            state: Some(WaitState::Hidden),
            timeout: None,
        },
        Action::SetViewport {
            width: 800,
            height: 600,
        },
        Action::Requests {
            filter: Some("api".to_string()),
            clear: None,
        },
    ];

    for action in actions {
        let value = serde_json::to_value(Command::new("x", action.clone())).unwrap();
        assert_eq!(value["action"], action.name(), "tag mismatch for {:?}", action);
    }
}

#[test]
fn test_lifecycle_actions() {
    assert!(Action::Close.is_lifecycle());
    assert!(
        Action::Launch {
            headless: None,
            executable_path: None,
            cdp_url: None,
            viewport: None,
            args: None,
        }
        .is_lifecycle()
    );
    assert!(!Action::GetTitle.is_lifecycle());
}

#[test]
fn test_log_query_actions() {
    assert!(Action::Console { clear: None }.is_log_query());
    assert!(Action::Errors { clear: Some(true) }.is_log_query());
    assert!(!Action::GetCookies.is_log_query());
}

#[test]
fn test_wait_until_wire_values() {
    assert_eq!(serde_json::to_value(WaitUntil::Load).unwrap(), "load");
    assert_eq!(
        serde_json::to_value(WaitUntil::DomContentLoaded).unwrap(),
        "domcontentloaded"
    );
    assert_eq!(serde_json::to_value(WaitUntil::NoWait).unwrap(), "none");
}

#[test]
fn test_enum_defaults() {
    assert_eq!(MouseButton::default(), MouseButton::Left);
    assert_eq!(ScrollDirection::default(), ScrollDirection::Down);
    assert_eq!(WaitState::default(), WaitState::Visible);
    assert_eq!(ImageFormat::default(), ImageFormat::Png);
    assert_eq!(ImageFormat::Jpeg.extension(), "jpeg");
}
