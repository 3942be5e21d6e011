use super::*;
use crate::ax_tree::AxStates;

fn node(role: &str, name: &str, backend: i64, children: Vec<AxNode>) -> AxNode {
    AxNode {
        role: role.to_string(),
        name: name.to_string(),
        backend_node_id: Some(backend),
        children,
        ..AxNode::default()
    }
}

fn leaf(role: &str, name: &str, backend: i64) -> AxNode {
    node(role, name, backend, Vec::new())
}

fn sample_page() -> Vec<AxNode> {
    vec![
        node("heading", "Inbox", 1, Vec::new()),
        node(
            "list",
            "",
            2,
            vec![
                node("listitem", "", 3, vec![leaf("button", "Delete", 4)]),
                node("listitem", "", 5, vec![leaf("button", "Delete", 6)]),
                node("listitem", "", 7, vec![leaf("button", "Delete", 8)]),
            ],
        ),
        leaf("link", "Settings", 9),
    ]
}

#[test]
fn test_full_snapshot_rendering() {
    let snapshot = take_snapshot(&sample_page(), None, &SnapshotOptions::default());
    let expected = [
        "- heading \"Inbox\"",
        "- list",
        "  - listitem",
        "    - button \"Delete\" [ref=e1]",
        "  - listitem",
        "    - button \"Delete\" [ref=e2] [nth=1]",
        "  - listitem",
        "    - button \"Delete\" [ref=e3] [nth=2]",
        "- link \"Settings\" [ref=e4]",
    ]
    .join("\n");
    assert_eq!(snapshot.tree, expected);
}

#[test]
fn test_duplicate_buttons_get_sequential_nth() {
    let snapshot = take_snapshot(&sample_page(), None, &SnapshotOptions::default());
    let nths: Vec<Option<usize>> = ["e1", "e2", "e3"]
        .iter()
        .map(|id| snapshot.refs.get(id).unwrap().nth)
        .collect();
    assert_eq!(nths, vec![Some(0), Some(1), Some(2)]);
    assert!(!snapshot.tree.contains("[nth=0]"));
    assert!(snapshot.tree.contains("[nth=1]"));
    assert!(snapshot.tree.contains("[nth=2]"));
}

#[test]
fn test_unique_pair_has_no_nth() {
    let snapshot = take_snapshot(&sample_page(), None, &SnapshotOptions::default());
    let settings = snapshot.refs.get("e4").unwrap();
    assert_eq!(settings.nth, None);
    assert_eq!(settings.selector, "role=link[name=\"Settings\"]");
    assert_eq!(settings.name.as_deref(), Some("Settings"));
}

#[test]
fn test_duplicate_selector_carries_nth() {
    let snapshot = take_snapshot(&sample_page(), None, &SnapshotOptions::default());
    assert_eq!(
        snapshot.refs.get("e2").unwrap().selector,
        "role=button[name=\"Delete\"] >> nth=1"
    );
}

#[test]
fn test_ref_ids_are_unique_and_sequential() {
    let snapshot = take_snapshot(&sample_page(), None, &SnapshotOptions::default());
    let ids: Vec<&str> = snapshot.refs.iter().map(|(id, _)| id).collect();
    assert_eq!(ids, vec!["e1", "e2", "e3", "e4"]);
}

#[test]
fn test_interactive_mode_is_flat() {
    let options = SnapshotOptions {
        interactive: true,
        ..SnapshotOptions::default()
    };
    let snapshot = take_snapshot(&sample_page(), None, &options);
    let lines: Vec<&str> = snapshot.tree.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines.iter().all(|l| l.starts_with("- ")));
    assert!(!snapshot.tree.contains("heading"));
}

#[test]
fn test_interactive_mode_without_elements() {
    let options = SnapshotOptions {
        interactive: true,
        ..SnapshotOptions::default()
    };
    let page = vec![leaf("heading", "Nothing here", 1)];
    let snapshot = take_snapshot(&page, None, &options);
    assert_eq!(snapshot.tree, "(no interactive elements)");
    assert!(snapshot.refs.is_empty());
}

#[test]
fn test_max_depth_truncates_but_keeps_global_nth() {
    let options = SnapshotOptions {
        max_depth: Some(1),
        ..SnapshotOptions::default()
    };
    let snapshot = take_snapshot(&sample_page(), None, &options);
    assert!(!snapshot.tree.contains("button"));
    assert_eq!(snapshot.refs.len(), 1);
    assert_eq!(snapshot.refs.get("e1").unwrap().role, "link");
}

#[test]
fn test_compact_joins_lines() {
    let options = SnapshotOptions {
        interactive: true,
        compact: true,
        ..SnapshotOptions::default()
    };
    let snapshot = take_snapshot(&sample_page(), None, &options);
    assert!(!snapshot.tree.contains('\n'));
    assert!(snapshot.tree.contains(" | "));
    assert!(snapshot.tree.starts_with("- button \"Delete\" [ref=e1]"));
}

#[test]
fn test_hidden_nodes_skipped_unless_requested() {
    let mut hidden = leaf("button", "Secret", 10);
    hidden.hidden = true;
    let page = vec![leaf("button", "Visible", 11), hidden];

    let snapshot = take_snapshot(&page, None, &SnapshotOptions::default());
    assert!(!snapshot.tree.contains("Secret"));
    assert_eq!(snapshot.refs.len(), 1);

    let options = SnapshotOptions {
        include_hidden: true,
        ..SnapshotOptions::default()
    };
    let snapshot = take_snapshot(&page, None, &options);
    assert!(snapshot.tree.contains("- button \"Secret\" [ref=e2] [hidden]"));
}

#[test]
fn test_scope_limits_output_and_resets_depth() {
    let scope: HashSet<i64> = [5].into_iter().collect();
    let snapshot = take_snapshot(&sample_page(), Some(&scope), &SnapshotOptions::default());
    let expected = "- listitem\n  - button \"Delete\" [ref=e1] [nth=1]";
    assert_eq!(snapshot.tree, expected);
    assert_eq!(snapshot.refs.get("e1").unwrap().nth, Some(1));
}

#[test]
fn test_states_and_values_render() {
    let mut checkbox = leaf("checkbox", "Remember me", 1);
    checkbox.states = AxStates {
        checked: Some(Tristate::True),
        disabled: true,
        ..AxStates::default()
    };
    let mut textbox = leaf("textbox", "Email", 2);
    textbox.value = Some("a@b.c".to_string());
    let mut heading = leaf("heading", "Title", 3);
    heading.states.level = Some(2);
    let text = AxNode {
        role: "text".to_string(),
        name: "Plain words".to_string(),
        ..AxNode::default()
    };

    let snapshot = take_snapshot(
        &[heading, checkbox, textbox, text],
        None,
        &SnapshotOptions::default(),
    );
    let lines: Vec<&str> = snapshot.tree.lines().collect();
    assert_eq!(lines[0], "- heading \"Title\" [level=2]");
    assert_eq!(lines[1], "- checkbox \"Remember me\" [ref=e1] [checked] [disabled]");
    assert_eq!(lines[2], "- textbox \"Email\" [ref=e2]: a@b.c");
    assert_eq!(lines[3], "- text: Plain words");
}

#[test]
fn test_quotes_in_names_are_escaped() {
    let page = vec![leaf("button", "Say \"hi\"", 1)];
    let snapshot = take_snapshot(&page, None, &SnapshotOptions::default());
    assert!(snapshot.tree.contains(r#"- button "Say \"hi\"" [ref=e1]"#));
    assert_eq!(
        snapshot.refs.get("e1").unwrap().selector,
        r#"role=button[name="Say \"hi\""]"#
    );
}

#[test]
fn test_fresh_snapshot_restarts_numbering() {
    let first = take_snapshot(&sample_page(), None, &SnapshotOptions::default());
    let second = take_snapshot(&[leaf("button", "Only", 1)], None, &SnapshotOptions::default());
    assert_eq!(first.refs.len(), 4);
    assert_eq!(second.refs.len(), 1);
    assert_eq!(second.refs.get("e1").unwrap().name.as_deref(), Some("Only"));
    assert!(second.refs.get("e4").is_none());
}

#[test]
fn test_empty_page() {
    let snapshot = take_snapshot(&[], None, &SnapshotOptions::default());
    assert_eq!(snapshot.tree, "(empty page)");
}

#[test]
fn test_locate_role_with_nth() {
    let page = sample_page();
    assert_eq!(locate_role(&page, "button", Some("Delete"), Some(0)), Ok(4));
    assert_eq!(locate_role(&page, "button", Some("Delete"), Some(2)), Ok(8));
    assert_eq!(locate_role(&page, "link", Some("Settings"), None), Ok(9));
}

#[test]
fn test_locate_role_ambiguous_without_nth() {
    let err = locate_role(&sample_page(), "button", Some("Delete"), None).unwrap_err();
    assert_eq!(
        err,
        SnapshotError::Ambiguous {
            query: "role=button[name=\"Delete\"]".to_string(),
            count: 3
        }
    );
    assert!(err.to_string().contains("resolved to 3 elements"));
}

#[test]
fn test_locate_role_missing() {
    let err = locate_role(&sample_page(), "button", Some("Archive"), None).unwrap_err();
    assert!(matches!(err, SnapshotError::NoMatch(_)));
    let err = locate_role(&sample_page(), "button", Some("Delete"), Some(3)).unwrap_err();
    assert!(matches!(err, SnapshotError::NoMatch(_)));
}

#[test]
fn test_locate_agrees_with_snapshot_nth() {
    let page = sample_page();
    let snapshot = take_snapshot(&page, None, &SnapshotOptions::default());
    for (_, entry) in snapshot.refs.iter() {
        let located = locate_role(&page, &entry.role, entry.name.as_deref(), entry.nth);
        assert!(located.is_ok(), "{:?}", entry);
    }
}

#[test]
fn test_count_role() {
    let page = sample_page();
    assert_eq!(count_role(&page, "button", Some("Delete")), 3);
    assert_eq!(count_role(&page, "button", None), 3);
    assert_eq!(count_role(&page, "link", Some("Home")), 0);
}

#[test]
fn test_unnamed_selectors_pin_empty_name() {
    let page = vec![
        leaf("button", "OK", 1),
        leaf("button", "", 2),
        leaf("button", "", 3),
        leaf("checkbox", "", 4),
    ];
    let snapshot = take_snapshot(&page, None, &SnapshotOptions::default());
    let selector = |id: &str| snapshot.refs.get(id).unwrap().selector.clone();

    assert_eq!(selector("e2"), r#"role=button[name=""] >> nth=0"#);
    assert_eq!(selector("e3"), r#"role=button[name=""] >> nth=1"#);
    assert_eq!(selector("e4"), r#"role=checkbox[name=""]"#);
    assert_eq!(snapshot.refs.get("e4").unwrap().name, None);
}
