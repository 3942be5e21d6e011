//! Snapshot rendering and ref assignment.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::ax_tree::{AxNode, Tristate};
use crate::error::SnapshotError;
use crate::refs::{RefEntry, RefMap};
use crate::roles::{is_interactive, shows_value};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotOptions {
    /// Emit only interactive elements, as a flat list.
    pub interactive: bool,
    /// Drop nodes deeper than this (top-level nodes are depth 0).
    pub max_depth: Option<usize>,
    /// Keep nodes the engine reports as hidden.
    pub include_hidden: bool,
    /// Join all lines into a single ` | ` separated line.
    pub compact: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub tree: String,
    pub refs: RefMap,
}

/// Render `roots` and assign refs to interactive nodes.
///
/// With `scope`, only subtrees rooted at nodes whose backend id is in the
/// set are emitted and depth is measured from those nodes. Occurrence
/// counting for `nth` always covers the whole tree so that every ref
/// resolves against the full page.
pub fn take_snapshot(
    roots: &[AxNode],
    scope: Option<&HashSet<i64>>,
    options: &SnapshotOptions,
) -> Snapshot {
    let mut walker = Walker {
        options,
        scope,
        next_ref: 1,
        occurrences: HashMap::new(),
        refs: RefMap::new(),
        lines: Vec::new(),
    };

    let start_depth = if scope.is_some() { None } else { Some(0) };
    for root in roots {
        walker.walk(root, start_depth, false);
    }

    let Walker {
        occurrences,
        mut refs,
        lines,
        ..
    } = walker;

    for entry in refs.entries_mut() {
        let key = (entry.role.clone(), entry.name.clone().unwrap_or_default());
        if occurrences.get(&key).copied().unwrap_or(0) <= 1 {
            entry.nth = None;
        }
        // Unnamed nodes were counted among unnamed ones only, so the selector
        // must pin the empty name too.
        let name = entry.name.as_deref().unwrap_or_default();
        entry.selector = role_selector(&entry.role, Some(name), entry.nth);
    }

    let tree = if lines.is_empty() {
        if options.interactive {
            "(no interactive elements)".to_string()
        } else {
            "(empty page)".to_string()
        }
    } else if options.compact {
        lines
            .iter()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(" | ")
    } else {
        lines.join("\n")
    };

    debug!("Snapshot rendered {} lines, {} refs", lines.len(), refs.len());
    Snapshot { tree, refs }
}

struct Walker<'a> {
    options: &'a SnapshotOptions,
    scope: Option<&'a HashSet<i64>>,
    next_ref: usize,
    occurrences: HashMap<(String, String), usize>,
    refs: RefMap,
    lines: Vec<String>,
}

impl Walker<'_> {
    /// `depth` is `None` while outside the requested scope.
    fn walk(&mut self, node: &AxNode, depth: Option<usize>, hidden_ancestor: bool) {
        let depth = depth.or_else(|| self.enters_scope(node).then_some(0));
        let hidden = hidden_ancestor || node.hidden;
        let interactive = is_interactive(&node.role);

        let occurrence = interactive.then(|| {
            let count = self
                .occurrences
                .entry((node.role.clone(), node.name.clone()))
                .or_insert(0);
            let index = *count;
            *count += 1;
            index
        });

        let within_depth = depth.is_some_and(|d| self.options.max_depth.is_none_or(|max| d <= max));
        let emit = within_depth
            && (!hidden || self.options.include_hidden)
            && (!self.options.interactive || interactive);

        if emit {
            let reference = occurrence.map(|nth| {
                let id = format!("e{}", self.next_ref);
                self.next_ref += 1;
                let name = (!node.name.is_empty()).then(|| node.name.clone());
                self.refs.insert(
                    id.clone(),
                    RefEntry {
                        selector: String::new(),
                        role: node.role.clone(),
                        name,
                        nth: Some(nth),
                    },
                );
                (id, nth)
            });
            let indent = if self.options.interactive {
                0
            } else {
                depth.unwrap_or(0)
            };
            self.lines.push(format!(
                "{}{}",
                "  ".repeat(indent),
                render_line(node, hidden, reference.as_ref())
            ));
        }

        let child_depth = depth.map(|d| d + 1);
        for child in &node.children {
            self.walk(child, child_depth, hidden);
        }
    }

    fn enters_scope(&self, node: &AxNode) -> bool {
        match (self.scope, node.backend_node_id) {
            (Some(scope), Some(id)) => scope.contains(&id),
            _ => false,
        }
    }
}

fn render_line(node: &AxNode, hidden: bool, reference: Option<&(String, usize)>) -> String {
    if node.is_text() {
        return format!("- text: {}", node.name);
    }

    let mut line = format!("- {}", node.role);
    if !node.name.is_empty() {
        line.push_str(&format!(" \"{}\"", escape(&node.name)));
    }
    if let Some((id, nth)) = reference {
        line.push_str(&format!(" [ref={}]", id));
        if *nth > 0 {
            line.push_str(&format!(" [nth={}]", nth));
        }
    }

    let states = &node.states;
    if let Some(level) = states.level {
        line.push_str(&format!(" [level={}]", level));
    }
    match states.checked {
        Some(Tristate::True) => line.push_str(" [checked]"),
        Some(Tristate::Mixed) => line.push_str(" [checked=mixed]"),
        _ => {}
    }
    match states.pressed {
        Some(Tristate::True) => line.push_str(" [pressed]"),
        Some(Tristate::Mixed) => line.push_str(" [pressed=mixed]"),
        _ => {}
    }
    match states.expanded {
        Some(true) => line.push_str(" [expanded]"),
        Some(false) => line.push_str(" [expanded=false]"),
        None => {}
    }
    if states.selected {
        line.push_str(" [selected]");
    }
    if states.disabled {
        line.push_str(" [disabled]");
    }
    if states.required {
        line.push_str(" [required]");
    }
    if hidden {
        line.push_str(" [hidden]");
    }

    if let Some(value) = &node.value {
        if shows_value(&node.role) && *value != node.name {
            line.push_str(&format!(": {}", value));
        }
    }
    line
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Structural selector for a role/name pair, e.g.
/// `role=button[name="Delete"] >> nth=1`.
pub fn role_selector(role: &str, name: Option<&str>, nth: Option<usize>) -> String {
    let mut selector = format!("role={}", role);
    if let Some(name) = name {
        selector.push_str(&format!("[name=\"{}\"]", escape(name)));
    }
    if let Some(nth) = nth {
        selector.push_str(&format!(" >> nth={}", nth));
    }
    selector
}

/// Find the backend node id of the element with `role` (and `name`, when
/// given), counting occurrences in the same document order used by
/// [`take_snapshot`].
///
/// Without `nth` the match must be unique.
pub fn locate_role(
    roots: &[AxNode],
    role: &str,
    name: Option<&str>,
    nth: Option<usize>,
) -> Result<i64, SnapshotError> {
    let mut matches = Vec::new();
    for root in roots {
        collect_matches(root, role, name, &mut matches);
    }

    let query = role_selector(role, name, nth);
    let node = match nth {
        Some(index) => matches.get(index).copied(),
        None if matches.len() > 1 => {
            return Err(SnapshotError::Ambiguous {
                query,
                count: matches.len(),
            });
        }
        None => matches.first().copied(),
    };

    let node = node.ok_or_else(|| SnapshotError::NoMatch(query.clone()))?;
    node.backend_node_id
        .ok_or(SnapshotError::NoDomNode(query))
}

/// Number of elements with `role` (and `name`, when given).
pub fn count_role(roots: &[AxNode], role: &str, name: Option<&str>) -> usize {
    let mut matches = Vec::new();
    for root in roots {
        collect_matches(root, role, name, &mut matches);
    }
    matches.len()
}

fn collect_matches<'a>(node: &'a AxNode, role: &str, name: Option<&str>, out: &mut Vec<&'a AxNode>) {
    if node.role == role && name.is_none_or(|n| node.name == n) {
        out.push(node);
    }
    for child in &node.children {
        collect_matches(child, role, name, out);
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
