//! # agentbrowser snapshot
//!
//! Turns a live page's accessibility tree into a compact text outline where
//! every interactive element carries a short ref (`e1`, `e2`, ...). A caller
//! that only sees text can then address elements with `@e2` in later
//! commands.
//!
//! Refs are not stable across snapshots. Each snapshot produces a fresh
//! [`RefMap`] that replaces the previous one.
//!
//! When several elements share the same role and accessible name, each of
//! them records its zero-based occurrence index (`nth`) so the ref still
//! resolves to exactly one element.
//!
//! The [`fusion`] module joins three engine views of the page (raw DOM,
//! accessibility nodes and layout records) into one tree with computed
//! visibility.

mod ax_tree;
mod error;
pub mod fusion;
mod refs;
mod roles;
mod snapshot;

pub use ax_tree::{build_tree, AxNode, AxStates, RawAxNode, Tristate};
pub use error::SnapshotError;
pub use refs::{parse_ref, RefEntry, RefMap};
pub use roles::{is_interactive, INTERACTIVE_ROLES};
pub use snapshot::{count_role, locate_role, role_selector, take_snapshot, Snapshot, SnapshotOptions};
