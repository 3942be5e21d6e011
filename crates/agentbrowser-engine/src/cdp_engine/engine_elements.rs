//! Element resolution and actionability waits.
//!
//! CSS, XPath and text locators are resolved by the in-page helper script.
//! Role locators go through the accessibility tree and come back into the
//! page with `DOM.resolveNode`.

use std::time::{Duration, Instant};

use serde_json::{json, Value};
use tracing::trace;

use agentbrowser_snapshot::{build_tree, locate_role, AxNode, SnapshotError};

use crate::cdp::CdpError;
use crate::error::EngineError;
use crate::locator::{Locator, LocatorKind};
use crate::types::Focus;

use super::engine_core::{CdpEngine, FrameContext};
use super::layout::raw_ax_nodes;

const PAGE_SCRIPT: &str = include_str!("page_script.js");
const RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// Expression that calls a helper method with JSON arguments.
pub(super) fn helper_call(method: &str, args: &[Value]) -> String {
    let args = args
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    format!("{}.{}({})", PAGE_SCRIPT.trim_end(), method, args)
}

/// `Runtime.callFunctionOn` declaration passing `this` as the helper's
/// first argument.
pub(super) fn element_function(method: &str) -> String {
    format!(
        "function(...args) {{ return {}.{}(this, ...args); }}",
        PAGE_SCRIPT.trim_end(),
        method
    )
}

/// What an element must be before an operation proceeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Check {
    Attached,
    Visible,
    Pointer { needs_enabled: bool },
    Editable,
}

impl Check {
    fn describe(self) -> &'static str {
        match self {
            Check::Attached => "attached",
            Check::Visible => "visible",
            Check::Pointer { .. } => "actionable",
            Check::Editable => "editable",
        }
    }

    fn helper(self) -> (&'static str, Vec<Value>) {
        match self {
            Check::Attached => ("attached", Vec::new()),
            Check::Visible => ("visible", Vec::new()),
            Check::Pointer { needs_enabled } => ("actionable", vec![json!(needs_enabled)]),
            Check::Editable => ("editable", Vec::new()),
        }
    }
}

/// A resolved element that passed its check.
pub(super) struct Element {
    pub(super) object_id: String,
    /// Click point in top-level viewport coordinates, for pointer checks.
    pub(super) point: Option<(f64, f64)>,
}

impl Element {
    pub(super) fn point(&self) -> Result<(f64, f64), EngineError> {
        self.point
            .ok_or_else(|| EngineError::Other("element has no click point".to_string()))
    }
}

pub(super) fn timeout_ms(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}

fn snapshot_error(error: SnapshotError, locator: &Locator) -> EngineError {
    match error {
        SnapshotError::Ambiguous { count, .. } => EngineError::StrictMode {
            selector: locator.to_string(),
            count,
        },
        SnapshotError::NoMatch(_) | SnapshotError::NoDomNode(_) => {
            EngineError::ElementNotFound(locator.to_string())
        }
    }
}

impl CdpEngine {
    pub(super) async fn ax_roots(&self, ctx: &FrameContext) -> Result<Vec<AxNode>, EngineError> {
        let nodes = ctx
            .page
            .get_accessibility_tree(ctx.frame_id.as_deref())
            .await?;
        Ok(build_tree(&raw_ax_nodes(nodes)))
    }

    /// Remote object id of the single element `locator` designates.
    pub(super) async fn resolve(
        &self,
        ctx: &FrameContext,
        locator: &Locator,
    ) -> Result<String, EngineError> {
        if let LocatorKind::Role { role, name } = &locator.kind {
            let roots = self.ax_roots(ctx).await?;
            let backend_node_id = locate_role(&roots, role, name.as_deref(), locator.nth)
                .map_err(|e| snapshot_error(e, locator))?;
            let object = ctx
                .page
                .resolve_backend_node(backend_node_id)
                .await
                .map_err(|_| EngineError::Detached(locator.to_string()))?;
            return object
                .object_id
                .ok_or_else(|| EngineError::Detached(locator.to_string()));
        }

        let (kind, value) = locator.script_args();
        let expression = helper_call("resolve", &[json!(kind), json!(value), json!(locator.nth)]);
        let object = ctx
            .page
            .evaluate_handle(&expression, ctx.context_id)
            .await
            .map_err(|e| match e {
                CdpError::JavaScript(msg) => {
                    EngineError::InvalidSelector(format!("{}: {}", locator, msg))
                }
                other => other.into(),
            })?;

        match (object.object_type.as_str(), object.object_id) {
            ("object", Some(object_id)) => Ok(object_id),
            _ => {
                let count = object
                    .value
                    .as_ref()
                    .and_then(Value::as_u64)
                    .and_then(|n| usize::try_from(n).ok())
                    .unwrap_or(0);
                if count == 0 {
                    Err(EngineError::ElementNotFound(locator.to_string()))
                } else {
                    Err(EngineError::StrictMode {
                        selector: locator.to_string(),
                        count,
                    })
                }
            }
        }
    }

    /// Run a helper against the element behind `object_id`.
    pub(super) async fn call_helper(
        &self,
        ctx: &FrameContext,
        object_id: &str,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, EngineError> {
        Ok(ctx
            .page
            .call_function_on(object_id, &element_function(method), args)
            .await?)
    }

    async fn check_once(
        &self,
        ctx: &FrameContext,
        locator: &Locator,
        check: Check,
    ) -> Result<Element, EngineError> {
        let object_id = self.resolve(ctx, locator).await?;
        let (method, args) = check.helper();
        let state = match self.call_helper(ctx, &object_id, method, args).await {
            Ok(state) => state,
            // The object's context went away under us: a navigation or re-render.
            Err(EngineError::Cdp(CdpError::Protocol { .. })) => {
                return Err(EngineError::Detached(locator.to_string()));
            }
            Err(e) => return Err(e),
        };

        let selector = locator.to_string();
        match state["state"].as_str().unwrap_or_default() {
            "ok" => Ok(Element {
                object_id,
                point: state["x"].as_f64().zip(state["y"].as_f64()),
            }),
            "detached" => Err(EngineError::Detached(selector)),
            "hidden" => Err(EngineError::NotVisible(selector)),
            "covered" => Err(EngineError::Intercepted {
                selector,
                by: state["by"]
                    .as_str()
                    .unwrap_or("another element")
                    .to_string(),
            }),
            other => Err(EngineError::NotActionable {
                selector,
                reason: format!("element is {}", other),
            }),
        }
    }

    /// Retry `check` until it passes or `timeout` runs out.
    pub(super) async fn wait_element(
        &self,
        focus: &Focus,
        locator: &Locator,
        check: Check,
        timeout: Duration,
    ) -> Result<(FrameContext, Element), EngineError> {
        let deadline = Instant::now() + timeout;
        let mut last = None;

        loop {
            let ctx = self.context(focus).await?;
            match self.check_once(&ctx, locator, check).await {
                Ok(element) => return Ok((ctx, element)),
                Err(e) if e.is_retryable() => {
                    trace!("{} not {} yet: {}", locator, check.describe(), e);
                    last = Some(e.to_string());
                }
                Err(e) => return Err(e),
            }

            if Instant::now() >= deadline {
                return Err(EngineError::Timeout {
                    ms: timeout_ms(timeout),
                    waiting_for: format!("{} to be {}", locator, check.describe()),
                    reason: last,
                });
            }
            tokio::time::sleep(RETRY_INTERVAL).await;
        }
    }

    /// Match count and visibility of the `nth` (default first) match.
    pub(super) async fn probe(
        &self,
        ctx: &FrameContext,
        locator: &Locator,
    ) -> Result<(usize, bool), EngineError> {
        if let LocatorKind::Role { role, name } = &locator.kind {
            let roots = self.ax_roots(ctx).await?;
            let count = agentbrowser_snapshot::count_role(&roots, role, name.as_deref());
            let index = locator.nth.unwrap_or(0);
            if index >= count {
                return Ok((count, false));
            }
            let nth = Locator {
                nth: Some(index),
                ..locator.clone()
            };
            let visible = match self.resolve(ctx, &nth).await {
                Ok(object_id) => self
                    .call_helper(ctx, &object_id, "read", vec![json!("visible")])
                    .await?
                    .as_bool()
                    .unwrap_or(false),
                Err(e) if e.is_retryable() => false,
                Err(e) => return Err(e),
            };
            return Ok((count, visible));
        }

        let (kind, value) = locator.script_args();
        let result = ctx
            .page
            .evaluate(
                &helper_call("probe", &[json!(kind), json!(value), json!(locator.nth)]),
                ctx.context_id,
            )
            .await
            .map_err(|e| match e {
                CdpError::JavaScript(msg) => {
                    EngineError::InvalidSelector(format!("{}: {}", locator, msg))
                }
                other => other.into(),
            })?;
        let count = result["count"]
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0);
        Ok((count, result["visible"].as_bool().unwrap_or(false)))
    }
}
