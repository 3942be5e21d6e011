//! Snapshots, DOM fusion, capture, storage and logs.

use std::collections::HashSet;
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{json, Value};
use tracing::debug;

use agentbrowser_engine::{Focus, ImageFormat, ScreenshotOptions};
use agentbrowser_snapshot::fusion::{fuse, FusionOptions};
use agentbrowser_snapshot::{build_tree, take_snapshot, SnapshotOptions};

use crate::error::DispatchError;
use crate::state::SessionStore;

use super::{resolve_target, Dispatcher};

/// Write `bytes` to `path` and report it, or return them inline as base64.
async fn deliver(path: Option<&str>, bytes: Vec<u8>) -> Result<Value, DispatchError> {
    match path {
        Some(path) => {
            let target = Path::new(path);
            if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|source| DispatchError::Write {
                        path: parent.to_path_buf(),
                        source,
                    })?;
            }
            tokio::fs::write(target, &bytes)
                .await
                .map_err(|source| DispatchError::Write {
                    path: target.to_path_buf(),
                    source,
                })?;
            debug!("Wrote {} bytes to {}", bytes.len(), path);
            Ok(json!({"path": path}))
        }
        None => Ok(json!({"data": BASE64.encode(bytes)})),
    }
}

impl Dispatcher {
    /// Backend ids under `selector`, for scoping a snapshot or DOM dump.
    async fn scope_of(
        &self,
        store: &SessionStore,
        focus: &Focus,
        selector: Option<&str>,
    ) -> Result<Option<HashSet<i64>>, DispatchError> {
        let Some(selector) = selector else {
            return Ok(None);
        };
        let locator = resolve_target(store, selector)?;
        let ids = self
            .engine
            .backend_node_ids(focus, &locator)
            .await
            .map_err(|e| DispatchError::element(selector, e))?;
        Ok(Some(ids.into_iter().collect()))
    }

    pub(super) async fn snapshot(
        &self,
        store: &SessionStore,
        selector: Option<&str>,
        options: &SnapshotOptions,
    ) -> Result<Value, DispatchError> {
        let focus = self.focus(store)?;
        let scope = self.scope_of(store, &focus, selector).await?;
        let raw = self.engine.accessibility_tree(&focus).await?;
        let roots = build_tree(&raw);

        let snapshot = take_snapshot(&roots, scope.as_ref(), options);
        let refs = serde_json::to_value(&snapshot.refs)?;
        debug!("Snapshot assigned {} refs", snapshot.refs.len());
        store.replace_refs(snapshot.refs);

        Ok(json!({
            "tree": snapshot.tree,
            "refs": refs,
            "url": self.engine.url(&focus.page_id).await?,
            "title": self.engine.title(&focus.page_id).await?,
        }))
    }

    pub(super) async fn get_dom(
        &self,
        store: &SessionStore,
        selector: Option<&str>,
        max_depth: Option<usize>,
        include_hidden: bool,
    ) -> Result<Value, DispatchError> {
        let focus = self.focus(store)?;
        let scope = self.scope_of(store, &focus, selector).await?;
        let sources = self.engine.dom_sources(&focus).await?;
        let options = FusionOptions {
            max_depth,
            include_hidden,
            scope,
        };
        let dom = fuse(&sources, &options);

        Ok(json!({
            "dom": dom,
            "url": self.engine.url(&focus.page_id).await?,
            "title": self.engine.title(&focus.page_id).await?,
        }))
    }

    pub(super) async fn screenshot(
        &self,
        store: &SessionStore,
        path: Option<&str>,
        full_page: bool,
        selector: Option<&str>,
        format: ImageFormat,
        quality: Option<u32>,
    ) -> Result<Value, DispatchError> {
        let focus = self.focus(store)?;
        let element = selector
            .map(|selector| resolve_target(store, selector))
            .transpose()?;
        let options = ScreenshotOptions {
            format,
            // Only JPEG honours a quality setting.
            quality: quality.filter(|_| format == ImageFormat::Jpeg),
            full_page,
            element,
        };
        let bytes = match selector {
            Some(selector) => self
                .engine
                .screenshot(&focus, &options)
                .await
                .map_err(|e| DispatchError::element(selector, e))?,
            None => self.engine.screenshot(&focus, &options).await?,
        };
        deliver(path, bytes).await
    }

    pub(super) async fn pdf(
        &self,
        store: &SessionStore,
        path: Option<&str>,
    ) -> Result<Value, DispatchError> {
        let page = self.page(store)?;
        let bytes = self.engine.pdf(&page).await?;
        deliver(path, bytes).await
    }

    pub(super) async fn evaluate(
        &self,
        store: &SessionStore,
        script: &str,
    ) -> Result<Value, DispatchError> {
        let focus = self.focus(store)?;
        let result = self.engine.evaluate(&focus, script).await?;
        Ok(json!({"result": result}))
    }

    // Storage

    pub(super) async fn get_cookies(&self, store: &SessionStore) -> Result<Value, DispatchError> {
        let page = self.page(store)?;
        Ok(json!({"cookies": self.engine.cookies(&page).await?}))
    }

    pub(super) async fn clear_cookies(&self, store: &SessionStore) -> Result<Value, DispatchError> {
        let page = self.page(store)?;
        self.engine.clear_cookies(&page).await?;
        Ok(json!({"cleared": true}))
    }

    pub(super) async fn get_local_storage(
        &self,
        store: &SessionStore,
        key: Option<&str>,
    ) -> Result<Value, DispatchError> {
        let focus = self.focus(store)?;
        let mut storage = self.engine.local_storage(&focus).await?;
        match key {
            Some(key) => Ok(json!({"value": storage.remove(key)})),
            None => Ok(json!({"storage": storage})),
        }
    }

    pub(super) async fn clear_local_storage(
        &self,
        store: &SessionStore,
    ) -> Result<Value, DispatchError> {
        let focus = self.focus(store)?;
        self.engine.clear_local_storage(&focus).await?;
        Ok(json!({"cleared": true}))
    }

    // Logs

    pub(super) fn console(&self, store: &SessionStore, clear: bool) -> Value {
        json!({"messages": store.console(clear)})
    }

    pub(super) fn errors(&self, store: &SessionStore, clear: bool) -> Value {
        json!({"errors": store.errors(clear)})
    }

    pub(super) fn requests(&self, store: &SessionStore, filter: Option<&str>, clear: bool) -> Value {
        json!({"requests": store.requests(filter, clear)})
    }
}
