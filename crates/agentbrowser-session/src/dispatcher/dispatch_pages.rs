//! Lifecycle, navigation, pages and frames.

use std::time::Duration;

use serde_json::{json, Value};
use tracing::info;

use agentbrowser_engine::{EngineError, FrameInfo, LaunchOptions, WaitUntil};

use crate::error::DispatchError;
use crate::state::SessionStore;

use super::{resolve_target, Dispatcher, HistoryStep};

fn frame_json(frame: &FrameInfo) -> Value {
    json!({"id": frame.id, "name": frame.name, "url": frame.url})
}

impl Dispatcher {
    /// Start the browser and focus its first page.
    pub(super) async fn launch_with(
        &self,
        store: &SessionStore,
        options: &LaunchOptions,
    ) -> Result<(), DispatchError> {
        let fresh = !self.engine.is_running();
        self.engine.launch(options).await?;
        let pages = self.engine.pages().await?;
        if fresh {
            // Focus and refs of a lost browser point at nothing now.
            store.mark_closed();
        }
        store.mark_launched(pages.first().map(|p| p.id.clone()));
        info!("Browser ready with {} page(s)", pages.len());
        Ok(())
    }

    pub(super) async fn launch(
        &self,
        store: &SessionStore,
        options: &LaunchOptions,
    ) -> Result<Value, DispatchError> {
        self.launch_with(store, options).await?;
        Ok(json!({"launched": true}))
    }

    pub(super) async fn close(&self, store: &SessionStore) -> Result<Value, DispatchError> {
        self.engine.close().await?;
        store.mark_closed();
        info!("Browser closed");
        Ok(json!({"closed": true}))
    }

    pub(super) async fn navigate(
        &self,
        store: &SessionStore,
        url: &str,
        wait_until: WaitUntil,
        timeout: Option<u64>,
    ) -> Result<Value, DispatchError> {
        let page = self.page(store)?;
        let outcome = self
            .engine
            .navigate(&page, url, wait_until, self.navigation_timeout(timeout))
            .await?;
        // The old document's frames are gone.
        store.set_frame(None);
        Ok(json!({"url": outcome.url, "status": outcome.status}))
    }

    pub(super) async fn history(
        &self,
        store: &SessionStore,
        step: HistoryStep,
    ) -> Result<Value, DispatchError> {
        let page = self.page(store)?;
        let timeout = self.config.navigation_timeout;
        match step {
            HistoryStep::Back => self.engine.go_back(&page, timeout).await?,
            HistoryStep::Forward => self.engine.go_forward(&page, timeout).await?,
            HistoryStep::Reload => self.engine.reload(&page, timeout).await?,
        }
        store.set_frame(None);
        Ok(json!({"url": self.engine.url(&page).await?}))
    }

    pub(super) async fn wait_for_load(
        &self,
        store: &SessionStore,
        timeout: Option<u64>,
    ) -> Result<Value, DispatchError> {
        let page = self.page(store)?;
        self.engine
            .wait_for_load(&page, self.navigation_timeout(timeout))
            .await?;
        Ok(json!({"loaded": true}))
    }

    pub(super) async fn wait(&self, ms: u64) -> Result<Value, DispatchError> {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(json!({"waited": ms}))
    }

    pub(super) async fn get_title(&self, store: &SessionStore) -> Result<Value, DispatchError> {
        let page = self.page(store)?;
        Ok(json!({"title": self.engine.title(&page).await?}))
    }

    pub(super) async fn get_url(&self, store: &SessionStore) -> Result<Value, DispatchError> {
        let page = self.page(store)?;
        Ok(json!({"url": self.engine.url(&page).await?}))
    }

    // Frames

    pub(super) async fn get_frames(&self, store: &SessionStore) -> Result<Value, DispatchError> {
        let page = self.page(store)?;
        let frames = self.engine.frames(&page).await?;
        Ok(json!({"frames": frames.iter().map(frame_json).collect::<Vec<_>>()}))
    }

    pub(super) async fn switch_to_frame(
        &self,
        store: &SessionStore,
        selector: Option<&str>,
        name: Option<&str>,
        url: Option<&str>,
    ) -> Result<Value, DispatchError> {
        let focus = self.focus(store)?;

        let frame = match (selector, name, url) {
            (Some(selector), None, None) => {
                let locator = resolve_target(store, selector)?;
                self.engine
                    .frame_of_element(&focus, &locator)
                    .await
                    .map_err(|e| DispatchError::element(selector, e))?
            }
            (None, Some(_), None) | (None, None, Some(_)) => {
                let frames = self.engine.frames(&focus.page_id).await?;
                frames
                    .into_iter()
                    .filter(|f| f.parent_id.is_some())
                    .find(|f| match (name, url) {
                        (Some(name), _) => f.name == name,
                        (_, Some(url)) => f.url.contains(url),
                        _ => false,
                    })
                    .ok_or_else(|| {
                        let wanted = name.or(url).unwrap_or_default();
                        DispatchError::Engine(EngineError::FrameNotFound(
                            wanted.to_string(),
                        ))
                    })?
            }
            _ => {
                return Err(DispatchError::InvalidArgument(
                    "switchToFrame needs exactly one of selector, name or url".to_string(),
                ));
            }
        };

        store.set_frame(Some(frame.id.clone()));
        Ok(json!({"switched": true, "frame": frame_json(&frame)}))
    }

    pub(super) fn switch_to_main_frame(&self, store: &SessionStore) -> Result<Value, DispatchError> {
        self.page(store)?;
        store.set_frame(None);
        Ok(json!({"switched": true}))
    }

    // Pages

    pub(super) async fn get_pages(&self, store: &SessionStore) -> Result<Value, DispatchError> {
        let active = store.active_page();
        let pages = self.engine.pages().await?;
        let pages: Vec<Value> = pages
            .iter()
            .enumerate()
            .map(|(index, page)| {
                json!({
                    "index": index,
                    "id": page.id,
                    "url": page.url,
                    "title": page.title,
                    "active": active.as_deref() == Some(page.id.as_str()),
                })
            })
            .collect();
        Ok(json!({"pages": pages}))
    }

    pub(super) async fn new_page(
        &self,
        store: &SessionStore,
        url: Option<&str>,
    ) -> Result<Value, DispatchError> {
        let page = self.engine.new_page(url).await?;
        let pages = self.engine.pages().await?;
        let index = pages.iter().position(|p| p.id == page.id).unwrap_or(pages.len());
        store.set_active_page(Some(page.id));
        Ok(json!({"created": true, "index": index}))
    }

    pub(super) async fn switch_page(
        &self,
        store: &SessionStore,
        index: Option<usize>,
        url: Option<&str>,
    ) -> Result<Value, DispatchError> {
        let pages = self.engine.pages().await?;
        let found = match (index, url) {
            (Some(index), None) => pages.get(index).map(|p| (index, p)),
            (None, Some(url)) => pages.iter().enumerate().find(|(_, p)| p.url.contains(url)),
            _ => {
                return Err(DispatchError::InvalidArgument(
                    "switchPage needs exactly one of index or url".to_string(),
                ));
            }
        };
        let (index, page) = found.ok_or_else(|| {
            let wanted = index.map_or_else(|| url.unwrap_or_default().to_string(), |i| i.to_string());
            DispatchError::Engine(EngineError::PageNotFound(wanted))
        })?;

        self.engine.activate_page(&page.id).await?;
        store.set_active_page(Some(page.id.clone()));
        Ok(json!({"switched": true, "index": index, "url": page.url}))
    }

    pub(super) async fn close_page(
        &self,
        store: &SessionStore,
        index: Option<usize>,
    ) -> Result<Value, DispatchError> {
        let pages = self.engine.pages().await?;
        let target = match index {
            Some(index) => pages.get(index).map(|p| p.id.clone()).ok_or_else(|| {
                DispatchError::Engine(EngineError::PageNotFound(
                    index.to_string(),
                ))
            })?,
            None => self.page(store)?,
        };

        self.engine.close_page(&target).await?;
        let remaining = self.engine.pages().await?;
        if store.active_page().as_deref() == Some(target.as_str()) {
            store.set_active_page(remaining.last().map(|p| p.id.clone()));
        }
        Ok(json!({"closed": true, "remaining": remaining.len()}))
    }

    pub(super) async fn set_viewport(
        &self,
        store: &SessionStore,
        width: u32,
        height: u32,
    ) -> Result<Value, DispatchError> {
        let page = self.page(store)?;
        self.engine.set_viewport(&page, width, height).await?;
        Ok(json!({"set": true}))
    }
}
