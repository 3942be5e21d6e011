//! CdpEngine core: struct definition, connecting, page bookkeeping.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cdp::{CdpClient, PageSession};
use crate::chrome::ChromeProcess;
use crate::error::EngineError;
use crate::types::{Focus, LaunchOptions, PageInfo};

use super::engine_events::{pump_events, EventState};

/// An attached tab.
pub(super) struct PageState {
    pub(super) session: Arc<PageSession>,
    pump: JoinHandle<()>,
}

impl Drop for PageState {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

/// One live browser connection.
pub(super) struct Browser {
    pub(super) client: Arc<CdpClient>,
    /// In creation order.
    pub(super) pages: RwLock<Vec<Arc<PageState>>>,
    pub(super) viewport: Option<(u32, u32)>,
    /// Set when we started the process ourselves.
    process: Mutex<Option<ChromeProcess>>,
}

/// Where a focused operation runs.
pub(super) struct FrameContext {
    pub(super) page: Arc<PageSession>,
    pub(super) frame_id: Option<String>,
    /// `None` targets the page's main world.
    pub(super) context_id: Option<i64>,
}

/// A [`BrowserEngine`](crate::BrowserEngine) driving Chrome over CDP.
pub struct CdpEngine {
    browser: RwLock<Option<Arc<Browser>>>,
    launch_lock: Mutex<()>,
    pub(super) events: Arc<EventState>,
}

impl Default for CdpEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CdpEngine {
    pub fn new() -> Self {
        Self {
            browser: RwLock::new(None),
            launch_lock: Mutex::new(()),
            events: Arc::new(EventState::default()),
        }
    }

    /// Connect (launching Chrome if needed) unless already connected.
    pub(super) async fn start(&self, options: &LaunchOptions) -> Result<(), EngineError> {
        let _guard = self.launch_lock.lock().await;
        if self.browser().is_ok() {
            debug!("Browser already running");
            return Ok(());
        }

        let (client, process) = match &options.cdp_url {
            Some(url) => {
                info!("Connecting to browser at {}", url);
                let client = if url.starts_with("ws://") || url.starts_with("wss://") {
                    CdpClient::connect_ws(url).await?
                } else {
                    CdpClient::connect(url).await?
                };
                (client, None)
            }
            None => {
                let process = ChromeProcess::launch(options).await?;
                let client = CdpClient::connect_ws(&process.ws_url).await?;
                (client, Some(process))
            }
        };

        let browser = Browser {
            client: Arc::new(client),
            pages: RwLock::new(Vec::new()),
            viewport: options.viewport,
            process: Mutex::new(process),
        };

        let targets = browser.client.get_targets().await?;
        for target in targets.iter().filter(|t| t.target_type == "page") {
            self.attach(&browser, &target.target_id).await?;
        }
        let no_pages = browser.pages.read().is_empty();
        if no_pages {
            let target_id = browser.client.create_target("about:blank").await?;
            self.attach(&browser, &target_id).await?;
        }

        info!(
            "Connected to browser at {} with {} page(s)",
            browser.client.browser_ws_url(),
            browser.pages.read().len()
        );
        *self.browser.write() = Some(Arc::new(browser));
        Ok(())
    }

    /// Attach to a page target and start pumping its events.
    pub(super) async fn attach(
        &self,
        browser: &Browser,
        target_id: &str,
    ) -> Result<Arc<PageSession>, EngineError> {
        let session = Arc::new(browser.client.attach_page(target_id).await?);
        if let Some((width, height)) = browser.viewport {
            session.set_viewport(width, height).await?;
        }

        let pump = match session.take_events() {
            Some(events) => tokio::spawn(pump_events(
                session.session_id().to_string(),
                events,
                self.events.clone(),
            )),
            None => tokio::spawn(async {}),
        };

        browser.pages.write().push(Arc::new(PageState {
            session: session.clone(),
            pump,
        }));
        debug!("Attached to page {}", target_id);
        Ok(session)
    }

    /// Disconnect, and kill the browser if we launched it.
    pub(super) async fn shutdown(&self) -> Result<(), EngineError> {
        let _guard = self.launch_lock.lock().await;
        let Some(browser) = self.browser.write().take() else {
            return Ok(());
        };

        let process = browser.process.lock().await.take();
        if process.is_some() {
            if let Err(e) = browser.client.call("Browser.close", None).await {
                debug!("Browser.close failed: {}", e);
            }
        }
        browser.pages.write().clear();
        if let Some(process) = process {
            process.shutdown().await;
        }

        self.events.reset();
        info!("Browser closed");
        Ok(())
    }

    pub(super) fn browser(&self) -> Result<Arc<Browser>, EngineError> {
        self.browser
            .read()
            .clone()
            .filter(|b| b.client.is_connected())
            .ok_or(EngineError::NotLaunched)
    }

    pub(super) fn page(&self, page_id: &str) -> Result<Arc<PageSession>, EngineError> {
        let browser = self.browser()?;
        let pages = browser.pages.read();
        pages
            .iter()
            .find(|p| p.session.target_id() == page_id)
            .map(|p| p.session.clone())
            .ok_or_else(|| EngineError::PageNotFound(page_id.to_string()))
    }

    pub(super) fn page_ids(&self) -> Result<Vec<String>, EngineError> {
        let browser = self.browser()?;
        let pages = browser.pages.read();
        Ok(pages
            .iter()
            .map(|p| p.session.target_id().to_string())
            .collect())
    }

    pub(super) fn detach(&self, page_id: &str) -> Result<Arc<PageSession>, EngineError> {
        let browser = self.browser()?;
        let mut pages = browser.pages.write();
        let index = pages
            .iter()
            .position(|p| p.session.target_id() == page_id)
            .ok_or_else(|| EngineError::PageNotFound(page_id.to_string()))?;
        Ok(pages.remove(index).session.clone())
    }

    /// Resolve a focus to a page session and execution context.
    pub(super) async fn context(&self, focus: &Focus) -> Result<FrameContext, EngineError> {
        let page = self.page(&focus.page_id)?;
        let Some(frame_id) = focus.frame_id.clone() else {
            return Ok(FrameContext {
                page,
                frame_id: None,
                context_id: None,
            });
        };

        let context_id = match self.events.context_for(&frame_id) {
            Some(id) => id,
            None => page.create_isolated_world(&frame_id).await.map_err(|e| {
                warn!("No execution context for frame {}: {}", frame_id, e);
                EngineError::FrameNotFound(frame_id.clone())
            })?,
        };
        Ok(FrameContext {
            page,
            frame_id: Some(frame_id),
            context_id: Some(context_id),
        })
    }

    pub(super) async fn page_info(&self, page: &PageSession) -> PageInfo {
        PageInfo {
            id: page.target_id().to_string(),
            url: page.get_url().await.unwrap_or_default(),
            title: page.get_title().await.unwrap_or_default(),
        }
    }
}
