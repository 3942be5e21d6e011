//! Command dispatch.
//!
//! [`Dispatcher::execute`] turns one validated [`Command`] into engine calls
//! and always answers with a [`Response`]: every failure is caught here and
//! rewritten into a message the caller can act on.
//!
//! Handlers are grouped by concern:
//!
//! - `dispatch_pages`: lifecycle, navigation, pages and frames
//! - `dispatch_elements`: element actions, element queries and waits
//! - `dispatch_model`: snapshots, DOM fusion, capture, storage and logs

mod dispatch_elements;
mod dispatch_model;
mod dispatch_pages;

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, warn};

use agentbrowser_engine::{BrowserEngine, Focus, LaunchOptions, Locator, MouseButton};
use agentbrowser_protocol::{Action, Command, Response};
use agentbrowser_snapshot::parse_ref;

use crate::error::DispatchError;
use crate::state::SessionStore;

/// Pixels scrolled when a `scroll` command gives no amount.
pub const DEFAULT_SCROLL_AMOUNT: u32 = 300;

/// Defaults applied to commands that leave them out.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Options for implicit launches; explicit `launch` fields override them.
    pub launch: LaunchOptions,
    /// Actionability wait for element actions and queries.
    pub action_timeout: Duration,
    /// Load wait for navigations.
    pub navigation_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            launch: LaunchOptions::default(),
            action_timeout: Duration::from_secs(10),
            navigation_timeout: Duration::from_secs(30),
        }
    }
}

/// Executes commands against one engine.
pub struct Dispatcher {
    engine: Arc<dyn BrowserEngine>,
    config: DispatcherConfig,
}

impl Dispatcher {
    pub fn new(engine: Arc<dyn BrowserEngine>, config: DispatcherConfig) -> Self {
        Self { engine, config }
    }

    pub fn engine(&self) -> &Arc<dyn BrowserEngine> {
        &self.engine
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Run `command` and build its response. Never fails.
    pub async fn execute(&self, store: &SessionStore, command: Command) -> Response {
        let Command { id, action } = command;
        let name = action.name();
        debug!("Executing {} (id {})", name, id);

        match self.run(store, action).await {
            Ok(result) => Response::ok(id, result),
            Err(e) => {
                let message = e.user_message();
                debug!("{} (id {}) failed: {}", name, id, message);
                Response::err(id, message)
            }
        }
    }

    async fn run(&self, store: &SessionStore, action: Action) -> Result<Value, DispatchError> {
        let needs_browser = !action.is_lifecycle() && !action.is_log_query();
        if needs_browser && !(store.is_launched() && self.engine.is_running()) {
            if store.is_launched() {
                warn!("Browser went away, relaunching for {}", action.name());
            } else {
                info!("Launching browser for {}", action.name());
            }
            self.launch_with(store, &self.config.launch).await?;
        }
        if store.is_launched() {
            store.record_events(self.engine.drain_events());
        }

        match action {
            Action::Launch {
                headless,
                executable_path,
                cdp_url,
                viewport,
                args,
            } => {
                let mut options = self.config.launch.clone();
                if let Some(headless) = headless {
                    options.headless = headless;
                }
                if let Some(path) = executable_path {
                    options.executable_path = Some(path.into());
                }
                if cdp_url.is_some() {
                    options.cdp_url = cdp_url;
                }
                if let Some(viewport) = viewport {
                    options.viewport = Some((viewport.width, viewport.height));
                }
                if let Some(args) = args {
                    options.args.extend(args);
                }
                self.launch(store, &options).await
            }
            Action::Close => self.close(store).await,

            Action::Navigate {
                url,
                wait_until,
                timeout,
            } => {
                self.navigate(store, &url, wait_until.unwrap_or_default(), timeout)
                    .await
            }
            Action::Back => self.history(store, HistoryStep::Back).await,
            Action::Forward => self.history(store, HistoryStep::Forward).await,
            Action::Reload => self.history(store, HistoryStep::Reload).await,

            Action::Click {
                selector,
                button,
                click_count,
                timeout,
            } => {
                self.click(
                    store,
                    &selector,
                    button.unwrap_or_default(),
                    click_count.unwrap_or(1),
                    timeout,
                )
                .await
            }
            Action::Dblclick { selector, timeout } => {
                self.click(store, &selector, MouseButton::Left, 2, timeout)
                    .await
            }
            Action::Type {
                selector,
                text,
                delay,
                clear,
                timeout,
            } => {
                self.type_text(
                    store,
                    &selector,
                    &text,
                    delay.unwrap_or(0),
                    clear.unwrap_or(false),
                    timeout,
                )
                .await
            }
            Action::Fill {
                selector,
                value,
                timeout,
            } => self.fill(store, &selector, &value, timeout).await,
            Action::Clear { selector } => self.clear(store, &selector).await,
            Action::Check { selector } => self.set_checked(store, &selector, true).await,
            Action::Uncheck { selector } => self.set_checked(store, &selector, false).await,
            Action::Select { selector, value } => self.select(store, &selector, &value).await,
            Action::Hover { selector } => self.hover(store, &selector).await,
            Action::Focus { selector } => self.focus_element(store, &selector).await,
            Action::Press { key, selector } => self.press(store, &key, selector.as_deref()).await,
            Action::Scroll {
                selector,
                direction,
                amount,
            } => {
                self.scroll(
                    store,
                    selector.as_deref(),
                    direction.unwrap_or_default(),
                    amount.unwrap_or(DEFAULT_SCROLL_AMOUNT),
                )
                .await
            }
            Action::MouseMove { x, y } => self.mouse_move(store, x, y).await,
            Action::MouseClick {
                x,
                y,
                button,
                click_count,
            } => {
                self.mouse_click(
                    store,
                    x,
                    y,
                    button.unwrap_or_default(),
                    click_count.unwrap_or(1),
                )
                .await
            }

            Action::Snapshot {
                selector,
                interactive,
                max_depth,
                compact,
                include_hidden,
            } => {
                let options = agentbrowser_snapshot::SnapshotOptions {
                    interactive: interactive.unwrap_or(false),
                    max_depth,
                    include_hidden: include_hidden.unwrap_or(false),
                    compact: compact.unwrap_or(false),
                };
                self.snapshot(store, selector.as_deref(), &options).await
            }
            Action::GetDom {
                selector,
                max_depth,
                include_hidden,
            } => {
                self.get_dom(
                    store,
                    selector.as_deref(),
                    max_depth,
                    include_hidden.unwrap_or(false),
                )
                .await
            }
            Action::Screenshot {
                path,
                full_page,
                selector,
                format,
                quality,
            } => {
                self.screenshot(
                    store,
                    path.as_deref(),
                    full_page.unwrap_or(false),
                    selector.as_deref(),
                    format.unwrap_or_default(),
                    quality,
                )
                .await
            }
            Action::Pdf { path } => self.pdf(store, path.as_deref()).await,

            Action::GetTitle => self.get_title(store).await,
            Action::GetUrl => self.get_url(store).await,
            Action::GetText { selector } => self.get_text(store, &selector).await,
            Action::GetHtml { selector } => self.get_html(store, selector.as_deref()).await,
            Action::GetValue { selector } => self.get_value(store, &selector).await,
            Action::GetAttribute { selector, name } => {
                self.get_attribute(store, &selector, &name).await
            }
            Action::GetCount { selector } => self.get_count(store, &selector).await,
            Action::BoundingBox { selector } => self.bounding_box(store, &selector).await,
            Action::IsVisible { selector } => self.is_visible(store, &selector).await,
            Action::IsEnabled { selector } => self.is_enabled(store, &selector).await,
            Action::IsChecked { selector } => self.is_checked(store, &selector).await,

            Action::Wait { timeout } => self.wait(timeout).await,
            Action::WaitForSelector {
                selector,
                state,
                timeout,
            } => {
                self.wait_for_selector(store, &selector, state.unwrap_or_default(), timeout)
                    .await
            }
            Action::WaitForLoad { timeout } => self.wait_for_load(store, timeout).await,

            Action::GetFrames => self.get_frames(store).await,
            Action::SwitchToFrame {
                selector,
                name,
                url,
            } => {
                self.switch_to_frame(store, selector.as_deref(), name.as_deref(), url.as_deref())
                    .await
            }
            Action::SwitchToMainFrame => self.switch_to_main_frame(store),

            Action::GetPages => self.get_pages(store).await,
            Action::NewPage { url } => self.new_page(store, url.as_deref()).await,
            Action::SwitchPage { index, url } => {
                self.switch_page(store, index, url.as_deref()).await
            }
            Action::ClosePage { index } => self.close_page(store, index).await,

            Action::Evaluate { script } => self.evaluate(store, &script).await,
            Action::GetCookies => self.get_cookies(store).await,
            Action::ClearCookies => self.clear_cookies(store).await,
            Action::GetLocalStorage { key } => self.get_local_storage(store, key.as_deref()).await,
            Action::ClearLocalStorage => self.clear_local_storage(store).await,
            Action::SetViewport { width, height } => {
                self.set_viewport(store, width, height).await
            }

            Action::Console { clear } => Ok(self.console(store, clear.unwrap_or(false))),
            Action::Errors { clear } => Ok(self.errors(store, clear.unwrap_or(false))),
            Action::Requests { filter, clear } => {
                Ok(self.requests(store, filter.as_deref(), clear.unwrap_or(false)))
            }
        }
    }

    fn focus(&self, store: &SessionStore) -> Result<Focus, DispatchError> {
        store.focus().ok_or(DispatchError::NoPage)
    }

    fn page(&self, store: &SessionStore) -> Result<String, DispatchError> {
        store.active_page().ok_or(DispatchError::NoPage)
    }

    fn action_timeout(&self, timeout: Option<u64>) -> Duration {
        timeout
            .map(Duration::from_millis)
            .unwrap_or(self.config.action_timeout)
    }

    fn navigation_timeout(&self, timeout: Option<u64>) -> Duration {
        timeout
            .map(Duration::from_millis)
            .unwrap_or(self.config.navigation_timeout)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HistoryStep {
    Back,
    Forward,
    Reload,
}

/// Locator for a ref from the latest snapshot or a structural selector.
pub fn resolve_target(store: &SessionStore, selector: &str) -> Result<Locator, DispatchError> {
    if let Some(id) = parse_ref(selector) {
        let entry = store
            .ref_entry(id)
            .ok_or_else(|| DispatchError::InvalidRef(format!("@{}", id)))?;
        // Occurrences were counted per exact name, unnamed nodes included.
        let name = entry.name.unwrap_or_default();
        return Ok(Locator::role(entry.role, Some(name), entry.nth));
    }
    Ok(Locator::parse(selector)?)
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
