//! Element actions, element queries and waits.

use std::time::Duration;

use serde_json::{json, Value};

use agentbrowser_engine::{ClickOptions, ElementQuery, Focus, Locator, MouseButton, WaitState};
use agentbrowser_protocol::ScrollDirection;

use crate::error::DispatchError;
use crate::state::SessionStore;

use super::{resolve_target, Dispatcher};

fn scroll_delta(direction: ScrollDirection, amount: u32) -> (f64, f64) {
    let amount = f64::from(amount);
    match direction {
        ScrollDirection::Up => (0.0, -amount),
        ScrollDirection::Down => (0.0, amount),
        ScrollDirection::Left => (-amount, 0.0),
        ScrollDirection::Right => (amount, 0.0),
    }
}

impl Dispatcher {
    fn target(&self, store: &SessionStore, selector: &str) -> Result<(Focus, Locator), DispatchError> {
        let focus = self.focus(store)?;
        let locator = resolve_target(store, selector)?;
        Ok((focus, locator))
    }

    async fn query(
        &self,
        store: &SessionStore,
        selector: &str,
        query: ElementQuery,
    ) -> Result<Value, DispatchError> {
        let (focus, locator) = self.target(store, selector)?;
        self.engine
            .query(&focus, &locator, &query, self.config.action_timeout)
            .await
            .map_err(|e| DispatchError::element(selector, e))
    }

    pub(super) async fn click(
        &self,
        store: &SessionStore,
        selector: &str,
        button: MouseButton,
        click_count: u32,
        timeout: Option<u64>,
    ) -> Result<Value, DispatchError> {
        let (focus, locator) = self.target(store, selector)?;
        let options = ClickOptions {
            button,
            click_count,
        };
        self.engine
            .click(&focus, &locator, &options, self.action_timeout(timeout))
            .await
            .map_err(|e| DispatchError::element(selector, e))?;
        Ok(json!({"clicked": true}))
    }

    pub(super) async fn type_text(
        &self,
        store: &SessionStore,
        selector: &str,
        text: &str,
        delay_ms: u64,
        clear: bool,
        timeout: Option<u64>,
    ) -> Result<Value, DispatchError> {
        let (focus, locator) = self.target(store, selector)?;
        let timeout = self.action_timeout(timeout);
        if clear {
            self.engine
                .fill(&focus, &locator, "", timeout)
                .await
                .map_err(|e| DispatchError::element(selector, e))?;
        }
        self.engine
            .type_text(
                &focus,
                &locator,
                text,
                Duration::from_millis(delay_ms),
                timeout,
            )
            .await
            .map_err(|e| DispatchError::element(selector, e))?;
        Ok(json!({"typed": true}))
    }

    pub(super) async fn fill(
        &self,
        store: &SessionStore,
        selector: &str,
        value: &str,
        timeout: Option<u64>,
    ) -> Result<Value, DispatchError> {
        let (focus, locator) = self.target(store, selector)?;
        self.engine
            .fill(&focus, &locator, value, self.action_timeout(timeout))
            .await
            .map_err(|e| DispatchError::element(selector, e))?;
        Ok(json!({"filled": true}))
    }

    pub(super) async fn clear(
        &self,
        store: &SessionStore,
        selector: &str,
    ) -> Result<Value, DispatchError> {
        let (focus, locator) = self.target(store, selector)?;
        self.engine
            .fill(&focus, &locator, "", self.config.action_timeout)
            .await
            .map_err(|e| DispatchError::element(selector, e))?;
        Ok(json!({"cleared": true}))
    }

    pub(super) async fn set_checked(
        &self,
        store: &SessionStore,
        selector: &str,
        checked: bool,
    ) -> Result<Value, DispatchError> {
        let (focus, locator) = self.target(store, selector)?;
        let state = self
            .engine
            .set_checked(&focus, &locator, checked, self.config.action_timeout)
            .await
            .map_err(|e| DispatchError::element(selector, e))?;
        Ok(json!({"checked": state}))
    }

    pub(super) async fn select(
        &self,
        store: &SessionStore,
        selector: &str,
        value: &str,
    ) -> Result<Value, DispatchError> {
        let (focus, locator) = self.target(store, selector)?;
        let selected = self
            .engine
            .select_option(&focus, &locator, value, self.config.action_timeout)
            .await
            .map_err(|e| DispatchError::element(selector, e))?;
        Ok(json!({"selected": selected}))
    }

    pub(super) async fn hover(
        &self,
        store: &SessionStore,
        selector: &str,
    ) -> Result<Value, DispatchError> {
        let (focus, locator) = self.target(store, selector)?;
        self.engine
            .hover(&focus, &locator, self.config.action_timeout)
            .await
            .map_err(|e| DispatchError::element(selector, e))?;
        Ok(json!({"hovered": true}))
    }

    pub(super) async fn focus_element(
        &self,
        store: &SessionStore,
        selector: &str,
    ) -> Result<Value, DispatchError> {
        let (focus, locator) = self.target(store, selector)?;
        self.engine
            .focus_element(&focus, &locator, self.config.action_timeout)
            .await
            .map_err(|e| DispatchError::element(selector, e))?;
        Ok(json!({"focused": true}))
    }

    pub(super) async fn press(
        &self,
        store: &SessionStore,
        key: &str,
        selector: Option<&str>,
    ) -> Result<Value, DispatchError> {
        let focus = self.focus(store)?;
        match selector {
            Some(selector) => {
                let locator = resolve_target(store, selector)?;
                self.engine
                    .press(&focus, Some(&locator), key, self.config.action_timeout)
                    .await
                    .map_err(|e| DispatchError::element(selector, e))?;
            }
            None => {
                self.engine
                    .press(&focus, None, key, self.config.action_timeout)
                    .await?;
            }
        }
        Ok(json!({"pressed": key}))
    }

    pub(super) async fn scroll(
        &self,
        store: &SessionStore,
        selector: Option<&str>,
        direction: ScrollDirection,
        amount: u32,
    ) -> Result<Value, DispatchError> {
        let focus = self.focus(store)?;
        let (dx, dy) = scroll_delta(direction, amount);
        match selector {
            Some(selector) => {
                let locator = resolve_target(store, selector)?;
                self.engine
                    .scroll(&focus, Some(&locator), dx, dy, self.config.action_timeout)
                    .await
                    .map_err(|e| DispatchError::element(selector, e))?;
            }
            None => {
                self.engine
                    .scroll(&focus, None, dx, dy, self.config.action_timeout)
                    .await?;
            }
        }
        Ok(json!({"scrolled": true}))
    }

    pub(super) async fn mouse_move(
        &self,
        store: &SessionStore,
        x: f64,
        y: f64,
    ) -> Result<Value, DispatchError> {
        let page = self.page(store)?;
        self.engine.mouse_move(&page, x, y).await?;
        Ok(json!({"moved": true}))
    }

    pub(super) async fn mouse_click(
        &self,
        store: &SessionStore,
        x: f64,
        y: f64,
        button: MouseButton,
        click_count: u32,
    ) -> Result<Value, DispatchError> {
        let page = self.page(store)?;
        let options = ClickOptions {
            button,
            click_count,
        };
        self.engine.mouse_click(&page, x, y, &options).await?;
        Ok(json!({"clicked": true}))
    }

    // Queries

    pub(super) async fn get_text(
        &self,
        store: &SessionStore,
        selector: &str,
    ) -> Result<Value, DispatchError> {
        let text = self.query(store, selector, ElementQuery::Text).await?;
        Ok(json!({"text": text}))
    }

    pub(super) async fn get_html(
        &self,
        store: &SessionStore,
        selector: Option<&str>,
    ) -> Result<Value, DispatchError> {
        let html = match selector {
            Some(selector) => self.query(store, selector, ElementQuery::OuterHtml).await?,
            None => Value::String(self.engine.html(&self.focus(store)?).await?),
        };
        Ok(json!({"html": html}))
    }

    pub(super) async fn get_value(
        &self,
        store: &SessionStore,
        selector: &str,
    ) -> Result<Value, DispatchError> {
        let value = self.query(store, selector, ElementQuery::Value).await?;
        Ok(json!({"value": value}))
    }

    pub(super) async fn get_attribute(
        &self,
        store: &SessionStore,
        selector: &str,
        name: &str,
    ) -> Result<Value, DispatchError> {
        let value = self
            .query(store, selector, ElementQuery::Attribute(name.to_string()))
            .await?;
        Ok(json!({"value": value}))
    }

    pub(super) async fn get_count(
        &self,
        store: &SessionStore,
        selector: &str,
    ) -> Result<Value, DispatchError> {
        let (focus, locator) = self.target(store, selector)?;
        let count = self
            .engine
            .count(&focus, &locator)
            .await
            .map_err(|e| DispatchError::element(selector, e))?;
        Ok(json!({"count": count}))
    }

    pub(super) async fn bounding_box(
        &self,
        store: &SessionStore,
        selector: &str,
    ) -> Result<Value, DispatchError> {
        let bbox = self.query(store, selector, ElementQuery::BoundingBox).await?;
        Ok(json!({"box": bbox}))
    }

    pub(super) async fn is_visible(
        &self,
        store: &SessionStore,
        selector: &str,
    ) -> Result<Value, DispatchError> {
        let visible = self.query(store, selector, ElementQuery::Visible).await?;
        Ok(json!({"visible": visible}))
    }

    pub(super) async fn is_enabled(
        &self,
        store: &SessionStore,
        selector: &str,
    ) -> Result<Value, DispatchError> {
        let enabled = self.query(store, selector, ElementQuery::Enabled).await?;
        Ok(json!({"enabled": enabled}))
    }

    pub(super) async fn is_checked(
        &self,
        store: &SessionStore,
        selector: &str,
    ) -> Result<Value, DispatchError> {
        let checked = self.query(store, selector, ElementQuery::Checked).await?;
        Ok(json!({"checked": checked}))
    }

    pub(super) async fn wait_for_selector(
        &self,
        store: &SessionStore,
        selector: &str,
        state: WaitState,
        timeout: Option<u64>,
    ) -> Result<Value, DispatchError> {
        let (focus, locator) = self.target(store, selector)?;
        self.engine
            .wait_for(&focus, &locator, state, self.action_timeout(timeout))
            .await
            .map_err(|e| DispatchError::element(selector, e))?;
        Ok(json!({"found": true}))
    }
}
