//! Translation of parsed CLI commands into protocol actions.

use agentbrowser_protocol::{
    Action, ImageFormat, MouseButton, ScrollDirection, WaitState, WaitUntil,
};

use crate::cli::{Button, Commands, Direction, ElementState, Format, LoadState};

/// The protocol action for `command`, or `None` for commands the CLI
/// handles itself.
///
/// `timeout` is applied to every action that waits for something.
pub(crate) fn build_action(command: Commands, timeout: Option<u64>) -> Option<Action> {
    let action = match command {
        Commands::Open { url, wait_until } => Action::Navigate {
            url,
            wait_until: wait_until.map(wait_until_from),
            timeout,
        },
        Commands::Back => Action::Back,
        Commands::Forward => Action::Forward,
        Commands::Reload => Action::Reload,
        Commands::Click { selector, button } => Action::Click {
            selector,
            button: button.map(mouse_button),
            click_count: None,
            timeout,
        },
        Commands::Dblclick { selector } => Action::Dblclick { selector, timeout },
        Commands::Type {
            selector,
            text,
            delay,
            clear,
        } => Action::Type {
            selector,
            text: text.join(" "),
            delay,
            clear: clear.then_some(true),
            timeout,
        },
        Commands::Fill { selector, value } => Action::Fill {
            selector,
            value: value.join(" "),
            timeout,
        },
        Commands::Clear { selector } => Action::Clear { selector },
        Commands::Check { selector } => Action::Check { selector },
        Commands::Uncheck { selector } => Action::Uncheck { selector },
        Commands::Select { selector, value } => Action::Select { selector, value },
        Commands::Hover { selector } => Action::Hover { selector },
        Commands::Focus { selector } => Action::Focus { selector },
        Commands::Press { key, selector } => Action::Press { key, selector },
        Commands::Scroll {
            selector,
            direction,
            amount,
        } => Action::Scroll {
            selector,
            direction: direction.map(scroll_direction),
            amount,
        },
        Commands::MouseMove { x, y } => Action::MouseMove { x, y },
        Commands::MouseClick { x, y, button } => Action::MouseClick {
            x,
            y,
            button: button.map(mouse_button),
            click_count: None,
        },
        Commands::Snapshot {
            selector,
            all,
            depth,
            compact,
            hidden,
        } => Action::Snapshot {
            selector,
            interactive: Some(!all),
            max_depth: depth,
            compact: compact.then_some(true),
            include_hidden: hidden.then_some(true),
        },
        Commands::Dom {
            selector,
            depth,
            hidden,
        } => Action::GetDom {
            selector,
            max_depth: depth,
            include_hidden: hidden.then_some(true),
        },
        Commands::Screenshot {
            path,
            full_page,
            selector,
            format,
            quality,
        } => Action::Screenshot {
            path,
            full_page: full_page.then_some(true),
            selector,
            format: format.map(image_format),
            quality,
        },
        Commands::Pdf { path } => Action::Pdf { path },
        Commands::Title => Action::GetTitle,
        Commands::Url => Action::GetUrl,
        Commands::Text { selector } => Action::GetText { selector },
        Commands::Html { selector } => Action::GetHtml { selector },
        Commands::Value { selector } => Action::GetValue { selector },
        Commands::Attr { selector, name } => Action::GetAttribute { selector, name },
        Commands::Count { selector } => Action::GetCount { selector },
        Commands::BoundingBox { selector } => Action::BoundingBox { selector },
        Commands::Visible { selector } => Action::IsVisible { selector },
        Commands::Enabled { selector } => Action::IsEnabled { selector },
        Commands::Checked { selector } => Action::IsChecked { selector },
        Commands::Wait { target, state } => match target.parse::<u64>() {
            Ok(ms) => Action::Wait { timeout: ms },
            Err(_) => Action::WaitForSelector {
                selector: target,
                state: state.map(wait_state),
                timeout,
            },
        },
        Commands::WaitForLoad => Action::WaitForLoad { timeout },
        Commands::Frames => Action::GetFrames,
        Commands::Frame {
            selector,
            name,
            url,
        } => Action::SwitchToFrame {
            selector,
            name,
            url,
        },
        Commands::Mainframe => Action::SwitchToMainFrame,
        Commands::Pages => Action::GetPages,
        Commands::Newpage { url } => Action::NewPage { url },
        Commands::Switchpage { index } => Action::SwitchPage {
            index: Some(index),
            url: None,
        },
        Commands::Closepage { index } => Action::ClosePage { index },
        Commands::Eval { script } => Action::Evaluate {
            script: script.join(" "),
        },
        Commands::Cookies => Action::GetCookies,
        Commands::Clearcookies => Action::ClearCookies,
        Commands::Localstorage { key } => Action::GetLocalStorage { key },
        Commands::Clearlocalstorage => Action::ClearLocalStorage,
        Commands::Viewport { width, height } => Action::SetViewport { width, height },
        Commands::Console { clear } => Action::Console {
            clear: clear.then_some(true),
        },
        Commands::Errors { clear } => Action::Errors {
            clear: clear.then_some(true),
        },
        Commands::Requests { filter, clear } => Action::Requests {
            filter,
            clear: clear.then_some(true),
        },
        Commands::Launch { cdp_url } => Action::Launch {
            headless: None,
            executable_path: None,
            cdp_url,
            viewport: None,
            args: None,
        },
        Commands::Close => Action::Close,
        Commands::Daemon { .. } => return None,
    };
    Some(action)
}

fn mouse_button(button: Button) -> MouseButton {
    match button {
        Button::Left => MouseButton::Left,
        Button::Middle => MouseButton::Middle,
        Button::Right => MouseButton::Right,
    }
}

fn scroll_direction(direction: Direction) -> ScrollDirection {
    match direction {
        Direction::Up => ScrollDirection::Up,
        Direction::Down => ScrollDirection::Down,
        Direction::Left => ScrollDirection::Left,
        Direction::Right => ScrollDirection::Right,
    }
}

fn image_format(format: Format) -> ImageFormat {
    match format {
        Format::Png => ImageFormat::Png,
        Format::Jpeg => ImageFormat::Jpeg,
    }
}

fn wait_until_from(state: LoadState) -> WaitUntil {
    match state {
        LoadState::Load => WaitUntil::Load,
        LoadState::Domcontentloaded => WaitUntil::DomContentLoaded,
        LoadState::NoWait => WaitUntil::NoWait,
    }
}

fn wait_state(state: ElementState) -> WaitState {
    match state {
        ElementState::Attached => WaitState::Attached,
        ElementState::Detached => WaitState::Detached,
        ElementState::Visible => WaitState::Visible,
        ElementState::Hidden => WaitState::Hidden,
    }
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
