//! Page-level DevTools operations, one file per protocol domain.

mod core;
mod dom;
mod input;
mod js;
mod navigation;

pub use self::core::PageSession;
pub use self::input::KeyDefinition;
pub use self::navigation::NavigationStart;
