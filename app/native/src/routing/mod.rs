//! URL command parsing and dispatch.
//!
//! - [`parser`] - Scheme URL to `{domain, action, params}`
//! - [`types`] - Closed set of commands decoded from parsed URLs
//! - [`dispatcher`] - Routes commands to the action surface

pub mod dispatcher;
pub mod parser;
pub mod types;

pub use dispatcher::{DispatchError, Dispatcher};
pub use parser::{UrlParseError, parse};
pub use types::{
    Command, DrawAction, DrawTarget, Page, ParsedUrl, Params, TrayAction, WindowAction,
    WindowTarget,
};
