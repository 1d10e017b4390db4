//! Typed commands decoded from scheme URLs.
//!
//! [`ParsedUrl`] is the raw `{domain, action, params}` view of a URL;
//! [`Command`] is the closed set of things the gateway knows how to do with it.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Flat query parameters. A repeated key keeps its first value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, String>);

impl Params {
    /// Creates an empty parameter map.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Inserts `value` unless `key` is already present.
    pub fn insert_first(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.entry(key.into()).or_insert_with(|| value.into());
    }

    /// Returns the value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> { self.0.get(key).map(String::as_str) }

    /// Interprets `key` as a boolean flag (`1`, `true`, `yes`, `on`).
    #[must_use]
    pub fn flag(&self, key: &str) -> bool {
        self.get(key).is_some_and(|value| {
            matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
        })
    }

    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize { self.0.len() }

    /// Whether there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    /// Iterates parameters in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (key, value) in iter {
            params.insert_first(key, value);
        }
        params
    }
}

/// A scheme URL split into routing fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedUrl {
    /// Scheme the URL was matched against.
    pub scheme: String,
    /// All decoded path segments, the domain first.
    pub path: Vec<String>,
    /// First path segment.
    pub domain: String,
    /// Second path segment, if present.
    pub action: Option<String>,
    /// Decoded query parameters.
    pub params: Params,
}

/// Main window pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    Main,
    RollCall,
    Lottery,
}

/// Tray menu actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrayAction {
    ShowHideMainWindow,
    OpenSettings,
    ToggleFloatWindow,
    /// Stop and relaunch the application.
    Restart,
    /// Stop the application.
    Exit,
}

impl TrayAction {
    fn parse(action: &str) -> Option<Self> {
        match action {
            "show_hide_main_window" => Some(Self::ShowHideMainWindow),
            "open_settings" => Some(Self::OpenSettings),
            "toggle_float_window" => Some(Self::ToggleFloatWindow),
            "restart" => Some(Self::Restart),
            "exit" => Some(Self::Exit),
            _ => None,
        }
    }
}

/// Which draw panel a control verb applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawTarget {
    RollCall,
    Lottery,
}

impl DrawTarget {
    /// URL domain for this panel.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RollCall => "rollcall",
            Self::Lottery => "lottery",
        }
    }

    const fn page(self) -> Page {
        match self {
            Self::RollCall => Page::RollCall,
            Self::Lottery => Page::Lottery,
        }
    }
}

/// Control verbs for the roll-call and lottery panels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawAction {
    Start,
    Stop,
    Reset,
    SetCount,
    SetGroup,
    SetGender,
    SetList,
    QuickDraw,
}

impl DrawAction {
    /// URL action segment for this verb.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Reset => "reset",
            Self::SetCount => "set_count",
            Self::SetGroup => "set_group",
            Self::SetGender => "set_gender",
            Self::SetList => "set_list",
            Self::QuickDraw => "quick_draw",
        }
    }

    fn parse(action: &str) -> Option<Self> {
        [
            Self::Start,
            Self::Stop,
            Self::Reset,
            Self::SetCount,
            Self::SetGroup,
            Self::SetGender,
            Self::SetList,
            Self::QuickDraw,
        ]
        .into_iter()
        .find(|candidate| candidate.as_str() == action)
    }
}

/// Windows addressable through the `window` domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowTarget {
    Main,
    Settings,
    Float,
}

impl WindowTarget {
    fn parse(target: &str) -> Option<Self> {
        match target {
            "main" => Some(Self::Main),
            "settings" => Some(Self::Settings),
            "float" => Some(Self::Float),
            _ => None,
        }
    }
}

/// Window-level visibility changes.
///
/// `Show` and `Hide` are idempotent; `Toggle` flips the current state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum WindowAction {
    #[default]
    Toggle,
    Show,
    Hide,
}

impl WindowAction {
    fn parse(action: &str) -> Option<Self> {
        match action {
            "toggle" => Some(Self::Toggle),
            "show" => Some(Self::Show),
            "hide" => Some(Self::Hide),
            _ => None,
        }
    }
}

/// A decoded URL command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Open the settings window, optionally at a page and in preview mode.
    Settings { page: Option<String>, preview: bool },
    /// Show a main window page.
    ShowPage(Page),
    /// Perform a tray menu action.
    Tray(TrayAction),
    /// Forward a control verb to a draw panel.
    Draw {
        target: DrawTarget,
        action: DrawAction,
        params: Params,
    },
    /// Change a window's visibility.
    Window {
        target: WindowTarget,
        action: WindowAction,
    },
    /// A domain or action with no handler.
    Unknown {
        domain: String,
        action: Option<String>,
    },
}

impl Command {
    /// Decodes routing fields into a command. Domains and actions match
    /// case-insensitively; anything unrecognized becomes [`Command::Unknown`].
    #[must_use]
    pub fn from_parsed(parsed: &ParsedUrl) -> Self {
        let domain = parsed.domain.to_ascii_lowercase();
        let action = parsed.action.as_deref().map(str::to_ascii_lowercase);

        let command = match (domain.as_str(), action.as_deref()) {
            ("settings", page) => Some(Self::Settings {
                page: page.map(str::to_string),
                preview: parsed.params.flag("preview"),
            }),
            ("main", None) => Some(Self::ShowPage(Page::Main)),
            ("rollcall" | "lottery", action) => {
                let target = if domain == "rollcall" {
                    DrawTarget::RollCall
                } else {
                    DrawTarget::Lottery
                };
                match action {
                    None => Some(Self::ShowPage(target.page())),
                    Some(action) => DrawAction::parse(action).map(|action| Self::Draw {
                        target,
                        action,
                        params: parsed.params.clone(),
                    }),
                }
            }
            ("tray", Some(action)) => TrayAction::parse(action).map(Self::Tray),
            ("window", Some(target)) => {
                let action = match parsed.params.get("action") {
                    None => Some(WindowAction::default()),
                    Some(action) => WindowAction::parse(&action.to_ascii_lowercase()),
                };
                WindowTarget::parse(target)
                    .zip(action)
                    .map(|(target, action)| Self::Window { target, action })
            }
            _ => None,
        };

        command.unwrap_or(Self::Unknown {
            domain,
            action,
        })
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Settings { page, preview } => {
                write!(f, "settings/{}", page.as_deref().unwrap_or("home"))?;
                if *preview {
                    f.write_str(" (preview)")?;
                }
                Ok(())
            }
            Self::ShowPage(page) => write!(f, "page {page:?}"),
            Self::Tray(action) => write!(f, "tray {action:?}"),
            Self::Draw { target, action, .. } => {
                write!(f, "{}/{}", target.as_str(), action.as_str())
            }
            Self::Window { target, action } => write!(f, "window {target:?} {action:?}"),
            Self::Unknown { domain, action } => {
                write!(f, "unknown {domain}/{}", action.as_deref().unwrap_or(""))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(domain: &str, action: Option<&str>, params: &[(&str, &str)]) -> ParsedUrl {
        let mut path = vec![domain.to_string()];
        path.extend(action.map(str::to_string));
        ParsedUrl {
            scheme: "secrandom".to_string(),
            path,
            domain: domain.to_string(),
            action: action.map(str::to_string),
            params: params.iter().copied().collect(),
        }
    }

    #[test]
    fn test_params_keep_first_value() {
        let params: Params = [("count", "3"), ("count", "5")].into_iter().collect();
        assert_eq!(params.get("count"), Some("3"));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_settings_with_page_and_preview() {
        let command = Command::from_parsed(&parsed("settings", Some("basic"), &[("preview", "true")]));
        assert_eq!(command, Command::Settings {
            page: Some("basic".to_string()),
            preview: true,
        });
    }

    #[test]
    fn test_page_domains() {
        assert_eq!(Command::from_parsed(&parsed("main", None, &[])), Command::ShowPage(Page::Main));
        assert_eq!(
            Command::from_parsed(&parsed("lottery", None, &[])),
            Command::ShowPage(Page::Lottery)
        );
    }

    #[test]
    fn test_draw_verbs_carry_params() {
        let command =
            Command::from_parsed(&parsed("rollcall", Some("set_count"), &[("count", "4")]));
        let Command::Draw { target, action, params } = command else {
            panic!("expected draw command");
        };
        assert_eq!(target, DrawTarget::RollCall);
        assert_eq!(action, DrawAction::SetCount);
        assert_eq!(params.get("count"), Some("4"));
    }

    #[test]
    fn test_tray_actions() {
        assert_eq!(
            Command::from_parsed(&parsed("tray", Some("restart"), &[])),
            Command::Tray(TrayAction::Restart)
        );
        assert_eq!(
            Command::from_parsed(&parsed("TRAY", Some("Exit"), &[])),
            Command::Tray(TrayAction::Exit)
        );
    }

    #[test]
    fn test_window_action_defaults_to_toggle() {
        assert_eq!(Command::from_parsed(&parsed("window", Some("float"), &[])), Command::Window {
            target: WindowTarget::Float,
            action: WindowAction::Toggle,
        });
        assert_eq!(
            Command::from_parsed(&parsed("window", Some("main"), &[("action", "hide")])),
            Command::Window {
                target: WindowTarget::Main,
                action: WindowAction::Hide,
            }
        );
    }

    #[test]
    fn test_unrecognized_commands_are_unknown() {
        assert!(matches!(
            Command::from_parsed(&parsed("printer", None, &[])),
            Command::Unknown { .. }
        ));
        assert!(matches!(
            Command::from_parsed(&parsed("rollcall", Some("explode"), &[])),
            Command::Unknown { .. }
        ));
        assert!(matches!(
            Command::from_parsed(&parsed("window", Some("main"), &[("action", "spin")])),
            Command::Unknown { .. }
        ));
        assert!(matches!(
            Command::from_parsed(&parsed("tray", None, &[])),
            Command::Unknown { .. }
        ));
    }
}
