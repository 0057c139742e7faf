//! Show/hide preference for comment badges, persisted in a path-scoped session cookie.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bytes a cookie value cannot carry literally (RFC 6265 `cookie-octet`), plus `%` itself.
const COOKIE_VALUE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b',')
    .add(b';')
    .add(b'\\')
    .add(b'%');

pub const SHOWN_COOKIE_VALUE: &str = "true";
pub const HIDDEN_COOKIE_VALUE: &str = "";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommentVisibility {
    #[default]
    Shown,
    Hidden,
}

impl CommentVisibility {
    /// Preference encoded by a cookie value.
    ///
    /// A missing cookie shows comments; only an explicit empty (or `false`) value hides them.
    pub fn from_cookie(value: Option<&str>) -> CommentVisibility {
        match value.map(str::trim) {
            None => CommentVisibility::Shown,
            Some("") => CommentVisibility::Hidden,
            Some(v) if v.eq_ignore_ascii_case("false") => CommentVisibility::Hidden,
            Some(_) => CommentVisibility::Shown,
        }
    }

    pub fn cookie_value(&self) -> &'static str {
        match self {
            CommentVisibility::Shown => SHOWN_COOKIE_VALUE,
            CommentVisibility::Hidden => HIDDEN_COOKIE_VALUE,
        }
    }

    pub fn toggled(&self) -> CommentVisibility {
        match self {
            CommentVisibility::Shown => CommentVisibility::Hidden,
            CommentVisibility::Hidden => CommentVisibility::Shown,
        }
    }

    /// Label of the show/hide control while in this state: it offers the opposite action.
    pub fn toggle_label(&self) -> &'static str {
        match self {
            CommentVisibility::Shown => "Hide comments",
            CommentVisibility::Hidden => "Show comments",
        }
    }

    /// Inverse of [`CommentVisibility::toggle_label`]: the state a label was rendered for.
    pub fn from_toggle_label(label: &str) -> Option<CommentVisibility> {
        match label.trim() {
            "Hide comments" => Some(CommentVisibility::Shown),
            "Show comments" => Some(CommentVisibility::Hidden),
            _ => None,
        }
    }

    /// CSS `display` value for comment badges.
    pub fn badge_display(&self) -> &'static str {
        match self {
            CommentVisibility::Shown => "block",
            CommentVisibility::Hidden => "none",
        }
    }
}

/// Minimal cookie access: read one cookie by name, write one path-scoped session cookie.
pub trait CookieJar {
    fn get(&self, name: &str) -> Option<String>;
    fn set(&mut self, name: &str, value: &str, path: &str);
}

/// Find `name` in a `document.cookie` style header (`a=1; b=2`).
pub fn parse_cookie_header(header: &str, name: &str) -> Option<String> {
    header
        .split(';')
        .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| percent_decode_str(value.trim()).decode_utf8_lossy().into_owned())
}

/// Assignment string for `document.cookie`, without an expiry so it lasts for the session.
pub fn cookie_assignment(name: &str, value: &str, path: &str) -> String {
    let encoded = utf8_percent_encode(value, COOKIE_VALUE);
    format!("{name}={encoded}; path={path}")
}

/// In-memory jar used off-browser; path scoping is recorded but not enforced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryCookieJar {
    cookies: BTreeMap<String, (String, String)>,
}

impl MemoryCookieJar {
    pub fn path_of(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(|(_, path)| path.as_str())
    }
}

impl CookieJar for MemoryCookieJar {
    fn get(&self, name: &str) -> Option<String> {
        self.cookies.get(name).map(|(value, _)| value.clone())
    }

    fn set(&mut self, name: &str, value: &str, path: &str) {
        self.cookies
            .insert(name.to_string(), (value.to_string(), path.to_string()));
    }
}

/// Binds a [`CookieJar`] to the configured cookie name and path.
#[derive(Debug, Clone)]
pub struct PreferenceStore<J: CookieJar> {
    jar: J,
    name: String,
    path: String,
}

impl<J: CookieJar> PreferenceStore<J> {
    pub fn new(jar: J, name: impl Into<String>, path: impl Into<String>) -> Self {
        PreferenceStore {
            jar,
            name: name.into(),
            path: path.into(),
        }
    }

    pub fn load(&self) -> CommentVisibility {
        let raw = self.jar.get(&self.name);
        let visibility = CommentVisibility::from_cookie(raw.as_deref());
        tracing::debug!("Cookie {}={:?} -> {:?}", self.name, raw, visibility);
        visibility
    }

    pub fn store(&mut self, visibility: CommentVisibility) {
        self.jar
            .set(&self.name, visibility.cookie_value(), &self.path);
    }

    pub fn jar(&self) -> &J {
        &self.jar
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_missing_cookie_shows_comments() {
        assert_eq!(CommentVisibility::from_cookie(None), CommentVisibility::Shown);
        assert_eq!(
            CommentVisibility::from_cookie(Some("true")),
            CommentVisibility::Shown
        );
        assert_eq!(
            CommentVisibility::from_cookie(Some("")),
            CommentVisibility::Hidden
        );
        assert_eq!(
            CommentVisibility::from_cookie(Some("false")),
            CommentVisibility::Hidden
        );
    }

    #[test]
    fn test_parse_cookie_header() {
        let header = "theme=dark; show-ucomments=; sid=a%3Db";
        assert_eq!(
            parse_cookie_header(header, "show-ucomments"),
            Some(String::new())
        );
        assert_eq!(parse_cookie_header(header, "theme"), Some("dark".into()));
        assert_eq!(parse_cookie_header(header, "sid"), Some("a=b".into()));
        assert_eq!(parse_cookie_header(header, "missing"), None);
        assert_eq!(
            parse_cookie_header("note=a+b%20c", "note"),
            Some("a+b c".into())
        );
        assert_eq!(parse_cookie_header("", "show-ucomments"), None);
    }

    #[test]
    fn test_cookie_assignment_is_path_scoped_session_cookie() {
        assert_eq!(
            cookie_assignment("show-ucomments", "true", "/"),
            "show-ucomments=true; path=/"
        );
        assert_eq!(
            cookie_assignment("show-ucomments", "", "/docs"),
            "show-ucomments=; path=/docs"
        );
        assert_eq!(
            cookie_assignment("note", "a+b; c", "/"),
            "note=a+b%3B%20c; path=/"
        );
    }

    #[test]
    fn test_toggle_persists_across_reload() {
        let mut store = PreferenceStore::new(MemoryCookieJar::default(), "show-ucomments", "/");
        assert_eq!(store.load(), CommentVisibility::Shown);

        store.store(store.load().toggled());
        let reloaded = PreferenceStore::new(store.jar().clone(), "show-ucomments", "/");
        assert_eq!(reloaded.load(), CommentVisibility::Hidden);
        assert_eq!(reloaded.jar().path_of("show-ucomments"), Some("/"));
    }

    #[test]
    fn test_toggle_labels_round_trip() {
        for state in [CommentVisibility::Shown, CommentVisibility::Hidden] {
            assert_eq!(
                CommentVisibility::from_toggle_label(state.toggle_label()),
                Some(state)
            );
        }
        assert_eq!(CommentVisibility::from_toggle_label("Comments"), None);
    }
}
