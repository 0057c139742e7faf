use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::{error::UcommentError, transport::Endpoint};

pub const DEFAULT_POST_COMMENT_FAILURE: &str = concat!(
    "A delay occurred on the server while processing your ",
    "comment. Please try submitting it again.  If it still does ",
    "not succeed, please contact us: \"support@example.com\""
);

/// Ordering of the comments returned by the comment HTML endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentOrder {
    #[default]
    Forward,
    Reverse,
}

impl CommentOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentOrder::Forward => "forward",
            CommentOrder::Reverse => "reverse",
        }
    }
}

/// Load-time settings for the widget.
///
/// Every field has a default, so an empty TOML document or an empty JS object yields a working
/// configuration:
///
/// ```rust
/// use ucomment::config::WidgetConfig;
///
/// let config = WidgetConfig::from_toml_str("use_mathjax = true").unwrap();
/// assert!(config.use_mathjax);
/// assert_eq!(config.url_views_prefix, "document/");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    /// Queue MathJax typesetting of rendered previews and comment lists.
    pub use_mathjax: bool,
    /// Absolute path (or absolute URL) the views prefix is resolved against.
    pub site_root: String,
    /// Same value as the server's `url_views_prefix` setting.
    pub url_views_prefix: String,
    /// Collapse nested table-of-contents entries behind expand/hide toggles.
    pub use_toc_accordion: bool,
    /// Message shown when a preview or submission times out.
    pub post_comment_failure: String,
    /// Class carried by commentable nodes in the generated HTML.
    pub class_name: String,
    pub request_timeout_ms: u64,
    /// Added to the form timeout each time a preview or submission times out.
    pub timeout_increment_ms: u64,
    pub cookie_name: String,
    pub cookie_path: String,
    pub comment_order: CommentOrder,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        WidgetConfig {
            use_mathjax: false,
            site_root: "/".to_string(),
            url_views_prefix: "document/".to_string(),
            use_toc_accordion: true,
            post_comment_failure: DEFAULT_POST_COMMENT_FAILURE.to_string(),
            class_name: "ucomment".to_string(),
            request_timeout_ms: 15_000,
            timeout_increment_ms: 5_000,
            cookie_name: "show-ucomments".to_string(),
            cookie_path: "/".to_string(),
            comment_order: CommentOrder::Forward,
        }
    }
}

impl WidgetConfig {
    pub fn from_toml_str(content: &str) -> Result<WidgetConfig, UcommentError> {
        let config: WidgetConfig = toml::from_str(content)?;
        config.validate()?;
        tracing::debug!("Loaded widget config: {:?}", config);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), UcommentError> {
        if self.class_name.trim().is_empty() {
            return Err(UcommentError::Config(
                "class_name must not be empty".to_string(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(UcommentError::Config(
                "request_timeout_ms must be positive".to_string(),
            ));
        }
        if self.cookie_name.trim().is_empty() {
            return Err(UcommentError::Config(
                "cookie_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn timeout_increment(&self) -> Duration {
        Duration::from_millis(self.timeout_increment_ms)
    }

    /// Resolve the URL of `endpoint`, relative to `origin` when `site_root` is a bare path.
    ///
    /// The views prefix and endpoint suffix are always treated as directories, so a prefix
    /// missing its trailing slash still resolves underneath it.
    pub fn endpoint_url(&self, origin: &Url, endpoint: Endpoint) -> Result<Url, UcommentError> {
        let root = origin.join(&as_directory(&self.site_root))?;
        let prefixed = root.join(&as_directory(self.url_views_prefix.trim_start_matches('/')))?;
        Ok(prefixed.join(endpoint.path_suffix())?)
    }
}

fn as_directory(path: &str) -> String {
    if path.is_empty() || path.ends_with('/') {
        path.to_string()
    } else {
        format!("{path}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn origin() -> Url {
        Url::parse("https://docs.example.org/guide/intro.html").unwrap()
    }

    #[test]
    fn test_defaults_match_documented_settings() {
        let config = WidgetConfig::default();
        assert!(!config.use_mathjax);
        assert!(config.use_toc_accordion);
        assert_eq!(config.request_timeout(), Duration::from_millis(15_000));
        assert_eq!(config.timeout_increment(), Duration::from_millis(5_000));
        assert_eq!(config.cookie_name, "show-ucomments");
        assert_eq!(config.comment_order, CommentOrder::Forward);
    }

    #[test]
    fn test_endpoint_urls() {
        let config = WidgetConfig::default();
        assert_eq!(
            config
                .endpoint_url(&origin(), Endpoint::Preview)
                .unwrap()
                .as_str(),
            "https://docs.example.org/document/_preview-comment/"
        );
        assert_eq!(
            config
                .endpoint_url(&origin(), Endpoint::Counts)
                .unwrap()
                .as_str(),
            "https://docs.example.org/document/_retrieve-comment-counts/"
        );
    }

    #[test]
    fn test_endpoint_url_with_unslashed_prefix() {
        let config = WidgetConfig {
            site_root: "/books".to_string(),
            url_views_prefix: "notes".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config
                .endpoint_url(&origin(), Endpoint::Search)
                .unwrap()
                .as_str(),
            "https://docs.example.org/books/notes/_search/"
        );
    }

    #[test]
    fn test_toml_overrides() {
        let config = WidgetConfig::from_toml_str(
            r#"
use_toc_accordion = false
url_views_prefix = "comments/"
comment_order = "reverse"
"#,
        )
        .unwrap();
        assert!(!config.use_toc_accordion);
        assert_eq!(config.url_views_prefix, "comments/");
        assert_eq!(config.comment_order, CommentOrder::Reverse);
        assert_eq!(config.class_name, "ucomment");
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(matches!(
            WidgetConfig::from_toml_str("class_name = \"\""),
            Err(UcommentError::Config(_))
        ));
        assert!(matches!(
            WidgetConfig::from_toml_str("request_timeout_ms = \"soon\""),
            Err(UcommentError::Config(_))
        ));
    }
}
