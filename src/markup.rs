//! Element ids and class names the generated HTML provides for the widget.

pub const DIALOG_CONTAINER_ID: &str = "ucomment-dialog-container";
pub const DIALOG_TABS_ID: &str = "ucomment-dialog";
pub const DIALOG_HEADER_ID: &str = "ucomment-dialog-header";
/// Everything that closes the dialog, the close button shown after a submission included.
pub const DIALOG_CLOSE_SELECTOR: &str =
    "#ucomment-dialog-container .ucomment-close, #ucomment-close-button";
pub const COMMENT_FORM_ID: &str = "ucomment-form";
pub const COMMENT_TEXT_ID: &str = "ucomment-id_comment";
pub const PREVIEW_BOX_ID: &str = "ucomment-preview-box";
pub const COMMENT_LIST_ID: &str = "ucomment-view-comments-list";
pub const HIGHLIGHT_ID: &str = "ucomment-highlight-floater";
pub const CONTENT_MAIN_ID: &str = "ucomment-content-main";
pub const BORDER_ID: &str = "ucomment-border";
pub const SEARCH_FORM_ID: &str = "ucomment-search-form";
pub const HELP_LINK_ID: &str = "ucomment-help-with-ucomments";
pub const POST_LINK_ID: &str = "ucomment-post-a-new-comment";

pub const INDICATOR_CLASS: &str = "ucomment-indicator";
pub const HAS_COMMENTS_CLASS: &str = "ucomment-has-comments";
pub const SHOW_HIDE_CLASS: &str = "ucomment-show-hide-ucomments";
pub const TAB_CLASS: &str = "yui3-tab";
pub const TAB_SELECTED_CLASS: &str = "yui3-tab-selected";
pub const TAB_PANEL_CLASS: &str = "yui3-tab-panel";
pub const ERROR_CLASS: &str = "error";

pub const TOC_LEVEL1_CLASS: &str = "ucomment-toctree-l1";
pub const TOC_EXPANDER_ITEM_CLASS: &str = "ucomment-expander";
pub const TOC_TOGGLE_CLASS: &str = "ucomment-toc-expander";

/// Form field names added to submissions.
pub const COMMENT_ROOT_FIELD: &str = "comment_root";
pub const PAGE_NAME_FIELD: &str = "page_name";
pub const ORDER_FIELD: &str = "order";
