//! The seam between the session and the rendered page.
//!
//! [`crate::session::UiSession`] decides *what* the page should show; a [`PageView`] does the
//! DOM work. The browser implementation lives in `wasm::dom`; tests use a recording fake.
//! Methods take `&self`: DOM handles are shared, interior-mutable objects.

use crate::{
    blocks::NodeGeometry,
    cookie::CommentVisibility,
    dialog::{ButtonPanel, DialogPlacement, PreviewPane, Tab, Viewport},
    indicator::{Badge, HighlightBand},
};

pub trait PageView {
    /// Fill in the badge of block `block`'s indicator and set its has-comments flag.
    fn set_badge(&self, block: usize, badge: &Badge);
    /// Show or hide every badge and relabel the show/hide controls.
    fn set_badge_visibility(&self, visibility: CommentVisibility);
    fn set_toggle_visible(&self, visible: bool);

    fn place_dialog(&self, placement: &DialogPlacement);
    fn hide_dialog(&self);
    fn select_tab(&self, tab: Tab);
    fn render_buttons(&self, panel: ButtonPanel);
    fn render_preview(&self, pane: &PreviewPane);
    fn set_comment_list(&self, html: &str);
    fn place_highlight(&self, band: &HighlightBand);
    fn hide_highlight(&self);
    /// Attach the one-shot keydown/click listener on the comment text.
    fn arm_edit_listener(&self);
    fn disarm_edit_listener(&self);
    /// Queue MathJax typesetting of the element with id `element_id`.
    fn typeset_math(&self, element_id: &str);

    /// Name/value pairs of the comment form, disabled controls included.
    fn comment_form_fields(&self) -> Vec<(String, String)>;
    fn viewport(&self) -> Viewport;
    /// Current geometry of block `block`'s node, if it is still in the document.
    fn measure_block(&self, block: usize) -> Option<NodeGeometry>;
}
