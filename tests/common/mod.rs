//! Shared test utilities for integration tests.
//!
//! Logging is installed per test by `test_log::test`, which honors `RUST_LOG`.
//!
//! Import from integration test files as:
//! ```ignore
//! mod common;
//! ```

use std::{
    cell::RefCell,
    collections::{BTreeMap, VecDeque},
};
use url::Url;

use ucomment::{
    blocks::{BlockIndex, CommentableTarget, NodeGeometry, NodeKind},
    config::WidgetConfig,
    cookie::{CommentVisibility, MemoryCookieJar},
    dialog::{ButtonPanel, DialogPlacement, PreviewPane, Tab, Viewport},
    indicator::{Badge, ContentColumn, HighlightBand},
    page::PageView,
    session::{PageLayout, UiSession},
    transport::{FormRequest, Reply, Transport},
    UcommentError,
};

pub const PAGE_URL: &str = "https://docs.example.org/document/intro/";
pub const PAGE_NAME: &str = "/document/intro/";

/// Geometry of the `i`th test block.
#[allow(dead_code)]
pub fn block_geometry(i: usize) -> NodeGeometry {
    NodeGeometry {
        top: 100.0 + 80.0 * i as f64,
        height: 48.0,
    }
}

#[allow(dead_code)]
pub fn test_layout() -> PageLayout {
    PageLayout {
        margin_x: 20.0,
        column: ContentColumn {
            left: 40.0,
            width: 640.0,
            bar_width: 20.0,
        },
        dialog_width: 400.0,
        dialog_height: 300.0,
    }
}

/// A session over one element block per root, in order.
#[allow(dead_code)]
pub fn test_session(
    roots: &[&str],
    config: WidgetConfig,
    jar: MemoryCookieJar,
) -> RefCell<UiSession<MemoryCookieJar>> {
    let blocks = BlockIndex::build(roots.iter().enumerate().map(|(i, root)| {
        (
            CommentableTarget::normalize(root, NodeKind::Element).unwrap(),
            block_geometry(i),
        )
    }))
    .unwrap();
    RefCell::new(
        UiSession::new(
            config,
            Url::parse(PAGE_URL).unwrap(),
            PAGE_NAME,
            blocks,
            test_layout(),
            jar,
        )
        .unwrap(),
    )
}

/// Everything the session has told the page, latest value per concern.
#[derive(Debug, Default)]
pub struct PageState {
    pub badges: BTreeMap<usize, Badge>,
    pub badge_visibility: Option<CommentVisibility>,
    pub toggle_visible: Option<bool>,
    /// `None` while hidden.
    pub dialog: Option<DialogPlacement>,
    pub tab: Option<Tab>,
    pub buttons: Option<ButtonPanel>,
    pub preview: PreviewPane,
    pub comment_list: String,
    /// `None` while hidden.
    pub highlight: Option<HighlightBand>,
    pub edit_listener_armed: bool,
    pub typeset: Vec<String>,
}

/// In-memory [`PageView`] that records what it is told to render.
#[derive(Debug)]
pub struct RecordingPage {
    pub state: RefCell<PageState>,
    pub form_fields: RefCell<Vec<(String, String)>>,
    pub viewport: RefCell<Viewport>,
    pub geometry: RefCell<BTreeMap<usize, NodeGeometry>>,
}

impl Default for RecordingPage {
    fn default() -> Self {
        RecordingPage {
            state: RefCell::new(PageState::default()),
            form_fields: RefCell::new(vec![
                ("name".to_string(), "Ada".to_string()),
                ("email".to_string(), "ada@example.org".to_string()),
                ("comment".to_string(), "Typo in $x^2$".to_string()),
            ]),
            viewport: RefCell::new(Viewport {
                window_width: 1000.0,
                window_height: 800.0,
                scroll_readings: vec![0.0, 120.0, 0.0],
            }),
            geometry: RefCell::new(BTreeMap::new()),
        }
    }
}

impl PageView for RecordingPage {
    fn set_badge(&self, block: usize, badge: &Badge) {
        self.state.borrow_mut().badges.insert(block, badge.clone());
    }

    fn set_badge_visibility(&self, visibility: CommentVisibility) {
        self.state.borrow_mut().badge_visibility = Some(visibility);
    }

    fn set_toggle_visible(&self, visible: bool) {
        self.state.borrow_mut().toggle_visible = Some(visible);
    }

    fn place_dialog(&self, placement: &DialogPlacement) {
        self.state.borrow_mut().dialog = Some(*placement);
    }

    fn hide_dialog(&self) {
        self.state.borrow_mut().dialog = None;
    }

    fn select_tab(&self, tab: Tab) {
        self.state.borrow_mut().tab = Some(tab);
    }

    fn render_buttons(&self, panel: ButtonPanel) {
        self.state.borrow_mut().buttons = Some(panel);
    }

    fn render_preview(&self, pane: &PreviewPane) {
        self.state.borrow_mut().preview = pane.clone();
    }

    fn set_comment_list(&self, html: &str) {
        self.state.borrow_mut().comment_list = html.to_string();
    }

    fn place_highlight(&self, band: &HighlightBand) {
        self.state.borrow_mut().highlight = Some(*band);
    }

    fn hide_highlight(&self) {
        self.state.borrow_mut().highlight = None;
    }

    fn arm_edit_listener(&self) {
        self.state.borrow_mut().edit_listener_armed = true;
    }

    fn disarm_edit_listener(&self) {
        self.state.borrow_mut().edit_listener_armed = false;
    }

    fn typeset_math(&self, element_id: &str) {
        self.state.borrow_mut().typeset.push(element_id.to_string());
    }

    fn comment_form_fields(&self) -> Vec<(String, String)> {
        self.form_fields.borrow().clone()
    }

    fn viewport(&self) -> Viewport {
        self.viewport.borrow().clone()
    }

    fn measure_block(&self, block: usize) -> Option<NodeGeometry> {
        self.geometry.borrow().get(&block).copied()
    }
}

/// [`Transport`] answering from a queue of scripted replies, recording every request.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    replies: RefCell<VecDeque<Result<Reply, UcommentError>>>,
    pub requests: RefCell<Vec<FormRequest>>,
}

#[allow(dead_code)]
impl ScriptedTransport {
    pub fn reply(&self, reply: Reply) -> &Self {
        self.replies.borrow_mut().push_back(Ok(reply));
        self
    }

    pub fn fail(&self, error: UcommentError) -> &Self {
        self.replies.borrow_mut().push_back(Err(error));
        self
    }

    pub fn last_request(&self) -> Option<FormRequest> {
        self.requests.borrow().last().cloned()
    }
}

impl Transport for ScriptedTransport {
    async fn post(&self, request: FormRequest) -> Result<Reply, UcommentError> {
        tracing::debug!("scripted POST {}", request.url);
        self.requests.borrow_mut().push(request);
        self.replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(UcommentError::Transport("no scripted reply".to_string())))
    }
}
