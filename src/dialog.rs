//! The comment dialog: a single draggable overlay with post, view and help tabs.
//!
//! ## States
//!
//! ```text
//!            show(block, has_comments = false)          tab click
//!  hidden ────────────────────────────────────▶ post ◀──────────▶ view / help
//!    ▲       show(block, has_comments = true)    │                     │
//!    │  ────────────────────────────────────▶ view                     │
//!    └──────────────── close ───────────────────┴─────────────────────┘
//! ```
//!
//! Closing always clears the active block.
//!
//! ## Buttons
//!
//! The submit, preview and close buttons are not tracked as independent flags. Their enabled
//! and visible sets are derived from the current [`Tab`] and [`CommentPhase`] by
//! [`CommentDialog::buttons`]:
//!
//! | Phase | Visible | Enabled |
//! |---|---|---|
//! | `Drafting` | submit, preview | preview |
//! | `Previewed` | submit, preview | submit |
//! | `Rejected` | submit, preview | preview, unless the edit listener is still armed |
//! | `Submitted` | preview, close | close |
//!
//! The view and help tabs show no buttons at all.

use enumset::{EnumSet, EnumSetType};
use serde::{Deserialize, Serialize};

use crate::transport::Verdict;

/// Smallest x the dialog is centered to.
pub const MIN_DIALOG_X: f64 = 10.0;

#[derive(Debug, EnumSetType, Serialize, Deserialize)]
pub enum Button {
    Submit,
    Preview,
    Close,
}

impl Button {
    pub fn element_id(&self) -> &'static str {
        match self {
            Button::Submit => "ucomment-submit-button",
            Button::Preview => "ucomment-preview-button",
            Button::Close => "ucomment-close-button",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tab {
    #[default]
    Post,
    View,
    Help,
}

impl Tab {
    pub fn fragment(&self) -> &'static str {
        match self {
            Tab::Post => "#post-comments",
            Tab::View => "#view-comments",
            Tab::Help => "#help-comments",
        }
    }

    /// Position of the tab in the tab strip.
    pub fn index(&self) -> usize {
        match self {
            Tab::Post => 0,
            Tab::View => 1,
            Tab::Help => 2,
        }
    }

    /// Tab named by the fragment of a tab link's `href`.
    pub fn from_href(href: &str) -> Option<Tab> {
        let fragment = &href[href.find('#')?..];
        [Tab::Post, Tab::View, Tab::Help]
            .into_iter()
            .find(|tab| tab.fragment() == fragment)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommentPhase {
    #[default]
    Drafting,
    /// The server rendered the current text; it may be submitted.
    Previewed,
    /// The server refused the last preview or submission.
    Rejected,
    Submitted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonPanel {
    pub enabled: EnumSet<Button>,
    pub visible: EnumSet<Button>,
}

/// Content of the preview pane.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PreviewPane {
    #[default]
    Empty,
    Rendered(String),
    Error(String),
    /// Server acknowledgment of a submission.
    Acknowledged(String),
}

impl PreviewPane {
    pub fn html(&self) -> &str {
        match self {
            PreviewPane::Empty => "",
            PreviewPane::Rendered(html)
            | PreviewPane::Error(html)
            | PreviewPane::Acknowledged(html) => html,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, PreviewPane::Error(_))
    }
}

/// Window size and the scroll-position readings browsers disagree on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Viewport {
    pub window_width: f64,
    pub window_height: f64,
    pub scroll_readings: Vec<f64>,
}

impl Viewport {
    /// The first reading that is finite and positive, else `0`.
    pub fn scroll_offset(&self) -> f64 {
        self.scroll_readings
            .iter()
            .copied()
            .find(|reading| reading.is_finite() && *reading > 0.0)
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DialogPlacement {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Outcome of applying a form reply to the dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormOutcome {
    Previewed,
    Rejected,
    Submitted,
    Ignored,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommentDialog {
    visible: bool,
    tab: Tab,
    active: Option<usize>,
    width: f64,
    height: f64,
    position: Option<(f64, f64)>,
    phase: CommentPhase,
    edit_listener_armed: bool,
    pane: PreviewPane,
    /// Form fields of the preview request in flight.
    sent_draft: Option<Vec<(String, String)>>,
}

impl CommentDialog {
    pub fn new(width: f64, height: f64) -> CommentDialog {
        CommentDialog {
            visible: false,
            tab: Tab::Post,
            active: None,
            width,
            height,
            position: None,
            phase: CommentPhase::Drafting,
            edit_listener_armed: false,
            pane: PreviewPane::Empty,
            sent_draft: None,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn tab(&self) -> Tab {
        self.tab
    }

    pub fn active_block(&self) -> Option<usize> {
        self.active
    }

    pub fn phase(&self) -> CommentPhase {
        self.phase
    }

    pub fn pane(&self) -> &PreviewPane {
        &self.pane
    }

    pub fn edit_listener_armed(&self) -> bool {
        self.edit_listener_armed
    }

    /// Show the dialog for `block`.
    ///
    /// Horizontally the dialog is centered on first display and stays where it was afterwards;
    /// vertically it is always centered in the visible part of the window.
    pub fn show(
        &mut self,
        block: usize,
        has_comments: bool,
        viewport: &Viewport,
    ) -> DialogPlacement {
        let x = match self.position {
            Some((x, _)) => x,
            None => ((viewport.window_width - self.width) / 2.0).max(MIN_DIALOG_X),
        };
        let y = (viewport.window_height - self.height).max(0.0) / 2.0 + viewport.scroll_offset();
        self.position = Some((x, y));
        self.visible = true;
        self.active = Some(block);
        self.select_tab(if has_comments { Tab::View } else { Tab::Post });
        tracing::debug!("Dialog shown for block {block} at ({x}, {y}) on {:?}", self.tab);
        DialogPlacement {
            x,
            y,
            width: self.width,
            height: self.height,
        }
    }

    /// Switch tabs without changing visibility. Entering the post tab starts a fresh draft.
    pub fn select_tab(&mut self, tab: Tab) {
        self.tab = tab;
        if tab == Tab::Post {
            self.phase = CommentPhase::Drafting;
            self.edit_listener_armed = false;
            self.pane = PreviewPane::Empty;
            self.sent_draft = None;
        }
    }

    /// Remember the fields a preview request carries.
    pub fn draft_sent(&mut self, fields: Vec<(String, String)>) {
        self.sent_draft = Some(fields);
    }

    /// Whether `current` still holds what the last preview request sent.
    pub fn draft_unchanged(&self, current: &[(String, String)]) -> bool {
        self.sent_draft.as_deref() == Some(current)
    }

    /// Hide the dialog; returns the block that was active.
    pub fn close(&mut self) -> Option<usize> {
        self.visible = false;
        self.active.take()
    }

    pub fn drag_ended(&mut self, x: f64, y: f64) {
        self.position = Some((x, y));
    }

    pub fn buttons(&self) -> ButtonPanel {
        if self.tab != Tab::Post {
            return ButtonPanel {
                enabled: EnumSet::empty(),
                visible: EnumSet::empty(),
            };
        }
        match self.phase {
            CommentPhase::Drafting => ButtonPanel {
                enabled: Button::Preview.into(),
                visible: Button::Submit | Button::Preview,
            },
            CommentPhase::Previewed => ButtonPanel {
                enabled: Button::Submit.into(),
                visible: Button::Submit | Button::Preview,
            },
            CommentPhase::Rejected => ButtonPanel {
                enabled: if self.edit_listener_armed {
                    EnumSet::empty()
                } else {
                    Button::Preview.into()
                },
                visible: Button::Submit | Button::Preview,
            },
            CommentPhase::Submitted => ButtonPanel {
                enabled: Button::Close.into(),
                visible: Button::Preview | Button::Close,
            },
        }
    }

    /// Apply the server's verdict on a preview or submission.
    pub fn apply_verdict(&mut self, verdict: &Verdict, body: &str) -> FormOutcome {
        match verdict {
            Verdict::PreviewOk => {
                self.sent_draft = None;
                self.phase = CommentPhase::Previewed;
                self.edit_listener_armed = true;
                self.pane = PreviewPane::Rendered(body.to_string());
                FormOutcome::Previewed
            }
            Verdict::InvalidInput | Verdict::Exception => {
                self.phase = CommentPhase::Rejected;
                self.pane = PreviewPane::Error(body.to_string());
                FormOutcome::Rejected
            }
            Verdict::Submitted => {
                self.sent_draft = None;
                self.phase = CommentPhase::Submitted;
                self.edit_listener_armed = false;
                self.pane = PreviewPane::Acknowledged(body.to_string());
                FormOutcome::Submitted
            }
            Verdict::Unrecognized(header) => {
                tracing::warn!("Ignoring form reply with verdict header {:?}", header);
                FormOutcome::Ignored
            }
        }
    }

    /// Show a preview of text the user has since edited. Submit stays disabled until the
    /// current text is previewed.
    pub fn show_outdated_preview(&mut self, body: &str) {
        self.sent_draft = None;
        self.phase = CommentPhase::Drafting;
        self.edit_listener_armed = false;
        self.pane = PreviewPane::Rendered(body.to_string());
    }

    /// Show an error without changing the phase.
    pub fn show_error(&mut self, message: &str) {
        self.pane = PreviewPane::Error(message.to_string());
    }

    /// The comment text changed. Acts once per successful preview; returns whether it did.
    pub fn comment_edited(&mut self) -> bool {
        if !self.edit_listener_armed {
            return false;
        }
        self.edit_listener_armed = false;
        if self.phase == CommentPhase::Previewed {
            self.phase = CommentPhase::Drafting;
        }
        self.pane = PreviewPane::Empty;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn viewport() -> Viewport {
        Viewport {
            window_width: 1000.0,
            window_height: 800.0,
            scroll_readings: vec![0.0, 250.0, 0.0],
        }
    }

    #[test]
    fn test_tab_from_href() {
        assert_eq!(
            Tab::from_href("https://docs.example.org/page.html#view-comments"),
            Some(Tab::View)
        );
        assert_eq!(Tab::from_href("#help-comments"), Some(Tab::Help));
        assert_eq!(Tab::from_href("#elsewhere"), None);
        assert_eq!(Tab::from_href("post-comments"), None);
    }

    #[test]
    fn test_scroll_offset_first_non_degenerate() {
        assert_eq!(viewport().scroll_offset(), 250.0);
        let degenerate = Viewport {
            scroll_readings: vec![f64::NAN, -3.0, 0.0],
            ..viewport()
        };
        assert_eq!(degenerate.scroll_offset(), 0.0);
    }

    #[test]
    fn test_first_show_centers_then_reuses_x() {
        let mut dialog = CommentDialog::new(600.0, 400.0);
        let first = dialog.show(0, false, &viewport());
        assert_eq!(first.x, 200.0);
        assert_eq!(first.y, 200.0 + 250.0);

        dialog.close();
        dialog.drag_ended(55.0, 90.0);
        let second = dialog.show(1, false, &viewport());
        assert_eq!(second.x, 55.0);
        assert_eq!(second.y, 450.0);
        assert_eq!((second.width, second.height), (600.0, 400.0));
    }

    #[test]
    fn test_narrow_window_clamps_x() {
        let mut dialog = CommentDialog::new(600.0, 900.0);
        let narrow = Viewport {
            window_width: 500.0,
            window_height: 600.0,
            scroll_readings: vec![],
        };
        let placement = dialog.show(0, false, &narrow);
        assert_eq!(placement.x, MIN_DIALOG_X);
        assert_eq!(placement.y, 0.0);
    }

    #[test]
    fn test_show_selects_tab_from_has_comments() {
        let mut dialog = CommentDialog::new(600.0, 400.0);
        dialog.show(3, true, &viewport());
        assert_eq!(dialog.tab(), Tab::View);
        assert_eq!(dialog.buttons().visible, EnumSet::empty());

        dialog.show(4, false, &viewport());
        assert_eq!(dialog.tab(), Tab::Post);
        assert_eq!(dialog.active_block(), Some(4));
    }

    #[test]
    fn test_close_clears_active_block() {
        let mut dialog = CommentDialog::new(600.0, 400.0);
        dialog.show(2, false, &viewport());
        assert_eq!(dialog.close(), Some(2));
        assert!(!dialog.is_visible());
        assert_eq!(dialog.active_block(), None);
    }

    #[test]
    fn test_preview_edit_cycle() {
        let mut dialog = CommentDialog::new(600.0, 400.0);
        dialog.show(0, false, &viewport());
        assert!(!dialog.buttons().enabled.contains(Button::Submit));
        assert!(dialog.buttons().enabled.contains(Button::Preview));

        let outcome = dialog.apply_verdict(&Verdict::PreviewOk, "<p>Nice</p>");
        assert_eq!(outcome, FormOutcome::Previewed);
        assert_eq!(dialog.buttons().enabled, EnumSet::only(Button::Submit));
        assert_eq!(dialog.pane().html(), "<p>Nice</p>");

        assert!(dialog.comment_edited());
        assert_eq!(dialog.buttons().enabled, EnumSet::only(Button::Preview));
        assert_eq!(dialog.pane(), &PreviewPane::Empty);
        // One-shot per preview cycle.
        assert!(!dialog.comment_edited());
    }

    #[test]
    fn test_rejections_disable_submit() {
        let mut dialog = CommentDialog::new(600.0, 400.0);
        dialog.show(0, false, &viewport());
        dialog.apply_verdict(&Verdict::InvalidInput, "Email address is required");
        assert_eq!(dialog.buttons().enabled, EnumSet::only(Button::Preview));
        assert!(dialog.pane().is_error());

        dialog.apply_verdict(&Verdict::PreviewOk, "<p>ok</p>");
        dialog.apply_verdict(&Verdict::Exception, "An error occurred");
        // Still armed: preview returns only after the next edit.
        assert_eq!(dialog.buttons().enabled, EnumSet::empty());
        assert!(dialog.comment_edited());
        assert_eq!(dialog.buttons().enabled, EnumSet::only(Button::Preview));
    }

    #[test]
    fn test_submission_acknowledged() {
        let mut dialog = CommentDialog::new(600.0, 400.0);
        dialog.show(0, false, &viewport());
        dialog.apply_verdict(&Verdict::PreviewOk, "<p>ok</p>");
        dialog.apply_verdict(&Verdict::Submitted, "Thank you");
        let panel = dialog.buttons();
        assert_eq!(panel.enabled, EnumSet::only(Button::Close));
        assert!(panel.visible.contains(Button::Close));
        assert!(!panel.visible.contains(Button::Submit));
        assert_eq!(dialog.pane(), &PreviewPane::Acknowledged("Thank you".into()));
        assert!(!dialog.edit_listener_armed());
    }

    #[test]
    fn test_post_tab_resets_draft() {
        let mut dialog = CommentDialog::new(600.0, 400.0);
        dialog.show(0, false, &viewport());
        dialog.apply_verdict(&Verdict::PreviewOk, "<p>ok</p>");
        dialog.select_tab(Tab::Help);
        assert_eq!(dialog.buttons().enabled, EnumSet::empty());
        dialog.select_tab(Tab::Post);
        assert_eq!(dialog.phase(), CommentPhase::Drafting);
        assert_eq!(dialog.pane(), &PreviewPane::Empty);
        assert!(dialog.is_visible());
    }

    #[test]
    fn test_close_button_is_a_close_control() {
        let close_button = format!("#{}", Button::Close.element_id());
        assert!(crate::markup::DIALOG_CLOSE_SELECTOR
            .split(',')
            .any(|selector| selector.trim() == close_button));
    }

    #[test]
    fn test_outdated_preview_leaves_submit_disabled() {
        let mut dialog = CommentDialog::new(600.0, 400.0);
        dialog.show(0, false, &viewport());
        let sent = vec![("comment".to_string(), "first".to_string())];
        dialog.draft_sent(sent.clone());
        assert!(dialog.draft_unchanged(&sent));
        assert!(!dialog.draft_unchanged(&[("comment".to_string(), "second".to_string())]));

        dialog.show_outdated_preview("<p>first</p>");
        assert_eq!(dialog.phase(), CommentPhase::Drafting);
        assert_eq!(dialog.buttons().enabled, EnumSet::only(Button::Preview));
        assert!(!dialog.edit_listener_armed());
        assert!(!dialog.draft_unchanged(&sent));
    }

    #[test]
    fn test_unrecognized_verdict_changes_nothing() {
        let mut dialog = CommentDialog::new(600.0, 400.0);
        dialog.show(0, false, &viewport());
        let before = dialog.clone();
        assert_eq!(
            dialog.apply_verdict(&Verdict::Unrecognized(None), "??"),
            FormOutcome::Ignored
        );
        assert_eq!(dialog, before);
    }
}
