//! The UI session: every piece of widget state, owned by the bootstrap routine and handed to
//! event handlers by reference.
//!
//! Each asynchronous operation is split in two around the transport call:
//!
//! 1. `begin_*` mutates the session, issues a [`Ticket`] for the operation's channel and returns
//!    the [`FormRequest`] to send;
//! 2. `finish_*` applies the [`Reply`], provided the ticket is still current.
//!
//! The free functions at the bottom ([`fetch_counts`], [`open_comment_block`], [`preview`],
//! [`submit`]) drive both halves against a [`Transport`], releasing the `RefCell` borrow while
//! the request is in flight so other handlers can run.

use enumset::EnumSet;
use std::cell::RefCell;
use url::Url;

use crate::{
    blocks::BlockIndex,
    config::WidgetConfig,
    cookie::{CommentVisibility, CookieJar, PreferenceStore},
    counts::{decode_counts_lenient, CommentCounts},
    dialog::{CommentDialog, FormOutcome, Tab},
    error::UcommentError,
    indicator::{self, ContentColumn, MarkerPlacement},
    markup::{COMMENT_LIST_ID, COMMENT_ROOT_FIELD, ORDER_FIELD, PAGE_NAME_FIELD, PREVIEW_BOX_ID},
    page::PageView,
    transport::{
        Channel, Endpoint, FormRequest, Reply, RequestGenerations, Ticket, TimeoutPolicy,
        Transport, Verdict, JS_COMMENT_REQUEST_HEADER,
    },
};

/// Page measurements taken once at initialization.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PageLayout {
    /// Shared x of every indicator.
    pub margin_x: f64,
    pub column: ContentColumn,
    pub dialog_width: f64,
    pub dialog_height: f64,
}

#[derive(Debug)]
pub struct UiSession<J: CookieJar> {
    config: WidgetConfig,
    origin: Url,
    page_name: String,
    blocks: BlockIndex,
    counts: CommentCounts,
    dialog: CommentDialog,
    layout: PageLayout,
    timeouts: TimeoutPolicy,
    generations: RequestGenerations,
    preferences: PreferenceStore<J>,
    visibility: CommentVisibility,
}

impl<J: CookieJar> UiSession<J> {
    /// `origin` is the URL of the current page; `page_name` its path as sent to the server.
    pub fn new(
        config: WidgetConfig,
        origin: Url,
        page_name: impl Into<String>,
        blocks: BlockIndex,
        layout: PageLayout,
        jar: J,
    ) -> Result<UiSession<J>, UcommentError> {
        config.validate()?;
        let preferences =
            PreferenceStore::new(jar, config.cookie_name.clone(), config.cookie_path.clone());
        let visibility = preferences.load();
        let timeouts = TimeoutPolicy::new(config.request_timeout(), config.timeout_increment());
        let counts = CommentCounts::seeded(&blocks);
        Ok(UiSession {
            dialog: CommentDialog::new(layout.dialog_width, layout.dialog_height),
            config,
            origin,
            page_name: page_name.into(),
            blocks,
            counts,
            layout,
            timeouts,
            generations: RequestGenerations::default(),
            preferences,
            visibility,
        })
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    pub fn blocks(&self) -> &BlockIndex {
        &self.blocks
    }

    pub fn counts(&self) -> &CommentCounts {
        &self.counts
    }

    pub fn dialog(&self) -> &CommentDialog {
        &self.dialog
    }

    pub fn timeouts(&self) -> &TimeoutPolicy {
        &self.timeouts
    }

    pub fn visibility(&self) -> CommentVisibility {
        self.visibility
    }

    pub fn preferences(&self) -> &PreferenceStore<J> {
        &self.preferences
    }

    pub fn page_name(&self) -> &str {
        &self.page_name
    }

    pub fn endpoint_url(&self, endpoint: Endpoint) -> Result<Url, UcommentError> {
        self.config.endpoint_url(&self.origin, endpoint)
    }

    /// Where each block's indicator goes, in block order.
    pub fn marker_placements(&self) -> Vec<MarkerPlacement> {
        self.blocks
            .iter()
            .map(|block| indicator::place_marker(self.layout.margin_x, block.geometry))
            .collect()
    }

    fn request(&mut self, endpoint: Endpoint) -> Result<(Ticket, FormRequest), UcommentError> {
        let channel = endpoint.channel().ok_or_else(|| {
            UcommentError::Transport(format!("{endpoint:?} is not requested by the widget"))
        })?;
        let url = self.endpoint_url(endpoint)?;
        let ticket = self.generations.issue(channel);
        let request = FormRequest::new(endpoint, url, self.timeouts.timeout_for(endpoint));
        Ok((ticket, request))
    }

    fn is_current(&self, ticket: &Ticket, reply: &Reply) -> bool {
        tracing::debug!(
            "Completion for {:?} #{}: HTTP status {} ({})",
            ticket.channel(),
            ticket.generation(),
            reply.status,
            reply.status_text
        );
        let current = self.generations.is_current(ticket);
        if !current {
            tracing::debug!(
                "Dropping stale {:?} reply #{}",
                ticket.channel(),
                ticket.generation()
            );
        }
        current
    }

    pub fn begin_counts(&mut self) -> Result<(Ticket, FormRequest), UcommentError> {
        let fields = self.counts.request_fields(&self.page_name);
        let (ticket, request) = self.request(Endpoint::Counts)?;
        tracing::info!("Requesting comment counts for {} nodes", self.blocks.len());
        Ok((ticket, request.fields(fields)))
    }

    /// Decode the counts reply, update the indicators, then apply the stored show/hide
    /// preference. A timed out reply leaves the indicators untouched.
    pub fn finish_counts<V: PageView>(&mut self, ticket: Ticket, reply: &Reply, view: &V) {
        if !self.is_current(&ticket, reply) || reply.is_timeout() {
            return;
        }
        let decoded = decode_counts_lenient(reply.body.as_deref());
        self.counts.merge(&decoded);
        let update = indicator::plan_counts_update(&self.blocks, &decoded);
        for (idx, badge) in &update.badges {
            if let Some(block) = self.blocks.get_mut(*idx) {
                block.has_comments = badge.has_comments;
                block.count = self.counts.get(block.target.root.as_str());
            }
            view.set_badge(*idx, badge);
        }
        if !update.show_toggle_visible() {
            view.set_toggle_visible(false);
        }
        let visibility = self.preferences.load();
        self.apply_visibility(visibility, view);
    }

    /// Show or hide all badges and persist the choice.
    pub fn apply_visibility<V: PageView>(&mut self, visibility: CommentVisibility, view: &V) {
        self.visibility = visibility;
        self.preferences.store(visibility);
        view.set_badge_visibility(visibility);
    }

    /// A show/hide control was clicked; `label` is the text it carried.
    pub fn toggle_clicked<V: PageView>(&mut self, label: &str, view: &V) {
        match CommentVisibility::from_toggle_label(label) {
            Some(shown_state) => self.apply_visibility(shown_state.toggled(), view),
            None => tracing::debug!("Ignoring show/hide click on '{label}'"),
        }
    }

    /// Open the dialog on the block with `root`.
    ///
    /// Returns the comment HTML request to send, or `None` when no block has that root.
    pub fn open_block<V: PageView>(
        &mut self,
        root: &str,
        view: &V,
    ) -> Result<Option<(Ticket, FormRequest)>, UcommentError> {
        let Some(idx) = self.blocks.index_of(root) else {
            tracing::debug!("Click on unknown comment root '{root}' ignored");
            return Ok(None);
        };
        self.generations.invalidate(dialog_channels());
        let Some(block) = self.blocks.get(idx) else {
            return Ok(None);
        };
        let (root, geometry, has_comments) =
            (block.root().clone(), block.geometry, block.has_comments);

        view.place_highlight(&self.layout.column.band_over(geometry));
        let placement = self.dialog.show(idx, has_comments, &view.viewport());
        view.place_dialog(&placement);
        self.render_dialog(view);

        let (ticket, request) = self.request(Endpoint::CommentHtml)?;
        let request = request
            .field(COMMENT_ROOT_FIELD, root.as_str())
            .field(ORDER_FIELD, self.config.comment_order.as_str());
        tracing::info!("Requesting comment HTML for '{root}'");
        Ok(Some((ticket, request)))
    }

    pub fn finish_comment_html<V: PageView>(&mut self, ticket: Ticket, reply: &Reply, view: &V) {
        if !self.is_current(&ticket, reply) || reply.is_timeout() {
            return;
        }
        view.set_comment_list(reply.body_text());
        if self.config.use_mathjax {
            view.typeset_math(COMMENT_LIST_ID);
        }
    }

    /// Switch tabs. Entering the post tab starts a fresh draft, so a pending form reply goes stale.
    pub fn select_tab<V: PageView>(&mut self, tab: Tab, view: &V) {
        let was_armed = self.dialog.edit_listener_armed();
        if tab == Tab::Post {
            self.generations.invalidate(Channel::Form.into());
        }
        self.dialog.select_tab(tab);
        if was_armed && !self.dialog.edit_listener_armed() {
            view.disarm_edit_listener();
        }
        self.render_dialog(view);
    }

    /// Hide the dialog and the highlight band; pending form and comment HTML replies go stale.
    pub fn close<V: PageView>(&mut self, view: &V) {
        let previous = self.dialog.close();
        tracing::debug!("Dialog closed (active block was {:?})", previous);
        self.generations.invalidate(dialog_channels());
        view.hide_highlight();
        view.hide_dialog();
    }

    pub fn begin_preview<V: PageView>(
        &mut self,
        view: &V,
    ) -> Result<(Ticket, FormRequest), UcommentError> {
        let fields = view.comment_form_fields();
        let (ticket, request) = self.request(Endpoint::Preview)?;
        self.dialog.draft_sent(fields.clone());
        tracing::info!("Requesting comment preview");
        Ok((
            ticket,
            request
                .fields(fields)
                .header(JS_COMMENT_REQUEST_HEADER, "True")?,
        ))
    }

    pub fn begin_submit<V: PageView>(
        &mut self,
        view: &V,
    ) -> Result<(Ticket, FormRequest), UcommentError> {
        let root = self
            .dialog
            .active_block()
            .and_then(|idx| self.blocks.get(idx))
            .map(|block| block.root().clone())
            .ok_or_else(|| UcommentError::NotFound("no active comment block".to_string()))?;
        let fields = view.comment_form_fields();
        let (ticket, request) = self.request(Endpoint::Submit)?;
        tracing::info!("Submitting comment on '{root}'");
        Ok((
            ticket,
            request
                .fields(fields)
                .field(COMMENT_ROOT_FIELD, root.as_str())
                .field(PAGE_NAME_FIELD, self.page_name.clone())
                .header(JS_COMMENT_REQUEST_HEADER, "True")?,
        ))
    }

    /// Apply a preview or submission reply.
    pub fn finish_form<V: PageView>(&mut self, ticket: Ticket, reply: &Reply, view: &V) {
        if !self.is_current(&ticket, reply) {
            return;
        }
        if reply.is_timeout() {
            self.timeouts.bump_form();
            let message = UcommentError::Timeout(format!("{:?}", ticket.channel()))
                .user_message(&self.config.post_comment_failure);
            self.dialog.show_error(&message);
            self.render_dialog(view);
            return;
        }
        let verdict = reply.verdict();
        if verdict == Verdict::PreviewOk
            && !self.dialog.draft_unchanged(&view.comment_form_fields())
        {
            tracing::debug!("Comment changed while its preview was pending");
            self.dialog.show_outdated_preview(reply.body_text());
            if self.config.use_mathjax {
                view.typeset_math(PREVIEW_BOX_ID);
            }
            self.render_dialog(view);
            return;
        }
        match self.dialog.apply_verdict(&verdict, reply.body_text()) {
            FormOutcome::Previewed => {
                view.arm_edit_listener();
                if self.config.use_mathjax {
                    view.typeset_math(PREVIEW_BOX_ID);
                }
            }
            FormOutcome::Submitted => view.disarm_edit_listener(),
            FormOutcome::Rejected | FormOutcome::Ignored => {}
        }
        self.render_dialog(view);
    }

    /// The form request could not be issued at all.
    pub fn form_failed<V: PageView>(&mut self, ticket: Ticket, error: &UcommentError, view: &V) {
        if !self.generations.is_current(&ticket) {
            return;
        }
        tracing::warn!("Comment form request failed: {error}");
        self.dialog
            .show_error(&error.user_message(&self.config.post_comment_failure));
        self.render_dialog(view);
    }

    /// Keydown or click in the comment text after a successful preview.
    pub fn comment_edited<V: PageView>(&mut self, view: &V) {
        if self.dialog.comment_edited() {
            view.disarm_edit_listener();
            self.render_dialog(view);
        }
    }

    pub fn drag_ended<V: PageView>(&mut self, x: f64, y: f64, view: &V) {
        self.dialog.drag_ended(x, y);
        self.refresh_highlight(view);
    }

    pub fn window_resized<V: PageView>(&mut self, view: &V) {
        self.refresh_highlight(view);
    }

    /// Re-measure the active block and move the highlight band over it.
    fn refresh_highlight<V: PageView>(&mut self, view: &V) {
        let Some(idx) = self.dialog.active_block() else {
            return;
        };
        if let Some(geometry) = view.measure_block(idx) {
            self.blocks.refresh_geometry(idx, geometry);
        }
        if let Some(block) = self.blocks.get(idx) {
            view.place_highlight(&self.layout.column.band_over(block.geometry));
        }
    }

    fn render_dialog<V: PageView>(&self, view: &V) {
        view.select_tab(self.dialog.tab());
        view.render_buttons(self.dialog.buttons());
        view.render_preview(self.dialog.pane());
    }
}

/// Send the batched counts request and apply its reply.
pub async fn fetch_counts<J, T, V>(
    session: &RefCell<UiSession<J>>,
    transport: &T,
    view: &V,
) -> Result<(), UcommentError>
where
    J: CookieJar,
    T: Transport,
    V: PageView,
{
    let (ticket, request) = session.borrow_mut().begin_counts()?;
    let reply = transport.post(request).await?;
    session.borrow_mut().finish_counts(ticket, &reply, view);
    Ok(())
}

/// Open the dialog on `root` and load the block's existing comments.
pub async fn open_comment_block<J, T, V>(
    session: &RefCell<UiSession<J>>,
    transport: &T,
    view: &V,
    root: &str,
) -> Result<(), UcommentError>
where
    J: CookieJar,
    T: Transport,
    V: PageView,
{
    let Some((ticket, request)) = session.borrow_mut().open_block(root, view)? else {
        return Ok(());
    };
    let reply = transport.post(request).await?;
    session
        .borrow_mut()
        .finish_comment_html(ticket, &reply, view);
    Ok(())
}

pub async fn preview<J, T, V>(
    session: &RefCell<UiSession<J>>,
    transport: &T,
    view: &V,
) -> Result<(), UcommentError>
where
    J: CookieJar,
    T: Transport,
    V: PageView,
{
    let (ticket, request) = session.borrow_mut().begin_preview(view)?;
    send_form(session, transport, view, ticket, request).await
}

pub async fn submit<J, T, V>(
    session: &RefCell<UiSession<J>>,
    transport: &T,
    view: &V,
) -> Result<(), UcommentError>
where
    J: CookieJar,
    T: Transport,
    V: PageView,
{
    let (ticket, request) = session.borrow_mut().begin_submit(view)?;
    send_form(session, transport, view, ticket, request).await
}

async fn send_form<J, T, V>(
    session: &RefCell<UiSession<J>>,
    transport: &T,
    view: &V,
    ticket: Ticket,
    request: FormRequest,
) -> Result<(), UcommentError>
where
    J: CookieJar,
    T: Transport,
    V: PageView,
{
    match transport.post(request).await {
        Ok(reply) => {
            session.borrow_mut().finish_form(ticket, &reply, view);
            Ok(())
        }
        Err(error) => {
            session.borrow_mut().form_failed(ticket, &error, view);
            Err(error)
        }
    }
}

/// Channels made stale by opening or closing the dialog.
fn dialog_channels() -> EnumSet<Channel> {
    Channel::Form | Channel::CommentHtml
}
