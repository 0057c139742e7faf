use enumset::EnumSet;
use std::cell::RefCell;
use wasm_bindgen::{prelude::*, JsCast};
use web_sys::{
    Document, Element, HtmlButtonElement, HtmlElement, HtmlFormElement, HtmlInputElement,
    HtmlSelectElement, HtmlTextAreaElement,
};

use super::{html_element_by_id, page_xy, px, select_all, set_page_xy, window};
use crate::{
    blocks::NodeGeometry,
    cookie::CommentVisibility,
    dialog::{Button, ButtonPanel, DialogPlacement, PreviewPane, Tab, Viewport},
    error::UcommentError,
    indicator::{Badge, HighlightBand, HIGHLIGHT_OPACITY},
    markup::{
        COMMENT_FORM_ID, COMMENT_LIST_ID, COMMENT_TEXT_ID, DIALOG_CONTAINER_ID, DIALOG_TABS_ID,
        ERROR_CLASS, HAS_COMMENTS_CLASS, HIGHLIGHT_ID, INDICATOR_CLASS, PREVIEW_BOX_ID,
        SHOW_HIDE_CLASS, TAB_CLASS, TAB_PANEL_CLASS, TAB_SELECTED_CLASS,
    },
    page::PageView,
};

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(catch, js_namespace = ["MathJax", "Hub"], js_name = Queue)]
    fn mathjax_queue(job: &JsValue) -> Result<JsValue, JsValue>;
}

/// The live page behind a [`PageView`].
///
/// Block indices are those of the session's `BlockIndex`: `indicators[i]` and `nodes[i]` belong
/// to block `i`.
pub struct DomPage {
    document: Document,
    indicators: Vec<HtmlElement>,
    nodes: Vec<HtmlElement>,
    dialog: HtmlElement,
    highlight: HtmlElement,
    preview_box: HtmlElement,
    comment_text: HtmlElement,
    comment_list: HtmlElement,
    form: HtmlFormElement,
    /// Tab strip items and their panels, in [`Tab::index`] order.
    tabs: Vec<(HtmlElement, Option<HtmlElement>)>,
    edit_listener: RefCell<Option<js_sys::Function>>,
}

impl DomPage {
    pub fn attach(
        document: &Document,
        indicators: Vec<HtmlElement>,
        nodes: Vec<HtmlElement>,
    ) -> Result<DomPage, UcommentError> {
        let form = document
            .get_element_by_id(COMMENT_FORM_ID)
            .ok_or_else(|| UcommentError::NotFound(format!("#{COMMENT_FORM_ID}")))?
            .dyn_into::<HtmlFormElement>()
            .map_err(|_| UcommentError::Dom(format!("#{COMMENT_FORM_ID} is not a form")))?;
        let page = DomPage {
            document: document.clone(),
            indicators,
            nodes,
            dialog: html_element_by_id(document, DIALOG_CONTAINER_ID)?,
            highlight: html_element_by_id(document, HIGHLIGHT_ID)?,
            preview_box: html_element_by_id(document, PREVIEW_BOX_ID)?,
            comment_text: html_element_by_id(document, COMMENT_TEXT_ID)?,
            comment_list: html_element_by_id(document, COMMENT_LIST_ID)?,
            form,
            tabs: render_tab_view(document)?,
            edit_listener: RefCell::new(None),
        };
        page.hide_highlight();
        page.hide_dialog();
        Ok(page)
    }

    pub fn indicators(&self) -> &[HtmlElement] {
        &self.indicators
    }

    pub fn dialog_element(&self) -> &HtmlElement {
        &self.dialog
    }

    /// Callback attached to the comment text by [`PageView::arm_edit_listener`].
    pub fn set_edit_listener(&self, listener: js_sys::Function) {
        *self.edit_listener.borrow_mut() = Some(listener);
    }

    fn try_set_badge(&self, block: usize, badge: &Badge) -> Result<(), UcommentError> {
        let indicator = self
            .indicators
            .get(block)
            .ok_or_else(|| UcommentError::NotFound(format!("indicator {block}")))?;
        let badge_span = match indicator.first_element_child() {
            Some(span) => span,
            None => {
                let span = self.document.create_element("span")?;
                indicator.append_child(&span)?;
                span
            }
        };
        badge_span.set_text_content(Some(&badge.text));
        if badge.has_comments {
            indicator.class_list().add_1(HAS_COMMENTS_CLASS)?;
        } else {
            indicator.class_list().remove_1(HAS_COMMENTS_CLASS)?;
        }
        Ok(())
    }

    fn try_set_badge_visibility(&self, visibility: CommentVisibility) -> Result<(), UcommentError> {
        let badges: Vec<HtmlElement> =
            select_all(&self.document, &format!(".{INDICATOR_CLASS} span"))?;
        for badge in badges {
            badge
                .style()
                .set_property("display", visibility.badge_display())?;
        }
        let toggles: Vec<Element> = select_all(&self.document, &format!(".{SHOW_HIDE_CLASS}"))?;
        let label = format!("<a href=\"#\">{}</a>", visibility.toggle_label());
        for toggle in toggles {
            toggle.set_inner_html(&label);
        }
        Ok(())
    }

    fn try_set_toggle_visible(&self, visible: bool) -> Result<(), UcommentError> {
        let toggles: Vec<HtmlElement> =
            select_all(&self.document, &format!(".{SHOW_HIDE_CLASS}"))?;
        for toggle in toggles {
            toggle
                .style()
                .set_property("visibility", if visible { "visible" } else { "hidden" })?;
        }
        Ok(())
    }

    fn try_place_dialog(&self, placement: &DialogPlacement) -> Result<(), UcommentError> {
        let style = self.dialog.style();
        style.set_property("display", "block")?;
        set_page_xy(&self.dialog, placement.x, placement.y)?;
        style.set_property("width", &px(placement.width))?;
        style.set_property("height", &px(placement.height))?;
        Ok(())
    }

    fn try_select_tab(&self, tab: Tab) -> Result<(), UcommentError> {
        for (i, (item, panel)) in self.tabs.iter().enumerate() {
            let selected = i == tab.index();
            if selected {
                item.class_list().add_1(TAB_SELECTED_CLASS)?;
            } else {
                item.class_list().remove_1(TAB_SELECTED_CLASS)?;
            }
            if let Some(panel) = panel {
                panel
                    .style()
                    .set_property("display", if selected { "block" } else { "none" })?;
            }
        }
        Ok(())
    }

    fn try_render_buttons(&self, panel: ButtonPanel) -> Result<(), UcommentError> {
        for button in EnumSet::<Button>::all() {
            let element = html_element_by_id(&self.document, button.element_id())?;
            if let Some(html_button) = element.dyn_ref::<HtmlButtonElement>() {
                html_button.set_disabled(!panel.enabled.contains(button));
            }
            let visibility = if panel.visible.contains(button) {
                "visible"
            } else {
                "hidden"
            };
            element.style().set_property("visibility", visibility)?;
        }
        Ok(())
    }

    fn try_render_preview(&self, pane: &PreviewPane) -> Result<(), UcommentError> {
        self.preview_box.set_inner_html(pane.html());
        if pane.is_error() {
            self.preview_box.class_list().add_1(ERROR_CLASS)?;
        } else {
            self.preview_box.class_list().remove_1(ERROR_CLASS)?;
        }
        self.preview_box
            .style()
            .set_property("height", &px(self.comment_text.offset_height() as f64))?;
        Ok(())
    }

    fn try_place_highlight(&self, band: &HighlightBand) -> Result<(), UcommentError> {
        let style = self.highlight.style();
        style.set_property("visibility", "visible")?;
        style.set_property("display", "block")?;
        style.set_property("opacity", &HIGHLIGHT_OPACITY.to_string())?;
        style.set_property("width", &px(band.width))?;
        style.set_property("height", &px(band.height))?;
        set_page_xy(&self.highlight, band.x, band.y)
    }

    fn try_set_edit_listening(&self, listening: bool) -> Result<(), UcommentError> {
        let listener = self.edit_listener.borrow();
        let Some(listener) = listener.as_ref() else {
            return Err(UcommentError::Dom("edit listener not installed".to_string()));
        };
        for event in ["keydown", "click"] {
            if listening {
                self.comment_text
                    .add_event_listener_with_callback(event, listener)?;
            } else {
                self.comment_text
                    .remove_event_listener_with_callback(event, listener)?;
            }
        }
        Ok(())
    }

    fn try_typeset_math(&self, element_id: &str) -> Result<(), UcommentError> {
        let global = js_sys::global();
        let mathjax = js_sys::Reflect::get(&global, &JsValue::from_str("MathJax"))?;
        if mathjax.is_undefined() {
            return Err(UcommentError::NotFound("MathJax".to_string()));
        }
        let hub = js_sys::Reflect::get(&mathjax, &JsValue::from_str("Hub"))?;
        let job = js_sys::Array::of3(&JsValue::from_str("Typeset"), &hub, &element_id.into());
        mathjax_queue(&job)?;
        Ok(())
    }

    fn try_viewport(&self) -> Result<Viewport, UcommentError> {
        let window = window()?;
        let dimension = |value: Result<JsValue, JsValue>| {
            value.ok().and_then(|v| v.as_f64()).unwrap_or(0.0)
        };
        let mut scroll_readings = Vec::with_capacity(3);
        if let Some(root) = self.document.document_element() {
            scroll_readings.push(root.scroll_top() as f64);
        }
        scroll_readings.push(window.page_y_offset().unwrap_or(0.0));
        if let Some(body) = self.document.body() {
            scroll_readings.push(body.scroll_top() as f64);
        }
        Ok(Viewport {
            window_width: dimension(window.inner_width()),
            window_height: dimension(window.inner_height()),
            scroll_readings,
        })
    }
}

/// Mark up the tab view inside the dialog: tab strip items get [`TAB_CLASS`], the panel each
/// item's link points at gets [`TAB_PANEL_CLASS`].
fn render_tab_view(
    document: &Document,
) -> Result<Vec<(HtmlElement, Option<HtmlElement>)>, UcommentError> {
    let links: Vec<HtmlElement> = select_all(document, &format!("#{DIALOG_TABS_ID} ul li a"))?;
    let mut tabs = Vec::with_capacity(links.len());
    for link in links {
        let Some(item) = link
            .parent_element()
            .and_then(|parent| parent.dyn_into::<HtmlElement>().ok())
        else {
            continue;
        };
        item.class_list().add_1(TAB_CLASS)?;
        let panel = link
            .get_attribute("href")
            .as_deref()
            .and_then(Tab::from_href)
            .and_then(|tab| document.get_element_by_id(tab.fragment().trim_start_matches('#')))
            .and_then(|panel| panel.dyn_into::<HtmlElement>().ok());
        if let Some(panel) = &panel {
            panel.class_list().add_1(TAB_PANEL_CLASS)?;
        }
        tabs.push((item, panel));
    }
    tracing::debug!("Rendered dialog tab view with {} tabs", tabs.len());
    Ok(tabs)
}

fn report(what: &str, result: Result<(), UcommentError>) {
    if let Err(e) = result {
        tracing::warn!("{what} failed: {e}");
    }
}

impl PageView for DomPage {
    fn set_badge(&self, block: usize, badge: &Badge) {
        report("set_badge", self.try_set_badge(block, badge));
    }

    fn set_badge_visibility(&self, visibility: CommentVisibility) {
        report(
            "set_badge_visibility",
            self.try_set_badge_visibility(visibility),
        );
    }

    fn set_toggle_visible(&self, visible: bool) {
        report("set_toggle_visible", self.try_set_toggle_visible(visible));
    }

    fn place_dialog(&self, placement: &DialogPlacement) {
        report("place_dialog", self.try_place_dialog(placement));
    }

    fn hide_dialog(&self) {
        report(
            "hide_dialog",
            self.dialog
                .style()
                .set_property("display", "none")
                .map_err(UcommentError::from),
        );
    }

    fn select_tab(&self, tab: Tab) {
        report("select_tab", self.try_select_tab(tab));
    }

    fn render_buttons(&self, panel: ButtonPanel) {
        report("render_buttons", self.try_render_buttons(panel));
    }

    fn render_preview(&self, pane: &PreviewPane) {
        report("render_preview", self.try_render_preview(pane));
    }

    fn set_comment_list(&self, html: &str) {
        self.comment_list.set_inner_html(html);
    }

    fn place_highlight(&self, band: &HighlightBand) {
        report("place_highlight", self.try_place_highlight(band));
    }

    fn hide_highlight(&self) {
        let style = self.highlight.style();
        report(
            "hide_highlight",
            style
                .set_property("display", "none")
                .and_then(|_| style.set_property("visibility", "hidden"))
                .map_err(UcommentError::from),
        );
    }

    fn arm_edit_listener(&self) {
        report("arm_edit_listener", self.try_set_edit_listening(true));
    }

    fn disarm_edit_listener(&self) {
        report("disarm_edit_listener", self.try_set_edit_listening(false));
    }

    fn typeset_math(&self, element_id: &str) {
        report("typeset_math", self.try_typeset_math(element_id));
    }

    fn comment_form_fields(&self) -> Vec<(String, String)> {
        let controls = self.form.elements();
        let mut fields = Vec::with_capacity(controls.length() as usize);
        for control in (0..controls.length()).filter_map(|i| controls.item(i)) {
            let field = if let Some(input) = control.dyn_ref::<HtmlInputElement>() {
                match input.type_().as_str() {
                    "button" | "submit" | "reset" | "file" | "image" => None,
                    "checkbox" | "radio" if !input.checked() => None,
                    _ => Some((input.name(), input.value())),
                }
            } else if let Some(text) = control.dyn_ref::<HtmlTextAreaElement>() {
                Some((text.name(), text.value()))
            } else {
                control
                    .dyn_ref::<HtmlSelectElement>()
                    .map(|select| (select.name(), select.value()))
            };
            if let Some((name, value)) = field.filter(|(name, _)| !name.is_empty()) {
                fields.push((name, value));
            }
        }
        fields
    }

    fn viewport(&self) -> Viewport {
        self.try_viewport().unwrap_or_else(|e| {
            tracing::warn!("viewport failed: {e}");
            Viewport::default()
        })
    }

    fn measure_block(&self, block: usize) -> Option<NodeGeometry> {
        let node = self.nodes.get(block)?;
        if !node.is_connected() {
            return None;
        }
        Some(NodeGeometry {
            top: page_xy(node).1,
            height: node.offset_height() as f64,
        })
    }
}
