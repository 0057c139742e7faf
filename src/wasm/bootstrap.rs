//! Page initialization and event wiring.
//!
//! Initialization order follows what the page needs measured before it is modified: image
//! heights are released first, then the margin column, content column and dialog size are
//! read, and only then are indicators appended to the commentable nodes.

use std::{
    cell::{Cell, RefCell},
    future::Future,
    rc::Rc,
};
use url::Url;
use wasm_bindgen::{prelude::*, JsCast};
use wasm_bindgen_futures::spawn_local;
use web_sys::{
    console, Document, Element, Event, EventTarget, HtmlElement,
    HtmlFormElement, MouseEvent,
};

use super::{
    computed_pixels, document, html_element_by_id, page_xy, px, select_all, set_page_xy, window,
    DocumentCookieJar, DomPage, XhrTransport,
};
use crate::{
    blocks::{BlockIndex, CommentableTarget, NodeGeometry, NodeKind, TargetHost},
    config::WidgetConfig,
    dialog::{Button, Tab},
    error::UcommentError,
    indicator::{indicator_id, margin_column, root_from_indicator_id, ContentColumn},
    markup::{
        BORDER_ID, COMMENT_FORM_ID, CONTENT_MAIN_ID, DIALOG_CLOSE_SELECTOR, DIALOG_CONTAINER_ID,
        DIALOG_HEADER_ID, DIALOG_TABS_ID, HELP_LINK_ID, INDICATOR_CLASS, POST_LINK_ID,
        SEARCH_FORM_ID, SHOW_HIDE_CLASS, TOC_EXPANDER_ITEM_CLASS, TOC_LEVEL1_CLASS,
        TOC_TOGGLE_CLASS,
    },
    page::PageView,
    session::{self, PageLayout, UiSession},
    toc::{plan_accordion, AccordionSection, TocEntry},
    transport::Endpoint,
};

/// Everything an event handler needs; shared by every listener for the lifetime of the page.
struct Widget {
    session: RefCell<UiSession<DocumentCookieJar>>,
    page: Rc<DomPage>,
    transport: XhrTransport,
}

/// Initialize the widget on the current page.
///
/// `config` is a plain object with any of the [`WidgetConfig`] keys, or `undefined`.
///
/// # JavaScript Example
/// ```javascript,ignore
/// start({ use_mathjax: false, use_toc_accordion: true });
/// ```
#[wasm_bindgen]
pub fn start(config: JsValue) -> Result<(), JsValue> {
    if tracing_wasm::try_set_as_global_default().is_err() {
        console::warn_1(&"⚠️ tracing subscriber already installed".into());
    }
    let config = widget_config(config).map_err(|e| {
        let msg = format!("Invalid ucomment configuration: {e}");
        console::error_1(&msg.clone().into());
        JsValue::from_str(&msg)
    })?;
    let document = document()?;
    if document.ready_state() == "loading" {
        let on_ready = Closure::once_into_js(move || report_start(initialize(config)));
        document.add_event_listener_with_callback("DOMContentLoaded", on_ready.unchecked_ref())?;
        Ok(())
    } else {
        initialize(config).map_err(|e| {
            console::error_1(&format!("ucomment initialization failed: {e}").into());
            JsValue::from(e)
        })
    }
}

fn widget_config(value: JsValue) -> Result<WidgetConfig, UcommentError> {
    if value.is_undefined() || value.is_null() {
        return Ok(WidgetConfig::default());
    }
    Ok(serde_wasm_bindgen::from_value(value)?)
}

fn report_start(result: Result<(), UcommentError>) {
    if let Err(e) = result {
        console::error_1(&format!("ucomment initialization failed: {e}").into());
    }
}

fn initialize(config: WidgetConfig) -> Result<(), UcommentError> {
    let window = window()?;
    let document = document()?;
    let location = window.location();
    let origin = Url::parse(&location.href()?)?;
    let page_name = location.pathname()?;

    release_image_heights(&document, &config.class_name)?;

    let border = html_element_by_id(&document, BORDER_ID)?;
    let bar_width = computed_pixels(&border, "margin-left")?;
    let content = html_element_by_id(&document, CONTENT_MAIN_ID)?;
    let dialog = html_element_by_id(&document, DIALOG_CONTAINER_ID)?;
    let layout = PageLayout {
        margin_x: margin_column(page_xy(&border).0, bar_width),
        column: ContentColumn {
            left: page_xy(&content).0,
            width: content.offset_width() as f64,
            bar_width,
        },
        dialog_width: computed_pixels(&dialog, "width")?,
        dialog_height: computed_pixels(&dialog, "height")?,
    };

    let discovered = discover_blocks(&document, &config.class_name)?;
    let blocks = BlockIndex::build(
        discovered
            .iter()
            .map(|found| (found.target.clone(), found.geometry)),
    )?;
    let (indicators, nodes): (Vec<HtmlElement>, Vec<HtmlElement>) = discovered
        .into_iter()
        .map(|found| (found.indicator, found.node))
        .unzip();

    let use_toc_accordion = config.use_toc_accordion;
    let jar = DocumentCookieJar::new(&document)?;
    let session = UiSession::new(config, origin, page_name, blocks, layout, jar)?;

    for (indicator, placement) in indicators.iter().zip(session.marker_placements()) {
        set_page_xy(indicator, placement.x, placement.y)?;
        indicator
            .style()
            .set_property("height", &px(placement.height))?;
    }
    set_search_action(&document, &session.endpoint_url(Endpoint::Search)?)?;

    let page = Rc::new(DomPage::attach(&document, indicators, nodes)?);
    page.render_buttons(session.dialog().buttons());
    let block_count = session.blocks().len();
    let widget = Rc::new(Widget {
        session: RefCell::new(session),
        page,
        transport: XhrTransport,
    });

    install_edit_listener(&widget);
    wire_indicators(&widget)?;
    wire_dialog(&document, &widget)?;
    wire_drag(&document, &widget)?;
    wire_page(&document, &window, &widget)?;
    if use_toc_accordion {
        build_toc_accordion(&document)?;
    }

    let fetcher = widget.clone();
    spawn_logged("comment counts", async move {
        session::fetch_counts(&fetcher.session, &fetcher.transport, &*fetcher.page).await
    });
    tracing::info!("ucomment initialized with {block_count} commentable blocks");
    Ok(())
}

/// Explicit heights on commentable images would distort their aspect ratio.
fn release_image_heights(document: &Document, class_name: &str) -> Result<(), UcommentError> {
    let images: Vec<HtmlElement> = select_all(document, &format!("img.{class_name}"))?;
    for image in images {
        image.style().remove_property("height")?;
    }
    Ok(())
}

fn set_search_action(document: &Document, action: &Url) -> Result<(), UcommentError> {
    match document.get_element_by_id(SEARCH_FORM_ID) {
        Some(form) => {
            let form = form
                .dyn_into::<HtmlFormElement>()
                .map_err(|_| UcommentError::Dom(format!("#{SEARCH_FORM_ID} is not a form")))?;
            form.set_action(action.as_str());
        }
        None => tracing::debug!("No #{SEARCH_FORM_ID} on this page"),
    }
    Ok(())
}

struct DiscoveredBlock {
    target: CommentableTarget,
    geometry: NodeGeometry,
    indicator: HtmlElement,
    node: HtmlElement,
}

fn create_html(document: &Document, tag: &str) -> Result<HtmlElement, UcommentError> {
    document
        .create_element(tag)?
        .dyn_into::<HtmlElement>()
        .map_err(|_| UcommentError::Dom(format!("<{tag}> is not an HTML element")))
}

/// Find the commentable nodes, normalize images onto their parent and append an indicator to
/// each host.
fn discover_blocks(
    document: &Document,
    class_name: &str,
) -> Result<Vec<DiscoveredBlock>, UcommentError> {
    let nodes: Vec<HtmlElement> = select_all(document, &format!(".{class_name}"))?;
    let mut found = Vec::with_capacity(nodes.len());
    for node in nodes {
        let id = node.id();
        let kind = NodeKind::from_tag_name(&node.tag_name());
        let target = match CommentableTarget::normalize(&id, kind) {
            Ok(target) => target,
            Err(e) => {
                tracing::warn!("Skipping commentable node: {e}");
                continue;
            }
        };
        let geometry = NodeGeometry {
            top: page_xy(&node).1,
            height: node.offset_height() as f64,
        };
        let host: Element = match target.host {
            TargetHost::Node => node.clone().into(),
            TargetHost::Parent => {
                let parent = node
                    .parent_element()
                    .ok_or_else(|| UcommentError::Dom(format!("image '{id}' has no parent")))?;
                node.set_id("");
                node.class_list().remove_1(class_name)?;
                parent.set_id(target.root.as_str());
                parent.class_list().add_1(class_name)?;
                parent
            }
        };
        let indicator = create_html(document, "span")?;
        indicator.set_id(&indicator_id(target.root.as_str()));
        indicator.set_class_name(INDICATOR_CLASS);
        host.append_child(&indicator)?;
        found.push(DiscoveredBlock {
            target,
            geometry,
            indicator,
            node,
        });
    }
    Ok(found)
}

/// Attach `handler` to `event` on `target`. The listener lives as long as the page.
fn listen<F>(
    target: &EventTarget,
    event: &str,
    widget: &Rc<Widget>,
    handler: F,
) -> Result<(), UcommentError>
where
    F: Fn(&Rc<Widget>, Event) + 'static,
{
    let widget = widget.clone();
    let closure =
        Closure::wrap(Box::new(move |event: Event| handler(&widget, event)) as Box<dyn FnMut(_)>);
    target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())?;
    closure.forget();
    Ok(())
}

fn spawn_logged<F>(what: &'static str, task: F)
where
    F: Future<Output = Result<(), UcommentError>> + 'static,
{
    spawn_local(async move {
        if let Err(e) = task.await {
            tracing::warn!("{what} request failed: {e}");
        }
    });
}

fn current_element(event: &Event) -> Option<Element> {
    event
        .current_target()
        .and_then(|target| target.dyn_into::<Element>().ok())
}

fn install_edit_listener(widget: &Rc<Widget>) {
    let weak = Rc::downgrade(widget);
    let closure = Closure::wrap(Box::new(move |_event: Event| {
        if let Some(widget) = weak.upgrade() {
            widget.session.borrow_mut().comment_edited(&*widget.page);
        }
    }) as Box<dyn FnMut(_)>);
    widget
        .page
        .set_edit_listener(closure.as_ref().unchecked_ref::<js_sys::Function>().clone());
    closure.forget();
}

fn wire_indicators(widget: &Rc<Widget>) -> Result<(), UcommentError> {
    for indicator in widget.page.indicators() {
        listen(indicator, "click", widget, |widget, event| {
            event.prevent_default();
            let id = current_element(&event)
                .map(|element| element.id())
                .unwrap_or_default();
            let Some(root) = root_from_indicator_id(&id).map(str::to_string) else {
                return;
            };
            let widget = widget.clone();
            spawn_logged("comment HTML", async move {
                let page = &*widget.page;
                session::open_comment_block(&widget.session, &widget.transport, page, &root).await
            });
        })?;
    }
    Ok(())
}

fn wire_dialog(document: &Document, widget: &Rc<Widget>) -> Result<(), UcommentError> {
    let tab_links: Vec<HtmlElement> = select_all(
        document,
        &format!("#{DIALOG_TABS_ID} ul li a, #{HELP_LINK_ID}, #{POST_LINK_ID}"),
    )?;
    for link in tab_links {
        listen(&link, "click", widget, |widget, event| {
            event.prevent_default();
            event.stop_propagation();
            let href = current_element(&event).and_then(|element| element.get_attribute("href"));
            if let Some(tab) = href.as_deref().and_then(Tab::from_href) {
                widget.session.borrow_mut().select_tab(tab, &*widget.page);
            }
        })?;
    }

    let close_controls: Vec<Element> = select_all(document, DIALOG_CLOSE_SELECTOR)?;
    for control in close_controls {
        listen(&control, "click", widget, |widget, event| {
            event.prevent_default();
            widget.session.borrow_mut().close(&*widget.page);
        })?;
    }

    let preview = html_element_by_id(document, Button::Preview.element_id())?;
    listen(&preview, "click", widget, |widget, event| {
        event.prevent_default();
        let widget = widget.clone();
        spawn_logged("preview", async move {
            session::preview(&widget.session, &widget.transport, &*widget.page).await
        });
    })?;

    let submit = html_element_by_id(document, Button::Submit.element_id())?;
    listen(&submit, "click", widget, |widget, event| {
        event.prevent_default();
        let widget = widget.clone();
        spawn_logged("submit", async move {
            session::submit(&widget.session, &widget.transport, &*widget.page).await
        });
    })?;

    // Enter in a text field must not navigate away with a plain form post.
    let form = html_element_by_id(document, COMMENT_FORM_ID)?;
    listen(&form, "submit", widget, |_, event| event.prevent_default())?;
    Ok(())
}

/// Drag the dialog by its header.
fn wire_drag(document: &Document, widget: &Rc<Widget>) -> Result<(), UcommentError> {
    // Pointer offset from the dialog corner while a drag is in progress.
    let grab: Rc<Cell<Option<(f64, f64)>>> = Rc::new(Cell::new(None));

    let handle = html_element_by_id(document, DIALOG_HEADER_ID)?;
    let on_grab = grab.clone();
    listen(&handle, "mousedown", widget, move |widget, event| {
        let Some(mouse) = event.dyn_ref::<MouseEvent>() else {
            return;
        };
        let (x, y) = page_xy(widget.page.dialog_element());
        on_grab.set(Some((mouse.page_x() as f64 - x, mouse.page_y() as f64 - y)));
        event.prevent_default();
    })?;

    let on_move = grab.clone();
    listen(document, "mousemove", widget, move |widget, event| {
        let (Some((dx, dy)), Some(mouse)) = (on_move.get(), event.dyn_ref::<MouseEvent>()) else {
            return;
        };
        let moved = set_page_xy(
            widget.page.dialog_element(),
            mouse.page_x() as f64 - dx,
            mouse.page_y() as f64 - dy,
        );
        if let Err(e) = moved {
            tracing::debug!("Dialog drag failed: {e}");
        }
    })?;

    listen(document, "mouseup", widget, move |widget, _event| {
        if grab.take().is_none() {
            return;
        }
        let (x, y) = page_xy(widget.page.dialog_element());
        widget
            .session
            .borrow_mut()
            .drag_ended(x, y, &*widget.page);
    })
}

fn wire_page(
    document: &Document,
    window: &web_sys::Window,
    widget: &Rc<Widget>,
) -> Result<(), UcommentError> {
    let toggles: Vec<Element> = select_all(document, &format!(".{SHOW_HIDE_CLASS}"))?;
    for toggle in toggles {
        listen(&toggle, "click", widget, |widget, event| {
            event.prevent_default();
            let label = event
                .target()
                .and_then(|target| target.dyn_into::<web_sys::Node>().ok())
                .and_then(|node| node.text_content())
                .unwrap_or_default();
            widget
                .session
                .borrow_mut()
                .toggle_clicked(label.trim(), &*widget.page);
        })?;
    }

    listen(window, "resize", widget, |widget, _event| {
        widget.session.borrow_mut().window_resized(&*widget.page);
    })
}

/// Collapse first-level TOC entries whose nested entries have no indicator.
fn build_toc_accordion(document: &Document) -> Result<(), UcommentError> {
    let items: Vec<HtmlElement> = select_all(document, &format!(".{TOC_LEVEL1_CLASS}"))?;
    let mut entries = Vec::with_capacity(items.len());
    for item in &items {
        let nested = match item.query_selector("ul")? {
            Some(list) => {
                let children = list.children();
                let mut has_marker = Vec::with_capacity(children.length() as usize);
                for child in (0..children.length()).filter_map(|i| children.item(i)) {
                    has_marker.push(child.query_selector("span")?.is_some());
                }
                Some(has_marker)
            }
            None => None,
        };
        entries.push(TocEntry { nested });
    }

    for (item, section) in items.iter().zip(plan_accordion(&entries)) {
        let (Some(section), Some(list)) = (section, item.query_selector("ul")?) else {
            continue;
        };
        item.remove_child(&list)?;
        let container = create_html(document, "li")?;
        container.set_class_name(TOC_EXPANDER_ITEM_CLASS);
        container.style().set_property("display", section.display())?;
        container.append_child(&list)?;
        item.append_child(&container)?;

        let toggle = create_html(document, "a")?;
        toggle.set_class_name(TOC_TOGGLE_CLASS);
        toggle.set_attribute("href", "#")?;
        toggle.set_text_content(Some(section.label()));
        item.insert_before(&toggle, item.child_nodes().item(1).as_ref())?;

        let link = toggle.clone();
        let on_click = Closure::wrap(Box::new(move |event: Event| {
            event.prevent_default();
            let style = container.style();
            let current = AccordionSection::from_display(
                &style.get_property_value("display").unwrap_or_default(),
            );
            let next = current.toggled();
            if style.set_property("display", next.display()).is_ok() {
                link.set_text_content(Some(next.label()));
            }
        }) as Box<dyn FnMut(_)>);
        toggle.add_event_listener_with_callback("click", on_click.as_ref().unchecked_ref())?;
        on_click.forget();
    }
    tracing::debug!("TOC accordion built over {} entries", items.len());
    Ok(())
}
