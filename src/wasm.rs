//! Browser bindings for ucomment
//!
//! This module wires the DOM-free core to a live documentation page: it discovers the
//! commentable nodes, builds the indicators, the TOC accordion and the dialog behavior, and
//! sends the four POST requests through `XMLHttpRequest`.
//!
//! ## Usage
//!
//! ```javascript,ignore
//! import init, { start } from './ucomment.js';
//!
//! async function main() {
//!     await init();
//!     // Every key is optional; missing keys take their defaults.
//!     start({ use_mathjax: true, url_views_prefix: "document/" });
//! }
//! ```
//!
//! `start` may be called before the DOM is parsed; initialization then waits for
//! `DOMContentLoaded`. When MathJax is in use, call it from the MathJax startup queue so the
//! page is typeset before the indicators are measured.

mod bootstrap;
mod dom;
mod jar;
mod xhr;

pub use bootstrap::start;
pub use dom::DomPage;
pub use jar::DocumentCookieJar;
pub use xhr::XhrTransport;

use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlElement, Window};

use crate::error::UcommentError;

pub(crate) fn window() -> Result<Window, UcommentError> {
    web_sys::window().ok_or_else(|| UcommentError::Dom("no global `window` exists".to_string()))
}

pub(crate) fn document() -> Result<Document, UcommentError> {
    window()?
        .document()
        .ok_or_else(|| UcommentError::Dom("window has no document".to_string()))
}

pub(crate) fn html_element_by_id(
    document: &Document,
    id: &str,
) -> Result<HtmlElement, UcommentError> {
    document
        .get_element_by_id(id)
        .ok_or_else(|| UcommentError::NotFound(format!("#{id}")))?
        .dyn_into::<HtmlElement>()
        .map_err(|_| UcommentError::Dom(format!("#{id} is not an HTML element")))
}

/// All elements matching `selectors`, in document order.
pub(crate) fn select_all<T: JsCast>(
    root: &Document,
    selectors: &str,
) -> Result<Vec<T>, UcommentError> {
    let list = root.query_selector_all(selectors)?;
    Ok((0..list.length())
        .filter_map(|i| list.item(i))
        .filter_map(|node| node.dyn_into::<T>().ok())
        .collect())
}

/// Page coordinates of the top-left corner of `element`.
pub(crate) fn page_xy(element: &Element) -> (f64, f64) {
    let rect = element.get_bounding_client_rect();
    let (scroll_x, scroll_y) = web_sys::window()
        .map(|w| (w.scroll_x().unwrap_or(0.0), w.scroll_y().unwrap_or(0.0)))
        .unwrap_or((0.0, 0.0));
    (rect.left() + scroll_x, rect.top() + scroll_y)
}

/// Absolutely position `element` so its top-left corner sits at page coordinates `(x, y)`.
///
/// The element must be displayed: hidden elements have no offset parent.
pub(crate) fn set_page_xy(element: &HtmlElement, x: f64, y: f64) -> Result<(), UcommentError> {
    let style = element.style();
    style.set_property("position", "absolute")?;
    let (origin_x, origin_y) = element
        .offset_parent()
        .map(|parent| {
            let (px, py) = page_xy(&parent);
            (px + parent.client_left() as f64, py + parent.client_top() as f64)
        })
        .unwrap_or((0.0, 0.0));
    style.set_property("left", &px(x - origin_x))?;
    style.set_property("top", &px(y - origin_y))?;
    Ok(())
}

pub(crate) fn px(value: f64) -> String {
    format!("{value}px")
}

/// Leading number of a CSS length such as `"20px"`; 0 when there is none.
pub(crate) fn css_pixels(value: &str) -> f64 {
    let value = value.trim();
    let end = value
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-'))
        .unwrap_or(value.len());
    value[..end].parse().unwrap_or(0.0)
}

/// Computed value of `property` for `element`, in pixels.
pub(crate) fn computed_pixels(element: &Element, property: &str) -> Result<f64, UcommentError> {
    let style = window()?
        .get_computed_style(element)?
        .ok_or_else(|| UcommentError::Dom(format!("no computed style for {}", element.id())))?;
    Ok(css_pixels(&style.get_property_value(property)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_css_pixels_reads_leading_number() {
        assert_eq!(css_pixels("20px"), 20.0);
        assert_eq!(css_pixels(" 412.5px "), 412.5);
        assert_eq!(css_pixels("-3px"), -3.0);
        assert_eq!(css_pixels("auto"), 0.0);
        assert_eq!(css_pixels(""), 0.0);
    }
}
