use wasm_bindgen::JsCast;
use web_sys::{Document, HtmlDocument};

use crate::{
    cookie::{cookie_assignment, parse_cookie_header, CookieJar},
    error::UcommentError,
};

/// `document.cookie` as a [`CookieJar`].
#[derive(Debug, Clone)]
pub struct DocumentCookieJar {
    document: HtmlDocument,
}

impl DocumentCookieJar {
    pub fn new(document: &Document) -> Result<DocumentCookieJar, UcommentError> {
        let document = document
            .clone()
            .dyn_into::<HtmlDocument>()
            .map_err(|_| UcommentError::Dom("document is not an HTML document".to_string()))?;
        Ok(DocumentCookieJar { document })
    }
}

impl CookieJar for DocumentCookieJar {
    fn get(&self, name: &str) -> Option<String> {
        let header = self.document.cookie().ok()?;
        parse_cookie_header(&header, name)
    }

    fn set(&mut self, name: &str, value: &str, path: &str) {
        if let Err(e) = self
            .document
            .set_cookie(&cookie_assignment(name, value, path))
        {
            tracing::warn!("Could not set cookie {name}: {:?}", e);
        }
    }
}
