//! [`Transport`] over `XMLHttpRequest`.
//!
//! The browser's own request timer is used, so a timeout is observed exactly as the server-side
//! views expect: status `0`, reported here as [`Reply::timed_out`].

use futures::channel::oneshot;
use http::header::{HeaderMap, HeaderValue};
use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};
use wasm_bindgen::{closure::Closure, JsCast};
use web_sys::XmlHttpRequest;

use crate::{
    error::UcommentError,
    transport::{FormRequest, Reply, Transport, UCOMMENT_HEADER},
};

#[derive(Debug, Clone, Copy, Default)]
pub struct XhrTransport;

impl Transport for XhrTransport {
    async fn post(&self, request: FormRequest) -> Result<Reply, UcommentError> {
        let xhr = XmlHttpRequest::new()?;
        xhr.open_with_async("POST", request.url.as_str(), true)?;
        xhr.set_timeout(u32::try_from(request.timeout.as_millis()).unwrap_or(u32::MAX));
        for (name, value) in request.headers.iter() {
            let value = value
                .to_str()
                .map_err(|e| UcommentError::Transport(format!("header {name}: {e}")))?;
            xhr.set_request_header(name.as_str(), value)?;
        }

        let (done_tx, done_rx) = oneshot::channel::<()>();
        let done_tx = Rc::new(RefCell::new(Some(done_tx)));
        let timed_out = Rc::new(Cell::new(false));

        let on_timeout = {
            let timed_out = timed_out.clone();
            Closure::wrap(Box::new(move || timed_out.set(true)) as Box<dyn FnMut()>)
        };
        // loadend fires last for every outcome: load, error, abort and timeout.
        let on_loadend = Closure::wrap(Box::new(move || {
            if let Some(tx) = done_tx.borrow_mut().take() {
                let _ = tx.send(());
            }
        }) as Box<dyn FnMut()>);
        xhr.set_ontimeout(Some(on_timeout.as_ref().unchecked_ref()));
        xhr.set_onloadend(Some(on_loadend.as_ref().unchecked_ref()));

        tracing::debug!(
            "POST {} ({} fields, timeout {:?})",
            request.url,
            request.fields.len(),
            request.timeout
        );
        xhr.send_with_opt_str(Some(&request.encoded_body()))?;

        let completed = done_rx.await;
        xhr.set_ontimeout(None);
        xhr.set_onloadend(None);
        completed.map_err(|_| {
            UcommentError::Transport(format!("request to {} was dropped", request.url))
        })?;

        if timed_out.get() {
            return Ok(Reply::timed_out());
        }
        read_reply(&xhr)
    }
}

fn read_reply(xhr: &XmlHttpRequest) -> Result<Reply, UcommentError> {
    let mut headers = HeaderMap::new();
    if let Some(verdict) = xhr.get_response_header(UCOMMENT_HEADER.as_str())? {
        headers.insert(UCOMMENT_HEADER, HeaderValue::from_str(&verdict)?);
    }
    Ok(Reply {
        status: xhr.status()?,
        status_text: xhr.status_text()?,
        headers,
        body: xhr.response_text()?,
    })
}
