//! Requests, replies and bookkeeping for the four asynchronous POST operations.
//!
//! The widget talks to exactly four server views, all reached with a form-encoded POST:
//!
//! | Endpoint | Suffix | Reply |
//! |---|---|---|
//! | [`Endpoint::Preview`] | `_preview-comment/` | `ucomment` header verdict + HTML/error body |
//! | [`Endpoint::Submit`] | `_submit-comment/` | same as preview |
//! | [`Endpoint::Counts`] | `_retrieve-comment-counts/` | JSON object root → count |
//! | [`Endpoint::CommentHtml`] | `_retrieve-comments/` | raw HTML fragment |
//!
//! A timeout never surfaces as an `Err`: the transport reports it the way a browser does, as a
//! [`Reply`] with status `0` and status text `timeout` (see [`Reply::is_timeout`]). `Err` is
//! reserved for requests that could not be issued at all.
//!
//! Replies can arrive after the user has moved on. Each request takes a [`Ticket`] from
//! [`RequestGenerations`]; a reply is only applied while its ticket is still current.

use enumset::{EnumSet, EnumSetType};
use http::{
    header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE},
    StatusCode,
};
use std::{future::Future, time::Duration};
use url::{form_urlencoded, Url};

use crate::error::UcommentError;

/// Response header carrying the server's verdict on a preview or submission.
pub const UCOMMENT_HEADER: HeaderName = HeaderName::from_static("ucomment");
/// Request header marking form posts as coming from the widget rather than a plain form submit.
pub const JS_COMMENT_REQUEST_HEADER: HeaderName = HeaderName::from_static("js-comment-request");
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=UTF-8";

/// Status text reported by the transport when the request timer expired.
pub const TIMEOUT_STATUS_TEXT: &str = "timeout";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Preview,
    Submit,
    Counts,
    CommentHtml,
    /// Not requested by the widget itself: the search form is pointed at it.
    Search,
}

impl Endpoint {
    pub fn path_suffix(&self) -> &'static str {
        match self {
            Endpoint::Preview => "_preview-comment/",
            Endpoint::Submit => "_submit-comment/",
            Endpoint::Counts => "_retrieve-comment-counts/",
            Endpoint::CommentHtml => "_retrieve-comments/",
            Endpoint::Search => "_search/",
        }
    }

    pub fn channel(&self) -> Option<Channel> {
        match self {
            Endpoint::Preview | Endpoint::Submit => Some(Channel::Form),
            Endpoint::Counts => Some(Channel::Counts),
            Endpoint::CommentHtml => Some(Channel::CommentHtml),
            Endpoint::Search => None,
        }
    }
}

/// Category of outstanding request. At most one reply per channel is ever applied: the one
/// belonging to the most recently issued ticket.
#[derive(Debug, EnumSetType)]
pub enum Channel {
    Form,
    Counts,
    CommentHtml,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormRequest {
    pub endpoint: Endpoint,
    pub url: Url,
    pub fields: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub timeout: Duration,
}

impl FormRequest {
    pub fn new(endpoint: Endpoint, url: Url, timeout: Duration) -> FormRequest {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));
        FormRequest {
            endpoint,
            url,
            fields: Vec::new(),
            headers,
            timeout,
        }
    }

    pub fn field<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> FormRequest {
        self.fields.push((key.into(), value.into()));
        self
    }

    pub fn fields<I, K, V>(mut self, fields: I) -> FormRequest
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.fields
            .extend(fields.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn header(mut self, name: HeaderName, value: &str) -> Result<FormRequest, UcommentError> {
        self.headers.insert(name, HeaderValue::from_str(value)?);
        Ok(self)
    }

    pub fn field_value(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// `application/x-www-form-urlencoded` body for the request fields, in insertion order.
    pub fn encoded_body(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.fields.iter())
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reply {
    /// Raw status as reported by the transport; `0` when no HTTP response was received.
    pub status: u16,
    pub status_text: String,
    pub headers: HeaderMap,
    /// `None` when the response carried no body at all.
    pub body: Option<String>,
}

impl Reply {
    pub fn ok(body: impl Into<String>) -> Reply {
        Reply {
            status: 200,
            status_text: "OK".to_string(),
            headers: HeaderMap::new(),
            body: Some(body.into()),
        }
    }

    pub fn timed_out() -> Reply {
        Reply {
            status: 0,
            status_text: TIMEOUT_STATUS_TEXT.to_string(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn with_verdict(mut self, verdict: Verdict) -> Reply {
        if let Some(value) = verdict.header_value() {
            self.headers
                .insert(UCOMMENT_HEADER, HeaderValue::from_static(value));
        }
        self
    }

    pub fn is_timeout(&self) -> bool {
        self.status == 0 && self.status_text == TIMEOUT_STATUS_TEXT
    }

    pub fn status_code(&self) -> Option<StatusCode> {
        StatusCode::from_u16(self.status).ok()
    }

    /// Body text, with an absent body treated as empty content.
    pub fn body_text(&self) -> &str {
        self.body.as_deref().unwrap_or_default()
    }

    pub fn verdict(&self) -> Verdict {
        Verdict::from_header(
            self.headers
                .get(&UCOMMENT_HEADER)
                .and_then(|value| value.to_str().ok()),
        )
    }
}

/// Server verdict on a preview or submission, carried in the [`UCOMMENT_HEADER`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    PreviewOk,
    InvalidInput,
    Exception,
    Submitted,
    Unrecognized(Option<String>),
}

impl Verdict {
    pub fn from_header(value: Option<&str>) -> Verdict {
        match value.map(str::trim) {
            Some("Preview-OK") => Verdict::PreviewOk,
            Some("Preview-Invalid input") => Verdict::InvalidInput,
            Some("Preview-Exception") => Verdict::Exception,
            Some("Submission-OK") => Verdict::Submitted,
            other => Verdict::Unrecognized(other.map(str::to_string)),
        }
    }

    pub fn header_value(&self) -> Option<&'static str> {
        match self {
            Verdict::PreviewOk => Some("Preview-OK"),
            Verdict::InvalidInput => Some("Preview-Invalid input"),
            Verdict::Exception => Some("Preview-Exception"),
            Verdict::Submitted => Some("Submission-OK"),
            Verdict::Unrecognized(_) => None,
        }
    }
}

/// Asynchronous POST of a form request.
///
/// Implementations report a transport timeout as [`Reply::timed_out`], not as an error.
pub trait Transport {
    fn post(&self, request: FormRequest) -> impl Future<Output = Result<Reply, UcommentError>>;
}

/// Timeouts for the form channel (grows after each timeout) and the other channels (fixed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutPolicy {
    form: Duration,
    fixed: Duration,
    increment: Duration,
}

impl TimeoutPolicy {
    pub fn new(initial: Duration, increment: Duration) -> TimeoutPolicy {
        TimeoutPolicy {
            form: initial,
            fixed: initial,
            increment,
        }
    }

    pub fn timeout_for(&self, endpoint: Endpoint) -> Duration {
        match endpoint.channel() {
            Some(Channel::Form) => self.form,
            _ => self.fixed,
        }
    }

    /// Grow the form timeout after a timed out preview or submission; returns the new value.
    pub fn bump_form(&mut self) -> Duration {
        self.form += self.increment;
        tracing::debug!("Form request timeout raised to {:?}", self.form);
        self.form
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    channel: Channel,
    generation: u64,
}

impl Ticket {
    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Monotonic generation counter per [`Channel`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestGenerations {
    form: u64,
    counts: u64,
    comment_html: u64,
}

impl RequestGenerations {
    fn slot(&mut self, channel: Channel) -> &mut u64 {
        match channel {
            Channel::Form => &mut self.form,
            Channel::Counts => &mut self.counts,
            Channel::CommentHtml => &mut self.comment_html,
        }
    }

    fn current(&self, channel: Channel) -> u64 {
        match channel {
            Channel::Form => self.form,
            Channel::Counts => self.counts,
            Channel::CommentHtml => self.comment_html,
        }
    }

    /// Issue a new ticket, making every earlier ticket of the channel stale.
    pub fn issue(&mut self, channel: Channel) -> Ticket {
        let slot = self.slot(channel);
        *slot += 1;
        Ticket {
            channel,
            generation: *slot,
        }
    }

    pub fn is_current(&self, ticket: &Ticket) -> bool {
        self.current(ticket.channel) == ticket.generation
    }

    pub fn invalidate(&mut self, channels: EnumSet<Channel>) {
        for channel in channels {
            *self.slot(channel) += 1;
        }
    }
}
