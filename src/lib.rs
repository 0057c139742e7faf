//! # ucomment
//!
//! Reader comments in the margin of statically generated documentation pages.
//!
//! ## Overview
//!
//! A documentation build marks every commentable paragraph, figure or equation with the class
//! `ucomment` and a short, unique id (its *comment root*). ucomment turns those nodes into an
//! interactive layer:
//!
//! - **Indicators**: a marker in the margin next to each node, carrying a badge with the number
//!   of comments already posted on it.
//! - **Comment dialog**: a draggable, tabbed overlay for writing a comment (with server-side
//!   preview), reading the existing comments and getting help.
//! - **Preferences**: a show/hide toggle for the badges, persisted in a cookie.
//! - **TOC accordion**: first-level table-of-contents entries collapse unless something below
//!   them can be commented on.
//!
//! The server owns storage, rendering and moderation. The widget talks to it through four
//! form-encoded POSTs (preview, submit, counts, comment HTML) under the configured
//! `url_views_prefix`.
//!
//! ## Architecture
//!
//! The crate is split into a DOM-free core, built and tested on every target, and browser
//! bindings behind the `wasm` feature:
//!
//! - **[`blocks`]**: commentable nodes and the root → block index
//! - **[`counts`]**: the counts request table and reply decoding
//! - **[`indicator`]**: marker placement, badges and the highlight band
//! - **[`dialog`]**: dialog state machine, geometry and button state
//! - **[`cookie`]**: the show/hide preference and its cookie
//! - **[`toc`]**: accordion state for the table of contents
//! - **[`transport`]**: requests, replies, timeouts and stale-reply detection
//! - **[`session`]**: the aggregate tying the above to a [`page::PageView`] and a
//!   [`transport::Transport`]
//! - **`wasm`**: `web-sys` implementations of those two seams and the exported `start` entry point
//!
//! ## Quick Start
//!
//! Driving a session off-browser, with any `PageView` and `Transport`:
//!
//! ```rust,no_run
//! # use std::cell::RefCell;
//! # use ucomment::{page::PageView, transport::Transport};
//! use ucomment::{
//!     blocks::{BlockIndex, CommentableTarget, NodeGeometry, NodeKind},
//!     config::WidgetConfig,
//!     cookie::MemoryCookieJar,
//!     session::{self, PageLayout, UiSession},
//! };
//! use url::Url;
//!
//! # async fn example(view: impl PageView, transport: impl Transport) -> Result<(), ucomment::UcommentError> {
//! let blocks = BlockIndex::build([(
//!     CommentableTarget::normalize("abcd1234", NodeKind::Element)?,
//!     NodeGeometry { top: 120.0, height: 48.0 },
//! )])?;
//! let session = RefCell::new(UiSession::new(
//!     WidgetConfig::from_toml_str("use_mathjax = true")?,
//!     Url::parse("https://docs.example.org/document/intro/")?,
//!     "/document/intro/",
//!     blocks,
//!     PageLayout::default(),
//!     MemoryCookieJar::default(),
//! )?);
//!
//! session::fetch_counts(&session, &transport, &view).await?;
//! session::open_comment_block(&session, &transport, &view, "abcd1234").await?;
//! session::preview(&session, &transport, &view).await?;
//! # Ok(())
//! # }
//! ```
//!
//! In the browser:
//!
//! ```javascript,ignore
//! import init, { start } from './ucomment.js';
//! await init();
//! start({ use_mathjax: true });
//! ```
//!
//! ## Core Concepts
//!
//! ### Channels and stale replies
//!
//! Every request belongs to a channel: the form channel (preview and submit), counts, or comment
//! HTML. Issuing a request makes earlier requests on the same channel stale, and opening or
//! closing the dialog makes pending form and comment HTML requests stale. Stale replies are
//! dropped, so a slow reply can never land in a dialog the user has since moved away from.
//!
//! ### Derived button state
//!
//! The submit, preview and close buttons are never toggled individually. They are computed from
//! the selected tab and the comment phase (drafting, previewed, rejected, submitted); see
//! [`dialog::CommentDialog::buttons`].
//!
//! ## Features
//!
//! - **default**: the DOM-free core
//! - **wasm**: browser bindings (`web-sys`, `XMLHttpRequest`, `tracing-wasm`)

pub mod blocks;
pub mod config;
pub mod cookie;
pub mod counts;
pub mod dialog;
pub mod error;
pub mod indicator;
pub mod markup;
pub mod page;
pub mod session;
pub mod toc;
pub mod transport;
#[cfg(feature = "wasm")]
pub mod wasm;

pub use error::*;
