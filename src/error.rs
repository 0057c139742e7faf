use http::header::{InvalidHeaderName, InvalidHeaderValue};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::ParseError as UrlParseError;

use serde_json::Error as JsonError;

#[cfg(feature = "wasm")]
use serde_wasm_bindgen::Error as WasmError;

#[cfg(feature = "wasm")]
use wasm_bindgen::JsValue;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum UcommentError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("DOM error: {0}")]
    Dom(String),
    #[error("Duplicate comment root '{0}' on page")]
    DuplicateRoot(String),
    #[error("Server exception: {0}")]
    Exception(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Item Not Found: {0}")]
    NotFound(String),
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
    #[error("Request to {0} timed out")]
    Timeout(String),
    #[error("Transport error: {0}")]
    Transport(String),
}

impl UcommentError {
    /// Text shown inline in the comment dialog for this error.
    ///
    /// Timeouts show the configured failure message, server-reported errors show the server's
    /// own text, everything else falls back to the error display.
    pub fn user_message(&self, failure_message: &str) -> String {
        match self {
            UcommentError::Timeout(_) => failure_message.to_string(),
            UcommentError::InvalidInput(msg) | UcommentError::Exception(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

impl From<JsonError> for UcommentError {
    fn from(src: JsonError) -> UcommentError {
        UcommentError::Serialization(format!("JSON (de)serialization error: {src}"))
    }
}

impl From<toml::de::Error> for UcommentError {
    fn from(src: toml::de::Error) -> UcommentError {
        UcommentError::Config(format!("Toml deserialization error: {src}"))
    }
}

impl From<UrlParseError> for UcommentError {
    fn from(src: UrlParseError) -> UcommentError {
        UcommentError::Config(format!("Invalid URL: {src}"))
    }
}

impl From<InvalidHeaderName> for UcommentError {
    fn from(src: InvalidHeaderName) -> UcommentError {
        UcommentError::Transport(format!("Invalid header name: {src}"))
    }
}

impl From<InvalidHeaderValue> for UcommentError {
    fn from(src: InvalidHeaderValue) -> UcommentError {
        UcommentError::Transport(format!("Invalid header value: {src}"))
    }
}

impl From<regex::Error> for UcommentError {
    fn from(x: regex::Error) -> Self {
        UcommentError::Serialization(format!("Regex parse failed: {x}"))
    }
}

#[cfg(feature = "wasm")]
impl From<WasmError> for UcommentError {
    fn from(wasm_error: WasmError) -> Self {
        UcommentError::Serialization(format!("Serde-wasm-bindgen error: {wasm_error}"))
    }
}

#[cfg(feature = "wasm")]
impl From<JsValue> for UcommentError {
    fn from(value: JsValue) -> Self {
        UcommentError::Dom(value.as_string().unwrap_or_else(|| format!("{value:?}")))
    }
}

#[cfg(feature = "wasm")]
impl From<UcommentError> for JsValue {
    fn from(error: UcommentError) -> Self {
        JsValue::from_str(&error.to_string())
    }
}
