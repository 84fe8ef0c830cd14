//! Per-document settings embedded at the top of the markdown text.
//!
//! A document may start with an HTML comment holding a JSON object:
//!
//! ```text
//! <!--{
//!   "GPT_MODEL": "gpt-4",
//!   "GPT_MAX_TOKENS": 512,
//!   "EDITOR_OPTIONS": { "fontSize": 16 }
//! }-->
//! ```
//!
//! Missing or malformed headers fall back to the defaults.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_TEMPERATURE: f64 = 0.1;
pub const DEFAULT_MAX_TOKENS: u32 = 256;

static HEADER_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\A<!--(.*?)-->").expect("valid header regex"));

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSettings {
    editor_options: Map<String, Value>,
    model: String,
    temperature: f64,
    max_tokens: u32,
}

impl Default for DocumentSettings {
    fn default() -> Self {
        Self {
            editor_options: Map::new(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl DocumentSettings {
    /// Read settings from the header comment of `text`.
    pub fn parse(text: &str) -> Self {
        Self::from_header(text).unwrap_or_default()
    }

    fn from_header(text: &str) -> Option<Self> {
        let comment = HEADER_COMMENT.captures(text)?.get(1)?.as_str();
        let open = comment.find('{')?;
        let close = comment.rfind('}')?;
        if close < open {
            return None;
        }
        match serde_json::from_str::<Value>(&comment[open..=close]) {
            Ok(Value::Object(map)) => Some(Self::from_map(&map)),
            Ok(_) => None,
            Err(err) => {
                tracing::debug!(%err, "ignoring malformed settings header");
                None
            }
        }
    }

    fn from_map(map: &Map<String, Value>) -> Self {
        let defaults = Self::default();
        let editor_options = map
            .get("EDITOR_OPTIONS")
            .or_else(|| map.get("ACE_OPTIONS"))
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let model = map
            .get("GPT_MODEL")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .map_or(defaults.model, ToOwned::to_owned);
        let temperature = map
            .get("GPT_TEMPERATURE")
            .and_then(Value::as_f64)
            .filter(|t| *t >= 0.0)
            .unwrap_or(defaults.temperature);
        let max_tokens = map
            .get("GPT_MAX_TOKENS")
            .and_then(Value::as_u64)
            .filter(|t| *t > 0)
            .and_then(|t| u32::try_from(t).ok())
            .unwrap_or(defaults.max_tokens);
        Self {
            editor_options,
            model,
            temperature,
            max_tokens,
        }
    }

    /// Opaque options for the host editor (`EDITOR_OPTIONS`, or the legacy
    /// `ACE_OPTIONS` key).
    pub const fn editor_options(&self) -> &Map<String, Value> {
        &self.editor_options
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub const fn temperature(&self) -> f64 {
        self.temperature
    }

    pub const fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}
