//! JSON text in and out. Documents must have an object or array root.
use std::fs;
use std::path::Path;

use crate::error::{JsonError, Result};
use crate::value::JsonValue;

/// Deepest container nesting serde_json will parse. A larger
/// [`JsonOpts::max_depth`] behaves as this value.
pub const MAX_DEPTH_LIMIT: usize = 127;

#[derive(Debug, Clone, Copy)]
pub struct JsonOpts {
    /// Maximum container nesting, capped at [`MAX_DEPTH_LIMIT`]. Applies to
    /// both parsing and serialization.
    pub max_depth: usize,
    pub pretty: bool,
}

impl JsonOpts {
    pub fn depth_limit(&self) -> usize {
        self.max_depth.min(MAX_DEPTH_LIMIT)
    }
}

impl Default for JsonOpts {
    fn default() -> Self {
        Self {
            max_depth: 64,
            pretty: false,
        }
    }
}

pub fn parse(text: &str) -> Result<JsonValue> {
    parse_with(text, &JsonOpts::default())
}

pub fn parse_with(text: &str, opts: &JsonOpts) -> Result<JsonValue> {
    let value = serde_json::from_str(text).map_err(|e| engine_error(e, opts))?;
    check_document(value, opts)
}

/// Parses a document from raw bytes. Anything after the first NUL is ignored.
pub fn parse_bytes(bytes: &[u8], opts: &JsonOpts) -> Result<JsonValue> {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    let value = serde_json::from_slice(&bytes[..end]).map_err(|e| engine_error(e, opts))?;
    check_document(value, opts)
}

fn engine_error(e: serde_json::Error, opts: &JsonOpts) -> JsonError {
    // serde_json reports its nesting cap as a plain syntax error
    if e.to_string().starts_with("recursion limit exceeded") {
        tracing::debug!(limit = opts.depth_limit(), "rejecting over-deep document");
        return JsonError::DepthLimit { limit: opts.depth_limit() };
    }
    tracing::debug!(error = %e, "json parse failed");
    JsonError::Syntax(e)
}

fn check_document(value: JsonValue, opts: &JsonOpts) -> Result<JsonValue> {
    if !value.kind().is_container() {
        tracing::debug!(kind = ?value.kind(), "rejecting document with scalar root");
        return Err(JsonError::RootNotContainer { found: value.kind() });
    }
    check_depth(&value, opts)?;
    Ok(value)
}

fn check_depth(value: &JsonValue, opts: &JsonOpts) -> Result<()> {
    let limit = opts.depth_limit();
    if value.depth() > limit {
        tracing::debug!(limit, "rejecting over-deep document");
        return Err(JsonError::DepthLimit { limit });
    }
    Ok(())
}

/// Parses any JSON value, scalars included. Used for editing fragments,
/// not for whole documents.
pub fn parse_fragment(text: &str) -> Result<JsonValue> {
    let opts = JsonOpts {
        max_depth: MAX_DEPTH_LIMIT,
        ..Default::default()
    };
    serde_json::from_str(text).map_err(|e| engine_error(e, &opts))
}

pub fn to_text(value: &JsonValue) -> Result<String> {
    to_text_with(value, &JsonOpts::default())
}

pub fn to_text_with(value: &JsonValue, opts: &JsonOpts) -> Result<String> {
    if !value.kind().is_container() {
        tracing::debug!(kind = ?value.kind(), "refusing to serialize scalar root");
        return Err(JsonError::RootNotContainer { found: value.kind() });
    }
    check_depth(value, opts)?;
    let s = if opts.pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(s)
}

pub fn load_file(path: &Path, opts: &JsonOpts) -> Result<JsonValue> {
    let data = fs::read(path)?;
    match data.iter().copied().find(|b| !b.is_ascii_whitespace()) {
        Some(_) => parse_bytes(&data, opts),
        None => Err(JsonError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "empty file",
        ))),
    }
}

pub fn write_file(path: &Path, value: &JsonValue, opts: &JsonOpts) -> Result<()> {
    let mut s = to_text_with(value, opts)?;
    s.push('\n');
    fs::write(path, s)?;
    Ok(())
}
