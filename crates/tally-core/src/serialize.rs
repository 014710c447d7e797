//! Flat JSON rendering of a registry snapshot.
//!
//! Entries are streamed through `serde_json`'s map serializer in the order
//! given; callers pass a snapshot that is already sorted and has one entry
//! per name.

use std::fmt;

use serde::Serializer;

use crate::error::{Result, TelemetryError};
use crate::metric::MetricKind;

/// Output layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SerializationFormat {
    /// Two-space indented object, one entry per line, no trailing newline.
    #[default]
    PlainJson,
    /// Same entries without any whitespace.
    CompactJson,
}

/// One metric's current value as seen by the serializer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub kind: MetricKind,
    pub value: u64,
}

impl Entry {
    pub fn new(name: &str, kind: MetricKind, value: u64) -> Self {
        Self {
            name: name.to_owned(),
            kind,
            value,
        }
    }
}

/// Owned serialization output.
///
/// The text is immutable once rendered; `as_str` hands out a view that lives
/// as long as this value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedJson {
    text: Box<str>,
}

impl SerializedJson {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }

    pub fn into_string(self) -> String {
        self.text.into_string()
    }
}

impl fmt::Display for SerializedJson {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Render `entries` in `format`. Entries are written in the order given.
pub fn render(entries: &[Entry], format: SerializationFormat) -> Result<SerializedJson> {
    let pairs = entries.iter().map(|e| (e.name.as_str(), e.value));
    let mut buf = Vec::with_capacity(16 + entries.len() * 24);

    match format {
        SerializationFormat::PlainJson => {
            let mut ser = serde_json::Serializer::pretty(&mut buf);
            (&mut ser).collect_map(pairs).map_err(encode_failed)?;
        }
        SerializationFormat::CompactJson => {
            let mut ser = serde_json::Serializer::new(&mut buf);
            (&mut ser).collect_map(pairs).map_err(encode_failed)?;
        }
    }

    let text = String::from_utf8(buf)
        .map_err(|e| TelemetryError::Internal(format!("serializer produced invalid utf-8: {e}")))?;
    Ok(SerializedJson {
        text: text.into_boxed_str(),
    })
}

fn encode_failed(e: serde_json::Error) -> TelemetryError {
    TelemetryError::Internal(format!("json encode failed: {e}"))
}
