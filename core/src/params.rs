//! Request parameters.
//!
//! # Design
//! A parameter is either a text value (query string or form field) or a file
//! handle (multipart upload). The variant is chosen by the caller, so nothing
//! is classified at dispatch time. `Params::from_json` is the one untyped
//! entry point and keeps only string values.
//!
//! File handles stay unread until the request is built; `FilePart::into_upload`
//! drains the reader into a plain-data `FileUpload` for the transport.

use std::fmt;
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::Path;

use serde_json::{Map, Value};
use tracing::debug;

use crate::http::FileUpload;

/// A readable upload.
pub struct FilePart {
    reader: Box<dyn Read + Send>,
    file_name: Option<String>,
    content_type: Option<String>,
}

impl FilePart {
    pub fn new(reader: impl Read + Send + 'static) -> Self {
        Self {
            reader: Box::new(reader),
            file_name: None,
            content_type: None,
        }
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(Cursor::new(bytes.into()))
    }

    /// Open a file on disk; the part's file name is the path's last component.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mut part = Self::new(file);
        part.file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        Ok(part)
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Drain the reader.
    pub fn read_all(&mut self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.reader.read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Read the whole part for the form field `name`. Without an explicit
    /// file name the field name is used, so the server still sees a file.
    pub fn into_upload(mut self, name: String) -> io::Result<FileUpload> {
        let bytes = self.read_all()?;
        Ok(FileUpload {
            file_name: Some(self.file_name.unwrap_or_else(|| name.clone())),
            name,
            content_type: self.content_type,
            bytes,
        })
    }
}

impl fmt::Debug for FilePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilePart")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub enum ParamValue {
    Text(String),
    File(FilePart),
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<FilePart> for ParamValue {
    fn from(value: FilePart) -> Self {
        ParamValue::File(value)
    }
}

/// Ordered request parameters. Duplicate names are sent as repeated fields.
#[derive(Debug, Default)]
pub struct Params {
    entries: Vec<(String, ParamValue)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries
            .push((name.into(), ParamValue::Text(value.into())));
        self
    }

    pub fn file(mut self, name: impl Into<String>, part: FilePart) -> Self {
        self.entries.push((name.into(), ParamValue::File(part)));
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Build from an untyped JSON object. String values become text
    /// parameters; numbers, booleans, nulls, arrays and objects are dropped.
    pub fn from_json(map: Map<String, Value>) -> Self {
        let mut params = Self::new();
        for (name, value) in map {
            match value {
                Value::String(text) => params.insert(name, text),
                other => debug!(param = %name, kind = json_kind(&other), "dropping non-string parameter"),
            }
        }
        params
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (name, value) in iter {
            params.insert(name, value);
        }
        params
    }
}

/// Split parameters into disjoint text and file lists, preserving order.
pub fn split_params(params: Params) -> (Vec<(String, String)>, Vec<(String, FilePart)>) {
    let mut text = Vec::new();
    let mut files = Vec::new();
    for (name, value) in params.entries {
        match value {
            ParamValue::Text(value) => text.push((name, value)),
            ParamValue::File(part) => files.push((name, part)),
        }
    }
    (text, files)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
