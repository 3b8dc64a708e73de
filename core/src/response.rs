//! Response conversion.
//!
//! # Design
//! The caller picks a `ResponseType` per call; a successful response is turned
//! into the matching `Content` variant. `Object` wraps the JSON tree in a
//! read-only `Resource` rather than building ad hoc structs, and callers that
//! want a concrete shape deserialize it with `Resource::deserialize`.

use std::fmt;
use std::ops::Index;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{PortabilityError, Result};
use crate::http::HttpResponse;

/// How a successful response is handed back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResponseType {
    /// Parsed JSON as a generic value.
    #[default]
    Mapping,
    /// Parsed JSON wrapped in a read-only `Resource`.
    Object,
    /// The body as text.
    Raw,
    /// The response itself.
    Response,
}

impl ResponseType {
    pub const ALL: [ResponseType; 4] = [
        ResponseType::Mapping,
        ResponseType::Object,
        ResponseType::Raw,
        ResponseType::Response,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Mapping => "dict",
            ResponseType::Object => "object",
            ResponseType::Raw => "raw",
            ResponseType::Response => "response",
        }
    }

    /// Convert a response whose body has already been parsed as `json`.
    pub fn convert(self, response: HttpResponse, json: Value) -> Content {
        match self {
            ResponseType::Mapping => Content::Mapping(json),
            ResponseType::Object => Content::Object(Resource::new(json)),
            ResponseType::Raw => Content::Raw(response.text()),
            ResponseType::Response => Content::Response(response),
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseType {
    type Err = PortabilityError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "dict" | "mapping" => Ok(ResponseType::Mapping),
            "object" => Ok(ResponseType::Object),
            "raw" => Ok(ResponseType::Raw),
            "response" => Ok(ResponseType::Response),
            other => Err(PortabilityError::UnsupportedResponseType(other.to_string())),
        }
    }
}

/// A converted successful response.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Mapping(Value),
    Object(Resource),
    Raw(String),
    Response(HttpResponse),
}

impl Content {
    pub fn response_type(&self) -> ResponseType {
        match self {
            Content::Mapping(_) => ResponseType::Mapping,
            Content::Object(_) => ResponseType::Object,
            Content::Raw(_) => ResponseType::Raw,
            Content::Response(_) => ResponseType::Response,
        }
    }

    pub fn into_mapping(self) -> Option<Value> {
        match self {
            Content::Mapping(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_resource(self) -> Option<Resource> {
        match self {
            Content::Object(resource) => Some(resource),
            _ => None,
        }
    }

    pub fn into_raw(self) -> Option<String> {
        match self {
            Content::Raw(body) => Some(body),
            _ => None,
        }
    }

    pub fn into_response(self) -> Option<HttpResponse> {
        match self {
            Content::Response(response) => Some(response),
            _ => None,
        }
    }
}

/// Read-only JSON resource. Fields are looked up by name; nested objects
/// come back as `Resource` too.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource(Value);

impl Resource {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Nested object or array element as a resource.
    pub fn child(&self, field: &str) -> Option<Resource> {
        self.0.get(field).cloned().map(Resource)
    }

    /// Field names when the resource is an object.
    pub fn fields(&self) -> Vec<&str> {
        self.0
            .as_object()
            .map(|map| map.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Elements when the resource is a JSON array.
    pub fn items(&self) -> Vec<Resource> {
        self.0
            .as_array()
            .map(|items| items.iter().cloned().map(Resource).collect())
            .unwrap_or_default()
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        T::deserialize(&self.0).map_err(PortabilityError::Shape)
    }
}

/// Missing fields index to `Value::Null`, like `serde_json::Value`.
impl Index<&str> for Resource {
    type Output = Value;

    fn index(&self, field: &str) -> &Value {
        &self.0[field]
    }
}
