//! Home document and URI template expansion.
//!
//! # Design
//! The API root (`/`) answers with a JSON object mapping link names to
//! RFC 6570 URI templates. Resource paths are built by expanding those
//! templates instead of being hardcoded. The document is kept as the raw
//! JSON object; lookups treat non-string values as absent, and expansion
//! follows RFC 6570 through `iri-string`.

use iri_string::spec::UriSpec;
use iri_string::template::simple_context::SimpleContext;
use iri_string::template::UriTemplateStr;
use serde_json::{Map, Value};

use crate::error::{PortabilityError, Result};

pub const NUMBER_COLLECTION_URL: &str = "number_collection_url";
pub const NUMBER_URL: &str = "number_url";
pub const CUSTOMER_COLLECTION_URL: &str = "customer_collection_url";
pub const CUSTOMER_URL: &str = "customer_url";
pub const CUSTOMER_NUMBER_COLLECTION_URL: &str = "customer_number_collection_url";

/// Link templates published by the API root. Read-only once loaded.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HomeDocument {
    links: Map<String, Value>,
}

impl HomeDocument {
    /// The home document must be a JSON object.
    pub fn from_json(value: Value) -> Result<Self> {
        match value {
            Value::Object(links) => Ok(Self { links }),
            _ => Err(PortabilityError::UnknownStructure),
        }
    }

    /// Template for `key`. Keys whose value is not a string count as missing.
    pub fn uri_template(&self, key: &str) -> Option<&str> {
        self.links.get(key).and_then(Value::as_str)
    }

    /// Expand the template under `key`; `Ok(None)` when there is no such key.
    pub fn expand<I, K, V>(&self, key: &str, vars: I) -> Result<Option<String>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        match self.uri_template(key) {
            None => Ok(None),
            Some(template) => expand_template(key, template, vars).map(Some),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.links.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

fn expand_template<I, K, V>(key: &str, template: &str, vars: I) -> Result<String>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let template_error = |source: iri_string::template::Error| PortabilityError::Template {
        key: key.to_string(),
        source,
    };
    let template = UriTemplateStr::new(template).map_err(template_error)?;

    let mut context = SimpleContext::new();
    for (name, value) in vars {
        context.insert(name.into(), value.into());
    }

    let expanded = template
        .expand::<UriSpec, _>(&context)
        .map_err(template_error)?;
    Ok(expanded.to_string())
}
