//! Blocking client for the Portability Integration API.
//!
//! # Design
//! Every call runs the same pipeline: validate the response type and method,
//! resolve the URL against `base_url`, split parameters, overlay the API key
//! header, hand the `HttpRequest` to the `Transport`, then classify the
//! `HttpResponse`. `build_request` and `parse_response` expose the two pure
//! halves so they can be exercised without a network.
//!
//! Resource paths come from the home document (`GET /`), fetched once and
//! cached for the client's lifetime.

use std::fmt;

use once_cell::sync::OnceCell;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::error::{PortabilityError, Result};
use crate::home::{
    HomeDocument, CUSTOMER_COLLECTION_URL, CUSTOMER_NUMBER_COLLECTION_URL, CUSTOMER_URL,
    NUMBER_COLLECTION_URL, NUMBER_URL,
};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, RequestBody};
use crate::params::{split_params, Params};
use crate::response::{Content, Resource, ResponseType};
use crate::transport::{Transport, UreqTransport};

pub struct PortabilityClient {
    config: ClientConfig,
    transport: Box<dyn Transport>,
    home: OnceCell<HomeDocument>,
}

impl PortabilityClient {
    /// Create a client over the default ureq transport. When
    /// `config.load_home` is set the home document is fetched here and any
    /// failure is returned.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_transport(config, UreqTransport::new())
    }

    pub fn with_transport(config: ClientConfig, transport: impl Transport + 'static) -> Result<Self> {
        let client = Self {
            config,
            transport: Box::new(transport),
            home: OnceCell::new(),
        };
        if client.config.load_home {
            client.load_home_document()?;
        }
        Ok(client)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn get(&self, endpoint: &str, params: Params, response_type: ResponseType) -> Result<Content> {
        self.send(endpoint, HttpMethod::Get, params, response_type)
    }

    pub fn put(&self, endpoint: &str, params: Params, response_type: ResponseType) -> Result<Content> {
        self.send(endpoint, HttpMethod::Put, params, response_type)
    }

    pub fn post(&self, endpoint: &str, params: Params, response_type: ResponseType) -> Result<Content> {
        self.send(endpoint, HttpMethod::Post, params, response_type)
    }

    pub fn delete(&self, endpoint: &str, params: Params, response_type: ResponseType) -> Result<Content> {
        self.send(endpoint, HttpMethod::Delete, params, response_type)
    }

    /// Untyped entry point. `method` is matched case-insensitively and
    /// `response_type` is one of `dict`, `object`, `raw` or `response`. Both
    /// are validated before anything is sent.
    pub fn request(
        &self,
        endpoint: &str,
        method: &str,
        params: Option<Params>,
        response_type: &str,
    ) -> Result<Content> {
        let params = params.unwrap_or_default();
        let response_type: ResponseType = response_type.parse()?;
        let url = self.config.resolve_url(endpoint);
        let method: HttpMethod = method.parse()?;
        self.dispatch(url, method, params, response_type)
    }

    pub fn send(
        &self,
        endpoint: &str,
        method: HttpMethod,
        params: Params,
        response_type: ResponseType,
    ) -> Result<Content> {
        let url = self.config.resolve_url(endpoint);
        self.dispatch(url, method, params, response_type)
    }

    fn dispatch(
        &self,
        url: String,
        method: HttpMethod,
        params: Params,
        response_type: ResponseType,
    ) -> Result<Content> {
        let request = self.build_request(url, method, params)?;
        debug!(method = %request.method, url = %request.url, "sending request");
        let response = self
            .transport
            .execute(request)
            .map_err(PortabilityError::Transport)?;
        debug!(status = response.status, "received response");
        self.parse_response(response, response_type)
    }

    /// Build the wire request for an already resolved `url`. GET carries text
    /// params in the query string; the other verbs send them as a form, or as
    /// multipart when any file is present.
    pub fn build_request(&self, url: String, method: HttpMethod, params: Params) -> Result<HttpRequest> {
        let (text, files) = split_params(params);
        let headers = self.config.request_headers();

        let (query, body) = match method {
            HttpMethod::Get => (text, None),
            _ if !files.is_empty() => {
                let files = files
                    .into_iter()
                    .map(|(name, part)| part.into_upload(name))
                    .collect::<std::io::Result<Vec<_>>>()
                    .map_err(|e| PortabilityError::Transport(Box::new(e)))?;
                (Vec::new(), Some(RequestBody::Multipart { text, files }))
            }
            _ if text.is_empty() => (Vec::new(), None),
            _ => (Vec::new(), Some(RequestBody::Form(text))),
        };

        Ok(HttpRequest {
            method,
            url,
            query,
            headers,
            body,
        })
    }

    /// Classify a response and convert it on success.
    ///
    /// The body must be JSON whatever the status. 401/403 become
    /// `Authorization`, any other status but 200/204 becomes `Api`, both
    /// built from the first entry of the body's `errors` list. An empty
    /// `errors` list falls through to success unless `strict_errors` is set.
    pub fn parse_response(&self, response: HttpResponse, response_type: ResponseType) -> Result<Content> {
        let json: Value = serde_json::from_slice(&response.body).map_err(PortabilityError::InvalidJson)?;

        if !response.is_success() {
            let errors = match json.get("errors") {
                Some(Value::Array(errors)) => errors,
                _ => return Err(PortabilityError::UnknownStructure),
            };
            match errors.first() {
                Some(first) => {
                    let first = first.as_object().ok_or(PortabilityError::UnknownStructure)?;
                    return Err(classify(
                        response.status,
                        text_field(first, "code"),
                        text_field(first, "message"),
                        errors.clone(),
                    ));
                }
                None if self.config.strict_errors => {
                    return Err(classify(response.status, String::new(), String::new(), Vec::new()));
                }
                None => {}
            }
        }

        Ok(response_type.convert(response, json))
    }

    /// Fetch `/` without caching it.
    pub fn get_home_document(&self, response_type: ResponseType) -> Result<Content> {
        self.get("/", Params::new(), response_type)
    }

    /// Fetch and cache the home document. Once loaded it is never refetched;
    /// later calls return the cached copy.
    pub fn load_home_document(&self) -> Result<&HomeDocument> {
        self.home.get_or_try_init(|| -> Result<HomeDocument> {
            let value = self
                .get_home_document(ResponseType::Mapping)?
                .into_mapping()
                .ok_or(PortabilityError::UnknownStructure)?;
            let home = HomeDocument::from_json(value)?;
            info!(templates = home.len(), "loaded home document");
            Ok(home)
        })
    }

    pub fn has_home_document(&self) -> bool {
        self.home.get().is_some()
    }

    pub fn home_document(&self) -> Option<&HomeDocument> {
        self.home.get()
    }

    /// `None` when the key is missing or the home document is not loaded.
    pub fn get_uri_template(&self, key: &str) -> Option<&str> {
        self.home.get()?.uri_template(key)
    }

    /// Expand the named template. `Ok(None)` when the key is missing or the
    /// home document is not loaded.
    pub fn expand_uri_template<I, K, V>(&self, key: &str, vars: I) -> Result<Option<String>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        match self.home.get() {
            Some(home) => home.expand(key, vars),
            None => Ok(None),
        }
    }

    /// GET `endpoint` as a `Resource`.
    pub fn get_resource(&self, endpoint: &str) -> Result<Resource> {
        self.get_resource_as(endpoint, ResponseType::Object)?
            .into_resource()
            .ok_or(PortabilityError::UnknownStructure)
    }

    pub fn get_resource_as(&self, endpoint: &str, response_type: ResponseType) -> Result<Content> {
        self.get(endpoint, Params::new(), response_type)
    }

    pub fn get_numbers(&self) -> Result<Resource> {
        self.get_linked(NUMBER_COLLECTION_URL, Vec::<(String, String)>::new())
    }

    pub fn get_number(&self, number_id: impl fmt::Display) -> Result<Resource> {
        self.get_linked(NUMBER_URL, [("number_id", number_id.to_string())])
    }

    pub fn get_customers(&self) -> Result<Resource> {
        self.get_linked(CUSTOMER_COLLECTION_URL, Vec::<(String, String)>::new())
    }

    pub fn get_customer(&self, customer_id: impl fmt::Display) -> Result<Resource> {
        self.get_linked(CUSTOMER_URL, [("customer_id", customer_id.to_string())])
    }

    pub fn get_customer_numbers(&self, customer_id: impl fmt::Display) -> Result<Resource> {
        self.get_linked(
            CUSTOMER_NUMBER_COLLECTION_URL,
            [("customer_id", customer_id.to_string())],
        )
    }

    // Loads the home document on first use when construction skipped it.
    fn get_linked<I, K, V>(&self, key: &str, vars: I) -> Result<Resource>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let endpoint = self
            .load_home_document()?
            .expand(key, vars)?
            .ok_or_else(|| PortabilityError::MissingTemplate(key.to_string()))?;
        self.get_resource(&endpoint)
    }
}

impl fmt::Debug for PortabilityClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortabilityClient")
            .field("base_url", &self.config.base_url)
            .field("api_key", &"<redacted>")
            .field("has_home_document", &self.has_home_document())
            .finish()
    }
}

fn classify(status: u16, code: String, message: String, errors: Vec<Value>) -> PortabilityError {
    if matches!(status, 401 | 403) {
        PortabilityError::Authorization {
            status,
            code,
            message,
            errors,
        }
    } else {
        PortabilityError::Api {
            status,
            code,
            message,
            errors,
        }
    }
}

// Missing and null fields read as empty; other non-strings as their JSON text.
fn text_field(entry: &Map<String, Value>, name: &str) -> String {
    match entry.get(name) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}
