//! Executes `HttpRequest` values over the network.
//!
//! # Design
//! The client only ever talks to a `Transport`. `UreqTransport` is the
//! blocking default; it disables ureq's status-code-as-error behavior so
//! 4xx/5xx bodies reach the client's classifier as data. Bodies are read as
//! raw bytes, so deciding whether they are valid JSON stays with the client.

use ureq::typestate::WithBody;
use ureq::unversioned::multipart::{Form, Part};
use ureq::{Agent, RequestBuilder};

use crate::error::TransportError;
use crate::http::{FileUpload, HttpMethod, HttpRequest, HttpResponse, RequestBody};

const DEFAULT_FILE_CONTENT_TYPE: &str = "application/octet-stream";

/// Performs one HTTP exchange. Implementations must not retry.
pub trait Transport: Send + Sync {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Blocking transport backed by a `ureq::Agent`.
#[derive(Clone)]
pub struct UreqTransport {
    agent: Agent,
    body_limit: u64,
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self::with_agent(agent)
    }

    /// Use a caller-configured agent. It should have `http_status_as_error`
    /// disabled, otherwise error statuses surface as transport failures.
    pub fn with_agent(agent: Agent) -> Self {
        Self {
            agent,
            body_limit: u64::MAX,
        }
    }

    /// Cap response bodies at `limit` bytes. Larger bodies fail as transport
    /// errors. Unlimited by default.
    pub fn with_body_limit(mut self, limit: u64) -> Self {
        self.body_limit = limit;
        self
    }

    pub fn body_limit(&self) -> u64 {
        self.body_limit
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let HttpRequest {
            method,
            url,
            query,
            headers,
            body,
        } = request;

        let mut response = match method {
            HttpMethod::Get => {
                let mut builder = self.agent.get(&url);
                for (name, value) in &query {
                    builder = builder.query(name, value);
                }
                for (name, value) in &headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                builder.call()?
            }
            HttpMethod::Post => send(self.agent.post(&url), &headers, body)?,
            HttpMethod::Put => send(self.agent.put(&url), &headers, body)?,
            HttpMethod::Delete => send(self.agent.delete(&url).force_send_body(), &headers, body)?,
        };

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response
            .body_mut()
            .with_config()
            .limit(self.body_limit)
            .read_to_vec()?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).execute(request)
    }
}

fn send(
    mut builder: RequestBuilder<WithBody>,
    headers: &[(String, String)],
    body: Option<RequestBody>,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    match body {
        None => builder.send_empty(),
        Some(RequestBody::Form(pairs)) => builder.send_form(pairs),
        Some(RequestBody::Multipart { text, files }) => {
            let form = multipart_form(&text, &files)?;
            builder.send(form)
        }
    }
}

fn multipart_form<'a>(
    text: &'a [(String, String)],
    files: &'a [FileUpload],
) -> Result<Form<'a>, ureq::Error> {
    let mut form = Form::new();
    for (name, value) in text {
        form = form.text(name, value);
    }
    for file in files {
        let mut part = Part::bytes(&file.bytes);
        if let Some(file_name) = &file.file_name {
            part = part.file_name(file_name);
        }
        let content_type = file.content_type.as_deref().unwrap_or(DEFAULT_FILE_CONTENT_TYPE);
        form = form.part(&file.name, part.mime_str(content_type)?);
    }
    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_limit_defaults_to_unbounded() {
        assert_eq!(UreqTransport::new().body_limit(), u64::MAX);
        assert_eq!(UreqTransport::default().with_body_limit(1024).body_limit(), 1024);
    }
}
