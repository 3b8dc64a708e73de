//! Blocking client for the Portability Integration API.
//!
//! # Overview
//! The API is hypermedia-driven: its root resource (the home document) maps
//! link names to RFC 6570 URI templates. The client fetches that document,
//! expands templates into endpoint paths, and funnels every call through one
//! request pipeline that turns HTTP responses into `Content` or a typed
//! `PortabilityError`.
//!
//! # Design
//! - `PortabilityClient` owns an immutable `ClientConfig`; the `X-ApiKey`
//!   header is overlaid per request instead of being written back.
//! - Requests and responses are plain data (`HttpRequest`, `HttpResponse`);
//!   a `Transport` performs the exchange, `UreqTransport` by default.
//! - Parameters are explicitly text or file (`ParamValue`), and successful
//!   bodies come back in the caller-selected `ResponseType`.
//! - No retries, caching or pagination. Calls block until the exchange ends.

pub mod client;
pub mod config;
pub mod error;
pub mod home;
pub mod http;
pub mod params;
pub mod response;
pub mod transport;

pub use client::PortabilityClient;
pub use config::{ClientConfig, API_KEY_HEADER, USER_AGENT};
pub use error::{PortabilityError, Result, TransportError};
pub use home::HomeDocument;
pub use http::{FileUpload, HttpMethod, HttpRequest, HttpResponse, RequestBody};
pub use params::{split_params, FilePart, ParamValue, Params};
pub use response::{Content, Resource, ResponseType};
pub use transport::{Transport, UreqTransport};
