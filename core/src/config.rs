//! Client configuration.
//!
//! # Design
//! `ClientConfig` is fixed once the client is built. Per-request concerns
//! derive from it without writing back: `request_headers` returns a fresh
//! header list with `X-ApiKey` overlaid, and `resolve_url` joins relative
//! endpoints to `base_url` by plain concatenation.

use serde::Deserialize;

use crate::http::find_header;

/// Value of the default `User-agent` header.
pub const USER_AGENT: &str = concat!("Requests-Portability ", env!("CARGO_PKG_VERSION"));

/// Header carrying the API key on every request.
pub const API_KEY_HEADER: &str = "X-ApiKey";

/// Immutable settings for a `PortabilityClient`.
///
/// Can be built in code or deserialized; everything except `base_url` and
/// `api_key` has a default.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    /// Prefix for relative endpoints. Joined literally, no slash handling.
    pub base_url: String,
    pub api_key: String,
    /// Sent on every request. Defaults to a single `User-agent` header.
    #[serde(default = "default_headers")]
    pub headers: Vec<(String, String)>,
    /// Fetch the home document while constructing the client.
    #[serde(default = "default_load_home")]
    pub load_home: bool,
    /// Treat a non-success status as an error even when `errors` is empty.
    #[serde(default)]
    pub strict_errors: bool,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            headers: default_headers(),
            load_home: default_load_home(),
            strict_errors: false,
        }
    }

    /// Replace the header set, dropping the default user agent.
    pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers = headers
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_load_home(mut self, load_home: bool) -> Self {
        self.load_home = load_home;
        self
    }

    pub fn with_strict_errors(mut self, strict_errors: bool) -> Self {
        self.strict_errors = strict_errors;
        self
    }

    /// Headers for one request: the configured set plus `X-ApiKey`, unless
    /// the configured set already carries it.
    pub fn request_headers(&self) -> Vec<(String, String)> {
        let mut headers = self.headers.clone();
        if find_header(&headers, API_KEY_HEADER).is_none() {
            headers.push((API_KEY_HEADER.to_string(), self.api_key.clone()));
        }
        headers
    }

    /// Absolute endpoints pass through; anything else is appended to
    /// `base_url` as-is.
    pub fn resolve_url(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else {
            format!("{}{endpoint}", self.base_url)
        }
    }
}

fn default_headers() -> Vec<(String, String)> {
    vec![("User-agent".to_string(), USER_AGENT.to_string())]
}

fn default_load_home() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_user_agent_and_eager_home() {
        let config = ClientConfig::new("https://api.example.com/v1/", "key");
        assert_eq!(
            config.headers,
            vec![("User-agent".to_string(), USER_AGENT.to_string())]
        );
        assert!(USER_AGENT.starts_with("Requests-Portability "));
        assert!(config.load_home);
        assert!(!config.strict_errors);
    }

    #[test]
    fn relative_endpoints_concatenate_literally() {
        let config = ClientConfig::new("https://api.example.com/v1/", "key");
        assert_eq!(config.resolve_url("orders"), "https://api.example.com/v1/orders");
        assert_eq!(config.resolve_url("/orders"), "https://api.example.com/v1//orders");
    }

    #[test]
    fn absolute_endpoints_are_used_verbatim() {
        let config = ClientConfig::new("https://api.example.com/v1/", "key");
        assert_eq!(config.resolve_url("http://other.test/x"), "http://other.test/x");
        assert_eq!(config.resolve_url("https://other.test/y"), "https://other.test/y");
    }

    #[test]
    fn api_key_header_is_injected() {
        let config = ClientConfig::new("http://h", "secret");
        let headers = config.request_headers();
        assert_eq!(headers.len(), 2);
        assert_eq!(find_header(&headers, "x-apikey"), Some("secret"));
        // The stored set is untouched.
        assert_eq!(config.headers.len(), 1);
    }

    #[test]
    fn caller_supplied_api_key_header_wins() {
        let config = ClientConfig::new("http://h", "secret").with_headers([("x-apikey", "override")]);
        let headers = config.request_headers();
        assert_eq!(headers, vec![("x-apikey".to_string(), "override".to_string())]);
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"base_url":"http://h/","api_key":"k"}"#).unwrap();
        assert_eq!(config, ClientConfig::new("http://h/", "k"));

        let config: ClientConfig = serde_json::from_str(
            r#"{"base_url":"http://h/","api_key":"k","headers":[["Accept","application/json"]],"load_home":false,"strict_errors":true}"#,
        )
        .unwrap();
        assert_eq!(config.headers, vec![("Accept".to_string(), "application/json".to_string())]);
        assert!(!config.load_home);
        assert!(config.strict_errors);
    }
}
