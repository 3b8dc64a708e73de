//! End-to-end tests against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives `PortabilityClient`
//! with the default ureq transport over real HTTP: home document discovery,
//! every verb, form and multipart bodies, and each error classification.

use portability_core::{
    ClientConfig, Content, FilePart, Params, PortabilityClient, PortabilityError, ResponseType, UreqTransport,
    USER_AGENT,
};

const API_KEY: &str = "integration-key";

/// Spawn the mock server on its own runtime thread and return its base URL.
fn start_server() -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener, API_KEY).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

fn client(base_url: &str) -> PortabilityClient {
    PortabilityClient::new(ClientConfig::new(base_url, API_KEY)).unwrap()
}

#[test]
fn home_document_drives_resource_accessors() {
    let base_url = start_server();
    let client = client(&base_url);
    assert!(client.has_home_document());
    assert_eq!(client.get_uri_template("customer_url"), Some("/customers/{customer_id}"));

    let numbers = client.get_numbers().unwrap();
    assert_eq!(numbers.items().len(), 3);

    let number = client.get_number(2).unwrap();
    assert_eq!(number["number"], "51999000222");

    let customers = client.get_customers().unwrap();
    assert_eq!(customers.items().len(), 2);

    let customer = client.get_customer(1).unwrap();
    assert_eq!(customer["name"], "ACME Telecom");

    let customer_numbers = client.get_customer_numbers(1).unwrap();
    assert!(customer_numbers
        .items()
        .iter()
        .all(|number| number["customer_id"] == 1));
}

#[test]
fn lazy_home_document_loads_on_first_accessor() {
    let base_url = start_server();
    let config = ClientConfig::new(&base_url, API_KEY).with_load_home(false);
    let client = PortabilityClient::new(config).unwrap();
    assert!(!client.has_home_document());

    let customer = client.get_customer(2).unwrap();
    assert_eq!(customer["name"], "Globex");
    assert!(client.has_home_document());
}

#[test]
fn bad_api_key_fails_construction() {
    let base_url = start_server();
    let err = PortabilityClient::new(ClientConfig::new(&base_url, "wrong")).unwrap_err();
    assert!(err.is_authorization());
    assert_eq!(err.status(), Some(403));
    assert_eq!(err.code(), Some("forbidden"));
}

#[test]
fn get_sends_query_and_default_headers() {
    let base_url = start_server();
    let client = client(&base_url);

    let params = Params::new().text("status", "active");
    let echo = client
        .get("/echo", params, ResponseType::Mapping)
        .unwrap()
        .into_mapping()
        .unwrap();
    assert_eq!(echo["query"]["status"], "active");
    assert_eq!(echo["user_agent"], USER_AGENT);
}

#[test]
fn put_sends_form_body() {
    let base_url = start_server();
    let client = client(&base_url);

    let params = Params::new().text("reason", "porting");
    let echo = client
        .put("/echo", params, ResponseType::Mapping)
        .unwrap()
        .into_mapping()
        .unwrap();
    assert_eq!(echo["form"]["reason"], "porting");
}

#[test]
fn delete_sends_form_body() {
    let base_url = start_server();
    let client = client(&base_url);

    let params = Params::new().text("reason", "customer request");
    let echo = client
        .delete("/echo", params, ResponseType::Mapping)
        .unwrap()
        .into_mapping()
        .unwrap();
    assert_eq!(echo["form"]["reason"], "customer request");
}

#[test]
fn file_without_name_or_type_uses_defaults() {
    let base_url = start_server();
    let client = client(&base_url);

    let params = Params::new().file("scan", FilePart::from_bytes("raw scan"));
    let echo = client
        .post("/echo", params, ResponseType::Mapping)
        .unwrap()
        .into_mapping()
        .unwrap();
    assert_eq!(echo["files"]["scan"]["file_name"], "scan");
    assert_eq!(echo["files"]["scan"]["content_type"], "application/octet-stream");
    assert_eq!(echo["files"]["scan"]["content"], "raw scan");
}

#[test]
fn post_with_file_sends_multipart() {
    let base_url = start_server();
    let client = client(&base_url);

    let params = Params::new().text("number", "51999000111").file(
        "letter",
        FilePart::from_bytes("signed letter")
            .with_file_name("letter.txt")
            .with_content_type("text/plain"),
    );
    let echo = client
        .post("/echo", params, ResponseType::Object)
        .unwrap()
        .into_resource()
        .unwrap();
    assert_eq!(echo["fields"]["number"], "51999000111");
    assert_eq!(echo["files"]["letter"]["file_name"], "letter.txt");
    assert_eq!(echo["files"]["letter"]["content_type"], "text/plain");
    assert_eq!(echo["files"]["letter"]["content"], "signed letter");
}

#[test]
fn number_lifecycle_through_generic_request() {
    let base_url = start_server();
    let client = client(&base_url);

    // Step 1: create a number with a form POST.
    let params = Params::new()
        .text("number", "51999000999")
        .text("customer_id", "2");
    let created = client
        .request("/numbers", "POST", Some(params), "object")
        .unwrap()
        .into_resource()
        .unwrap();
    assert_eq!(created["status"], "pending");
    let id = created["id"].as_u64().unwrap();

    // Step 2: update with PUT.
    let params = Params::new().text("status", "ported");
    let updated = client
        .request(&format!("/numbers/{id}"), "put", Some(params), "dict")
        .unwrap()
        .into_mapping()
        .unwrap();
    assert_eq!(updated["status"], "ported");

    // Step 3: the customer's collection now includes it.
    let numbers = client.get_customer_numbers(2).unwrap();
    assert!(numbers.items().iter().any(|n| n["id"] == id));

    // Step 4: delete.
    let deleted = client
        .request(&format!("/numbers/{id}"), "DELETE", None, "raw")
        .unwrap()
        .into_raw()
        .unwrap();
    assert!(deleted.contains("deleted"));

    // Step 5: fetching it again is an API error carrying the server code.
    let err = client.get_number(id).unwrap_err();
    assert!(matches!(err, PortabilityError::Api { status: 404, .. }));
    assert_eq!(err.to_string(), "not_found: number not found");
}

#[test]
fn validation_error_is_api_error() {
    let base_url = start_server();
    let client = client(&base_url);

    let err = client
        .post("/numbers", Params::new().text("customer_id", "1"), ResponseType::Mapping)
        .unwrap_err();
    assert_eq!(err.status(), Some(422));
    assert_eq!(err.code(), Some("missing_field"));
    assert_eq!(err.error_list().unwrap().len(), 1);
}

#[test]
fn response_type_passthrough_exposes_status_and_headers() {
    let base_url = start_server();
    let client = client(&base_url);

    let response = client
        .get_resource_as("/customers/1", ResponseType::Response)
        .unwrap()
        .into_response()
        .unwrap();
    assert_eq!(response.status, 200);
    assert!(response
        .header("content-type")
        .unwrap()
        .starts_with("application/json"));
}

#[test]
fn malformed_and_quirky_responses() {
    let base_url = start_server();
    let client = client(&base_url);

    let err = client
        .get("/fixtures/not-json", Params::new(), ResponseType::Raw)
        .unwrap_err();
    assert!(matches!(err, PortabilityError::InvalidJson(_)));

    let err = client
        .get("/fixtures/no-errors-field", Params::new(), ResponseType::Mapping)
        .unwrap_err();
    assert!(matches!(err, PortabilityError::UnknownStructure));

    // An empty errors list on a 500 is handed back as content.
    let content = client
        .get("/fixtures/empty-errors", Params::new(), ResponseType::Response)
        .unwrap();
    match content {
        Content::Response(response) => assert_eq!(response.status, 500),
        other => panic!("expected passthrough response, got {other:?}"),
    }
}

#[test]
fn non_utf8_body_is_invalid_json() {
    let base_url = start_server();
    let client = client(&base_url);

    let err = client
        .get("/fixtures/not-utf8", Params::new(), ResponseType::Raw)
        .unwrap_err();
    assert!(matches!(err, PortabilityError::InvalidJson(_)), "{err:?}");
}

#[test]
fn bodies_over_ten_mebibytes_are_read_whole() {
    let base_url = start_server();
    let client = client(&base_url);

    let items = client
        .get("/fixtures/large", Params::new(), ResponseType::Mapping)
        .unwrap()
        .into_mapping()
        .unwrap();
    assert_eq!(items.as_array().unwrap().len(), mock_server::LARGE_ENTRIES);
}

#[test]
fn configured_body_limit_is_enforced() {
    let base_url = start_server();
    let config = ClientConfig::new(&base_url, API_KEY).with_load_home(false);
    let transport = UreqTransport::new().with_body_limit(1024);
    let client = PortabilityClient::with_transport(config, transport).unwrap();

    let err = client
        .get("/fixtures/large", Params::new(), ResponseType::Mapping)
        .unwrap_err();
    assert!(matches!(err, PortabilityError::Transport(_)), "{err:?}");

    // Small bodies still fit.
    let customer = client.get_customer(1).unwrap();
    assert_eq!(customer["name"], "ACME Telecom");
}

#[test]
fn unreachable_server_is_transport_error() {
    // Bind then drop to get a port nothing listens on.
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let config = ClientConfig::new(format!("http://{addr}"), API_KEY);
    let err = PortabilityClient::new(config).unwrap_err();
    assert!(matches!(err, PortabilityError::Transport(_)));
    assert_eq!(err.to_string(), "An unknown error occurred.");
}
