//! Call scenarios against the live mock server.
//!
//! # Design
//! Each test starts its own mock server on a random port, scripts one
//! response, executes a call over real TCP and then checks both sides: the
//! decoded `HttpResponse` and the request the server recorded.

use httpizza_core::{boxed, Client, ClientConfig, HttpError, HttpResponse, Json, RequestBody};
use mock_server::{MockResponse, MockServer, RecordedRequest};
use serde_json::json;

const PATH: &str = "/path?query1=1&query2=2";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn text_response() -> MockResponse {
    MockResponse::new().status(200).body("body").header("Content-Type", "text/plain")
}

fn server_with(response: MockResponse) -> MockServer {
    init_tracing();
    let server = MockServer::start().unwrap();
    server.enqueue(response);
    server
}

fn take(server: &MockServer) -> RecordedRequest {
    server.take_request().expect("server recorded no request")
}

fn assert_text_body(response: &HttpResponse<String>) {
    assert_eq!(response.code(), 200);
    assert_eq!(response.headers().get_all("Content-Type")[0], "text/plain");
    assert_eq!(response.body(), "body");
    assert!(response.is_successful());
}

/// Writes nothing and declares no content type.
struct ZeroLengthBody;

impl RequestBody for ZeroLengthBody {
    fn content_type(&self) -> Option<&str> {
        None
    }

    fn write_to(&self, _sink: &mut dyn std::io::Write) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn get() {
    let server = server_with(text_response());
    let client = Client::new();

    let request = client
        .new_request()
        .url(&server.url(PATH))
        .add_header("User-Agent", "UnitTest")
        .get()
        .build()
        .unwrap();
    let response: HttpResponse<String> = client.new_call(request).execute().unwrap();
    assert_text_body(&response);

    let recorded = take(&server);
    assert_eq!(recorded.method, "GET");
    assert_eq!(recorded.path, PATH);
    assert_eq!(recorded.body_size(), 0);
    assert_eq!(recorded.header("User-Agent"), Some("UnitTest"));
    assert!(recorded.header("Content-Length").is_none());
    assert!(recorded.header("Content-Type").is_none());
}

#[test]
fn post() {
    let server = server_with(text_response());
    let client = Client::new();

    let request = client
        .new_request()
        .url(&server.url(PATH))
        .add_header("User-Agent", "UnitTest")
        .post("requestBody")
        .build()
        .unwrap();
    let response: HttpResponse<String> = client.new_call(request).execute().unwrap();
    assert_text_body(&response);

    let recorded = take(&server);
    assert_eq!(recorded.method, "POST");
    assert_eq!(recorded.path, PATH);
    assert_eq!(recorded.body_size(), 11);
    assert_eq!(recorded.header("Content-Length"), Some("11"));
    assert_eq!(recorded.header("Content-Type"), Some("text/plain; charset=utf-8"));
    assert_eq!(recorded.header("User-Agent"), Some("UnitTest"));
}

#[test]
fn post_zero_length() {
    let server = server_with(text_response());
    let client = Client::new();

    let request = client
        .new_request()
        .url(&server.url(PATH))
        .add_header("User-Agent", "UnitTest")
        .post(ZeroLengthBody)
        .build()
        .unwrap();
    let response: HttpResponse<String> = client.new_call(request).execute().unwrap();
    assert_text_body(&response);

    let recorded = take(&server);
    assert_eq!(recorded.method, "POST");
    assert_eq!(recorded.path, PATH);
    assert_eq!(recorded.body_size(), 0);
    assert!(recorded.header("Content-Length").is_none());
    assert_eq!(recorded.header("User-Agent"), Some("UnitTest"));
}

#[test]
fn put() {
    let server = server_with(text_response());
    let client = Client::new();

    let request = client
        .new_request()
        .url(&server.url(PATH))
        .add_header("User-Agent", "UnitTest")
        .put(String::from("requestBody"))
        .build()
        .unwrap();
    let response: HttpResponse<String> = client.new_call(request).execute().unwrap();
    assert_text_body(&response);

    let recorded = take(&server);
    assert_eq!(recorded.method, "PUT");
    assert_eq!(recorded.path, PATH);
    assert_eq!(recorded.body_size(), 11);
    assert_eq!(recorded.header("Content-Length"), Some("11"));
    assert_eq!(recorded.header("Content-Type"), Some("text/plain; charset=utf-8"));
    assert_eq!(recorded.header("User-Agent"), Some("UnitTest"));
}

#[test]
fn delete() {
    let server = server_with(text_response());
    let client = Client::new();

    let request = client
        .new_request()
        .url(&server.url(PATH))
        .add_header("User-Agent", "UnitTest")
        .delete()
        .build()
        .unwrap();
    let response: HttpResponse<String> = client.new_call(request).execute().unwrap();
    assert_text_body(&response);

    let recorded = take(&server);
    assert_eq!(recorded.method, "DELETE");
    assert_eq!(recorded.path, PATH);
    assert_eq!(recorded.body_size(), 0);
    assert!(recorded.header("Content-Length").is_none());
    assert!(recorded.header("Content-Type").is_none());
    assert_eq!(recorded.header("User-Agent"), Some("UnitTest"));
}

#[test]
fn head() {
    let server = server_with(MockResponse::new().status(200).header("Content-Type", "text/plain"));
    let client = Client::new();

    let request = client
        .new_request()
        .url(&server.url(PATH))
        .add_header("User-Agent", "UnitTest")
        .method("HEAD", None)
        .build()
        .unwrap();
    let response: HttpResponse<String> = client.new_call(request).execute().unwrap();
    assert_eq!(response.code(), 200);
    assert_eq!(response.headers().get_all("Content-Type")[0], "text/plain");
    assert!(response.is_successful());

    let recorded = take(&server);
    assert_eq!(recorded.method, "HEAD");
    assert_eq!(recorded.path, PATH);
    assert_eq!(recorded.body_size(), 0);
    assert!(recorded.header("Content-Length").is_none());
    assert!(recorded.header("Content-Type").is_none());
    assert_eq!(recorded.header("User-Agent"), Some("UnitTest"));
}

#[test]
fn patch_with_json_round_trip() {
    let server = server_with(
        MockResponse::new()
            .status(200)
            .header("Content-Type", "application/json")
            .body(r#"{"name":"margherita","slices":8}"#),
    );
    let client = Client::new();

    let request = client
        .new_request()
        .url(&server.url("/pizzas/1"))
        .patch(Json(json!({ "slices": 8 })))
        .build()
        .unwrap();
    let response: HttpResponse<Json<serde_json::Value>> = client.new_call(request).execute().unwrap();
    let Json(pizza) = response.into_body();
    assert_eq!(pizza["name"], "margherita");

    let recorded = take(&server);
    assert_eq!(recorded.method, "PATCH");
    assert_eq!(recorded.header("Content-Type"), Some("application/json; charset=utf-8"));
    let sent: serde_json::Value = serde_json::from_slice(&recorded.body).unwrap();
    assert_eq!(sent, json!({ "slices": 8 }));
}

#[test]
fn custom_method_with_body() {
    let server = server_with(MockResponse::new().status(204));
    let client = Client::new();

    let request = client
        .new_request()
        .url(&server.url("/cache"))
        .method("PURGE", Some(boxed(b"all".to_vec())))
        .build()
        .unwrap();
    let response: HttpResponse<Vec<u8>> = client.new_call(request).execute().unwrap();
    assert_eq!(response.code(), 204);
    assert!(response.body().is_empty());

    let recorded = take(&server);
    assert_eq!(recorded.method, "PURGE");
    assert_eq!(recorded.header("Content-Type"), Some("application/octet-stream"));
    assert_eq!(recorded.body_size(), 3);
}

#[test]
fn duplicate_headers_reach_the_server() {
    let server = server_with(MockResponse::new());
    let client = Client::new();

    let request = client
        .new_request()
        .url(&server.url("/"))
        .add_header("X-Tag", "first")
        .add_header("X-Tag", "second")
        .get()
        .build()
        .unwrap();
    client.new_call(request).execute::<()>().unwrap();

    let recorded = take(&server);
    let tags: Vec<&str> = recorded
        .headers
        .iter()
        .filter(|(n, _)| n.eq_ignore_ascii_case("X-Tag"))
        .map(|(_, v)| v.as_str())
        .collect();
    assert_eq!(tags, vec!["first", "second"]);
}

#[test]
fn unsuccessful_status_is_returned_not_raised() {
    let server = server_with(MockResponse::new().status(500).body("boom"));
    let client = Client::new();

    let request = client.new_request().url(&server.url("/")).get().build().unwrap();
    let response: HttpResponse<String> = client.new_call(request).execute().unwrap();
    assert_eq!(response.code(), 500);
    assert!(!response.is_successful());
    assert_eq!(response.body(), "boom");
}

#[test]
fn empty_queue_yields_not_found() {
    init_tracing();
    let server = MockServer::start().unwrap();
    let client = Client::new();

    let request = client.new_request().url(&server.url("/nothing")).get().build().unwrap();
    let response: HttpResponse<String> = client.new_call(request).execute().unwrap();
    assert_eq!(response.code(), 404);
}

#[test]
fn connection_refused_is_a_transport_error() {
    init_tracing();
    let url = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        format!("http://{}/", listener.local_addr().unwrap())
    };

    let client = Client::with_config(ClientConfig {
        connect_timeout_ms: Some(1000),
        read_timeout_ms: Some(1000),
        ..ClientConfig::default()
    })
    .unwrap();
    let request = client.new_request().url(&url).get().build().unwrap();
    let err = client.new_call(request).execute::<String>().unwrap_err();
    assert!(matches!(err, HttpError::Transport(_)), "{err}");
}
