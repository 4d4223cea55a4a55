use courier::http::request::{Method, RequestBuilder};

#[test]
fn test_request_header_retrieval() {
    let req = RequestBuilder::new()
        .method(Method::GET)
        .target("/")
        .header("Content-Type", "application/json")
        .header("X-Custom", "value")
        .build()
        .unwrap();

    assert_eq!(req.header("content-type"), Some("application/json"));
    assert_eq!(req.header("CONTENT-TYPE"), Some("application/json"));
    assert_eq!(req.header("x-custom"), Some("value"));
    assert_eq!(req.header("missing"), None);
}

#[test]
fn test_request_is_chunked() {
    let req = RequestBuilder::new()
        .method(Method::POST)
        .target("/")
        .header("Transfer-Encoding", "chunked")
        .trailer("X-Checksum", "abc")
        .build()
        .unwrap();

    assert!(req.is_chunked());
    assert_eq!(req.trailers.get("x-checksum"), Some("abc"));
}

#[test]
fn test_request_builder_requires_method_and_target() {
    assert!(RequestBuilder::new().target("/").build().is_err());
    assert!(RequestBuilder::new().method(Method::GET).build().is_err());
}

#[test]
fn test_request_method_equality() {
    assert_eq!(Method::GET, Method::GET);
    assert_ne!(Method::GET, Method::POST);
    assert_ne!(Method::GET, Method::Extension("GET2".to_string()));
}

#[test]
fn test_request_method_from_string() {
    assert_eq!(Method::parse("GET"), Some(Method::GET));
    assert_eq!(Method::parse("POST"), Some(Method::POST));
    assert_eq!(Method::parse("DELETE"), Some(Method::DELETE));
    assert_eq!(
        Method::parse("PURGE"),
        Some(Method::Extension("PURGE".to_string()))
    );
    assert_eq!(Method::parse("Get"), None);
    assert_eq!(Method::parse("GET1"), None);
    assert_eq!(Method::parse(""), None);
}

#[test]
fn test_request_method_display() {
    assert_eq!(Method::PATCH.to_string(), "PATCH");
    assert_eq!(Method::Extension("PURGE".to_string()).as_str(), "PURGE");
}

#[test]
fn test_request_with_body() {
    let body = b"Hello, World!".to_vec();
    let req = RequestBuilder::new()
        .method(Method::POST)
        .target("/api/data")
        .body(body.clone())
        .build()
        .unwrap();

    assert_eq!(req.body, body);
    assert_eq!(req.target(), "/api/data");
    assert_eq!(req.line.version, "1.1");
}
