use tollgate::http::headers::Headers;
use tollgate::http::request::{Method, Request, RequestBuilder};

fn request(version: &str, headers: Headers) -> Request {
    Request {
        method: Method::GET,
        path: "/".to_string(),
        query: None,
        version: version.to_string(),
        headers,
        body: vec![],
        remote_addr: String::new(),
    }
}

#[test]
fn test_request_header_retrieval() {
    let headers: Headers = [("Host", "example.com"), ("Content-Type", "application/json")]
        .into_iter()
        .collect();
    let req = request("HTTP/1.1", headers);

    assert_eq!(req.header("Host"), Some("example.com"));
    assert_eq!(req.header("content-type"), Some("application/json"));
    assert_eq!(req.header("Missing"), None);
}

#[test]
fn test_request_keep_alive_http11_default() {
    assert!(request("HTTP/1.1", Headers::new()).keep_alive());
}

#[test]
fn test_request_keep_alive_close() {
    let req = request("HTTP/1.1", [("Connection", "close")].into_iter().collect());
    assert!(!req.keep_alive());
}

#[test]
fn test_request_keep_alive_http10() {
    assert!(!request("HTTP/1.0", Headers::new()).keep_alive());

    let req = request("HTTP/1.0", [("Connection", "Keep-Alive")].into_iter().collect());
    assert!(req.keep_alive());
}

#[test]
fn test_request_is_http1() {
    assert!(request("HTTP/1.1", Headers::new()).is_http1());
    assert!(request("HTTP/1.0", Headers::new()).is_http1());
    assert!(!request("HTTP/2.0", Headers::new()).is_http1());
}

#[test]
fn test_request_method_parse() {
    assert_eq!(Method::parse("GET"), Some(Method::GET));
    assert_eq!(Method::parse("POST"), Some(Method::POST));
    assert_eq!(Method::parse("get"), Some(Method::Extension("get".to_string())));
    assert_eq!(Method::parse(""), None);
    assert_eq!(Method::parse("GE(T"), None);
}

#[test]
fn test_request_method_display_roundtrips_token() {
    assert_eq!(Method::DELETE.to_string(), "DELETE");
    assert_eq!(Method::Extension("PROPFIND".into()).to_string(), "PROPFIND");
}

#[test]
fn test_request_builder() {
    let req = RequestBuilder::new()
        .method(Method::POST)
        .path("/api")
        .query("a=1")
        .header("X-Test", "1")
        .body(b"payload".to_vec())
        .remote_addr("10.0.0.1:5000")
        .build()
        .unwrap();

    assert_eq!(req.version, "HTTP/1.1");
    assert_eq!(req.query.as_deref(), Some("a=1"));
    assert_eq!(req.remote_addr, "10.0.0.1:5000");
    assert_eq!(req.body, b"payload");
}

#[test]
fn test_request_builder_requires_method_and_path() {
    assert!(RequestBuilder::new().path("/").build().is_err());
    assert!(RequestBuilder::new().method(Method::GET).build().is_err());
}
