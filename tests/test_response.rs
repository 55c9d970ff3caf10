use tollgate::http::response::{Reply, Response, ResponseBuilder, StatusCode};
use tollgate::http::writer::serialize_response;

#[test]
fn test_status_code_as_u16() {
    assert_eq!(StatusCode::Ok.as_u16(), 200);
    assert_eq!(StatusCode::BadRequest.as_u16(), 400);
    assert_eq!(StatusCode::InternalServerError.as_u16(), 500);
    assert_eq!(StatusCode::BadGateway.as_u16(), 502);
}

#[test]
fn test_status_code_reason_phrase() {
    assert_eq!(StatusCode::Ok.reason_phrase(), "OK");
    assert_eq!(StatusCode::BadRequest.reason_phrase(), "Bad Request");
    assert_eq!(
        StatusCode::InternalServerError.reason_phrase(),
        "Internal Server Error"
    );
    assert_eq!(StatusCode::BadGateway.reason_phrase(), "Bad Gateway");
}

#[test]
fn test_response_builder_auto_content_length() {
    let body = b"This is the body".to_vec();
    let response = ResponseBuilder::new(StatusCode::Ok)
        .body(body.clone())
        .build();

    assert_eq!(response.headers.get("Content-Length").unwrap(), body.len().to_string());
}

#[test]
fn test_response_builder_preserves_custom_content_length() {
    let response = ResponseBuilder::new(StatusCode::Ok)
        .header("content-length", "999")
        .body(b"test".to_vec())
        .build();

    assert_eq!(response.headers.get("Content-Length").unwrap(), "999");
    assert_eq!(response.headers.len(), 1);
}

#[test]
fn test_response_builder_multiple_headers() {
    let response = ResponseBuilder::new(StatusCode::Ok)
        .header("Content-Type", "application/json")
        .header("Cache-Control", "no-cache")
        .header("X-Frame-Options", "DENY")
        .body(b"{}".to_vec())
        .build();

    assert_eq!(response.headers.len(), 4); // 3 custom + 1 auto (Content-Length)
    assert_eq!(response.headers.get("Cache-Control").unwrap(), "no-cache");
}

#[test]
fn test_response_ok_helper() {
    let response = Response::ok(b"test content".to_vec());

    assert_eq!(response.status, StatusCode::Ok);
    assert_eq!(response.body, b"test content".to_vec());
}

#[test]
fn test_response_error_helpers() {
    let response = Response::bad_gateway("connection refused");
    assert_eq!(response.status, StatusCode::BadGateway);
    assert_eq!(response.body, b"connection refused\n".to_vec());
    assert_eq!(
        response.headers.get("Content-Type").unwrap(),
        "text/plain; charset=utf-8"
    );
    assert_eq!(response.headers.get("X-Content-Type-Options").unwrap(), "nosniff");

    let response = Response::internal_error("Hijacking not supported");
    assert_eq!(response.status, StatusCode::InternalServerError);
    assert_eq!(response.body, b"Hijacking not supported\n".to_vec());
}

#[test]
fn test_serialize_response() {
    let bytes = serialize_response(&Response::ok(b"hi".to_vec()));
    assert_eq!(bytes, b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nhi".to_vec());
}

#[test]
fn test_reply_from_response() {
    let reply: Reply = Response::ok(Vec::new()).into();
    assert!(matches!(reply, Reply::Response(r) if r.status == StatusCode::Ok));
}
