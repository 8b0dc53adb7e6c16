//! JSON decoding as handlers use it: decode, validate, pick a status.

use bytes::Bytes;
use http::{Method, StatusCode};
use routekit::{Registry, Request, Response, Router};
use serde::Deserialize;
use validator::Validate;

#[derive(Deserialize, Validate)]
struct Product {
    #[validate(length(min = 1, message = "name is required"))]
    name: String,
    #[validate(range(min = 0.01))]
    price: f64,
}

async fn parse(req: Request) -> Response {
    match req.parse_json::<Product>() {
        Ok(_) => Response::status(StatusCode::NO_CONTENT),
        Err(e) => Response::error(StatusCode::BAD_REQUEST, e),
    }
}

async fn parse_valid(req: Request) -> Response {
    let parsed = match req.parse_valid_json::<Product>() {
        Ok(parsed) => parsed,
        Err(e) => return Response::error(StatusCode::BAD_REQUEST, e),
    };
    if !parsed.is_valid() {
        return Response::error(StatusCode::UNPROCESSABLE_ENTITY, parsed.violations.join("-"));
    }
    Response::text(format!("{} costs {}", parsed.value.name, parsed.value.price))
}

fn router() -> Router {
    let mut registry = Registry::new();
    registry.post("/parse", parse);
    registry.post("/parse-valid", parse_valid);
    registry.compose().unwrap()
}

fn post(path: &str, content_type: &str, body: &'static str) -> Request {
    http::Request::builder()
        .method(Method::POST)
        .uri(path)
        .header("content-type", content_type)
        .body(Bytes::from_static(body.as_bytes()))
        .unwrap()
        .into()
}

fn body(res: &Response) -> &str {
    std::str::from_utf8(res.body()).unwrap()
}

#[tokio::test]
async fn parse_accepts_matching_body() {
    let res = router()
        .handle(post("/parse", "application/json", r#"{"name":"Gopher", "price":122.22}"#))
        .await;

    assert_eq!(res.status_code(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn parse_reports_truncated_body() {
    let res = router()
        .handle(post("/parse", "application/json", r#"{"name":"Gopher", "price":122.22"#))
        .await;

    assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
    assert!(body(&res).starts_with("status_code: 400, message: EOF while parsing"));
}

#[tokio::test]
async fn parse_reports_content_type_mismatch() {
    let res = router()
        .handle(post("/parse", "ghg/jso", r#"{"name":"Gopher", "price":122.22}"#))
        .await;

    assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(body(&res), "status_code: 400, message: request content-type is not application/json");
}

#[tokio::test]
async fn parse_valid_returns_the_value() {
    let res = router()
        .handle(post("/parse-valid", "application/json", r#"{"name":"Gopher","price":122.22}"#))
        .await;

    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(body(&res), "Gopher costs 122.22");
}

#[tokio::test]
async fn parse_valid_keeps_hard_errors_separate() {
    let res = router()
        .handle(post("/parse-valid", "application/", r#"{"name":"Gopher","price":122.22}"#))
        .await;

    assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(body(&res), "status_code: 400, message: request content-type is not application/json");
}

#[tokio::test]
async fn parse_valid_reports_every_violation() {
    let res = router()
        .handle(post("/parse-valid", "application/json", r#"{"name":"","price":0}"#))
        .await;

    assert_eq!(res.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body(&res),
        "status_code: 422, message: name: name is required-price: failed on the 'range' rule",
    );
}
