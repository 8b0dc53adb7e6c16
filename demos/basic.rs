//! Minimal routekit service: a validated JSON endpoint behind per-route
//! middleware, with request logging and graceful shutdown.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/products/7
//!   curl -X POST http://localhost:3000/products \
//!        -H 'authorization: Bearer demo' \
//!        -H 'content-type: application/json' \
//!        -d '{"name":"Gopher","price":122.22}'
//!   curl -X POST http://localhost:3000/products \
//!        -H 'authorization: Bearer demo' \
//!        -H 'content-type: application/json' \
//!        -d '{"name":"","price":122.22}'      # 422
//!
//! Stop with Ctrl-C; in-flight requests get 5 seconds to finish.

use http::StatusCode;
use routekit::middleware::Trace;
use routekit::{IntoResponse, Json, Next, Registry, Request, Response};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Deserialize, Serialize, Validate)]
struct Product {
    #[validate(length(min = 1, message = "name is required"))]
    name: String,
    #[validate(range(min = 0.01, max = 1_000_000.0))]
    price: f64,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let mut registry = Registry::new();
    registry.register_global_middleware(Trace::new());
    registry.get("/products/{id}", get_product);
    registry
        .post("/products", create_product)
        .add_middleware(require_token);

    routekit::start(3000, registry).await;
}

// GET /products/{id}
async fn get_product(req: Request) -> Json<Product> {
    let id = req.param("id").unwrap_or("0");
    Json(Product { name: format!("product-{id}"), price: 9.99 })
}

// POST /products: 400 on content-type/syntax, 422 on rule violations.
async fn create_product(req: Request) -> Response {
    let parsed = match req.parse_valid_json::<Product>() {
        Ok(parsed) => parsed,
        Err(e) => return Response::error(StatusCode::BAD_REQUEST, e),
    };

    match parsed.into_result() {
        Ok(product) => (StatusCode::CREATED, Json(product)).into_response(),
        Err(violations) => Response::error(StatusCode::UNPROCESSABLE_ENTITY, violations.join("-")),
    }
}

async fn require_token(req: Request, next: Next) -> Response {
    let bearer = req.header("authorization").is_some_and(|v| v.starts_with("Bearer "));
    if !bearer {
        return Response::status(StatusCode::UNAUTHORIZED);
    }
    next.run(req).await
}
