//! # routekit
//!
//! Small helpers for HTTP services: register routes with per-route
//! middleware, decode and validate JSON bodies, and run a server that shuts
//! down gracefully on SIGINT/SIGTERM.
//!
//! routekit does not route, parse HTTP or decode JSON itself. It wires:
//!
//! - Radix-tree path matching via [`matchit`]
//! - HTTP/1.1 and HTTP/2 via hyper, one task per connection on tokio
//! - JSON via serde_json, declarative validation via [`validator`]
//!
//! What it adds on top is ordering and lifecycle:
//!
//! - Middleware composed once at start, first registered = outermost
//! - A server that drains in-flight requests within a bounded timeout and
//!   reports when it could not
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use routekit::{Json, Next, Registry, Request, Response, middleware::Trace};
//! use http::StatusCode;
//! use serde::{Deserialize, Serialize};
//! use validator::Validate;
//!
//! #[derive(Deserialize, Serialize, Validate)]
//! struct Product {
//!     #[validate(length(min = 1, message = "name is required"))]
//!     name: String,
//!     price: f64,
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut registry = Registry::new();
//!     registry.register_global_middleware(Trace::new());
//!     registry
//!         .post("/products", create_product)
//!         .add_middleware(require_token);
//!
//!     routekit::start(3000, registry).await;
//! }
//!
//! async fn require_token(req: Request, next: Next) -> Response {
//!     if req.header("authorization").is_none() {
//!         return Response::status(StatusCode::UNAUTHORIZED);
//!     }
//!     next.run(req).await
//! }
//!
//! async fn create_product(req: Request) -> Response {
//!     let parsed = match req.parse_valid_json::<Product>() {
//!         Ok(parsed) => parsed,
//!         Err(e) => return Response::error(StatusCode::BAD_REQUEST, e),
//!     };
//!     match parsed.into_result() {
//!         Ok(product) => (StatusCode::CREATED, Json(product)).into_response(),
//!         Err(violations) => Response::error(StatusCode::UNPROCESSABLE_ENTITY, violations.join("-")),
//!     }
//! }
//! # use routekit::IntoResponse;
//! ```

mod config;
mod error;
mod handler;
mod registry;
mod request;
mod response;
mod router;
mod server;
mod validate;

pub mod json;
pub mod middleware;

pub use config::{SHUTDOWN_TIMEOUT, ServerConfig};
pub use error::Error;
pub use handler::{BoxFuture, Handler};
pub use json::{ContentType, JsonError, Parsed};
pub use middleware::{BoxedMiddleware, Middleware, Next};
pub use registry::{MiddlewareBinding, Registry, RouteKey};
pub use request::Request;
pub use response::{IntoResponse, Json, Response, ResponseBuilder};
pub use router::Router;
pub use server::{Server, State, start, start_router};
pub use validate::validate;
