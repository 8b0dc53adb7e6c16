//! Route endpoints and the single erased shape they share with middleware.
//!
//! Routes hold endpoints of unrelated concrete types, and composition wraps
//! each endpoint in middleware layers at startup. Everything is therefore
//! reduced to one trait object, [`ErasedHandler`]:
//!
//! ```text
//! registry.post("/products", create)       create: async fn(Request) -> impl IntoResponse
//!   → create.erase()                       Arc<Endpoint(create)>
//!   → Registry::compose                    Layered(m0, Layered(m1, Endpoint(create)))
//!   → per request: outermost.call(req)     BoxFuture resolving to Response
//! ```
//!
//! `Layered` and the router's dispatcher implement the same trait, so a fully
//! wrapped route is indistinguishable from a bare one.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// The future every handler and middleware layer resolves through.
///
/// Also the return type of [`Middleware::call`](crate::Middleware::call).
pub type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// One step of a composed route: an endpoint, a middleware layer or the
/// dispatcher.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture;
}

#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

/// Anything that can answer a route: an `async fn(Request) -> impl IntoResponse`
/// or a closure returning such a future.
///
/// ```rust
/// # use routekit::{Registry, Request};
/// async fn health(_req: Request) -> &'static str { "ok" }
///
/// let mut registry = Registry::new();
/// registry.get("/health", health);
/// registry.get("/version", |_req: Request| async { env!("CARGO_PKG_VERSION") });
/// ```
pub trait Handler: Send + Sync + 'static {
    #[doc(hidden)]
    fn erase(self) -> BoxedHandler;
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn erase(self) -> BoxedHandler {
        Arc::new(Endpoint(self))
    }
}

struct Endpoint<F>(F);

impl<F, Fut, R> ErasedHandler for Endpoint<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        let answer = (self.0)(req);
        Box::pin(async move { answer.await.into_response() })
    }
}
