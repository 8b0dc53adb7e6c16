//! Middleware: handler-wrapping functions.
//!
//! A middleware receives the request and a [`Next`] that runs everything
//! inside it. Code before `next.run(req).await` runs on the way in, code after
//! it runs on the way out:
//!
//! ```rust
//! use routekit::{Next, Request, Response};
//! use http::StatusCode;
//!
//! async fn require_token(req: Request, next: Next) -> Response {
//!     if req.header("authorization").is_none() {
//!         return Response::status(StatusCode::UNAUTHORIZED);
//!     }
//!     next.run(req).await
//! }
//! ```
//!
//! # Ordering
//!
//! For a list registered as `[m0, m1, m2]` the composed handler is
//! `m0(m1(m2(handler)))`: `m0` runs first on the way in and last on the way
//! out. Put authentication after logging if you want rejected requests logged.

use std::future::Future;
use std::sync::Arc;

use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler};
use crate::request::Request;
use crate::response::{IntoResponse, Response};

pub mod trace;

pub use trace::Trace;

/// The rest of the chain, as seen from one middleware.
pub struct Next {
    inner: BoxedHandler,
}

impl Next {
    /// Runs the inner middleware and, finally, the route handler.
    pub async fn run(self, req: Request) -> Response {
        self.inner.call(req).await
    }
}

/// Implemented by every middleware.
///
/// Any `async fn(Request, Next) -> impl IntoResponse` already implements it.
/// Implement it on your own type when the middleware carries configuration,
/// as [`Trace`] does.
///
/// Closures need their argument types spelled out:
/// `|req: Request, next: Next| async move { next.run(req).await }`.
pub trait Middleware: Send + Sync + 'static {
    fn call(&self, req: Request, next: Next) -> BoxFuture;
}

/// A type-erased middleware. One allocation per registration.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// Erases a middleware so lists of different middleware types can be passed
/// to [`add_middlewares`](crate::MiddlewareBinding::add_middlewares).
pub fn boxed(mw: impl Middleware) -> BoxedMiddleware {
    Arc::new(mw)
}

impl<F, Fut, R> Middleware for F
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request, next: Next) -> BoxFuture {
        let fut = (self)(req, next);
        Box::pin(async move { fut.await.into_response() })
    }
}

// ── Composition ───────────────────────────────────────────────────────────────

/// One middleware bound to the handler it wraps.
struct Layered {
    mw: BoxedMiddleware,
    next: BoxedHandler,
}

impl ErasedHandler for Layered {
    fn call(&self, req: Request) -> BoxFuture {
        self.mw.call(req, Next { inner: Arc::clone(&self.next) })
    }
}

/// Wraps `handler` so that `chain[0]` is the outermost layer.
pub(crate) fn compose(handler: BoxedHandler, chain: &[BoxedMiddleware]) -> BoxedHandler {
    chain.iter().rev().fold(handler, |next, mw| {
        Arc::new(Layered { mw: Arc::clone(mw), next }) as BoxedHandler
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use bytes::Bytes;
    use http::StatusCode;

    use super::*;
    use crate::handler::Handler;

    type Log = Arc<Mutex<Vec<String>>>;

    fn recorder(name: &'static str, log: Log) -> BoxedMiddleware {
        boxed(move |req: Request, next: Next| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push(format!("{name}:in"));
                let res = next.run(req).await;
                log.lock().unwrap().push(format!("{name}:out"));
                res
            }
        })
    }

    fn request() -> Request {
        http::Request::builder().uri("/").body(Bytes::new()).unwrap().into()
    }

    #[tokio::test]
    async fn first_registered_is_outermost() {
        let log: Log = Arc::default();
        let inner = Arc::clone(&log);
        let handler = (move |_req: Request| {
            let log = Arc::clone(&inner);
            async move {
                log.lock().unwrap().push("handler".to_owned());
                StatusCode::OK
            }
        })
        .erase();

        let chain = ["m0", "m1", "m2"].map(|n| recorder(n, Arc::clone(&log)));
        let res = compose(handler, &chain).call(request()).await;

        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(*log.lock().unwrap(), [
            "m0:in", "m1:in", "m2:in", "handler", "m2:out", "m1:out", "m0:out",
        ]);
    }

    #[tokio::test]
    async fn empty_chain_is_the_handler() {
        async fn teapot(_req: Request) -> StatusCode { StatusCode::IM_A_TEAPOT }

        let res = compose(teapot.erase(), &[]).call(request()).await;

        assert_eq!(res.status_code(), StatusCode::IM_A_TEAPOT);
    }

    #[tokio::test]
    async fn middleware_can_short_circuit() {
        async fn handler(_req: Request) -> &'static str { "reached" }
        async fn deny(_req: Request, _next: Next) -> StatusCode { StatusCode::FORBIDDEN }

        let res = compose(handler.erase(), &[boxed(deny)]).call(request()).await;

        assert_eq!(res.status_code(), StatusCode::FORBIDDEN);
    }
}
