//! The composed routing table.
//!
//! A [`Router`] is what a [`Registry`](crate::Registry) turns into at start:
//! one radix tree (via [`matchit`]) keyed by path, each leaf holding the
//! per-method handlers with their middleware already applied, and the global
//! middleware wrapped around the whole dispatch. It is immutable and shared
//! by every connection task.

use std::collections::HashMap;
use std::fmt;
use std::future;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{self, HeaderValue};
use http::{Method, StatusCode};
use http_body_util::{BodyExt, Full};
use matchit::Router as MatchitRouter;
use tracing::debug;

use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler};
use crate::middleware::{self, BoxedMiddleware};
use crate::request::Request;
use crate::response::Response;

pub(crate) type MethodMap = HashMap<Method, BoxedHandler>;

/// The application router, ready to serve.
pub struct Router {
    entry: BoxedHandler,
}

impl Router {
    pub(crate) fn new(table: MatchitRouter<MethodMap>, global: &[BoxedMiddleware]) -> Self {
        let dispatch: BoxedHandler = Arc::new(Dispatch { table });
        Self { entry: middleware::compose(dispatch, global) }
    }

    /// Runs one request through global middleware, routing, route middleware
    /// and the handler. Useful for testing an application without a socket.
    pub async fn handle(&self, req: Request) -> Response {
        self.entry.call(req).await
    }

    /// Buffers the body of a hyper request and handles it.
    pub(crate) async fn dispatch<B>(&self, req: http::Request<B>) -> http::Response<Full<Bytes>>
    where
        B: hyper::body::Body,
        B::Error: fmt::Display,
    {
        let (head, body) = req.into_parts();
        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                debug!(error = %e, "failed to read request body");
                return Response::error(StatusCode::BAD_REQUEST, e).into_inner();
            }
        };
        self.handle(Request::new(head, body)).await.into_inner()
    }
}

/// Innermost layer under the global middleware: path lookup, then method.
struct Dispatch {
    table: MatchitRouter<MethodMap>,
}

impl ErasedHandler for Dispatch {
    fn call(&self, mut req: Request) -> BoxFuture {
        let (handler, params) = match self.table.at(req.path()) {
            Ok(matched) => match matched.value.get(req.method()) {
                Some(handler) => {
                    let params = matched.params.iter()
                        .map(|(k, v)| (k.to_owned(), v.to_owned()))
                        .collect();
                    (Arc::clone(handler), params)
                }
                None => return ready(method_not_allowed(matched.value)),
            },
            Err(_) => return ready(Response::status(StatusCode::NOT_FOUND)),
        };

        req.set_params(params);
        handler.call(req)
    }
}

fn ready(res: Response) -> BoxFuture {
    Box::pin(future::ready(res))
}

/// `405` with an `Allow` header listing the methods the path does answer to.
fn method_not_allowed(methods: &MethodMap) -> Response {
    let mut allowed: Vec<&str> = methods.keys().map(Method::as_str).collect();
    allowed.sort_unstable();
    let mut res = Response::status(StatusCode::METHOD_NOT_ALLOWED);
    if let Ok(value) = HeaderValue::from_str(&allowed.join(", ")) {
        res.headers_mut().insert(header::ALLOW, value);
    }
    res
}
