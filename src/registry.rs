//! Route and middleware registration.
//!
//! The [`Registry`] is filled during single-threaded setup and consumed by
//! [`Registry::compose`] (called for you by [`Server::run`](crate::Server::run)),
//! which applies every middleware list exactly once and freezes the result into
//! a [`Router`].
//!
//! ```rust
//! use routekit::{Next, Registry, Request, Response};
//! use http::Method;
//!
//! async fn list(_req: Request) -> Response { Response::json(b"[]".to_vec()) }
//! async fn audit(req: Request, next: Next) -> Response { next.run(req).await }
//! async fn auth(req: Request, next: Next) -> Response { next.run(req).await }
//!
//! let mut registry = Registry::new();
//! registry
//!     .register_handler("/products", Method::GET, list)
//!     .add_middleware(audit)   // outermost
//!     .add_middleware(auth);   // runs after audit, before `list`
//! let router = registry.compose().unwrap();
//! ```

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use http::Method;
use matchit::Router as MatchitRouter;

use crate::error::Error;
use crate::handler::{BoxedHandler, Handler};
use crate::middleware::{self, BoxedMiddleware, Middleware};
use crate::router::{MethodMap, Router};

/// Unique identity of a registered handler.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct RouteKey {
    pub path: String,
    pub method: Method,
}

struct Route {
    handler: BoxedHandler,
    middlewares: Vec<BoxedMiddleware>,
}

/// Handlers and middleware accumulated during setup.
#[derive(Default)]
pub struct Registry {
    routes: HashMap<RouteKey, Route>,
    global: Vec<BoxedMiddleware>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `method` on `path` and returns a binding for
    /// attaching middleware to that exact pair.
    ///
    /// Registering the same pair again replaces the handler (last write
    /// wins). Middleware already attached to the pair stays attached.
    ///
    /// Path parameters use `{name}` syntax and are read with
    /// [`Request::param`](crate::Request::param).
    pub fn register_handler(&mut self, path: &str, method: Method, handler: impl Handler) -> MiddlewareBinding<'_> {
        let key = RouteKey { path: path.to_owned(), method };
        let handler = handler.erase();
        match self.routes.entry(key.clone()) {
            Entry::Occupied(mut entry) => entry.get_mut().handler = handler,
            Entry::Vacant(entry) => {
                entry.insert(Route { handler, middlewares: Vec::new() });
            }
        }
        MiddlewareBinding { registry: self, key }
    }

    pub fn get(&mut self, path: &str, handler: impl Handler) -> MiddlewareBinding<'_> {
        self.register_handler(path, Method::GET, handler)
    }

    pub fn post(&mut self, path: &str, handler: impl Handler) -> MiddlewareBinding<'_> {
        self.register_handler(path, Method::POST, handler)
    }

    pub fn put(&mut self, path: &str, handler: impl Handler) -> MiddlewareBinding<'_> {
        self.register_handler(path, Method::PUT, handler)
    }

    pub fn patch(&mut self, path: &str, handler: impl Handler) -> MiddlewareBinding<'_> {
        self.register_handler(path, Method::PATCH, handler)
    }

    pub fn delete(&mut self, path: &str, handler: impl Handler) -> MiddlewareBinding<'_> {
        self.register_handler(path, Method::DELETE, handler)
    }

    /// Adds middleware that wraps every request, including ones that end in
    /// `404`/`405`. Global middleware sits outside all route middleware; among
    /// themselves, the first registered is outermost.
    pub fn register_global_middleware(&mut self, mw: impl Middleware) -> &mut Self {
        self.global.push(middleware::boxed(mw));
        self
    }

    pub fn register_global_middlewares(&mut self, mws: impl IntoIterator<Item = BoxedMiddleware>) -> &mut Self {
        self.global.extend(mws);
        self
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn contains(&self, path: &str, method: &Method) -> bool {
        self.routes.contains_key(&RouteKey { path: path.to_owned(), method: method.clone() })
    }

    /// Applies every middleware list and builds the routing table.
    ///
    /// Fails if a path pattern is malformed or conflicts with another one
    /// (e.g. `/users/{id}` next to `/users/{name}`).
    pub fn compose(self) -> Result<Router, Error> {
        let mut by_path: HashMap<String, MethodMap> = HashMap::new();
        for (key, route) in self.routes {
            let handler = middleware::compose(route.handler, &route.middlewares);
            by_path.entry(key.path).or_default().insert(key.method, handler);
        }

        let mut table = MatchitRouter::new();
        for (path, methods) in by_path {
            table
                .insert(path.clone(), methods)
                .map_err(|source| Error::Route { path, source })?;
        }

        Ok(Router::new(table, &self.global))
    }
}

/// Attaches middleware to one registered (path, method) pair.
///
/// Returned by [`Registry::register_handler`]; every call appends and returns
/// the binding so calls chain.
pub struct MiddlewareBinding<'r> {
    registry: &'r mut Registry,
    key: RouteKey,
}

impl MiddlewareBinding<'_> {
    pub fn key(&self) -> &RouteKey {
        &self.key
    }

    pub fn add_middleware(self, mw: impl Middleware) -> Self {
        self.add_middlewares([middleware::boxed(mw)])
    }

    /// Appends a list of middleware, in order. Build the list with
    /// [`middleware::boxed`](crate::middleware::boxed).
    pub fn add_middlewares(self, mws: impl IntoIterator<Item = BoxedMiddleware>) -> Self {
        if let Some(route) = self.registry.routes.get_mut(&self.key) {
            route.middlewares.extend(mws);
        }
        self
    }
}
