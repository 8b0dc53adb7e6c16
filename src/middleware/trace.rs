//! Per-request log line.

use std::time::Instant;

use tracing::{Level, debug, info};

use crate::handler::BoxFuture;
use crate::middleware::{Middleware, Next};
use crate::request::Request;

/// Logs method, path, status and latency once the inner chain has answered.
///
/// Register it first (outermost) to include the time spent in other
/// middleware:
///
/// ```rust,no_run
/// # use routekit::{Registry, middleware::Trace};
/// let mut registry = Registry::new();
/// registry.register_global_middleware(Trace::new());
/// ```
#[derive(Clone, Copy, Debug)]
pub struct Trace {
    level: Level,
}

impl Trace {
    /// Logs at `INFO`.
    pub fn new() -> Self {
        Self { level: Level::INFO }
    }

    /// Logs at `DEBUG` instead, for high-traffic routes.
    pub fn quiet() -> Self {
        Self { level: Level::DEBUG }
    }
}

impl Default for Trace {
    fn default() -> Self { Self::new() }
}

impl Middleware for Trace {
    fn call(&self, req: Request, next: Next) -> BoxFuture {
        let level = self.level;
        let method = req.method().clone();
        let path = req.path().to_owned();
        let started = Instant::now();

        Box::pin(async move {
            let res = next.run(req).await;
            let status = res.status_code().as_u16();
            let latency_ms = started.elapsed().as_secs_f64() * 1e3;
            if level == Level::DEBUG {
                debug!(%method, %path, status, latency_ms, "request");
            } else {
                info!(%method, %path, status, latency_ms, "request");
            }
            res
        })
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use http::StatusCode;

    use super::*;
    use crate::handler::Handler;
    use crate::middleware::{boxed, compose};

    #[tokio::test]
    async fn passes_the_response_through() {
        async fn created(_req: Request) -> StatusCode { StatusCode::CREATED }

        let chain = [boxed(Trace::new()), boxed(Trace::quiet())];
        let req = http::Request::builder().uri("/items").body(Bytes::new()).unwrap().into();

        let res = compose(created.erase(), &chain).call(req).await;

        assert_eq!(res.status_code(), StatusCode::CREATED);
    }
}
