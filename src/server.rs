//! HTTP server lifecycle and graceful shutdown.
//!
//! # Lifecycle
//!
//! ```text
//! Idle ──run──▶ Running ──SIGINT/SIGTERM──▶ Draining ──drained / timeout──▶ Stopped
//! ```
//!
//! 1. The registry is composed and the port is bound. Failure here is fatal.
//! 2. The accept loop runs on its own task; every connection gets a task too.
//! 3. The caller's task waits for SIGINT (Ctrl-C) or SIGTERM. Signals are the
//!    only way to stop a server.
//! 4. On the signal the accept loop stops, and every open connection is told
//!    to finish the request it is serving and close.
//! 5. If that takes longer than the shutdown timeout (5 s by default), the
//!    remaining connections are dropped and [`Error::DrainTimeout`] is
//!    returned. Clients of those connections see a reset.
//!
//! Under Kubernetes keep the timeout well below
//! `terminationGracePeriodSeconds` so the drain outcome is logged before
//! SIGKILL arrives.

use std::collections::HashMap;
use std::convert::Infallible;
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::{self, JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::ServerConfig;
use crate::error::Error;
use crate::registry::Registry;
use crate::router::Router;

/// Where a [`Server`] is in its lifecycle. States are only ever entered in
/// declaration order.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum State {
    Idle,
    Running,
    Draining,
    Stopped,
}

impl State {
    fn next(self) -> Option<Self> {
        match self {
            Self::Idle     => Some(Self::Running),
            Self::Running  => Some(Self::Draining),
            Self::Draining => Some(Self::Stopped),
            Self::Stopped  => None,
        }
    }
}

/// The HTTP server.
pub struct Server {
    config: ServerConfig,
    state: watch::Sender<State>,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        let (state, _) = watch::channel(State::Idle);
        Self { config, state }
    }

    /// A server on `0.0.0.0:port` with the default 5 s shutdown timeout.
    pub fn bind(port: u16) -> Self {
        Self::new(ServerConfig { port, ..ServerConfig::default() })
    }

    pub fn host(mut self, host: IpAddr) -> Self {
        self.config.host = host;
        self
    }

    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.config.shutdown_timeout = timeout;
        self
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn state(&self) -> State {
        *self.state.borrow()
    }

    /// Watches lifecycle transitions, e.g. to flip a readiness flag.
    pub fn subscribe(&self) -> watch::Receiver<State> {
        self.state.subscribe()
    }

    /// Runs the server and treats every failure as fatal.
    ///
    /// Returns after a clean drain. On a bind failure, an invalid route or a
    /// drain timeout the error is logged and the process exits with status 1.
    pub async fn start(self, registry: Registry) {
        exit_on_error(self.run(registry).await);
    }

    /// [`start`](Self::start) for a router composed ahead of time.
    pub async fn start_router(self, router: Router) {
        exit_on_error(self.run_router(router).await);
    }

    /// Composes `registry`, binds, serves until SIGINT/SIGTERM and drains.
    ///
    /// Returns `Ok(())` only if every connection finished inside the
    /// shutdown timeout.
    pub async fn run(&self, registry: Registry) -> Result<(), Error> {
        if self.state() != State::Idle {
            return Err(Error::AlreadyStarted);
        }
        self.run_router(registry.compose()?).await
    }

    /// Binds, serves `router` until SIGINT/SIGTERM and drains.
    pub async fn run_router(&self, router: Router) -> Result<(), Error> {
        self.run_until(router, shutdown_signal()).await
    }

    async fn run_until(&self, router: Router, shutdown: impl Future<Output = ()>) -> Result<(), Error> {
        if self.state() != State::Idle {
            return Err(Error::AlreadyStarted);
        }

        let addr = self.config.addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| Error::Bind { addr, source })?;

        self.serve(listener, router, shutdown).await
    }

    async fn serve(
        &self,
        listener: TcpListener,
        router: Router,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), Error> {
        if let Ok(addr) = listener.local_addr() {
            info!(%addr, "listening");
        }

        let stop = CancellationToken::new();
        let accept = tokio::spawn(accept_loop(listener, Arc::new(router), stop.clone()));
        let abort = accept.abort_handle();
        self.advance(State::Running);

        shutdown.await;

        self.advance(State::Draining);
        stop.cancel();

        let timeout = self.config.shutdown_timeout;
        let drained = tokio::time::timeout(timeout, accept).await;
        self.advance(State::Stopped);

        match drained {
            Ok(joined) => {
                joined?;
                info!("server stopped");
                Ok(())
            }
            Err(_) => {
                // Dropping the accept task drops its JoinSet, which aborts
                // every connection still open.
                abort.abort();
                Err(Error::DrainTimeout(timeout))
            }
        }
    }

    fn advance(&self, to: State) {
        self.state.send_modify(|state| {
            debug_assert_eq!(state.next(), Some(to), "lifecycle skipped a state");
            *state = to;
        });
        debug!(state = ?to, "lifecycle");
    }
}

/// Runs a server on `0.0.0.0:port` until SIGINT/SIGTERM.
///
/// Shorthand for `Server::bind(port).start(registry)`; failures are fatal.
pub async fn start(port: u16, registry: Registry) {
    Server::bind(port).start(registry).await
}

/// Shorthand for `Server::bind(port).start_router(router)`.
pub async fn start_router(port: u16, router: Router) {
    Server::bind(port).start_router(router).await
}

fn exit_on_error(outcome: Result<(), Error>) {
    match outcome {
        Ok(()) => info!("server exiting"),
        Err(e) => {
            error!(error = %e, "server terminated");
            std::process::exit(1);
        }
    }
}

// ── Accept loop ───────────────────────────────────────────────────────────────

async fn accept_loop(listener: TcpListener, router: Arc<Router>, stop: CancellationToken) {
    let mut connections = JoinSet::new();
    let mut peers = HashMap::new();

    loop {
        tokio::select! {
            // Check the stop flag first so queued connections are not
            // accepted once draining has begun.
            biased;

            () = stop.cancelled() => {
                info!(in_flight = connections.len(), "shutdown signal received, draining connections");
                break;
            }

            res = listener.accept() => {
                match res {
                    Ok((stream, peer)) => {
                        let task = connections.spawn(serve_connection(stream, peer, Arc::clone(&router), stop.clone()));
                        peers.insert(task.id(), peer);
                    }
                    // Usually transient (EMFILE, ECONNABORTED): keep serving.
                    Err(e) => error!("accept error: {e}"),
                }
            }

            // Reap finished connection tasks so the set stays bounded.
            Some(joined) = connections.join_next_with_id(), if !connections.is_empty() => {
                reap(joined, &mut peers);
            }
        }
    }

    drop(listener);
    while let Some(joined) = connections.join_next_with_id().await {
        reap(joined, &mut peers);
    }
}

fn reap(joined: Result<(task::Id, ()), JoinError>, peers: &mut HashMap<task::Id, SocketAddr>) {
    match joined {
        Ok((id, ())) => {
            peers.remove(&id);
        }
        Err(e) => {
            let peer = peers.remove(&e.id());
            if e.is_panic() {
                error!(?peer, "connection task panicked");
            }
        }
    }
}

async fn serve_connection(stream: TcpStream, peer: SocketAddr, router: Arc<Router>, stop: CancellationToken) {
    let svc = service_fn(move |req| {
        let router = Arc::clone(&router);
        async move { Ok::<_, Infallible>(router.dispatch(req).await) }
    });

    // HTTP/1.1 or HTTP/2, whichever the client speaks.
    let builder = ConnBuilder::new(TokioExecutor::new());
    let conn = builder.serve_connection(TokioIo::new(stream), svc);
    tokio::pin!(conn);

    let finished = tokio::select! {
        res = conn.as_mut() => Some(res),
        () = stop.cancelled() => None,
    };
    let res = match finished {
        Some(res) => res,
        None => {
            // Finish the in-flight request, refuse further ones, close.
            conn.as_mut().graceful_shutdown();
            conn.await
        }
    };

    if let Err(e) = res {
        error!(%peer, "connection error: {e}");
    }
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first SIGINT (Ctrl-C) or SIGTERM.
///
/// A handler that cannot be installed is logged and never fires; the other
/// one still can. On Windows only Ctrl-C is available.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c    => info!("received SIGINT"),
        () = terminate => info!("received SIGTERM"),
    }
}
