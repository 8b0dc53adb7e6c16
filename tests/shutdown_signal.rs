//! SIGTERM drives a real server through its lifecycle.
//!
//! Kept in its own test binary: the signal is delivered to the whole process.

#![cfg(unix)]

use std::net::{IpAddr, Ipv4Addr};
use std::process::Command;

use routekit::{Registry, Request, Server, State};

#[tokio::test]
async fn sigterm_stops_a_running_server_cleanly() {
    let mut registry = Registry::new();
    registry.get("/", |_req: Request| async { "ok" });

    let server = Server::bind(0).host(IpAddr::V4(Ipv4Addr::LOCALHOST));
    let mut states = server.subscribe();

    // Handlers are installed in the same poll that enters Running, so the
    // signal cannot arrive before the server listens for it.
    let terminate = async {
        states.wait_for(|s| *s == State::Running).await.unwrap();
        let status = Command::new("kill")
            .args(["-TERM", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());
    };

    let (outcome, ()) = tokio::join!(server.run(registry), terminate);

    outcome.unwrap();
    assert_eq!(server.state(), State::Stopped);
}
