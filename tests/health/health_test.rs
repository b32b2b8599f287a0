//! Tests for the liveness endpoint.

use std::net::SocketAddr;

use toolrent::health::spawn_health_server;

#[tokio::test]
async fn answers_root_and_ping() {
    let addr: SocketAddr = "127.0.0.1:0".parse().expect("addr");
    let (bound, handle) = spawn_health_server(addr).await.expect("should bind");
    assert_ne!(bound.port(), 0);

    let root = reqwest::get(format!("http://{bound}/"))
        .await
        .expect("GET /")
        .text()
        .await
        .expect("body");
    assert_eq!(root, "running");

    let ping = reqwest::get(format!("http://{bound}/ping"))
        .await
        .expect("GET /ping")
        .text()
        .await
        .expect("body");
    assert_eq!(ping, "pong");

    let missing = reqwest::get(format!("http://{bound}/nope"))
        .await
        .expect("GET /nope");
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);

    handle.abort();
}

#[tokio::test]
async fn occupied_port_fails_to_bind() {
    let taken = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = taken.local_addr().expect("addr");
    assert!(spawn_health_server(addr).await.is_err());
}
