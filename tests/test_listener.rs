//! End-to-end over loopback sockets.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use gzhttpd::error::ServerError;
use gzhttpd::http::connection::Handler;
use gzhttpd::http::responder::{Responder, UnmatchedPolicy};
use gzhttpd::server::listener::{ACCEPT_RETRY_DELAY, accept_loop, listen};
use gzhttpd::storage::FsBlobStore;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

struct Site {
    dir: tempfile::TempDir,
    addr: SocketAddr,
}

impl Site {
    fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }
}

/// Writes `asset` to a temp dir and starts the accept loop on an
/// ephemeral port.
fn start(asset: &[u8], policy: UnmatchedPolicy) -> Site {
    let dir = tempfile::tempdir().unwrap();
    let asset_path = dir.path().join("static/html/index.html.gz");
    std::fs::create_dir_all(asset_path.parent().unwrap()).unwrap();
    std::fs::write(&asset_path, asset).unwrap();

    let handler = Handler::new(
        Responder::new(FsBlobStore::new(), asset_path, policy),
        dir.path().join("log/server.log"),
        dir.path().join("log/response.log"),
    )
    .with_timeouts(Some(Duration::from_secs(5)), Some(Duration::from_secs(5)));

    let listener = listen(0, 16).unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move { accept_loop(listener, &handler).await });

    Site {
        dir,
        addr: SocketAddr::from(([127, 0, 0, 1], port)),
    }
}

async fn roundtrip(addr: SocketAddr, request: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();

    let mut received = Vec::new();
    tokio::time::timeout(Duration::from_secs(10), stream.read_to_end(&mut received))
        .await
        .expect("server did not close the connection")
        .unwrap();
    received
}

#[tokio::test]
async fn test_serves_root_over_tcp() {
    let site = start(b"<h1>!", UnmatchedPolicy::NotFound);

    let received = roundtrip(site.addr, b"GET / HTTP/1.1\r\nHost: x\r\n\r\n").await;

    assert_eq!(
        received,
        b"HTTP/1.1 200 OK\r\nContent-Encoding: gzip\r\nContent-Type: text/html\r\nContent-Length: 5\r\n\r\n<h1>!"
    );
    assert_eq!(
        std::fs::read(site.path("log/response.log")).unwrap(),
        received
    );
}

#[tokio::test]
async fn test_loop_survives_bad_requests() {
    let site = start(b"page", UnmatchedPolicy::Ignore);

    assert!(roundtrip(site.addr, b"DELETE / HTTP/1.1\r\n\r\n").await.is_empty());
    assert!(roundtrip(site.addr, b"GET /missing HTTP/1.1\r\n\r\n").await.is_empty());
    assert!(roundtrip(site.addr, b"GET /unterminated").await.is_empty());

    let received = roundtrip(site.addr, b"GET / HTTP/1.1\r\n\r\n").await;
    assert!(received.ends_with(b"Content-Length: 4\r\n\r\npage"));

    let log = std::fs::read(site.path("log/server.log")).unwrap();
    assert_eq!(
        log,
        b"GET /missing HTTP/1.1\r\n\r\nGET / HTTP/1.1\r\n\r\n"
    );
}

#[tokio::test]
async fn test_connections_are_served_in_order() {
    let site = start(b"abc", UnmatchedPolicy::NotFound);

    for _ in 0..5 {
        let received = roundtrip(site.addr, b"GET / HTTP/1.1\r\n\r\n").await;
        assert!(received.starts_with(b"HTTP/1.1 200 OK\r\n"));
    }
}

#[tokio::test]
async fn test_asset_removed_between_requests() {
    let site = start(b"abc", UnmatchedPolicy::NotFound);
    std::fs::remove_file(site.path("static/html/index.html.gz")).unwrap();

    assert!(roundtrip(site.addr, b"GET / HTTP/1.1\r\n\r\n").await.is_empty());

    std::fs::write(site.path("static/html/index.html.gz"), b"back").unwrap();
    let received = roundtrip(site.addr, b"GET / HTTP/1.1\r\n\r\n").await;
    assert!(received.ends_with(b"\r\n\r\nback"));
}

#[tokio::test]
async fn test_listen_on_taken_port_is_bind_error() {
    let probe = std::net::TcpListener::bind("0.0.0.0:0").unwrap();
    let port = probe.local_addr().unwrap().port();

    let err = listen(port, 2).unwrap_err();

    assert!(matches!(err, ServerError::Bind { port: p, .. } if p == port));
}

#[test]
fn test_accept_retry_delay_backs_off() {
    assert!(ACCEPT_RETRY_DELAY >= Duration::from_millis(10));
    assert!(ACCEPT_RETRY_DELAY <= Duration::from_secs(1));
}
