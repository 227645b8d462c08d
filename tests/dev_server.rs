// tests/dev_server.rs

mod common;
use crate::common::{init_tracing, with_timeout, write_file};

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use sitepipe::errors::{Result, SitepipeError};
use sitepipe::server::{DevServer, DevServerConfig, LIVE_RELOAD_PATH};
use sitepipe::types::{reload_channel, ReloadSender, ReloadSignal};

fn config(root: &Path, port: u16, live_reload: bool) -> DevServerConfig {
    DevServerConfig {
        host: "127.0.0.1".to_string(),
        port,
        root: root.to_path_buf(),
        live_reload,
    }
}

struct Running {
    addr: SocketAddr,
    reload: ReloadSender,
    stop: oneshot::Sender<()>,
    task: JoinHandle<Result<()>>,
}

async fn start(root: &Path, live_reload: bool) -> Running {
    let (reload, _) = reload_channel();
    let server = DevServer::bind(config(root, 0, live_reload), reload.clone())
        .await
        .expect("bind dev server");
    let addr = server.local_addr();
    let (stop, stopped) = oneshot::channel::<()>();
    let task = tokio::spawn(server.serve(async move {
        let _ = stopped.await;
    }));
    Running {
        addr,
        reload,
        stop,
        task,
    }
}

impl Running {
    async fn shutdown(self) {
        let _ = self.stop.send(());
        with_timeout(self.task).await.unwrap().unwrap();
    }
}

async fn send_raw(addr: SocketAddr, path: &str) -> (u16, String, String) {
    let mut stream = tokio::net::TcpStream::connect(addr)
        .await
        .expect("connect server");
    let req = format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    stream
        .write_all(req.as_bytes())
        .await
        .expect("write request");
    let mut response = String::new();
    stream
        .read_to_string(&mut response)
        .await
        .expect("read response");
    let (head, body) = response
        .split_once("\r\n\r\n")
        .expect("http response must have separator");
    let status = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|s| s.parse::<u16>().ok())
        .expect("http status");
    (status, head.to_string(), body.to_string())
}

#[tokio::test]
async fn serves_files_and_index_pages() {
    init_tracing();
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    write_file(root, "index.html", "<html><body><h1>Hi</h1></body></html>");
    write_file(root, "css/site.css", "h1{color:red}");
    write_file(root, "blog/index.html", "<p>blog</p>");

    let server = start(root, false).await;

    let (status, head, body) = send_raw(server.addr, "/").await;
    assert_eq!(status, 200);
    assert!(head.to_ascii_lowercase().contains("content-type: text/html"));
    assert_eq!(body, "<html><body><h1>Hi</h1></body></html>");

    let (status, head, body) = send_raw(server.addr, "/css/site.css").await;
    assert_eq!(status, 200);
    assert!(head.to_ascii_lowercase().contains("content-type: text/css"));
    assert_eq!(body, "h1{color:red}");

    let (status, _, body) = send_raw(server.addr, "/blog/").await;
    assert_eq!(status, 200);
    assert_eq!(body, "<p>blog</p>");

    let (status, head, _) = send_raw(server.addr, "/blog").await;
    assert_eq!(status, 308);
    assert!(head.to_ascii_lowercase().contains("location: /blog/"));

    server.shutdown().await;
}

#[tokio::test]
async fn unknown_paths_are_404_and_traversal_is_refused() {
    let tmp = tempfile::tempdir().unwrap();
    let server = start(tmp.path(), false).await;

    let (status, _, _) = send_raw(server.addr, "/missing.html").await;
    assert_eq!(status, 404);

    let (status, _, _) = send_raw(server.addr, "/%2e%2e/secret").await;
    assert_eq!(status, 403);

    server.shutdown().await;
}

#[tokio::test]
async fn html_gets_live_reload_script_when_enabled() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    write_file(root, "index.html", "<html><body><h1>Hi</h1></body></html>");
    write_file(root, "app.js", "console.log('</body>')");

    let server = start(root, true).await;

    let (_, _, body) = send_raw(server.addr, "/index.html").await;
    assert!(body.contains("<h1>Hi</h1><script>"));
    assert!(body.contains(LIVE_RELOAD_PATH));
    assert!(body.ends_with("</body></html>"));

    let (_, _, body) = send_raw(server.addr, "/app.js").await;
    assert_eq!(body, "console.log('</body>')");

    server.shutdown().await;
}

#[tokio::test]
async fn reload_signal_reaches_connected_client() {
    init_tracing();
    let tmp = tempfile::tempdir().unwrap();
    let server = start(tmp.path(), true).await;

    let mut stream = tokio::net::TcpStream::connect(server.addr).await.unwrap();
    let req = format!(
        "GET {LIVE_RELOAD_PATH} HTTP/1.1\r\nHost: {}\r\nAccept: text/event-stream\r\n\r\n",
        server.addr
    );
    stream.write_all(req.as_bytes()).await.unwrap();

    // Wait until the handler has subscribed before signalling.
    with_timeout(async {
        while server.reload.receiver_count() == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    server.reload.send(ReloadSignal).unwrap();

    let received = with_timeout(async {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "stream closed before reload event");
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf).to_string();
            if text.contains("event: reload") {
                return text;
            }
        }
    })
    .await;

    assert!(received.contains("text/event-stream"));
    drop(stream);
    server.shutdown().await;
}

#[tokio::test]
async fn binding_a_taken_port_is_a_bind_error() {
    let tmp = tempfile::tempdir().unwrap();
    let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = taken.local_addr().unwrap().port();

    let (reload, _) = reload_channel();
    let err = DevServer::bind(config(tmp.path(), port, true), reload)
        .await
        .unwrap_err();

    match err {
        SitepipeError::ServerBind { addr, .. } => assert_eq!(addr, format!("127.0.0.1:{port}")),
        other => panic!("expected ServerBind, got {other:?}"),
    }
}
