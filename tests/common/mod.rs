//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// A fake service instance exposing `/health` and the `/cluster/*` directives.
#[derive(Clone)]
pub struct MockInstance {
    pub addr: SocketAddr,
    healthy: Arc<AtomicBool>,
    accept_directives: Arc<AtomicBool>,
    requests: Arc<Mutex<Vec<String>>>,
}

#[allow(dead_code)]
impl MockInstance {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn set_accept_directives(&self, accept: bool) {
        self.accept_directives.store(accept, Ordering::SeqCst);
    }

    /// "METHOD /path" of every request received so far.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// Directive requests (`POST /cluster/...`) received so far.
    pub fn directives(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter(|r| r.starts_with("POST /cluster/"))
            .collect()
    }
}

/// Start a mock instance on an ephemeral port.
pub async fn start_mock_instance(healthy: bool) -> MockInstance {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let instance = MockInstance {
        addr: listener.local_addr().unwrap(),
        healthy: Arc::new(AtomicBool::new(healthy)),
        accept_directives: Arc::new(AtomicBool::new(true)),
        requests: Arc::new(Mutex::new(Vec::new())),
    };

    let state = instance.clone();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let state = state.clone();
                    tokio::spawn(async move {
                        let mut buf = vec![0u8; 4096];
                        let n = socket.read(&mut buf).await.unwrap_or(0);
                        let head = String::from_utf8_lossy(&buf[..n]);
                        let request_line: Vec<&str> = head
                            .lines()
                            .next()
                            .unwrap_or_default()
                            .split_whitespace()
                            .take(2)
                            .collect();
                        let request = request_line.join(" ");
                        state.requests.lock().unwrap().push(request.clone());

                        let ok = if request.starts_with("GET /health") {
                            state.healthy.load(Ordering::SeqCst)
                        } else if request.starts_with("POST /cluster/") {
                            state.accept_directives.load(Ordering::SeqCst)
                        } else {
                            false
                        };
                        let status = if ok { "200 OK" } else { "503 Service Unavailable" };

                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                            status
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    instance
}
