// ABOUTME: Shared test support: an in-memory wait target and an HTTP stub server.
// ABOUTME: The mock target scripts ports, health, exec results, state, and output.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use vigla::target::{
    ContainerStateSnapshot, ExecResult, OutputFrame, OutputStream, TargetError, WaitStrategyTarget,
};

/// An in-memory [`WaitStrategyTarget`] with scripted behavior.
///
/// Output pushed before a follower attaches is buffered and replayed to
/// every new subscription, mirroring a runtime's logs-since-start API.
pub struct MockTarget {
    host: String,
    mapped: Mutex<HashMap<u16, u16>>,
    liveness: Mutex<BTreeSet<u16>>,
    healthy: AtomicBool,
    exec_exit_code: AtomicI64,
    state: Mutex<ContainerStateSnapshot>,
    output: Mutex<OutputHub>,
}

struct OutputHub {
    buffered: Vec<OutputFrame>,
    subscribers: Vec<mpsc::UnboundedSender<OutputFrame>>,
    closed: bool,
}

impl Default for MockTarget {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTarget {
    pub fn new() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            mapped: Mutex::new(HashMap::new()),
            liveness: Mutex::new(BTreeSet::new()),
            healthy: AtomicBool::new(false),
            exec_exit_code: AtomicI64::new(0),
            state: Mutex::new(ContainerStateSnapshot {
                running: true,
                exit_code: None,
            }),
            output: Mutex::new(OutputHub {
                buffered: Vec::new(),
                subscribers: Vec::new(),
                closed: false,
            }),
        }
    }

    /// Declare a liveness-check port and its host mapping.
    pub fn with_liveness_port(self, container_port: u16, host_port: u16) -> Self {
        self.liveness.lock().unwrap().insert(container_port);
        self.mapped
            .lock()
            .unwrap()
            .insert(container_port, host_port);
        self
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn set_exec_exit_code(&self, exit_code: i64) {
        self.exec_exit_code.store(exit_code, Ordering::SeqCst);
    }

    pub fn set_state(&self, running: bool, exit_code: Option<i64>) {
        *self.state.lock().unwrap() = ContainerStateSnapshot { running, exit_code };
    }

    /// Emit an output line to the buffer and to all live followers.
    pub fn push_output(&self, frame: OutputFrame) {
        let mut hub = self.output.lock().unwrap();
        hub.buffered.push(frame.clone());
        hub.subscribers.retain(|tx| tx.send(frame.clone()).is_ok());
    }

    pub fn push_stdout_line(&self, line: &str) {
        self.push_output(OutputFrame::stdout(format!("{}\n", line)));
    }

    /// End the output stream for current and future followers.
    pub fn close_output(&self) {
        let mut hub = self.output.lock().unwrap();
        hub.closed = true;
        hub.subscribers.clear();
    }
}

#[async_trait]
impl WaitStrategyTarget for MockTarget {
    fn container_id(&self) -> String {
        "mock-container".to_string()
    }

    fn host(&self) -> String {
        self.host.clone()
    }

    async fn exposed_ports(&self) -> Result<Vec<u16>, TargetError> {
        Ok(self.liveness.lock().unwrap().iter().copied().collect())
    }

    async fn mapped_port(&self, container_port: u16) -> Result<u16, TargetError> {
        self.mapped
            .lock()
            .unwrap()
            .get(&container_port)
            .copied()
            .ok_or(TargetError::PortNotMapped(container_port))
    }

    async fn liveness_check_ports(&self) -> Result<BTreeSet<u16>, TargetError> {
        Ok(self.liveness.lock().unwrap().clone())
    }

    async fn is_healthy(&self) -> Result<bool, TargetError> {
        Ok(self.healthy.load(Ordering::SeqCst))
    }

    async fn exec(&self, _cmd: &[String]) -> Result<ExecResult, TargetError> {
        Ok(ExecResult {
            exit_code: self.exec_exit_code.load(Ordering::SeqCst),
            stdout: Vec::new(),
            stderr: Vec::new(),
        })
    }

    async fn follow_output(&self) -> Result<OutputStream, TargetError> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        {
            let mut hub = self.output.lock().unwrap();
            for frame in &hub.buffered {
                let _ = tx.send(frame.clone());
            }
            if !hub.closed {
                hub.subscribers.push(tx);
            }
            // A closed hub drops the sender once buffered frames are queued,
            // so the stream ends after replay.
        }
        Ok(Box::pin(futures::stream::poll_fn(move |cx| {
            rx.poll_recv(cx)
        })))
    }

    async fn state(&self) -> Result<ContainerStateSnapshot, TargetError> {
        Ok(*self.state.lock().unwrap())
    }
}

/// Spawn a minimal HTTP/1.1 stub server; the handler maps the raw request
/// head to a status code and body.
pub async fn spawn_http_stub<F>(handler: F) -> SocketAddr
where
    F: Fn(&str) -> (u16, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("stub server should bind");
    let addr = listener.local_addr().expect("stub server has an address");
    let handler = Arc::new(handler);

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let handler = Arc::clone(&handler);
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut chunk = [0u8; 1024];
                loop {
                    match socket.read(&mut chunk).await {
                        Ok(0) => break,
                        Ok(n) => {
                            request.extend_from_slice(&chunk[..n]);
                            if request.windows(4).any(|w| w == b"\r\n\r\n") {
                                break;
                            }
                        }
                        Err(_) => return,
                    }
                }
                let head = String::from_utf8_lossy(&request).into_owned();
                let (status, body) = handler(&head);
                let response = format!(
                    "HTTP/1.1 {} Stub\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Stub server that always answers with a fixed status and body.
pub async fn spawn_fixed_http_stub(status: u16, body: &'static str) -> SocketAddr {
    spawn_http_stub(move |_| (status, body.to_string())).await
}

/// A TCP listener that accepts and holds connections, for port checks.
pub async fn spawn_tcp_listener() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let addr = listener.local_addr().expect("listener has an address");
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    addr
}
