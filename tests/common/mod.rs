//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use resilient_clients::client::{connector_fn, ClientHandle, ServiceConnector};
use resilient_clients::config::{ManagerConfig, RetryConfig, ServiceDescriptor, ServiceKind};
use resilient_clients::{ClientError, ClientManager};

/// Connected stand-in returned by [`ScriptedConnector`].
#[derive(Debug)]
pub struct FakeClient {
    pub service: String,
    pub generation: usize,
}

/// Connector that replays scripted outcomes, then succeeds.
#[derive(Clone, Default)]
pub struct ScriptedConnector {
    script: Arc<Mutex<VecDeque<Result<(), ClientError>>>>,
    attempts: Arc<AtomicUsize>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then_fail(self, error: ClientError) -> Self {
        self.script.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn then_fail_times(self, n: usize, error: ClientError) -> Self {
        for _ in 0..n {
            self.script.lock().unwrap().push_back(Err(error.clone()));
        }
        self
    }

    pub fn push_failure(&self, error: ClientError) {
        self.script.lock().unwrap().push_back(Err(error));
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn connector(&self) -> Arc<dyn ServiceConnector> {
        let script = self.script.clone();
        let attempts = self.attempts.clone();
        connector_fn(move |ctx| {
            let generation = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            let next = script.lock().unwrap().pop_front().unwrap_or(Ok(()));
            async move {
                next?;
                Ok::<_, ClientError>(ClientHandle::new(
                    &ctx.descriptor.name,
                    FakeClient {
                        service: ctx.descriptor.name.clone(),
                        generation,
                    },
                ))
            }
        })
    }
}

pub fn transient() -> ClientError {
    ClientError::Transient("connection refused".into())
}

pub fn custom_service(name: &str) -> ServiceDescriptor {
    ServiceDescriptor::new(name)
        .enabled(true)
        .kind(ServiceKind::Custom)
}

pub fn single_attempt() -> RetryConfig {
    RetryConfig {
        max_retries: 1,
        base_delay_ms: 1,
        backoff_factor: 2.0,
    }
}

pub fn fast_retry(max_retries: u32) -> RetryConfig {
    RetryConfig {
        max_retries,
        base_delay_ms: 1,
        backoff_factor: 2.0,
    }
}

pub fn config_with(services: Vec<ServiceDescriptor>) -> ManagerConfig {
    ManagerConfig {
        retry: single_attempt(),
        services,
        ..ManagerConfig::default()
    }
}

/// Manager with one scripted connector per custom service.
pub fn manager_with(
    config: ManagerConfig,
    connectors: &[(&str, &ScriptedConnector)],
) -> Arc<ClientManager> {
    let mut builder = ClientManager::builder(config);
    for (name, scripted) in connectors {
        builder = builder.connector(*name, scripted.connector());
    }
    Arc::new(builder.build().unwrap())
}

/// Counts requests served by a mock backend.
#[derive(Clone, Default)]
pub struct Hits(Arc<AtomicUsize>);

impl Hits {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Start a programmable mock HTTP backend on an ephemeral port.
///
/// `f` receives the request path and returns status and JSON body.
pub async fn start_programmable_backend<F, Fut>(f: F) -> (SocketAddr, Hits)
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Hits::default();
    let counter = hits.clone();
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            let counter = counter.clone();
            tokio::spawn(async move {
                let path = match read_request_path(&mut socket).await {
                    Some(path) => path,
                    None => return,
                };
                counter.0.fetch_add(1, Ordering::SeqCst);

                let (status, body) = f(path).await;
                let status_text = match status {
                    200 => "200 OK",
                    403 => "403 Forbidden",
                    404 => "404 Not Found",
                    429 => "429 Too Many Requests",
                    500 => "500 Internal Server Error",
                    503 => "503 Service Unavailable",
                    _ => "200 OK",
                };

                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_text,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, hits)
}

/// Backend that always answers with `status` and `body`.
pub async fn start_mock_backend(status: u16, body: &'static str) -> (SocketAddr, Hits) {
    start_programmable_backend(move |_| async move { (status, body.to_string()) }).await
}

async fn read_request_path(socket: &mut tokio::net::TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let head = String::from_utf8_lossy(&buf);
    head.split_whitespace().nth(1).map(str::to_string)
}
