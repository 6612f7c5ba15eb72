//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use tool_gateway::config::GatewayConfig;
use tool_gateway::gateway::{Gateway, GatewaySettings};
use tool_gateway::http::HttpServer;
use tool_gateway::lifecycle::{Shutdown, ShutdownOutcome};
use tool_gateway::net::Listener;
use tool_gateway::routing::HttpDirectory;
use tool_gateway::transport::HyperTransport;

/// A request as seen by a mock server.
#[derive(Debug, Clone)]
pub struct RawRequest {
    pub request_line: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RawRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Read one HTTP/1.1 request (Content-Length or chunked body).
pub async fn read_request(stream: &mut TcpStream) -> Option<RawRequest> {
    let mut reader = BufReader::new(stream);

    let mut request_line = String::new();
    if reader.read_line(&mut request_line).await.ok()? == 0 {
        return None;
    }

    let mut headers = Vec::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).await.ok()?;
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        let (name, value) = line.split_once(':')?;
        headers.push((name.trim().to_string(), value.trim().to_string()));
    }

    let mut request = RawRequest {
        request_line: request_line.trim_end().to_string(),
        headers,
        body: Vec::new(),
    };

    if request
        .header("transfer-encoding")
        .is_some_and(|v| v.eq_ignore_ascii_case("chunked"))
    {
        loop {
            let mut size_line = String::new();
            reader.read_line(&mut size_line).await.ok()?;
            let size = usize::from_str_radix(size_line.trim(), 16).ok()?;
            let mut chunk = vec![0u8; size + 2];
            reader.read_exact(&mut chunk).await.ok()?;
            if size == 0 {
                break;
            }
            request.body.extend_from_slice(&chunk[..size]);
        }
    } else if let Some(len) = request.header("content-length").and_then(|v| v.parse::<usize>().ok()) {
        let mut body = vec![0u8; len];
        reader.read_exact(&mut body).await.ok()?;
        request.body = body;
    }

    Some(request)
}

async fn write_response(stream: &mut TcpStream, status: u16, content_type: &str, body: &[u8]) {
    let reason = match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    };
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        reason,
        content_type,
        body.len()
    );
    let _ = stream.write_all(head.as_bytes()).await;
    let _ = stream.write_all(body).await;
    let _ = stream.shutdown().await;
}

/// Mock directory service with a programmable answer.
#[derive(Clone)]
pub struct MockDirectory {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    answer: Arc<Mutex<(u16, String)>>,
    paths: Arc<Mutex<Vec<String>>>,
}

impl MockDirectory {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().unwrap().clone()
    }

    pub fn set_answer(&self, status: u16, body: impl Into<String>) {
        *self.answer.lock().unwrap() = (status, body.into());
    }

    pub fn set_route(&self, url: &str, require_auth: bool) {
        self.set_answer(200, route_json(url, require_auth));
    }
}

pub fn route_json(url: &str, require_auth: bool) -> String {
    serde_json::json!({ "url": url, "requireAuth": require_auth }).to_string()
}

pub async fn start_directory(status: u16, body: impl Into<String>) -> MockDirectory {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let directory = MockDirectory {
        addr: listener.local_addr().unwrap(),
        hits: Arc::new(AtomicUsize::new(0)),
        answer: Arc::new(Mutex::new((status, body.into()))),
        paths: Arc::new(Mutex::new(Vec::new())),
    };

    let state = directory.clone();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let state = state.clone();
            tokio::spawn(async move {
                let Some(request) = read_request(&mut socket).await else {
                    return;
                };
                state.hits.fetch_add(1, Ordering::SeqCst);
                if let Some(path) = request.request_line.split_whitespace().nth(1) {
                    state.paths.lock().unwrap().push(path.to_string());
                }
                let (status, body) = state.answer.lock().unwrap().clone();
                write_response(&mut socket, status, "application/json", body.as_bytes()).await;
            });
        }
    });

    directory
}

/// Mock backend answering with a text dump of the request it received.
#[derive(Clone)]
pub struct EchoBackend {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    last: Arc<Mutex<Option<RawRequest>>>,
}

impl EchoBackend {
    pub fn url(&self, base_path: &str) -> String {
        format!("http://{}{}", self.addr, base_path)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<RawRequest> {
        self.last.lock().unwrap().clone()
    }
}

/// Start the echo backend. Responses are delayed by `delay`.
pub async fn start_echo_backend(delay: Duration) -> EchoBackend {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let backend = EchoBackend {
        addr: listener.local_addr().unwrap(),
        hits: Arc::new(AtomicUsize::new(0)),
        last: Arc::new(Mutex::new(None)),
    };

    let state = backend.clone();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let state = state.clone();
            tokio::spawn(async move {
                let Some(request) = read_request(&mut socket).await else {
                    return;
                };
                state.hits.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(delay).await;

                let mut dump = format!("{}\n", request.request_line).into_bytes();
                dump.extend_from_slice(&request.body);
                *state.last.lock().unwrap() = Some(request);
                write_response(&mut socket, 200, "text/plain", &dump).await;
            });
        }
    });

    backend
}

/// A running gateway bound to an ephemeral port.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<ShutdownOutcome>,
}

impl TestGateway {
    /// Base URL for `host`, which must resolve to the gateway through [`client_for`].
    pub fn url(&self, host: &str, path: &str) -> String {
        format!("http://{}:{}{}", host, self.addr.port(), path)
    }
}

pub fn test_config(directory_url: &str) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1".into();
    config.listener.port = 0;
    config.directory.base_url = directory_url.to_string();
    config.directory.timeout_secs = 2;
    config.timeouts.request_secs = 5;
    config.timeouts.forward_secs = 4;
    config.timeouts.connect_secs = 1;
    config.timeouts.shutdown_grace_secs = 2;
    config
}

pub async fn start_gateway(config: GatewayConfig) -> TestGateway {
    let directory = Arc::new(HttpDirectory::new(&config.directory).unwrap());
    let transport = Arc::new(HyperTransport::new(Duration::from_secs(config.timeouts.connect_secs)).unwrap());
    let gateway = Gateway::new(directory, transport, GatewaySettings::from_config(&config));

    let listener = Listener::bind(&config.listener).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = HttpServer::new(gateway, &config);

    let server_shutdown = shutdown.clone();
    let handle = tokio::spawn(async move { server.run(listener, server_shutdown).await });

    TestGateway {
        addr,
        shutdown,
        handle,
    }
}

/// HTTP client resolving each of `hosts` to the gateway.
pub fn client_for(gateway: &TestGateway, hosts: &[&str]) -> reqwest::Client {
    let mut builder = reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(10));
    for host in hosts {
        builder = builder.resolve(host, gateway.addr);
    }
    builder.build().unwrap()
}
