#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use assert_cmd::Command;
use desk::error::TransportError;
use desk::runtime::MemoryConsole;
use desk::session::{Connector, Link, PortFuture};
use desk::{Dispatcher, Registry, Request, Response, RetryPolicy, Session, SessionOptions};
use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub type Handler = Arc<dyn Fn(&Request) -> Response + Send + Sync>;

/// Answers the way the ticket server does for the commands the tests use.
#[must_use]
pub fn ticket_handler() -> Handler {
    Arc::new(|request: &Request| {
        let rid = Some(request.rid.clone());
        match request.cmd.as_str() {
            "show" => Response::success(rid, "1 record").with_data(json!([{"id": 1, "price": 10}])),
            "login" | "register" => {
                Response::success(rid, "welcome").with_data(json!({"user_id": 42}))
            }
            "clear" if request.auth.is_none() => {
                Response::error(rid, "UNAUTHORIZED", "log in first")
            }
            other => Response::success(rid, format!("{other}: done")),
        }
    })
}

/// In-memory server: every request is recorded, connects can be refused.
#[derive(Clone)]
pub struct FakeServer {
    pub refuse: Arc<AtomicBool>,
    pub received: Arc<Mutex<Vec<Request>>>,
    handler: Handler,
}

impl FakeServer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            refuse: Arc::new(AtomicBool::new(false)),
            received: Arc::new(Mutex::new(Vec::new())),
            handler: ticket_handler(),
        }
    }

    #[must_use]
    pub fn commands(&self) -> Vec<String> {
        self.received
            .lock()
            .unwrap()
            .iter()
            .map(|request| request.cmd.clone())
            .collect()
    }
}

impl Connector for FakeServer {
    fn connect(&self) -> PortFuture<'_, Box<dyn Link>> {
        Box::pin(async move {
            if self.refuse.load(Ordering::SeqCst) {
                return Err(TransportError::Io("connection refused".to_string()));
            }
            Ok(Box::new(FakeLink {
                received: Arc::clone(&self.received),
                handler: Arc::clone(&self.handler),
            }) as Box<dyn Link>)
        })
    }

    fn describe(&self) -> String {
        "fake://ticket-server".to_string()
    }
}

struct FakeLink {
    received: Arc<Mutex<Vec<Request>>>,
    handler: Handler,
}

impl Link for FakeLink {
    fn exchange<'a>(&'a mut self, request: &'a Request) -> PortFuture<'a, Response> {
        Box::pin(async move {
            self.received.lock().unwrap().push(request.clone());
            Ok((self.handler)(request))
        })
    }
}

pub struct Desk {
    pub server: FakeServer,
    pub console: Arc<MemoryConsole>,
    pub dispatcher: Arc<Dispatcher>,
}

#[must_use]
pub fn desk() -> Desk {
    let server = FakeServer::new();
    let console = Arc::new(MemoryConsole::new());
    let options = SessionOptions {
        retry: RetryPolicy::bounded(Duration::from_millis(1), 3),
        ..SessionOptions::default()
    };
    let session = Arc::new(Session::new(Arc::new(server.clone()), options));
    let dispatcher = Arc::new(Dispatcher::new(
        Arc::new(Registry::standard()),
        session,
        console.clone(),
    ));
    Desk {
        server,
        console,
        dispatcher,
    }
}

pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    path
}

/// Newline-JSON server on a loopback port, run on plain threads so it also
/// serves a child process. Each connection is answered by `handler` until
/// the client hangs up.
pub fn spawn_line_server(handler: Handler) -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let handler = Arc::clone(&handler);
            std::thread::spawn(move || serve_connection(stream, &handler));
        }
    });
    addr
}

fn serve_connection(stream: std::net::TcpStream, handler: &Handler) {
    let Ok(mut writer) = stream.try_clone() else {
        return;
    };
    for line in BufReader::new(stream).lines() {
        let Ok(line) = line else { return };
        let Ok(request) = serde_json::from_str::<Request>(&line) else {
            return;
        };
        let mut encoded = serde_json::to_string(&handler(&request)).unwrap();
        encoded.push('\n');
        if writer.write_all(encoded.as_bytes()).is_err() {
            return;
        }
    }
}

#[must_use]
pub fn desk_bin() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("desk"))
}

/// A port nothing listens on, with retries short enough for a test.
#[must_use]
pub fn unreachable_server_args() -> Vec<&'static str> {
    vec![
        "--server",
        "127.0.0.1:1",
        "--connect-timeout-ms",
        "200",
        "--retry-interval-ms",
        "10",
        "--max-retries",
        "1",
    ]
}
