//! Minimal HTTP/1.1 server that accepts POSTs for integration tests.
//!
//! Records every request (target, content type, body) and answers with a
//! status chosen by a caller-supplied function of the body. Can also delay
//! responses and tracks how many requests it is handling at once.

#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Received {
    pub method: String,
    pub target: String,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

type Responder = dyn Fn(&[u8]) -> u16 + Send + Sync;

pub struct PostServer {
    pub url: String,
    received: Arc<Mutex<Vec<Received>>>,
    peak: Arc<AtomicUsize>,
}

impl PostServer {
    pub fn received(&self) -> Vec<Received> {
        self.received.lock().unwrap().clone()
    }

    /// Highest number of requests handled simultaneously.
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Server answering every POST with `status`.
pub fn start(status: u16) -> PostServer {
    start_with(move |_| status, Duration::ZERO)
}

/// Server whose status depends on the body and which waits `delay` before answering.
pub fn start_with<F>(respond: F, delay: Duration) -> PostServer
where
    F: Fn(&[u8]) -> u16 + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let received = Arc::new(Mutex::new(Vec::new()));
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let respond: Arc<Responder> = Arc::new(respond);
    {
        let received = Arc::clone(&received);
        let peak = Arc::clone(&peak);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let received = Arc::clone(&received);
                let in_flight = Arc::clone(&in_flight);
                let peak = Arc::clone(&peak);
                let respond = Arc::clone(&respond);
                thread::spawn(move || {
                    let mut stream = stream;
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    let response = handle(&mut stream, &received, respond.as_ref(), delay);
                    // Leave the in-flight count before the client can see the response.
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    if let Some(response) = response {
                        let _ = stream.write_all(response.as_bytes());
                    }
                });
            }
        });
    }
    PostServer {
        url: format!("http://127.0.0.1:{}/api/v2/sbom", port),
        received,
        peak,
    }
}

/// URL of a port with no listener (connection refused).
pub fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}/api/v2/sbom", port)
}

fn handle(
    stream: &mut TcpStream,
    received: &Mutex<Vec<Received>>,
    respond: &Responder,
    delay: Duration,
) -> Option<String> {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let mut data = Vec::new();
    let mut buf = [0u8; 8192];
    let header_end = loop {
        if let Some(pos) = find(&data, b"\r\n\r\n") {
            break pos + 4;
        }
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => return None,
            Ok(n) => data.extend_from_slice(&buf[..n]),
        }
    };
    let head = String::from_utf8_lossy(&data[..header_end]).into_owned();
    let mut lines = head.lines();
    let mut request_line = lines.next().unwrap_or("").split_whitespace();
    let method = request_line.next().unwrap_or("").to_string();
    let target = request_line.next().unwrap_or("").to_string();
    let mut content_length = 0usize;
    let mut content_type = None;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim();
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            } else if name.eq_ignore_ascii_case("content-type") {
                content_type = Some(value.trim().to_string());
            }
        }
    }
    let mut body = data[header_end..].to_vec();
    while body.len() < content_length {
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => return None,
            Ok(n) => body.extend_from_slice(&buf[..n]),
        }
    }

    if !delay.is_zero() {
        thread::sleep(delay);
    }
    let status = respond(&body);
    received.lock().unwrap().push(Received {
        method,
        target,
        content_type,
        body,
    });
    Some(format!(
        "HTTP/1.1 {} Status\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok",
        status
    ))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
