// Minimal HTTP/1.1 server for transport tests: one request per connection

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

/// How the server answers
#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    /// 206 with `Content-Range` for ranged GETs; HEAD reports the length
    Ranged,
    /// Always 200 with the whole body, whatever the `Range` header says
    IgnoresRange,
    /// HEAD is rejected with 405; ranged GETs work
    NoHead,
    /// 503 for the first `n` requests, then behaves like `Ranged`
    FailFirst(usize),
    /// 404 for everything
    NotFound,
    /// Accept connections and never answer
    Silent,
}

pub struct TestServer {
    pub url: String,
    requests: Arc<AtomicUsize>,
}

impl TestServer {
    /// Requests answered (or swallowed) so far
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

pub fn serve(body: Vec<u8>, behavior: Behavior) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/media.mp3", listener.local_addr().unwrap());
    let requests = Arc::new(AtomicUsize::new(0));

    let counter = requests.clone();
    thread::spawn(move || {
        let mut parked = Vec::new();
        for stream in listener.incoming() {
            let Ok(stream) = stream else { break };
            if let Behavior::Silent = behavior {
                counter.fetch_add(1, Ordering::SeqCst);
                parked.push(stream);
                continue;
            }
            let n = counter.fetch_add(1, Ordering::SeqCst);
            let _ = respond(stream, &body, behavior, n);
        }
    });

    TestServer { url, requests }
}

fn respond(mut stream: TcpStream, body: &[u8], behavior: Behavior, n: usize) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;

    let mut range = None;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 || line == "\r\n" {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("range") {
                range = parse_range(value.trim());
            }
        }
    }
    let is_head = request_line.starts_with("HEAD");
    let total = body.len();

    let (status, extra, payload): (&str, String, &[u8]) = match behavior {
        Behavior::NotFound => ("404 Not Found", String::new(), &[][..]),
        Behavior::FailFirst(failures) if n < failures => ("503 Service Unavailable", String::new(), &[][..]),
        Behavior::NoHead if is_head => ("405 Method Not Allowed", String::new(), &[][..]),
        _ if is_head => {
            let header = format!("Content-Length: {}\r\n", total);
            stream.write_all(format!("HTTP/1.1 200 OK\r\n{}Connection: close\r\n\r\n", header).as_bytes())?;
            return stream.flush();
        }
        Behavior::IgnoresRange => ("200 OK", String::new(), body),
        _ => match range {
            Some((start, end)) if start < total => {
                let end = end.min(total - 1);
                (
                    "206 Partial Content",
                    format!("Content-Range: bytes {}-{}/{}\r\n", start, end, total),
                    &body[start..=end],
                )
            }
            Some(_) => ("416 Range Not Satisfiable", String::new(), &[][..]),
            None => ("200 OK", String::new(), body),
        },
    };

    let head = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\n{}Connection: close\r\n\r\n",
        status,
        payload.len(),
        extra
    );
    stream.write_all(head.as_bytes())?;
    stream.write_all(payload)?;
    stream.flush()
}

fn parse_range(value: &str) -> Option<(usize, usize)> {
    let (start, end) = value.strip_prefix("bytes=")?.split_once('-')?;
    Some((start.parse().ok()?, end.parse().ok()?))
}

/// Deterministic body whose bytes identify their own offset
pub fn patterned(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}
