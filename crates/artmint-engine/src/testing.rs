//! One-shot local HTTP server for exercising the live providers.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::config::EngineConfig;

/// Config built from fixed key/value pairs instead of the process env.
pub(crate) fn config_with(pairs: &[(&str, &str)]) -> EngineConfig {
    let values: HashMap<String, String> = pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    EngineConfig::from_lookup(move |key| values.get(key).cloned())
}

#[derive(Debug, Clone)]
pub(crate) struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

pub(crate) struct CannedServer {
    pub base_url: String,
    requests: Receiver<Result<CapturedRequest>>,
}

impl CannedServer {
    /// Answer exactly one request with `status`, `content_type` and `body`.
    pub fn start(status: u16, content_type: &str, body: impl Into<Vec<u8>>) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let base_url = format!("http://{}", listener.local_addr()?);
        let content_type = content_type.to_string();
        let body = body.into();
        let (tx, requests) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(serve_one(&listener, status, &content_type, &body));
        });
        Ok(Self { base_url, requests })
    }

    pub fn request(&self) -> Result<CapturedRequest> {
        self.requests
            .recv_timeout(Duration::from_secs(10))
            .context("no request reached the canned server")?
    }
}

fn serve_one(
    listener: &TcpListener,
    status: u16,
    content_type: &str,
    body: &[u8],
) -> Result<CapturedRequest> {
    let (stream, _) = listener.accept()?;
    let mut reader = BufReader::new(stream.try_clone()?);

    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let mut headers = Vec::new();
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            bail!("connection closed inside headers");
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((key, value)) = line.split_once(':') {
            headers.push((key.trim().to_string(), value.trim().to_string()));
        }
    }
    let mut request = CapturedRequest {
        method,
        path,
        headers,
        body: Vec::new(),
    };

    let content_length = request
        .header("content-length")
        .map(str::parse::<usize>)
        .transpose()?;
    let chunked = request
        .header("transfer-encoding")
        .is_some_and(|value| value.eq_ignore_ascii_case("chunked"));
    if let Some(length) = content_length {
        let mut buf = vec![0u8; length];
        reader.read_exact(&mut buf)?;
        request.body = buf;
    } else if chunked {
        request.body = read_chunked(&mut reader)?;
    }

    let mut stream = stream;
    write!(
        stream,
        "HTTP/1.1 {status} Canned\r\ncontent-type: {content_type}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
        body.len()
    )?;
    stream.write_all(body)?;
    stream.flush()?;
    Ok(request)
}

fn read_chunked<R: BufRead>(reader: &mut R) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    loop {
        let mut size_line = String::new();
        reader.read_line(&mut size_line)?;
        let size_hex = size_line.trim().split(';').next().unwrap_or_default();
        let size = usize::from_str_radix(size_hex, 16)
            .with_context(|| format!("bad chunk size {size_hex:?}"))?;
        let mut chunk = vec![0u8; size + 2];
        reader.read_exact(&mut chunk)?;
        if size == 0 {
            return Ok(body);
        }
        chunk.truncate(size);
        body.extend_from_slice(&chunk);
    }
}
