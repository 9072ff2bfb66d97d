//! Shared test fixtures for the price-drop monitor integration tests.
//!
//! Provides `FixtureServer`, a tiny HTTP/1.1 server on a loopback port that
//! answers from a route table and records every request it sees, plus
//! helpers for building `Settings` against it.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use price_drop_monitor::Settings;

// ---------------------------------------------------------------------------
// FixtureServer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    /// Path plus query string, as sent.
    pub target: String,
    /// Header names are lowercased.
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn path(&self) -> &str {
        self.target.split('?').next().unwrap_or("")
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

#[derive(Debug, Clone)]
struct Canned {
    status: u16,
    content_type: &'static str,
    body: String,
}

type Routes = HashMap<(String, String), Canned>;

/// Loopback HTTP server with a mutable route table. Unknown routes get 404.
pub struct FixtureServer {
    base: String,
    routes: Arc<Mutex<Routes>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl FixtureServer {
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let routes: Arc<Mutex<Routes>> = Arc::new(Mutex::new(HashMap::new()));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let thread_routes = Arc::clone(&routes);
        let thread_requests = Arc::clone(&requests);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { continue };
                handle(stream, &thread_routes, &thread_requests);
            }
        });

        Self {
            base,
            routes,
            requests,
        }
    }

    /// `http://127.0.0.1:<port>`
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn route(&self, method: &str, path: &str, status: u16, body: impl Into<String>) {
        self.insert(method, path, status, "application/json", body.into());
    }

    pub fn route_json(&self, method: &str, path: &str, status: u16, body: serde_json::Value) {
        self.insert(method, path, status, "application/json", body.to_string());
    }

    pub fn route_html(&self, method: &str, path: &str, status: u16, body: impl Into<String>) {
        self.insert(method, path, status, "text/html; charset=utf-8", body.into());
    }

    fn insert(&self, method: &str, path: &str, status: u16, content_type: &'static str, body: String) {
        self.routes.lock().unwrap().insert(
            (method.to_string(), path.to_string()),
            Canned {
                status,
                content_type,
                body,
            },
        );
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, method: &str, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path() == path)
            .collect()
    }

    pub fn clear_requests(&self) {
        self.requests.lock().unwrap().clear();
    }
}

fn handle(mut stream: TcpStream, routes: &Mutex<Routes>, requests: &Mutex<Vec<RecordedRequest>>) {
    stream.set_read_timeout(Some(Duration::from_secs(5))).ok();

    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
        match stream.read(&mut chunk) {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or("").split(' ');
    let method = request_line.next().unwrap_or("").to_string();
    let target = request_line.next().unwrap_or("").to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k == "content-length")
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        match stream.read(&mut chunk) {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    let body_end = buf.len().min(header_end + content_length);
    let body = String::from_utf8_lossy(&buf[header_end..body_end]).to_string();

    let path = target.split('?').next().unwrap_or("").to_string();
    let canned = routes
        .lock()
        .unwrap()
        .get(&(method.clone(), path))
        .cloned()
        .unwrap_or(Canned {
            status: 404,
            content_type: "text/plain",
            body: "not found".to_string(),
        });

    requests.lock().unwrap().push(RecordedRequest {
        method,
        target,
        headers,
        body,
    });

    let response = if canned.status == 204 {
        "HTTP/1.1 204 No Content\r\nConnection: close\r\n\r\n".to_string()
    } else {
        format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            canned.status,
            reason(canned.status),
            canned.content_type,
            canned.body.len(),
            canned.body
        )
    };
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

// ---------------------------------------------------------------------------
// Settings and page fixtures
// ---------------------------------------------------------------------------

pub const PRICING_PATH: &str = "/pricing/changes";
pub const WEBHOOK_PATH: &str = "/webhook";
pub const STOCK_PREFIX: &str = "/stock/";

/// Settings pointing every remote at `server` and state files into `dir`.
pub fn settings_for(server: &FixtureServer, dir: &Path) -> Settings {
    let mut env = HashMap::new();
    env.insert("ENDPOINT", server.url(PRICING_PATH));
    env.insert("API_KEY", "test-key".to_string());
    env.insert("DISCORD_WEBHOOK_URL", server.url(WEBHOOK_PATH));
    env.insert("SUPPLIER_BASE_URL", server.base().to_string());
    env.insert("STOCK_API_URL", server.url(STOCK_PREFIX));
    env.insert(
        "PRICE_HISTORY_FILE",
        dir.join("price_history.json").display().to_string(),
    );
    env.insert(
        "LAST_CHECKED_FILE",
        dir.join("last_checked_time.json").display().to_string(),
    );
    env.insert("HTTP_TIMEOUT_SECS", "10".to_string());
    Settings::from_lookup(|key| env.get(key).cloned()).unwrap()
}

/// A product page with every scraped field present.
pub fn product_page(name: &str, brand: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>{name}</title></head>
<body>
  <nav>
    <span itemprop="name" class="cmp-breadcrumb__name">Home</span>
    <span itemprop="name" class="cmp-breadcrumb__name">Power Tools</span>
    <span itemprop="name" class="cmp-breadcrumb__name">Drills</span>
  </nav>
  <h1><span role="name" class="text-xl font-black">
      {name}
  </span></h1>
  <img class="pdp__prodimage" src="https://cdn.example.com/img/1001.jpg" alt="">
  <div>UPC: <span role="upc">012345678905</span></div>
  <div>Model: <span role="modelNumber">DR-2000</span></div>
  <table class="specs">
    <tr><td>Weight</td><td>3 lb</td></tr>
    <tr><td>Brand</td><td> {brand} </td></tr>
  </table>
</body>
</html>"#,
        name = name,
        brand = brand
    )
}
