// Request bank - a local recording server for beacon assertions.
// Tests point pings at url_for(name) and later withdraw the recorded
// request to assert on arrival order, timing and query contents.

use std::sync::Arc;
use std::time::{Duration, Instant};
use dashmap::DashMap;
use tiny_http::{Response, Server};

const BANK_PATH_PREFIX: &str = "/request-bank/";

#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub name: String,
    pub query: String, // raw query string, "" if none
    pub received_at: Instant,
}

pub struct RequestBank {
    port: u16,
    requests: DashMap<String, RecordedRequest>,
}

/// Split a raw request target into its deposit name and query string.
/// Pure logic so the parsing is testable without a socket.
fn parse_deposit(raw_url: &str) -> Option<(String, String)> {
    let (path, query) = match raw_url.split_once('?') {
        Some((path, query)) => (path, query),
        None => (raw_url, ""),
    };

    let name = path.strip_prefix(BANK_PATH_PREFIX)?;
    if name.is_empty() {
        return None;
    }

    let decoded = urlencoding::decode(name).ok()?;
    Some((decoded.into_owned(), query.to_string()))
}

impl RequestBank {
    /// Bind a free localhost port and start recording on a background
    /// thread. The server lives for the rest of the process.
    pub fn start() -> Result<Arc<Self>, String> {
        let port = portpicker::pick_unused_port().ok_or("no free port available")?;
        let server = Server::http(("127.0.0.1", port)).map_err(|e| e.to_string())?;

        let bank = Arc::new(RequestBank {
            port,
            requests: DashMap::new(),
        });

        let recorder = bank.clone();
        std::thread::spawn(move || {
            for request in server.incoming_requests() {
                recorder.record(request.url());
                let _ = request.respond(Response::empty(204));
            }
        });

        log::info!("[RequestBank] Listening on 127.0.0.1:{}", port);
        Ok(bank)
    }

    fn record(&self, raw_url: &str) {
        let (name, query) = match parse_deposit(raw_url) {
            Some(parsed) => parsed,
            None => {
                log::warn!("[RequestBank] Ignoring unexpected request: {}", raw_url);
                return;
            }
        };

        log::info!("[RequestBank] Deposit '{}' ({})", name, query);
        self.requests.insert(
            name.clone(),
            RecordedRequest {
                name,
                query,
                received_at: Instant::now(),
            },
        );
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// The URL a ping must hit to deposit under the given name.
    pub fn url_for(&self, name: &str) -> String {
        format!(
            "http://127.0.0.1:{}{}{}",
            self.port,
            BANK_PATH_PREFIX,
            urlencoding::encode(name)
        )
    }

    pub fn has_deposit(&self, name: &str) -> bool {
        self.requests.contains_key(name)
    }

    /// Block until a request deposited under the name arrives, or the
    /// timeout elapses. Each deposit can be withdrawn once.
    pub fn withdraw(&self, name: &str, timeout: Duration) -> Result<RecordedRequest, String> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some((_, request)) = self.requests.remove(name) {
                return Ok(request);
            }
            if Instant::now() >= deadline {
                return Err(format!(
                    "no '{}' request arrived within {}ms",
                    name,
                    timeout.as_millis()
                ));
            }
            std::thread::sleep(Duration::from_millis(10));
        }
    }
}
