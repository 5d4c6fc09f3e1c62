use std::sync::Arc;
use std::time::Duration;
use dashmap::DashMap;
use url::Url;

use crate::settings::Settings;

const TS_PARAM: &str = "ts";
const PING_PARAM: &str = "ping";

pub struct BeaconManager {
    // Each named ping fires at most once per manager; value is the unix
    // timestamp at which it was queued.
    sent: DashMap<String, i64>,
    timeout: Duration,
}

/// Stamp a ping URL with the timestamp and ping-name query parameters.
/// Pure logic so it can be unit tested without network access.
fn build_ping_url(base: &str, name: &str, ts: i64) -> Result<String, String> {
    let parsed = Url::parse(base).map_err(|e| e.to_string())?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(format!("unsupported ping scheme '{}'", parsed.scheme()));
    }

    let separator = if base.contains('?') { '&' } else { '?' };
    Ok(format!(
        "{}{}{}={}&{}={}",
        base,
        separator,
        TS_PARAM,
        ts,
        PING_PARAM,
        urlencoding::encode(name)
    ))
}

impl BeaconManager {
    pub fn new(settings: &Settings) -> Arc<Self> {
        Arc::new(BeaconManager {
            sent: DashMap::new(),
            timeout: Duration::from_secs(settings.ping_timeout_secs),
        })
    }

    /// Queue a named ping. Returns false if this name already fired
    /// (dedupe) or the URL is unusable. The request itself runs on a
    /// background thread; failures are logged, never retried.
    pub fn send_ping(self: &Arc<Self>, name: &str, base_url: &str) -> bool {
        if self.sent.contains_key(name) {
            log::debug!("[Beacon] Ping '{}' already sent, skipping", name);
            return false;
        }

        let ts = chrono::Utc::now().timestamp();
        let url = match build_ping_url(base_url, name, ts) {
            Ok(url) => url,
            Err(e) => {
                log::warn!("[Beacon] Bad ping URL for '{}': {}", name, e);
                return false;
            }
        };

        self.sent.insert(name.to_string(), ts);

        let name = name.to_string();
        let timeout = self.timeout;
        std::thread::spawn(move || {
            let result = reqwest::blocking::Client::builder()
                .timeout(timeout)
                .build()
                .and_then(|client| client.get(&url).send());

            match result {
                Ok(resp) => {
                    log::info!("[Beacon] Ping '{}' delivered ({})", name, resp.status())
                }
                Err(e) => log::warn!("[Beacon] Ping '{}' failed: {}", name, e),
            }
        });

        true
    }

    pub fn was_sent(&self, name: &str) -> bool {
        self.sent.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("http://127.0.0.1:9/bank/view", "view", "http://127.0.0.1:9/bank/view?ts=1700000000&ping=view")]
    #[case("https://example.com/ping?ad=1", "view", "https://example.com/ping?ad=1&ts=1700000000&ping=view")]
    #[case("http://example.com/p", "active view", "http://example.com/p?ts=1700000000&ping=active%20view")]
    fn test_build_ping_url(#[case] base: &str, #[case] name: &str, #[case] expected: &str) {
        assert_eq!(build_ping_url(base, name, 1_700_000_000).unwrap(), expected);
    }

    #[rstest]
    #[case("not a url")]
    #[case("ftp://example.com/ping")]
    #[case("file:///tmp/ping")]
    fn test_build_ping_url_rejects(#[case] base: &str) {
        assert!(build_ping_url(base, "view", 0).is_err());
    }

    #[test]
    fn test_ping_dedupe() {
        let beacons = BeaconManager::new(&Settings::default());
        // Port 9 (discard) is unroutable on most hosts; delivery failure is
        // fine, the dedupe bookkeeping is what we assert on.
        assert!(beacons.send_ping("view", "http://127.0.0.1:9/bank/view"));
        assert!(beacons.was_sent("view"));
        assert!(!beacons.send_ping("view", "http://127.0.0.1:9/bank/view"));
        assert!(!beacons.was_sent("activeview"));
    }

    #[test]
    fn test_bad_url_does_not_mark_sent() {
        let beacons = BeaconManager::new(&Settings::default());
        assert!(!beacons.send_ping("view", "not a url"));
        assert!(!beacons.was_sent("view"));
    }
}
