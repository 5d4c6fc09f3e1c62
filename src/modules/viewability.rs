// Viewability tracking for a story surface (typically an embedded ad).
// Fires the "view" ping when the surface first crosses the visibility
// threshold and "activeview" once it has stayed above the threshold for a
// continuous dwell period.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::beacon_manager::BeaconManager;
use crate::settings::Settings;

pub const VIEW_PING: &str = "view";
pub const ACTIVE_VIEW_PING: &str = "activeview";

/// Class hosts key their "impression became viewable" styling on.
pub const IMPRESSION_VIEWABLE_CLASS: &str = "impression-viewable";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewState {
    Pending,
    Viewed,
    ActiveViewed,
}

struct Inner {
    state: ViewState,
    // When the surface last rose to or above the threshold; cleared the
    // moment it drops below (the dwell must be continuous).
    above_since: Option<Instant>,
}

pub struct ViewabilityTracker {
    beacons: Arc<BeaconManager>,
    view_url: String,
    active_view_url: String,
    threshold_pct: u8,
    dwell: Duration,
    inner: Mutex<Inner>,
}

impl ViewabilityTracker {
    pub fn new(
        beacons: Arc<BeaconManager>,
        view_url: &str,
        active_view_url: &str,
        settings: &Settings,
    ) -> Arc<Self> {
        Arc::new(ViewabilityTracker {
            beacons,
            view_url: view_url.to_string(),
            active_view_url: active_view_url.to_string(),
            threshold_pct: settings.viewability_threshold_pct,
            dwell: Duration::from_millis(settings.active_view_delay_ms),
            inner: Mutex::new(Inner {
                state: ViewState::Pending,
                above_since: None,
            }),
        })
    }

    /// Report the currently visible fraction of the surface (percent).
    /// Drives Pending -> Viewed; the dwell thread handles ActiveViewed.
    pub fn report_visibility(self: &Arc<Self>, pct: u8) {
        let mut inner = self.inner.lock().unwrap();

        if pct < self.threshold_pct {
            // Continuity requirement: the dwell restarts at the next crossing
            inner.above_since = None;
            return;
        }

        if inner.above_since.is_none() {
            inner.above_since = Some(Instant::now());
        }

        if inner.state == ViewState::Pending {
            inner.state = ViewState::Viewed;
            log::info!("[Viewability] Surface viewed at {}%", pct);
            self.beacons.send_ping(VIEW_PING, &self.view_url);
            self.spawn_dwell_thread();
        }
    }

    // Promotes Viewed -> ActiveViewed once the surface has been above the
    // threshold for the full dwell, then exits.
    fn spawn_dwell_thread(self: &Arc<Self>) {
        let tracker = self.clone();
        std::thread::spawn(move || loop {
            std::thread::sleep(Duration::from_millis(50));

            let mut inner = tracker.inner.lock().unwrap();
            if inner.state != ViewState::Viewed {
                break;
            }
            if let Some(since) = inner.above_since {
                if since.elapsed() >= tracker.dwell {
                    inner.state = ViewState::ActiveViewed;
                    log::info!("[Viewability] Dwell complete, surface actively viewed");
                    tracker
                        .beacons
                        .send_ping(ACTIVE_VIEW_PING, &tracker.active_view_url);
                    break;
                }
            }
        });
    }

    pub fn state(&self) -> ViewState {
        self.inner.lock().unwrap().state
    }

    /// Class the host should apply to the surface, once it earned one.
    pub fn state_class(&self) -> Option<&'static str> {
        match self.state() {
            ViewState::Pending => None,
            ViewState::Viewed | ViewState::ActiveViewed => Some(IMPRESSION_VIEWABLE_CLASS),
        }
    }
}
