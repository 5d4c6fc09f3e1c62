// Manifest polling - fetches the server's page manifest on an interval and
// appends newly published pages to the story.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use serde::Deserialize;
use url::Url;

use crate::journal::UpdateJournal;
use crate::settings::Settings;
use crate::state::{Story, StoryPage};
use super::live_story::{collect_page_ids, LiveStoryManager};

#[derive(Deserialize, Debug)]
pub struct PageManifest {
    pub pages: Vec<ManifestPage>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ManifestPage {
    pub id: String,
    #[serde(default)]
    pub title: String,
}

/// Append manifest pages the story does not know yet, in manifest order.
/// Returns the ids that were appended.
fn merge_manifest(pages: &mut Vec<StoryPage>, manifest: &PageManifest) -> Vec<String> {
    let mut known: HashSet<String> = pages.iter().map(|p| p.id.clone()).collect();
    let mut appended = Vec::new();

    for entry in &manifest.pages {
        if !known.insert(entry.id.clone()) {
            continue;
        }
        pages.push(StoryPage::fresh(&entry.id, &entry.title));
        appended.push(entry.id.clone());
    }

    appended
}

/// Mark pages the previous session never synchronized as fresh.
/// No-op when there is no previous snapshot to compare against.
fn mark_fresh_since_last_sync(pages: &mut [StoryPage], last_known: &[String]) -> usize {
    if last_known.is_empty() {
        return 0;
    }
    let mut marked = 0;
    for page in pages.iter_mut() {
        if !page.fresh && !last_known.iter().any(|id| id == &page.id) {
            page.fresh = true;
            marked += 1;
        }
    }
    marked
}

pub struct StoryPoller {
    story: Arc<Story>,
    manager: Arc<LiveStoryManager>,
    journal: Arc<UpdateJournal>,
    endpoint: String,
    interval: Duration,
    stopped: AtomicBool,
}

impl StoryPoller {
    pub fn new(
        story: Arc<Story>,
        manager: Arc<LiveStoryManager>,
        journal: Arc<UpdateJournal>,
        endpoint: &str,
        settings: &Settings,
    ) -> Result<Arc<Self>, String> {
        // Validate up front so a typo fails construction, not the Nth poll
        Url::parse(endpoint).map_err(|e| e.to_string())?;

        // Pages published since the previous session's last sync still
        // count as fresh for the reader coming back.
        let last_known = journal.last_known_ids();
        {
            let mut pages = story.pages.lock().unwrap();
            let marked = mark_fresh_since_last_sync(&mut pages, &last_known);
            if marked > 0 {
                log::info!("[Poller] {} page(s) published since last session", marked);
            }
        }

        Ok(Arc::new(StoryPoller {
            story,
            manager,
            journal,
            endpoint: endpoint.to_string(),
            interval: Duration::from_secs(settings.poll_interval_secs),
            stopped: AtomicBool::new(false),
        }))
    }

    /// Spawn the background polling thread. Runs until stop() is called.
    pub fn spawn_poll_thread(self: &Arc<Self>) {
        let poller = self.clone();
        std::thread::spawn(move || {
            log::info!(
                "[Poller] Polling {} every {}s",
                poller.endpoint,
                poller.interval.as_secs()
            );
            while !poller.stopped.load(Ordering::Relaxed) {
                poller.poll_once();

                // Sleep in slices so stop() takes effect quickly
                let mut slept = Duration::ZERO;
                while slept < poller.interval && !poller.stopped.load(Ordering::Relaxed) {
                    let slice = (poller.interval - slept).min(Duration::from_millis(100));
                    std::thread::sleep(slice);
                    slept += slice;
                }
            }
            log::info!("[Poller] Stopped");
        });
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Relaxed);
    }

    /// One fetch-merge-publish round. Returns how many pages were appended.
    /// Network and parse failures are logged and skipped; the next round
    /// will retry from scratch.
    pub fn poll_once(&self) -> usize {
        let manifest = match Self::fetch_manifest(&self.endpoint) {
            Ok(manifest) => manifest,
            Err(e) => {
                log::warn!("[Poller] Manifest fetch failed: {}", e);
                return 0;
            }
        };

        let (appended, all_ids) = {
            let mut pages = self.story.pages.lock().unwrap();
            let appended = merge_manifest(&mut pages, &manifest);
            (appended, collect_page_ids(&pages))
        };

        if appended.is_empty() {
            return 0;
        }

        for id in &appended {
            log::info!("[Poller] New page '{}' published", id);
        }

        self.manager.update();
        self.journal.append(all_ids, appended.clone());
        appended.len()
    }

    fn fetch_manifest(endpoint: &str) -> Result<PageManifest, String> {
        let resp = reqwest::blocking::get(endpoint).map_err(|e| e.to_string())?;
        if !resp.status().is_success() {
            return Err(format!("manifest request returned {}", resp.status()));
        }
        resp.json::<PageManifest>().map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(ids: &[&str]) -> PageManifest {
        PageManifest {
            pages: ids
                .iter()
                .map(|id| ManifestPage {
                    id: id.to_string(),
                    title: String::new(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_merge_appends_only_unseen_pages() {
        let mut pages = vec![StoryPage::new("cover"), StoryPage::new("page-1")];
        let appended = merge_manifest(&mut pages, &manifest(&["cover", "page-1", "newPage"]));

        assert_eq!(appended, vec!["newPage"]);
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[2].id, "newPage");
        assert!(pages[2].fresh);
        assert!(!pages[0].fresh);
    }

    #[test]
    fn test_merge_ignores_duplicate_manifest_entries() {
        let mut pages = vec![StoryPage::new("cover")];
        let appended = merge_manifest(&mut pages, &manifest(&["newPage", "newPage"]));

        assert_eq!(appended, vec!["newPage"]);
        assert_eq!(pages.len(), 2);
    }

    #[test]
    fn test_merge_preserves_manifest_order() {
        let mut pages = Vec::new();
        let appended = merge_manifest(&mut pages, &manifest(&["cover", "page-1"]));

        assert_eq!(appended, vec!["cover", "page-1"]);
        assert_eq!(collect_page_ids(&pages), vec!["cover", "page-1"]);
    }

    #[test]
    fn test_empty_manifest_is_a_noop() {
        let mut pages = vec![StoryPage::new("cover")];
        let appended = merge_manifest(&mut pages, &manifest(&[]));

        assert!(appended.is_empty());
        assert_eq!(pages.len(), 1);
    }

    #[test]
    fn test_mark_fresh_since_last_sync() {
        let mut pages = vec![
            StoryPage::new("cover"),
            StoryPage::new("page-1"),
            StoryPage::new("late-breaking"),
        ];

        // Previous session never saw "late-breaking"
        let last_known = vec!["cover".to_string(), "page-1".to_string()];
        let marked = mark_fresh_since_last_sync(&mut pages, &last_known);

        assert_eq!(marked, 1);
        assert!(pages[2].fresh);
        assert!(!pages[0].fresh);
    }

    #[test]
    fn test_mark_fresh_noop_without_previous_snapshot() {
        let mut pages = vec![StoryPage::new("cover")];
        assert_eq!(mark_fresh_since_last_sync(&mut pages, &[]), 0);
        assert!(!pages[0].fresh);
    }

    #[test]
    fn test_new_rejects_invalid_endpoint() {
        let story = Story::new(Some("testStory"));
        let manager = Arc::new(LiveStoryManager::new(story.clone()));
        let dir = tempfile::tempdir().unwrap();
        let journal = Arc::new(UpdateJournal::new(dir.path().to_path_buf()));

        let result = StoryPoller::new(
            story,
            manager,
            journal,
            "not a url",
            &Settings::default(),
        );
        assert!(result.is_err());
    }
}
