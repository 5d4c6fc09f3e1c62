// Shared state structs to avoid circular dependencies.
// These are used by the manager modules and can be tested independently.

use std::sync::{Arc, Mutex};
use serde::{Deserialize, Serialize};

use crate::signals::Signals;
use crate::store::StoryStore;

/// Class the live list applies to items rendered for freshly published
/// pages. Hosts key their highlight styling on it.
pub const FRESH_ITEM_CLASS: &str = "live-list-item-new";

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct StoryPage {
    pub id: String,
    pub title: String,
    // Set for pages inserted after the initial synchronization began
    pub fresh: bool,
    pub added_at: i64, // Unix timestamp in seconds
}

impl StoryPage {
    pub fn new(id: &str) -> Self {
        StoryPage {
            id: id.to_string(),
            title: String::new(),
            fresh: false,
            added_at: chrono::Utc::now().timestamp(),
        }
    }

    /// A page that arrived after the story was already being read.
    pub fn fresh(id: &str, title: &str) -> Self {
        StoryPage {
            id: id.to_string(),
            title: title.to_string(),
            fresh: true,
            added_at: chrono::Utc::now().timestamp(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct LiveListItem {
    pub page_id: String,
    pub classes: Vec<String>,
    pub inserted_at: i64,
}

/// Derived renderable list mirroring the current page set.
/// Created once when the live story is built; no independent lifecycle.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct LiveList {
    pub id: String,
    pub items: Vec<LiveListItem>,
}

/// The story container: an ordered set of pages plus the shared handles
/// every manager needs (store, lifecycle signals).
pub struct Story {
    pub id: Mutex<Option<String>>,
    pub pages: Mutex<Vec<StoryPage>>,
    pub live_list: Mutex<Option<LiveList>>,
    pub signals: Signals,
    pub store: Arc<StoryStore>,
}

impl Story {
    pub fn new(id: Option<&str>) -> Arc<Self> {
        Arc::new(Story {
            id: Mutex::new(id.map(|s| s.to_string())),
            pages: Mutex::new(Vec::new()),
            live_list: Mutex::new(None),
            signals: Signals::new(),
            store: StoryStore::new(),
        })
    }

    pub fn id(&self) -> Option<String> {
        self.id.lock().unwrap().clone()
    }

    pub fn set_id(&self, id: &str) {
        *self.id.lock().unwrap() = Some(id.to_string());
    }

    pub fn clear_id(&self) {
        *self.id.lock().unwrap() = None;
    }

    /// Append a page at the end of the story (document order).
    pub fn append_page(&self, page: StoryPage) {
        self.pages.lock().unwrap().push(page);
    }

    pub fn page_count(&self) -> usize {
        self.pages.lock().unwrap().len()
    }

    /// Snapshot of the attached live list, if the story has been built.
    pub fn live_list(&self) -> Option<LiveList> {
        self.live_list.lock().unwrap().clone()
    }
}
