// Live story synchronization - pure logic + manager wrapper.
// The manager never keeps incremental state: every update() rescans the
// story's current pages and republishes the full ordered id list.

use std::sync::Arc;

use crate::state::{Story, StoryPage};
use crate::store::StoryAction;
use super::live_list;

pub const MISSING_ID_ERROR: &str =
    "story must contain id to use the live story functionality";

/// Collect the ordered page-id sequence from the current page set.
pub fn collect_page_ids(pages: &[StoryPage]) -> Vec<String> {
    pages.iter().map(|p| p.id.clone()).collect()
}

pub struct LiveStoryManager {
    story: Arc<Story>,
}

impl LiveStoryManager {
    /// Construction does not touch the story; all mutation happens in
    /// build() and update().
    pub fn new(story: Arc<Story>) -> Self {
        LiveStoryManager { story }
    }

    /// Create the live list and perform the first synchronization.
    /// Meant to be called once per story.
    pub fn build(&self) -> Result<(), String> {
        let story_id = match self.story.id() {
            Some(id) if !id.is_empty() => id,
            _ => return Err(MISSING_ID_ERROR.to_string()),
        };

        let list = live_list::create_live_list(&story_id);
        log::info!("[LiveStory] Built live list '{}'", list.id);
        {
            let mut slot = self.story.live_list.lock().unwrap();
            *slot = Some(list);
        }

        // First synchronization with whatever pages are already present
        self.update();
        Ok(())
    }

    /// Rescan the pages, refresh the live list and publish the complete
    /// ordered id list through the store. Safe to call repeatedly.
    pub fn update(&self) {
        let pages = self.story.pages.lock().unwrap().clone();
        let ids = collect_page_ids(&pages);

        {
            let mut slot = self.story.live_list.lock().unwrap();
            if let Some(list) = slot.as_mut() {
                live_list::refresh_items(list, &pages);
            }
        }

        log::info!("[LiveStory] Publishing {} page id(s)", ids.len());
        self.story.store.dispatch(StoryAction::SetPageIds(ids));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use crate::state::FRESH_ITEM_CLASS;
    use crate::store::StoryState;

    fn create_test_story(ids: &[&str]) -> Arc<Story> {
        let story = Story::new(Some("testStory"));
        for id in ids {
            story.append_page(StoryPage::new(id));
        }
        story
    }

    /// Collects every SetPageIds payload the store publishes.
    fn record_page_id_dispatches(story: &Story) -> Arc<Mutex<Vec<Vec<String>>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        story
            .store
            .subscribe(move |action: &StoryAction, _state: &StoryState| {
                if let StoryAction::SetPageIds(ids) = action {
                    seen_clone.lock().unwrap().push(ids.clone());
                }
            });
        seen
    }

    #[test]
    fn test_builds_a_dynamic_live_list() {
        let story = create_test_story(&["cover", "page-1"]);
        let manager = LiveStoryManager::new(story.clone());
        manager.build().unwrap();

        assert!(story.live_list().is_some());
    }

    #[test]
    fn test_live_list_id_equals_story_id_dynamic_list_combo() {
        let story = create_test_story(&["cover", "page-1"]);
        let manager = LiveStoryManager::new(story.clone());
        manager.build().unwrap();

        let list = story.live_list().unwrap();
        assert_eq!(list.id, "i-amphtml-testStory-dynamic-list");
    }

    #[test]
    fn test_build_fails_without_story_id() {
        let story = create_test_story(&["cover", "page-1"]);
        story.clear_id();

        let manager = LiveStoryManager::new(story.clone());
        let err = manager.build().unwrap_err();
        assert!(err.contains("must contain id to use the live story functionality"));
        assert!(story.live_list().is_none());
    }

    #[test]
    fn test_build_fails_on_empty_story_id() {
        let story = create_test_story(&["cover"]);
        story.set_id("");

        let manager = LiveStoryManager::new(story);
        assert!(manager.build().is_err());
    }

    #[test]
    fn test_update_appends_new_page_from_server() {
        let story = create_test_story(&["cover", "page-1"]);
        assert_eq!(story.page_count(), 2);

        let manager = LiveStoryManager::new(story.clone());
        manager.build().unwrap();

        let dispatches = record_page_id_dispatches(&story);

        // This is what the poller does when the server publishes a page.
        story.append_page(StoryPage::fresh("newPage", ""));
        manager.update();

        let dispatches = dispatches.lock().unwrap();
        assert_eq!(dispatches.len(), 1);
        assert_eq!(dispatches[0], vec!["cover", "page-1", "newPage"]);

        // The fresh page is rendered with the marker class
        let list = story.live_list().unwrap();
        assert_eq!(list.items[2].classes, vec![FRESH_ITEM_CLASS.to_string()]);
    }

    #[test]
    fn test_update_is_idempotent_without_changes() {
        let story = create_test_story(&["cover", "page-1"]);
        let manager = LiveStoryManager::new(story.clone());
        manager.build().unwrap();

        let dispatches = record_page_id_dispatches(&story);
        manager.update();
        manager.update();

        let dispatches = dispatches.lock().unwrap();
        assert_eq!(dispatches.len(), 2);
        assert_eq!(dispatches[0], dispatches[1]);
        assert_eq!(dispatches[0], vec!["cover", "page-1"]);
    }

    #[test]
    fn test_update_reflects_reordering() {
        let story = create_test_story(&["cover", "page-1", "page-2"]);
        let manager = LiveStoryManager::new(story.clone());
        manager.build().unwrap();

        story.pages.lock().unwrap().swap(1, 2);

        let dispatches = record_page_id_dispatches(&story);
        manager.update();

        let dispatches = dispatches.lock().unwrap();
        assert_eq!(dispatches[0], vec!["cover", "page-2", "page-1"]);
    }

    #[test]
    fn test_build_with_no_pages_publishes_empty_list() {
        let story = create_test_story(&[]);
        let dispatches = record_page_id_dispatches(&story);

        let manager = LiveStoryManager::new(story.clone());
        manager.build().unwrap();

        let dispatches = dispatches.lock().unwrap();
        assert_eq!(dispatches.len(), 1);
        assert!(dispatches[0].is_empty());

        let list = story.live_list().unwrap();
        assert!(list.items.is_empty());
    }

    #[test]
    fn test_collect_page_ids_order() {
        let pages = vec![
            StoryPage::new("cover"),
            StoryPage::new("page-1"),
        ];
        assert_eq!(collect_page_ids(&pages), vec!["cover", "page-1"]);
        assert!(collect_page_ids(&[]).is_empty());
    }
}
