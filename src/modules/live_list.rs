// Live list construction and refresh.
// The list id is derived from the story id; the item set is rebuilt from
// the current pages on every synchronization.

use crate::state::{LiveList, LiveListItem, StoryPage, FRESH_ITEM_CLASS};

const LIST_ID_PREFIX: &str = "i-amphtml-";
const LIST_ID_SUFFIX: &str = "-dynamic-list";

/// Deterministic list id: prefix + story id + suffix.
pub fn dynamic_list_id(story_id: &str) -> String {
    format!("{}{}{}", LIST_ID_PREFIX, story_id, LIST_ID_SUFFIX)
}

pub fn create_live_list(story_id: &str) -> LiveList {
    LiveList {
        id: dynamic_list_id(story_id),
        items: Vec::new(),
    }
}

/// Rebuild the rendered item set from the current pages, in page order.
/// Fresh pages carry the marker class hosts style new entries with.
pub fn refresh_items(list: &mut LiveList, pages: &[StoryPage]) {
    list.items = pages
        .iter()
        .map(|page| LiveListItem {
            page_id: page.id.clone(),
            classes: if page.fresh {
                vec![FRESH_ITEM_CLASS.to_string()]
            } else {
                Vec::new()
            },
            inserted_at: page.added_at,
        })
        .collect();
}
