// Shared store for story presentation state.
// Managers dispatch typed actions; interested parts of the host subscribe
// and receive the action plus the updated state snapshot.

use std::sync::{Arc, Mutex};
use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub enum StoryAction {
    /// Full ordered republish of every page id. Always the complete list,
    /// never a delta.
    SetPageIds(Vec<String>),
    /// Reader navigated to a page.
    ChangePage { id: String, index: usize },
    TogglePaused(bool),
}

#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct StoryState {
    pub page_ids: Vec<String>,
    pub current_page_id: Option<String>,
    pub current_page_index: usize,
    pub paused: bool,
}

type Listener = Box<dyn Fn(&StoryAction, &StoryState) + Send>;

pub struct StoryStore {
    state: Mutex<StoryState>,
    listeners: Mutex<Vec<Listener>>,
    // Lock-free reader for the hot path (renderers poll this every frame)
    page_ids: ArcSwap<Vec<String>>,
}

/// Pure reducer: applies an action to the state.
fn apply_action(state: &mut StoryState, action: &StoryAction) {
    match action {
        StoryAction::SetPageIds(ids) => {
            state.page_ids = ids.clone();
        }
        StoryAction::ChangePage { id, index } => {
            state.current_page_id = Some(id.clone());
            state.current_page_index = *index;
        }
        StoryAction::TogglePaused(paused) => {
            state.paused = *paused;
        }
    }
}

impl StoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(StoryStore {
            state: Mutex::new(StoryState::default()),
            listeners: Mutex::new(Vec::new()),
            page_ids: ArcSwap::from_pointee(Vec::new()),
        })
    }

    /// Apply the action and notify subscribers in registration order.
    /// Dispatches are serialized by the state lock.
    pub fn dispatch(&self, action: StoryAction) {
        let snapshot = {
            let mut state = self.state.lock().unwrap();
            apply_action(&mut state, &action);
            state.clone()
        };

        self.page_ids.store(Arc::new(snapshot.page_ids.clone()));
        log::debug!("[Store] Dispatched {:?}", action);

        let listeners = self.listeners.lock().unwrap();
        for listener in listeners.iter() {
            listener(&action, &snapshot);
        }
    }

    pub fn subscribe(&self, listener: impl Fn(&StoryAction, &StoryState) + Send + 'static) {
        self.listeners.lock().unwrap().push(Box::new(listener));
    }

    /// Current ordered page ids without taking the state lock.
    pub fn page_ids(&self) -> Arc<Vec<String>> {
        self.page_ids.load_full()
    }

    pub fn state(&self) -> StoryState {
        self.state.lock().unwrap().clone()
    }
}
