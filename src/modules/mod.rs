// Module exports for pure logic
pub mod live_list;       // Live list building/refresh
pub mod live_story;      // Page-list synchronization manager
pub mod poller;          // Manifest polling
pub mod request_bank;    // Recording server for beacon tests
pub mod viewability;     // View/activeview progression
