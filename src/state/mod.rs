//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `PageState`: the per-page crawl state machine (queued, fetching, extracting,
//!   enriching, stored, failed)

mod page_state;

pub use page_state::PageState;
