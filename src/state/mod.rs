//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `DownloadState`: Tracks the lifecycle of one media download
//! - `EmptyStreak`: Per-worker run of consecutive empty pages, used to stop a worker

mod download_state;
mod empty_streak;

// Re-export main types
pub use download_state::DownloadState;
pub use empty_streak::EmptyStreak;
