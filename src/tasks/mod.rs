//! Tasks Module
//!
//! The task-tracking dashboard: fetch with sample-row fallback, table
//! rendering, and the periodic watch loop.

pub mod tracker;

pub use tracker::{fetch_tasks, render_table, sample_tasks, show_tasks, watch_tasks, TaskFetch};
