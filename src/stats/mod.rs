//! Throughput metrics
//!
//! Rolling per-window counters, reported once per elapsed window and
//! reset. Purely observational: nothing here influences control flow.

pub mod window;

pub use window::{MetricsWindow, WindowSnapshot};
