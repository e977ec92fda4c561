//! Observability for mirrors
//!
//! - Structured JSON logging with explicit severities
//! - Typed lifecycle and change events
//! - Per-mirror counters
//!
//! # Usage
//!
//! ```ignore
//! use rtmirror::observability::{log_event, Event};
//!
//! log_event(Event::Live, &[("collection", "notes"), ("records", "3")]);
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity, LOG_LEVEL_ENV};
pub use metrics::{MirrorMetrics, MirrorMetricsSnapshot};

/// Log a typed event at its own severity
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
