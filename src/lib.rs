//! connstate - connection lifecycle metrics for network servers.
//!
//! Plugs into a server's connection-state callback and tracks how many
//! connections are currently in each lifecycle state. Per-event counters fire
//! on every transition, and a background reporter publishes gauges of the
//! live New/Active/Idle population on a fixed interval.
//!
//! The tracker is a passive observer: it never touches the connections
//! themselves, only an identity-to-state registry it fully owns. Metrics
//! leave through the [`MetricsSink`] trait, so any backend (Prometheus,
//! statsd, a test recorder) can sit behind it.
//!
//! ```no_run
//! use connstate::{ConnId, ConnState, ConnStateConfig, ConnTracker, NoopSink};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let tracker = ConnTracker::new(ConnStateConfig::default(), Arc::new(NoopSink));
//! let reporter = tracker.spawn_reporter();
//!
//! // Invoked by the server on every transition.
//! tracker.handle_event(ConnId(1), ConnState::New);
//! tracker.handle_event(ConnId(1), ConnState::Active);
//! tracker.handle_event(ConnId(1), ConnState::Closed);
//!
//! tracker.stop();
//! # let _ = reporter.await;
//! # }
//! ```

pub mod config;
mod reporter;
pub mod sink;
pub mod tracker;

pub use config::{Config, ConfigError, ConnStateConfig};
pub use sink::{MetricsSink, NoopSink, PrometheusSink};
pub use tracker::{ConnId, ConnState, ConnTracker, LiveTally};
