//! Connection-state tracking.
//!
//! [`ConnTracker`] maintains a concurrent registry of live connections keyed
//! by an opaque [`ConnId`], updated synchronously from the server's
//! connection-state callback. Live states (New/Active/Idle) are stored or
//! overwritten; terminal states (Hijacked/Closed) drop the entry. Every
//! event increments its per-state counter, and the registry feeds the
//! periodic gauge reporter.
//!
//! Counter and gauge emission share one mutex so a report's gauge triplet
//! never interleaves with an event's counter call. Registry access itself
//! needs no external lock; the DashMap handles concurrent reads and writes.

use crate::config::ConnStateConfig;
use crate::sink::MetricsSink;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Opaque handle identifying one live connection.
///
/// The host assigns an id per accepted connection and passes it with every
/// state transition. The tracker never inspects it; it is a map key only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnId(pub u64);

impl From<u64> for ConnId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Lifecycle states a connection moves through.
///
/// New, Active, and Idle are live states retained in the registry; Hijacked
/// and Closed are terminal and remove the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnState {
    New,
    Active,
    Idle,
    Hijacked,
    Closed,
}

impl ConnState {
    /// Whether this state keeps the connection in the registry.
    pub fn is_live(self) -> bool {
        matches!(self, Self::New | Self::Active | Self::Idle)
    }
}

/// Counts of live connections observed during one registry scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LiveTally {
    pub new: u64,
    pub active: u64,
    pub idle: u64,
}

/// Tracks the lifecycle state of every live connection and emits metrics.
///
/// Constructed via [`ConnTracker::new`] with an empty registry and an
/// unstarted reporter; see [`spawn_reporter`](ConnTracker::spawn_reporter).
pub struct ConnTracker {
    pub(crate) sink: Arc<dyn MetricsSink>,
    pub(crate) tracking: DashMap<ConnId, ConnState>,
    pub(crate) config: ConnStateConfig,
    pub(crate) interval: Duration,
    /// Serializes metric emission between `handle_event` and `report`.
    pub(crate) emit_lock: Mutex<()>,
    pub(crate) shutdown: CancellationToken,
}

impl ConnTracker {
    /// Build a tracker bound to a metrics sink.
    pub fn new(config: ConnStateConfig, sink: Arc<dyn MetricsSink>) -> Arc<Self> {
        let interval = config.report_interval();
        Arc::new(Self {
            sink,
            tracking: DashMap::new(),
            config,
            interval,
            emit_lock: Mutex::new(()),
            shutdown: CancellationToken::new(),
        })
    }

    /// Record one state transition for `id`.
    ///
    /// Live states store or overwrite the registry entry; terminal states
    /// remove it (a no-op if the id was never stored). Every event bumps the
    /// matching counter, duplicates included. Never fails: sink trouble is
    /// the sink's problem, not the server's.
    pub fn handle_event(&self, id: ConnId, state: ConnState) {
        let _guard = self.emit_lock.lock();
        trace!(conn = id.0, state = ?state, "Connection state transition");
        match state {
            ConnState::New => {
                self.sink.count(&self.config.new_counter, 1.0);
                self.tracking.insert(id, state);
            }
            ConnState::Active => {
                self.sink.count(&self.config.active_counter, 1.0);
                self.tracking.insert(id, state);
            }
            ConnState::Idle => {
                self.sink.count(&self.config.idle_counter, 1.0);
                self.tracking.insert(id, state);
            }
            ConnState::Hijacked => {
                self.sink.count(&self.config.hijacked_counter, 1.0);
                self.tracking.remove(&id);
            }
            ConnState::Closed => {
                self.sink.count(&self.config.closed_counter, 1.0);
                self.tracking.remove(&id);
            }
        }
    }

    /// Scan the registry and count live connections per state.
    ///
    /// A best-effort snapshot: entries inserted or removed mid-scan may or
    /// may not be counted.
    pub fn tally(&self) -> LiveTally {
        let mut tally = LiveTally::default();
        for entry in self.tracking.iter() {
            match entry.value() {
                ConnState::New => tally.new += 1,
                ConnState::Active => tally.active += 1,
                ConnState::Idle => tally.idle += 1,
                // Terminal states are removed on arrival and never stored.
                ConnState::Hijacked | ConnState::Closed => {}
            }
        }
        tally
    }

    /// Number of connections currently tracked.
    pub fn len(&self) -> usize {
        self.tracking.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracking.is_empty()
    }

    /// Last stored state for `id`, if it is live.
    pub fn state_of(&self, id: ConnId) -> Option<ConnState> {
        self.tracking.get(&id).map(|entry| *entry.value())
    }
}
