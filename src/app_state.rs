// =============================================================================
// Central Application State — aggregate dashboard
// =============================================================================
//
// Constructed once in `main` and shared as `Arc<AppState>` between the refresh
// driver, the REST handlers and every WebSocket session. Nothing here is a
// process global.
//
// Thread safety:
//   - Atomic counters for the state version and tick bookkeeping.
//   - parking_lot::RwLock for the published view and the error log.
//
// The published view is only ever replaced wholesale by a successful tick. A
// failed tick records an error and leaves the previous view on screen.
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;

use crate::config::DashboardConfig;
use crate::render::RenderedView;
use crate::types::DriverPhase;

/// Maximum number of recent errors to retain.
const MAX_RECENT_ERRORS: usize = 50;

// =============================================================================
// Records
// =============================================================================

/// A recorded refresh failure for the dashboard error log.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    /// Human-readable error message.
    pub message: String,
    /// Tick on which the failure happened.
    pub tick: u64,
    /// ISO 8601 timestamp.
    pub at: String,
}

/// The last successfully rendered view and where it came from.
#[derive(Debug, Clone, Serialize)]
pub struct PublishedView {
    pub tick: u64,
    pub rows: usize,
    pub published_at: String,
    pub view: RenderedView,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct TickCounters {
    pub started: u64,
    pub succeeded: u64,
    pub failed: u64,
}

// =============================================================================
// AppState
// =============================================================================

pub struct AppState {
    // ── Version tracking ────────────────────────────────────────────────
    /// Incremented on every publish or recorded failure. WebSocket sessions
    /// push a fresh snapshot whenever this moves.
    pub state_version: AtomicU64,

    /// Open WebSocket sessions.
    pub ws_clients: AtomicU64,

    // ── Configuration ───────────────────────────────────────────────────
    pub config: DashboardConfig,

    // ── Refresh driver ──────────────────────────────────────────────────
    pub phase: RwLock<DriverPhase>,
    ticks_started: AtomicU64,
    ticks_succeeded: AtomicU64,
    ticks_failed: AtomicU64,

    // ── Output ──────────────────────────────────────────────────────────
    pub published: RwLock<Option<PublishedView>>,

    // ── Error Log ───────────────────────────────────────────────────────
    /// Set by a failed tick, cleared by the next successful one.
    pub last_error: RwLock<Option<ErrorRecord>>,
    pub recent_errors: RwLock<Vec<ErrorRecord>>,

    // ── Timing ──────────────────────────────────────────────────────────
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            state_version: AtomicU64::new(1),
            ws_clients: AtomicU64::new(0),

            config,

            phase: RwLock::new(DriverPhase::IdleWaiting),
            ticks_started: AtomicU64::new(0),
            ticks_succeeded: AtomicU64::new(0),
            ticks_failed: AtomicU64::new(0),

            published: RwLock::new(None),

            last_error: RwLock::new(None),
            recent_errors: RwLock::new(Vec::new()),

            start_time: std::time::Instant::now(),
        }
    }

    // ── Version Management ──────────────────────────────────────────────

    /// Atomically increment the state version and return the previous value.
    pub fn increment_version(&self) -> u64 {
        self.state_version.fetch_add(1, Ordering::SeqCst)
    }

    pub fn current_state_version(&self) -> u64 {
        self.state_version.load(Ordering::SeqCst)
    }

    // ── Tick lifecycle ──────────────────────────────────────────────────

    /// Enter `Refreshing` and return the 1-based number of this tick.
    pub fn begin_tick(&self) -> u64 {
        *self.phase.write() = DriverPhase::Refreshing;
        self.ticks_started.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Return to `IdleWaiting` after a tick, whatever its result.
    pub fn end_tick(&self) {
        *self.phase.write() = DriverPhase::IdleWaiting;
    }

    pub fn current_phase(&self) -> DriverPhase {
        *self.phase.read()
    }

    /// Replace the published view with the output of a successful tick.
    pub fn publish(&self, tick: u64, rows: usize, view: RenderedView) {
        *self.published.write() = Some(PublishedView {
            tick,
            rows,
            published_at: Utc::now().to_rfc3339(),
            view,
        });
        *self.last_error.write() = None;
        self.ticks_succeeded.fetch_add(1, Ordering::SeqCst);
        self.increment_version();
    }

    /// Record a failed tick. The published view is left untouched.
    pub fn record_failure(&self, tick: u64, msg: String) {
        let record = ErrorRecord {
            message: msg,
            tick,
            at: Utc::now().to_rfc3339(),
        };

        *self.last_error.write() = Some(record.clone());

        let mut errors = self.recent_errors.write();
        errors.push(record);
        while errors.len() > MAX_RECENT_ERRORS {
            errors.remove(0);
        }
        drop(errors);

        self.ticks_failed.fetch_add(1, Ordering::SeqCst);
        self.increment_version();
    }

    pub fn tick_counters(&self) -> TickCounters {
        TickCounters {
            started: self.ticks_started.load(Ordering::SeqCst),
            succeeded: self.ticks_succeeded.load(Ordering::SeqCst),
            failed: self.ticks_failed.load(Ordering::SeqCst),
        }
    }

    // ── Snapshot Builder ────────────────────────────────────────────────

    /// Build the payload served by `GET /api/v1/dashboard` and the WebSocket
    /// push feed. Before the first successful tick the view is the idle
    /// placeholder set.
    pub fn build_snapshot(&self) -> DashboardSnapshot {
        // Version first: a publish landing mid-build then reads as newer than
        // this snapshot and is pushed again, never marked as already sent.
        let state_version = self.current_state_version();
        let published = self.published.read().clone();
        let last_error = self.last_error.read().clone();

        let (published_tick, published_at, rows, view) = match published {
            Some(p) => (Some(p.tick), Some(p.published_at), p.rows, p.view),
            None => (None, None, 0, RenderedView::idle()),
        };

        DashboardSnapshot {
            state_version,
            server_time: Utc::now().timestamp_millis(),
            uptime_secs: self.start_time.elapsed().as_secs(),
            title: self.config.title.clone(),
            refresh_interval_ms: self.config.refresh_interval_ms,
            phase: self.current_phase(),
            ticks: self.tick_counters(),
            ws_clients: self.ws_clients.load(Ordering::SeqCst),
            stale: last_error.is_some() && published_tick.is_some(),
            last_error,
            published_tick,
            published_at,
            rows,
            view,
        }
    }
}

// =============================================================================
// Snapshot
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub state_version: u64,
    pub server_time: i64,
    pub uptime_secs: u64,
    pub title: String,
    pub refresh_interval_ms: u64,
    pub phase: DriverPhase,
    pub ticks: TickCounters,
    pub ws_clients: u64,
    /// True when the view on screen predates a failed tick.
    pub stale: bool,
    pub last_error: Option<ErrorRecord>,
    pub published_tick: Option<u64>,
    pub published_at: Option<String>,
    pub rows: usize,
    pub view: RenderedView,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{Figure, TableView};

    fn marked_view(marker: &str) -> RenderedView {
        RenderedView {
            bar_chart: Figure::empty(),
            ratio_chart: Figure::empty(),
            table: TableView::Markup {
                html: marker.to_string(),
            },
        }
    }

    #[test]
    fn fresh_state_serves_idle_view() {
        let state = AppState::new(DashboardConfig::default());
        let snap = state.build_snapshot();
        assert_eq!(snap.view, RenderedView::idle());
        assert_eq!(snap.phase, DriverPhase::IdleWaiting);
        assert!(snap.published_tick.is_none());
        assert!(!snap.stale);
    }

    #[test]
    fn tick_lifecycle_moves_phase() {
        let state = AppState::new(DashboardConfig::default());
        assert_eq!(state.begin_tick(), 1);
        assert_eq!(state.current_phase(), DriverPhase::Refreshing);
        state.end_tick();
        assert_eq!(state.current_phase(), DriverPhase::IdleWaiting);
        assert_eq!(state.begin_tick(), 2);
    }

    #[test]
    fn failure_keeps_previous_view_and_marks_stale() {
        let state = AppState::new(DashboardConfig::default());
        state.publish(1, 2, marked_view("first"));
        let v1 = state.current_state_version();

        state.record_failure(2, "store unreachable".into());

        let snap = state.build_snapshot();
        assert!(snap.state_version > v1);
        assert_eq!(snap.view, marked_view("first"));
        assert_eq!(snap.published_tick, Some(1));
        assert!(snap.stale);
        assert_eq!(snap.last_error.unwrap().message, "store unreachable");
        assert_eq!(snap.ticks.failed, 1);
        assert_eq!(snap.ticks.succeeded, 1);
    }

    #[test]
    fn success_clears_last_error_but_keeps_log() {
        let state = AppState::new(DashboardConfig::default());
        state.record_failure(1, "boom".into());
        state.publish(2, 0, RenderedView::idle());

        let snap = state.build_snapshot();
        assert!(snap.last_error.is_none());
        assert!(!snap.stale);
        assert_eq!(state.recent_errors.read().len(), 1);
    }

    #[test]
    fn error_log_is_bounded() {
        let state = AppState::new(DashboardConfig::default());
        for i in 0..(MAX_RECENT_ERRORS as u64 + 10) {
            state.record_failure(i, format!("err {i}"));
        }
        let errors = state.recent_errors.read();
        assert_eq!(errors.len(), MAX_RECENT_ERRORS);
        assert_eq!(errors[0].message, "err 10");
    }
}
