// =============================================================================
// Refresh Driver — fixed-interval Loader → Render → publish
// =============================================================================
//
// One tick at a time: each refresh is awaited inside the loop, so a slow
// query delays the next tick instead of overlapping it. Ticks that elapse
// while a refresh is running are skipped, not queued.
//
// A failed tick is logged and recorded on the state; whatever was published
// before stays on screen.
// =============================================================================

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::app_state::AppState;
use crate::render::{render, RenderedView};
use crate::store::load_latest;

/// Run the refresh loop until the process exits. The first tick fires
/// immediately.
pub async fn run(state: Arc<AppState>) {
    let period = state.config.refresh_interval();
    info!(
        interval_ms = period.as_millis() as u64,
        db_path = %state.config.db_path.display(),
        "Refresh driver starting"
    );

    drive(period, || {
        let state = state.clone();
        async move {
            if let Err(e) = refresh_once(&state).await {
                warn!(error = %format!("{e:#}"), "Refresh tick failed, keeping previous view");
            }
        }
    })
    .await;
}

/// Fire `tick` every `period`, starting immediately. Each tick is awaited
/// before the next one can start; deadlines missed meanwhile collapse into a
/// single immediate tick and the schedule realigns to the next multiple of
/// `period`.
async fn drive<F, Fut>(period: Duration, mut tick: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        tick().await;
    }
}

/// Execute a single tick against the configured store.
pub async fn refresh_once(state: &Arc<AppState>) -> Result<()> {
    let tick = state.begin_tick();
    let result = match load_and_render(state).await {
        Ok((rows, view)) => {
            state.publish(tick, rows, view);
            debug!(tick, rows, "Refresh published");
            Ok(())
        }
        Err(e) => {
            state.record_failure(tick, format!("{e:#}"));
            Err(e)
        }
    };

    state.end_tick();
    result
}

async fn load_and_render(state: &Arc<AppState>) -> Result<(usize, RenderedView)> {
    let path = state.config.db_path.clone();
    let busy_timeout = state.config.busy_timeout();

    let outcome = tokio::task::spawn_blocking(move || load_latest(&path, busy_timeout))
        .await
        .context("store read task panicked")?
        .context("failed to load aggregates")?;

    Ok((outcome.row_count(), render(&outcome)))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DashboardConfig;
    use crate::render::TableView;
    use crate::store::tests::{init_aggregates_db, insert_bucket, tmp_db_path};
    use crate::types::DriverPhase;

    fn state_for(path: &std::path::Path) -> Arc<AppState> {
        let config = DashboardConfig {
            db_path: path.to_path_buf(),
            busy_timeout_ms: 100,
            ..DashboardConfig::default()
        };
        Arc::new(AppState::new(config))
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_is_immediate_and_missed_ticks_are_skipped() {
        use std::sync::atomic::{AtomicU64, Ordering};
        use tokio::time::{sleep, sleep_until, Instant};

        let start = Instant::now();
        let count = Arc::new(AtomicU64::new(0));
        let ticks = count.clone();

        // First tick takes 12s, spanning the 5s and 10s deadlines.
        tokio::spawn(drive(Duration::from_secs(5), move || {
            let ticks = ticks.clone();
            async move {
                if ticks.fetch_add(1, Ordering::SeqCst) == 0 {
                    sleep(Duration::from_secs(12)).await;
                }
            }
        }));

        sleep(Duration::from_millis(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1, "first tick fires at start");

        // At 12s the missed deadlines fire once, not twice.
        sleep_until(start + Duration::from_secs(13)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);

        // The schedule resumes on the 15s boundary.
        sleep_until(start + Duration::from_millis(14_900)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
        sleep_until(start + Duration::from_millis(15_100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn run_refreshes_on_every_interval() {
        let path = tmp_db_path("refresh_run");
        drop(init_aggregates_db(&path));
        let state = state_for(&path);

        let driver = tokio::spawn(run(state.clone()));
        tokio::time::sleep(Duration::from_millis(1)).await;
        while state.tick_counters().started < 2 {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        driver.abort();

        let counters = state.tick_counters();
        assert!(counters.succeeded >= 1);
        assert_eq!(counters.failed, 0);

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn empty_store_publishes_idle_view() {
        let path = tmp_db_path("refresh_empty");
        drop(init_aggregates_db(&path));
        let state = state_for(&path);

        refresh_once(&state).await.unwrap();

        let snap = state.build_snapshot();
        assert_eq!(snap.view, RenderedView::idle());
        assert_eq!(snap.published_tick, Some(1));
        assert_eq!(snap.phase, DriverPhase::IdleWaiting);

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn rows_are_published() {
        let path = tmp_db_path("refresh_rows");
        {
            let conn = init_aggregates_db(&path);
            insert_bucket(&conn, "2024-03-01 10:00:00", 10.0, 5.0);
            insert_bucket(&conn, "2024-03-01 10:01:00", 3.0, 0.0);
        }
        let state = state_for(&path);

        refresh_once(&state).await.unwrap();

        let snap = state.build_snapshot();
        assert_eq!(snap.rows, 2);
        assert_eq!(snap.view.bar_chart.data.len(), 2);
        assert!(matches!(snap.view.table, TableView::Markup { .. }));

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn missing_store_fails_tick_and_keeps_prior_view() {
        let path = tmp_db_path("refresh_vanish");
        {
            let conn = init_aggregates_db(&path);
            insert_bucket(&conn, "2024-03-01 10:00:00", 1.0, 1.0);
        }
        let state = state_for(&path);
        refresh_once(&state).await.unwrap();
        let before = state.build_snapshot().view;

        std::fs::remove_file(&path).unwrap();
        assert!(refresh_once(&state).await.is_err());

        let snap = state.build_snapshot();
        assert_eq!(snap.view, before);
        assert_eq!(snap.published_tick, Some(1));
        assert!(snap.stale);
        assert_eq!(snap.ticks.started, 2);
        assert_eq!(snap.ticks.failed, 1);
        assert_eq!(snap.phase, DriverPhase::IdleWaiting);
        assert!(snap.last_error.unwrap().message.contains("failed to load aggregates"));
    }

    #[tokio::test]
    async fn missing_store_before_first_success_serves_idle_view() {
        let state = state_for(&tmp_db_path("refresh_never"));

        assert!(refresh_once(&state).await.is_err());

        let snap = state.build_snapshot();
        assert_eq!(snap.view, RenderedView::idle());
        assert!(snap.published_tick.is_none());
        assert!(!snap.stale);
        assert!(snap.last_error.is_some());
    }
}
