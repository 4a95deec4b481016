// Refresh scheduler - cadence, caching and single-flight discipline
//
// The presentation layer may poll `latest()` and call `refresh()` at will;
// at most one pipeline run is ever in flight. A trigger that arrives while a
// run is executing is coalesced (dropped), not queued. A cycle that aborts
// keeps the previous snapshot and marks it stale with an advisory message.
use crate::application::pipeline::PipelineService;
use crate::domain::snapshot::{Snapshot, SnapshotView};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

/// Releases the single-flight latch on drop, so a panicking run cannot
/// wedge every future refresh.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct CacheState {
    latest: Option<Arc<Snapshot>>,
    stale: bool,
    advisory: Option<String>,
}

pub struct RefreshScheduler {
    pipeline: Arc<PipelineService>,
    /// None disables the timer entirely (manual-only mode).
    interval: Option<Duration>,
    cache: Mutex<CacheState>,
    in_flight: AtomicBool,
    completed_runs: AtomicU64,
    coalesced_ticks: AtomicU64,
}

impl RefreshScheduler {
    pub fn new(pipeline: Arc<PipelineService>, interval: Option<Duration>) -> Self {
        Self {
            pipeline,
            interval,
            cache: Mutex::new(CacheState::default()),
            in_flight: AtomicBool::new(false),
            completed_runs: AtomicU64::new(0),
            coalesced_ticks: AtomicU64::new(0),
        }
    }

    /// Latest completed snapshot, or None before the first successful run.
    pub fn latest(&self) -> Option<SnapshotView> {
        let cache = self.cache.lock().unwrap();
        cache.latest.as_ref().map(|snapshot| SnapshotView {
            snapshot: Arc::clone(snapshot),
            stale: cache.stale,
            advisory: cache.advisory.clone(),
        })
    }

    pub fn completed_runs(&self) -> u64 {
        self.completed_runs.load(Ordering::SeqCst)
    }

    pub fn coalesced_ticks(&self) -> u64 {
        self.coalesced_ticks.load(Ordering::SeqCst)
    }

    /// Trigger one refresh. Returns false when the trigger was coalesced
    /// because a run was already in flight. Timer ticks and manual/forced
    /// refreshes share this entry point.
    pub async fn refresh(&self) -> bool {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            self.coalesced_ticks.fetch_add(1, Ordering::SeqCst);
            tracing::debug!("refresh coalesced, previous run still in flight");
            return false;
        }
        let _in_flight = InFlightGuard(&self.in_flight);

        let result = self.pipeline.run().await;

        {
            let mut cache = self.cache.lock().unwrap();
            match result {
                Ok(snapshot) => {
                    tracing::info!(
                        voltage = snapshot.summary.current_voltage,
                        nearest_risk = snapshot.summary.nearest_failure_probability,
                        peak_risk = snapshot.summary.peak_failure_probability,
                        synthetic = snapshot.forecast.is_synthetic(),
                        low_confidence = snapshot.summary.low_confidence,
                        "refresh complete"
                    );
                    cache.latest = Some(Arc::new(snapshot));
                    cache.stale = false;
                    cache.advisory = None;
                    self.completed_runs.fetch_add(1, Ordering::SeqCst);
                }
                Err(e) => {
                    // Keep the previous result visible, just mark it stale.
                    tracing::warn!(error = %e, "refresh cycle aborted, surfacing last good result");
                    cache.stale = cache.latest.is_some();
                    cache.advisory = Some(e.to_string());
                }
            }
        }

        true
    }

    /// Drive the timer. Runs one immediate refresh, then ticks on the
    /// configured cadence; returns right away in manual-only mode.
    pub async fn run(self: Arc<Self>) {
        self.refresh().await;

        let Some(period) = self.interval else {
            tracing::info!("timer disabled, scheduler in manual-only mode");
            return;
        };

        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await; // first tick completes immediately

        loop {
            ticker.tick().await;
            self.refresh().await;
        }
    }
}
