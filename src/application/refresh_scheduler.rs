// Refresh scheduler - Timer driven fetch, at most one in flight
use crate::application::dashboard::Dashboard;
use crate::application::measurement_source::FetchError;
use crate::application::sampler::Sampler;
use crate::domain::measurement::FourSeries;
use crate::domain::refresh::{RefreshState, RefreshStatus};
use crate::presentation::chart_surface::ChartSurface;
use crate::presentation::dashboard_view::DashboardView;
use chrono::Utc;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::MissedTickBehavior;

type FetchOutcome = Result<FourSeries, FetchError>;

pub struct RefreshScheduler {
    sampler: Sampler,
    interval: Duration,
    state: RefreshState,
    status: RefreshStatus,
    in_flight: Option<JoinHandle<FetchOutcome>>,
}

/// A worker that panicked or was cancelled counts as a failed fetch
fn worker_failure(e: JoinError) -> FetchError {
    if e.is_panic() {
        tracing::error!("Fetch task panicked");
        FetchError::ConnectionFailure("fetch task panicked".to_string())
    } else {
        FetchError::ConnectionFailure("fetch task was cancelled".to_string())
    }
}

/// Resolves when the in-flight worker finishes; pends forever while idle.
async fn next_completion(in_flight: &mut Option<JoinHandle<FetchOutcome>>) -> FetchOutcome {
    match in_flight {
        Some(handle) => handle.await.unwrap_or_else(|e| Err(worker_failure(e))),
        None => std::future::pending().await,
    }
}

impl RefreshScheduler {
    pub fn new(sampler: Sampler, interval: Duration) -> Self {
        Self {
            sampler,
            interval,
            state: RefreshState::Idle,
            status: RefreshStatus::default(),
            in_flight: None,
        }
    }

    pub fn state(&self) -> RefreshState {
        self.state
    }

    pub fn status(&self) -> &RefreshStatus {
        &self.status
    }

    /// Start a fetch on a worker task unless one is already running.
    /// Returns whether a fetch was started.
    pub fn trigger(&mut self) -> bool {
        if !self.state.on_trigger() {
            tracing::debug!("Refresh already in progress, skipping this tick");
            return false;
        }
        self.status.state = self.state;

        let sampler = self.sampler.clone();
        self.in_flight = Some(tokio::spawn(async move {
            let started = Instant::now();
            let outcome = sampler.fetch().await;
            tracing::debug!(
                "Fetch from {} finished in {}ms",
                sampler.source_name(),
                started.elapsed().as_millis()
            );
            outcome
        }));
        true
    }

    /// Apply a finished fetch on the loop task. Errors leave the charts untouched.
    pub fn complete<S: ChartSurface>(
        &mut self,
        outcome: FetchOutcome,
        dashboard: &mut Dashboard,
        view: &mut DashboardView<S>,
    ) {
        self.state.on_complete();
        self.in_flight = None;

        match outcome {
            Ok(series) => {
                tracing::info!("Refreshed charts with {} points", series.total_points());
                dashboard.apply(series);
                self.status.record_success(Utc::now());
            }
            Err(e) => {
                self.status.record_failure(e.to_string());
                tracing::warn!(
                    "Refresh failed ({} consecutive), keeping previous charts: {}",
                    self.status.consecutive_failures,
                    e
                );
            }
        }

        self.status.state = self.state;
        view.show_status(&self.status);
        if let Err(e) = view.render(dashboard) {
            tracing::error!("Failed to redraw charts: {}", e);
        }
    }

    fn abandon(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            tracing::info!("Abandoning in-flight fetch");
            handle.abort();
        }
        self.state.on_complete();
    }

    /// Event loop: fetch at startup, then every interval, until `shutdown` resolves.
    pub async fn run<S, F>(mut self, dashboard: &mut Dashboard, view: &mut DashboardView<S>, shutdown: F)
    where
        S: ChartSurface,
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        tracing::info!(
            "Refreshing from {} every {}ms",
            self.sampler.source_name(),
            self.interval.as_millis()
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    self.abandon();
                    break;
                }
                _ = ticker.tick() => {
                    self.trigger();
                }
                outcome = next_completion(&mut self.in_flight) => {
                    self.complete(outcome, dashboard, view);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::measurement_source::MeasurementSource;
    use crate::application::sampler::XAxisMode;
    use crate::domain::measurement::{Label, Quantity, SeriesPoint, SourceRow};
    use crate::presentation::dashboard_view::testing::RecordingSurface;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Replies with queued results, then with no rows
    struct ScriptedSource {
        replies: Mutex<VecDeque<Result<Vec<SourceRow>, FetchError>>>,
    }

    impl ScriptedSource {
        fn new(replies: Vec<Result<Vec<SourceRow>, FetchError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
            })
        }
    }

    #[async_trait]
    impl MeasurementSource for ScriptedSource {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn fetch_rows(&self) -> Result<Vec<SourceRow>, FetchError> {
            self.replies.lock().unwrap().pop_front().unwrap_or(Ok(Vec::new()))
        }
    }

    /// Takes `delay` per fetch and tracks how many fetches overlap
    struct SlowSource {
        delay: Duration,
        active: AtomicUsize,
        max_active: AtomicUsize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MeasurementSource for SlowSource {
        fn name(&self) -> &str {
            "slow"
        }

        async fn fetch_rows(&self) -> Result<Vec<SourceRow>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(rows(4, 1.0))
        }
    }

    /// Panics on the first fetch, then serves rows
    struct CrashOnceSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MeasurementSource for CrashOnceSource {
        fn name(&self) -> &str {
            "crash-once"
        }

        async fn fetch_rows(&self) -> Result<Vec<SourceRow>, FetchError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("driver crashed");
            }
            Ok(rows(2, 5.0))
        }
    }

    fn rows(count: usize, base: f64) -> Vec<SourceRow> {
        (0..count)
            .map(|i| {
                let v = base + i as f64;
                SourceRow::new(Label::Number(i as f64), [Some(v), Some(v), Some(v), Some(v)])
            })
            .collect()
    }

    fn expected(count: usize, base: f64) -> Vec<SeriesPoint> {
        (0..count).map(|i| SeriesPoint::new(i as f64, base + i as f64)).collect()
    }

    fn fixture(source: Arc<dyn MeasurementSource>, interval: Duration) -> (RefreshScheduler, Dashboard, DashboardView<RecordingSurface>) {
        let dashboard = Dashboard::from_config(&[]).unwrap();
        let view = DashboardView::setup(RecordingSurface::default(), &dashboard).unwrap();
        let scheduler = RefreshScheduler::new(Sampler::new(source, XAxisMode::Index), interval);
        (scheduler, dashboard, view)
    }

    async fn step(scheduler: &mut RefreshScheduler, dashboard: &mut Dashboard, view: &mut DashboardView<RecordingSurface>) {
        assert!(scheduler.trigger());
        let outcome = next_completion(&mut scheduler.in_flight).await;
        scheduler.complete(outcome, dashboard, view);
    }

    #[tokio::test]
    async fn test_trigger_ignored_while_fetching() {
        let source = ScriptedSource::new(vec![Ok(rows(4, 10.0))]);
        let (mut scheduler, mut dashboard, mut view) = fixture(source, Duration::from_secs(1));

        assert!(scheduler.trigger());
        assert!(!scheduler.trigger());
        assert_eq!(scheduler.state(), RefreshState::Fetching);

        let outcome = next_completion(&mut scheduler.in_flight).await;
        scheduler.complete(outcome, &mut dashboard, &mut view);
        assert_eq!(scheduler.state(), RefreshState::Idle);
        assert_eq!(view.surface().frames.len(), 1);
        assert!(scheduler.in_flight.is_none());
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_charts_unchanged() {
        let source = ScriptedSource::new(vec![
            Ok(rows(4, 10.0)),
            Err(FetchError::SchemaMismatch("missing columns: ic".to_string())),
        ]);
        let (mut scheduler, mut dashboard, mut view) = fixture(source, Duration::from_secs(1));

        step(&mut scheduler, &mut dashboard, &mut view).await;
        let before = dashboard.clone();
        step(&mut scheduler, &mut dashboard, &mut view).await;

        assert_eq!(dashboard, before);
        let frames = &view.surface().frames;
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1], frames[0]);
        assert_eq!(scheduler.status().consecutive_failures, 1);
        assert!(scheduler.status().last_success.is_some());
    }

    #[tokio::test]
    async fn test_empty_result_before_any_success_keeps_charts_empty() {
        let source = ScriptedSource::new(vec![Ok(Vec::new())]);
        let (mut scheduler, mut dashboard, mut view) = fixture(source, Duration::from_secs(1));

        step(&mut scheduler, &mut dashboard, &mut view).await;

        assert!(dashboard.charts().iter().all(|c| c.series().is_empty()));
        assert!(view.surface().frames[0].iter().all(Vec::is_empty));
        let status = view.surface().statuses.last().unwrap();
        assert_eq!(status.last_error.as_deref(), Some("query returned no rows"));
        assert_eq!(status.last_success, None);
        assert_eq!(status.state, RefreshState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_failure_success_scenario() {
        let source = ScriptedSource::new(vec![
            Ok(rows(4, 100.0)),
            Err(FetchError::ConnectionFailure("connection refused".to_string())),
            Ok(rows(3, 200.0)),
        ]);
        let (scheduler, mut dashboard, mut view) = fixture(source, Duration::from_millis(1000));

        scheduler
            .run(&mut dashboard, &mut view, tokio::time::sleep(Duration::from_millis(2500)))
            .await;

        let surface = view.surface();
        assert_eq!(surface.frames.len(), 3);
        assert!(surface.frames[0].iter().all(|s| *s == expected(4, 100.0)));
        assert_eq!(surface.frames[1], surface.frames[0]);
        assert!(surface.frames[2].iter().all(|s| *s == expected(3, 200.0)));

        let failures: Vec<u32> = surface.statuses.iter().map(|s| s.consecutive_failures).collect();
        assert_eq!(failures, vec![0, 1, 0]);

        for quantity in Quantity::ALL {
            assert_eq!(dashboard.chart(quantity).series(), expected(3, 200.0).as_slice());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_two_fetches_in_flight() {
        let source = Arc::new(SlowSource {
            delay: Duration::from_millis(25),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        });
        let (scheduler, mut dashboard, mut view) = fixture(source.clone(), Duration::from_millis(10));

        scheduler
            .run(&mut dashboard, &mut view, tokio::time::sleep(Duration::from_millis(200)))
            .await;

        assert_eq!(source.max_active.load(Ordering::SeqCst), 1);
        assert!(source.calls.load(Ordering::SeqCst) > 1);
        assert!(source.calls.load(Ordering::SeqCst) < 20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_abandons_in_flight_fetch() {
        let source = Arc::new(SlowSource {
            delay: Duration::from_secs(3600 * 24),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        });
        let (scheduler, mut dashboard, mut view) = fixture(source.clone(), Duration::from_secs(60));

        scheduler
            .run(&mut dashboard, &mut view, tokio::time::sleep(Duration::from_millis(50)))
            .await;

        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert!(view.surface().frames.is_empty());
        assert!(view.surface().statuses.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_fetch_is_retried_on_next_tick() {
        let source = Arc::new(CrashOnceSource {
            calls: AtomicUsize::new(0),
        });
        let (scheduler, mut dashboard, mut view) = fixture(source.clone(), Duration::from_millis(1000));

        scheduler
            .run(&mut dashboard, &mut view, tokio::time::sleep(Duration::from_millis(5500)))
            .await;

        assert!(source.calls.load(Ordering::SeqCst) > 1);

        let surface = view.surface();
        let first = &surface.statuses[0];
        assert_eq!(first.consecutive_failures, 1);
        assert_eq!(first.state, RefreshState::Idle);
        assert!(first.last_error.as_deref().unwrap().contains("panicked"));
        assert!(surface.frames[0].iter().all(Vec::is_empty));

        assert_eq!(surface.statuses.last().unwrap().consecutive_failures, 0);
        assert!(surface.frames.last().unwrap().iter().all(|s| *s == expected(2, 5.0)));
    }

    #[tokio::test]
    async fn test_worker_failure_maps_panic_to_connection_failure() {
        let handle: JoinHandle<()> = tokio::spawn(async { panic!("boom") });
        let err = handle.await.unwrap_err();
        assert_eq!(
            worker_failure(err),
            FetchError::ConnectionFailure("fetch task panicked".to_string())
        );
    }
}
