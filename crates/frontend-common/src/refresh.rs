//! Periodic background refresh
//!
//! A [`PeriodicRefresher`] wraps one fetch operation. Runs never overlap:
//! a tick or manual trigger that arrives while a fetch is in progress is
//! skipped, not queued. The schedule stops when its [`RefreshHandle`] is
//! stopped or dropped; a fetch already in progress is allowed to finish.

use futures::future::{BoxFuture, FutureExt};
use phulong_core::{CoreError, CoreResult};
use phulong_http::ClientError;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

type FetchFn = dyn Fn() -> BoxFuture<'static, Result<(), ClientError>> + Send + Sync;

/// Result of one refresh attempt
#[derive(Debug)]
pub enum RunOutcome {
    Refreshed,
    Failed(ClientError),
    /// A previous run was still in progress; nothing was fetched
    StillRefreshing,
}

/// Observable refresh progress
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshStatus {
    pub busy: bool,
    pub last_run_at: Option<Instant>,
    /// Message of the last failed run, cleared by the next success
    pub last_error: Option<String>,
    pub completed_runs: u64,
    pub skipped_runs: u64,
}

#[derive(Clone)]
pub struct PeriodicRefresher {
    inner: Arc<Inner>,
}

struct Inner {
    fetch: Box<FetchFn>,
    busy: AtomicBool,
    status: watch::Sender<RefreshStatus>,
}

/// Resets the busy flag even if the fetch future is dropped midway
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl PeriodicRefresher {
    pub fn new<F, Fut>(fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ClientError>> + Send + 'static,
    {
        let (status, _) = watch::channel(RefreshStatus::default());
        Self {
            inner: Arc::new(Inner {
                fetch: Box::new(move || fetch().boxed()),
                busy: AtomicBool::new(false),
                status,
            }),
        }
    }

    /// Run the fetch every `interval`, starting one interval from now
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if `interval` is zero
    pub fn start(&self, interval: Duration) -> CoreResult<RefreshHandle> {
        if interval.is_zero() {
            return Err(CoreError::invalid_config("refresh interval must be non-zero"));
        }
        let cancel = CancellationToken::new();
        let inner = Arc::clone(&self.inner);
        let token = cancel.clone();
        let task = tokio::spawn(async move { inner.run_schedule(interval, token).await });
        debug!(?interval, "Refresh schedule started");

        Ok(RefreshHandle {
            cancel,
            task: Some(task),
        })
    }

    /// Run the fetch immediately unless a run is already in progress
    pub async fn run_now(&self) -> RunOutcome {
        self.inner.run_once().await
    }

    pub fn is_busy(&self) -> bool {
        self.inner.busy.load(Ordering::Acquire)
    }

    pub fn status(&self) -> RefreshStatus {
        self.inner.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RefreshStatus> {
        self.inner.status.subscribe()
    }
}

impl Inner {
    async fn run_schedule(self: Arc<Self>, period: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut in_flight: Option<JoinHandle<()>> = None;

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!("Refresh schedule stopped");
                    break;
                }
                _ = ticker.tick() => {
                    if self.busy.load(Ordering::Acquire) {
                        self.status.send_modify(|status| status.skipped_runs += 1);
                        debug!("Previous refresh still running, skipping tick");
                        continue;
                    }
                    let inner = Arc::clone(&self);
                    in_flight = Some(tokio::spawn(async move {
                        match inner.run_once().await {
                            RunOutcome::Refreshed | RunOutcome::StillRefreshing => {}
                            RunOutcome::Failed(e) => warn!("Scheduled refresh failed: {e}"),
                        }
                    }));
                }
            }
        }

        if let Some(run) = in_flight {
            if let Err(e) = run.await {
                warn!("Refresh run ended abnormally: {e}");
            }
        }
    }

    async fn run_once(&self) -> RunOutcome {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.status.send_modify(|status| status.skipped_runs += 1);
            return RunOutcome::StillRefreshing;
        }
        let _busy = BusyGuard(&self.busy);
        self.status.send_modify(|status| status.busy = true);

        let result = (self.fetch)().await;

        self.status.send_modify(|status| {
            status.busy = false;
            status.completed_runs += 1;
            status.last_run_at = Some(Instant::now());
            status.last_error = result.as_ref().err().map(ToString::to_string);
        });

        match result {
            Ok(()) => RunOutcome::Refreshed,
            Err(e) => RunOutcome::Failed(e),
        }
    }
}

/// Owner of a running schedule; dropping it stops the schedule
#[derive(Debug)]
pub struct RefreshHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl RefreshHandle {
    /// Stop scheduling further runs
    pub fn stop(self) {
        self.cancel.cancel();
    }

    /// Stop and wait until the schedule, including any in-progress run, has exited
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Refresh task ended abnormally: {e}");
            }
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// A refresher bound to an interval that can be switched on and off
pub struct RefreshSchedule {
    refresher: PeriodicRefresher,
    interval: Duration,
    handle: Option<RefreshHandle>,
}

impl RefreshSchedule {
    /// Create a disabled schedule
    pub fn new(refresher: PeriodicRefresher, interval: Duration) -> Self {
        Self {
            refresher,
            interval,
            handle: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.handle.is_some()
    }

    /// # Errors
    ///
    /// Returns an error if enabling with a zero interval; the schedule stays disabled
    pub fn set_enabled(&mut self, enabled: bool) -> CoreResult<()> {
        match (enabled, self.handle.is_some()) {
            (true, false) => self.handle = Some(self.refresher.start(self.interval)?),
            (false, true) => {
                if let Some(handle) = self.handle.take() {
                    handle.stop();
                }
            }
            _ => {}
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Change the interval, restarting the schedule if it is enabled
    ///
    /// # Errors
    ///
    /// Returns an error if `interval` is zero; the current schedule is kept
    pub fn set_interval(&mut self, interval: Duration) -> CoreResult<()> {
        if interval.is_zero() {
            return Err(CoreError::invalid_config("refresh interval must be non-zero"));
        }
        self.interval = interval;
        if self.handle.take().is_some() {
            self.handle = Some(self.refresher.start(interval)?);
        }
        Ok(())
    }

    pub fn last_run_at(&self) -> Option<Instant> {
        self.refresher.status().last_run_at
    }

    pub fn refresher(&self) -> &PeriodicRefresher {
        &self.refresher
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phulong_http::StatusCode;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    const PERIOD: Duration = Duration::from_secs(300);

    fn counting(delay: Duration) -> (PeriodicRefresher, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let refresher = PeriodicRefresher::new(move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(delay).await;
                Ok(())
            }
        });
        (refresher, calls)
    }

    #[derive(Default)]
    struct Tracker {
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    fn tracking(delay: Duration) -> (PeriodicRefresher, Arc<Tracker>) {
        let tracker = Arc::new(Tracker::default());
        let refresher = PeriodicRefresher::new({
            let tracker = Arc::clone(&tracker);
            move || {
                let tracker = Arc::clone(&tracker);
                async move {
                    tracker.calls.fetch_add(1, Ordering::SeqCst);
                    let now = tracker.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    tracker.peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(delay).await;
                    tracker.in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                }
            }
        });
        (refresher, tracker)
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_run_after_one_interval() {
        let (refresher, calls) = counting(Duration::ZERO);
        let _handle = refresher.start(PERIOD).unwrap();

        tokio::time::sleep(PERIOD - Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        settle().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::sleep(PERIOD).await;
        settle().await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(refresher.status().completed_runs, 2);
        assert!(refresher.status().last_run_at.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_fetch_skips_ticks() {
        // Each fetch outlives two intervals
        let (refresher, calls) = counting(PERIOD * 2 + Duration::from_secs(1));
        let _handle = refresher.start(PERIOD).unwrap();

        tokio::time::sleep(PERIOD + Duration::from_secs(1)).await;
        settle().await;
        assert!(refresher.is_busy());

        tokio::time::sleep(PERIOD * 2).await;
        settle().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(refresher.status().skipped_runs, 2);
        assert!(!refresher.is_busy());

        tokio::time::sleep(PERIOD).await;
        settle().await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn manual_trigger_while_busy_is_skipped() {
        let release = Arc::new(Notify::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let refresher = PeriodicRefresher::new({
            let release = Arc::clone(&release);
            let calls = Arc::clone(&calls);
            move || {
                let release = Arc::clone(&release);
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    release.notified().await;
                    Ok(())
                }
            }
        });

        let running = tokio::spawn({
            let refresher = refresher.clone();
            async move { refresher.run_now().await }
        });
        settle().await;
        assert!(refresher.is_busy());

        assert!(matches!(refresher.run_now().await, RunOutcome::StillRefreshing));
        assert_eq!(refresher.status().skipped_runs, 1);

        release.notify_one();
        assert!(matches!(running.await.unwrap(), RunOutcome::Refreshed));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Idle again, so a manual trigger runs
        release.notify_one();
        assert!(matches!(refresher.run_now().await, RunOutcome::Refreshed));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_prevents_further_ticks() {
        let (refresher, calls) = counting(Duration::ZERO);
        let handle = refresher.start(PERIOD).unwrap();

        tokio::time::sleep(PERIOD + Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        handle.stop();
        tokio::time::sleep(PERIOD * 5).await;
        settle().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_handle_stops_schedule() {
        let (refresher, calls) = counting(Duration::ZERO);
        drop(refresher.start(PERIOD).unwrap());

        tokio::time::sleep(PERIOD * 3).await;
        settle().await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_lets_in_flight_run_finish() {
        let (refresher, calls) = counting(Duration::from_secs(10));
        let handle = refresher.start(PERIOD).unwrap();

        tokio::time::sleep(PERIOD + Duration::from_secs(1)).await;
        settle().await;
        assert!(refresher.is_busy());

        handle.shutdown().await;
        assert!(!refresher.is_busy());
        assert_eq!(refresher.status().completed_runs, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_are_recorded_and_do_not_stop_schedule() {
        let calls = Arc::new(AtomicUsize::new(0));
        let refresher = PeriodicRefresher::new({
            let calls = Arc::clone(&calls);
            move || {
                let attempt = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt == 0 {
                        Err(ClientError::from_status(
                            StatusCode::SERVICE_UNAVAILABLE,
                            "down".into(),
                        ))
                    } else {
                        Ok(())
                    }
                }
            }
        });
        let _handle = refresher.start(PERIOD).unwrap();

        tokio::time::sleep(PERIOD + Duration::from_secs(1)).await;
        settle().await;
        assert!(refresher.status().last_error.is_some());

        tokio::time::sleep(PERIOD).await;
        settle().await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(refresher.status().last_error, None);
    }

    #[tokio::test(start_paused = true)]
    async fn schedule_toggles() {
        let (refresher, calls) = counting(Duration::ZERO);
        let mut schedule = RefreshSchedule::new(refresher, PERIOD);
        assert!(!schedule.is_enabled());

        schedule.set_enabled(true).unwrap();
        schedule.set_enabled(true).unwrap();
        tokio::time::sleep(PERIOD + Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(schedule.last_run_at().is_some());

        schedule.set_enabled(false).unwrap();
        tokio::time::sleep(PERIOD * 3).await;
        settle().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        schedule.set_interval(Duration::from_secs(60)).unwrap();
        assert!(!schedule.is_enabled());
        assert_eq!(schedule.interval(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn manual_trigger_during_scheduled_run_is_skipped() {
        let (refresher, tracker) = tracking(Duration::from_secs(30));
        let _handle = refresher.start(PERIOD).unwrap();

        tokio::time::sleep(PERIOD + Duration::from_secs(1)).await;
        settle().await;
        assert!(refresher.is_busy());

        assert!(matches!(refresher.run_now().await, RunOutcome::StillRefreshing));
        assert_eq!(refresher.status().skipped_runs, 1);

        tokio::time::sleep(Duration::from_secs(30)).await;
        settle().await;
        assert!(!refresher.is_busy());
        assert_eq!(tracker.calls.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn tick_during_manual_run_is_skipped() {
        let (refresher, tracker) = tracking(PERIOD + Duration::from_secs(10));
        let _handle = refresher.start(PERIOD).unwrap();
        let manual = tokio::spawn({
            let refresher = refresher.clone();
            async move { refresher.run_now().await }
        });

        tokio::time::sleep(PERIOD + Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(refresher.status().skipped_runs, 1);
        assert_eq!(tracker.calls.load(Ordering::SeqCst), 1);

        assert!(matches!(manual.await.unwrap(), RunOutcome::Refreshed));

        // The next tick runs normally
        tokio::time::sleep(PERIOD).await;
        settle().await;
        assert_eq!(tracker.calls.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_is_rejected() {
        let (refresher, calls) = counting(Duration::ZERO);
        assert!(matches!(
            refresher.start(Duration::ZERO),
            Err(CoreError::InvalidConfig { .. })
        ));

        let mut schedule = RefreshSchedule::new(refresher, Duration::ZERO);
        assert!(schedule.set_enabled(true).is_err());
        assert!(!schedule.is_enabled());

        schedule.set_interval(PERIOD).unwrap();
        schedule.set_enabled(true).unwrap();
        assert!(schedule.set_interval(Duration::ZERO).is_err());
        assert!(schedule.is_enabled());
        assert_eq!(schedule.interval(), PERIOD);

        tokio::time::sleep(PERIOD + Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
