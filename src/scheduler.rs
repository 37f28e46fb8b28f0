//! Cancellable per-event refresh tasks
//!
//! The engine auto-expires effects after a few seconds of silence, so every
//! active event gets one background task that re-triggers it on a fixed
//! cadence until its duration elapses or it is stopped.

use std::collections::HashMap;
use std::time::Duration;

use log::{debug, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::engine::{Engine, EVENT_OFF, EVENT_ON};

/// Default refresh cadence. Must stay under the engine's expiry window.
pub(crate) const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug)]
struct RefreshHandle {
    cancel: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Registry of live refresh tasks, keyed by event name. At most one task per
/// event; the caller serializes access (the session holds this behind its
/// lock), which makes stop-then-start a single critical section.
#[derive(Debug, Default)]
pub(crate) struct RefreshScheduler {
    tasks: HashMap<String, RefreshHandle>,
}

impl RefreshScheduler {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Launch the refresh loop for `event`, replacing any task already
    /// running for it. `duration` of `None` means refresh until stopped.
    pub(crate) fn start<E: Engine + Clone>(
        &mut self,
        engine: &E,
        event: &str,
        interval: Duration,
        duration: Option<Duration>,
    ) {
        self.stop(event);
        let (cancel, cancelled) = watch::channel(false);
        let task = tokio::spawn(refresh_loop(
            engine.clone(),
            event.to_string(),
            interval,
            duration,
            cancelled,
        ));
        self.tasks
            .insert(event.to_string(), RefreshHandle { cancel, task });
    }

    /// Cancel the task for `event` if one is running. Idempotent; sends no
    /// off trigger (that is the caller's decision).
    pub(crate) fn stop(&mut self, event: &str) {
        if let Some(handle) = self.tasks.remove(event) {
            debug!("stopping refresh task for {event}");
            // Send fails if the task already expired on its own.
            let _ = handle.cancel.send(true);
        }
    }

    /// Cancel every live task.
    pub(crate) fn stop_all(&mut self) {
        for (event, handle) in self.tasks.drain() {
            debug!("stopping refresh task for {event}");
            let _ = handle.cancel.send(true);
        }
    }

    /// Whether a refresh task is still live for `event`. Bounded tasks that
    /// expired on their own no longer count.
    pub(crate) fn is_active(&self, event: &str) -> bool {
        self.tasks
            .get(event)
            .is_some_and(|handle| !handle.task.is_finished())
    }

    pub(crate) fn active_count(&self) -> usize {
        self.tasks
            .values()
            .filter(|handle| !handle.task.is_finished())
            .count()
    }
}

/// Re-trigger `event` every `interval` until cancelled or the deadline
/// passes. A bounded run sends one final off trigger on expiry; a cancelled
/// or unbounded run never does.
async fn refresh_loop<E: Engine>(
    engine: E,
    event: String,
    interval: Duration,
    duration: Option<Duration>,
    mut cancelled: watch::Receiver<bool>,
) {
    let deadline = duration.map(|d| Instant::now() + d);
    loop {
        match engine.trigger(&event, EVENT_ON).await {
            Ok(()) => debug!("refreshed {event}"),
            // A transient failure must not kill the keep-alive loop.
            Err(err) => warn!("refresh trigger for {event} failed: {err}"),
        }

        let mut wake = Instant::now() + interval;
        if let Some(deadline) = deadline {
            wake = wake.min(deadline);
        }
        tokio::select! {
            // Also fires when the scheduler itself is dropped.
            _ = cancelled.changed() => return,
            () = tokio::time::sleep_until(wake) => {}
        }

        if deadline.is_some_and(|d| Instant::now() >= d) {
            debug!("refresh task for {event} expired after {duration:?}");
            if let Err(err) = engine.trigger(&event, EVENT_OFF).await {
                warn!("final off trigger for {event} failed: {err}");
            }
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{Call, MockEngine};

    const EVENT: &str = "GKEY_EVENT";

    fn on_count(calls: &[Call]) -> usize {
        calls
            .iter()
            .filter(|c| matches!(c, Call::Trigger { value, .. } if *value == EVENT_ON))
            .count()
    }

    fn off_count(calls: &[Call]) -> usize {
        calls
            .iter()
            .filter(|c| matches!(c, Call::Trigger { value, .. } if *value == EVENT_OFF))
            .count()
    }

    #[tokio::test(start_paused = true)]
    async fn bounded_task_expires_with_a_single_off() {
        let engine = MockEngine::new();
        let mut scheduler = RefreshScheduler::new();
        scheduler.start(
            &engine,
            EVENT,
            Duration::from_secs(1),
            Some(Duration::from_secs(5)),
        );

        tokio::time::sleep(Duration::from_millis(5500)).await;
        let calls = engine.calls();
        assert_eq!(on_count(&calls), 5, "ticks at 0..=4s");
        assert_eq!(off_count(&calls), 1);
        assert!(!scheduler.is_active(EVENT));

        // No further ticks after self-stop.
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(engine.calls().len(), calls.len());
    }

    #[tokio::test(start_paused = true)]
    async fn unbounded_task_ticks_until_stopped_without_off() {
        let engine = MockEngine::new();
        let mut scheduler = RefreshScheduler::new();
        scheduler.start(&engine, EVENT, Duration::from_secs(1), None);

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert!(scheduler.is_active(EVENT));
        assert!(on_count(&engine.calls()) >= 3);

        scheduler.stop(EVENT);
        tokio::time::sleep(Duration::from_millis(100)).await;
        let calls = engine.take_calls();
        assert_eq!(off_count(&calls), 0, "stop must not trigger off");

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(engine.calls().is_empty(), "no ticks after stop");
        assert!(!scheduler.is_active(EVENT));
    }

    #[tokio::test(start_paused = true)]
    async fn restart_replaces_the_running_task() {
        let engine = MockEngine::new();
        let mut scheduler = RefreshScheduler::new();
        scheduler.start(&engine, EVENT, Duration::from_secs(1), None);
        scheduler.start(&engine, EVENT, Duration::from_secs(1), None);
        assert_eq!(scheduler.active_count(), 1);

        // Let the replacement settle, then verify a single-task tick rate.
        tokio::time::sleep(Duration::from_millis(2500)).await;
        engine.take_calls();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(on_count(&engine.calls()), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_without_task_is_a_noop() {
        let mut scheduler = RefreshScheduler::new();
        scheduler.stop("NEVER_STARTED");
        assert_eq!(scheduler.active_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_triggers_do_not_kill_the_loop() {
        let engine = MockEngine::new();
        engine.set_fail_requests(true);
        let mut scheduler = RefreshScheduler::new();
        scheduler.start(&engine, EVENT, Duration::from_secs(1), None);

        tokio::time::sleep(Duration::from_millis(2500)).await;
        engine.set_fail_requests(false);
        engine.take_calls();

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(scheduler.is_active(EVENT));
        assert_eq!(on_count(&engine.calls()), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_all_cancels_every_task() {
        let engine = MockEngine::new();
        let mut scheduler = RefreshScheduler::new();
        scheduler.start(&engine, "GKEY_EVENT", Duration::from_secs(1), None);
        scheduler.start(&engine, "QKEY_EVENT", Duration::from_secs(1), None);
        scheduler.start(&engine, "REGION1_EVENT", Duration::from_secs(1), None);
        assert_eq!(scheduler.active_count(), 3);

        scheduler.stop_all();
        tokio::time::sleep(Duration::from_millis(100)).await;
        engine.take_calls();
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(engine.calls().is_empty());
        assert_eq!(scheduler.active_count(), 0);
    }
}
