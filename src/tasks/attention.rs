use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use serde::Serialize;
use tauri::{AppHandle, Emitter};
use tokio::{sync::Mutex, task::JoinHandle, time};

use super::tracker::{signal_task_complete, CompletionTracker, TaskId};

/// The stopwatch challenge asks the user to stop as close to this as they can.
pub const TARGET_SECS: f64 = 10.0;

const TICK_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttentionMetric {
    pub stopped_secs: f64,
    pub deviation_secs: f64,
}

#[derive(Debug, Default)]
pub struct AttentionState {
    running_anchor: Option<Instant>,
    completed: bool,
    metric: Option<AttentionMetric>,
}

impl AttentionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// No-op when already running or already completed.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.completed || self.running_anchor.is_some() {
            return false;
        }
        self.running_anchor = Some(now);
        true
    }

    /// Freezes the elapsed time from the real timestamp delta. No-op when
    /// not running or already completed.
    pub fn stop(&mut self) -> Option<AttentionMetric> {
        if self.completed {
            return None;
        }
        let anchor = self.running_anchor.take()?;

        let stopped_secs = anchor.elapsed().as_millis() as f64 / 1000.0;
        let metric = AttentionMetric {
            stopped_secs,
            deviation_secs: (TARGET_SECS - stopped_secs).abs(),
        };
        self.completed = true;
        self.metric = Some(metric);
        Some(metric)
    }

    pub fn is_running(&self) -> bool {
        self.running_anchor.is_some()
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn current_elapsed_secs(&self) -> Option<f64> {
        self.running_anchor
            .map(|anchor| anchor.elapsed().as_millis() as f64 / 1000.0)
    }

    pub fn metric(&self) -> Option<AttentionMetric> {
        self.metric
    }
}

#[derive(Serialize, Clone)]
#[serde(rename_all = "camelCase")]
struct AttentionTickEvent {
    elapsed_secs: f64,
    display: String,
}

#[derive(Clone)]
pub struct AttentionController {
    state: Arc<Mutex<AttentionState>>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    app_handle: AppHandle,
    tracker: CompletionTracker,
}

impl AttentionController {
    pub fn new(app_handle: AppHandle, tracker: CompletionTracker) -> Self {
        Self {
            state: Arc::new(Mutex::new(AttentionState::new())),
            ticker: Arc::new(Mutex::new(None)),
            app_handle,
            tracker,
        }
    }

    pub async fn start(&self) -> Result<()> {
        {
            let mut state = self.state.lock().await;
            if !state.start(Instant::now()) {
                return Err(anyhow!("stopwatch already used"));
            }
        }
        self.spawn_ticker().await;
        Ok(())
    }

    pub async fn stop(&self) -> Result<AttentionMetric> {
        let metric = {
            let mut state = self.state.lock().await;
            state
                .stop()
                .ok_or_else(|| anyhow!("stopwatch is not running"))?
        };

        self.cancel_ticker().await;

        // Final repaint with the frozen value.
        let _ = self.app_handle.emit(
            "attention-tick",
            AttentionTickEvent {
                elapsed_secs: metric.stopped_secs,
                display: format!("{:.2}", metric.stopped_secs),
            },
        );

        signal_task_complete(&self.app_handle, &self.tracker, TaskId::Attention);
        Ok(metric)
    }

    pub async fn metric(&self) -> Option<AttentionMetric> {
        self.state.lock().await.metric()
    }

    /// Display refresh only; the recorded metric never comes from ticks.
    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let state = self.state.clone();
        let app_handle = self.app_handle.clone();

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(TICK_INTERVAL);
            loop {
                interval.tick().await;

                let elapsed = {
                    let guard = state.lock().await;
                    match guard.current_elapsed_secs() {
                        Some(elapsed) => elapsed,
                        None => break,
                    }
                };

                let _ = app_handle.emit(
                    "attention-tick",
                    AttentionTickEvent {
                        elapsed_secs: elapsed,
                        display: format!("{:.2}", elapsed),
                    },
                );
            }
        });

        *ticker_guard = Some(handle);
    }

    async fn cancel_ticker(&self) {
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_then_stop_freezes_the_metric() {
        let mut state = AttentionState::new();
        assert!(state.start(Instant::now()));
        assert!(state.is_running());

        let metric = state.stop().unwrap();
        assert!(metric.stopped_secs >= 0.0);
        assert!((metric.deviation_secs - (TARGET_SECS - metric.stopped_secs).abs()).abs() < 1e-9);
        assert!(state.is_completed());
        assert!(!state.is_running());
    }

    #[test]
    fn start_is_guarded_while_running_and_after_completion() {
        let mut state = AttentionState::new();
        assert!(state.start(Instant::now()));
        assert!(!state.start(Instant::now()));

        state.stop().unwrap();
        assert!(!state.start(Instant::now()));
    }

    #[test]
    fn stop_without_start_is_a_noop() {
        let mut state = AttentionState::new();
        assert!(state.stop().is_none());
        assert!(!state.is_completed());
    }

    #[test]
    fn stop_completes_exactly_once() {
        let mut state = AttentionState::new();
        state.start(Instant::now());
        let first = state.stop().unwrap();
        assert!(state.stop().is_none());
        assert_eq!(state.metric().unwrap(), first);
    }

    #[test]
    fn deviation_uses_ten_second_target() {
        let metric = AttentionMetric {
            stopped_secs: 10.0,
            deviation_secs: (TARGET_SECS - 10.0_f64).abs(),
        };
        assert_eq!(format!("{:.2}", metric.stopped_secs), "10.00");
        assert_eq!(format!("{:.2}", metric.deviation_secs), "0.00");
    }
}
