use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use serde::Serialize;
use tauri::{AppHandle, Emitter};
use tokio::{sync::Mutex, time};
use tokio_util::sync::CancellationToken;

use super::tracker::{signal_task_complete, CompletionTracker, TaskId};

pub const SLIDER_MIN: i32 = 0;
pub const SLIDER_MAX: i32 = 100;
pub const SLIDER_NEUTRAL: i32 = 50;
pub const TARGET_MIN: i32 = 20;
pub const TARGET_MAX: i32 = 80;

const CHALLENGE_MS: u64 = 2000;
const TICK_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SliderResult {
    pub value: i32,
    pub target: i32,
    pub diff: i32,
}

/// What to do with the range control after a state change. Disabling is
/// deferred while a pointer drag is in progress; some platforms glitch when
/// a range input is disabled mid-drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisableAction {
    ApplyNow,
    Deferred,
}

#[derive(Debug)]
pub struct SliderState {
    target: i32,
    value: i32,
    started_once: bool,
    active: bool,
    pointer_active: bool,
    disable_pending: bool,
    result: Option<SliderResult>,
}

impl SliderState {
    /// `target` is drawn once at session start, uniform over 20..=80.
    pub fn new(target: i32) -> Self {
        Self {
            target: target.clamp(TARGET_MIN, TARGET_MAX),
            value: SLIDER_NEUTRAL,
            started_once: false,
            active: false,
            pointer_active: false,
            disable_pending: false,
            result: None,
        }
    }

    pub fn target(&self) -> i32 {
        self.target
    }

    pub fn value(&self) -> i32 {
        self.value
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Single attempt: rejected after the first use.
    pub fn begin(&mut self) -> Result<()> {
        if self.started_once {
            return Err(anyhow!("slider challenge already used"));
        }
        self.started_once = true;
        self.active = true;
        self.value = SLIDER_NEUTRAL;
        self.disable_pending = false;
        Ok(())
    }

    /// Value updates only count while the challenge is live.
    pub fn set_value(&mut self, value: i32) {
        if self.active {
            self.value = value.clamp(SLIDER_MIN, SLIDER_MAX);
        }
    }

    pub fn pointer_down(&mut self) {
        self.pointer_active = true;
        self.disable_pending = false;
    }

    /// Returns true when a deferred disable should be applied now.
    pub fn pointer_up(&mut self) -> bool {
        if !self.pointer_active {
            return false;
        }
        self.pointer_active = false;
        if self.disable_pending {
            self.disable_pending = false;
            return true;
        }
        false
    }

    pub fn request_disable(&mut self) -> DisableAction {
        if self.pointer_active {
            self.disable_pending = true;
            DisableAction::Deferred
        } else {
            DisableAction::ApplyNow
        }
    }

    /// Guarded finish: the first caller wins, every later call gets None
    /// regardless of which timer path got here first.
    pub fn finish(&mut self) -> Option<SliderResult> {
        if !self.active {
            return None;
        }
        self.active = false;

        let result = SliderResult {
            value: self.value,
            target: self.target,
            diff: (self.value - self.target).abs(),
        };
        self.result = Some(result);
        Some(result)
    }

    pub fn result(&self) -> Option<SliderResult> {
        self.result
    }
}

#[derive(Serialize, Clone)]
#[serde(rename_all = "camelCase")]
struct SliderCountdownEvent {
    remaining_ms: u64,
    display: String,
}

#[derive(Serialize, Clone)]
#[serde(rename_all = "camelCase")]
struct SliderEnabledEvent {
    enabled: bool,
}

#[derive(Serialize, Clone)]
#[serde(rename_all = "camelCase")]
struct SliderFinishedEvent {
    result: SliderResult,
}

#[derive(Clone)]
pub struct SliderController {
    state: Arc<Mutex<SliderState>>,
    timers: Arc<Mutex<Option<CancellationToken>>>,
    app_handle: AppHandle,
    tracker: CompletionTracker,
}

impl SliderController {
    pub fn new(app_handle: AppHandle, tracker: CompletionTracker, target: i32) -> Self {
        Self {
            state: Arc::new(Mutex::new(SliderState::new(target))),
            timers: Arc::new(Mutex::new(None)),
            app_handle,
            tracker,
        }
    }

    pub async fn target(&self) -> i32 {
        self.state.lock().await.target()
    }

    pub async fn start(&self) -> Result<()> {
        self.state.lock().await.begin()?;

        // Never leave a previous countdown pair running.
        let token = self.rearm_timers().await;

        let _ = self
            .app_handle
            .emit("slider-set-enabled", SliderEnabledEvent { enabled: true });
        emit_countdown(&self.app_handle, CHALLENGE_MS);

        let deadline = Instant::now() + Duration::from_millis(CHALLENGE_MS);

        // Cosmetic countdown repaint.
        let ticker_self = self.clone();
        let ticker_token = token.clone();
        tokio::spawn(async move {
            let mut interval = time::interval(TICK_INTERVAL);
            interval.tick().await; // completes immediately
            loop {
                tokio::select! {
                    _ = ticker_token.cancelled() => break,
                    _ = interval.tick() => {
                        let remaining = deadline.saturating_duration_since(Instant::now());
                        let remaining_ms = remaining.as_millis() as u64;
                        if remaining_ms == 0 {
                            ticker_self.finish_challenge().await;
                            break;
                        }
                        emit_countdown(&ticker_self.app_handle, remaining_ms);
                    }
                }
            }
        });

        // Authoritative expiry.
        let expiry_self = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = time::sleep(Duration::from_millis(CHALLENGE_MS)) => {
                    expiry_self.finish_challenge().await;
                }
            }
        });

        Ok(())
    }

    pub async fn set_value(&self, value: i32) {
        self.state.lock().await.set_value(value);
    }

    pub async fn pointer_down(&self) {
        self.state.lock().await.pointer_down();
    }

    pub async fn pointer_up(&self) {
        let apply_disable = self.state.lock().await.pointer_up();
        if apply_disable {
            let _ = self
                .app_handle
                .emit("slider-set-enabled", SliderEnabledEvent { enabled: false });
        }
    }

    pub async fn result(&self) -> Option<SliderResult> {
        self.state.lock().await.result()
    }

    /// Both the tick-reaches-zero path and the expiry one-shot land here;
    /// the state guard makes sure only one of them finishes the challenge.
    async fn finish_challenge(&self) {
        let (result, disable) = {
            let mut state = self.state.lock().await;
            let Some(result) = state.finish() else {
                return;
            };
            (result, state.request_disable())
        };

        if let Some(token) = self.timers.lock().await.take() {
            token.cancel();
        }

        if disable == DisableAction::ApplyNow {
            let _ = self
                .app_handle
                .emit("slider-set-enabled", SliderEnabledEvent { enabled: false });
        }

        let _ = self.app_handle.emit(
            "slider-countdown-tick",
            SliderCountdownEvent {
                remaining_ms: 0,
                display: "0.00".to_string(),
            },
        );
        let _ = self
            .app_handle
            .emit("slider-finished", SliderFinishedEvent { result });

        signal_task_complete(&self.app_handle, &self.tracker, TaskId::Slider);
    }

    async fn rearm_timers(&self) -> CancellationToken {
        let mut timers = self.timers.lock().await;
        if let Some(previous) = timers.take() {
            previous.cancel();
        }
        let token = CancellationToken::new();
        *timers = Some(token.clone());
        token
    }
}

fn emit_countdown(app_handle: &AppHandle, remaining_ms: u64) {
    let _ = app_handle.emit(
        "slider-countdown-tick",
        SliderCountdownEvent {
            remaining_ms,
            display: format!("{:.2}", remaining_ms as f64 / 1000.0),
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_is_absolute_distance_to_target() {
        let mut state = SliderState::new(50);
        state.begin().unwrap();
        state.set_value(42);

        let result = state.finish().unwrap();
        assert_eq!(result, SliderResult { value: 42, target: 50, diff: 8 });
    }

    #[test]
    fn exact_hit_has_zero_diff() {
        let mut state = SliderState::new(50);
        state.begin().unwrap();
        state.set_value(50);

        let result = state.finish().unwrap();
        assert_eq!(result.diff, 0);
        assert_eq!(format!("{:.1}", result.diff as f64), "0.0");
    }

    #[test]
    fn value_is_clamped_to_slider_range() {
        let mut state = SliderState::new(20);
        state.begin().unwrap();
        state.set_value(400);
        assert_eq!(state.value(), SLIDER_MAX);

        state.set_value(-3);
        assert_eq!(state.value(), SLIDER_MIN);
    }

    #[test]
    fn begin_resets_to_neutral_and_is_single_use() {
        let mut state = SliderState::new(30);
        state.begin().unwrap();
        assert_eq!(state.value(), SLIDER_NEUTRAL);
        state.set_value(70);
        state.finish().unwrap();

        assert!(state.begin().is_err());
    }

    #[test]
    fn finish_fires_exactly_once_whichever_path_wins() {
        let mut state = SliderState::new(60);
        state.begin().unwrap();
        state.set_value(55);

        // Simulates the tick path and the expiry one-shot racing.
        assert!(state.finish().is_some());
        assert!(state.finish().is_none());
        assert_eq!(state.result().unwrap().diff, 5);
    }

    #[test]
    fn value_updates_ignored_when_inactive() {
        let mut state = SliderState::new(40);
        state.set_value(10);
        assert_eq!(state.value(), SLIDER_NEUTRAL);

        state.begin().unwrap();
        state.set_value(10);
        state.finish().unwrap();

        state.set_value(90);
        assert_eq!(state.result().unwrap().value, 10);
    }

    #[test]
    fn disable_is_deferred_while_pointer_is_down() {
        let mut state = SliderState::new(50);
        state.begin().unwrap();
        state.pointer_down();

        assert_eq!(state.request_disable(), DisableAction::Deferred);
        // Applied on release, not before.
        assert!(state.pointer_up());
        // Second release does nothing.
        assert!(!state.pointer_up());
    }

    #[test]
    fn disable_applies_immediately_without_a_drag() {
        let mut state = SliderState::new(50);
        state.begin().unwrap();
        assert_eq!(state.request_disable(), DisableAction::ApplyNow);
        assert!(!state.pointer_up());
    }

    #[test]
    fn pointer_down_clears_a_stale_pending_disable() {
        let mut state = SliderState::new(50);
        state.begin().unwrap();
        state.pointer_down();
        state.request_disable();

        // New interaction begins before the release lands.
        state.pointer_down();
        assert!(!state.pointer_up());
    }

    #[test]
    fn target_is_clamped_into_the_drawable_band() {
        assert_eq!(SliderState::new(5).target(), TARGET_MIN);
        assert_eq!(SliderState::new(95).target(), TARGET_MAX);
        assert_eq!(SliderState::new(42).target(), 42);
    }
}
