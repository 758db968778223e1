use std::sync::Arc;
use std::time::{Duration, Instant};

use log::debug;
use rand::Rng;
use serde::Serialize;
use tauri::{AppHandle, Emitter};
use tokio::{sync::Mutex, time};
use tokio_util::sync::CancellationToken;

use super::tracker::{signal_task_complete, CompletionTracker, TaskId};

const MIN_DELAY_MS: u64 = 1000;
const MAX_DELAY_MS: u64 = 4000;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ReactionPhase {
    Idle,
    Armed,
    Ready,
    Measured,
}

#[derive(Debug)]
pub struct ReactionState {
    phase: ReactionPhase,
    ready_anchor: Option<Instant>,
    reaction_ms: Option<u64>,
}

impl ReactionState {
    pub fn new() -> Self {
        Self {
            phase: ReactionPhase::Idle,
            ready_anchor: None,
            reaction_ms: None,
        }
    }

    pub fn phase(&self) -> ReactionPhase {
        self.phase
    }

    pub fn arm(&mut self) -> bool {
        if self.phase != ReactionPhase::Idle {
            return false;
        }
        self.phase = ReactionPhase::Armed;
        true
    }

    /// Fires from the delayed one-shot; inert unless still armed.
    pub fn make_ready(&mut self, now: Instant) -> bool {
        if self.phase != ReactionPhase::Armed {
            return false;
        }
        self.phase = ReactionPhase::Ready;
        self.ready_anchor = Some(now);
        true
    }

    /// Measures the press against the ready anchor. Terminal: the phase
    /// never leaves `Measured` afterwards.
    pub fn measure(&mut self) -> Option<u64> {
        if self.phase != ReactionPhase::Ready {
            return None;
        }
        let anchor = self.ready_anchor?;
        let elapsed_ms = anchor.elapsed().as_millis() as u64;
        self.phase = ReactionPhase::Measured;
        self.reaction_ms = Some(elapsed_ms);
        Some(elapsed_ms)
    }

    pub fn reaction_ms(&self) -> Option<u64> {
        self.reaction_ms
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum ReactionPress {
    /// First press: the wait for the go signal has begun.
    Armed,
    /// Pressed during the delay window; ignored without penalty.
    TooEarly,
    Measured { reaction_ms: u64 },
    AlreadyMeasured,
}

#[derive(Clone)]
pub struct ReactionController {
    state: Arc<Mutex<ReactionState>>,
    pending: Arc<Mutex<Option<CancellationToken>>>,
    app_handle: AppHandle,
    tracker: CompletionTracker,
}

impl ReactionController {
    pub fn new(app_handle: AppHandle, tracker: CompletionTracker) -> Self {
        Self {
            state: Arc::new(Mutex::new(ReactionState::new())),
            pending: Arc::new(Mutex::new(None)),
            app_handle,
            tracker,
        }
    }

    pub async fn press(&self) -> ReactionPress {
        let mut state = self.state.lock().await;
        match state.phase() {
            ReactionPhase::Idle => {
                state.arm();
                drop(state);

                let delay_ms = rand::thread_rng().gen_range(MIN_DELAY_MS..MAX_DELAY_MS);
                self.schedule_ready(delay_ms).await;
                let _ = self.app_handle.emit("reaction-armed", ());
                ReactionPress::Armed
            }
            ReactionPhase::Armed => {
                // The control is disabled in the UI during this window; a
                // press that slips through anyway is ignored.
                debug!("reaction press while armed; ignored");
                ReactionPress::TooEarly
            }
            ReactionPhase::Ready => match state.measure() {
                Some(reaction_ms) => {
                    drop(state);
                    signal_task_complete(&self.app_handle, &self.tracker, TaskId::Reaction);
                    ReactionPress::Measured { reaction_ms }
                }
                None => ReactionPress::AlreadyMeasured,
            },
            ReactionPhase::Measured => ReactionPress::AlreadyMeasured,
        }
    }

    pub async fn reaction_ms(&self) -> Option<u64> {
        self.state.lock().await.reaction_ms()
    }

    async fn schedule_ready(&self, delay_ms: u64) {
        let mut pending = self.pending.lock().await;
        if let Some(token) = pending.take() {
            token.cancel();
        }

        let token = CancellationToken::new();
        *pending = Some(token.clone());

        let state = self.state.clone();
        let app_handle = self.app_handle.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = time::sleep(Duration::from_millis(delay_ms)) => {
                    let became_ready = state.lock().await.make_ready(Instant::now());
                    if became_ready {
                        let _ = app_handle.emit("reaction-ready", ());
                    }
                }
            }
        });
    }
}
