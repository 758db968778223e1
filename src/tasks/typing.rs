use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tauri::AppHandle;

use super::tracker::{signal_task_complete, CompletionTracker, TaskId};

pub const TARGET_SENTENCE: &str = "Digital behavior reveals more than we think.";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Keystroke {
    pub key: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TypingMetric {
    pub elapsed_ms: u64,
    pub keystrokes: u32,
    pub backspaces: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingCheck {
    /// The trimmed input matched the target; metric is now frozen.
    Completed(TypingMetric),
    Mismatch,
    AlreadyComplete,
}

#[derive(Debug, Default)]
pub struct TypingState {
    keystrokes: Vec<Keystroke>,
    backspaces: u32,
    clock: Option<Instant>,
    completed: bool,
    metric: Option<TypingMetric>,
}

impl TypingState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one keydown. The internal clock starts on the first key.
    /// Returns false once the task has completed (edits are ignored).
    pub fn record_key(&mut self, key: &str) -> bool {
        if self.completed {
            return false;
        }
        if self.clock.is_none() {
            self.clock = Some(Instant::now());
        }
        if key == "Backspace" {
            self.backspaces += 1;
        }
        self.keystrokes.push(Keystroke {
            key: key.to_string(),
            at: Utc::now(),
        });
        true
    }

    /// Compares the trimmed input against the trimmed target. Completion is
    /// recorded at most once; a mismatch changes nothing.
    pub fn check(&mut self, current: &str) -> TypingCheck {
        if self.completed {
            return TypingCheck::AlreadyComplete;
        }
        if current.trim() != TARGET_SENTENCE.trim() {
            return TypingCheck::Mismatch;
        }

        let elapsed_ms = self
            .clock
            .map(|start| start.elapsed().as_millis() as u64)
            .unwrap_or(0);
        let metric = TypingMetric {
            elapsed_ms,
            keystrokes: self.keystrokes.len() as u32,
            backspaces: self.backspaces,
        };

        self.completed = true;
        self.metric = Some(metric);
        TypingCheck::Completed(metric)
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn metric(&self) -> Option<TypingMetric> {
        self.metric
    }
}

pub struct TypingController {
    state: Arc<Mutex<TypingState>>,
    app_handle: AppHandle,
    tracker: CompletionTracker,
}

impl TypingController {
    pub fn new(app_handle: AppHandle, tracker: CompletionTracker) -> Self {
        Self {
            state: Arc::new(Mutex::new(TypingState::new())),
            app_handle,
            tracker,
        }
    }

    pub fn record_key(&self, key: &str) -> bool {
        self.state.lock().unwrap().record_key(key)
    }

    /// Runs the match check; used for both live input changes and the
    /// explicit "check" button.
    pub fn check(&self, current: &str) -> TypingCheck {
        let result = self.state.lock().unwrap().check(current);
        if matches!(result, TypingCheck::Completed(_)) {
            signal_task_complete(&self.app_handle, &self.tracker, TaskId::Typing);
        }
        result
    }

    pub fn metric(&self) -> Option<TypingMetric> {
        self.state.lock().unwrap().metric()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_starts_on_first_key_and_counts_backspaces() {
        let mut state = TypingState::new();
        assert!(state.record_key("D"));
        assert!(state.record_key("Backspace"));
        assert!(state.record_key("i"));

        let check = state.check(TARGET_SENTENCE);
        match check {
            TypingCheck::Completed(metric) => {
                assert_eq!(metric.keystrokes, 3);
                assert_eq!(metric.backspaces, 1);
            }
            other => panic!("expected completion, got {:?}", other),
        }
    }

    #[test]
    fn mismatch_changes_nothing() {
        let mut state = TypingState::new();
        state.record_key("x");

        assert_eq!(state.check("not the sentence"), TypingCheck::Mismatch);
        assert!(!state.is_completed());
        assert!(state.metric().is_none());
    }

    #[test]
    fn comparison_trims_both_sides() {
        let mut state = TypingState::new();
        let padded = format!("  {}  ", TARGET_SENTENCE);
        assert!(matches!(state.check(&padded), TypingCheck::Completed(_)));
    }

    #[test]
    fn completion_is_exactly_once_and_locks_edits() {
        let mut state = TypingState::new();
        state.record_key("a");
        assert!(matches!(
            state.check(TARGET_SENTENCE),
            TypingCheck::Completed(_)
        ));
        let frozen = state.metric().unwrap();

        // Further keystrokes and checks are no-ops.
        assert!(!state.record_key("z"));
        assert_eq!(state.check(TARGET_SENTENCE), TypingCheck::AlreadyComplete);
        assert_eq!(state.metric().unwrap().keystrokes, frozen.keystrokes);
    }
}
