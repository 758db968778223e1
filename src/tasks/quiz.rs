use std::sync::{Arc, Mutex};

use serde::Serialize;
use tauri::AppHandle;

use super::tracker::{signal_task_complete, CompletionTracker, TaskId};

/// The fixed fact behind the quiz question.
pub const QUIZ_RESULT: i64 = 12 + 7 + 5;

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuizAnswer {
    pub value: f64,
    pub correct: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QuizOutcome {
    Accepted(QuizAnswer),
    /// Input did not parse as a number; the single attempt is not consumed.
    NotNumeric,
    AlreadyAnswered,
}

#[derive(Debug, Default)]
pub struct QuizState {
    answer: Option<QuizAnswer>,
}

impl QuizState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submit(&mut self, raw: &str) -> QuizOutcome {
        if self.answer.is_some() {
            return QuizOutcome::AlreadyAnswered;
        }

        let value: f64 = match raw.trim().parse() {
            Ok(v) => v,
            Err(_) => return QuizOutcome::NotNumeric,
        };
        if !f64::is_finite(value) {
            return QuizOutcome::NotNumeric;
        }

        let answer = QuizAnswer {
            value,
            correct: value == QUIZ_RESULT as f64,
        };
        self.answer = Some(answer);
        QuizOutcome::Accepted(answer)
    }

    pub fn answer(&self) -> Option<QuizAnswer> {
        self.answer
    }

    pub fn is_completed(&self) -> bool {
        self.answer.is_some()
    }
}

pub struct QuizController {
    state: Arc<Mutex<QuizState>>,
    app_handle: AppHandle,
    tracker: CompletionTracker,
}

impl QuizController {
    pub fn new(app_handle: AppHandle, tracker: CompletionTracker) -> Self {
        Self {
            state: Arc::new(Mutex::new(QuizState::new())),
            app_handle,
            tracker,
        }
    }

    pub fn submit(&self, raw: &str) -> QuizOutcome {
        let outcome = self.state.lock().unwrap().submit(raw);
        if matches!(outcome, QuizOutcome::Accepted(_)) {
            signal_task_complete(&self.app_handle, &self.tracker, TaskId::Quiz);
        }
        outcome
    }

    pub fn answer(&self) -> Option<QuizAnswer> {
        self.state.lock().unwrap().answer()
    }
}
