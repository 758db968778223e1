use serde::Serialize;
use tauri::State;

use crate::AppState;

use super::attention::AttentionMetric;
use super::quiz::{QuizAnswer, QuizOutcome, QUIZ_RESULT};
use super::reaction::ReactionPress;
use super::tracker::TaskId;
use super::typing::{TypingCheck, TARGET_SENTENCE};

#[derive(Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TaskProgress {
    pub completed: Vec<TaskId>,
    pub missing: Vec<TaskId>,
    pub all_complete: bool,
}

#[tauri::command]
pub fn get_task_progress(state: State<'_, AppState>) -> TaskProgress {
    TaskProgress {
        completed: state.tracker.completed_ids(),
        missing: state.tracker.missing_ids(),
        all_complete: state.tracker.is_all_complete(),
    }
}

#[derive(Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TypingCheckResponse {
    pub completed: bool,
    pub message: String,
}

#[tauri::command]
pub fn get_typing_target() -> String {
    TARGET_SENTENCE.to_string()
}

#[tauri::command]
pub fn typing_keydown(state: State<'_, AppState>, key: String) -> bool {
    state.typing.record_key(&key)
}

/// Live input-change path: silent on mismatch.
#[tauri::command]
pub fn typing_input(state: State<'_, AppState>, value: String) -> bool {
    matches!(
        state.typing.check(&value),
        TypingCheck::Completed(_) | TypingCheck::AlreadyComplete
    )
}

/// Explicit check button: always answers with a human-readable status.
#[tauri::command]
pub fn typing_check(state: State<'_, AppState>, value: String) -> TypingCheckResponse {
    match state.typing.check(&value) {
        TypingCheck::Completed(metric) => TypingCheckResponse {
            completed: true,
            message: format!(
                "Sentence matched in {:.2} s with {} keystrokes.",
                metric.elapsed_ms as f64 / 1000.0,
                metric.keystrokes
            ),
        },
        TypingCheck::AlreadyComplete => TypingCheckResponse {
            completed: true,
            message: "Already done — the sentence is locked in.".to_string(),
        },
        TypingCheck::Mismatch => TypingCheckResponse {
            completed: false,
            message: "Not a match yet. Type the sentence exactly as shown.".to_string(),
        },
    }
}

#[tauri::command]
pub async fn attention_start(state: State<'_, AppState>) -> Result<(), String> {
    state.attention.start().await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn attention_stop(state: State<'_, AppState>) -> Result<AttentionMetric, String> {
    state.attention.stop().await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn reaction_press(state: State<'_, AppState>) -> Result<ReactionPress, String> {
    Ok(state.reaction.press().await)
}

#[tauri::command]
pub async fn get_slider_target(state: State<'_, AppState>) -> Result<i32, String> {
    Ok(state.slider.target().await)
}

#[tauri::command]
pub async fn slider_start(state: State<'_, AppState>) -> Result<(), String> {
    state.slider.start().await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn slider_input(state: State<'_, AppState>, value: i32) -> Result<(), String> {
    state.slider.set_value(value).await;
    Ok(())
}

#[tauri::command]
pub async fn slider_pointer_down(state: State<'_, AppState>) -> Result<(), String> {
    state.slider.pointer_down().await;
    Ok(())
}

#[tauri::command]
pub async fn slider_pointer_up(state: State<'_, AppState>) -> Result<(), String> {
    state.slider.pointer_up().await;
    Ok(())
}

#[derive(Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct QuizSubmitResponse {
    pub accepted: bool,
    pub message: String,
    pub answer: Option<QuizAnswer>,
}

#[tauri::command]
pub fn quiz_submit(state: State<'_, AppState>, answer: String) -> QuizSubmitResponse {
    match state.quiz.submit(&answer) {
        QuizOutcome::Accepted(answer) => QuizSubmitResponse {
            accepted: true,
            message: if answer.correct {
                "Correct! This value is data you entered deliberately.".to_string()
            } else {
                format!("Wrong, but recorded (the correct answer is {}).", QUIZ_RESULT)
            },
            answer: Some(answer),
        },
        QuizOutcome::NotNumeric => QuizSubmitResponse {
            accepted: false,
            message: "Please enter a numeric result.".to_string(),
            answer: None,
        },
        QuizOutcome::AlreadyAnswered => QuizSubmitResponse {
            accepted: false,
            message: "The quiz takes a single submission; yours is locked in.".to_string(),
            answer: state.quiz.answer(),
        },
    }
}
