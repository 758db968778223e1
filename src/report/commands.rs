use std::collections::HashMap;

use log::info;
use serde::Serialize;
use tauri::State;

use crate::tasks::tracker::TaskId;
use crate::AppState;

use super::{build_report, grade, GradeReport, ReportInputs, SessionReport};

#[derive(Serialize, Clone)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum FinishResponse {
    /// Results are gated until every task has completed.
    Blocked {
        message: String,
        missing: Vec<TaskId>,
    },
    Ready {
        report: SessionReport,
    },
}

#[tauri::command]
pub async fn finish_session(state: State<'_, AppState>) -> Result<FinishResponse, String> {
    if !state.tracker.is_all_complete() {
        let missing = state.tracker.missing_ids();
        info!(
            "finish requested with {} task(s) outstanding",
            missing.len()
        );
        return Ok(FinishResponse::Blocked {
            message: "Complete all five tasks before viewing the summary.".to_string(),
            missing,
        });
    }

    // Everything is read at this instant; the report does not update live.
    let inputs = ReportInputs {
        device: state.device.snapshot(),
        passive: state.passive.snapshot(),
        typing: state.typing.metric(),
        attention: state.attention.metric().await,
        reaction_ms: state.reaction.reaction_ms().await,
        slider: state.slider.result().await,
        quiz: state.quiz.answer(),
    };

    let report = build_report(&inputs);
    state.report.store_items(report.items.clone());

    Ok(FinishResponse::Ready { report })
}

#[derive(Serialize, Clone)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum EvaluateResponse {
    /// At least one item has no (valid) selection; nothing was graded.
    Incomplete {
        message: String,
        missing: Vec<String>,
    },
    Graded {
        report: GradeReport,
    },
}

#[tauri::command]
pub async fn evaluate_classification(
    state: State<'_, AppState>,
    selections: HashMap<String, String>,
) -> Result<EvaluateResponse, String> {
    let items = state
        .report
        .current_items()
        .ok_or_else(|| "finish the session before grading".to_string())?;

    match grade(&items, &selections) {
        Ok(report) => Ok(EvaluateResponse::Graded { report }),
        Err(rejection) => Ok(EvaluateResponse::Incomplete {
            message: "Make a selection for every data point first.".to_string(),
            missing: rejection.missing,
        }),
    }
}
