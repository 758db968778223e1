use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use log::info;
use serde::{Deserialize, Serialize};
use tauri::{AppHandle, Emitter};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum TaskId {
    Typing,
    Attention,
    Reaction,
    Slider,
    Quiz,
}

impl TaskId {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskId::Typing => "typing",
            TaskId::Attention => "attention",
            TaskId::Reaction => "reaction",
            TaskId::Slider => "slider",
            TaskId::Quiz => "quiz",
        }
    }
}

pub const REQUIRED_TASKS: [TaskId; 5] = [
    TaskId::Typing,
    TaskId::Attention,
    TaskId::Reaction,
    TaskId::Slider,
    TaskId::Quiz,
];

/// Outcome of recording one completion signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionUpdate {
    /// False when the id had already completed (idempotent re-signal).
    pub newly_completed: bool,
    /// True exactly once: the signal that filled the required set.
    pub all_complete: bool,
}

struct TrackerState {
    completed: HashSet<TaskId>,
    all_signaled: bool,
}

/// Exactly-once bookkeeping of which required tasks have completed.
/// Constructed explicitly and handed to each task controller; cheap to
/// clone, all clones share the same set.
#[derive(Clone)]
pub struct CompletionTracker {
    inner: Arc<Mutex<TrackerState>>,
}

impl CompletionTracker {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(TrackerState {
                completed: HashSet::new(),
                all_signaled: false,
            })),
        }
    }

    pub fn complete(&self, id: TaskId) -> CompletionUpdate {
        let mut state = self.inner.lock().unwrap();
        let newly_completed = state.completed.insert(id);

        let all_complete = if newly_completed
            && !state.all_signaled
            && REQUIRED_TASKS.iter().all(|t| state.completed.contains(t))
        {
            state.all_signaled = true;
            true
        } else {
            false
        };

        CompletionUpdate {
            newly_completed,
            all_complete,
        }
    }

    pub fn is_all_complete(&self) -> bool {
        let state = self.inner.lock().unwrap();
        REQUIRED_TASKS.iter().all(|t| state.completed.contains(t))
    }

    /// Completed ids in canonical task order.
    pub fn completed_ids(&self) -> Vec<TaskId> {
        let state = self.inner.lock().unwrap();
        REQUIRED_TASKS
            .iter()
            .copied()
            .filter(|t| state.completed.contains(t))
            .collect()
    }

    pub fn missing_ids(&self) -> Vec<TaskId> {
        let state = self.inner.lock().unwrap();
        REQUIRED_TASKS
            .iter()
            .copied()
            .filter(|t| !state.completed.contains(t))
            .collect()
    }
}

#[derive(Serialize, Clone)]
#[serde(rename_all = "camelCase")]
struct TaskCompletedEvent {
    task: TaskId,
    completed: Vec<TaskId>,
}

#[derive(Serialize, Clone)]
#[serde(rename_all = "camelCase")]
struct ResultsReadyEvent {
    completed: Vec<TaskId>,
}

/// Records a completion signal and tells the frontend about it. Emits
/// "results-ready" on the signal that fills the required set.
pub fn signal_task_complete(app_handle: &AppHandle, tracker: &CompletionTracker, task: TaskId) {
    let update = tracker.complete(task);
    if !update.newly_completed {
        return;
    }

    info!("task {} completed", task.as_str());

    let completed = tracker.completed_ids();
    let _ = app_handle.emit(
        "task-completed",
        TaskCompletedEvent {
            task,
            completed: completed.clone(),
        },
    );

    if update.all_complete {
        info!("all tasks complete; results ready");
        let _ = app_handle.emit("results-ready", ResultsReadyEvent { completed });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_is_idempotent() {
        let tracker = CompletionTracker::new();

        let first = tracker.complete(TaskId::Typing);
        assert!(first.newly_completed);
        assert!(!first.all_complete);

        let again = tracker.complete(TaskId::Typing);
        assert!(!again.newly_completed);
        assert!(!again.all_complete);

        assert_eq!(tracker.completed_ids(), vec![TaskId::Typing]);
    }

    #[test]
    fn all_complete_fires_exactly_once() {
        let tracker = CompletionTracker::new();

        for task in &REQUIRED_TASKS[..4] {
            let update = tracker.complete(*task);
            assert!(!update.all_complete);
        }
        assert!(!tracker.is_all_complete());

        let last = tracker.complete(TaskId::Quiz);
        assert!(last.newly_completed);
        assert!(last.all_complete);
        assert!(tracker.is_all_complete());

        // The condition cannot re-enter.
        let after = tracker.complete(TaskId::Quiz);
        assert!(!after.all_complete);
    }

    #[test]
    fn order_does_not_matter() {
        let tracker = CompletionTracker::new();
        let order = [
            TaskId::Quiz,
            TaskId::Slider,
            TaskId::Typing,
            TaskId::Reaction,
            TaskId::Attention,
        ];

        let mut fired = 0;
        for task in order {
            if tracker.complete(task).all_complete {
                fired += 1;
            }
        }
        assert_eq!(fired, 1);
        assert!(tracker.missing_ids().is_empty());
    }

    #[test]
    fn task_ids_use_camel_case_on_the_wire() {
        assert_eq!(
            serde_json::to_value(TaskId::Typing).unwrap(),
            serde_json::json!("typing")
        );
        assert_eq!(
            serde_json::to_value(TaskId::Attention).unwrap(),
            serde_json::json!("attention")
        );
    }

    #[test]
    fn missing_ids_reports_in_canonical_order() {
        let tracker = CompletionTracker::new();
        tracker.complete(TaskId::Reaction);
        tracker.complete(TaskId::Typing);

        assert_eq!(
            tracker.missing_ids(),
            vec![TaskId::Attention, TaskId::Slider, TaskId::Quiz]
        );
    }
}
