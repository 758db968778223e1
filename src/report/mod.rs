pub mod commands;

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::device::DeviceSnapshot;
use crate::session::PassiveSnapshot;
use crate::tasks::attention::AttentionMetric;
use crate::tasks::quiz::QuizAnswer;
use crate::tasks::slider::SliderResult;
use crate::tasks::typing::TypingMetric;

/// Ground-truth label for a collected data point.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    /// Emitted by the environment without deliberate user intent.
    Digital,
    /// Produced by an action the user performed to complete a task.
    Explicit,
}

impl Category {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "digital" => Some(Category::Digital),
            "explicit" => Some(Category::Explicit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationItem {
    pub id: String,
    pub label: String,
    pub value: String,
    pub category: Category,
    pub info: String,
}

/// Everything the presenter reads, gathered at trigger time.
#[derive(Debug, Clone)]
pub struct ReportInputs {
    pub device: DeviceSnapshot,
    pub passive: PassiveSnapshot,
    pub typing: Option<TypingMetric>,
    pub attention: Option<AttentionMetric>,
    pub reaction_ms: Option<u64>,
    pub slider: Option<SliderResult>,
    pub quiz: Option<QuizAnswer>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    pub summary: String,
    pub items: Vec<ClassificationItem>,
}

const PLACEHOLDER: &str = "—";

fn fmt_typing(metric: &Option<TypingMetric>) -> String {
    match metric {
        Some(m) => format!(
            "{:.2} s, {} keys, {} deletions",
            m.elapsed_ms as f64 / 1000.0,
            m.keystrokes,
            m.backspaces
        ),
        None => PLACEHOLDER.to_string(),
    }
}

fn fmt_attention(metric: &Option<AttentionMetric>) -> String {
    match metric {
        Some(m) => format!(
            "{:.2} s (deviation {:.2} s)",
            m.stopped_secs, m.deviation_secs
        ),
        None => PLACEHOLDER.to_string(),
    }
}

fn fmt_reaction(reaction_ms: &Option<u64>) -> String {
    match reaction_ms {
        Some(ms) => format!("{} ms", ms),
        None => PLACEHOLDER.to_string(),
    }
}

fn fmt_slider(result: &Option<SliderResult>) -> String {
    match result {
        Some(r) => format!("{} (target {}, diff {:.1})", r.value, r.target, r.diff as f64),
        None => PLACEHOLDER.to_string(),
    }
}

fn fmt_quiz(answer: &Option<QuizAnswer>) -> String {
    match answer {
        Some(a) => format!(
            "{} ({})",
            a.value,
            if a.correct { "correct" } else { "wrong" }
        ),
        None => PLACEHOLDER.to_string(),
    }
}

/// Builds the multi-section text summary. The session duration comes from the
/// passive snapshot, i.e. the instant the snapshot was taken.
pub fn build_summary(inputs: &ReportInputs) -> String {
    let host = &inputs.device.host;
    let client = inputs.device.client.as_ref();

    let user_agent = client
        .map(|c| c.user_agent.clone())
        .unwrap_or_else(|| PLACEHOLDER.to_string());
    let languages = client
        .filter(|c| !c.languages.is_empty())
        .map(|c| c.languages.join(", "))
        .unwrap_or_else(|| PLACEHOLDER.to_string());
    let screen = client
        .map(|c| format!("{} x {}", c.screen_width, c.screen_height))
        .unwrap_or_else(|| PLACEHOLDER.to_string());
    let viewport = client
        .map(|c| format!("{} x {}", c.viewport_width, c.viewport_height))
        .unwrap_or_else(|| PLACEHOLDER.to_string());
    let pixel_ratio = client
        .map(|c| c.pixel_ratio.to_string())
        .unwrap_or_else(|| PLACEHOLDER.to_string());
    let touch = match client {
        Some(c) if c.touch_support() => "Yes",
        Some(_) => "No",
        None => PLACEHOLDER,
    };
    let cpu = host
        .cpu_cores
        .map(|n| n.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let ram = host
        .memory_gb
        .map(|gb| format!("{} GB", gb))
        .unwrap_or_else(|| "unknown".to_string());

    let quiz_line = fmt_quiz(&inputs.quiz);

    format!(
        "=== DEVICE & ENVIRONMENT ===\n\
         Platform: {platform} ({os_version}, {arch})\n\
         User Agent: {user_agent}\n\
         Language: {locale} [{languages}]\n\
         Timezone: {timezone}\n\
         Local Time: {local_time}\n\
         \n\
         Hardware:\n\
         - Screen: {screen}\n\
         - Viewport: {viewport}\n\
         - DPR: {pixel_ratio}\n\
         - CPU: {cpu} cores\n\
         - RAM: {ram}\n\
         - Touch: {touch}\n\
         \n\
         === TASK DATA ===\n\
         Typing: {typing}\n\
         10 s Test: {attention}\n\
         Reaction: {reaction}\n\
         Slider Target: {slider}\n\
         Quiz: {quiz}\n\
         \n\
         === PASSIVE TRACES ===\n\
         Session: {session_id}\n\
         Session Duration: {duration:.2} s\n\
         Tab Returns: {focus_returns}\n\
         Scroll Events: {scroll_events}\n\
         \n\
         === EXPLICIT SHARES ===\n\
         Quiz (user input): {quiz}\n\
         \n\
         Which of these data points reached the system automatically?",
        platform = host.platform,
        os_version = host.os_version,
        arch = host.arch,
        user_agent = user_agent,
        locale = host.locale,
        languages = languages,
        timezone = host.timezone,
        local_time = host.local_time,
        screen = screen,
        viewport = viewport,
        pixel_ratio = pixel_ratio,
        cpu = cpu,
        ram = ram,
        touch = touch,
        typing = fmt_typing(&inputs.typing),
        attention = fmt_attention(&inputs.attention),
        reaction = fmt_reaction(&inputs.reaction_ms),
        slider = fmt_slider(&inputs.slider),
        quiz = quiz_line,
        session_id = inputs.passive.session_id,
        duration = inputs.passive.session_duration_secs,
        focus_returns = inputs.passive.focus_returns,
        scroll_events = inputs.passive.scroll_events,
    )
}

/// The fixed 8-item classification exercise.
pub fn build_classification_items(inputs: &ReportInputs) -> Vec<ClassificationItem> {
    let host = &inputs.device.host;
    let user_agent = inputs
        .device
        .client
        .as_ref()
        .map(|c| c.user_agent.clone())
        .unwrap_or_else(|| PLACEHOLDER.to_string());

    vec![
        ClassificationItem {
            id: "device".to_string(),
            label: "Device & browser traces".to_string(),
            value: format!("{} | {}", host.platform, user_agent),
            category: Category::Digital,
            info: "The environment reports these automatically; no user input is involved."
                .to_string(),
        },
        ClassificationItem {
            id: "session".to_string(),
            label: "Time spent on the page".to_string(),
            value: format!("{:.2} s", inputs.passive.session_duration_secs),
            category: Category::Digital,
            info: "The session duration accumulates in the background without the user noticing."
                .to_string(),
        },
        ClassificationItem {
            id: "focus".to_string(),
            label: "Tab return count".to_string(),
            value: inputs.passive.focus_returns.to_string(),
            category: Category::Digital,
            info: "How often you come back to the tab is tracked automatically.".to_string(),
        },
        ClassificationItem {
            id: "typing".to_string(),
            label: "Typing behavior".to_string(),
            value: fmt_typing(&inputs.typing),
            category: Category::Explicit,
            info: "These values exist only because you typed the sentence to finish the task."
                .to_string(),
        },
        ClassificationItem {
            id: "timer".to_string(),
            label: "Timing test".to_string(),
            value: fmt_attention(&inputs.attention),
            category: Category::Explicit,
            info: "The stopwatch result is the output of your deliberate action.".to_string(),
        },
        ClassificationItem {
            id: "reaction".to_string(),
            label: "Reaction time".to_string(),
            value: fmt_reaction(&inputs.reaction_ms),
            category: Category::Explicit,
            info: "How fast you pressed the button follows from your decision to play along."
                .to_string(),
        },
        ClassificationItem {
            id: "slider".to_string(),
            label: "Slider target distance".to_string(),
            value: fmt_slider(&inputs.slider),
            category: Category::Explicit,
            info: "The slider position is a value you set on purpose.".to_string(),
        },
        ClassificationItem {
            id: "quiz".to_string(),
            label: "Quiz answer".to_string(),
            value: fmt_quiz(&inputs.quiz),
            category: Category::Explicit,
            info: "This result is entirely a value you computed and entered.".to_string(),
        },
    ]
}

pub fn build_report(inputs: &ReportInputs) -> SessionReport {
    SessionReport {
        summary: build_summary(inputs),
        items: build_classification_items(inputs),
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ItemGrade {
    pub id: String,
    pub selected: Category,
    pub correct: bool,
    pub info: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GradeReport {
    pub results: Vec<ItemGrade>,
    pub correct_count: usize,
    pub total: usize,
    pub feedback: String,
}

/// Items whose selection is missing or unparseable; grading never proceeds
/// partially.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingSelections {
    pub missing: Vec<String>,
}

/// Grades the current selections against ground truth. Repeatable: changing
/// a selection and re-grading is allowed.
pub fn grade(
    items: &[ClassificationItem],
    selections: &HashMap<String, String>,
) -> Result<GradeReport, MissingSelections> {
    let mut missing = Vec::new();
    let mut picks = Vec::with_capacity(items.len());

    for item in items {
        match selections.get(&item.id).and_then(|raw| Category::parse(raw)) {
            Some(category) => picks.push(category),
            None => missing.push(item.id.clone()),
        }
    }

    if !missing.is_empty() {
        return Err(MissingSelections { missing });
    }

    let results: Vec<ItemGrade> = items
        .iter()
        .zip(picks)
        .map(|(item, selected)| ItemGrade {
            id: item.id.clone(),
            selected,
            correct: selected == item.category,
            info: item.info.clone(),
        })
        .collect();

    let correct_count = results.iter().filter(|r| r.correct).count();
    let total = results.len();

    Ok(GradeReport {
        feedback: format!(
            "Correct classifications: {}/{}. Digital exhaust is the automatic trail; \
             result data reflects task performance.",
            correct_count, total
        ),
        results,
        correct_count,
        total,
    })
}

/// Holds the items produced by the last finish so grading can run against
/// them, and nothing else survives the page lifetime.
pub struct ReportStore {
    items: Mutex<Option<Vec<ClassificationItem>>>,
}

impl ReportStore {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(None),
        }
    }

    pub fn store_items(&self, items: Vec<ClassificationItem>) {
        *self.items.lock().unwrap() = Some(items);
    }

    pub fn current_items(&self) -> Option<Vec<ClassificationItem>> {
        self.items.lock().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{ClientSnapshot, HostSnapshot};
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn sample_inputs() -> ReportInputs {
        ReportInputs {
            device: DeviceSnapshot {
                host: HostSnapshot {
                    platform: "Fedora Linux".to_string(),
                    os_version: "Linux 6.18".to_string(),
                    arch: "x86_64".to_string(),
                    cpu_cores: Some(8),
                    memory_gb: Some(16.0),
                    locale: "en_US".to_string(),
                    timezone: "Europe/Istanbul".to_string(),
                    local_time: "2026-08-25 14:00:00".to_string(),
                    captured_at: Utc::now(),
                },
                client: Some(ClientSnapshot {
                    user_agent: "Mozilla/5.0 (test)".to_string(),
                    languages: vec!["en-US".to_string()],
                    screen_width: 2560,
                    screen_height: 1440,
                    viewport_width: 960,
                    viewport_height: 720,
                    pixel_ratio: 2.0,
                    max_touch_points: 0,
                }),
            },
            passive: PassiveSnapshot {
                session_id: "s-1".to_string(),
                session_start: Utc::now(),
                session_duration_secs: 93.5,
                focus_returns: 2,
                scroll_events: 14,
            },
            typing: Some(TypingMetric {
                elapsed_ms: 12_340,
                keystrokes: 57,
                backspaces: 3,
            }),
            attention: Some(AttentionMetric {
                stopped_secs: 10.0,
                deviation_secs: 0.0,
            }),
            reaction_ms: Some(312),
            slider: Some(SliderResult {
                value: 48,
                target: 50,
                diff: 2,
            }),
            quiz: Some(QuizAnswer {
                value: 24.0,
                correct: true,
            }),
        }
    }

    fn all_correct_selections(items: &[ClassificationItem]) -> HashMap<String, String> {
        items
            .iter()
            .map(|item| {
                let raw = match item.category {
                    Category::Digital => "digital",
                    Category::Explicit => "explicit",
                };
                (item.id.clone(), raw.to_string())
            })
            .collect()
    }

    #[test]
    fn summary_formats_the_perfect_ten_second_stop() {
        let summary = build_summary(&sample_inputs());
        assert!(summary.contains("10 s Test: 10.00 s (deviation 0.00 s)"));
        assert!(summary.contains("Reaction: 312 ms"));
        assert!(summary.contains("Slider Target: 48 (target 50, diff 2.0)"));
        assert!(summary.contains("Session Duration: 93.50 s"));
    }

    #[test]
    fn summary_uses_placeholders_for_missing_metrics() {
        let mut inputs = sample_inputs();
        inputs.reaction_ms = None;
        inputs.device.client = None;

        let summary = build_summary(&inputs);
        assert!(summary.contains("Reaction: —"));
        assert!(summary.contains("User Agent: —"));
    }

    #[test]
    fn classification_has_eight_items_with_fixed_ground_truth() {
        let items = build_classification_items(&sample_inputs());
        assert_eq!(items.len(), 8);

        let digital: Vec<&str> = items
            .iter()
            .filter(|i| i.category == Category::Digital)
            .map(|i| i.id.as_str())
            .collect();
        assert_eq!(digital, vec!["device", "session", "focus"]);
    }

    #[test]
    fn grading_all_correct_scores_eight_of_eight() {
        let items = build_classification_items(&sample_inputs());
        let report = grade(&items, &all_correct_selections(&items)).unwrap();

        assert_eq!(report.correct_count, 8);
        assert_eq!(report.total, 8);
        assert!(report.results.iter().all(|r| r.correct));
        assert!(report.feedback.contains("8/8"));
    }

    #[test]
    fn grading_counts_only_exact_category_matches() {
        let items = build_classification_items(&sample_inputs());
        let mut selections = all_correct_selections(&items);
        selections.insert("device".to_string(), "explicit".to_string());
        selections.insert("quiz".to_string(), "digital".to_string());

        let report = grade(&items, &selections).unwrap();
        assert_eq!(report.correct_count, 6);
        assert!(report.correct_count <= report.total);

        let device = report.results.iter().find(|r| r.id == "device").unwrap();
        assert!(!device.correct);
        assert_eq!(device.selected, Category::Explicit);
    }

    #[test]
    fn grading_rejects_missing_or_invalid_selections() {
        let items = build_classification_items(&sample_inputs());
        let mut selections = all_correct_selections(&items);
        selections.remove("focus");
        selections.insert("slider".to_string(), "neither".to_string());

        let err = grade(&items, &selections).unwrap_err();
        assert_eq!(err.missing, vec!["focus".to_string(), "slider".to_string()]);
    }

    #[test]
    fn regrading_with_changed_selections_is_allowed() {
        let items = build_classification_items(&sample_inputs());
        let mut selections = all_correct_selections(&items);
        selections.insert("session".to_string(), "explicit".to_string());

        let first = grade(&items, &selections).unwrap();
        assert_eq!(first.correct_count, 7);

        selections.insert("session".to_string(), "digital".to_string());
        let second = grade(&items, &selections).unwrap();
        assert_eq!(second.correct_count, 8);
    }
}
