mod device;
mod report;
mod session;
mod tasks;
mod utils;

use device::{ClientSnapshot, DeviceSnapshot, DeviceStore};
use log::info;
use rand::Rng;
use report::commands::{evaluate_classification, finish_session};
use report::ReportStore;
use session::PassiveSignals;
use tasks::attention::AttentionController;
use tasks::commands::{
    attention_start, attention_stop, get_slider_target, get_task_progress, get_typing_target,
    quiz_submit, reaction_press, slider_input, slider_pointer_down, slider_pointer_up,
    slider_start, typing_check, typing_input, typing_keydown,
};
use tasks::quiz::QuizController;
use tasks::reaction::ReactionController;
use tasks::slider::{SliderController, TARGET_MAX, TARGET_MIN};
use tasks::typing::TypingController;
use tasks::CompletionTracker;
use tauri::{Manager, State};

pub(crate) struct AppState {
    pub(crate) device: DeviceStore,
    pub(crate) passive: PassiveSignals,
    pub(crate) tracker: CompletionTracker,
    pub(crate) typing: TypingController,
    pub(crate) attention: AttentionController,
    pub(crate) reaction: ReactionController,
    pub(crate) slider: SliderController,
    pub(crate) quiz: QuizController,
    pub(crate) report: ReportStore,
}

#[tauri::command]
fn get_device_snapshot(state: State<AppState>) -> DeviceSnapshot {
    state.device.snapshot()
}

/// One-time environment report from the webview (user agent, screen,
/// viewport, pixel ratio, touch points). Returns false for duplicates.
#[tauri::command]
fn report_client_environment(state: State<AppState>, snapshot: ClientSnapshot) -> bool {
    state.device.report_client(snapshot)
}

#[tauri::command]
fn record_focus_return(state: State<AppState>) {
    state.passive.record_focus_return();
}

#[tauri::command]
fn record_scroll_event(state: State<AppState>) {
    state.passive.record_scroll_event();
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("ExhaustLab starting up...");

    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .setup(|app| {
            let device = DeviceStore::capture();
            let passive = PassiveSignals::new();
            let tracker = CompletionTracker::new();

            // Drawn once per session; the slider challenge keeps it fixed.
            let slider_target = rand::thread_rng().gen_range(TARGET_MIN..=TARGET_MAX);

            let handle = app.handle().clone();
            info!(
                "session {} started (slider target {})",
                passive.session_id(),
                slider_target
            );

            app.manage(AppState {
                device,
                typing: TypingController::new(handle.clone(), tracker.clone()),
                attention: AttentionController::new(handle.clone(), tracker.clone()),
                reaction: ReactionController::new(handle.clone(), tracker.clone()),
                slider: SliderController::new(handle.clone(), tracker.clone(), slider_target),
                quiz: QuizController::new(handle, tracker.clone()),
                tracker,
                passive,
                report: ReportStore::new(),
            });

            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            get_device_snapshot,
            report_client_environment,
            record_focus_return,
            record_scroll_event,
            get_task_progress,
            get_typing_target,
            typing_keydown,
            typing_input,
            typing_check,
            attention_start,
            attention_stop,
            reaction_press,
            get_slider_target,
            slider_start,
            slider_input,
            slider_pointer_down,
            slider_pointer_up,
            quiz_submit,
            finish_session,
            evaluate_classification,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
