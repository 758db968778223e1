use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

// Scroll/focus forwards fire constantly while the page is in use.
const ENABLE_LOGS: bool = false;

use crate::log_info;

/// Counters that accumulate without any deliberate user action: the
/// "digital exhaust" half of the demo.
#[derive(Debug)]
struct PassiveState {
    focus_returns: u32,
    scroll_events: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassiveSnapshot {
    pub session_id: String,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: f64,
    pub focus_returns: u32,
    pub scroll_events: u32,
}

/// Page-lifetime passive signal tracker. Cheap to clone; all clones share
/// the same counters.
#[derive(Clone)]
pub struct PassiveSignals {
    session_id: String,
    session_start: DateTime<Utc>,
    anchor: Instant,
    inner: Arc<Mutex<PassiveState>>,
}

impl PassiveSignals {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            session_start: Utc::now(),
            anchor: Instant::now(),
            inner: Arc::new(Mutex::new(PassiveState {
                focus_returns: 0,
                scroll_events: 0,
            })),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Called when the webview regains visibility.
    pub fn record_focus_return(&self) {
        let mut state = self.inner.lock().unwrap();
        state.focus_returns += 1;
        log_info!("focus return #{}", state.focus_returns);
    }

    pub fn record_scroll_event(&self) {
        let mut state = self.inner.lock().unwrap();
        state.scroll_events += 1;
        log_info!("scroll event #{}", state.scroll_events);
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.anchor.elapsed().as_millis() as f64 / 1000.0
    }

    /// Reads the counters at a single instant. The duration is evaluated
    /// here, not updated live afterwards.
    pub fn snapshot(&self) -> PassiveSnapshot {
        let state = self.inner.lock().unwrap();
        PassiveSnapshot {
            session_id: self.session_id.clone(),
            session_start: self.session_start,
            session_duration_secs: self.elapsed_secs(),
            focus_returns: state.focus_returns,
            scroll_events: state.scroll_events,
        }
    }
}
