use std::fs;
use std::sync::RwLock;

use chrono::{DateTime, Local, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use sysinfo::System;

/// Host-side half of the device snapshot, captured once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostSnapshot {
    pub platform: String,
    pub os_version: String,
    pub arch: String,
    pub cpu_cores: Option<usize>,
    pub memory_gb: Option<f64>,
    pub locale: String,
    pub timezone: String,
    pub local_time: String,
    pub captured_at: DateTime<Utc>,
}

/// Webview-side half, reported exactly once by the frontend at load.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSnapshot {
    pub user_agent: String,
    pub languages: Vec<String>,
    pub screen_width: u32,
    pub screen_height: u32,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub pixel_ratio: f64,
    pub max_touch_points: u32,
}

impl ClientSnapshot {
    pub fn touch_support(&self) -> bool {
        self.max_touch_points > 0
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSnapshot {
    pub host: HostSnapshot,
    pub client: Option<ClientSnapshot>,
}

/// Read-once store for the device snapshot. The host half is immutable after
/// construction; the client half accepts exactly one report.
pub struct DeviceStore {
    host: HostSnapshot,
    client: RwLock<Option<ClientSnapshot>>,
}

impl DeviceStore {
    pub fn capture() -> Self {
        let sys = System::new_all();

        let platform = System::name().unwrap_or_else(|| std::env::consts::OS.to_string());
        let os_version = System::long_os_version().unwrap_or_else(|| "unknown".to_string());

        let cpu_cores = match sys.cpus().len() {
            0 => None,
            n => Some(n),
        };
        let memory_bytes = sys.total_memory();
        let memory_gb = if memory_bytes == 0 {
            None
        } else {
            Some((memory_bytes as f64 / (1024.0 * 1024.0 * 1024.0) * 10.0).round() / 10.0)
        };

        let host = HostSnapshot {
            platform,
            os_version,
            arch: std::env::consts::ARCH.to_string(),
            cpu_cores,
            memory_gb,
            locale: resolve_locale(),
            timezone: resolve_timezone(),
            local_time: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            captured_at: Utc::now(),
        };

        Self {
            host,
            client: RwLock::new(None),
        }
    }

    pub fn host(&self) -> HostSnapshot {
        self.host.clone()
    }

    /// Accepts the webview environment report. Only the first report is kept;
    /// later ones are dropped so the snapshot stays read-once.
    pub fn report_client(&self, snapshot: ClientSnapshot) -> bool {
        let mut guard = self.client.write().unwrap();
        if guard.is_some() {
            warn!("client environment already reported; ignoring duplicate");
            return false;
        }
        *guard = Some(snapshot);
        true
    }

    pub fn snapshot(&self) -> DeviceSnapshot {
        DeviceSnapshot {
            host: self.host.clone(),
            client: self.client.read().unwrap().clone(),
        }
    }
}

fn resolve_locale() -> String {
    for key in ["LC_ALL", "LC_MESSAGES", "LANG"] {
        if let Ok(value) = std::env::var(key) {
            if !value.is_empty() && value != "C" {
                // "en_US.UTF-8" -> "en_US"
                return value.split('.').next().unwrap_or(&value).to_string();
            }
        }
    }
    "unknown".to_string()
}

/// Best-effort IANA timezone name. Falls back to "unknown" rather than
/// propagating a failure.
fn resolve_timezone() -> String {
    if let Ok(tz) = std::env::var("TZ") {
        if !tz.is_empty() {
            return tz;
        }
    }

    if let Ok(tz) = fs::read_to_string("/etc/timezone") {
        let tz = tz.trim();
        if !tz.is_empty() {
            return tz.to_string();
        }
    }

    // macOS and most Linux distros symlink /etc/localtime into the zoneinfo db.
    if let Ok(target) = fs::read_link("/etc/localtime") {
        let target = target.to_string_lossy();
        if let Some(idx) = target.find("zoneinfo/") {
            return target[idx + "zoneinfo/".len()..].to_string();
        }
    }

    "unknown".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_client() -> ClientSnapshot {
        ClientSnapshot {
            user_agent: "Mozilla/5.0 (test)".to_string(),
            languages: vec!["en-US".to_string(), "en".to_string()],
            screen_width: 2560,
            screen_height: 1440,
            viewport_width: 960,
            viewport_height: 720,
            pixel_ratio: 2.0,
            max_touch_points: 0,
        }
    }

    #[test]
    fn capture_never_panics_and_fills_fallbacks() {
        let store = DeviceStore::capture();
        let host = store.host();
        assert!(!host.platform.is_empty());
        assert!(!host.timezone.is_empty());
        assert!(!host.local_time.is_empty());
    }

    #[test]
    fn client_report_is_read_once() {
        let store = DeviceStore::capture();
        assert!(store.snapshot().client.is_none());

        assert!(store.report_client(sample_client()));

        let mut second = sample_client();
        second.user_agent = "Mozilla/5.0 (other)".to_string();
        assert!(!store.report_client(second));

        let kept = store.snapshot().client.unwrap();
        assert_eq!(kept.user_agent, "Mozilla/5.0 (test)");
        assert!(!kept.touch_support());
    }
}
