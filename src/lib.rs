use once_cell::sync::Lazy;
use std::sync::{Arc, Mutex};

pub mod config;
pub mod episode;
pub mod error;
pub mod executor;
pub mod init;
pub mod planner;
pub mod schedule;
pub mod scoring;
pub mod store;

pub use config::Config;
pub use episode::{EpisodeRecord, GroupKey};
pub use error::PlannerError;
pub use planner::{Optimiser, PlannedVideo};
pub use schedule::{ScheduleManager, SlotOverflow};
pub use store::{EpisodeStore, JsonEpisodeStore, MemoryEpisodeStore};

pub type PlannerLogHook = Arc<Mutex<dyn Fn(&str) + Send + Sync + 'static>>;

static LOG_HOOK: Lazy<Mutex<Option<PlannerLogHook>>> = Lazy::new(|| Mutex::new(None));

/// Mirrors every tagged log line to `hook` in addition to `tracing`.
pub fn set_log_hook(hook: Option<PlannerLogHook>) {
    if let Ok(mut guard) = LOG_HOOK.lock() {
        *guard = hook;
    }
}

pub(crate) fn logv(tag: &str, message: &str) {
    match tag {
        "WARN" => tracing::warn!("{}", message),
        _ => tracing::info!("{}", message),
    }

    if let Ok(guard) = LOG_HOOK.lock() {
        if let Some(hook) = guard.as_ref() {
            if let Ok(callback) = hook.lock() {
                let line = format!("[{}] {}", tag, message);
                callback(&line);
            }
        }
    }
}

pub(crate) fn logi(message: impl AsRef<str>) {
    logv("INFO", message.as_ref());
}

pub(crate) fn logok(message: impl AsRef<str>) {
    logv("OK", message.as_ref());
}

pub(crate) fn logw(message: impl AsRef<str>) {
    logv("WARN", message.as_ref());
}
