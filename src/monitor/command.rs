use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::sync::oneshot;

use crate::reminder::ReminderMode;

use super::session::{Settings, Status};

/// Reminder intervals offered by the menu, in minutes.
pub const REMINDER_INTERVAL_PRESETS: [u64; 5] = [20, 30, 45, 60, 90];

/// Inactivity limits offered by the menu, in minutes.
pub const INACTIVITY_LIMIT_PRESETS: [u64; 5] = [2, 5, 10, 15, 30];

/// Changes requested by the user while the monitor is running. They are applied by the poll loop
/// between ticks.
#[derive(Debug)]
pub enum SessionCommand {
    SetMode(ReminderMode),
    ToggleMute,
    ToggleFullscreenSuppression,
    SetReminderInterval(Duration),
    SetInactivityLimit(Duration),
    Snapshot(oneshot::Sender<Snapshot>),
}

/// Copy of the session as seen by the user.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub settings: Settings,
    pub status: Status,
    pub next_reminder_at: Option<DateTime<Local>>,
}
