//! The activity state machine. [SessionState] is fed one idle sample per poll and decides whether
//! the user has earned a reminder.

use std::{fmt::Display, time::Duration};

use anyhow::{bail, Result};
use tokio::time::Instant;

use crate::reminder::ReminderMode;

pub const DEFAULT_REMINDER_INTERVAL: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_INACTIVITY_LIMIT: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Active,
    Inactive,
}

impl Display for Activity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Activity::Active => write!(f, "Active"),
            Activity::Inactive => write!(f, "Inactive"),
        }
    }
}

/// User facing configuration of a session. Intervals are always positive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    reminder_interval: Duration,
    inactivity_limit: Duration,
    pub muted: bool,
    pub suppress_on_fullscreen: bool,
    pub mode: ReminderMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            reminder_interval: DEFAULT_REMINDER_INTERVAL,
            inactivity_limit: DEFAULT_INACTIVITY_LIMIT,
            muted: false,
            suppress_on_fullscreen: true,
            mode: ReminderMode::Speech,
        }
    }
}

impl Settings {
    pub fn new(reminder_interval: Duration, inactivity_limit: Duration) -> Result<Self> {
        let mut settings = Self::default();
        settings.set_reminder_interval(reminder_interval)?;
        settings.set_inactivity_limit(inactivity_limit)?;
        Ok(settings)
    }

    pub fn reminder_interval(&self) -> Duration {
        self.reminder_interval
    }

    pub fn inactivity_limit(&self) -> Duration {
        self.inactivity_limit
    }

    fn set_reminder_interval(&mut self, interval: Duration) -> Result<()> {
        if interval.is_zero() {
            bail!("Reminder interval must be positive");
        }
        self.reminder_interval = interval;
        Ok(())
    }

    pub fn set_inactivity_limit(&mut self, limit: Duration) -> Result<()> {
        if limit.is_zero() {
            bail!("Inactivity limit must be positive");
        }
        self.inactivity_limit = limit;
        Ok(())
    }
}

/// What a single tick decided about reminders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// User is away, the clock was reset.
    Inactive,
    /// Foreground window is fullscreen, the clock was reset.
    Suppressed,
    /// Not yet time. Holds the time left until the next reminder.
    Pending(Duration),
    /// A reminder is due and should be delivered in the given mode.
    Remind(ReminderMode),
    /// A reminder was due but the session is muted.
    Muted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// Set when the tick changed the activity state.
    pub transition: Option<Activity>,
    pub decision: Decision,
}

/// Text shown next to the status indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Active {
        active_for: Duration,
        next_reminder_in: Duration,
    },
    Inactive {
        idle_for: Duration,
    },
}

impl Status {
    pub fn activity(&self) -> Activity {
        match self {
            Status::Active { .. } => Activity::Active,
            Status::Inactive { .. } => Activity::Inactive,
        }
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use crate::utils::time::format_duration;

        match self {
            Status::Active {
                active_for,
                next_reminder_in,
            } => write!(
                f,
                "ScreenBreak: Active for {}, next reminder in {}",
                format_duration(*active_for),
                format_duration(*next_reminder_in)
            ),
            Status::Inactive { idle_for } => write!(
                f,
                "ScreenBreak: Inactive, last input {} ago",
                format_duration(*idle_for)
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionState {
    settings: Settings,
    activity: Activity,
    last_reminder: Instant,
    active_since: Option<Instant>,
    last_idle: Duration,
}

impl SessionState {
    pub fn new(settings: Settings, now: Instant) -> Self {
        Self {
            settings,
            activity: Activity::Inactive,
            last_reminder: now,
            active_since: None,
            last_idle: Duration::ZERO,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn activity(&self) -> Activity {
        self.activity
    }

    pub fn last_reminder(&self) -> Instant {
        self.last_reminder
    }

    /// Advances the state machine with a fresh idle sample. `is_fullscreen` is only called when
    /// the answer matters.
    pub fn tick(
        &mut self,
        now: Instant,
        idle: Duration,
        is_fullscreen: impl FnOnce() -> bool,
    ) -> TickReport {
        self.last_idle = idle;

        if idle > self.settings.inactivity_limit {
            let transition = self.transition_to(Activity::Inactive);
            self.active_since = None;
            self.last_reminder = now;
            return TickReport {
                transition,
                decision: Decision::Inactive,
            };
        }

        let transition = self.transition_to(Activity::Active);
        if transition.is_some() {
            self.active_since = Some(now);
            self.last_reminder = now;
        }

        let decision = if self.settings.suppress_on_fullscreen && is_fullscreen() {
            self.last_reminder = now;
            Decision::Suppressed
        } else {
            let elapsed = now.saturating_duration_since(self.last_reminder);
            if elapsed >= self.settings.reminder_interval {
                self.last_reminder = now;
                if self.settings.muted {
                    Decision::Muted
                } else {
                    Decision::Remind(self.settings.mode)
                }
            } else {
                Decision::Pending(self.settings.reminder_interval - elapsed)
            }
        };

        TickReport {
            transition,
            decision,
        }
    }

    fn transition_to(&mut self, activity: Activity) -> Option<Activity> {
        if self.activity == activity {
            return None;
        }
        self.activity = activity;
        Some(activity)
    }

    pub fn status(&self, now: Instant) -> Status {
        match (self.activity, self.active_since) {
            (Activity::Active, Some(active_since)) => Status::Active {
                active_for: now.saturating_duration_since(active_since),
                next_reminder_in: self
                    .settings
                    .reminder_interval
                    .saturating_sub(now.saturating_duration_since(self.last_reminder)),
            },
            _ => Status::Inactive {
                idle_for: self.last_idle,
            },
        }
    }

    pub fn set_mode(&mut self, mode: ReminderMode) {
        self.settings.mode = mode;
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.settings.muted = muted;
    }

    pub fn set_suppress_on_fullscreen(&mut self, suppress: bool) {
        self.settings.suppress_on_fullscreen = suppress;
    }

    /// Changing the interval restarts the countdown so the change itself never fires a reminder.
    pub fn set_reminder_interval(&mut self, interval: Duration, now: Instant) -> Result<()> {
        self.settings.set_reminder_interval(interval)?;
        self.last_reminder = now;
        Ok(())
    }

    pub fn set_inactivity_limit(&mut self, limit: Duration) -> Result<()> {
        self.settings.set_inactivity_limit(limit)
    }
}
