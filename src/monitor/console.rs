//! Line based replacement for the tray menu. Every line typed into the terminal is one menu entry.

use std::{io::BufRead, str::FromStr, thread};

use anyhow::{anyhow, bail, Result};
use tokio::{
    select,
    sync::{mpsc, oneshot},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    reminder::ReminderMode,
    utils::time::{format_duration, minutes},
};

use super::{
    command::{SessionCommand, Snapshot, INACTIVITY_LIMIT_PRESETS, REMINDER_INTERVAL_PRESETS},
    indicator::StatusIndicator,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuEntry {
    Mode(ReminderMode),
    ToggleMute,
    ToggleFullscreen,
    /// Reminder interval in minutes, one of [REMINDER_INTERVAL_PRESETS].
    Interval(u64),
    /// Inactivity limit in minutes, one of [INACTIVITY_LIMIT_PRESETS].
    Limit(u64),
    Status,
    Menu,
    Quit,
}

fn parse_preset(value: Option<&str>, presets: &[u64], name: &str) -> Result<u64> {
    let value = value.ok_or_else(|| anyhow!("Missing {name} in minutes"))?;
    let minutes = value.parse::<u64>()?;
    if !presets.contains(&minutes) {
        bail!("{name} must be one of {}", join_presets(presets));
    }
    Ok(minutes)
}

fn join_presets(presets: &[u64]) -> String {
    presets
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl FromStr for MenuEntry {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let entry = match words.next().map(|v| v.to_ascii_lowercase()).as_deref() {
            Some("tone") | Some("beep") => MenuEntry::Mode(ReminderMode::Tone),
            Some("speech") | Some("voice") => MenuEntry::Mode(ReminderMode::Speech),
            Some("mute") => MenuEntry::ToggleMute,
            Some("fullscreen") => MenuEntry::ToggleFullscreen,
            Some("interval") => MenuEntry::Interval(parse_preset(
                words.next(),
                &REMINDER_INTERVAL_PRESETS,
                "Reminder interval",
            )?),
            Some("limit") => MenuEntry::Limit(parse_preset(
                words.next(),
                &INACTIVITY_LIMIT_PRESETS,
                "Inactivity limit",
            )?),
            Some("status") => MenuEntry::Status,
            Some("menu") | Some("help") => MenuEntry::Menu,
            Some("quit") | Some("exit") => MenuEntry::Quit,
            Some(other) => bail!("Unknown menu entry '{other}'"),
            None => bail!("Empty input"),
        };
        if let Some(extra) = words.next() {
            bail!("Unexpected '{extra}'");
        }
        Ok(entry)
    }
}

fn check(value: bool) -> &'static str {
    if value {
        "[x]"
    } else {
        "[ ]"
    }
}

fn preset_line(presets: &[u64], selected_minutes: Option<u64>) -> String {
    presets
        .iter()
        .map(|preset| {
            if Some(*preset) == selected_minutes {
                format!("({preset})")
            } else {
                preset.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn whole_minutes(duration: std::time::Duration) -> Option<u64> {
    (duration.as_secs() % 60 == 0).then_some(duration.as_secs() / 60)
}

pub fn render_menu(snapshot: &Snapshot) -> String {
    let settings = &snapshot.settings;
    [
        StatusIndicator::render(&snapshot.status),
        format!(
            "  {} speech      use voice",
            check(settings.mode == ReminderMode::Speech)
        ),
        format!(
            "  {} tone        use beeps",
            check(settings.mode == ReminderMode::Tone)
        ),
        format!("  {} mute        muted", check(settings.muted)),
        format!(
            "  {} fullscreen  disable reminders during fullscreen apps",
            check(settings.suppress_on_fullscreen)
        ),
        format!(
            "      interval    {} minutes",
            preset_line(
                &REMINDER_INTERVAL_PRESETS,
                whole_minutes(settings.reminder_interval())
            )
        ),
        format!(
            "      limit       {} minutes",
            preset_line(
                &INACTIVITY_LIMIT_PRESETS,
                whole_minutes(settings.inactivity_limit())
            )
        ),
        "      status | menu | quit".into(),
    ]
    .join("\n")
}

pub fn render_status(snapshot: &Snapshot) -> String {
    match snapshot.next_reminder_at {
        Some(at) => format!(
            "{} (at {})",
            StatusIndicator::render(&snapshot.status),
            at.format("%H:%M")
        ),
        None => StatusIndicator::render(&snapshot.status),
    }
}

async fn request_snapshot(sender: &mpsc::Sender<SessionCommand>) -> Result<Snapshot> {
    let (reply, receiver) = oneshot::channel();
    sender.send(SessionCommand::Snapshot(reply)).await?;
    Ok(receiver.await?)
}

/// Turns an entry into the command the monitor understands. `None` for entries handled by the
/// console itself.
fn to_command(entry: MenuEntry) -> Option<SessionCommand> {
    match entry {
        MenuEntry::Mode(mode) => Some(SessionCommand::SetMode(mode)),
        MenuEntry::ToggleMute => Some(SessionCommand::ToggleMute),
        MenuEntry::ToggleFullscreen => Some(SessionCommand::ToggleFullscreenSuppression),
        MenuEntry::Interval(value) => Some(SessionCommand::SetReminderInterval(minutes(value))),
        MenuEntry::Limit(value) => Some(SessionCommand::SetInactivityLimit(minutes(value))),
        MenuEntry::Status | MenuEntry::Menu | MenuEntry::Quit => None,
    }
}

async fn handle_line(
    line: &str,
    sender: &mpsc::Sender<SessionCommand>,
    shutdown: &CancellationToken,
) -> Result<()> {
    let entry = match line.parse::<MenuEntry>() {
        Ok(entry) => entry,
        Err(e) => {
            println!("{e}");
            println!("{}", render_menu(&request_snapshot(sender).await?));
            return Ok(());
        }
    };

    if entry == MenuEntry::Quit {
        info!("Quit requested from console");
        shutdown.cancel();
        return Ok(());
    }

    if let Some(command) = to_command(entry) {
        sender.send(command).await?;
    }

    let snapshot = request_snapshot(sender).await?;
    if entry == MenuEntry::Status {
        println!("{}", render_status(&snapshot));
    } else {
        println!("{}", render_menu(&snapshot));
    }
    Ok(())
}

/// Reads stdin on its own thread. Tokio's stdin runs on the blocking pool where a pending read
/// can't be cancelled and keeps the runtime from shutting down.
fn spawn_stdin_reader() -> Result<mpsc::Receiver<String>> {
    let (sender, receiver) = mpsc::channel(16);
    thread::Builder::new()
        .name("console-input".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if sender.blocking_send(line).is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        warn!("Failed to read console input {e:?}");
                        return;
                    }
                }
            }
            debug!("Console input closed");
        })?;
    Ok(receiver)
}

/// Reads menu entries from stdin until shutdown or end of input.
pub async fn run_console(
    sender: mpsc::Sender<SessionCommand>,
    shutdown: CancellationToken,
) -> Result<()> {
    serve_console(spawn_stdin_reader()?, sender, shutdown).await
}

/// Menu loop over any source of lines.
pub async fn serve_console(
    mut lines: mpsc::Receiver<String>,
    sender: mpsc::Sender<SessionCommand>,
    shutdown: CancellationToken,
) -> Result<()> {
    let snapshot = request_snapshot(&sender).await?;
    println!("{}", render_menu(&snapshot));
    println!(
        "Reminding every {} of activity",
        format_duration(snapshot.settings.reminder_interval())
    );

    loop {
        let line = select! {
            biased;
            _ = shutdown.cancelled() => return Ok(()),
            line = lines.recv() => line,
        };
        let Some(line) = line else {
            debug!("Console input closed");
            return Ok(());
        };
        if line.trim().is_empty() {
            continue;
        }
        handle_line(&line, &sender, &shutdown).await?;
    }
}
