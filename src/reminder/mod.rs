//! Delivery of break reminders. The activity monitor only knows about [ReminderDispatcher]; the
//! system implementation picks between a short tone sequence and a spoken phrase.

pub mod speech;
pub mod tone;

use std::fmt::Display;

use clap::ValueEnum;
#[cfg(test)]
use mockall::automock;
use tracing::{info, warn};

use speech::SpeechReminder;
use tone::ToneSequence;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReminderMode {
    /// Short ascending beeps
    Tone,
    /// Spoken phrase through the system speech synthesizer
    Speech,
}

impl Display for ReminderMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReminderMode::Tone => write!(f, "tone"),
            ReminderMode::Speech => write!(f, "speech"),
        }
    }
}

/// Performs a single reminder. Fire-and-forget: failures are handled by the implementation and
/// never reach the caller.
#[cfg_attr(test, automock)]
pub trait ReminderDispatcher {
    fn remind(&mut self, mode: ReminderMode);
}

pub struct SystemReminder {
    tone: ToneSequence,
    speech: SpeechReminder,
}

impl SystemReminder {
    pub fn new(tone: ToneSequence, speech: SpeechReminder) -> Self {
        Self { tone, speech }
    }
}

impl ReminderDispatcher for SystemReminder {
    fn remind(&mut self, mode: ReminderMode) {
        info!("Reminding to take a break using {mode}");
        match mode {
            ReminderMode::Tone => {
                if let Err(e) = self.tone.play() {
                    warn!("Failed to play reminder tones {e:?}");
                }
            }
            ReminderMode::Speech => self.speech.announce(),
        }
    }
}
