use std::{process::Stdio, sync::Arc, time::Duration};

use tokio::process::Command;
use tracing::{debug, warn};

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

pub const DEFAULT_PHRASE: &str = "Blink";

/// Program used to speak a phrase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Synthesizer {
    /// Windows built-in System.Speech driven through PowerShell.
    PowerShell,
    /// Any program that speaks its last argument, like `say` or `espeak`.
    Program(String),
}

impl Default for Synthesizer {
    fn default() -> Self {
        cfg_if::cfg_if! {
            if #[cfg(windows)] {
                Synthesizer::PowerShell
            } else if #[cfg(target_os = "macos")] {
                Synthesizer::Program("say".into())
            } else {
                Synthesizer::Program("espeak".into())
            }
        }
    }
}

impl Synthesizer {
    pub fn from_program(program: &str) -> Self {
        if program.eq_ignore_ascii_case("powershell") {
            Synthesizer::PowerShell
        } else {
            Synthesizer::Program(program.into())
        }
    }
}

/// Quotes text for use inside a single-quoted PowerShell string.
pub fn escape_powershell_literal(text: &str) -> String {
    text.replace('\'', "''")
}

/// Speaks a phrase a few times in a background task. Nothing is awaited by the caller and
/// failures only end up in the logs.
#[derive(Debug, Clone)]
pub struct SpeechReminder {
    phrase: Arc<str>,
    repeat: u32,
    pause: Duration,
    synthesizer: Synthesizer,
}

impl SpeechReminder {
    pub fn new(phrase: &str, synthesizer: Synthesizer) -> Self {
        Self {
            phrase: phrase.into(),
            repeat: 2,
            pause: Duration::from_millis(150),
            synthesizer,
        }
    }

    /// Command speaking the phrase once.
    pub fn utterance_command(&self) -> Command {
        let mut command = match &self.synthesizer {
            Synthesizer::PowerShell => {
                let script = format!(
                    "Add-Type -AssemblyName System.Speech; \
                     (New-Object System.Speech.Synthesis.SpeechSynthesizer).Speak('{}')",
                    escape_powershell_literal(&self.phrase)
                );
                let mut command = Command::new("powershell");
                command.args([
                    "-NoProfile",
                    "-ExecutionPolicy",
                    "Bypass",
                    "-Command",
                    script.as_str(),
                ]);
                command
            }
            Synthesizer::Program(program) => {
                let mut command = Command::new(program);
                command.arg(&*self.phrase);
                command
            }
        };
        #[cfg(windows)]
        command.creation_flags(CREATE_NO_WINDOW);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        command
    }

    pub fn announce(&self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("Speech reminder requires a tokio runtime");
            return;
        };
        let speech = self.clone();
        runtime.spawn(async move { speech.speak_repeatedly().await });
    }

    /// Returns how many times the synthesizer was started. The first failure ends the loop.
    async fn speak_repeatedly(self) -> u32 {
        let mut started = 0;
        for index in 0..self.repeat {
            if index > 0 {
                tokio::time::sleep(self.pause).await;
            }
            started += 1;
            match self.utterance_command().status().await {
                Ok(status) if status.success() => debug!("Spoke reminder phrase"),
                Ok(status) => {
                    warn!("Speech synthesizer exited with {status}");
                    break;
                }
                Err(e) => {
                    warn!("Failed to start speech synthesizer {:?}: {e:?}", self.synthesizer);
                    break;
                }
            }
        }
        started
    }
}
