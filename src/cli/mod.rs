pub mod process;

use std::{env, ffi::OsString, path::PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use process::{kill_previous_instances, restart_in_background};
use tracing::{info, level_filters::LevelFilter};

use crate::{
    monitor::{session::Settings, start_monitor, MonitorOptions},
    reminder::{
        speech::{Synthesizer, DEFAULT_PHRASE},
        ReminderMode,
    },
    utils::{
        dir::create_application_path,
        logging::{enable_logging, LOG_PREFIX},
        runtime::single_thread_runtime,
        time::minutes,
    },
};

#[derive(Parser, Debug)]
#[command(name = "ScreenBreak", version, long_about = None)]
#[command(about = "Reminds you to take a break after a long stretch of computer use", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(
        long,
        global = true,
        help = "Application directory for logs. By default $XDG_STATE_HOME/screenbreak or $HOME/.local/state/screenbreak"
    )]
    dir: Option<PathBuf>,
    #[arg(long, global = true, help = "Log level, defaults to RUST_LOG or debug")]
    log: Option<LevelFilter>,
    /// This option is for debugging purposes only.
    #[arg(long = "log-console", global = true)]
    log_console: bool,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Run in the current console with an interactive menu")]
    Run {
        #[command(flatten)]
        session: SessionArgs,
        #[arg(long, help = "Don't read menu commands from stdin or print the status indicator")]
        background: bool,
    },
    #[command(about = "Replace running instances with one detached from the console")]
    Start {
        #[command(flatten)]
        session: SessionArgs,
    },
    #[command(about = "Stop running instances")]
    Stop {},
}

/// Initial session settings. Nothing is persisted, every launch starts from these.
#[derive(clap::Args, Debug, Clone, PartialEq, Eq)]
pub struct SessionArgs {
    #[arg(long, value_enum, default_value_t = ReminderMode::Speech)]
    mode: ReminderMode,
    #[arg(
        long,
        default_value_t = 60,
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Minutes of activity between reminders"
    )]
    interval: u64,
    #[arg(
        long = "inactivity-limit",
        default_value_t = 10,
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Minutes without input after which you count as away"
    )]
    inactivity_limit: u64,
    #[arg(long, help = "Start muted")]
    muted: bool,
    #[arg(long = "allow-fullscreen", help = "Remind even while a fullscreen app is in front")]
    allow_fullscreen: bool,
    #[arg(long, default_value = DEFAULT_PHRASE, help = "Phrase spoken in speech mode")]
    phrase: String,
    #[arg(
        long = "speech-command",
        help = "Program speaking its last argument. Defaults to PowerShell, say or espeak depending on the platform"
    )]
    speech_command: Option<String>,
}

impl SessionArgs {
    fn to_options(&self, interactive: bool) -> Result<MonitorOptions> {
        let mut settings = Settings::new(minutes(self.interval), minutes(self.inactivity_limit))?;
        settings.mode = self.mode;
        settings.muted = self.muted;
        settings.suppress_on_fullscreen = !self.allow_fullscreen;

        Ok(MonitorOptions {
            settings,
            phrase: self.phrase.clone(),
            synthesizer: self
                .speech_command
                .as_deref()
                .map(Synthesizer::from_program)
                .unwrap_or_default(),
            interactive,
        })
    }

    /// Arguments reproducing these settings on the `run` command line.
    fn to_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--mode".into(),
            self.mode.to_string().into(),
            "--interval".into(),
            self.interval.to_string().into(),
            "--inactivity-limit".into(),
            self.inactivity_limit.to_string().into(),
            "--phrase".into(),
            self.phrase.clone().into(),
        ];
        if self.muted {
            args.push("--muted".into());
        }
        if self.allow_fullscreen {
            args.push("--allow-fullscreen".into());
        }
        if let Some(command) = &self.speech_command {
            args.extend(["--speech-command".into(), command.into()]);
        }
        args
    }
}

pub fn run_cli() -> Result<()> {
    let args = Args::parse();

    let app_dir = create_application_path(args.dir.clone())?;
    let show_std = args.log_console || !matches!(args.commands, Commands::Run { .. });
    enable_logging(LOG_PREFIX, &app_dir, args.log, show_std)?;

    match args.commands {
        Commands::Run {
            session,
            background,
        } => {
            let options = session.to_options(!background)?;
            single_thread_runtime()?.block_on(start_monitor(options))
        }
        Commands::Start { session } => {
            // Validate before anything is stopped.
            session.to_options(false)?;
            let mut forwarded: Vec<OsString> = vec!["run".into(), "--background".into()];
            forwarded.extend(session.to_args());
            forwarded.extend(["--dir".into(), app_dir.into_os_string()]);
            if let Some(level) = args.log {
                forwarded.extend(["--log".into(), level.to_string().into()]);
            }
            restart_in_background(forwarded)?;
            println!("Started screenbreak in the background");
            Ok(())
        }
        Commands::Stop {} => {
            let stopped = kill_previous_instances(&env::current_exe()?)?;
            info!("Stopped {stopped} instances");
            println!("Stopped {stopped} running instance(s)");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use clap::Parser;
    use tracing::level_filters::LevelFilter;

    use super::{Args, Commands, SessionArgs};
    use crate::reminder::{speech::Synthesizer, ReminderMode};

    fn parse_run(args: &[&str]) -> SessionArgs {
        let args = Args::try_parse_from(["screenbreak", "run"].iter().chain(args)).unwrap();
        match args.commands {
            Commands::Run { session, .. } => session,
            other => panic!("Parsed unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_defaults() {
        let options = parse_run(&[]).to_options(true).unwrap();

        assert_eq!(options.settings.mode, ReminderMode::Speech);
        assert_eq!(
            options.settings.reminder_interval(),
            Duration::from_secs(3600)
        );
        assert_eq!(options.settings.inactivity_limit(), Duration::from_secs(600));
        assert!(!options.settings.muted);
        assert!(options.settings.suppress_on_fullscreen);
        assert_eq!(options.phrase, "Blink");
        assert!(options.interactive);
    }

    #[test]
    fn test_flags() {
        let options = parse_run(&[
            "--mode",
            "tone",
            "--interval",
            "30",
            "--inactivity-limit",
            "5",
            "--muted",
            "--allow-fullscreen",
            "--speech-command",
            "spd-say",
        ])
        .to_options(false)
        .unwrap();

        assert_eq!(options.settings.mode, ReminderMode::Tone);
        assert_eq!(
            options.settings.reminder_interval(),
            Duration::from_secs(1800)
        );
        assert_eq!(options.settings.inactivity_limit(), Duration::from_secs(300));
        assert!(options.settings.muted);
        assert!(!options.settings.suppress_on_fullscreen);
        assert_eq!(options.synthesizer, Synthesizer::Program("spd-say".into()));
    }

    #[test]
    fn test_rejects_zero_minutes() {
        assert!(Args::try_parse_from(["screenbreak", "run", "--interval", "0"]).is_err());
        assert!(Args::try_parse_from(["screenbreak", "start", "--inactivity-limit", "0"]).is_err());
    }

    #[test]
    fn test_forwarded_args_reproduce_settings() {
        let session = parse_run(&["--mode", "tone", "--muted", "--phrase", "Look away"]);

        let forwarded = session
            .to_args()
            .into_iter()
            .map(|v| v.into_string().unwrap())
            .collect::<Vec<_>>();
        let forwarded = forwarded.iter().map(String::as_str).collect::<Vec<_>>();

        assert_eq!(parse_run(&forwarded), session);
    }

    #[test]
    fn test_log_level_flag() {
        let args = Args::try_parse_from(["screenbreak", "run", "--log", "trace"]).unwrap();
        assert_eq!(args.log, Some(LevelFilter::TRACE));

        let args = Args::try_parse_from(["screenbreak", "--log", "warn", "stop"]).unwrap();
        assert_eq!(args.log, Some(LevelFilter::WARN));
        assert!(Args::try_parse_from(["screenbreak", "run", "--log-filter", "trace"]).is_err());
    }
}
