use std::time::Duration;

use activity::ActivityMonitor;
use anyhow::Result;
use command::SessionCommand;
use indicator::StatusIndicator;
use session::{SessionState, Settings};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
    desktop_api::{DesktopApi, GenericDesktopApi},
    reminder::{
        speech::{SpeechReminder, Synthesizer},
        tone::ToneSequence,
        ReminderDispatcher, SystemReminder,
    },
    utils::clock::{Clock, DefaultClock},
};

pub mod activity;
pub mod command;
pub mod console;
pub mod indicator;
pub mod session;
pub mod shutdown;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Everything needed to start a monitor. Nothing here outlives the process.
#[derive(Debug, Clone)]
pub struct MonitorOptions {
    pub settings: Settings,
    pub phrase: String,
    pub synthesizer: Synthesizer,
    /// Read menu commands from stdin and print the status indicator.
    pub interactive: bool,
}

/// Represents the starting point for the monitor
pub async fn start_monitor(options: MonitorOptions) -> Result<()> {
    let (sender, receiver) = mpsc::channel::<SessionCommand>(10);
    let desktop = GenericDesktopApi::new()
        .inspect_err(|e| error!("Failed to connect to the desktop {e:?}"))?;
    let dispatcher = SystemReminder::new(
        ToneSequence::default(),
        SpeechReminder::new(&options.phrase, options.synthesizer),
    );

    let shutdown_token = CancellationToken::new();

    info!("Starting with {:?}", options.settings);
    let monitor = create_monitor(
        options.settings,
        desktop,
        dispatcher,
        receiver,
        &shutdown_token,
        options.interactive,
        DefaultClock,
    );

    let (_, monitor_result, console_result) = tokio::join!(
        shutdown::detect_shutdown(shutdown_token.clone()),
        monitor.run(),
        async {
            if options.interactive {
                console::run_console(sender, shutdown_token.clone()).await
            } else {
                drop(sender);
                Ok(())
            }
        },
    );

    if let Err(console_result) = console_result {
        error!("Console got an error {:?}", console_result);
    }

    monitor_result.inspect_err(|e| error!("Activity monitor got an error {e:?}"))
}

fn create_monitor(
    settings: Settings,
    desktop: impl DesktopApi + 'static,
    dispatcher: impl ReminderDispatcher + 'static,
    receiver: mpsc::Receiver<SessionCommand>,
    shutdown_token: &CancellationToken,
    show_indicator: bool,
    clock: impl Clock,
) -> ActivityMonitor {
    let session = SessionState::new(settings, clock.instant());
    ActivityMonitor::new(
        session,
        Box::new(desktop),
        Box::new(dispatcher),
        receiver,
        shutdown_token.clone(),
        DEFAULT_POLL_INTERVAL,
        Box::new(clock),
        StatusIndicator::new(show_indicator),
    )
}
