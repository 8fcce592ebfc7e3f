use std::time::Duration;

use anyhow::Result;
use chrono::TimeDelta;
use tokio::{sync::mpsc, time::Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, trace, warn};

use crate::{
    desktop_api::{foreground_is_fullscreen, DesktopApi},
    reminder::ReminderDispatcher,
    utils::clock::Clock,
};

use super::{
    command::{SessionCommand, Snapshot},
    indicator::StatusIndicator,
    session::{Decision, SessionState, Status, TickReport},
};

/// Owns the session and drives it: samples the desktop on a fixed cadence, applies user commands
/// in between and hands due reminders to the dispatcher.
pub struct ActivityMonitor {
    session: SessionState,
    desktop: Box<dyn DesktopApi>,
    dispatcher: Box<dyn ReminderDispatcher>,
    commands: mpsc::Receiver<SessionCommand>,
    shutdown: CancellationToken,
    poll_interval: Duration,
    time_provider: Box<dyn Clock>,
    indicator: StatusIndicator,
}

impl ActivityMonitor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session: SessionState,
        desktop: Box<dyn DesktopApi>,
        dispatcher: Box<dyn ReminderDispatcher>,
        commands: mpsc::Receiver<SessionCommand>,
        shutdown: CancellationToken,
        poll_interval: Duration,
        time_provider: Box<dyn Clock>,
        indicator: StatusIndicator,
    ) -> Self {
        Self {
            session,
            desktop,
            dispatcher,
            commands,
            shutdown,
            poll_interval,
            time_provider,
            indicator,
        }
    }

    fn sample(&mut self) -> Result<TickReport> {
        let idle_ms = self.desktop.get_idle_time()?;
        let now = self.time_provider.instant();
        let desktop = &mut self.desktop;
        Ok(self.session.tick(
            now,
            Duration::from_millis(idle_ms as u64),
            || foreground_is_fullscreen(desktop.as_mut()),
        ))
    }

    fn poll(&mut self) {
        let report = match self.sample() {
            Ok(report) => report,
            Err(e) => {
                error!("Encountered an error during idle sampling {:?}", e);
                return;
            }
        };

        if let Some(activity) = report.transition {
            info!("User is now {activity}");
            self.indicator
                .show(&self.session.status(self.time_provider.instant()));
        }

        match report.decision {
            Decision::Remind(mode) => {
                let _span = info_span!("Delivering reminder").entered();
                self.dispatcher.remind(mode);
            }
            Decision::Muted => info!("Reminder is due but muted"),
            Decision::Suppressed => debug!("Fullscreen window in foreground, postponing reminder"),
            Decision::Pending(remaining) => trace!("Next reminder in {remaining:?}"),
            Decision::Inactive => trace!("User is away"),
        }
    }

    fn snapshot(&self, now: Instant) -> Snapshot {
        let status = self.session.status(now);
        let next_reminder_at = match status {
            Status::Active {
                next_reminder_in, ..
            } => TimeDelta::from_std(next_reminder_in)
                .ok()
                .map(|delta| self.time_provider.time() + delta),
            Status::Inactive { .. } => None,
        };
        Snapshot {
            settings: self.session.settings().clone(),
            status,
            next_reminder_at,
        }
    }

    fn handle_command(&mut self, command: SessionCommand) {
        debug!("Applying command {:?}", command);
        let now = self.time_provider.instant();
        match command {
            SessionCommand::SetMode(mode) => {
                self.session.set_mode(mode);
                info!("Reminder mode set to {mode}");
            }
            SessionCommand::ToggleMute => {
                let muted = !self.session.settings().muted;
                self.session.set_muted(muted);
                info!("Muted set to {muted}");
            }
            SessionCommand::ToggleFullscreenSuppression => {
                let suppress = !self.session.settings().suppress_on_fullscreen;
                self.session.set_suppress_on_fullscreen(suppress);
                info!("Fullscreen suppression set to {suppress}");
            }
            SessionCommand::SetReminderInterval(interval) => {
                match self.session.set_reminder_interval(interval, now) {
                    Ok(()) => info!("Reminder interval set to {interval:?}"),
                    Err(e) => warn!("Rejected reminder interval {e:?}"),
                }
            }
            SessionCommand::SetInactivityLimit(limit) => {
                match self.session.set_inactivity_limit(limit) {
                    Ok(()) => info!("Inactivity limit set to {limit:?}"),
                    Err(e) => warn!("Rejected inactivity limit {e:?}"),
                }
            }
            SessionCommand::Snapshot(reply) => {
                if reply.send(self.snapshot(now)).is_err() {
                    debug!("Snapshot requester went away");
                }
            }
        }
    }

    /// Executes the monitor event loop.
    pub async fn run(mut self) -> Result<()> {
        let mut poll_point = self.time_provider.instant();
        loop {
            self.poll();
            poll_point += self.poll_interval;

            loop {
                let command = tokio::select! {
                    _ = self.shutdown.cancelled() => {
                        info!("Stopping activity monitor");
                        return Ok(())
                    }
                    Some(command) = self.commands.recv() => Some(command),
                    _ = self.time_provider.sleep_until(poll_point) => None,
                };
                match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use anyhow::{anyhow, Result};
    use mockall::predicate::eq;
    use tokio::{
        sync::{mpsc, oneshot},
        time::Instant,
    };
    use tokio_util::sync::CancellationToken;

    use super::ActivityMonitor;
    use crate::{
        desktop_api::{ForegroundGeometry, MockDesktopApi, Rect},
        monitor::{
            command::SessionCommand,
            indicator::StatusIndicator,
            session::{SessionState, Settings, Status},
        },
        reminder::{MockReminderDispatcher, ReminderMode},
        utils::{clock::DefaultClock, logging::TEST_LOGGING},
    };

    const POLL: Duration = Duration::from_secs(2);

    fn monitor(
        settings: Settings,
        desktop: MockDesktopApi,
        dispatcher: MockReminderDispatcher,
        shutdown: &CancellationToken,
    ) -> (ActivityMonitor, mpsc::Sender<SessionCommand>) {
        let (sender, receiver) = mpsc::channel(10);
        let monitor = ActivityMonitor::new(
            SessionState::new(settings, Instant::now()),
            Box::new(desktop),
            Box::new(dispatcher),
            receiver,
            shutdown.clone(),
            POLL,
            Box::new(DefaultClock),
            StatusIndicator::new(false),
        );
        (monitor, sender)
    }

    fn busy_desktop() -> MockDesktopApi {
        let mut desktop = MockDesktopApi::new();
        desktop.expect_get_idle_time().returning(|| Ok(0));
        desktop.expect_get_foreground_geometry().returning(|| Ok(None));
        desktop
    }

    async fn snapshot(sender: &mpsc::Sender<SessionCommand>) -> Result<super::Snapshot> {
        let (reply, receiver) = oneshot::channel();
        sender.send(SessionCommand::Snapshot(reply)).await?;
        Ok(receiver.await?)
    }

    #[tokio::test(start_paused = true)]
    async fn smoke_test_monitor() -> Result<()> {
        *TEST_LOGGING;
        let settings = Settings::new(Duration::from_secs(10), Duration::from_secs(60))?;
        let mut dispatcher = MockReminderDispatcher::new();
        dispatcher
            .expect_remind()
            .with(eq(ReminderMode::Speech))
            .times(2)
            .return_const(());

        let shutdown = CancellationToken::new();
        let (monitor, _sender) = monitor(settings, busy_desktop(), dispatcher, &shutdown);

        let (result, _) = tokio::join!(monitor.run(), async {
            tokio::time::sleep(Duration::from_secs(21)).await;
            shutdown.cancel();
        });

        result
    }

    #[tokio::test(start_paused = true)]
    async fn test_fullscreen_window_blocks_reminders() -> Result<()> {
        *TEST_LOGGING;
        let settings = Settings::new(Duration::from_secs(4), Duration::from_secs(60))?;
        let screen = Rect::new(0, 0, 1280, 720);
        let mut desktop = MockDesktopApi::new();
        desktop.expect_get_idle_time().returning(|| Ok(500));
        desktop.expect_get_foreground_geometry().returning(move || {
            Ok(Some(ForegroundGeometry {
                window: screen,
                monitor: screen,
            }))
        });
        let mut dispatcher = MockReminderDispatcher::new();
        dispatcher.expect_remind().times(0);

        let shutdown = CancellationToken::new();
        let (monitor, _sender) = monitor(settings, desktop, dispatcher, &shutdown);

        let (result, _) = tokio::join!(monitor.run(), async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            shutdown.cancel();
        });

        result
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_query_failure_skips_tick() -> Result<()> {
        *TEST_LOGGING;
        let settings = Settings::new(Duration::from_secs(2), Duration::from_secs(60))?;
        let mut desktop = MockDesktopApi::new();
        desktop
            .expect_get_idle_time()
            .returning(|| Err(anyhow!("screensaver extension missing")));
        desktop.expect_get_foreground_geometry().times(0);
        let mut dispatcher = MockReminderDispatcher::new();
        dispatcher.expect_remind().times(0);

        let shutdown = CancellationToken::new();
        let (monitor, sender) = monitor(settings, desktop, dispatcher, &shutdown);

        let (result, status) = tokio::join!(monitor.run(), async {
            tokio::time::sleep(Duration::from_secs(9)).await;
            let status = snapshot(&sender).await.map(|s| s.status);
            shutdown.cancel();
            status
        });
        result?;

        assert!(matches!(status?, Status::Inactive { .. }));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_commands_update_session() -> Result<()> {
        *TEST_LOGGING;
        let settings = Settings::new(Duration::from_secs(10), Duration::from_secs(60))?;
        let mut dispatcher = MockReminderDispatcher::new();
        dispatcher.expect_remind().times(0);

        let shutdown = CancellationToken::new();
        let (monitor, sender) = monitor(settings, busy_desktop(), dispatcher, &shutdown);

        let (result, snapshots) = tokio::join!(monitor.run(), async {
            let result: Result<_> = async {
                sender.send(SessionCommand::ToggleMute).await?;
                sender.send(SessionCommand::SetMode(ReminderMode::Tone)).await?;
                sender
                    .send(SessionCommand::SetInactivityLimit(Duration::from_secs(300)))
                    .await?;
                let first = snapshot(&sender).await?;

                tokio::time::sleep(Duration::from_secs(7)).await;
                sender
                    .send(SessionCommand::SetReminderInterval(Duration::from_secs(20)))
                    .await?;
                sender.send(SessionCommand::ToggleFullscreenSuppression).await?;
                let second = snapshot(&sender).await?;
                Ok((first, second))
            }
            .await;
            shutdown.cancel();
            result
        });
        result?;
        let (first, second) = snapshots?;

        assert!(first.settings.muted);
        assert_eq!(first.settings.mode, ReminderMode::Tone);
        assert_eq!(first.settings.inactivity_limit(), Duration::from_secs(300));

        assert_eq!(second.settings.reminder_interval(), Duration::from_secs(20));
        assert!(!second.settings.suppress_on_fullscreen);
        assert_eq!(
            second.status,
            Status::Active {
                active_for: Duration::from_secs(7),
                next_reminder_in: Duration::from_secs(20),
            }
        );
        assert!(second.next_reminder_at.is_some());
        Ok(())
    }
}
