use ansi_term::Colour;

use super::session::{Activity, Status};

/// Console stand-in for the tray icon: a colored dot followed by the status text.
pub struct StatusIndicator {
    enabled: bool,
}

impl StatusIndicator {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn render(status: &Status) -> String {
        let dot = match status.activity() {
            Activity::Active => Colour::Green.bold().paint("●"),
            Activity::Inactive => Colour::Fixed(245).paint("●"),
        };
        format!("{dot} {status}")
    }

    pub fn show(&self, status: &Status) {
        if self.enabled {
            println!("{}", Self::render(status));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::StatusIndicator;
    use crate::monitor::session::Status;

    #[test]
    fn test_render_contains_status_text() {
        let rendered = StatusIndicator::render(&Status::Active {
            active_for: Duration::from_secs(90),
            next_reminder_in: Duration::from_secs(30),
        });
        assert!(rendered.contains("●"));
        assert!(rendered.ends_with("ScreenBreak: Active for 1m 30s, next reminder in 30s"));
    }
}
