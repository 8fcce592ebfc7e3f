//! Background utility that notices long stretches of computer use and reminds you to take a break.
//! Reminders pause while you are away from the keyboard and, optionally, while a fullscreen app is
//! in front.
//!

pub mod cli;
pub mod desktop_api;
pub mod monitor;
pub mod reminder;
pub mod utils;
