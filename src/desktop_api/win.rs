use anyhow::{anyhow, Result};
use tracing::error;
use windows::Win32::{
    Foundation::RECT,
    Graphics::Gdi::{GetMonitorInfoW, MonitorFromWindow, MONITORINFO, MONITOR_DEFAULTTONEAREST},
    System::SystemInformation::GetTickCount64,
    UI::{
        Input::KeyboardAndMouse::{GetLastInputInfo, LASTINPUTINFO},
        WindowsAndMessaging::{GetForegroundWindow, GetWindowRect},
    },
};

use super::{DesktopApi, ForegroundGeometry, Rect};

impl From<RECT> for Rect {
    fn from(value: RECT) -> Self {
        Rect::new(value.left, value.top, value.right, value.bottom)
    }
}

#[tracing::instrument]
pub fn get_foreground_geometry() -> Result<Option<ForegroundGeometry>> {
    let window = unsafe { GetForegroundWindow() };
    if window.is_invalid() {
        return Ok(None);
    }

    let mut window_rect = RECT::default();
    unsafe { GetWindowRect(window, &mut window_rect) }
        .inspect_err(|e| error!("Failed to get foreground window bounds {e:?}"))?;

    let monitor = unsafe { MonitorFromWindow(window, MONITOR_DEFAULTTONEAREST) };
    if monitor.is_invalid() {
        return Err(anyhow!("No monitor found for the foreground window"));
    }

    let mut monitor_info = MONITORINFO {
        cbSize: size_of::<MONITORINFO>() as u32,
        ..Default::default()
    };
    let is_success = unsafe { GetMonitorInfoW(monitor, &mut monitor_info) };
    if !is_success.as_bool() {
        return Err(anyhow!("Failed to retrieve monitor info"));
    }

    Ok(Some(ForegroundGeometry {
        window: window_rect.into(),
        monitor: monitor_info.rcMonitor.into(),
    }))
}

pub fn get_idle_time() -> Result<u32> {
    let mut last: LASTINPUTINFO = LASTINPUTINFO {
        cbSize: size_of::<LASTINPUTINFO>() as u32,
        dwTime: 0,
    };
    let is_success = unsafe { GetLastInputInfo(&mut last) };
    if !is_success.as_bool() {
        error!("Failed to retrieve user idle time");
        return Err(anyhow!("Failed to retrieve user idle time"));
    }

    // dwTime wraps every ~49.7 days, so compare against the low half of the 64 bit tick count.
    let tick_count = unsafe { GetTickCount64() } as u32;
    Ok(tick_count.wrapping_sub(last.dwTime))
}

pub struct WindowsDesktopApi {}

impl WindowsDesktopApi {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for WindowsDesktopApi {
    fn default() -> Self {
        Self::new()
    }
}

impl DesktopApi for WindowsDesktopApi {
    fn get_idle_time(&mut self) -> Result<u32> {
        get_idle_time().inspect_err(|e| error!("Failed to get idle time {e:?}"))
    }

    fn get_foreground_geometry(&mut self) -> Result<Option<ForegroundGeometry>> {
        get_foreground_geometry()
    }
}
