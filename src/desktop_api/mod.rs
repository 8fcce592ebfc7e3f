//! Contains the queries screenbreak makes against the desktop environment.
//! [GenericDesktopApi] is the main artifact of this module that abstracts
//! the platform backends, while [is_fullscreen] holds the geometry decision shared by all of them.

#[cfg(feature = "win")]
pub mod win;
#[cfg(feature = "x11")]
pub mod x11;

#[cfg(feature = "win")]
extern crate windows;

#[cfg(feature = "x11")]
extern crate xcb;

use anyhow::Result;
#[cfg(test)]
use mockall::automock;
use tracing::debug;

/// Allowed difference between window and monitor edges, in pixels.
pub const EDGE_TOLERANCE: i32 = 2;

/// A window covering at least this share of its monitor counts as fullscreen.
pub const AREA_RATIO_THRESHOLD: f64 = 0.98;

/// Screen rectangle in absolute desktop coordinates. `right` and `bottom` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn from_origin(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self::new(
            x,
            y,
            x.saturating_add(width.min(i32::MAX as u32) as i32),
            y.saturating_add(height.min(i32::MAX as u32) as i32),
        )
    }

    pub fn width(&self) -> i64 {
        (self.right as i64 - self.left as i64).max(0)
    }

    pub fn height(&self) -> i64 {
        (self.bottom as i64 - self.top as i64).max(0)
    }

    /// Negative extents count as zero.
    pub fn area(&self) -> i64 {
        self.width() * self.height()
    }

    pub fn intersection_area(&self, other: &Rect) -> i64 {
        Rect::new(
            self.left.max(other.left),
            self.top.max(other.top),
            self.right.min(other.right),
            self.bottom.min(other.bottom),
        )
        .area()
    }

    fn doubled_center(&self) -> (i64, i64) {
        (
            self.left as i64 + self.right as i64,
            self.top as i64 + self.bottom as i64,
        )
    }

    fn edges_match(&self, other: &Rect, tolerance: i32) -> bool {
        let close = |a: i32, b: i32| (a as i64 - b as i64).abs() <= tolerance as i64;
        close(self.left, other.left)
            && close(self.top, other.top)
            && close(self.right, other.right)
            && close(self.bottom, other.bottom)
    }
}

/// Foreground window bounds together with the bounds of the monitor it is nearest to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForegroundGeometry {
    pub window: Rect,
    pub monitor: Rect,
}

impl ForegroundGeometry {
    pub fn is_fullscreen(&self) -> bool {
        is_fullscreen(&self.window, &self.monitor)
    }
}

/// A window is fullscreen when its edges line up with the monitor, or when it covers nearly all of
/// it. A monitor without area never has a fullscreen window.
pub fn is_fullscreen(window: &Rect, monitor: &Rect) -> bool {
    if window.edges_match(monitor, EDGE_TOLERANCE) {
        return true;
    }
    let monitor_area = monitor.area();
    if monitor_area <= 0 {
        return false;
    }
    window.area() as f64 / monitor_area as f64 >= AREA_RATIO_THRESHOLD
}

/// Picks the monitor a window belongs to: the one it overlaps the most, otherwise the one whose
/// center is closest to the window's center.
pub fn nearest_monitor(window: &Rect, monitors: &[Rect]) -> Option<Rect> {
    let overlapping = monitors
        .iter()
        .map(|monitor| (monitor.intersection_area(window), monitor))
        .filter(|(overlap, _)| *overlap > 0)
        .max_by_key(|(overlap, _)| *overlap)
        .map(|(_, monitor)| *monitor);
    if overlapping.is_some() {
        return overlapping;
    }

    let (window_x, window_y) = window.doubled_center();
    monitors
        .iter()
        .min_by_key(|monitor| {
            let (x, y) = monitor.doubled_center();
            (x - window_x).pow(2) + (y - window_y).pow(2)
        })
        .copied()
}

/// Intended to serve as a contract windows and linux backends must implement.
#[cfg_attr(test, automock)]
pub trait DesktopApi {
    /// Retrieve amount of time user has been inactive in milliseconds
    fn get_idle_time(&mut self) -> Result<u32>;

    /// Bounds of the foreground window and its monitor. `None` when there is no foreground window.
    fn get_foreground_geometry(&mut self) -> Result<Option<ForegroundGeometry>>;
}

/// Fullscreen check that never fails. Anything that goes wrong while querying geometry means
/// reminders are not suppressed.
pub fn foreground_is_fullscreen(desktop: &mut dyn DesktopApi) -> bool {
    match desktop.get_foreground_geometry() {
        Ok(Some(geometry)) => geometry.is_fullscreen(),
        Ok(None) => false,
        Err(e) => {
            debug!("Treating foreground as windowed after geometry query failure {e:?}");
            false
        }
    }
}

/// Serves as a cross-compatible DesktopApi implementation.
pub struct GenericDesktopApi {
    inner: Box<dyn DesktopApi>,
}

impl GenericDesktopApi {
    pub fn new() -> Result<Self> {
        cfg_if::cfg_if! {
            if #[cfg(feature = "win")] {
                use win::WindowsDesktopApi;
                Ok(Self {
                    inner: Box::new(WindowsDesktopApi::new()),
                })
            }
            else if #[cfg(feature = "x11")] {
                use x11::X11DesktopApi;
                Ok(Self {
                    inner: Box::new(X11DesktopApi::new()?),
                })
            }
            else {
                Err(anyhow::anyhow!(
                    "No desktop backend was compiled in. Rebuild with the `win` or `x11` feature"
                ))
            }
        }
    }
}

impl DesktopApi for GenericDesktopApi {
    fn get_idle_time(&mut self) -> Result<u32> {
        self.inner.get_idle_time()
    }

    fn get_foreground_geometry(&mut self) -> Result<Option<ForegroundGeometry>> {
        self.inner.get_foreground_geometry()
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::{
        foreground_is_fullscreen, is_fullscreen, nearest_monitor, ForegroundGeometry,
        MockDesktopApi, Rect,
    };

    const MONITOR: Rect = Rect {
        left: 0,
        top: 0,
        right: 1920,
        bottom: 1080,
    };

    #[test]
    fn test_exact_match_is_fullscreen() {
        assert!(is_fullscreen(&MONITOR, &MONITOR));
    }

    #[test]
    fn test_edges_within_tolerance() {
        let window = Rect::new(-2, 2, 1922, 1078);
        assert!(is_fullscreen(&window, &MONITOR));

        let window = Rect::new(-3, 0, 1700, 1080);
        assert!(!is_fullscreen(&window, &MONITOR));
    }

    #[test]
    fn test_area_ratio_threshold() {
        // 1920 * 1059 covers a little over 98% of the monitor.
        let window = Rect::new(0, 21, 1920, 1080);
        assert!(is_fullscreen(&window, &MONITOR));

        // Maximized window under a 40px task bar.
        let window = Rect::new(0, 0, 1920, 1040);
        assert!(!is_fullscreen(&window, &MONITOR));
    }

    #[test]
    fn test_zero_area_monitor() {
        let monitor = Rect::new(100, 100, 100, 400);
        let window = Rect::new(0, 0, 800, 600);
        assert!(!is_fullscreen(&window, &monitor));
    }

    #[test]
    fn test_inverted_rect_has_no_area() {
        assert_eq!(Rect::new(10, 10, 0, 0).area(), 0);
        assert_eq!(Rect::from_origin(5, 5, 10, 20).area(), 200);
    }

    #[test]
    fn test_nearest_monitor_prefers_largest_overlap() {
        let left = Rect::new(0, 0, 1920, 1080);
        let right = Rect::new(1920, 0, 4480, 1440);
        let window = Rect::new(1800, 100, 2600, 700);

        assert_eq!(nearest_monitor(&window, &[left, right]), Some(right));
    }

    #[test]
    fn test_nearest_monitor_falls_back_to_closest_center() {
        let left = Rect::new(0, 0, 1920, 1080);
        let right = Rect::new(1920, 0, 3840, 1080);
        let window = Rect::new(5000, 100, 5200, 300);

        assert_eq!(nearest_monitor(&window, &[left, right]), Some(right));
        assert_eq!(nearest_monitor(&window, &[]), None);
    }

    #[test]
    fn test_geometry_failures_are_not_fullscreen() {
        let mut desktop = MockDesktopApi::new();
        desktop
            .expect_get_foreground_geometry()
            .times(1)
            .returning(|| Err(anyhow!("no display")));
        assert!(!foreground_is_fullscreen(&mut desktop));

        let mut desktop = MockDesktopApi::new();
        desktop
            .expect_get_foreground_geometry()
            .times(1)
            .returning(|| Ok(None));
        assert!(!foreground_is_fullscreen(&mut desktop));

        let mut desktop = MockDesktopApi::new();
        desktop.expect_get_foreground_geometry().returning(|| {
            Ok(Some(ForegroundGeometry {
                window: MONITOR,
                monitor: MONITOR,
            }))
        });
        assert!(foreground_is_fullscreen(&mut desktop));
    }
}
