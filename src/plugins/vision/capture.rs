use std::path::Path;

use image::DynamicImage;

use super::error::VisionError;
use super::focus::FocusSwitcher;
use super::normalize;
use super::types::{CaptureReport, WindowRect};

/// OS window lookup and pixel capture.
pub trait WindowSource {
    /// Bounds of the current foreground window, resolved by its title.
    /// `Ok(None)` when no titled foreground window exists.
    fn foreground_window(&self) -> Result<Option<WindowRect>, VisionError>;

    /// Capture the screen pixels inside `rect`.
    fn capture_region(&self, rect: &WindowRect) -> Result<DynamicImage, VisionError>;
}

/// Switches to the next window and saves what it shows as the canonical image.
pub struct ScreenCapturer {
    focus: Box<dyn FocusSwitcher>,
    windows: Box<dyn WindowSource>,
}

impl ScreenCapturer {
    pub fn new(focus: Box<dyn FocusSwitcher>, windows: Box<dyn WindowSource>) -> Self {
        Self { focus, windows }
    }

    /// Capture the foreground window into `path`, replacing any prior image.
    ///
    /// On any error the file at `path` is left untouched.
    pub fn capture_to(&self, path: &Path) -> Result<CaptureReport, VisionError> {
        self.focus.switch_focus()?;

        let window = self
            .windows
            .foreground_window()?
            .ok_or(VisionError::NoForegroundWindow)?;
        if window.is_empty() {
            return Err(VisionError::capture(format!(
                "Window '{}' has an empty area",
                window.title
            )));
        }

        let image = self.windows.capture_region(&window)?;
        normalize::save_canonical(&image, path)?;

        log::info!(
            "Captured '{}' ({}x{} at {},{}) -> {}",
            window.title,
            window.width,
            window.height,
            window.left,
            window.top,
            path.display()
        );

        Ok(CaptureReport { window })
    }
}

/// Shell surfaces that are never a capture target
#[cfg_attr(not(feature = "desktop"), allow(dead_code))]
const SKIP_TITLES: &[&str] = &["Program Manager", "Task View", "Task Switching"];

#[cfg_attr(not(feature = "desktop"), allow(dead_code))]
fn should_skip_window(title: &str) -> bool {
    let title_lower = title.to_lowercase();

    if SKIP_TITLES
        .iter()
        .any(|&s| title_lower == s.to_lowercase())
    {
        return true;
    }

    title.trim().is_empty()
}

/// Pick the first window whose title matches `title`, preferring exact matches.
#[cfg_attr(not(feature = "desktop"), allow(dead_code))]
fn find_by_title<'a>(candidates: &'a [WindowRect], title: &str) -> Option<&'a WindowRect> {
    candidates
        .iter()
        .find(|w| w.title == title)
        .or_else(|| candidates.iter().find(|w| w.title.contains(title)))
}

/// Translate a desktop-space rectangle into pixel bounds on a monitor image.
///
/// `monitor_origin`/`monitor_size` are in desktop units and `image_size` is
/// the captured monitor bitmap, which is larger on scaled displays.
#[cfg_attr(not(feature = "desktop"), allow(dead_code))]
fn crop_bounds(
    rect: &WindowRect,
    monitor_origin: (i32, i32),
    monitor_size: (u32, u32),
    image_size: (u32, u32),
) -> Option<(u32, u32, u32, u32)> {
    if monitor_size.0 == 0 || monitor_size.1 == 0 {
        return None;
    }
    let scale_x = image_size.0 as f64 / monitor_size.0 as f64;
    let scale_y = image_size.1 as f64 / monitor_size.1 as f64;

    let left = ((rect.left - monitor_origin.0) as f64 * scale_x).round() as i64;
    let top = ((rect.top - monitor_origin.1) as f64 * scale_y).round() as i64;
    let right = left + (rect.width as f64 * scale_x).round() as i64;
    let bottom = top + (rect.height as f64 * scale_y).round() as i64;

    let x0 = left.clamp(0, image_size.0 as i64);
    let y0 = top.clamp(0, image_size.1 as i64);
    let x1 = right.clamp(0, image_size.0 as i64);
    let y1 = bottom.clamp(0, image_size.1 as i64);

    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some((x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32))
}

/// Window lookup and capture backed by `xcap` (and Win32 for the
/// foreground title on Windows).
#[derive(Debug, Clone, Copy, Default)]
pub struct DesktopWindows;

#[cfg(feature = "desktop")]
impl DesktopWindows {
    fn all_windows() -> Result<Vec<(WindowRect, bool)>, VisionError> {
        use xcap::Window;

        let windows =
            Window::all().map_err(|e| VisionError::capture(format!("Failed to enumerate windows: {}", e)))?;

        Ok(windows
            .into_iter()
            .filter_map(|w| {
                let title = w.title().ok()?;
                if w.is_minimized().unwrap_or(false) || should_skip_window(&title) {
                    return None;
                }
                let rect = WindowRect {
                    title,
                    left: w.x().ok()?,
                    top: w.y().ok()?,
                    width: w.width().ok()?,
                    height: w.height().ok()?,
                };
                Some((rect, w.is_focused().unwrap_or(false)))
            })
            .collect())
    }

    #[cfg(target_os = "windows")]
    fn foreground_title() -> Option<String> {
        use windows::Win32::UI::WindowsAndMessaging::{GetForegroundWindow, GetWindowTextW};

        let hwnd = unsafe { GetForegroundWindow() };
        if hwnd.is_invalid() {
            return None;
        }
        let mut buf = [0u16; 512];
        let len = unsafe { GetWindowTextW(hwnd, &mut buf) };
        if len <= 0 {
            return None;
        }
        Some(String::from_utf16_lossy(&buf[..len as usize]))
    }

    #[cfg(not(target_os = "windows"))]
    fn foreground_title() -> Option<String> {
        let windows = Self::all_windows().ok()?;
        windows
            .into_iter()
            .find(|(_, focused)| *focused)
            .map(|(rect, _)| rect.title)
    }
}

#[cfg(feature = "desktop")]
impl WindowSource for DesktopWindows {
    fn foreground_window(&self) -> Result<Option<WindowRect>, VisionError> {
        let Some(title) = Self::foreground_title().filter(|t| !should_skip_window(t)) else {
            return Ok(None);
        };

        let candidates: Vec<WindowRect> =
            Self::all_windows()?.into_iter().map(|(rect, _)| rect).collect();
        Ok(find_by_title(&candidates, &title).cloned())
    }

    fn capture_region(&self, rect: &WindowRect) -> Result<DynamicImage, VisionError> {
        use xcap::Monitor;

        let monitor = Monitor::from_point(rect.left, rect.top)
            .or_else(|_| {
                let cx = rect.left + (rect.width / 2) as i32;
                let cy = rect.top + (rect.height / 2) as i32;
                Monitor::from_point(cx, cy)
            })
            .map_err(|e| VisionError::capture(format!("Failed to locate monitor: {}", e)))?;

        let origin = (
            monitor.x().map_err(|e| VisionError::capture(e.to_string()))?,
            monitor.y().map_err(|e| VisionError::capture(e.to_string()))?,
        );
        let size = (
            monitor.width().map_err(|e| VisionError::capture(e.to_string()))?,
            monitor.height().map_err(|e| VisionError::capture(e.to_string()))?,
        );

        let buffer = monitor
            .capture_image()
            .map_err(|e| VisionError::capture(format!("Failed to capture screen: {}", e)))?;

        let (x, y, w, h) = crop_bounds(rect, origin, size, buffer.dimensions()).ok_or_else(|| {
            VisionError::capture(format!("Window '{}' is outside the visible screen", rect.title))
        })?;

        Ok(DynamicImage::ImageRgba8(
            image::imageops::crop_imm(&buffer, x, y, w, h).to_image(),
        ))
    }
}

#[cfg(not(feature = "desktop"))]
impl WindowSource for DesktopWindows {
    fn foreground_window(&self) -> Result<Option<WindowRect>, VisionError> {
        Err(VisionError::capture(
            "Screen capture requires the `desktop` feature",
        ))
    }

    fn capture_region(&self, _rect: &WindowRect) -> Result<DynamicImage, VisionError> {
        Err(VisionError::capture(
            "Screen capture requires the `desktop` feature",
        ))
    }
}
