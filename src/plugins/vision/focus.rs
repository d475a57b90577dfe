//! Focus switching before a capture.
//!
//! Sending the switch chord changes which window is current on the user's
//! desktop. Nothing here can undo that, so callers that only want pixels
//! should not go through a [`FocusSwitcher`].

use std::time::Duration;

use super::error::VisionError;

/// Brings the "next" window to the foreground.
pub trait FocusSwitcher {
    fn switch_focus(&self) -> Result<(), VisionError>;
}

/// Modifier held while Tab is pressed to cycle windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchModifier {
    Alt,
    /// Cmd on macOS
    Command,
}

impl SwitchModifier {
    pub fn for_platform() -> Self {
        if cfg!(target_os = "macos") {
            Self::Command
        } else {
            Self::Alt
        }
    }

    pub fn chord(&self) -> &'static str {
        match self {
            Self::Alt => "alt+tab",
            Self::Command => "cmd+tab",
        }
    }

    #[cfg(feature = "desktop")]
    fn key(&self) -> enigo::Key {
        match self {
            Self::Alt => enigo::Key::Alt,
            Self::Command => enigo::Key::Meta,
        }
    }
}

/// Sends the platform's window-switch chord (Alt+Tab, or Cmd+Tab on macOS)
/// through the OS input queue, then waits for the window manager to settle.
#[derive(Debug, Clone)]
pub struct AltTabSwitcher {
    modifier: SwitchModifier,
    settle: Duration,
}

impl AltTabSwitcher {
    pub fn new(settle: Duration) -> Self {
        Self {
            modifier: SwitchModifier::for_platform(),
            settle,
        }
    }

    pub fn modifier(&self) -> SwitchModifier {
        self.modifier
    }
}

impl FocusSwitcher for AltTabSwitcher {
    #[cfg(feature = "desktop")]
    fn switch_focus(&self) -> Result<(), VisionError> {
        use enigo::{Direction, Enigo, Key, Keyboard, Settings};

        let modifier = self.modifier.key();

        let mut enigo = Enigo::new(&Settings::default())
            .map_err(|e| VisionError::FocusSwitch(format!("{:?}", e)))?;

        enigo
            .key(modifier, Direction::Press)
            .map_err(|e| VisionError::FocusSwitch(format!("{:?}", e)))?;
        let tab = enigo.key(Key::Tab, Direction::Click);
        // Always release the modifier, even if Tab failed, so it is not left stuck.
        let release = enigo.key(modifier, Direction::Release);
        tab.map_err(|e| VisionError::FocusSwitch(format!("{:?}", e)))?;
        release.map_err(|e| VisionError::FocusSwitch(format!("{:?}", e)))?;

        log::info!(
            "Sent focus switch ({}), settling {:?}",
            self.modifier.chord(),
            self.settle
        );
        std::thread::sleep(self.settle);
        Ok(())
    }

    #[cfg(not(feature = "desktop"))]
    fn switch_focus(&self) -> Result<(), VisionError> {
        let _ = (self.modifier, self.settle);
        Err(VisionError::FocusSwitch(
            "keyboard input requires the `desktop` feature".to_string(),
        ))
    }
}

/// Leaves focus alone; the currently focused window is captured as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepFocus;

impl FocusSwitcher for KeepFocus {
    fn switch_focus(&self) -> Result<(), VisionError> {
        Ok(())
    }
}
