//! Vision "plugin" (crate-local module).
//!
//! - Normalizes images from disk or upload buffers.
//! - Captures the foreground window into the canonical image file.
//! - Sends an image plus prompt to a remote vision-language model.

mod capture;
mod error;
mod focus;
mod normalize;
mod query;
mod types;
mod vlm;

pub use capture::{DesktopWindows, ScreenCapturer, WindowSource};
pub use error::VisionError;
pub use focus::{AltTabSwitcher, FocusSwitcher, KeepFocus, SwitchModifier};
pub use normalize::{
    is_supported_extension, load_and_resize, normalize, save_canonical, SUPPORTED_EXTENSIONS,
};
pub use query::{render_legacy, QueryClient, QueryError};
pub use types::{Analysis, CaptureReport, ImageSource, WindowRect};
pub use vlm::{GeminiClient, OpenAiCompatClient, RemoteModel, VisionModel};
