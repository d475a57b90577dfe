use std::path::PathBuf;

/// Where an image to normalize comes from.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// A file on disk (the canonical image, or a user-picked file).
    Path(PathBuf),
    /// An in-memory upload buffer.
    Bytes(Vec<u8>),
}

impl ImageSource {
    pub fn describe(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Bytes(bytes) => format!("<{} bytes>", bytes.len()),
        }
    }
}

/// On-screen bounds of the foreground window at capture time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowRect {
    /// Window title used to resolve the window
    pub title: String,
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

impl WindowRect {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Outcome of a successful capture.
#[derive(Debug, Clone)]
pub struct CaptureReport {
    /// Window that was captured
    pub window: WindowRect,
}

/// Text returned by the vision model.
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Generated text, verbatim
    pub content: String,
}
