use thiserror::Error;

/// Failures raised by the capture, normalize and model stages.
#[derive(Debug, Error)]
pub enum VisionError {
    #[error("Failed to read image '{source_name}': {message}")]
    Read { source_name: String, message: String },

    #[error("Failed to decode image '{source_name}': {message}")]
    Decode { source_name: String, message: String },

    #[error("Image '{0}' has no pixels")]
    EmptyImage(String),

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("Failed to write image '{path}': {message}")]
    Write { path: String, message: String },

    #[error("Could not capture the active window.")]
    NoForegroundWindow,

    #[error("Failed to switch focus: {0}")]
    FocusSwitch(String),

    #[error("{0}")]
    Capture(String),

    #[error("API key is required (set GEMINI_API_KEY)")]
    MissingApiKey,

    #[error("Model request failed: {0}")]
    Request(String),

    #[error("Model API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse model response: {0}")]
    ResponseParse(String),
}

impl VisionError {
    pub fn capture(message: impl Into<String>) -> Self {
        Self::Capture(message.into())
    }

    pub(crate) fn decode(source_name: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Decode {
            source_name: source_name.into(),
            message: err.to_string(),
        }
    }

    pub(crate) fn read(source_name: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Read {
            source_name: source_name.into(),
            message: err.to_string(),
        }
    }

    pub(crate) fn write(path: &std::path::Path, err: impl std::fmt::Display) -> Self {
        Self::Write {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }

    /// True for failures of the image itself rather than of the desktop or network.
    pub fn is_image_error(&self) -> bool {
        matches!(
            self,
            Self::Read { .. } | Self::Decode { .. } | Self::EmptyImage(_) | Self::Encode(_)
        )
    }
}

impl From<reqwest::Error> for VisionError {
    fn from(err: reqwest::Error) -> Self {
        Self::Request(err.to_string())
    }
}
