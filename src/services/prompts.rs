//! Centralized prompts and user-facing messages.
//!
//! Single source of truth for the model's system instruction and for every
//! string the session prints. Edit this file to customize wording.

// ============================================================================
// SYSTEM PROMPTS
// ============================================================================

/// System instruction sent with every analyze request
pub const SYSTEM_INSTRUCTION: &str =
    "You are a helpful assistant with expertise in image analysis.";

// ============================================================================
// SESSION MESSAGES
// ============================================================================

pub const HEADER_TITLE: &str = "AI Visual Assistant - Multimodal Image Analysis";

pub const MSG_CAPTURE_SUCCESS: &str = "Screenshot captured successfully!";
pub const MSG_NO_IMAGE: &str = "No image available. Please upload or capture an image first.";
pub const MSG_IMAGE_UNPROCESSABLE: &str = "Error: Could not process the image.";

/// Prefix of every failed model response rendered as text
pub const ERROR_RESPONSE_PREFIX: &str = "Error generating response:";

pub const HELP_TEXT: &str = "\
Commands:
  upload <path>     Load a PNG/JPEG file as the current image
  capture           Switch to the next window and capture it
  query <text>      Set the question to ask about the image
  analyze [text]    Ask the model (optionally setting the query first)
  status            Show the current image and query
  config            Show model configuration (secrets hidden)
  help              Show this help
  quit              Leave the session";

pub fn capture_failed(detail: &str) -> String {
    format!("Screenshot failed: {}", detail)
}

pub fn upload_rejected(path: &str) -> String {
    format!(
        "Unsupported file '{}'. Upload a .png, .jpg or .jpeg image.",
        path
    )
}

pub fn image_load_failed(detail: &str) -> String {
    format!("Error loading image: {}", detail)
}

pub fn error_response(detail: &str) -> String {
    format!("{} {}", ERROR_RESPONSE_PREFIX, detail)
}

pub fn results(text: &str) -> String {
    format!("Results: {}", text)
}

pub fn unknown_command(input: &str) -> String {
    format!("Unknown command '{}'. Type 'help' for the list of commands.", input)
}

pub fn header_banner() -> String {
    let rule = "=".repeat(HEADER_TITLE.len() + 4);
    format!("{rule}\n  {HEADER_TITLE}\n{rule}")
}
