use std::path::Path;

use thiserror::Error;

use crate::services::prompts;

use super::error::VisionError;
use super::normalize::load_and_resize;
use super::types::{Analysis, ImageSource};
use super::vlm::VisionModel;

/// Why an analyze request produced no text.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The canonical image could not be loaded; the model was not called.
    #[error("{0}")]
    Image(VisionError),
    /// The model call itself failed.
    #[error("{0}")]
    Model(VisionError),
}

/// Render a query outcome the way the session displays it: the generated
/// text, or a single-line failure message.
pub fn render_legacy(result: &Result<Analysis, QueryError>) -> String {
    match result {
        Ok(analysis) => analysis.content.clone(),
        Err(QueryError::Image(_)) => prompts::MSG_IMAGE_UNPROCESSABLE.to_string(),
        Err(QueryError::Model(err)) => prompts::error_response(&err.to_string()),
    }
}

/// Owns the model client for the lifetime of the session.
pub struct QueryClient<M> {
    model: M,
}

impl<M: VisionModel> QueryClient<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Ask `prompt` about the image at `image_path`. One outbound call, no retry.
    pub async fn ask(&self, prompt: &str, image_path: &Path) -> Result<Analysis, QueryError> {
        let image = load_and_resize(&ImageSource::Path(image_path.to_path_buf())).map_err(|e| {
            log::warn!("Error loading image for analysis: {}", e);
            QueryError::Image(e)
        })?;

        let content = self.model.generate(prompt, &image).await.map_err(|e| {
            log::warn!("Model request failed: {}", e);
            // Encoding the image for the request is still an image failure.
            if e.is_image_error() {
                QueryError::Image(e)
            } else {
                QueryError::Model(e)
            }
        })?;

        Ok(Analysis { content })
    }
}
