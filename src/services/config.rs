//! Configuration loading for the vision model and the capture pipeline.
//!
//! Secrets stay in `ModelConfig`; `PublicConfig` is safe to print.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_GEMINI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_OPENAI_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_IMAGE_PATH: &str = "picture.png";
const DEFAULT_FOCUS_SETTLE_MS: u64 = 100;
const DEFAULT_JPEG_QUALITY: u8 = 85;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    Gemini,
    OpenAI,
    Compatible,
}

/// How the image is embedded in the model request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageEncoding {
    Png,
    Jpeg { quality: u8 },
}

impl ImageEncoding {
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg { .. } => "image/jpeg",
        }
    }
}

/// Remote vision model configuration.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub provider: ModelProvider,
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub encoding: ImageEncoding,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: ModelProvider::Gemini,
            base_url: DEFAULT_GEMINI_BASE.to_string(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            encoding: ImageEncoding::Png,
        }
    }
}

/// Everything the session needs at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub model: ModelConfig,
    /// Canonical image file, overwritten on every capture/upload
    pub image_path: PathBuf,
    /// Pause after the focus switch so the new window is on top before capture
    pub focus_settle: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            image_path: PathBuf::from(DEFAULT_IMAGE_PATH),
            focus_settle: Duration::from_millis(DEFAULT_FOCUS_SETTLE_MS),
        }
    }
}

fn infer_provider(base_url: &str) -> ModelProvider {
    let base = base_url.trim().to_ascii_lowercase();
    if base.contains("generativelanguage.googleapis.com") {
        return ModelProvider::Gemini;
    }
    if base.contains("api.openai.com") {
        return ModelProvider::OpenAI;
    }
    ModelProvider::Compatible
}

fn normalize_api_base(provider: ModelProvider, base_url: &str) -> String {
    let mut base = base_url.trim().trim_end_matches('/').to_string();

    match provider {
        ModelProvider::Gemini => {
            if !base.ends_with("/v1beta") && !base.ends_with("/v1") {
                base.push_str("/v1beta");
            }
        }
        ModelProvider::OpenAI => {
            if !base.ends_with("/v1") {
                base.push_str("/v1");
            }
        }
        ModelProvider::Compatible => {}
    }

    base
}

fn parse_encoding(format: Option<String>, quality: Option<String>) -> ImageEncoding {
    let quality = quality
        .and_then(|v| v.trim().parse::<u8>().ok())
        .unwrap_or(DEFAULT_JPEG_QUALITY)
        .clamp(1, 100);

    match format
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
        .as_str()
    {
        "jpeg" | "jpg" => ImageEncoding::Jpeg { quality },
        _ => ImageEncoding::Png,
    }
}

/// Build the config from a variable lookup.
///
/// Reads:
/// - `AI_PROVIDER` (`gemini` | `openai` | `compatible`, inferred from the base URL otherwise)
/// - `AI_BASE_URL`
/// - `GEMINI_API_KEY` (fallback: `AI_API_KEY`, `OPENAI_API_KEY`)
/// - `AI_MODEL`
/// - `ASSIST_IMAGE_PATH`, `ASSIST_FOCUS_SETTLE_MS`
/// - `VLM_IMAGE_FORMAT`, `VLM_JPEG_QUALITY`
pub fn config_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppConfig {
    let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    let explicit_base = var("AI_BASE_URL");

    let provider = match var("AI_PROVIDER")
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
        .as_str()
    {
        "gemini" | "google" => ModelProvider::Gemini,
        "openai" => ModelProvider::OpenAI,
        "compatible" | "openai-compatible" | "openai_compatible" => ModelProvider::Compatible,
        _ => explicit_base
            .as_deref()
            .map(infer_provider)
            .unwrap_or(ModelProvider::Gemini),
    };

    let base_url = explicit_base.unwrap_or_else(|| match provider {
        ModelProvider::Gemini => DEFAULT_GEMINI_BASE.to_string(),
        ModelProvider::OpenAI | ModelProvider::Compatible => DEFAULT_OPENAI_BASE.to_string(),
    });

    let model = ModelConfig {
        provider,
        base_url: normalize_api_base(provider, &base_url),
        api_key: var("GEMINI_API_KEY")
            .or_else(|| var("AI_API_KEY"))
            .or_else(|| var("OPENAI_API_KEY"))
            .unwrap_or_default(),
        model: var("AI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        encoding: parse_encoding(var("VLM_IMAGE_FORMAT"), var("VLM_JPEG_QUALITY")),
    };

    let focus_settle_ms = var("ASSIST_FOCUS_SETTLE_MS")
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_FOCUS_SETTLE_MS)
        .clamp(0, 5_000);

    AppConfig {
        model,
        image_path: var("ASSIST_IMAGE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_IMAGE_PATH)),
        focus_settle: Duration::from_millis(focus_settle_ms),
    }
}

/// Load configuration from `.env`/environment.
pub fn load_app_config() -> AppConfig {
    let _ = dotenvy::dotenv();
    config_from_lookup(|key| std::env::var(key).ok())
}

/// Configuration that can be shown to the user (secrets omitted).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicConfig {
    pub provider: ModelProvider,
    pub base_url: String,
    pub model: String,
    pub has_api_key: bool,
    pub image_path: String,
    pub image_encoding: ImageEncoding,
}

impl From<&AppConfig> for PublicConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            provider: config.model.provider,
            base_url: config.model.base_url.clone(),
            model: config.model.model.clone(),
            has_api_key: !config.model.api_key.is_empty(),
            image_path: config.image_path.display().to_string(),
            image_encoding: config.model.encoding,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_infer_provider() {
        assert_eq!(
            infer_provider("https://generativelanguage.googleapis.com/v1beta"),
            ModelProvider::Gemini
        );
        assert_eq!(
            infer_provider("https://api.openai.com/v1"),
            ModelProvider::OpenAI
        );
        assert_eq!(
            infer_provider("http://localhost:11434/v1"),
            ModelProvider::Compatible
        );
    }

    #[test]
    fn test_normalize_api_base() {
        assert_eq!(
            normalize_api_base(ModelProvider::Gemini, "https://generativelanguage.googleapis.com/"),
            "https://generativelanguage.googleapis.com/v1beta"
        );
        assert_eq!(
            normalize_api_base(ModelProvider::Gemini, "https://generativelanguage.googleapis.com/v1"),
            "https://generativelanguage.googleapis.com/v1"
        );
        assert_eq!(
            normalize_api_base(ModelProvider::OpenAI, "https://api.openai.com"),
            "https://api.openai.com/v1"
        );
        assert_eq!(
            normalize_api_base(ModelProvider::Compatible, "http://localhost:8080/"),
            "http://localhost:8080"
        );
    }

    #[test]
    fn test_defaults_target_gemini() {
        let config = config_from_lookup(lookup(&[]));
        assert_eq!(config.model.provider, ModelProvider::Gemini);
        assert_eq!(config.model.base_url, DEFAULT_GEMINI_BASE);
        assert_eq!(config.model.model, "gemini-2.0-flash");
        assert!(config.model.api_key.is_empty());
        assert_eq!(config.model.encoding, ImageEncoding::Png);
        assert_eq!(config.image_path, PathBuf::from("picture.png"));
        assert_eq!(config.focus_settle, Duration::from_millis(100));
    }

    #[test]
    fn test_gemini_key_takes_precedence() {
        let config = config_from_lookup(lookup(&[
            ("AI_API_KEY", "generic"),
            ("GEMINI_API_KEY", "gemini-secret"),
        ]));
        assert_eq!(config.model.api_key, "gemini-secret");

        let config = config_from_lookup(lookup(&[("GEMINI_API_KEY", "  "), ("AI_API_KEY", "generic")]));
        assert_eq!(config.model.api_key, "generic");
    }

    #[test]
    fn test_openai_provider_gets_openai_base() {
        let config = config_from_lookup(lookup(&[("AI_PROVIDER", "openai"), ("AI_MODEL", "gpt-4o")]));
        assert_eq!(config.model.provider, ModelProvider::OpenAI);
        assert_eq!(config.model.base_url, "https://api.openai.com/v1");
        assert_eq!(config.model.model, "gpt-4o");
    }

    #[test]
    fn test_provider_inferred_from_base_url() {
        let config = config_from_lookup(lookup(&[("AI_BASE_URL", "http://127.0.0.1:9000/v1")]));
        assert_eq!(config.model.provider, ModelProvider::Compatible);
        assert_eq!(config.model.base_url, "http://127.0.0.1:9000/v1");
    }

    #[test]
    fn test_encoding_and_paths() {
        let config = config_from_lookup(lookup(&[
            ("VLM_IMAGE_FORMAT", "JPEG"),
            ("VLM_JPEG_QUALITY", "900"),
            ("ASSIST_IMAGE_PATH", "/tmp/shot.png"),
            ("ASSIST_FOCUS_SETTLE_MS", "oops"),
        ]));
        assert_eq!(config.model.encoding, ImageEncoding::Jpeg { quality: 85 });
        assert_eq!(config.image_path, PathBuf::from("/tmp/shot.png"));
        assert_eq!(config.focus_settle, Duration::from_millis(100));

        assert_eq!(
            parse_encoding(Some("jpg".into()), Some("0".into())),
            ImageEncoding::Jpeg { quality: 1 }
        );
    }

    #[test]
    fn test_public_config_hides_key() {
        let config = config_from_lookup(lookup(&[("GEMINI_API_KEY", "secret")]));
        let public = PublicConfig::from(&config);
        assert!(public.has_api_key);

        let json = serde_json::to_string(&public).unwrap();
        assert!(!json.contains("secret"));
        assert!(json.contains("hasApiKey"));
    }
}
