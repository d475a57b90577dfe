use std::io::Cursor;
use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};

use super::error::VisionError;
use super::types::ImageSource;

/// Extensions accepted for uploads.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

pub fn is_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.iter().any(|s| *s == ext)
        })
        .unwrap_or(false)
}

/// Decode `source` and apply the aspect-preserving resize.
///
/// Height is recomputed as `width * (height / width)`, which keeps the
/// original size; the bitmap is only resampled if rounding ever moves it.
/// This does not bound the size of what gets sent to the model.
pub fn load_and_resize(source: &ImageSource) -> Result<DynamicImage, VisionError> {
    let image = decode(source)?;
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(VisionError::EmptyImage(source.describe()));
    }

    let aspect_ratio = height as f64 / width as f64;
    let new_height = ((width as f64 * aspect_ratio).round() as u32).max(1);

    if new_height == height {
        return Ok(image);
    }

    Ok(image.resize_exact(width, new_height, FilterType::Lanczos3))
}

/// Like [`load_and_resize`] but reports the failure and yields `None`.
pub fn normalize(source: &ImageSource) -> Option<DynamicImage> {
    match load_and_resize(source) {
        Ok(image) => Some(image),
        Err(err) => {
            log::warn!("Error loading image: {}", err);
            None
        }
    }
}

fn decode(source: &ImageSource) -> Result<DynamicImage, VisionError> {
    match source {
        ImageSource::Path(path) => {
            let name = path.display().to_string();
            let reader = ImageReader::open(path).map_err(|e| VisionError::read(&name, e))?;
            let reader = reader
                .with_guessed_format()
                .map_err(|e| VisionError::read(&name, e))?;
            check_format(reader.format(), &name)?;
            reader.decode().map_err(|e| VisionError::decode(&name, e))
        }
        ImageSource::Bytes(bytes) => {
            let name = source.describe();
            let reader = ImageReader::new(Cursor::new(bytes.as_slice()))
                .with_guessed_format()
                .map_err(|e| VisionError::read(&name, e))?;
            check_format(reader.format(), &name)?;
            reader.decode().map_err(|e| VisionError::decode(&name, e))
        }
    }
}

fn check_format(format: Option<ImageFormat>, name: &str) -> Result<(), VisionError> {
    match format {
        Some(ImageFormat::Png) | Some(ImageFormat::Jpeg) => Ok(()),
        Some(other) => Err(VisionError::decode(
            name,
            format!("unsupported format {:?} (expected PNG or JPEG)", other),
        )),
        None => Err(VisionError::decode(name, "unrecognized image format")),
    }
}

/// Encode `image` in the format implied by `path` (PNG when unknown).
pub(crate) fn encode_for_path(image: &DynamicImage, path: &Path) -> Result<Vec<u8>, VisionError> {
    let format = ImageFormat::from_path(path).unwrap_or(ImageFormat::Png);
    let format = match format {
        ImageFormat::Jpeg => ImageFormat::Jpeg,
        _ => ImageFormat::Png,
    };

    let mut buffer = Vec::new();
    let result = if format == ImageFormat::Jpeg {
        // JPEG has no alpha channel.
        DynamicImage::ImageRgb8(image.to_rgb8()).write_to(&mut Cursor::new(&mut buffer), format)
    } else {
        image.write_to(&mut Cursor::new(&mut buffer), format)
    };
    result.map_err(|e| VisionError::Encode(e.to_string()))?;
    Ok(buffer)
}

/// Replace the file at `path` with `image`.
///
/// Writes a sibling temp file first and renames it over `path`, so a failed
/// write never leaves a truncated canonical image behind.
pub fn save_canonical(image: &DynamicImage, path: &Path) -> Result<(), VisionError> {
    let bytes = encode_for_path(image, path)?;
    write_replacing(path, &bytes)
}

pub(crate) fn write_replacing(path: &Path, bytes: &[u8]) -> Result<(), VisionError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| VisionError::write(path, e))?;
    }

    let mut tmp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    std::fs::write(&tmp_path, bytes).map_err(|e| VisionError::write(&tmp_path, e))?;
    if let Err(err) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(VisionError::write(path, err));
    }
    Ok(())
}
