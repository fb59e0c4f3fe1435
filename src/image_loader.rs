// Image source module
// Resolves the image argument and reads natural dimensions for the initial fit

use anyhow::{bail, Context, Result};
use image::ImageFormat;
use log::warn;
use std::fmt;
use std::path::{Path, PathBuf};

/// Where the overlay image comes from. Fixed for the lifetime of one overlay window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Absolute, canonical path on the local filesystem
    File(PathBuf),
    /// Anything the view can load by URI (http, data, asset protocols)
    Uri(String),
}

impl ImageSource {
    /// Resolve a user-supplied path or URI
    pub fn resolve(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            bail!("No image provided");
        }

        if is_uri(input) {
            return Ok(ImageSource::Uri(input.to_string()));
        }

        let path = Path::new(input)
            .canonicalize()
            .with_context(|| format!("Failed to resolve image path: {}", input))?;
        if !path.is_file() {
            bail!("Not a file: {}", path.display());
        }

        let supported = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(format_from_extension)
            .is_some();
        if !supported {
            warn!("Unrecognised image extension, the view may fail to load {}", path.display());
        }

        Ok(ImageSource::File(path))
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            ImageSource::File(path) => Some(path),
            ImageSource::Uri(_) => None,
        }
    }
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSource::File(path) => write!(f, "{}", path.display()),
            ImageSource::Uri(uri) => f.write_str(uri),
        }
    }
}

/// Read the natural (width, height) of a local image without decoding the pixels
pub fn read_dimensions(source: &ImageSource) -> Result<(u32, u32)> {
    let Some(path) = source.as_path() else {
        bail!("Cannot read dimensions of a remote image: {}", source);
    };
    image::image_dimensions(path)
        .with_context(|| format!("Failed to read image header: {}", path.display()))
}

/// Get the appropriate image format from file extension
pub fn format_from_extension(ext: &str) -> Option<ImageFormat> {
    match ext.to_lowercase().as_str() {
        "png" => Some(ImageFormat::Png),
        "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
        "gif" => Some(ImageFormat::Gif),
        "webp" => Some(ImageFormat::WebP),
        "bmp" => Some(ImageFormat::Bmp),
        "ico" => Some(ImageFormat::Ico),
        "tiff" | "tif" => Some(ImageFormat::Tiff),
        _ => None,
    }
}

fn is_uri(input: &str) -> bool {
    if input.starts_with("data:") {
        return true;
    }
    // Single-letter schemes would swallow Windows drive letters
    match input.split_once("://") {
        Some((scheme, _)) => {
            scheme.len() > 1
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn uris_are_kept_verbatim() {
        let source = ImageSource::resolve("https://example.com/ref.png").unwrap();
        assert_eq!(source, ImageSource::Uri("https://example.com/ref.png".to_string()));
        assert!(matches!(
            ImageSource::resolve("data:image/png;base64,AAAA").unwrap(),
            ImageSource::Uri(_)
        ));
    }

    #[test]
    fn dotted_paths_resolve_to_canonical_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ref.png");
        RgbaImage::from_pixel(4, 3, Rgba([0, 0, 0, 255])).save(&path).unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let dotted = dir.path().join("sub").join("..").join(".").join("ref.png");

        let source = ImageSource::resolve(dotted.to_str().unwrap()).unwrap();
        let resolved = source.as_path().unwrap();
        assert!(resolved.is_absolute());
        assert!(!resolved.components().any(|c| matches!(
            c,
            std::path::Component::ParentDir | std::path::Component::CurDir
        )));
        assert_eq!(resolved, path.canonicalize().unwrap());
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.png");
        assert!(ImageSource::resolve(missing.to_str().unwrap()).is_err());
        assert!(ImageSource::resolve("   ").is_err());
    }

    #[test]
    fn directories_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ImageSource::resolve(dir.path().to_str().unwrap()).is_err());
    }

    #[test]
    fn reads_natural_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.png");
        RgbaImage::from_pixel(40, 30, Rgba([255, 0, 0, 255])).save(&path).unwrap();

        let source = ImageSource::resolve(path.to_str().unwrap()).unwrap();
        assert_eq!(read_dimensions(&source).unwrap(), (40, 30));
    }

    #[test]
    fn remote_images_have_no_local_dimensions() {
        let source = ImageSource::Uri("https://example.com/ref.png".to_string());
        assert!(read_dimensions(&source).is_err());
    }

    #[test]
    fn extension_lookup_ignores_case() {
        assert_eq!(format_from_extension("JPG"), Some(ImageFormat::Jpeg));
        assert_eq!(format_from_extension("txt"), None);
    }
}
