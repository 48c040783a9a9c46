//! Upload boundary, image decoding, and the aspect-preserving resize that
//! produces the artifact sent to the model.

use crate::error::{Error, Result};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat};
use std::fs;
use std::path::Path;
use tempfile::NamedTempFile;

/// Fixed width of the preview/analysis image.
pub const TARGET_WIDTH: u32 = 500;

/// The upload boundary only admits these extensions. DICOM is accepted here
/// and handed to the decoder like everything else; decoding is delegated to
/// the codec library.
pub const ACCEPTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "dicom", "dcm"];

/// Computes the resized dimensions for a decoded image: fixed target width,
/// height rounded from the aspect ratio, never below one pixel.
pub fn resized_dimensions(width: u32, height: u32) -> (u32, u32) {
    let aspect_ratio = f64::from(width) / f64::from(height);
    let new_height = (f64::from(TARGET_WIDTH) / aspect_ratio).round().max(1.0) as u32;
    (TARGET_WIDTH, new_height)
}

/// A user-supplied image, decoded to a pixel grid. Lives for one interaction.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    name: String,
    image: DynamicImage,
}

impl UploadedImage {
    /// Reads and decodes an image, rejecting unsupported extensions before
    /// any bytes are touched.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        if !ACCEPTED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(Error::UnsupportedFormat(extension));
        }

        let bytes = fs::read(path)?;
        let image = image::load_from_memory(&bytes)?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        Ok(UploadedImage { name, image })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Scales to the fixed target width, preserving aspect ratio.
    pub fn resize_to_target(&self) -> ResizedImage {
        let (width, height) = self.image.dimensions();
        let (new_width, new_height) = resized_dimensions(width, height);
        let image = self
            .image
            .resize_exact(new_width, new_height, FilterType::Triangle);
        ResizedImage {
            width: new_width,
            height: new_height,
            image,
        }
    }
}

/// The scaled image ready to be persisted for the model call.
#[derive(Debug, Clone)]
pub struct ResizedImage {
    pub width: u32,
    pub height: u32,
    image: DynamicImage,
}

impl ResizedImage {
    /// Writes the image as PNG to a fresh per-interaction temp file and
    /// returns the owning handle.
    pub fn persist(&self) -> Result<ImageArtifact> {
        let file = tempfile::Builder::new()
            .prefix("radscan-")
            .suffix(".png")
            .tempfile()?;
        self.image.save_with_format(file.path(), ImageFormat::Png)?;
        Ok(ImageArtifact { file })
    }
}

/// A persisted image artifact on disk. Each interaction gets its own file,
/// removed when the handle is dropped, so interactions can never collide on a
/// shared path.
#[derive(Debug)]
pub struct ImageArtifact {
    file: NamedTempFile,
}

impl ImageArtifact {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn read(&self) -> Result<Vec<u8>> {
        Ok(fs::read(self.path())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use tempfile::tempdir;

    fn write_test_png(dir: &Path, name: &str, width: u32, height: u32) -> std::path::PathBuf {
        let path = dir.join(name);
        let img = RgbImage::new(width, height);
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn test_resized_dimensions_halves_wide_image() {
        // 1000x500 has aspect ratio 2.0, so the 500-wide preview is 500x250.
        assert_eq!(resized_dimensions(1000, 500), (500, 250));
    }

    #[test]
    fn test_resized_dimensions_rounds() {
        // 640x480 -> 500 / (640/480) = 375.0
        assert_eq!(resized_dimensions(640, 480), (500, 375));
        // 3x2 -> 500 / 1.5 = 333.33.. rounds down
        assert_eq!(resized_dimensions(3, 2), (500, 333));
        // 1000x999 -> 499.5 rounds up
        assert_eq!(resized_dimensions(1000, 999), (500, 500));
    }

    #[test]
    fn test_resized_height_never_below_one() {
        // An extreme banner image would otherwise round to zero height.
        let (_, height) = resized_dimensions(10_000, 5);
        assert_eq!(height, 1);
    }

    #[test]
    fn test_from_path_rejects_unsupported_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scan.gif");
        fs::write(&path, b"GIF89a").unwrap();

        let result = UploadedImage::from_path(&path);
        match result {
            Err(Error::UnsupportedFormat(ext)) => assert_eq!(ext, "gif"),
            other => panic!("expected UnsupportedFormat, got {:?}", other),
        }
    }

    #[test]
    fn test_from_path_rejects_missing_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scan");
        fs::write(&path, b"data").unwrap();
        assert!(matches!(
            UploadedImage::from_path(&path),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_from_path_rejects_undecodable_bytes() {
        // A .dicom upload passes the extension gate but the codec library
        // cannot decode it, mirroring the original behavior.
        let dir = tempdir().unwrap();
        let path = dir.path().join("scan.dicom");
        fs::write(&path, b"not an image").unwrap();
        assert!(matches!(
            UploadedImage::from_path(&path),
            Err(Error::Decode(_))
        ));
    }

    #[test]
    fn test_resize_and_persist_round_trip() {
        let dir = tempdir().unwrap();
        let path = write_test_png(dir.path(), "xray.png", 1000, 500);

        let uploaded = UploadedImage::from_path(&path).unwrap();
        assert_eq!(uploaded.dimensions(), (1000, 500));
        assert_eq!(uploaded.name(), "xray.png");

        let resized = uploaded.resize_to_target();
        assert_eq!((resized.width, resized.height), (500, 250));

        let artifact = resized.persist().unwrap();
        let loaded = image::load_from_memory(&artifact.read().unwrap()).unwrap();
        assert_eq!(loaded.dimensions(), (500, 250));
    }

    #[test]
    fn test_artifact_paths_are_unique_and_cleaned_up() {
        let dir = tempdir().unwrap();
        let path = write_test_png(dir.path(), "ct.jpg", 20, 20);
        // RgbImage::save infers JPEG from the extension.

        let uploaded = UploadedImage::from_path(&path).unwrap();
        let resized = uploaded.resize_to_target();

        let first = resized.persist().unwrap();
        let second = resized.persist().unwrap();
        assert_ne!(first.path(), second.path());

        let first_path = first.path().to_path_buf();
        drop(first);
        assert!(!first_path.exists());
        assert!(second.path().exists());
    }
}
