//! Filesystem storage for uploaded and annotated images.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat, RgbImage};
use tokio::fs;
use tracing::{debug, info};

use crate::error::{DetectError, StorageError, StorageResult};

/// Reject names that could escape the storage directories
pub fn validate_filename(name: &str) -> Result<&str, DetectError> {
    let invalid = name.is_empty()
        || name == "."
        || name.contains("..")
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0');
    if invalid {
        return Err(DetectError::InvalidFilename(name.to_string()));
    }
    Ok(name)
}

/// Output format for a file name, JPEG when the extension is unknown
pub fn format_for(name: &str) -> ImageFormat {
    ImageFormat::from_path(name).unwrap_or(ImageFormat::Jpeg)
}

/// Uploads and annotated outputs kept in two sibling directories
#[derive(Debug, Clone)]
pub struct ImageStore {
    uploads: PathBuf,
    processed: PathBuf,
}

impl ImageStore {
    /// Open the store, creating both directories if needed
    pub async fn open(uploads: impl Into<PathBuf>, processed: impl Into<PathBuf>) -> StorageResult<Self> {
        let store = Self {
            uploads: uploads.into(),
            processed: processed.into(),
        };
        fs::create_dir_all(&store.uploads).await?;
        fs::create_dir_all(&store.processed).await?;
        info!(
            uploads = %store.uploads.display(),
            processed = %store.processed.display(),
            "image store ready"
        );
        Ok(store)
    }

    pub fn processed_dir(&self) -> &Path {
        &self.processed
    }

    /// Persist the raw upload as received
    pub async fn save_upload(&self, name: &str, bytes: &[u8]) -> Result<(), DetectError> {
        let path = self.uploads.join(validate_filename(name)?);
        fs::write(&path, bytes).await.map_err(StorageError::from)?;
        debug!(path = %path.display(), bytes = bytes.len(), "saved upload");
        Ok(())
    }

    /// Encode and persist an annotated image under `name`
    pub async fn save(&self, name: &str, image: RgbImage) -> Result<(), DetectError> {
        let path = self.processed.join(validate_filename(name)?);
        let format = format_for(name);

        let encoded = tokio::task::spawn_blocking(move || encode(&image, format))
            .await
            .map_err(|e| StorageError::Join(e.to_string()))??;

        fs::write(&path, &encoded).await.map_err(StorageError::from)?;
        debug!(path = %path.display(), ?format, bytes = encoded.len(), "saved annotated image");
        Ok(())
    }

    /// Raw bytes of an annotated image
    pub async fn load(&self, name: &str) -> Result<Vec<u8>, DetectError> {
        let path = self.processed.join(validate_filename(name)?);
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::not_found(name).into())
            }
            Err(e) => Err(StorageError::from(e).into()),
        }
    }

    /// Decoded annotated image
    pub async fn load_image(&self, name: &str) -> Result<DynamicImage, DetectError> {
        let bytes = self.load(name).await?;
        image::load_from_memory(&bytes).map_err(|e| DetectError::Decode(e.to_string()))
    }
}

fn encode(image: &RgbImage, format: ImageFormat) -> StorageResult<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, format)
        .map_err(|e| StorageError::Encode(e.to_string()))?;
    Ok(buf.into_inner())
}
