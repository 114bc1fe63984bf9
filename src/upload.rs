//! Uploaded image handling
//!
//! An [`UploadedImage`] is the binary payload plus its declared media type.
//! It is immutable once built; choosing a new image replaces it and starts
//! a new session.

use crate::encoding;
use crate::error::{MedraxError, Result};
use std::path::Path;

/// An image selected for analysis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    bytes: Vec<u8>,
    media_type: String,
    file_name: String,
}

impl UploadedImage {
    /// Load an image from disk
    ///
    /// The media type is sniffed from the content first and falls back to
    /// the file extension.
    ///
    /// # Errors
    ///
    /// Returns `MedraxError::FileRead` if the file cannot be read, or
    /// `MedraxError::UnsupportedMediaType` if it is not recognizably an image
    pub async fn from_path(path: &Path) -> Result<Self> {
        let bytes = encoding::read_file(path).await?;
        let media_type = detect_media_type(&bytes, path).ok_or_else(|| {
            MedraxError::UnsupportedMediaType(format!("{} is not an image", path.display()))
        })?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        tracing::info!(
            "Selected image {} ({}, {} bytes)",
            file_name,
            media_type,
            bytes.len()
        );

        Ok(Self {
            bytes,
            media_type,
            file_name,
        })
    }

    /// Build an image from bytes already in memory
    ///
    /// # Errors
    ///
    /// Returns `MedraxError::UnsupportedMediaType` unless `media_type` is `image/*`
    ///
    /// # Examples
    ///
    /// ```
    /// use medrax::upload::UploadedImage;
    ///
    /// let image = UploadedImage::from_bytes(vec![1, 2, 3], "image/png", "xray1.png").unwrap();
    /// assert_eq!(image.media_type(), "image/png");
    /// assert!(UploadedImage::from_bytes(vec![1], "text/plain", "notes.txt").is_err());
    /// ```
    pub fn from_bytes(
        bytes: Vec<u8>,
        media_type: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Result<Self> {
        let media_type = media_type.into();
        if !is_image_media_type(&media_type) {
            return Err(MedraxError::UnsupportedMediaType(media_type).into());
        }

        Ok(Self {
            bytes,
            media_type,
            file_name: file_name.into(),
        })
    }

    /// Parse a `data:<type>;base64,<payload>` URL
    ///
    /// # Errors
    ///
    /// Returns `MedraxError::Encoding` for a malformed data URL and
    /// `MedraxError::UnsupportedMediaType` for a non-image type
    pub fn from_data_url(data_url: &str, file_name: impl Into<String>) -> Result<Self> {
        let (header, _) = data_url
            .split_once(',')
            .ok_or_else(|| MedraxError::Encoding("Data URL has no payload".to_string()))?;

        let media_type = header
            .strip_prefix("data:")
            .and_then(|rest| rest.strip_suffix(";base64"))
            .ok_or_else(|| {
                MedraxError::Encoding(format!("Unsupported data URL header: {}", header))
            })?;

        let bytes = encoding::decode_payload(data_url)?;
        Self::from_bytes(bytes, media_type, file_name)
    }

    /// Raw image bytes
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Declared media type, e.g. `image/png`
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// File name shown to the user
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Size of the payload in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Base64 payload suitable for an inline attachment
    pub fn encoded_payload(&self) -> String {
        encoding::encode_bytes(&self.bytes)
    }
}

fn is_image_media_type(media_type: &str) -> bool {
    media_type
        .strip_prefix("image/")
        .map(|subtype| !subtype.is_empty())
        .unwrap_or(false)
}

fn detect_media_type(bytes: &[u8], path: &Path) -> Option<String> {
    if let Ok(format) = image::guess_format(bytes) {
        return Some(format.to_mime_type().to_string());
    }

    let format = image::ImageFormat::from_path(path).ok()?;
    tracing::debug!(
        "Content sniffing failed for {}, using extension",
        path.display()
    );
    Some(format.to_mime_type().to_string())
}
