//! Image preparation before captioning
//!
//! Large source images are shrunk to a bounded resolution and re-encoded as
//! JPEG so the captioner never decodes a full-size photo. Opaque content
//! handles are copied to the work directory first; the copy is removed once
//! the normalized JPEG exists.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::ColorType;

use crate::core::types::SelectedFile;
use crate::core::utils::{hash_content, local_path};

/// Reads the bytes behind a uri that is not a local path
#[async_trait]
pub trait ContentResolver: Send + Sync {
    async fn read(&self, uri: &str) -> io::Result<Vec<u8>>;
}

/// Resolver for `file://` uris and plain paths
#[derive(Debug, Default, Clone, Copy)]
pub struct FsContentResolver;

#[async_trait]
impl ContentResolver for FsContentResolver {
    async fn read(&self, uri: &str) -> io::Result<Vec<u8>> {
        match local_path(uri) {
            Some(path) => tokio::fs::read(path).await,
            None => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("cannot resolve content handle: {}", uri),
            )),
        }
    }
}

/// Image ready for the captioner
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedImage {
    /// Locally readable path handed to the captioner
    pub path: PathBuf,

    /// Normalized copy kept as the item's thumbnail
    pub thumbnail: Option<PathBuf>,
}

pub struct ImagePreparer {
    resolver: Arc<dyn ContentResolver>,
    work_dir: PathBuf,
    max_dimension: u32,
    jpeg_quality: u8,
}

impl ImagePreparer {
    pub fn new(
        resolver: Arc<dyn ContentResolver>,
        work_dir: PathBuf,
        max_dimension: u32,
        jpeg_quality: u8,
    ) -> Self {
        Self {
            resolver,
            work_dir,
            max_dimension: max_dimension.max(1),
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }

    /// Resolve the file locally, then shrink and re-encode it.
    ///
    /// Fails only when the source cannot be read. A file that cannot be
    /// decoded as an image is returned as-is without a thumbnail.
    pub async fn prepare(&self, file: &SelectedFile) -> io::Result<PreparedImage> {
        tokio::fs::create_dir_all(&self.work_dir).await?;
        let key = hash_content(file.uri.as_bytes());

        let (source, copied) = match local_path(&file.uri) {
            Some(path) => {
                tokio::fs::metadata(&path).await?;
                (path, false)
            }
            None => {
                let bytes = self.resolver.read(&file.uri).await?;
                let copy = self.work_dir.join(format!("{}.bin", key));
                tokio::fs::write(&copy, &bytes).await?;
                (copy, true)
            }
        };

        let target = self.work_dir.join(format!("{}.jpg", key));
        let (src, dst) = (source.clone(), target.clone());
        let (max_dimension, quality) = (self.max_dimension, self.jpeg_quality);
        let normalized =
            tokio::task::spawn_blocking(move || normalize_image(&src, &dst, max_dimension, quality))
                .await;

        match normalized {
            Ok(Ok(())) => {
                if copied {
                    if let Err(e) = tokio::fs::remove_file(&source).await {
                        tracing::debug!(path = %source.display(), error = %e, "Could not remove content copy");
                    }
                }
                Ok(PreparedImage {
                    path: target.clone(),
                    thumbnail: Some(target),
                })
            }
            Ok(Err(e)) => {
                tracing::warn!(uri = %file.uri, error = %e, "Image normalization failed, using original");
                Ok(PreparedImage {
                    path: source,
                    thumbnail: None,
                })
            }
            Err(e) => {
                tracing::warn!(uri = %file.uri, error = %e, "Image normalization task failed, using original");
                Ok(PreparedImage {
                    path: source,
                    thumbnail: None,
                })
            }
        }
    }
}

/// Decode, fit within `max_dimension` preserving aspect ratio, encode as JPEG
fn normalize_image(
    source: &Path,
    target: &Path,
    max_dimension: u32,
    quality: u8,
) -> image::ImageResult<()> {
    let img = image::io::Reader::open(source)?
        .with_guessed_format()?
        .decode()?;

    let img = if img.width() > max_dimension || img.height() > max_dimension {
        img.resize(max_dimension, max_dimension, FilterType::Triangle)
    } else {
        img
    };

    let rgb = img.to_rgb8();
    let file = std::fs::File::create(target)?;
    let mut writer = io::BufWriter::new(file);
    let mut encoder = JpegEncoder::new_with_quality(&mut writer, quality);
    encoder.encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)?;

    Ok(())
}
