//! Image loading: HTTP(S) fetch or local read, decode, RGB JPEG re-encode.

use std::{io::Cursor, path::Path, time::Duration};

use base64::Engine;
use image::ImageFormat;
use tracing::debug;

use crate::{embed::EncodedImage, errors::IndexError};

/// Loads images from URLs or local paths with a bounded fetch timeout.
#[derive(Clone, Debug)]
pub struct ImageFetcher {
    client: reqwest::Client,
}

impl ImageFetcher {
    /// # Errors
    /// Returns `IndexError::Config` if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, IndexError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IndexError::Config(format!("image http client: {e}")))?;
        Ok(Self { client })
    }

    /// Fetches `source` and returns it as a base64 JPEG.
    ///
    /// # Errors
    /// `IndexError::Image` on fetch, status, decode or encode failure.
    pub async fn load(&self, source: &str) -> Result<EncodedImage, IndexError> {
        let bytes = if is_remote(source) {
            self.fetch(source).await?
        } else {
            tokio::fs::read(Path::new(source))
                .await
                .map_err(|e| IndexError::Image(format!("{source}: {e}")))?
        };

        let owned = source.to_string();
        let jpeg = tokio::task::spawn_blocking(move || reencode_jpeg(&bytes))
            .await
            .map_err(|e| IndexError::Image(format!("{owned}: decode task failed: {e}")))??;

        debug!(source, bytes = jpeg.len(), "image loaded");
        Ok(EncodedImage {
            source: source.to_string(),
            mime: "image/jpeg",
            base64: base64::engine::general_purpose::STANDARD.encode(jpeg),
        })
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, IndexError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| IndexError::Image(format!("{url}: {e}")))?;
        if !resp.status().is_success() {
            return Err(IndexError::Image(format!("{url}: HTTP {}", resp.status())));
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| IndexError::Image(format!("{url}: {e}")))?;
        Ok(bytes.to_vec())
    }
}

fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Decodes any supported format and re-encodes as RGB8 JPEG.
fn reencode_jpeg(bytes: &[u8]) -> Result<Vec<u8>, IndexError> {
    let img = image::load_from_memory(bytes).map_err(|e| IndexError::Image(e.to_string()))?;
    let rgb = image::DynamicImage::ImageRgb8(img.to_rgb8());
    let mut buf = Cursor::new(Vec::new());
    rgb.write_to(&mut buf, ImageFormat::Jpeg)
        .map_err(|e| IndexError::Image(e.to_string()))?;
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_png(dir: &Path, name: &str) -> String {
        let path = dir.join(name);
        image::RgbaImage::from_pixel(8, 8, image::Rgba([200, 30, 30, 255]))
            .save(&path)
            .unwrap();
        path.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn local_png_is_reencoded_as_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let src = write_png(dir.path(), "red.png");
        let fetcher = ImageFetcher::new(Duration::from_secs(3)).unwrap();

        let img = fetcher.load(&src).await.unwrap();
        assert_eq!(img.mime, "image/jpeg");
        assert!(img.data_uri().starts_with("data:image/jpeg;base64,"));

        let raw = base64::engine::general_purpose::STANDARD
            .decode(&img.base64)
            .unwrap();
        assert_eq!(image::guess_format(&raw).unwrap(), ImageFormat::Jpeg);
    }

    #[tokio::test]
    async fn missing_or_garbage_images_fail() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = ImageFetcher::new(Duration::from_secs(3)).unwrap();

        let missing = dir.path().join("nope.jpg");
        assert!(matches!(
            fetcher.load(&missing.to_string_lossy()).await,
            Err(IndexError::Image(_))
        ));

        let garbage = dir.path().join("garbage.jpg");
        std::fs::write(&garbage, b"not an image").unwrap();
        assert!(matches!(
            fetcher.load(&garbage.to_string_lossy()).await,
            Err(IndexError::Image(_))
        ));
    }
}
