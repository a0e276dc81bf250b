//! Asset fetching, embedding, and the per-build background cache.
//!
//! Background images are referenced by conventional paths a static-asset
//! host resolves; the engine treats them as opaque fetchable URLs (base64
//! data URIs are also accepted, since the upload UI produces them for
//! watermark images). Every decoded asset becomes a document XObject and is
//! memoized for the rest of the build; failed candidates are remembered so
//! one bad theme never costs more than one round of network I/O per build.

use std::collections::{HashMap, HashSet};
use std::io::Cursor;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64_STD, Engine as _};
use printpdf::{PdfDocument, PdfWarnMsg, RawImage, XObjectId};

use crate::error::{Error, Result};
use crate::theme::ThemeConfig;

/// A registered document XObject together with the pixel dimensions of the
/// source raster.
#[derive(Debug, Clone)]
pub struct ImageHandle {
    pub xobj: XObjectId,
    pub px_width: u32,
    pub px_height: u32,
}

/// Source of asset bytes. The HTTP implementation is the production path;
/// tests substitute in-memory fetchers.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>>;
}

/// Fetches conventional asset paths against a static-asset base URL.
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFetcher {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    fn absolute_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!(
                "{}/{}",
                self.base_url.trim_end_matches('/'),
                path.trim_start_matches('/')
            )
        }
    }
}

#[async_trait]
impl AssetFetcher for HttpFetcher {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>> {
        if path.starts_with("data:") {
            return parse_data_uri(path);
        }
        let url = self.absolute_url(path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::AssetFetch {
                path: path.to_string(),
                reason: e.to_string(),
            })?;
        if !response.status().is_success() {
            return Err(Error::AssetFetch {
                path: path.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }
        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| Error::AssetFetch {
                path: path.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Parse a `data:<mime>;base64,<data>` URI and return the raw decoded bytes.
pub fn parse_data_uri(src: &str) -> Result<Vec<u8>> {
    let rest = src
        .strip_prefix("data:")
        .ok_or_else(|| Error::UnsupportedSource(preview(src)))?;
    let comma_pos = rest
        .find(',')
        .ok_or_else(|| Error::UnsupportedSource(preview(src)))?;
    let header = &rest[..comma_pos];
    if !header.contains(";base64") {
        return Err(Error::UnsupportedSource(preview(src)));
    }
    BASE64_STD
        .decode(rest[comma_pos + 1..].trim())
        .map_err(|e| Error::ImageDecode(format!("base64 decode error: {e}")))
}

fn preview(src: &str) -> String {
    let cut = src
        .char_indices()
        .nth(80)
        .map(|(i, _)| i)
        .unwrap_or(src.len());
    src[..cut].to_string()
}

/// Embed image bytes as a document XObject: lossless first, and when the
/// serializer rejects the bytes, a lossy JPEG re-encode as fallback.
pub fn embed_image(doc: &mut PdfDocument, bytes: &[u8]) -> Result<ImageHandle> {
    // Decode with the `image` crate to validate and obtain pixel dimensions.
    let dyn_img = ::image::load_from_memory(bytes)
        .map_err(|e| Error::ImageDecode(format!("decode error: {e}")))?;
    let (px_width, px_height) = (dyn_img.width(), dyn_img.height());

    let mut warnings: Vec<PdfWarnMsg> = Vec::new();
    let raw = match RawImage::decode_from_bytes(bytes, &mut warnings) {
        Ok(raw) => raw,
        Err(lossless_err) => {
            log::warn!("lossless embed failed ({lossless_err}), retrying as JPEG");
            let mut jpeg = Cursor::new(Vec::new());
            dyn_img
                .to_rgb8()
                .write_to(&mut jpeg, ::image::ImageFormat::Jpeg)
                .map_err(|e| Error::ImageDecode(format!("JPEG re-encode error: {e}")))?;
            RawImage::decode_from_bytes(jpeg.get_ref(), &mut warnings)
                .map_err(|e| Error::ImageDecode(format!("fallback embed error: {e}")))?
        }
    };

    let xobj = doc.add_image(&raw);
    Ok(ImageHandle {
        xobj,
        px_width,
        px_height,
    })
}

/// Embed image bytes with their alpha channel attenuated by `opacity`
/// (`0..=1`). Used for image watermarks, which must not obscure content.
pub fn embed_image_with_opacity(
    doc: &mut PdfDocument,
    bytes: &[u8],
    opacity: f32,
) -> Result<ImageHandle> {
    let dyn_img = ::image::load_from_memory(bytes)
        .map_err(|e| Error::ImageDecode(format!("decode error: {e}")))?;
    let mut rgba = dyn_img.to_rgba8();
    let factor = opacity.clamp(0.0, 1.0);
    for pixel in rgba.pixels_mut() {
        pixel[3] = (pixel[3] as f32 * factor).round() as u8;
    }
    let (px_width, px_height) = rgba.dimensions();

    let mut png = Cursor::new(Vec::new());
    ::image::DynamicImage::ImageRgba8(rgba)
        .write_to(&mut png, ::image::ImageFormat::Png)
        .map_err(|e| Error::ImageDecode(format!("PNG re-encode error: {e}")))?;

    let mut warnings: Vec<PdfWarnMsg> = Vec::new();
    let raw = RawImage::decode_from_bytes(png.get_ref(), &mut warnings)
        .map_err(|e| Error::ImageDecode(format!("embed error: {e}")))?;
    let xobj = doc.add_image(&raw);
    Ok(ImageHandle {
        xobj,
        px_width,
        px_height,
    })
}

/// Per-build memoization of decoded background images, with sticky failure
/// tracking. One instance lives exactly as long as one `build_booklet`
/// call; dropping it is the reset.
#[derive(Default)]
pub struct AssetCache {
    cache: HashMap<String, ImageHandle>,
    attempted: HashSet<String>,
}

impl AssetCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(theme_id: &str, path: &str) -> String {
        format!("{theme_id}:{path}")
    }

    /// Resolve the theme's background image, trying candidates in priority
    /// order. A cache hit performs no I/O; a candidate that already failed
    /// this build is never retried. `None` means "draw plain white".
    pub async fn resolve(
        &mut self,
        config: &ThemeConfig,
        fetcher: &dyn AssetFetcher,
        doc: &mut PdfDocument,
    ) -> Option<ImageHandle> {
        let candidates = config.background_candidates();

        for path in &candidates {
            if let Some(handle) = self.cache.get(&Self::key(&config.id, path)) {
                log::debug!("background cache hit for theme '{}'", config.id);
                return Some(handle.clone());
            }
        }

        for path in &candidates {
            let key = Self::key(&config.id, path);
            if self.attempted.contains(&key) {
                continue;
            }
            self.attempted.insert(key.clone());

            let bytes = match fetcher.fetch(path).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    log::warn!("background fetch failed: {e}");
                    continue;
                }
            };
            match embed_image(doc, &bytes) {
                Ok(handle) => {
                    self.cache.insert(key, handle.clone());
                    return Some(handle);
                }
                Err(e) => {
                    log::warn!("background embed failed for '{path}': {e}");
                }
            }
        }

        None
    }
}
