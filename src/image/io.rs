//! I/O helpers for grayscale images and JSON.
//!
//! - `load_grayscale_image`: read a PNG/JPEG/TIFF into an owned 8-bit gray buffer.
//! - `save_grayscale_u8`: write an owned 8-bit gray buffer to disk.
//! - `write_json_file`: pretty-print a serializable value to disk.
use super::ImageU8;
use crate::error::{Error, Result};
use image::{GrayImage, Luma};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Owned 8-bit grayscale buffer, tightly packed, with borrowed view conversion.
///
/// Wraps `image::GrayImage` so the `imageproc` primitives can run on it
/// without copying.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayImageU8 {
    inner: GrayImage,
}

impl GrayImageU8 {
    /// Construct from raw row-major bytes. Returns `None` on a size mismatch.
    pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Option<Self> {
        GrayImage::from_raw(width as u32, height as u32, data).map(|inner| Self { inner })
    }

    /// A `width × height` image with every sample set to `value`.
    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self {
            inner: GrayImage::from_pixel(width as u32, height as u32, Luma([value])),
        }
    }

    pub fn from_gray(inner: GrayImage) -> Self {
        Self { inner }
    }

    /// Image width in pixels
    pub fn width(&self) -> usize {
        self.inner.width() as usize
    }

    /// Image height in pixels
    pub fn height(&self) -> usize {
        self.inner.height() as usize
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.inner
    }

    pub fn as_raw(&self) -> &[u8] {
        self.inner.as_raw()
    }

    /// Borrow as a read-only `ImageU8` view
    pub fn as_view(&self) -> ImageU8<'_> {
        ImageU8 {
            w: self.width(),
            h: self.height(),
            stride: self.width(),
            data: self.inner.as_raw(),
        }
    }

    /// Apply `f` to every sample, producing a new image.
    pub fn map(&self, f: impl Fn(u8) -> u8) -> Self {
        let data = self.inner.as_raw().iter().map(|&v| f(v)).collect();
        Self {
            inner: GrayImage::from_raw(self.inner.width(), self.inner.height(), data)
                .unwrap_or_else(|| GrayImage::new(self.inner.width(), self.inner.height())),
        }
    }

    /// Photometric inverse (`255 - v`).
    pub fn inverted(&self) -> Self {
        self.map(|v| 255 - v)
    }
}

/// Load an image from disk and convert to 8-bit grayscale.
pub fn load_grayscale_image(path: &Path) -> Result<GrayImageU8> {
    let img = image::open(path)
        .map_err(|e| Error::image_load(path, e))?
        .into_luma8();
    Ok(GrayImageU8::from_gray(img))
}

/// Save an 8-bit grayscale buffer; the format follows the file extension.
pub fn save_grayscale_u8(buffer: &GrayImageU8, path: &Path) -> Result<()> {
    ensure_parent_dir(path)?;
    buffer.as_gray().save(path).map_err(|e| Error::io(path, e))
}

/// Serialize a value as pretty JSON to `path`, creating parent directories.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(value).map_err(|e| Error::io(path, e))?;
    fs::write(path, json).map_err(|e| Error::io(path, e))
}

pub(crate) fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn png_roundtrip_preserves_samples() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("plate.png");
        let data: Vec<u8> = (0..12 * 7).map(|i| (i * 3 % 256) as u8).collect();
        let img = GrayImageU8::from_raw(12, 7, data).expect("valid size");
        save_grayscale_u8(&img, &path).expect("save");
        let back = load_grayscale_image(&path).expect("load");
        assert_eq!(back, img);
    }

    #[test]
    fn missing_file_is_an_image_load_error() {
        let err = load_grayscale_image(Path::new("/definitely/not/here.png")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(matches!(err, Error::ImageLoad { .. }));
    }

    #[test]
    fn from_raw_rejects_wrong_length() {
        assert!(GrayImageU8::from_raw(4, 4, vec![0; 15]).is_none());
    }
}
