//! Owned single-channel f32 image in row-major layout (stride == width).
//!
//! Holds calibrated intensities for patch measurement.
use super::traits::ImageView;
use super::ImageU8;

#[derive(Clone, Debug)]
pub struct ImageF32 {
    /// Image width in pixels
    pub w: usize,
    /// Image height in pixels
    pub h: usize,
    /// Number of f32 elements between consecutive rows (equals `w`)
    pub stride: usize,
    /// Backing storage in row-major order
    pub data: Vec<f32>,
}

impl ImageF32 {
    /// Construct a zero-initialized buffer of size `w × h`.
    pub fn new(w: usize, h: usize) -> Self {
        Self {
            w,
            h,
            stride: w,
            data: vec![0.0; w * h],
        }
    }

    /// Convert an 8-bit view, mapping every sample through `map`.
    pub fn from_u8_with(src: ImageU8<'_>, map: impl Fn(u8) -> f32) -> Self {
        let mut out = Self::new(src.w, src.h);
        for y in 0..src.h {
            let row = src.row(y);
            let start = y * out.stride;
            for (dst, &v) in out.data[start..start + src.w].iter_mut().zip(row) {
                *dst = map(v);
            }
        }
        out
    }
}

impl crate::image::traits::ImageView for ImageF32 {
    type Pixel = f32;

    #[inline]
    fn width(&self) -> usize {
        self.w
    }
    #[inline]
    fn height(&self) -> usize {
        self.h
    }
    #[inline]
    fn stride(&self) -> usize {
        self.stride
    }
    #[inline]
    fn row(&self, y: usize) -> &[f32] {
        let start = y * self.stride;
        &self.data[start..start + self.w]
    }
}
