//! Borrowed 8-bit grayscale view with an explicit row stride.
//!
//! Views are cheap to crop: a sub-rectangle keeps the parent stride and
//! borrows the parent buffer, so no pixel data is copied until
//! [`ImageU8::to_owned_image`] is called.
use super::io::GrayImageU8;
use super::traits::ImageView;
use crate::types::Rect;

#[derive(Clone, Copy, Debug)]
pub struct ImageU8<'a> {
    pub w: usize,
    pub h: usize,
    pub stride: usize, // bytes between rows
    pub data: &'a [u8],
}

impl<'a> ImageU8<'a> {
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.stride + x]
    }

    /// Whether `rect` lies entirely inside the view.
    pub fn contains(&self, rect: &Rect) -> bool {
        rect.x + rect.width <= self.w && rect.y + rect.height <= self.h
    }

    /// Borrow the sub-rectangle `rect`. Returns `None` when it leaves the view.
    pub fn crop(&self, rect: &Rect) -> Option<ImageU8<'a>> {
        if !self.contains(rect) {
            return None;
        }
        let start = rect.y * self.stride + rect.x;
        let data = if rect.width == 0 || rect.height == 0 {
            &self.data[..0]
        } else {
            &self.data[start..]
        };
        Some(ImageU8 {
            w: rect.width,
            h: rect.height,
            stride: self.stride,
            data,
        })
    }

    /// 256-bin intensity histogram.
    pub fn histogram(&self) -> [u64; 256] {
        let mut bins = [0u64; 256];
        for row in self.rows() {
            for &v in row {
                bins[v as usize] += 1;
            }
        }
        bins
    }

    pub fn max_value(&self) -> u8 {
        self.rows()
            .flat_map(|row| row.iter().copied())
            .max()
            .unwrap_or(0)
    }

    /// Copy the view into a tightly packed owned image.
    pub fn to_owned_image(&self) -> GrayImageU8 {
        let mut data = Vec::with_capacity(self.w * self.h);
        for row in self.rows() {
            data.extend_from_slice(row);
        }
        GrayImageU8::from_raw(self.w, self.h, data)
            .unwrap_or_else(|| GrayImageU8::filled(self.w, self.h, 0))
    }
}

impl<'a> crate::image::traits::ImageView for ImageU8<'a> {
    type Pixel = u8;

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
    fn row(&self, y: usize) -> &[u8] {
        let start = y * self.stride;
        &self.data[start..start + self.w]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(w: usize, h: usize) -> Vec<u8> {
        (0..w * h).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn crop_keeps_parent_stride() {
        let data = ramp(8, 6);
        let view = ImageU8 {
            w: 8,
            h: 6,
            stride: 8,
            data: &data,
        };
        let sub = view.crop(&Rect::new(2, 1, 3, 4)).expect("inside");
        assert_eq!(sub.stride, 8);
        assert_eq!(sub.get(0, 0), view.get(2, 1));
        assert_eq!(sub.get(2, 3), view.get(4, 4));
        assert_eq!(sub.row(3).len(), 3);

        let owned = sub.to_owned_image();
        assert_eq!(owned.as_view().get(2, 3), view.get(4, 4));
    }

    #[test]
    fn crop_outside_is_rejected() {
        let data = ramp(4, 4);
        let view = ImageU8 {
            w: 4,
            h: 4,
            stride: 4,
            data: &data,
        };
        assert!(view.crop(&Rect::new(2, 2, 3, 1)).is_none());
    }
}
