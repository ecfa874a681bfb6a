//! Dense boolean masks aligned with a cropped grid image.
use super::GrayImageU8;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BinaryMask {
    pub w: usize,
    pub h: usize,
    pub data: Vec<bool>,
}

impl BinaryMask {
    pub fn new(w: usize, h: usize) -> Self {
        Self {
            w,
            h,
            data: vec![false; w * h],
        }
    }

    /// Build a mask by evaluating `pred` at every pixel.
    pub fn from_fn(w: usize, h: usize, mut pred: impl FnMut(usize, usize) -> bool) -> Self {
        let mut data = Vec::with_capacity(w * h);
        for y in 0..h {
            for x in 0..w {
                data.push(pred(x, y));
            }
        }
        Self { w, h, data }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> bool {
        self.data[y * self.w + x]
    }

    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    /// Visualisation image: set pixels are 255, the rest 0.
    pub fn to_image(&self) -> GrayImageU8 {
        let data = self.data.iter().map(|&v| if v { 255 } else { 0 }).collect();
        GrayImageU8::from_raw(self.w, self.h, data)
            .unwrap_or_else(|| GrayImageU8::filled(self.w, self.h, 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_set_pixels() {
        let mask = BinaryMask::from_fn(6, 4, |x, y| x >= 3 && y >= 1);
        assert_eq!(mask.count(), 9);
        assert!(mask.get(3, 1));
        assert!(!mask.get(2, 3));
        assert_eq!(BinaryMask::new(2, 2).count(), 0);
    }

    #[test]
    fn visualisation_is_zero_or_255() {
        let mask = BinaryMask::from_fn(3, 2, |x, _| x == 1);
        let img = mask.to_image();
        assert_eq!(img.as_raw(), &[0, 255, 0, 0, 255, 0]);
    }
}
