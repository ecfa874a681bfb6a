//! 8-bit grayscale pyramid with a separable 5-tap Gaussian and 2× decimation.
//!
//! Level 0 is a copy of the input; every further level blurs the previous one
//! with `[1, 4, 6, 4, 1] / 16` (borders replicate) and keeps every other
//! sample. Levels stay 8-bit so they can be fed to template matching as-is.
use crate::image::{GrayImageU8, ImageU8, ImageView};

/// Normalised 5-tap Gaussian taps.
const GAUSSIAN_5TAP: [u32; 5] = [1, 4, 6, 4, 1];

#[derive(Clone, Debug)]
pub struct Pyramid {
    pub levels: Vec<GrayImageU8>,
}

impl Pyramid {
    /// Build `levels` levels (at least one) from an 8-bit view.
    pub fn build_u8(gray: ImageU8<'_>, levels: usize) -> Self {
        let mut out = Vec::with_capacity(levels.max(1));
        out.push(gray.to_owned_image());
        for _ in 1..levels {
            let Some(prev) = out.last() else { break };
            if prev.width() < 2 || prev.height() < 2 {
                break;
            }
            let down = downsample(&gaussian5_sep(prev));
            out.push(down);
        }
        Self { levels: out }
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

fn downsample(src: &GrayImageU8) -> GrayImageU8 {
    let (w, h) = (src.width(), src.height());
    let (nw, nh) = (w.div_ceil(2), h.div_ceil(2));
    let view = src.as_view();
    let mut data = Vec::with_capacity(nw * nh);
    for y in 0..nh {
        let row = view.row((y * 2).min(h - 1));
        data.extend((0..nw).map(|x| row[(x * 2).min(w - 1)]));
    }
    GrayImageU8::from_raw(nw, nh, data).unwrap_or_else(|| GrayImageU8::filled(nw, nh, 0))
}

fn gaussian5_sep(src: &GrayImageU8) -> GrayImageU8 {
    let (w, h) = (src.width(), src.height());
    let view = src.as_view();
    let norm: u32 = GAUSSIAN_5TAP.iter().sum();

    // horizontal, kept in 16x fixed point
    let mut tmp = vec![0u32; w * h];
    for y in 0..h {
        let row = view.row(y);
        for x in 0..w {
            tmp[y * w + x] = GAUSSIAN_5TAP
                .iter()
                .enumerate()
                .map(|(k, &t)| t * row[(x + k).saturating_sub(2).min(w - 1)] as u32)
                .sum();
        }
    }
    // vertical
    let mut data = Vec::with_capacity(w * h);
    for y in 0..h {
        for x in 0..w {
            let acc: u32 = GAUSSIAN_5TAP
                .iter()
                .enumerate()
                .map(|(k, &t)| t * tmp[(y + k).saturating_sub(2).min(h - 1) * w + x])
                .sum();
            let scale = norm * norm;
            data.push(((acc + scale / 2) / scale).min(255) as u8);
        }
    }
    GrayImageU8::from_raw(w, h, data).unwrap_or_else(|| GrayImageU8::filled(w, h, 0))
}
