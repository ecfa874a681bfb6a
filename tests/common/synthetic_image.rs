use colony_grid::image::GrayImageU8;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Synthetic plate: uniform agar with one filled disc per grid cell.
#[derive(Clone, Debug)]
pub struct SyntheticPlate {
    pub width: usize,
    pub height: usize,
    pub origin: (usize, usize),
    pub cell: usize,
    pub nrow: usize,
    pub ncol: usize,
    pub agar: u8,
    pub colony: u8,
    /// Disc radius per cell, row-major; `0.0` leaves the cell empty.
    pub radii: Vec<f32>,
    /// Uniform noise amplitude and seed.
    pub noise: Option<(u8, u64)>,
}

impl SyntheticPlate {
    pub fn uniform(
        width: usize,
        height: usize,
        origin: (usize, usize),
        cell: usize,
        nrow: usize,
        ncol: usize,
        radius: f32,
    ) -> Self {
        assert!(width > 0 && height > 0, "image dimensions must be positive");
        assert!(cell > 0, "cell size must be positive");
        Self {
            width,
            height,
            origin,
            cell,
            nrow,
            ncol,
            agar: 50,
            colony: 200,
            radii: vec![radius; nrow * ncol],
            noise: None,
        }
    }

    pub fn with_radius(mut self, row: usize, col: usize, radius: f32) -> Self {
        self.radii[row * self.ncol + col] = radius;
        self
    }

    pub fn with_noise(mut self, amplitude: u8, seed: u64) -> Self {
        self.noise = Some((amplitude, seed));
        self
    }

    /// Centre of cell `(row, col)` in image coordinates.
    pub fn center(&self, row: usize, col: usize) -> (f32, f32) {
        (
            self.origin.0 as f32 + (col as f32 + 0.5) * self.cell as f32,
            self.origin.1 as f32 + (row as f32 + 0.5) * self.cell as f32,
        )
    }

    pub fn render(&self) -> GrayImageU8 {
        let mut data = vec![self.agar; self.width * self.height];
        for row in 0..self.nrow {
            for col in 0..self.ncol {
                let r = self.radii[row * self.ncol + col];
                if r <= 0.0 {
                    continue;
                }
                let (cx, cy) = self.center(row, col);
                for y in 0..self.height {
                    for x in 0..self.width {
                        let (dx, dy) = (x as f32 - cx, y as f32 - cy);
                        if dx * dx + dy * dy <= r * r {
                            data[y * self.width + x] = self.colony;
                        }
                    }
                }
            }
        }
        if let Some((amplitude, seed)) = self.noise {
            let mut rng = StdRng::seed_from_u64(seed);
            let a = amplitude as i16;
            for v in data.iter_mut() {
                let n: i16 = rng.gen_range(-a..=a);
                *v = (*v as i16 + n).clamp(0, 255) as u8;
            }
        }
        GrayImageU8::from_raw(self.width, self.height, data).expect("buffer matches dimensions")
    }
}
