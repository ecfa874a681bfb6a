use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Axis-aligned pixel rectangle (top-left corner plus size).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Rect {
    pub const fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Plate layout: number of spot rows and columns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "GridFormat", into = "String")]
pub struct GridSpec {
    pub nrow: usize,
    pub ncol: usize,
}

impl GridSpec {
    pub fn new(nrow: usize, ncol: usize) -> Result<Self> {
        if nrow == 0 || ncol == 0 {
            return Err(grid_format_error(&format!("{nrow}x{ncol}")));
        }
        Ok(Self { nrow, ncol })
    }

    /// Parse either one `"<rows>x<cols>"` token or two integer tokens.
    pub fn from_tokens<S: AsRef<str>>(tokens: &[S]) -> Result<Self> {
        match tokens {
            [single] => single.as_ref().parse(),
            [rows, cols] => Self::new(
                parse_dimension(rows.as_ref())?,
                parse_dimension(cols.as_ref())?,
            ),
            _ => Err(grid_format_error(
                &tokens
                    .iter()
                    .map(|t| t.as_ref())
                    .collect::<Vec<_>>()
                    .join(" "),
            )),
        }
    }

    pub fn cells(&self) -> usize {
        self.nrow * self.ncol
    }
}

impl FromStr for GridSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('x').collect();
        match parts.as_slice() {
            [rows, cols] => Self::new(parse_dimension(rows)?, parse_dimension(cols)?),
            _ => Err(grid_format_error(s)),
        }
    }
}

impl fmt::Display for GridSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.nrow, self.ncol)
    }
}

impl From<GridSpec> for String {
    fn from(spec: GridSpec) -> Self {
        spec.to_string()
    }
}

/// Serialized grid format: `"8x12"` or `["8", "12"]`.
#[derive(Deserialize)]
#[serde(untagged)]
enum GridFormat {
    Text(String),
    Tokens(Vec<String>),
}

impl TryFrom<GridFormat> for GridSpec {
    type Error = Error;

    fn try_from(value: GridFormat) -> Result<Self> {
        match value {
            GridFormat::Text(s) => s.parse(),
            GridFormat::Tokens(tokens) => Self::from_tokens(tokens.as_slice()),
        }
    }
}

fn parse_dimension(token: &str) -> Result<usize> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(grid_format_error(token));
    }
    token.parse().map_err(|_| grid_format_error(token))
}

fn grid_format_error(given: &str) -> Error {
    Error::config(format!(
        "wrong dimensions for a rectangular grid format: {given:?} (expected e.g. 8x12 or 8 12)"
    ))
}

/// Location of the grid inside the reference frame.
///
/// `origin` is the top-left corner of the grid rectangle, `width × height`
/// its full extent and `patch_width × patch_height` the nominal (truncated)
/// size of one cell. Measured cells come from [`GridPlacement::cell`], which
/// spreads the remainder so the cells tile the whole rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridPlacement {
    pub origin: (usize, usize),
    pub width: usize,
    pub height: usize,
    pub patch_width: usize,
    pub patch_height: usize,
}

impl GridPlacement {
    /// Placement for a grid rectangle; cell size is the integer share per row/column.
    pub fn from_extent(origin: (usize, usize), width: usize, height: usize, grid: GridSpec) -> Self {
        Self {
            origin,
            width,
            height,
            patch_width: width / grid.ncol,
            patch_height: height / grid.nrow,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.origin.0, self.origin.1, self.width, self.height)
    }

    /// Cell `(row, col)` relative to [`Self::rect`]: columns span
    /// `[col·width/ncol, (col+1)·width/ncol)`, rows likewise.
    pub fn cell(&self, grid: GridSpec, row: usize, col: usize) -> Rect {
        let x0 = col * self.width / grid.ncol;
        let x1 = (col + 1) * self.width / grid.ncol;
        let y0 = row * self.height / grid.nrow;
        let y1 = (row + 1) * self.height / grid.nrow;
        Rect::new(x0, y0, x1 - x0, y1 - y0)
    }

    /// Checks the grid fits an image of `image_width × image_height`.
    pub fn validate(&self, grid: GridSpec, image_width: usize, image_height: usize) -> Result<()> {
        if self.patch_width == 0 || self.patch_height == 0 {
            return Err(Error::detection(format!(
                "degenerate cell size {}x{}",
                self.patch_width, self.patch_height
            )));
        }
        let right = self.origin.0 + grid.ncol * self.patch_width;
        let bottom = self.origin.1 + grid.nrow * self.patch_height;
        if right > image_width
            || bottom > image_height
            || self.origin.0 + self.width > image_width
            || self.origin.1 + self.height > image_height
        {
            return Err(Error::detection(format!(
                "grid rectangle {:?} {}x{} exceeds image {}x{}",
                self.origin, self.width, self.height, image_width, image_height
            )));
        }
        Ok(())
    }
}

/// Intensity bounds used to rescale every image of a series.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationBounds {
    pub min_ref: f32,
    pub max_ref: f32,
}

impl Default for CalibrationBounds {
    fn default() -> Self {
        Self {
            min_ref: 0.0,
            max_ref: 255.0,
        }
    }
}

impl CalibrationBounds {
    pub fn is_degenerate(&self) -> bool {
        !self.min_ref.is_finite() || !self.max_ref.is_finite() || self.max_ref <= self.min_ref
    }

    /// Bounds of the photometric inverse (`255 - v`) of the reference.
    pub fn inverted(&self) -> Self {
        Self {
            min_ref: 255.0 - self.max_ref,
            max_ref: 255.0 - self.min_ref,
        }
    }
}

/// Phenotype measurements for one grid cell of one image.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PhenotypeRecord {
    pub row: usize,
    #[serde(rename = "Column")]
    pub col: usize,
    pub intensity: f64,
    pub area: f64,
    pub colony_mean: f64,
    pub colony_variance: f64,
    pub background_mean: f64,
    pub barcode: String,
    pub filename: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn grid_spec_accepts_both_formats() {
        assert_eq!(GridSpec::from_tokens(&["8x12"]).unwrap(), GridSpec { nrow: 8, ncol: 12 });
        assert_eq!(
            GridSpec::from_tokens(&["8", "12"]).unwrap(),
            GridSpec { nrow: 8, ncol: 12 }
        );
    }

    #[test]
    fn grid_spec_rejects_invalid_formats() {
        for tokens in [
            vec!["0x12"],
            vec!["8xabc"],
            vec!["8", "12", "3"],
            vec!["8x12x3"],
            vec!["-8", "12"],
            vec!["8", "0"],
            vec![],
        ] {
            let err = GridSpec::from_tokens(tokens.as_slice()).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Configuration, "tokens {tokens:?}");
        }
    }

    #[test]
    fn grid_spec_deserializes_from_text_or_tokens() {
        let a: GridSpec = serde_json::from_str("\"4x6\"").unwrap();
        let b: GridSpec = serde_json::from_str("[\"4\", \"6\"]").unwrap();
        assert_eq!(a, b);
        assert!(serde_json::from_str::<GridSpec>("\"4x0\"").is_err());
        assert_eq!(serde_json::to_string(&a).unwrap(), "\"4x6\"");
    }

    #[test]
    fn placement_validation_checks_bounds() {
        let grid = GridSpec::new(2, 3).unwrap();
        let placement = GridPlacement::from_extent((10, 5), 90, 60, grid);
        assert_eq!((placement.patch_width, placement.patch_height), (30, 30));
        assert!(placement.validate(grid, 100, 65).is_ok());
        let err = placement.validate(grid, 99, 65).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Detection);
    }

    #[test]
    fn cells_tile_the_grid_rectangle() {
        let grid = GridSpec::new(8, 12).unwrap();
        let placement = GridPlacement::from_extent((21, 21), 479, 319, grid);
        assert_eq!((placement.patch_width, placement.patch_height), (39, 39));

        let last = placement.cell(grid, 7, 11);
        assert_eq!(last.x + last.width, 479);
        assert_eq!(last.y + last.height, 319);
        for col in 1..grid.ncol {
            let (left, right) = (placement.cell(grid, 0, col - 1), placement.cell(grid, 0, col));
            assert_eq!(left.x + left.width, right.x);
            assert!((39..=40).contains(&right.width));
        }
        let widths: usize = (0..grid.ncol).map(|c| placement.cell(grid, 0, c).width).sum();
        assert_eq!(widths, 479);
    }

    #[test]
    fn record_serializes_with_table_column_names() {
        let rec = PhenotypeRecord {
            row: 1,
            col: 2,
            intensity: 0.5,
            area: 0.25,
            colony_mean: 0.0,
            colony_variance: 0.0,
            background_mean: 0.1,
            barcode: "QFA".into(),
            filename: "QFA_2020".into(),
        };
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["Row"], 1);
        assert_eq!(json["Column"], 2);
        assert!(json.get("ColonyVariance").is_some());
        assert!(json.get("BackgroundMean").is_some());
    }
}
