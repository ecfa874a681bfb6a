//! Directory conventions of a plate-series run: which files are images and
//! where tables and masks are written.
use crate::error::{Error, Result};
use crate::image::io::save_grayscale_u8;
use crate::pipeline::{ImageAnalysis, ResultSink};
use crate::types::PhenotypeRecord;
use log::debug;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "tif", "tiff", "png"];
pub const DATA_DIR: &str = "Output_Data";
pub const IMAGES_DIR: &str = "Output_Images";

const TABLE_HEADER: [&str; 9] = [
    "Row",
    "Column",
    "Intensity",
    "Area",
    "ColonyMean",
    "ColonyVariance",
    "BackgroundMean",
    "Barcode",
    "Filename",
];

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&e.as_str())
        })
        .unwrap_or(false)
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a.file_name() == b.file_name(),
    }
}

/// Images of `dir` sorted by name, without the calibration reference.
/// With `endpoint` only the last image is kept.
pub fn discover_images(dir: &Path, endpoint: bool, reference: Option<&Path>) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::config(format!(
            "input directory {} does not exist",
            dir.display()
        )));
    }
    let entries = fs::read_dir(dir)
        .map_err(|e| Error::config(format!("cannot list {}: {e}", dir.display())))?;
    let mut images: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && is_image(p))
        .filter(|p| !reference.is_some_and(|r| same_file(p, r)))
        .collect();
    images.sort();

    if endpoint {
        images = images.pop().into_iter().collect();
    }
    if images.is_empty() {
        return Err(Error::config(format!(
            "no images ({}) found in {}",
            IMAGE_EXTENSIONS.join(", "),
            dir.display()
        )));
    }
    debug!("Discovered {} image(s) in {}", images.len(), dir.display());
    Ok(images)
}

/// Output directories beneath the analysed directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputLayout {
    pub data_dir: PathBuf,
    pub images_dir: PathBuf,
}

impl OutputLayout {
    pub fn prepare(root: &Path) -> Result<Self> {
        let layout = Self {
            data_dir: root.join(DATA_DIR),
            images_dir: root.join(IMAGES_DIR),
        };
        for dir in [&layout.data_dir, &layout.images_dir] {
            fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
        }
        Ok(layout)
    }

    pub fn table_path(&self, stem: &str) -> PathBuf {
        self.data_dir.join(format!("{stem}.out"))
    }

    pub fn mask_path(&self, stem: &str) -> PathBuf {
        self.images_dir.join(format!("{stem}.png"))
    }
}

/// Writes `<stem>.out` tables and `<stem>.png` masks into an [`OutputLayout`].
#[derive(Clone, Debug)]
pub struct DirectorySink {
    layout: OutputLayout,
    written: usize,
}

impl DirectorySink {
    pub fn new(layout: OutputLayout) -> Self {
        Self { layout, written: 0 }
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    pub fn written(&self) -> usize {
        self.written
    }
}

impl ResultSink for DirectorySink {
    fn write(&mut self, analysis: &ImageAnalysis) -> Result<()> {
        let stem = &analysis.label.filename;
        write_table(&self.layout.table_path(stem), &analysis.records)?;
        save_grayscale_u8(&analysis.mask, &self.layout.mask_path(stem))?;
        self.written += 1;
        Ok(())
    }
}

/// Tab-separated phenotype table with a header row.
pub fn write_table(path: &Path, records: &[PhenotypeRecord]) -> Result<()> {
    let file = fs::File::create(path).map_err(|e| Error::io(path, e))?;
    let mut out = BufWriter::new(file);
    let io = |e: std::io::Error| Error::io(path, e);
    writeln!(out, "{}", TABLE_HEADER.join("\t")).map_err(io)?;
    for r in records {
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            r.row,
            r.col,
            r.intensity,
            r.area,
            r.colony_mean,
            r.colony_variance,
            r.background_mean,
            r.barcode,
            r.filename
        )
        .map_err(io)?;
    }
    out.flush().map_err(io)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"").unwrap();
        path
    }

    #[test]
    fn discovers_sorted_images_without_reference() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "b_2020-01-02.JPG");
        touch(dir.path(), "a_2020-01-01.png");
        touch(dir.path(), "notes.txt");
        let reference = touch(dir.path(), "calibration.tif");

        let images = discover_images(dir.path(), false, Some(&reference)).unwrap();
        let names: Vec<_> = images
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a_2020-01-01.png", "b_2020-01-02.JPG"]);

        let last = discover_images(dir.path(), true, Some(&reference)).unwrap();
        assert_eq!(last.len(), 1);
        assert!(last[0].ends_with("b_2020-01-02.JPG"));
    }

    #[test]
    fn missing_or_empty_directory_is_a_config_error() {
        assert!(matches!(
            discover_images(Path::new("/no/such/dir"), false, None),
            Err(Error::Config(_))
        ));
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "readme.md");
        assert!(matches!(
            discover_images(dir.path(), false, None),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn table_has_header_and_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::prepare(dir.path()).unwrap();
        assert!(layout.data_dir.is_dir() && layout.images_dir.is_dir());

        let record = PhenotypeRecord {
            row: 1,
            col: 2,
            intensity: 0.5,
            area: 0.25,
            colony_mean: 0.75,
            colony_variance: 0.0,
            background_mean: 0.125,
            barcode: "P1".into(),
            filename: "P1_2020-01-01".into(),
        };
        let path = layout.table_path("P1_2020-01-01");
        write_table(&path, &[record]).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "Row\tColumn\tIntensity\tArea\tColonyMean\tColonyVariance\tBackgroundMean\tBarcode\tFilename"
        );
        assert_eq!(lines[1], "1\t2\t0.5\t0.25\t0.75\t0\t0.125\tP1\tP1_2020-01-01");
        assert_eq!(lines.len(), 2);
    }
}
