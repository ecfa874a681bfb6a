mod common;

use colony_grid::grid::{
    GridLocator, PatternSearchLocator, PatternSearchParams, PeakProfileLocator, PeakProfileParams,
};
use colony_grid::{ErrorKind, GridSpec};
use common::synthetic_image::SyntheticPlate;
use std::time::{Duration, Instant};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn assert_within(actual: usize, expected: usize, tolerance: f32, what: &str) {
    let diff = (actual as f32 - expected as f32).abs();
    assert!(
        diff <= tolerance,
        "{what}: got {actual}, expected {expected} (tolerance {tolerance:.2})"
    );
}

#[test]
fn pattern_search_recovers_noisy_grid() {
    init_logger();
    // 2×3 plate of 88 px cells: grid is 264×176, i.e. 88 % of the width.
    let plate = SyntheticPlate::uniform(300, 200, (15, 12), 88, 2, 3, 22.0).with_noise(5, 7);
    let image = plate.render();
    let grid = GridSpec::new(2, 3).unwrap();

    let locator = PatternSearchLocator::new(PatternSearchParams::default(), 0.85);
    let detection = locator.locate(image.as_view(), grid).unwrap();
    let p = detection.placement;

    let tolerance = 0.02 * plate.cell as f32;
    assert_within(p.origin.0, 15, tolerance, "origin.x");
    assert_within(p.origin.1, 12, tolerance, "origin.y");
    assert_within(p.patch_width, 88, tolerance, "patch_width");
    assert_within(p.patch_height, 88, tolerance, "patch_height");
    assert_eq!(detection.strategy, "pattern_search");
    assert!(detection.score.unwrap() < 0.5);
    assert!(p.origin.0 + 3 * p.patch_width <= 300);
    assert!(p.origin.1 + 2 * p.patch_height <= 200);
}

#[test]
fn pattern_search_handles_full_plate_at_default_fraction() {
    init_logger();
    // 8×12 plate of 40 px cells: grid is 480×320 inside a 520×360 frame.
    let plate = SyntheticPlate::uniform(520, 360, (21, 21), 40, 8, 12, 10.0).with_noise(5, 11);
    let image = plate.render();
    let grid = GridSpec::new(8, 12).unwrap();

    let locator = PatternSearchLocator::new(PatternSearchParams::default(), 0.8);
    assert_eq!(locator.scale_fractions().len(), 100);
    let start = Instant::now();
    let detection = locator.locate(image.as_view(), grid).unwrap();
    let elapsed = start.elapsed();
    let p = detection.placement;

    assert_within(p.origin.0, 21, 1.0, "origin.x");
    assert_within(p.origin.1, 21, 1.0, "origin.y");
    let pitch_x = p.width as f32 / 12.0;
    let pitch_y = p.height as f32 / 8.0;
    assert!((pitch_x - 40.0).abs() <= 0.8, "column pitch {pitch_x}");
    assert!((pitch_y - 40.0).abs() <= 0.8, "row pitch {pitch_y}");
    assert!(p.origin.0 + p.width <= 520 && p.origin.1 + p.height <= 360);
    assert!(detection.score.unwrap() < 0.5);
    assert!(
        elapsed < Duration::from_secs(20),
        "pattern search took {elapsed:?}"
    );
}

#[test]
fn peak_profile_recovers_grid() {
    init_logger();
    let plate = SyntheticPlate::uniform(260, 170, (30, 20), 60, 2, 3, 18.0);
    let image = plate.render();
    let grid = GridSpec::new(2, 3).unwrap();

    let locator = PeakProfileLocator::new(PeakProfileParams::default(), 0.5);
    let detection = locator.locate(image.as_view(), grid).unwrap();
    let p = detection.placement;

    let tolerance = 0.02 * plate.cell as f32;
    assert_within(p.origin.0, 30, tolerance, "origin.x");
    assert_within(p.origin.1, 20, tolerance, "origin.y");
    assert_within(p.patch_width, 60, tolerance, "patch_width");
    assert_within(p.patch_height, 60, tolerance, "patch_height");
    assert!(detection.score.is_none());
}

#[test]
fn peak_profile_fails_without_enough_peaks() {
    init_logger();
    // Only one row of spots for a two-row grid.
    let plate = SyntheticPlate::uniform(260, 170, (30, 20), 60, 2, 3, 18.0)
        .with_radius(1, 0, 0.0)
        .with_radius(1, 1, 0.0)
        .with_radius(1, 2, 0.0);
    let image = plate.render();
    let locator = PeakProfileLocator::new(PeakProfileParams::default(), 0.5);
    let err = locator
        .locate(image.as_view(), GridSpec::new(2, 3).unwrap())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Detection);
}
