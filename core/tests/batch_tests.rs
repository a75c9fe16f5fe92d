mod common;

use common::{write_cube_mask, write_phantom, CaseDirs};
use radiobatch_core::{
    pair_cases, pair_cases_with, BatchRunner, CaseExtractor, Cell, EngineAdapter, EngineError,
    EngineFactory, ExportSink, ExtractionConfig, FeatureEngine, FeatureVector, FilterSelection,
    LogReporter, NativeEngineFactory, PairingPolicy, RadiobatchError, Volume, XlsxSink,
};
use rstest::rstest;
use std::fs;
use tempfile::TempDir;

fn original_only() -> ExtractionConfig {
    ExtractionConfig::builder().build().unwrap()
}

fn runner() -> BatchRunner<EngineAdapter<NativeEngineFactory>> {
    BatchRunner::new(EngineAdapter::new(NativeEngineFactory))
}

#[test]
fn test_two_good_cases_original_only() {
    let dir = TempDir::new().unwrap();
    let dirs = CaseDirs::new(dir.path());
    dirs.add_named_case("A.nii", "A_mask.nii", 0.0, 2);
    dirs.add_named_case("B.nii", "B_mask.nii", 50.0, 5);

    let pairs = pair_cases(&dirs.images, &dirs.masks).unwrap();
    assert_eq!(pairs[0].mask_name(), "A_mask.nii");
    assert_eq!(pairs[1].mask_name(), "B_mask.nii");
    let table = runner().run(&original_only(), &pairs, &LogReporter);

    assert_eq!(table.len(), 2);
    assert_eq!(table.failure_count(), 0);
    assert_eq!(table.rows()[0].name(), "A.nii");
    assert_eq!(table.rows()[1].name(), "B.nii");

    let columns = table.columns();
    assert_eq!(columns[0], "ID_Name");
    assert!(!columns.contains(&"Error"));
    assert_eq!(columns.len(), 1 + 19);
    assert!(columns[1..].iter().all(|c| c.starts_with("original_")));

    for row in 0..2 {
        assert_eq!(table.cell(row, "original_shape_VoxelVolume"), Cell::Number(64.0));
        assert!(matches!(
            table.cell(row, "original_firstorder_Mean"),
            Cell::Number(v) if v.is_finite()
        ));
    }
}

#[test]
fn test_gzipped_cases_with_suffixed_masks() {
    let dir = TempDir::new().unwrap();
    let dirs = CaseDirs::new(dir.path());
    dirs.add_named_case("A.nii.gz", "A_mask.nii.gz", 0.0, 2);
    dirs.add_named_case("B.nii.gz", "B_mask.nii.gz", 50.0, 5);

    let pairs = pair_cases(&dirs.images, &dirs.masks).unwrap();
    let table = runner().run(&original_only(), &pairs, &LogReporter);

    assert_eq!(table.len(), 2);
    assert_eq!(table.failure_count(), 0);
    assert_eq!(table.rows()[0].name(), "A.nii.gz");
    assert_eq!(table.rows()[1].name(), "B.nii.gz");
    assert_eq!(table.cell(0, "original_shape_VoxelVolume"), Cell::Number(64.0));
    assert_eq!(table.columns().len(), 1 + 19);

    let by_name = pair_cases_with(&dirs.images, &dirs.masks, PairingPolicy::ByName).unwrap();
    assert_eq!(by_name, pairs);
}

#[test]
fn test_gzipped_volume_matches_plain() {
    let dir = TempDir::new().unwrap();
    let plain = dir.path().join("v.nii");
    let gzipped = dir.path().join("v.nii.gz");
    write_phantom(&plain, 3.0);
    write_phantom(&gzipped, 3.0);

    assert_eq!(Volume::load(&plain).unwrap(), Volume::load(&gzipped).unwrap());
}

#[test]
fn test_oversized_resampling_yields_failure_row() {
    let dir = TempDir::new().unwrap();
    let dirs = CaseDirs::new(dir.path());
    dirs.add_case("A.nii", 0.0, 4);

    let config = ExtractionConfig::builder()
        .resampled_spacing([1e-4, 1e-4, 1e-4])
        .build()
        .unwrap();
    let pairs = pair_cases(&dirs.images, &dirs.masks).unwrap();
    let table = runner().run(&config, &pairs, &LogReporter);

    assert_eq!(table.len(), 1);
    assert_eq!(table.failure_count(), 1);
    assert!(table.rows()[0].error().unwrap().contains("exceeds the limit"));
}

#[test]
fn test_corrupt_mask_yields_failure_row() {
    let dir = TempDir::new().unwrap();
    let dirs = CaseDirs::new(dir.path());
    dirs.add_case("A.nii", 0.0, 3);
    write_phantom(&dirs.images.join("B.nii"), 0.0);
    fs::write(dirs.masks.join("B.nii"), b"definitely not a volume").unwrap();

    let pairs = pair_cases(&dirs.images, &dirs.masks).unwrap();
    let table = runner().run(&original_only(), &pairs, &LogReporter);

    assert_eq!(table.len(), 2);
    assert_eq!(table.failure_count(), 1);
    assert!(!table.rows()[0].is_failure());

    let failed = &table.rows()[1];
    assert_eq!(failed.name(), "B.nii");
    assert!(failed.error().unwrap().contains("failed to load"));
    assert_eq!(table.cell(1, "original_firstorder_Mean"), Cell::Absent);
    assert!(table.columns().contains(&"Error"));

    let bytes = XlsxSink.serialize(&table).unwrap();
    assert_eq!(&bytes[..2], b"PK");
}

#[test]
fn test_empty_mask_yields_failure_row() {
    let dir = TempDir::new().unwrap();
    let dirs = CaseDirs::new(dir.path());
    write_phantom(&dirs.images.join("A.nii"), 0.0);
    common::write_nifti(&dirs.masks.join("A.nii"), [12, 12, 12], [1.0; 3], |_, _, _| 0.0);

    let pairs = pair_cases(&dirs.images, &dirs.masks).unwrap();
    let table = runner().run(&original_only(), &pairs, &LogReporter);

    assert_eq!(table.failure_count(), 1);
    assert!(table.rows()[0].error().unwrap().contains("label 1"));
}

#[test]
fn test_geometry_mismatch_yields_failure_row() {
    let dir = TempDir::new().unwrap();
    let dirs = CaseDirs::new(dir.path());
    write_phantom(&dirs.images.join("A.nii"), 0.0);
    common::write_nifti(&dirs.masks.join("A.nii"), [10, 12, 12], [1.0; 3], |_, _, _| 1.0);

    let pairs = pair_cases(&dirs.images, &dirs.masks).unwrap();
    let table = runner().run(&original_only(), &pairs, &LogReporter);

    assert!(table.rows()[0].error().unwrap().contains("geometry mismatch"));
}

#[test]
fn test_missing_mask_dir_fails_before_extraction() {
    let dir = TempDir::new().unwrap();
    let images = dir.path().join("images");
    fs::create_dir(&images).unwrap();
    write_phantom(&images.join("A.nii"), 0.0);

    let err = pair_cases(&images, &dir.path().join("masks")).unwrap_err();
    assert!(matches!(err, RadiobatchError::Path { .. }));
}

#[test]
fn test_rerun_is_identical() {
    let dir = TempDir::new().unwrap();
    let dirs = CaseDirs::new(dir.path());
    dirs.add_case("A.nii", 0.0, 2);
    dirs.add_case("B.nii", 7.0, 4);

    let config = ExtractionConfig::builder()
        .filters(FilterSelection::parse(&["Original", "Square", "LoG"]).unwrap())
        .build()
        .unwrap();
    let pairs = pair_cases(&dirs.images, &dirs.masks).unwrap();

    let first = runner().run(&config, &pairs, &LogReporter);
    let second = runner().run(&config, &pairs, &LogReporter);
    assert_eq!(first, second);
}

#[rstest]
#[case(2)]
#[case(4)]
fn test_parallel_matches_sequential(#[case] workers: usize) {
    let dir = TempDir::new().unwrap();
    let dirs = CaseDirs::new(dir.path());
    for i in 0..6 {
        dirs.add_case(&format!("case{}.nii", i), i as f32 * 10.0, 1 + i);
    }
    write_phantom(&dirs.images.join("case6.nii"), 0.0);
    fs::write(dirs.masks.join("case6.nii"), b"broken").unwrap();

    let pairs = pair_cases(&dirs.images, &dirs.masks).unwrap();
    let sequential = runner().run(&original_only(), &pairs, &LogReporter);
    let parallel = runner()
        .with_workers(workers)
        .run(&original_only(), &pairs, &LogReporter);

    assert_eq!(sequential, parallel);
    assert_eq!(parallel.len(), 7);
    assert_eq!(parallel.failure_count(), 1);
}

#[test]
fn test_all_filters_column_count() {
    let dir = TempDir::new().unwrap();
    let dirs = CaseDirs::new(dir.path());
    dirs.add_case("A.nii", 100.0, 4);

    let config = ExtractionConfig::builder()
        .filters(FilterSelection::All)
        .build()
        .unwrap();
    let pairs = pair_cases(&dirs.images, &dirs.masks).unwrap();
    let table = runner().run(&config, &pairs, &LogReporter);

    assert_eq!(table.failure_count(), 0);
    // original, 8 wavelet bands, 4 point filters, gradient, 5 LoG, 2 LBP
    assert_eq!(table.feature_columns().len(), 21 * 18 + 1);
}

struct PanickingFactory;
struct PanickingEngine;

impl FeatureEngine for PanickingEngine {
    fn execute(&mut self, _: &Volume, _: &Volume) -> Result<FeatureVector, EngineError> {
        panic!("histogram overflow");
    }
}

impl EngineFactory for PanickingFactory {
    type Engine = PanickingEngine;

    fn build(&self, _: &ExtractionConfig) -> Result<PanickingEngine, EngineError> {
        Ok(PanickingEngine)
    }
}

#[test]
fn test_engine_panic_is_contained() {
    let dir = TempDir::new().unwrap();
    let dirs = CaseDirs::new(dir.path());
    dirs.add_case("A.nii", 0.0, 2);
    let pairs = pair_cases(&dirs.images, &dirs.masks).unwrap();

    let adapter = EngineAdapter::new(PanickingFactory);
    let err = adapter.extract(&original_only(), &pairs[0]).unwrap_err();
    assert!(err.is_per_case());
    assert!(err.to_string().contains("engine panicked: histogram overflow"));

    let table = BatchRunner::new(adapter).run(&original_only(), &pairs, &LogReporter);
    assert_eq!(table.failure_count(), 1);
}

#[test]
fn test_mask_written_by_helper_loads() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("m.nii");
    write_cube_mask(&path, 0);
    let volume = Volume::load(&path).unwrap();
    assert_eq!(volume.shape(), [12, 12, 12]);
    assert_eq!(volume.roi(1).iter().filter(|&&v| v).count(), 64);
}
