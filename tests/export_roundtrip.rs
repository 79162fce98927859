use std::fs;

use tabular_pipeline::export::{write, ExportFormat};
use tabular_pipeline::source::{acquire, AcquireOptions, SourceDescriptor};
use tabular_pipeline::types::DataSet;

fn load(path: impl AsRef<std::path::Path>) -> DataSet {
    acquire(&SourceDescriptor::file(path.as_ref()), &AcquireOptions::default())
        .unwrap()
        .into_dataset()
        .unwrap()
}

#[test]
fn csv_round_trip_preserves_names_rows_and_values() {
    let original = load("tests/fixtures/people.csv");
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("people_out.csv");

    let stats = write(&original, ExportFormat::Csv, &out).unwrap();
    assert_eq!(stats.rows, 4);
    assert_eq!(stats.columns, 7);

    let reloaded = load(&out);
    assert_eq!(reloaded.column_names(), original.column_names());
    assert_eq!(reloaded.row_count(), original.row_count());
    assert_eq!(reloaded.rows, original.rows);
    assert_eq!(reloaded.schema, original.schema);
}

#[test]
fn json_round_trip_preserves_values() {
    let original = load("tests/fixtures/people.csv");
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("people_out.ndjson");

    write(&original, ExportFormat::Json, &out).unwrap();
    let reloaded = load(&out);
    assert_eq!(reloaded.column_names(), original.column_names());
    assert_eq!(reloaded.rows, original.rows);
}

#[test]
fn zero_row_export_writes_header_only() {
    let original = load("tests/fixtures/people.csv");
    let empty = DataSet::empty(original.schema.clone());
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("empty.csv");

    let stats = write(&empty, ExportFormat::Csv, &out).unwrap();
    assert_eq!(stats.rows, 0);
    assert_eq!(
        fs::read_to_string(&out).unwrap(),
        "id,name,age,score,active,joined,team\n"
    );
}

#[test]
fn zero_row_json_export_reads_back_empty() {
    let original = load("tests/fixtures/people.csv");
    let empty = DataSet::empty(original.schema.clone());
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("empty.json");

    write(&empty, ExportFormat::Json, &out).unwrap();
    assert_eq!(fs::read_to_string(&out).unwrap(), "");

    assert_eq!(load(&out).row_count(), 0);

    let opts = AcquireOptions {
        schema: Some(original.schema.clone()),
        ..Default::default()
    };
    let reloaded = acquire(&SourceDescriptor::file(&out), &opts)
        .unwrap()
        .into_dataset()
        .unwrap();
    assert_eq!(reloaded, empty);
}

#[test]
fn export_overwrites_existing_destination() {
    let original = load("tests/fixtures/people.csv");
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("people.csv");
    fs::write(&out, "stale").unwrap();

    write(&original, ExportFormat::Csv, &out).unwrap();
    assert!(fs::read_to_string(&out).unwrap().starts_with("id,name,"));
    // Only the destination remains; the temp file was renamed into place.
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[cfg(feature = "excel")]
#[test]
fn xlsx_round_trip_preserves_names_and_rows() {
    let original = load("tests/fixtures/people.csv");
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("people.xlsx");

    write(&original, ExportFormat::Xlsx, &out).unwrap();
    let reloaded = load(&out);
    assert_eq!(reloaded.column_names(), original.column_names());
    assert_eq!(reloaded.row_count(), original.row_count());
    assert_eq!(reloaded.rows[0][1], original.rows[0][1]);
    assert_eq!(reloaded.rows[1][2], original.rows[1][2]);
}

#[cfg(feature = "excel")]
#[test]
fn zero_row_xlsx_keeps_header() {
    let original = load("tests/fixtures/people.csv");
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("empty.xlsx");

    write(&DataSet::empty(original.schema.clone()), ExportFormat::Xlsx, &out).unwrap();
    let reloaded = load(&out);
    assert_eq!(reloaded.column_names(), original.column_names());
    assert_eq!(reloaded.row_count(), 0);
}
