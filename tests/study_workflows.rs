//
// study_workflows.rs
// Dicom-Study-rs
//
// Integration-style tests covering study reading, UID lookup, dumping to stdout and files, summaries and temporary binary cleanup.
//
// Thales Matheus Mendonça Santos - November 2025

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use dicom::core::{DataElement, PrimitiveValue, Tag, VR};
use dicom::dictionary_std::StandardDataDictionary;
use dicom::object::{FileDicomObject, FileMetaTableBuilder, InMemDicomObject};
use dicom::transfer_syntax::entries::EXPLICIT_VR_LITTLE_ENDIAN;
use dicom_study::{execute, Cli, FieldDictionary, Instance, Study, StudyError};
use tempfile::{tempdir, TempDir};

const STUDY_UID: &str = "1.2.840.99";

fn write_test_dicom(path: &Path, sop_instance_uid: &str, study_uid: &str, series_uid: &str) {
    // Tiny Secondary Capture instance: one large private blob plus 2x2 8-bit pixel data.
    let mut obj = InMemDicomObject::new_empty_with_dict(StandardDataDictionary);
    obj.put(DataElement::new(
        Tag(0x0010, 0x0010),
        VR::PN,
        PrimitiveValue::from("Test^Patient"),
    ));
    obj.put(DataElement::new(
        Tag(0x0010, 0x0020),
        VR::LO,
        PrimitiveValue::from("PAT123"),
    ));
    obj.put(DataElement::new(
        Tag(0x0008, 0x0020),
        VR::DA,
        PrimitiveValue::from("20240101"),
    ));
    obj.put(DataElement::new(
        Tag(0x0008, 0x0060),
        VR::CS,
        PrimitiveValue::from("OT"),
    ));
    obj.put(DataElement::new(
        Tag(0x0008, 0x0016),
        VR::UI,
        PrimitiveValue::from("1.2.840.10008.5.1.4.1.1.7"),
    ));
    obj.put(DataElement::new(
        Tag(0x0008, 0x0018),
        VR::UI,
        PrimitiveValue::from(sop_instance_uid),
    ));
    obj.put(DataElement::new(
        Tag(0x0020, 0x000D),
        VR::UI,
        PrimitiveValue::from(study_uid),
    ));
    obj.put(DataElement::new(
        Tag(0x0020, 0x000E),
        VR::UI,
        PrimitiveValue::from(series_uid),
    ));
    obj.put(DataElement::new(
        Tag(0x0009, 0x1010),
        VR::OB,
        PrimitiveValue::from(vec![7_u8; 300]),
    )); // Large private blob, stored out of line
    obj.put(DataElement::new(
        Tag(0x0009, 0x1011),
        VR::OB,
        PrimitiveValue::from(vec![1_u8, 2, 3, 4]),
    )); // Small private blob, kept inline
    obj.put(DataElement::new(
        Tag(0x0028, 0x0010),
        VR::US,
        PrimitiveValue::from(2_u16),
    )); // Rows
    obj.put(DataElement::new(
        Tag(0x0028, 0x0011),
        VR::US,
        PrimitiveValue::from(2_u16),
    )); // Columns
    obj.put(DataElement::new(
        Tag(0x7fe0, 0x0010),
        VR::OB,
        PrimitiveValue::from(vec![0, 64, 128, 255]),
    ));

    let meta = FileMetaTableBuilder::new()
        .transfer_syntax(EXPLICIT_VR_LITTLE_ENDIAN.uid())
        .media_storage_sop_class_uid("1.2.840.10008.5.1.4.1.1.7")
        .media_storage_sop_instance_uid(sop_instance_uid)
        .build()
        .expect("meta");

    let mut file_obj = FileDicomObject::new_empty_with_dict_and_meta(StandardDataDictionary, meta);
    for elem in obj {
        file_obj.put(elem);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    file_obj.write_to_file(path).expect("write test dicom");
}

/// `studies/A`: two instances of one study plus a stray text file.
fn build_study_a() -> (TempDir, PathBuf) {
    let root = tempdir().expect("tempdir");
    let dir = root.path().join("studies").join("A");
    write_test_dicom(&dir.join("img1.dcm"), "1.2.3", STUDY_UID, "1.2.840.99.1");
    write_test_dicom(
        &dir.join("series2").join("img2.dcm"),
        "1.2.4",
        STUDY_UID,
        "1.2.840.99.2",
    );
    fs::write(dir.join("notes.txt"), "scan notes").expect("write notes");
    (root, dir)
}

fn dictionary() -> Arc<FieldDictionary> {
    Arc::new(FieldDictionary::default())
}

#[test]
fn study_a_end_to_end() {
    let (_root, dir) = build_study_a();

    let mut study = Study::open(&dir, dictionary()).expect("open study");
    assert_eq!(study.num_instances(), 2);
    assert_eq!(study.study_instance_uid(), STUDY_UID);

    let second = study.instance_by_uid("1.2.4").expect("lookup 1.2.4");
    assert_eq!(second.sop_instance_uid(), "1.2.4");
    assert_eq!(second.series_instance_uid(), Some("1.2.840.99.2"));
    assert!(study.instance_by_uid("1.2.3").is_ok());

    let text = study.dump_to_string().expect("dump");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], format!("> Study {}", STUDY_UID));
    let blocks = lines.iter().filter(|l| l.starts_with("> Instance ")).count();
    assert_eq!(blocks, 2);
    assert!(text.contains("> Instance 1.2.3"));
    assert!(text.contains("> Instance 1.2.4"));
    assert!(text.contains("PatientName PN Test^Patient"));
    assert!(text.contains("[binary item 0: 300 bytes]"));
    assert!(text.contains("PixelData OB [binary item 1: 4 bytes]"));

    // Stdout path: nothing attached.
    study.set_output(None).expect("stdout");
    study.dump().expect("dump to stdout");
    study.tidy().expect("tidy");
}

#[test]
fn binary_items_live_until_tidy() {
    let (_root, dir) = build_study_a();

    let mut study = Study::open(&dir, dictionary()).expect("open study");
    let files: Vec<PathBuf> = study
        .instances()
        .flat_map(|i| i.binaries().items())
        .filter_map(|item| item.file_path().map(Path::to_path_buf))
        .collect();

    // Private blob and pixel data for each of the two instances.
    assert_eq!(files.len(), 4);
    assert!(files.iter().all(|f| f.exists()));

    study.tidy().expect("tidy");
    assert!(files.iter().all(|f| !f.exists()));
    study.tidy().expect("second tidy is a no-op");
}

#[test]
fn dropping_a_study_removes_its_binary_items() {
    let (_root, dir) = build_study_a();

    let files: Vec<PathBuf> = {
        let study = Study::open(&dir, dictionary()).expect("open study");
        study
            .instances()
            .flat_map(|i| i.binaries().items())
            .filter_map(|item| item.file_path().map(Path::to_path_buf))
            .collect()
    };
    assert!(!files.is_empty());
    assert!(files.iter().all(|f| !f.exists()));
}

#[test]
fn dump_to_output_file() {
    let (root, dir) = build_study_a();
    let output = root.path().join("dump.txt");

    let mut study = Study::open(&dir, dictionary()).expect("open study");
    study.set_output(Some(output.as_path())).expect("set output");
    study.dump().expect("dump");
    study.tidy().expect("tidy");

    let text = fs::read_to_string(&output).expect("read dump");
    assert!(text.starts_with(&format!("> Study {}\n", STUDY_UID)));
    assert_eq!(text.matches("> Instance ").count(), 2);
}

#[test]
fn existing_output_is_left_alone() {
    let (root, dir) = build_study_a();
    let output = root.path().join("dump.txt");
    fs::write(&output, "previous run").expect("write");

    let mut study = Study::open(&dir, dictionary()).expect("open study");
    let err = study.set_output(Some(output.as_path())).unwrap_err();
    assert!(matches!(err, StudyError::OutputExists(_)));
    assert!(study.output_path().is_none());
    assert_eq!(fs::read_to_string(&output).expect("read"), "previous run");
    study.tidy().expect("tidy");
}

#[test]
fn missing_directory_fails_with_not_found() {
    let root = tempdir().expect("tempdir");
    let err = Study::open(root.path().join("studies/missing"), dictionary())
        .err()
        .expect("should fail");
    assert!(matches!(err, StudyError::DirectoryNotFound(_)));
}

#[test]
fn malformed_dicom_aborts_the_study() {
    let (_root, dir) = build_study_a();
    let mut bytes = vec![0_u8; 128];
    bytes.extend_from_slice(b"DICM");
    bytes.extend_from_slice(b"truncated");
    fs::write(dir.join("broken.dcm"), bytes).expect("write broken");

    let err = Study::open(&dir, dictionary()).err().expect("should fail");
    assert!(matches!(err, StudyError::Format { .. }));
}

#[test]
fn directory_without_dicom_is_empty_study() {
    let root = tempdir().expect("tempdir");
    fs::write(root.path().join("a.txt"), "hello").expect("write");

    let mut study = Study::open(root.path(), dictionary()).expect("open study");
    assert_eq!(study.num_instances(), 0);
    assert_eq!(study.study_instance_uid(), "");
    assert_eq!(study.dump_to_string().expect("dump"), "> Study \n");
    study.tidy().expect("tidy");
}

#[test]
fn summary_groups_instances_by_series() {
    let (_root, dir) = build_study_a();

    let study = Study::open(&dir, dictionary()).expect("open study");
    let summary = study.summary().expect("summary");
    assert_eq!(summary.study_instance_uid, STUDY_UID);
    assert_eq!(summary.number_of_instances, 2);
    assert_eq!(summary.study_date.as_deref(), Some("2024-01-01"));
    assert_eq!(summary.patient_id.as_deref(), Some("PAT123"));
    assert_eq!(summary.series.len(), 2);

    let series = &summary.series["1.2.840.99.2"];
    assert_eq!(series.instances.len(), 1);
    assert_eq!(series.instances[0].sop_instance_uid, "1.2.4");
    assert_eq!(series.instances[0].binary_items.len(), 2);
    assert_eq!(series.instances[0].binary_items[1].tag_path, "(7FE0,0010)");

    let json = serde_json::to_value(&summary).expect("serialize");
    assert_eq!(json["dictionary"], "std");
}

#[test]
fn write_summary_to_output_file() {
    let (root, dir) = build_study_a();
    let output = root.path().join("summary.json");

    let mut study = Study::open(&dir, dictionary()).expect("open study");
    study.set_output(Some(output.as_path())).expect("set output");
    study.write_summary().expect("write summary");
    study.tidy().expect("tidy");

    let value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&output).expect("read")).expect("parse");
    assert_eq!(value["study_instance_uid"], STUDY_UID);
    assert_eq!(value["number_of_instances"], 2);
}

#[test]
fn mixed_studies_fail_consistency_check() {
    let (_root, dir) = build_study_a();
    write_test_dicom(&dir.join("stray.dcm"), "1.2.5", "1.2.840.77", "1.2.840.77.1");

    let study = Study::open(&dir, dictionary()).expect("permissive open");
    assert_eq!(study.num_instances(), 3);
    assert!(matches!(
        study.check_consistency(),
        Err(StudyError::StudyMismatch { .. })
    ));
}

#[test]
fn strict_run_fails_before_creating_output() {
    let (root, dir) = build_study_a();
    write_test_dicom(&dir.join("stray.dcm"), "1.2.5", "1.2.840.77", "1.2.840.77.1");
    let output = root.path().join("dump.txt");

    let cli = Cli::try_parse_from([
        OsStr::new("dicom-study"),
        OsStr::new("--strict"),
        OsStr::new("-o"),
        output.as_os_str(),
        dir.as_os_str(),
    ])
    .expect("parse");
    let err = execute(&cli).expect_err("mixed studies");
    assert!(matches!(
        err.downcast_ref::<StudyError>(),
        Some(StudyError::StudyMismatch { .. })
    ));
    assert!(!output.exists());
}

#[test]
fn strict_run_writes_consistent_study() {
    let (root, dir) = build_study_a();
    let output = root.path().join("dump.txt");

    let cli = Cli::try_parse_from([
        OsStr::new("dicom-study"),
        OsStr::new("--strict"),
        OsStr::new("-o"),
        output.as_os_str(),
        dir.as_os_str(),
    ])
    .expect("parse");
    execute(&cli).expect("strict run");
    let text = fs::read_to_string(&output).expect("read dump");
    assert!(text.starts_with(&format!("> Study {}", STUDY_UID)));
}

#[test]
fn custom_dictionary_names_appear_in_dump() {
    let (root, dir) = build_study_a();
    let dict_path = root.path().join("dict.json");
    fs::write(&dict_path, r#"{"00091010": "VendorBlob"}"#).expect("write dictionary");

    let dictionary = FieldDictionary::open(dict_path.to_str().unwrap()).expect("dictionary");
    let study = Study::open(&dir, Arc::new(dictionary)).expect("open study");
    let text = study.dump_to_string().expect("dump");
    assert!(text.contains("(0009,1010) VendorBlob OB [binary item 0: 300 bytes]"));
}
