use crate::error::Error;
use crate::extraction::*;
use crate::test_helpers::{create_zip_archive, read_zip_entries};
use std::path::MAIN_SEPARATOR;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// ZipExtractor
// ---------------------------------------------------------------------------

#[test]
fn test_extract_flat_archive() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("1.2.3.4.5.6.1.zip");
    create_zip_archive(&archive, &[("IM0001.dcm", b"first"), ("IM0002.dcm", b"second")]);
    let dest = temp_dir.path().join("A4999").join("ct");

    let files = ZipExtractor::extract(&archive, &dest).unwrap();

    assert_eq!(files.len(), 2);
    assert_eq!(std::fs::read(dest.join("IM0001.dcm")).unwrap(), b"first");
    assert_eq!(std::fs::read(dest.join("IM0002.dcm")).unwrap(), b"second");
}

#[test]
fn test_extract_preserves_stored_paths() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("series.zip");
    create_zip_archive(&archive, &[("1.2.3.4.5.6.1/0001.dcm", b"nested")]);
    let dest = temp_dir.path().join("out");

    let files = ZipExtractor::extract(&archive, &dest).unwrap();

    assert_eq!(files, vec![dest.join("1.2.3.4.5.6.1").join("0001.dcm")]);
    assert_eq!(
        std::fs::read(dest.join("1.2.3.4.5.6.1/0001.dcm")).unwrap(),
        b"nested"
    );
}

#[test]
fn test_extract_skips_entries_escaping_destination() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("evil.zip");
    create_zip_archive(&archive, &[("../escape.dcm", b"x"), ("ok.dcm", b"y")]);
    let dest = temp_dir.path().join("out");

    let files = ZipExtractor::extract(&archive, &dest).unwrap();

    assert_eq!(files, vec![dest.join("ok.dcm")]);
    assert!(!temp_dir.path().join("escape.dcm").exists());
}

#[test]
fn test_extract_corrupt_archive() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("corrupt.zip");
    std::fs::write(&archive, b"this is not a zip file").unwrap();

    let err = ZipExtractor::extract(&archive, &temp_dir.path().join("out")).unwrap_err();

    match err {
        Error::Archive { archive: a, reason } => {
            assert_eq!(a, archive);
            assert!(reason.contains("failed to read ZIP archive"));
        }
        other => panic!("expected Archive error, got {other:?}"),
    }
}

#[test]
fn test_extract_missing_archive() {
    let temp_dir = TempDir::new().unwrap();
    let err = ZipExtractor::extract(
        &temp_dir.path().join("missing.zip"),
        &temp_dir.path().join("out"),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

// ---------------------------------------------------------------------------
// ZipPacker
// ---------------------------------------------------------------------------

#[test]
fn test_pack_directories_in_given_order() {
    let temp_dir = TempDir::new().unwrap();
    let subject = temp_dir.path().join("A4999");
    let pet = subject.join("pet");
    let ct = subject.join("ct");
    std::fs::create_dir_all(&pet).unwrap();
    std::fs::create_dir_all(&ct).unwrap();
    std::fs::write(pet.join("b.dcm"), b"pet-b").unwrap();
    std::fs::write(pet.join("a.dcm"), b"pet-a").unwrap();
    std::fs::write(ct.join("c.dcm"), b"ct-c").unwrap();
    let archive = temp_dir.path().join("A4999.zip");

    let names = ZipPacker::pack_directories(&archive, &[&pet, &ct]).unwrap();

    let expected = vec![
        format!("pet{MAIN_SEPARATOR}a.dcm"),
        format!("pet{MAIN_SEPARATOR}b.dcm"),
        format!("ct{MAIN_SEPARATOR}c.dcm"),
    ];
    assert_eq!(names, expected);
    let entries = read_zip_entries(&archive);
    let entry_names: Vec<_> = entries.iter().map(|(n, _)| n.clone()).collect();
    assert_eq!(entry_names, expected);
    assert_eq!(entries[0].1, b"pet-a");
    assert_eq!(entries[2].1, b"ct-c");
}

#[test]
fn test_pack_skips_subdirectories() {
    let temp_dir = TempDir::new().unwrap();
    let ct = temp_dir.path().join("ct");
    std::fs::create_dir_all(ct.join("1.2.3.4.5.6.1")).unwrap();
    std::fs::write(ct.join("1.2.3.4.5.6.1").join("deep.dcm"), b"deep").unwrap();
    std::fs::write(ct.join("top.dcm"), b"top").unwrap();
    let archive = temp_dir.path().join("out.zip");

    let names = ZipPacker::pack_directories(&archive, &[&ct]).unwrap();

    assert_eq!(names, vec![format!("ct{MAIN_SEPARATOR}top.dcm")]);
}

#[test]
fn test_pack_overwrites_existing_archive() {
    let temp_dir = TempDir::new().unwrap();
    let pet = temp_dir.path().join("pet");
    std::fs::create_dir_all(&pet).unwrap();
    std::fs::write(pet.join("new.dcm"), b"new").unwrap();
    let archive = temp_dir.path().join("A4999.zip");
    create_zip_archive(&archive, &[("stale.dcm", b"old")]);

    ZipPacker::pack_directories(&archive, &[&pet]).unwrap();

    let entries = read_zip_entries(&archive);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].0, format!("pet{MAIN_SEPARATOR}new.dcm"));
}

#[test]
fn test_failed_pack_keeps_previous_archive() {
    let temp_dir = TempDir::new().unwrap();
    let pet = temp_dir.path().join("pet");
    std::fs::create_dir_all(&pet).unwrap();
    std::fs::write(pet.join("new.dcm"), b"new").unwrap();
    let missing_ct = temp_dir.path().join("ct");
    let archive = temp_dir.path().join("A4999.zip");
    create_zip_archive(&archive, &[("previous.dcm", b"old")]);

    let result = ZipPacker::pack_directories(&archive, &[&pet, &missing_ct]);

    assert!(matches!(result, Err(Error::Io(_))));
    let entries = read_zip_entries(&archive);
    assert_eq!(entries, vec![("previous.dcm".to_string(), b"old".to_vec())]);
    assert!(!temp_dir.path().join("A4999.zip.part").exists());
}

#[test]
fn test_failed_pack_creates_no_archive() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("A4999.zip");

    let result = ZipPacker::pack_directories(&archive, &[&temp_dir.path().join("pet")]);

    assert!(result.is_err());
    assert!(!archive.exists());
    assert!(!temp_dir.path().join("A4999.zip.part").exists());
}

#[test]
fn test_roundtrip_through_extractor() {
    let temp_dir = TempDir::new().unwrap();
    let pet = temp_dir.path().join("pet");
    std::fs::create_dir_all(&pet).unwrap();
    std::fs::write(pet.join("x.dcm"), vec![7u8; 4096]).unwrap();
    let archive = temp_dir.path().join("s.zip");
    ZipPacker::pack_directories(&archive, &[&pet]).unwrap();

    let out = temp_dir.path().join("out");
    ZipExtractor::extract(&archive, &out).unwrap();

    assert_eq!(std::fs::read(out.join("pet").join("x.dcm")).unwrap(), vec![7u8; 4096]);
}
