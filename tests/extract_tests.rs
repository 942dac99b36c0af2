use dumpsync::error::ExtractError;
use dumpsync::extract::{DEFAULT_SIZE_LIMIT, extract_sql_files};
use flate2::{Compression, write::GzEncoder};
use std::io::Write;
use std::path::PathBuf;

fn tar_bytes(members: &[(&str, &str)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (name, contents) in members {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, name, contents.as_bytes())
            .expect("append member");
    }
    builder.into_inner().expect("finish tar")
}

fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).expect("gzip write");
    encoder.finish().expect("gzip finish")
}

fn write_archive(bytes: &[u8], name: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join(name);
    std::fs::write(&path, bytes).expect("write archive");
    (dir, path)
}

const MEMBERS: &[(&str, &str)] = &[
    ("a.sql", "CREATE TABLE widgets (id INT);"),
    ("b.sql", "INSERT INTO widgets VALUES (1);"),
    ("c.sql", "INSERT INTO widgets VALUES (2);"),
];

#[test]
fn plain_tar_preserves_member_order() {
    let (_dir, path) = write_archive(&tar_bytes(MEMBERS), "dump.tar");

    let files = extract_sql_files(&path, DEFAULT_SIZE_LIMIT).expect("extract");

    let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["a.sql", "b.sql", "c.sql"]);
    assert_eq!(files[0].contents, MEMBERS[0].1);
    assert_eq!(files[2].contents, MEMBERS[2].1);
}

#[test]
fn gzipped_tar_is_detected_and_decompressed() {
    let (_dir, path) = write_archive(&gzip(&tar_bytes(MEMBERS)), "dump.tar.gz");

    let files = extract_sql_files(&path, DEFAULT_SIZE_LIMIT).expect("extract");

    let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["a.sql", "b.sql", "c.sql"]);
}

#[test]
fn corrupt_archive_is_rejected() {
    let (_dir, path) = write_archive(b"this is not a tar archive at all", "dump.tar");

    let err = extract_sql_files(&path, DEFAULT_SIZE_LIMIT).expect_err("must fail");
    assert!(matches!(err, ExtractError::Corrupt(_)), "got {err:?}");
}

#[test]
fn truncated_gzip_is_rejected() {
    let mut bytes = gzip(&tar_bytes(MEMBERS));
    bytes.truncate(bytes.len() / 2);
    let (_dir, path) = write_archive(&bytes, "dump.tar.gz");

    let err = extract_sql_files(&path, DEFAULT_SIZE_LIMIT).expect_err("must fail");
    assert!(matches!(err, ExtractError::Corrupt(_)), "got {err:?}");
}

#[test]
fn size_bound_rejects_oversized_archives_without_partial_output() {
    let big = "-- filler\n".repeat(1024);
    let members = [("a.sql", big.as_str()), ("b.sql", big.as_str())];
    let (_dir, path) = write_archive(&tar_bytes(&members), "dump.tar");

    // Bound below the cumulative member size.
    let err = extract_sql_files(&path, 1024).expect_err("must fail");
    assert!(
        matches!(err, ExtractError::SizeLimit { limit: 1024 }),
        "got {err:?}"
    );
}

#[test]
fn archives_with_only_empty_members_are_rejected() {
    let members = [("a.sql", "   \n"), ("b.sql", "")];
    let (_dir, path) = write_archive(&tar_bytes(&members), "dump.tar");

    let err = extract_sql_files(&path, DEFAULT_SIZE_LIMIT).expect_err("must fail");
    assert!(matches!(err, ExtractError::NoSqlMembers), "got {err:?}");
}

#[test]
fn empty_members_are_skipped_but_real_ones_survive() {
    let members = [("0-empty.sql", ""), ("1-schema.sql", "CREATE TABLE t (id INT);")];
    let (_dir, path) = write_archive(&tar_bytes(&members), "dump.tar");

    let files = extract_sql_files(&path, DEFAULT_SIZE_LIMIT).expect("extract");
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].name, "1-schema.sql");
}
