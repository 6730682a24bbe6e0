use super::build_memtable;
use crate::{merge, Operation, SsTable, SsTableError, SsTableWriter, COMPACT_PREFIX};
use std::path::PathBuf;
use tempfile::tempdir;

fn write_table(dir: &std::path::Path, name: &str, entries: &[(&[u8], Option<&[u8]>)]) -> PathBuf {
    let path = dir.join(name);
    SsTableWriter::write_from_memtable(&path, &build_memtable(entries)).unwrap();
    path
}

#[test]
fn newest_input_wins_per_key() {
    let dir = tempdir().unwrap();
    let old = write_table(
        dir.path(),
        "old.sst",
        &[(b"a", Some(b"old-a")), (b"b", Some(b"old-b"))],
    );
    let new = write_table(
        dir.path(),
        "new.sst",
        &[(b"b", Some(b"new-b")), (b"c", Some(b"new-c"))],
    );

    let merged_path = merge(&[old, new], dir.path()).unwrap();
    let merged = SsTable::read(&merged_path).unwrap();

    assert_eq!(merged.len(), 3);
    assert_eq!(merged.get(b"a").unwrap().value, b"old-a");
    assert_eq!(merged.get(b"b").unwrap().value, b"new-b");
    assert_eq!(merged.get(b"c").unwrap().value, b"new-c");
}

#[test]
fn tombstones_survive_the_merge() {
    let dir = tempdir().unwrap();
    let old = write_table(dir.path(), "old.sst", &[(b"k", Some(b"v"))]);
    let new = write_table(dir.path(), "new.sst", &[(b"k", None), (b"other", Some(b"x"))]);

    let merged_path = merge(&[old, new], dir.path()).unwrap();
    let merged = SsTable::read(&merged_path).unwrap();

    let k = merged.get(b"k").unwrap();
    assert_eq!(k.operation, Operation::Del);
    assert!(k.value.is_empty());
    assert_eq!(merged.get(b"other").unwrap().value, b"x");
}

#[test]
fn newer_set_resurrects_a_deleted_key() {
    let dir = tempdir().unwrap();
    let old = write_table(dir.path(), "old.sst", &[(b"k", None)]);
    let new = write_table(dir.path(), "new.sst", &[(b"k", Some(b"back"))]);

    let merged_path = merge(&[old, new], dir.path()).unwrap();
    let merged = SsTable::read(&merged_path).unwrap();
    assert_eq!(merged.get(b"k").unwrap().operation, Operation::Set);
    assert_eq!(merged.get(b"k").unwrap().value, b"back");
}

#[test]
fn output_is_a_compact_table_with_valid_range() {
    let dir = tempdir().unwrap();
    let a = write_table(dir.path(), "a.sst", &[(b"m", Some(b"1"))]);
    let b = write_table(dir.path(), "b.sst", &[(b"a", Some(b"2")), (b"z", Some(b"3"))]);

    let merged_path = merge(&[a, b], dir.path()).unwrap();
    let name = merged_path.file_name().unwrap().to_string_lossy();
    assert!(name.starts_with(COMPACT_PREFIX));
    assert!(name.ends_with(".sst"));

    // inputs are untouched; deleting them is the engine's job
    assert!(dir.path().join("a.sst").exists());
    assert!(dir.path().join("b.sst").exists());

    let merged = SsTable::read(&merged_path).unwrap();
    assert_eq!(merged.smallest_key(), b"a");
    assert_eq!(merged.largest_key(), b"z");
}

#[test]
fn merge_of_no_inputs_is_rejected() {
    let dir = tempdir().unwrap();
    let inputs: Vec<PathBuf> = Vec::new();
    assert!(matches!(
        merge(&inputs, dir.path()),
        Err(SsTableError::InvalidArgument(_))
    ));
}

#[test]
fn chained_merges_keep_converging() {
    let dir = tempdir().unwrap();
    let t1 = write_table(dir.path(), "t1.sst", &[(b"a", Some(b"1"))]);
    let t2 = write_table(dir.path(), "t2.sst", &[(b"a", Some(b"2"))]);
    let t3 = write_table(dir.path(), "t3.sst", &[(b"a", Some(b"3"))]);

    let first = merge(&[t1, t2], dir.path()).unwrap();
    let second = merge(&[first.clone(), t3], dir.path()).unwrap();
    assert_ne!(first, second);

    let merged = SsTable::read(&second).unwrap();
    assert_eq!(merged.len(), 1);
    assert_eq!(merged.get(b"a").unwrap().value, b"3");
}
