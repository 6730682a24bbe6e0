use super::{build_memtable, expected_crc};
use crate::{Operation, SsTable, SsTableError, SsTableWriter, MAGIC, VERSION};
use std::fs;
use tempfile::tempdir;

#[test]
fn header_and_trailer_are_byte_exact() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.sst");

    let mem = build_memtable(&[(b"age", Some(b"20")), (b"name", Some(b"imane"))]);
    SsTableWriter::write_from_memtable(&path, &mem).unwrap();

    let bytes = fs::read(&path).unwrap();
    let mut at = 0usize;

    assert_eq!(&bytes[at..at + 4], &MAGIC.to_be_bytes());
    at += 4;
    assert_eq!(&bytes[at..at + 4], &2u32.to_be_bytes());
    at += 4;
    assert_eq!(&bytes[at..at + 4], &3u32.to_be_bytes());
    at += 4;
    assert_eq!(&bytes[at..at + 3], b"age");
    at += 3;
    assert_eq!(&bytes[at..at + 4], &4u32.to_be_bytes());
    at += 4;
    assert_eq!(&bytes[at..at + 4], b"name");
    at += 4;
    assert_eq!(&bytes[at..at + 2], &VERSION.to_be_bytes());
    at += 2;

    // first entry: Set "age" -> "20"
    assert_eq!(bytes[at], 0);
    at += 1;
    assert_eq!(&bytes[at..at + 4], &3u32.to_be_bytes());
    at += 4;
    assert_eq!(&bytes[at..at + 4], &2u32.to_be_bytes());
    at += 4;
    assert_eq!(&bytes[at..at + 3], b"age");
    at += 3;
    assert_eq!(&bytes[at..at + 2], b"20");
    at += 2;

    // second entry: Set "name" -> "imane"
    assert_eq!(bytes[at], 0);
    at += 1 + 4 + 4;
    assert_eq!(&bytes[at..at + 4], b"name");
    at += 4;
    assert_eq!(&bytes[at..at + 5], b"imane");
    at += 5;

    let crc = expected_crc(&[(b"age", b"20"), (b"name", b"imane")]);
    assert_eq!(&bytes[at..at + 4], &crc.to_be_bytes());
    assert_eq!(bytes.len(), at + 4);
}

#[test]
fn entries_come_out_sorted_regardless_of_insert_order() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.sst");

    let mem = build_memtable(&[
        (b"name", Some(b"imane")),
        (b"age", Some(b"20")),
        (b"city", Some(b"azilal")),
        (b"university", Some(b"um6p")),
        (b"school", Some(b"cs")),
    ]);
    SsTableWriter::write_from_memtable(&path, &mem).unwrap();

    let table = SsTable::read(&path).unwrap();
    assert_eq!(table.len(), 5);
    assert_eq!(table.smallest_key(), b"age");
    assert_eq!(table.largest_key(), b"university");

    let keys: Vec<&[u8]> = table.entries().iter().map(|e| e.key.as_slice()).collect();
    assert_eq!(
        keys,
        vec![
            b"age".as_slice(),
            b"city",
            b"name",
            b"school",
            b"university"
        ]
    );
    assert!(table
        .entries()
        .iter()
        .all(|e| e.operation == Operation::Set));
}

#[test]
fn tombstone_emits_a_single_del_entry() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.sst");

    let mem = build_memtable(&[(b"keep", Some(b"v")), (b"gone", None)]);
    SsTableWriter::write_from_memtable(&path, &mem).unwrap();

    let table = SsTable::read(&path).unwrap();
    assert_eq!(table.len(), 2);

    let gone = table.get(b"gone").unwrap();
    assert_eq!(gone.operation, Operation::Del);
    assert!(gone.value.is_empty());

    let keep = table.get(b"keep").unwrap();
    assert_eq!(keep.operation, Operation::Set);
    assert_eq!(keep.value, b"v");
}

#[test]
fn empty_memtable_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.sst");

    let result = SsTableWriter::write_from_memtable(&path, &build_memtable(&[]));
    assert!(matches!(result, Err(SsTableError::InvalidArgument(_))));
    assert!(!path.exists());
}

#[test]
fn no_temp_file_survives_a_successful_write() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.sst");

    let mem = build_memtable(&[(b"k", Some(b"v"))]);
    SsTableWriter::write_from_memtable(&path, &mem).unwrap();

    let names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["t.sst".to_string()]);
}

#[test]
fn binary_keys_and_empty_values_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.sst");

    let key = vec![0x00u8, 0xFF, 0x01];
    let mut mem = build_memtable(&[(b"empty", Some(b""))]);
    mem.put(key.clone(), vec![0xAB, 0xCD]);
    SsTableWriter::write_from_memtable(&path, &mem).unwrap();

    let table = SsTable::read(&path).unwrap();
    assert_eq!(table.get(&key).unwrap().value, vec![0xAB, 0xCD]);
    let empty = table.get(b"empty").unwrap();
    assert_eq!(empty.operation, Operation::Set);
    assert!(empty.value.is_empty());
}
