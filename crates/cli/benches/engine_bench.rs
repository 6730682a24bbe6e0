use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use engine::{Db, Options};
use memtable::Memtable;
use sstable::{SsTable, SsTableWriter};
use tempfile::tempdir;

const N_KEYS: usize = 10_000;
const VALUE_SIZE: usize = 100;

fn build_memtable() -> Memtable {
    let mut mem = Memtable::new();
    for i in 0..N_KEYS {
        mem.put(format!("key{i}").into_bytes(), vec![b'x'; VALUE_SIZE]);
    }
    mem
}

fn sstable_write_benchmark(c: &mut Criterion) {
    c.bench_function("sstable_write_from_memtable_10k", |b| {
        b.iter_batched(
            || {
                let dir = tempdir().unwrap();
                let path = dir.path().join("bench.sst");
                let mem = build_memtable();
                (dir, path, mem)
            },
            |(_dir, path, mem)| {
                SsTableWriter::write_from_memtable(&path, &mem).unwrap();
            },
            BatchSize::SmallInput,
        );
    });
}

fn sstable_read_benchmark(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bench.sst");
    SsTableWriter::write_from_memtable(&path, &build_memtable()).unwrap();

    c.bench_function("sstable_read_10k", |b| {
        b.iter(|| SsTable::read(&path).unwrap());
    });

    let table = SsTable::read(&path).unwrap();
    c.bench_function("sstable_get_hit_10k", |b| {
        b.iter(|| table.get(b"key5000").unwrap());
    });
}

fn engine_set_benchmark(c: &mut Criterion) {
    c.bench_function("engine_set_unsynced_1k", |b| {
        b.iter_batched(
            || {
                let dir = tempdir().unwrap();
                let db = Db::open(
                    dir.path().join("wal.log"),
                    dir.path().join("sst"),
                    Options {
                        threshold: 100_000,
                        compaction_threshold: 1000,
                        wal_sync: false,
                    },
                )
                .unwrap();
                (dir, db)
            },
            |(_dir, db)| {
                for i in 0..1000usize {
                    db.set(format!("key{i}").into_bytes(), vec![b'x'; VALUE_SIZE])
                        .unwrap();
                }
            },
            BatchSize::SmallInput,
        );
    });
}

fn engine_get_benchmark(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let db = Db::open(
        dir.path().join("wal.log"),
        dir.path().join("sst"),
        Options {
            threshold: 1000,
            compaction_threshold: 1000,
            wal_sync: false,
        },
    )
    .unwrap();
    for i in 0..5000usize {
        db.set(format!("key{i}").into_bytes(), vec![b'x'; VALUE_SIZE])
            .unwrap();
    }

    c.bench_function("engine_get_across_layers", |b| {
        b.iter(|| db.get(b"key123").unwrap());
    });
}

criterion_group!(
    benches,
    sstable_write_benchmark,
    sstable_read_benchmark,
    engine_set_benchmark,
    engine_get_benchmark
);
criterion_main!(benches);
