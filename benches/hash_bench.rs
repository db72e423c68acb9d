use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use hashdb::storage::EntryKind;
use hashdb::utils::hash::{DEFAULT_MMAP_THRESHOLD, DigestAlgorithm, Hasher};
use std::fs;
use std::hint::black_box;
use tempfile::tempdir;

fn benchmark_file_hashing(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let sizes: [(&str, u64); 3] = [("1kb", 1024), ("100kb", 100 * 1024), ("10mb", 10 * 1024 * 1024)];

    let mut group = c.benchmark_group("file_hashing");
    for algorithm in [DigestAlgorithm::Sha512, DigestAlgorithm::Sha256] {
        let hasher = Hasher::new(algorithm, DEFAULT_MMAP_THRESHOLD);
        for (label, size) in sizes {
            let path = dir.path().join(label);
            fs::write(&path, vec![b'x'; usize::try_from(size).unwrap()]).unwrap();
            group.bench_with_input(
                BenchmarkId::new(format!("{algorithm:?}"), label),
                &path,
                |b, path| b.iter(|| hasher.digest_kind(black_box(path), EntryKind::File, size)),
            );
        }
    }
    group.finish();
}

fn benchmark_mmap_threshold(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("large");
    let size = 8 * 1024 * 1024;
    fs::write(&path, vec![b'y'; size]).unwrap();

    let mut group = c.benchmark_group("mmap_vs_stream");
    for (label, threshold) in [("mmap", 0), ("stream", u64::MAX)] {
        let hasher = Hasher::new(DigestAlgorithm::Sha512, threshold);
        group.bench_function(label, |b| {
            b.iter(|| hasher.digest_path(black_box(&path)));
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_file_hashing, benchmark_mmap_threshold);
criterion_main!(benches);
