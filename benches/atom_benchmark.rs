use atomos::{Atom, AtomicLong, AtomicReference, RetryPolicy};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Mutex;
use std::thread;

const THREADS: usize = 4;
const OPS: usize = 1_000;

fn bench_uncontended(c: &mut Criterion) {
    let mut group = c.benchmark_group("uncontended");

    group.bench_function("std_mutex", |b| {
        let m = Mutex::new(0_u64);
        b.iter(|| {
            let mut g = m.lock().unwrap();
            *g += 1;
            black_box(*g)
        });
    });

    group.bench_function("atomic_long_add_and_get", |b| {
        let n = AtomicLong::new(0);
        b.iter(|| black_box(n.add_and_get(1)));
    });

    group.bench_function("atomic_reference_cas", |b| {
        let r = AtomicReference::new(0_u64);
        b.iter(|| {
            let cur = r.get();
            black_box(r.compare_and_set(&cur, cur + 1))
        });
    });

    group.bench_function("atom_swap", |b| {
        let atom = Atom::new(0_u64);
        b.iter(|| black_box(atom.swap(|n| n + 1)));
    });

    group.finish();
}

fn bench_contended(c: &mut Criterion) {
    let mut group = c.benchmark_group("contended");

    group.bench_function("std_mutex", |b| {
        b.iter(|| {
            let m = Mutex::new(0_u64);
            thread::scope(|s| {
                for _ in 0..THREADS {
                    s.spawn(|| {
                        for _ in 0..OPS {
                            *m.lock().unwrap() += 1;
                        }
                    });
                }
            });
            black_box(m.into_inner().unwrap())
        });
    });

    group.bench_function("atom_swap", |b| {
        b.iter(|| {
            let atom = Atom::new(0_u64);
            thread::scope(|s| {
                for _ in 0..THREADS {
                    s.spawn(|| {
                        for _ in 0..OPS {
                            atom.swap(|n| n + 1);
                        }
                    });
                }
            });
            black_box(atom.deref())
        });
    });

    group.bench_function("atom_swap_backoff", |b| {
        b.iter(|| {
            let atom = Atom::new(0_u64).with_policy(RetryPolicy::unbounded().with_backoff());
            thread::scope(|s| {
                for _ in 0..THREADS {
                    s.spawn(|| {
                        for _ in 0..OPS {
                            atom.swap(|n| n + 1);
                        }
                    });
                }
            });
            black_box(atom.deref())
        });
    });

    group.finish();
}

criterion_group!(benches, bench_uncontended, bench_contended);
criterion_main!(benches);
