use atomos::{Atom, Error, RetryPolicy};
use proptest::prelude::*;
use proptest::test_runner::{TestCaseResult, TestRunner};
use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

#[test]
fn test_concurrent_swap_loses_no_updates() {
    let atom = Atom::new(0_u64);
    thread::scope(|s| {
        for _ in 0..10 {
            s.spawn(|| {
                for _ in 0..1000 {
                    atom.swap(|n| n + 1);
                }
            });
        }
    });
    assert_eq!(atom.deref(), 10_000);
}

#[test]
fn test_concurrent_compare_and_set_counts_transitions() {
    let atom = Atom::new(0_u64);
    let successes = AtomicUsize::new(0);

    thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|| {
                for _ in 0..500 {
                    let current = atom.deref();
                    if atom.compare_and_set(&current, current + 1) {
                        successes.fetch_add(1, Ordering::SeqCst);
                    }
                }
            });
        }
    });

    let transitions = atom.deref();
    assert_eq!(successes.load(Ordering::SeqCst) as u64, transitions);
}

#[test]
fn test_every_transition_is_notified_once_with_its_pair() {
    let atom = Atom::new(0_u64);
    let seen = Arc::new(Mutex::new(Vec::new()));
    {
        let seen = Arc::clone(&seen);
        atom.add_watch("audit", move |_, _, old, new| {
            seen.lock().unwrap().push((*old, *new));
        });
    }

    thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..250 {
                    atom.swap(|n| n + 1);
                }
            });
        }
    });

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1000);
    let olds: HashSet<u64> = seen.iter().map(|&(old, _)| old).collect();
    assert_eq!(olds.len(), 1000);
    assert!(seen.iter().all(|&(old, new)| new == old + 1));
}

#[test]
fn test_reset_returns_prior_value_and_notifies() {
    let atom = Atom::new(String::from("foo"));
    let calls = Arc::new(AtomicUsize::new(0));
    {
        let calls = Arc::clone(&calls);
        atom.add_watch("k", move |key, _, old, new| {
            assert_eq!(key, "k");
            assert_eq!((old.as_str(), new.as_str()), ("foo", "bar"));
            calls.fetch_add(1, Ordering::SeqCst);
        });
    }

    assert_eq!(atom.reset("bar".into()), "foo");
    assert_eq!(atom.deref(), "bar");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_removed_watch_is_not_invoked() {
    let atom = Atom::new(0);
    let calls = Arc::new(AtomicUsize::new(0));
    {
        let calls = Arc::clone(&calls);
        atom.add_watch("k", move |_, _, _, _| {
            calls.fetch_add(1, Ordering::SeqCst);
        });
    }

    atom.swap(|n| n + 1);
    assert!(atom.remove_watch("k"));
    atom.swap(|n| n + 1);
    atom.reset(10);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_failed_compare_and_set_does_not_notify() {
    let atom = Atom::new(1);
    atom.add_watch("k", |_, _, _, _| panic!("no transition happened"));
    assert!(!atom.compare_and_set(&0, 2));
    assert_eq!(atom.deref(), 1);
}

#[test]
fn test_bounded_swap_under_contention() {
    let limit = NonZeroUsize::new(1).unwrap();
    let atom = Atom::new(0_u64).with_policy(RetryPolicy::unbounded().with_limit(limit));
    let exhausted = AtomicUsize::new(0);
    let won = AtomicUsize::new(0);

    thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..500 {
                    match atom.try_swap(|n| n + 1) {
                        Ok(_) => won.fetch_add(1, Ordering::SeqCst),
                        Err(Error::RetriesExhausted { attempts: 1 }) => {
                            exhausted.fetch_add(1, Ordering::SeqCst)
                        }
                        Err(other) => panic!("unexpected error {other}"),
                    };
                }
            });
        }
    });

    assert_eq!(won.load(Ordering::SeqCst) + exhausted.load(Ordering::SeqCst), 2000);
    assert_eq!(atom.deref(), won.load(Ordering::SeqCst) as u64);
}

#[derive(Debug, Clone)]
enum Op {
    Swap(i64),
    Reset(i64),
    Cas(i64, i64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (-5_i64..5).prop_map(Op::Swap),
        (-5_i64..5).prop_map(Op::Reset),
        ((-5_i64..5), (-5_i64..5)).prop_map(|(e, u)| Op::Cas(e, u)),
    ]
}

fn run_proptest<S, F>(strategy: S, test: F)
where
    S: Strategy,
    F: Fn(S::Value) -> TestCaseResult,
{
    let mut runner = TestRunner::default();
    runner.run(&strategy, test).unwrap();
}

#[test]
fn test_atom_matches_sequential_model() {
    run_proptest(proptest::collection::vec(op_strategy(), 0..64), |ops| {
        let atom = Atom::new(0_i64);
        let log = Arc::new(Mutex::new(Vec::new()));
        {
            let log = Arc::clone(&log);
            atom.add_watch("log", move |_, _, old, new| {
                log.lock().unwrap().push((*old, *new));
            });
        }

        let mut model = 0_i64;
        let mut expected = Vec::new();
        for op in ops {
            match op {
                Op::Swap(delta) => {
                    let new = atom.swap(|n| n.wrapping_add(delta));
                    expected.push((model, model.wrapping_add(delta)));
                    model = model.wrapping_add(delta);
                    prop_assert_eq!(new, model);
                }
                Op::Reset(value) => {
                    prop_assert_eq!(atom.reset(value), model);
                    expected.push((model, value));
                    model = value;
                }
                Op::Cas(expect, update) => {
                    let swapped = atom.compare_and_set(&expect, update);
                    prop_assert_eq!(swapped, expect == model);
                    if swapped {
                        expected.push((model, update));
                        model = update;
                    }
                }
            }
            prop_assert_eq!(atom.deref(), model);
        }

        let recorded = log.lock().unwrap().clone();
        prop_assert_eq!(recorded, expected);
        Ok(())
    });
}

proptest! {
    #[test]
    fn test_swap_composes_like_function_application(start in any::<i32>(), deltas in proptest::collection::vec(any::<i32>(), 0..32)) {
        let atom = Atom::new(start);
        for delta in &deltas {
            atom.swap(|n| n.wrapping_add(*delta));
        }
        let expected = deltas.iter().fold(start, |acc, d| acc.wrapping_add(*d));
        prop_assert_eq!(atom.deref(), expected);
    }
}
