#![cfg(unix)]

use atomos::remote::{Manager, ManagerOptions, RemoteAtom, RemoteAtomicReference, Server};
use atomos::{Error, Kind, RetryPolicy, TypedAtomic};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

fn manager(kind: Kind, initial: serde_json::Value) -> (tempfile::TempDir, Manager) {
    let dir = tempfile::tempdir().unwrap();
    let options = ManagerOptions::new(env!("CARGO_BIN_EXE_atomos"))
        .socket(dir.path().join("manager.sock"))
        .kind(kind)
        .initial(initial);
    (dir, Manager::spawn(options).unwrap())
}

fn served(kind: Kind, initial: serde_json::Value) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("served.sock");
    let cell = Arc::new(TypedAtomic::new(kind, initial).unwrap());
    let server = Server::bind(&path, cell).unwrap();
    thread::spawn(move || server.run());
    (dir, path)
}

// A lost CAS would otherwise retry forever.
fn bounded<T: Clone + Serialize + serde::de::DeserializeOwned>(path: &Path) -> RemoteAtom<T> {
    let limit = NonZeroUsize::new(50).unwrap();
    RemoteAtom::<T>::connect(path)
        .unwrap()
        .with_policy(RetryPolicy::unbounded().with_limit(limit))
}

#[test]
fn test_manager_hosts_reference() {
    let (_dir, manager) = manager(Kind::Integer, json!(0));
    let cell: RemoteAtomicReference<i64> = manager.connect().unwrap();

    assert!(cell.compare_and_set(&0, 1).unwrap());
    assert!(!cell.compare_and_set(&0, 2).unwrap());
    assert_eq!(cell.get().unwrap(), 1);
    assert_eq!(cell.describe().unwrap(), "integer(1)");
}

#[test]
fn test_remote_atom_swap_across_processes() {
    let (_dir, manager) = manager(Kind::Integer, json!(0));
    let socket = manager.socket_path().to_str().unwrap().to_string();

    let children: Vec<_> = (0..4)
        .map(|_| {
            Command::new(env!("CARGO_BIN_EXE_atomos"))
                .args(["swap-inc", "--socket", &socket, "--count", "100"])
                .spawn()
                .unwrap()
        })
        .collect();

    let local: RemoteAtom<i64> = manager.atom().unwrap();
    for _ in 0..100 {
        local.swap(|n| n + 1).unwrap();
    }
    for mut child in children {
        assert!(child.wait().unwrap().success());
    }

    assert_eq!(local.deref().unwrap(), 500);
}

#[test]
fn test_watches_stay_local_to_the_registering_proxy() {
    let (_dir, manager) = manager(Kind::Integer, json!(10));
    let watched: RemoteAtom<i64> = manager.atom().unwrap();
    let other: RemoteAtom<i64> = manager.atom().unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    {
        let calls = Arc::clone(&calls);
        watched.add_watch("w", move |_, _, old, new| {
            assert_eq!((*old, *new), (10, 11));
            calls.fetch_add(1, Ordering::SeqCst);
        });
    }

    assert_eq!(watched.swap(|n| n + 1).unwrap(), 11);
    other.reset(20).unwrap();
    assert_eq!(watched.deref().unwrap(), 20);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Session {
    user: String,
    hits: u32,
}

#[test]
fn test_structured_values_round_trip() {
    let (_dir, manager) = manager(Kind::Any, json!(null));
    let atom: RemoteAtom<Option<Session>> = manager.atom().unwrap();

    assert_eq!(atom.deref().unwrap(), None);
    atom.reset(Some(Session {
        user: "ada".into(),
        hits: 0,
    }))
    .unwrap();
    let next = atom
        .swap(|s| {
            s.clone().map(|s| Session {
                hits: s.hits + 1,
                ..s
            })
        })
        .unwrap();
    assert_eq!(next.map(|s| s.hits), Some(1));
}

#[test]
fn test_swap_over_integer_read_as_float() {
    let (_dir, path) = served(Kind::Any, json!(0));
    let atom: RemoteAtom<f64> = bounded(&path);

    assert_eq!(atom.swap(|n| n + 1.0).unwrap(), 1.0);
    assert_eq!(atom.swap(|n| n + 1.0).unwrap(), 2.0);
    assert_eq!(atom.deref().unwrap(), 2.0);
}

#[test]
fn test_swap_over_object_with_unknown_fields() {
    let (_dir, path) = served(Kind::Any, json!({"user": "ada", "hits": 0, "tag": "x"}));
    let atom: RemoteAtom<Session> = bounded(&path);

    let calls = Arc::new(AtomicUsize::new(0));
    {
        let calls = Arc::clone(&calls);
        atom.add_watch("w", move |_, _, old, new| {
            assert_eq!((old.hits, new.hits), (0, 1));
            calls.fetch_add(1, Ordering::SeqCst);
        });
    }

    let next = atom
        .swap(|s| Session {
            hits: s.hits + 1,
            ..s.clone()
        })
        .unwrap();
    assert_eq!(next.hits, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let raw: RemoteAtomicReference<serde_json::Value> =
        RemoteAtomicReference::connect(&path).unwrap();
    assert_eq!(raw.get().unwrap(), json!({"user": "ada", "hits": 1}));
}

#[test]
fn test_remote_type_mismatch_leaves_value_unchanged() {
    let (_dir, manager) = manager(Kind::Bool, json!(false));
    let atom: RemoteAtom<serde_json::Value> = manager.atom().unwrap();

    let err = atom.reset(json!("true")).unwrap_err();
    assert!(err.is_type_mismatch());
    assert_eq!(atom.deref().unwrap(), json!(false));
}

#[test]
fn test_killed_manager_reports_disconnect() {
    let (_dir, manager) = manager(Kind::Integer, json!(0));
    let cell: RemoteAtomicReference<i64> = manager.connect().unwrap();
    drop(manager);

    let err = cell.get().unwrap_err();
    assert!(matches!(err, Error::Disconnected | Error::Io(_)));
}

#[test]
fn test_manager_shutdown_on_stdin_close() {
    let (_dir, manager) = manager(Kind::Integer, json!(0));
    let socket = manager.socket_path().to_path_buf();
    manager.shutdown().unwrap();
    assert!(!socket.exists());
}

#[test]
fn test_server_on_a_thread() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("local.sock");
    let server = Server::bind(&path, Arc::new(TypedAtomic::with_default(Kind::Integer))).unwrap();
    thread::spawn(move || server.run());

    thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                let atom = RemoteAtom::<i64>::connect(&path).unwrap();
                for _ in 0..50 {
                    atom.swap(|n| n + 1).unwrap();
                }
            });
        }
    });

    let cell: RemoteAtomicReference<i64> = RemoteAtomicReference::connect(&path).unwrap();
    assert_eq!(cell.get().unwrap(), 200);
}

#[test]
fn test_spawn_failure_is_reported() {
    let options = ManagerOptions::new("/nonexistent/atomos-manager");
    assert!(matches!(Manager::spawn(options), Err(Error::Spawn(_))));
}

#[test]
fn test_serve_failure_exits_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("missing").join("manager.sock");

    let status = Command::new(env!("CARGO_BIN_EXE_atomos"))
        .args(["serve", "--socket", socket.to_str().unwrap()])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .unwrap();
    assert!(!status.success());

    let options = ManagerOptions::new(env!("CARGO_BIN_EXE_atomos")).socket(socket);
    assert!(matches!(Manager::spawn(options), Err(Error::Spawn(_))));
}
