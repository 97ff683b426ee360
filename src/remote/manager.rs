use super::client::RemoteAtomicReference;
use super::RemoteAtom;
use crate::atom::Atom;
use crate::atomic::Kind;
use crate::error::{Error, Result};
use serde_json::Value;
use std::env;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{self, Child, ChildStdin, Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};

/// How to launch a manager process.
#[derive(Debug, Clone)]
pub struct ManagerOptions {
    program: PathBuf,
    socket: Option<PathBuf>,
    kind: Kind,
    initial: Option<Value>,
}

impl ManagerOptions {
    /// Launches `program serve`. `program` is normally the `atomos` binary.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            socket: None,
            kind: Kind::Any,
            initial: None,
        }
    }

    /// Socket path to listen on. Defaults to a fresh path in the temp dir.
    #[must_use]
    pub fn socket(mut self, path: impl Into<PathBuf>) -> Self {
        self.socket = Some(path.into());
        self
    }

    /// Declared kind of the hosted cell. Defaults to [`Kind::Any`].
    #[must_use]
    pub fn kind(mut self, kind: Kind) -> Self {
        self.kind = kind;
        self
    }

    /// Initial value. Defaults to the kind's default value.
    #[must_use]
    pub fn initial(mut self, value: Value) -> Self {
        self.initial = Some(value);
        self
    }
}

/// A running manager process hosting one atomic reference.
///
/// The manager exits when its stdin closes, so it cannot outlive a parent
/// that dies without cleaning up. Dropping the handle kills and reaps it.
#[derive(Debug)]
pub struct Manager {
    child: Child,
    stdin: Option<ChildStdin>,
    socket: PathBuf,
}

impl Manager {
    /// Starts a manager and waits until it accepts connections.
    pub fn spawn(options: ManagerOptions) -> Result<Self> {
        let socket = options.socket.unwrap_or_else(default_socket);

        let mut command = Command::new(&options.program);
        command
            .arg("serve")
            .arg("--socket")
            .arg(&socket)
            .arg("--kind")
            .arg(options.kind.name())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        if let Some(initial) = &options.initial {
            command.arg("--initial").arg(serde_json::to_string(initial)?);
        }

        let mut child = command
            .spawn()
            .map_err(|err| Error::Spawn(format!("{}: {err}", options.program.display())))?;
        let stdin = child.stdin.take();

        if let Err(err) = await_ready(&mut child) {
            let _ = child.kill();
            let _ = child.wait();
            return Err(err);
        }

        log_info!(pid = child.id(), socket = %socket.display(), "manager ready");
        Ok(Self {
            child,
            stdin,
            socket,
        })
    }

    /// The socket the manager listens on.
    pub fn socket_path(&self) -> &Path {
        &self.socket
    }

    /// OS process id of the manager.
    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Opens a new proxy to the hosted reference.
    pub fn connect<T>(&self) -> Result<RemoteAtomicReference<T>> {
        RemoteAtomicReference::connect(&self.socket)
    }

    /// Opens a new atom over the hosted reference.
    pub fn atom<T>(&self) -> Result<RemoteAtom<T>> {
        Ok(Atom::with_cell(self.connect()?))
    }

    /// Closes the manager's stdin and waits for it to exit.
    pub fn shutdown(mut self) -> Result<()> {
        drop(self.stdin.take());
        let status = self.child.wait()?;
        log_info!(%status, "manager exited");
        if status.success() {
            Ok(())
        } else {
            Err(Error::Spawn(format!("manager exited with {status}")))
        }
    }
}

impl Drop for Manager {
    fn drop(&mut self) {
        drop(self.stdin.take());
        if let Ok(None) = self.child.try_wait() {
            let _ = self.child.kill();
            let _ = self.child.wait();
            log_info!(pid = self.child.id(), "manager stopped");
        }
        let _ = std::fs::remove_file(&self.socket);
    }
}

fn await_ready(child: &mut Child) -> Result<()> {
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| Error::Spawn("manager stdout is not captured".into()))?;
    let mut line = String::new();
    BufReader::new(stdout).read_line(&mut line)?;
    match line.trim() {
        "ready" => Ok(()),
        "" => Err(Error::Spawn("manager exited before it was ready".into())),
        other => Err(Error::Spawn(format!("unexpected readiness line {other:?}"))),
    }
}

fn default_socket() -> PathBuf {
    static NEXT: AtomicUsize = AtomicUsize::new(0);
    env::temp_dir().join(format!(
        "atomos-{}-{}.sock",
        process::id(),
        NEXT.fetch_add(1, Ordering::Relaxed)
    ))
}
