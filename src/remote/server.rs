use super::protocol::{apply, Request, Response};
use crate::atomic::TypedAtomic;
use crate::error::Result;
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

/// Hosts one [`TypedAtomic`] behind a Unix domain socket.
///
/// Each accepted connection is served on its own thread; calls from all
/// connections are serialized by the cell's own readers-writer lock. The
/// `atomos serve` command runs this in a dedicated manager process, but it can
/// equally be hosted on a thread.
pub struct Server {
    listener: UnixListener,
    path: PathBuf,
    cell: Arc<TypedAtomic>,
}

impl Server {
    /// Binds `path` and prepares to serve `cell`.
    pub fn bind(path: impl AsRef<Path>, cell: Arc<TypedAtomic>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let listener = UnixListener::bind(&path)?;
        log_info!(socket = %path.display(), kind = %cell.kind(), "manager listening");
        Ok(Self {
            listener,
            path,
            cell,
        })
    }

    /// The socket path.
    pub fn local_path(&self) -> &Path {
        &self.path
    }

    /// The hosted cell.
    pub fn cell(&self) -> &Arc<TypedAtomic> {
        &self.cell
    }

    /// Accepts connections forever, serving each one on a new thread.
    ///
    /// Returns only if accepting fails.
    pub fn run(&self) -> Result<()> {
        for stream in self.listener.incoming() {
            let stream = stream.map_err(|err| {
                log_warn!(error = %err, socket = %self.path.display(), "accept failed");
                err
            })?;
            let cell = Arc::clone(&self.cell);
            thread::spawn(move || handle_connection(&cell, stream));
        }
        Ok(())
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
fn handle_connection(cell: &TypedAtomic, stream: UnixStream) {
    log_debug!("connection accepted");
    match serve_connection(cell, stream) {
        Ok(()) => log_debug!("connection closed"),
        Err(err) => log_debug!(error = %err, "connection failed"),
    }
}

fn serve_connection(cell: &TypedAtomic, stream: UnixStream) -> Result<()> {
    let mut writer = stream.try_clone()?;
    let reader = BufReader::new(stream);

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) => apply(cell, request),
            Err(err) => {
                log_warn!(error = %err, "malformed request");
                Response::malformed(err.to_string())
            }
        };
        let mut buf = serde_json::to_vec(&response)?;
        buf.push(b'\n');
        writer.write_all(&buf)?;
    }
    Ok(())
}
