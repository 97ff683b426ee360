use super::protocol::{Request, Response};
use crate::atom::CasCell;
use crate::error::{Error, Result};
use crate::sync::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::io::{self, BufRead, BufReader, Write};
use std::marker::PhantomData;
use std::os::unix::net::UnixStream;
use std::path::Path;

struct Connection {
    reader: BufReader<UnixStream>,
    writer: UnixStream,
    line: String,
}

/// A proxy for an atomic reference hosted by a manager process.
///
/// Every call is one synchronous round trip: the request is written, and the
/// call blocks until the manager's answer arrives. Calls from several threads
/// over one proxy are serialized on its connection; nothing is buffered or
/// retried. Values travel as JSON, so `T` must deserialize from the hosted
/// value. Equality for `compare_and_set` is JSON structural equality on the
/// manager. A [`RemoteAtom`](super::RemoteAtom) swap compares against the JSON
/// it actually read, so a lossy decode into `T` (an integer read as `f64`, an
/// object field `T` ignores) does not make its CAS fail.
///
/// Compared to [`AtomicReference`](crate::AtomicReference) every operation
/// costs an IPC round trip and can fail with a transport error.
pub struct RemoteAtomicReference<T> {
    conn: Mutex<Connection>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> RemoteAtomicReference<T> {
    /// Connects to the manager listening on `path`.
    pub fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let writer = UnixStream::connect(path.as_ref())?;
        let reader = BufReader::new(writer.try_clone()?);
        Ok(Self {
            conn: Mutex::new(Connection {
                reader,
                writer,
                line: String::new(),
            }),
            _marker: PhantomData,
        })
    }

    /// Renders the hosted cell, e.g. `integer(42)`.
    pub fn describe(&self) -> Result<String> {
        match self.call(&Request::Describe)? {
            Response::Text { text } => Ok(text),
            other => Err(unexpected("describe", &other)),
        }
    }

    fn call(&self, request: &Request) -> Result<Response> {
        let mut buf = serde_json::to_vec(request)?;
        buf.push(b'\n');

        let mut guard = self.conn.lock();
        let conn = &mut *guard;
        conn.writer.write_all(&buf).map_err(transport)?;
        conn.line.clear();
        if conn.reader.read_line(&mut conn.line).map_err(transport)? == 0 {
            return Err(Error::Disconnected);
        }

        match serde_json::from_str::<Response>(&conn.line)? {
            Response::Error { error } => Err(error.into_error()),
            response => Ok(response),
        }
    }
}

impl<T: Serialize + DeserializeOwned> RemoteAtomicReference<T> {
    /// Returns the hosted value.
    pub fn get(&self) -> Result<T> {
        self.value_call("get", &Request::Get)
    }

    /// Sets the hosted value, returning `value` as the manager stored it.
    pub fn set(&self, value: T) -> Result<T> {
        let value = serde_json::to_value(&value)?;
        self.value_call("set", &Request::Set { value })
    }

    /// Replaces the hosted value, returning the old one.
    pub fn get_and_set(&self, value: T) -> Result<T> {
        let value = serde_json::to_value(&value)?;
        self.value_call("get_and_set", &Request::GetAndSet { value })
    }

    /// Returns the hosted value along with the JSON it was decoded from.
    pub fn get_raw(&self) -> Result<(T, Value)> {
        match self.call(&Request::Get)? {
            Response::Value { value } => {
                let decoded = serde_json::from_value::<T>(value.clone())?;
                Ok((decoded, value))
            }
            other => Err(unexpected("get", &other)),
        }
    }

    /// Stores `update` if the hosted value equals `expect`.
    pub fn compare_and_set(&self, expect: &T, update: T) -> Result<bool> {
        self.compare_raw_and_set(serde_json::to_value(expect)?, update)
    }

    /// Stores `update` if the hosted JSON equals `expect` exactly.
    pub fn compare_raw_and_set(&self, expect: Value, update: T) -> Result<bool> {
        let request = Request::CompareAndSet {
            expect,
            update: serde_json::to_value(&update)?,
        };
        match self.call(&request)? {
            Response::Flag { flag } => Ok(flag),
            other => Err(unexpected("compare_and_set", &other)),
        }
    }

    fn value_call(&self, op: &str, request: &Request) -> Result<T> {
        match self.call(request)? {
            Response::Value { value } => Ok(serde_json::from_value::<T>(value)?),
            other => Err(unexpected(op, &other)),
        }
    }
}

impl<T: Serialize + DeserializeOwned> CasCell<T> for RemoteAtomicReference<T> {
    type Error = Error;
    type Witness = Value;

    fn load(&self) -> Result<T> {
        self.get()
    }

    fn load_witnessed(&self) -> Result<(T, Value)> {
        self.get_raw()
    }

    fn exchange(&self, value: T) -> Result<T> {
        self.get_and_set(value)
    }

    fn compare_and_set(&self, expect: &T, update: T) -> Result<bool> {
        RemoteAtomicReference::compare_and_set(self, expect, update)
    }

    fn compare_witnessed_and_set(&self, _: &T, witness: &Value, update: T) -> Result<bool> {
        self.compare_raw_and_set(witness.clone(), update)
    }
}

impl<T> fmt::Debug for RemoteAtomicReference<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let peer = self
            .conn
            .try_lock()
            .and_then(|conn| conn.writer.peer_addr().ok());
        f.debug_struct("RemoteAtomicReference")
            .field("peer", &peer)
            .finish_non_exhaustive()
    }
}

fn transport(err: io::Error) -> Error {
    match err.kind() {
        io::ErrorKind::BrokenPipe
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::UnexpectedEof => Error::Disconnected,
        _ => Error::Io(err),
    }
}

fn unexpected(op: &str, response: &Response) -> Error {
    let shown = serde_json::to_value(response).unwrap_or(Value::Null);
    Error::Protocol(format!("unexpected response to {op}: {shown}"))
}
