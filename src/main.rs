#[cfg(unix)]
use anyhow::{Context, Result};
#[cfg(unix)]
use atomos::remote::{RemoteAtom, RemoteAtomicReference, Server};
#[cfg(unix)]
use atomos::shm::SharedAtomicLong;
#[cfg(unix)]
use atomos::{Kind, TypedAtomic};
#[cfg(unix)]
use clap::{Parser, Subcommand};
#[cfg(unix)]
use std::io::{self, Write};
#[cfg(unix)]
use std::path::{Path, PathBuf};
#[cfg(unix)]
use std::sync::Arc;
#[cfg(unix)]
use std::{fs, process, thread};

#[cfg(unix)]
#[derive(Parser)]
#[command(name = "atomos")]
#[command(about = "Manager process and helpers for process-spanning atomics", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[cfg(unix)]
#[derive(Subcommand)]
enum Commands {
    /// Host one atomic reference on a Unix socket until stdin closes
    Serve {
        /// Socket path to bind
        #[arg(long)]
        socket: PathBuf,

        /// Declared kind of the hosted value
        #[arg(long, default_value = "any")]
        kind: Kind,

        /// Initial value as JSON (defaults to the kind's default)
        #[arg(long)]
        initial: Option<String>,
    },
    /// Increment a hosted integer with `swap`
    SwapInc {
        /// Socket path of the manager
        #[arg(long)]
        socket: PathBuf,

        /// Number of increments
        #[arg(long, default_value_t = 1)]
        count: u64,
    },
    /// Increment a shared-memory long with `add_and_get`
    ShmAdd {
        /// Shared memory object name
        #[arg(long)]
        name: String,

        /// Number of increments
        #[arg(long, default_value_t = 1)]
        count: u64,
    },
    /// Print the hosted value and its kind
    Describe {
        /// Socket path of the manager
        #[arg(long)]
        socket: PathBuf,
    },
}

#[cfg(unix)]
fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            socket,
            kind,
            initial,
        } => serve(&socket, kind, initial.as_deref())?,
        Commands::SwapInc { socket, count } => {
            let atom = RemoteAtom::<i64>::connect(&socket)
                .with_context(|| format!("connecting to {}", socket.display()))?;
            for _ in 0..count {
                atom.swap(|n| n + 1)?;
            }
        }
        Commands::ShmAdd { name, count } => {
            let cell = SharedAtomicLong::open(&name).with_context(|| format!("opening {name}"))?;
            for _ in 0..count {
                cell.add_and_get(1)?;
            }
        }
        Commands::Describe { socket } => {
            let cell = RemoteAtomicReference::<serde_json::Value>::connect(&socket)
                .with_context(|| format!("connecting to {}", socket.display()))?;
            println!("{}", cell.describe()?);
        }
    }

    Ok(())
}

#[cfg(not(unix))]
fn main() {
    eprintln!("atomos: process-spanning atomics require a unix platform");
    std::process::exit(1);
}

#[cfg(unix)]
fn serve(socket: &Path, kind: Kind, initial: Option<&str>) -> Result<()> {
    let cell = match initial {
        Some(text) => {
            let value = serde_json::from_str(text)
                .with_context(|| format!("parsing initial value {text:?}"))?;
            TypedAtomic::new(kind, value)?
        }
        None => TypedAtomic::with_default(kind),
    };

    let server = Server::bind(socket, Arc::new(cell))
        .with_context(|| format!("binding {}", socket.display()))?;

    {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "ready")?;
        stdout.flush()?;
    }

    // The parent holds our stdin; EOF means it is gone or wants us to stop.
    let path = socket.to_path_buf();
    thread::spawn(move || {
        let _ = io::copy(&mut io::stdin().lock(), &mut io::sink());
        let _ = fs::remove_file(&path);
        process::exit(0);
    });

    // Only an accept failure ends the loop; the manager must not outlive it.
    let stopped = server.run().context("accepting connections");
    #[cfg(feature = "tracing")]
    {
        if let Err(err) = &stopped {
            tracing::error!("manager stopped serving: {err:#}");
        }
    }
    stopped?;
    anyhow::bail!("{} stopped accepting connections", socket.display())
}

#[cfg(all(unix, feature = "tracing"))]
fn init_logging() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();
}

#[cfg(all(unix, not(feature = "tracing")))]
fn init_logging() {}
