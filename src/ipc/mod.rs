//! IPC (Inter-Process Communication) module for controlling the window manager
//!
//! External controllers (the `cutter` client, the user's config script, key
//! bindings) talk to cardboard over a Unix stream socket, one command per
//! connection: accept, read, dispatch, reply, close.
//!
//! # Wire format
//!
//! A command is a sequence of words, the first being the command name. Each
//! word is preceded by its length in a single byte, and the sequence ends with
//! a zero byte:
//!
//! ```text
//! [4] e x e c [5] x t e r m [0]
//! ```
//!
//! The reply is plain UTF-8 text; closing the connection marks its end.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::time::timeout;

use crate::commands::CommandResult;

/// Longest word the one-byte length prefix can describe
pub const MAX_ARG_LEN: usize = u8::MAX as usize;

/// Upper bound on a single command read from a connection
pub const MAX_MESSAGE_LEN: usize = 8192;

/// How long a connected client gets to send its command, and to take the reply
pub const IO_TIMEOUT: Duration = Duration::from_millis(500);

/// Reply sent when a command cannot be decoded
pub const MALFORMED_REPLY: &str = "Malformed command";

/// Errors produced by the IPC wire layer.
#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    #[error("malformed command")]
    Malformed,
    #[error("argument is {0} bytes long, the limit is {MAX_ARG_LEN}")]
    ArgumentTooLong(usize),
    #[error("empty arguments cannot be encoded")]
    EmptyArgument,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Decodes one command from the bytes received on a connection.
///
/// Fails when a length prefix reaches past the end of `buf`, or when the
/// buffer ends before the terminating zero byte. Bytes after the terminator
/// are ignored.
pub fn parse_command(buf: &[u8]) -> Result<Vec<String>, IpcError> {
    let mut args = Vec::new();
    let mut i = 0;

    while i < buf.len() && buf[i] != 0 {
        let segment_size = buf[i] as usize;
        i += 1;
        // The terminator must still fit after this word
        if i + segment_size >= buf.len() {
            return Err(IpcError::Malformed);
        }
        args.push(String::from_utf8_lossy(&buf[i..i + segment_size]).into_owned());
        i += segment_size;
    }

    if i >= buf.len() {
        return Err(IpcError::Malformed);
    }
    Ok(args)
}

/// Encodes `args` into the wire format understood by [`parse_command`].
pub fn encode_command<S: AsRef<str>>(args: &[S]) -> Result<Vec<u8>, IpcError> {
    let mut buf = Vec::with_capacity(args.iter().map(|a| a.as_ref().len() + 1).sum::<usize>() + 1);
    for arg in args {
        let bytes = arg.as_ref().as_bytes();
        let len = u8::try_from(bytes.len()).map_err(|_| IpcError::ArgumentTooLong(bytes.len()))?;
        if len == 0 {
            return Err(IpcError::EmptyArgument);
        }
        buf.push(len);
        buf.extend_from_slice(bytes);
    }
    buf.push(0);
    Ok(buf)
}

/// Listening end of the command socket.
///
/// The socket file is removed again when the server is dropped.
#[derive(Debug)]
pub struct IpcServer {
    socket_path: PathBuf,
    listener: UnixListener,
}

impl IpcServer {
    /// Binds the command socket, replacing a stale socket file left behind by an earlier run.
    ///
    /// Must be called from within a tokio runtime.
    pub fn bind(socket_path: impl Into<PathBuf>) -> Result<Self> {
        let socket_path = socket_path.into();

        if socket_path.exists() {
            std::fs::remove_file(&socket_path)
                .with_context(|| format!("Failed to remove existing socket: {:?}", socket_path))?;
        }

        let listener = UnixListener::bind(&socket_path)
            .with_context(|| format!("Failed to bind Unix socket: {:?}", socket_path))?;

        info!("🔗 Cardboard IPC server listening on: {:?}", socket_path);

        Ok(Self {
            socket_path,
            listener,
        })
    }

    /// Waits for the next controller to connect.
    pub async fn accept(&self) -> std::io::Result<UnixStream> {
        let (stream, _) = self.listener.accept().await?;
        debug!("🤝 IPC client connected");
        Ok(stream)
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!("⚠️ Failed to remove socket file: {}", e);
            }
        }
    }
}

fn timed_out() -> IpcError {
    IpcError::Io(std::io::Error::new(ErrorKind::TimedOut, "IPC client went silent"))
}

/// Reads a single command from `stream` with one bounded read.
///
/// A client that sends nothing within [`IO_TIMEOUT`] gets `ErrorKind::TimedOut`.
pub async fn read_command(stream: &mut UnixStream) -> Result<Vec<String>, IpcError> {
    let mut buf = vec![0u8; MAX_MESSAGE_LEN];
    let len = timeout(IO_TIMEOUT, stream.read(&mut buf))
        .await
        .map_err(|_| timed_out())??;
    parse_command(&buf[..len])
}

/// Serves one connection: reads the command, runs `dispatch`, writes the reply and closes.
///
/// Malformed input gets [`MALFORMED_REPLY`] and never reaches `dispatch`.
pub async fn serve_connection<F>(mut stream: UnixStream, dispatch: F) -> Result<CommandResult, IpcError>
where
    F: FnOnce(Vec<String>) -> CommandResult,
{
    let result = match read_command(&mut stream).await {
        Ok(args) => {
            debug!("📨 Received IPC command: {}", args.join(" "));
            dispatch(args)
        }
        Err(IpcError::Malformed) => {
            warn!("⚠️ Received malformed IPC command");
            CommandResult::error(MALFORMED_REPLY)
        }
        Err(e) => return Err(e),
    };

    let reply = async {
        if !result.message.is_empty() {
            stream.write_all(result.message.as_bytes()).await?;
        }
        stream.shutdown().await
    };
    timeout(IO_TIMEOUT, reply).await.map_err(|_| timed_out())??;
    Ok(result)
}

/// Client side: sends `args` to the socket at `socket_path` and returns the reply text.
pub async fn send_command<S: AsRef<str>>(socket_path: &Path, args: &[S]) -> Result<String> {
    let message = encode_command(args).context("Failed to encode command")?;

    let mut stream = UnixStream::connect(socket_path)
        .await
        .with_context(|| format!("Failed to connect to {:?}", socket_path))?;
    stream
        .write_all(&message)
        .await
        .context("Failed to send command")?;
    stream.shutdown().await.context("Failed to close write half")?;

    let mut reply = String::new();
    stream
        .read_to_string(&mut reply)
        .await
        .context("Failed to read reply")?;
    Ok(reply)
}
