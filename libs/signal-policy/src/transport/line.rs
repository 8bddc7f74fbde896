//! Line-oriented transport
//!
//! One signal per line in both directions:
//!
//! ```text
//! in:   wipers.front.on=true     update
//!       wipers.front.on          query (no state change)
//!       quit                     terminate
//! out:  lights.external.headlights=true
//!       <empty line>             close handshake
//! ```

use std::fmt;
use std::io::{self, Read, Write};
use std::path::Path;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, BufReader, ReadBuf};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::traits::{Inbound, Signal, Transport, TransportError, TERMINATE_TOKEN};

/// Parse one inbound line
///
/// Returns `None` for lines to skip: blank lines and lines with an empty
/// signal name (logged).
pub fn parse_line(line: &str) -> Option<Inbound> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    match line.split_once('=') {
        Some((name, value)) => {
            let name = name.trim();
            if name.is_empty() {
                warn!("Malformed inbound line '{}': empty signal name", line);
                return None;
            }
            Some(Inbound::update(name, value.trim()))
        },
        None if line == TERMINATE_TOKEN => Some(Inbound::Terminate),
        None => Some(Inbound::query(line)),
    }
}

/// Render one outbound signal as a line (without the newline)
pub fn format_line(signal: &Signal) -> String {
    signal.to_string()
}

const READ_CHUNK_SIZE: usize = 8192;
const READ_CHANNEL_CAPACITY: usize = 16;

/// Async reader fed by a dedicated OS thread
///
/// The thread owns the blocking source and forwards chunks over a channel.
/// A read blocked in the thread never holds up runtime shutdown, so an
/// interactive stdin does not keep the process alive after a stop signal.
pub struct ThreadedReader {
    chunks: mpsc::Receiver<io::Result<Vec<u8>>>,
    pending: Vec<u8>,
    offset: usize,
}

impl ThreadedReader {
    pub fn spawn<S>(thread_name: &str, mut source: S) -> io::Result<Self>
    where
        S: Read + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(READ_CHANNEL_CAPACITY);
        std::thread::Builder::new()
            .name(thread_name.to_string())
            .spawn(move || {
                let mut buf = [0u8; READ_CHUNK_SIZE];
                loop {
                    let chunk = match source.read(&mut buf) {
                        Ok(0) => break,
                        Ok(n) => Ok(buf[..n].to_vec()),
                        Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                        Err(e) => Err(e),
                    };
                    let failed = chunk.is_err();
                    if tx.blocking_send(chunk).is_err() || failed {
                        break;
                    }
                }
            })?;

        Ok(Self {
            chunks: rx,
            pending: Vec::new(),
            offset: 0,
        })
    }
}

impl AsyncRead for ThreadedReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        while this.offset >= this.pending.len() {
            match ready!(this.chunks.poll_recv(cx)) {
                Some(Ok(chunk)) => {
                    this.pending = chunk;
                    this.offset = 0;
                },
                Some(Err(e)) => return Poll::Ready(Err(e)),
                // Source thread finished: end of input
                None => return Poll::Ready(Ok(())),
            }
        }

        let n = (this.pending.len() - this.offset).min(buf.remaining());
        buf.put_slice(&this.pending[this.offset..this.offset + n]);
        this.offset += n;
        Poll::Ready(Ok(()))
    }
}

/// Transport over any async line reader and blocking writer
pub struct LineTransport<R, W> {
    name: String,
    reader: tokio::sync::Mutex<R>,
    writer: Mutex<W>,
}

/// stdin/stdout line transport
pub type StdioTransport = LineTransport<BufReader<ThreadedReader>, std::io::Stdout>;

/// File-replay line transport writing to stdout
pub type ReplayTransport = LineTransport<BufReader<tokio::fs::File>, std::io::Stdout>;

impl<R, W> LineTransport<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: Write + Send,
{
    pub fn new(name: impl Into<String>, reader: R, writer: W) -> Self {
        Self {
            name: name.into(),
            reader: tokio::sync::Mutex::new(reader),
            writer: Mutex::new(writer),
        }
    }

    /// Consume the transport, returning the writer
    pub fn into_writer(self) -> W {
        self.writer.into_inner()
    }
}

impl StdioTransport {
    pub fn stdio() -> Result<Self, TransportError> {
        let stdin = ThreadedReader::spawn("stdin-reader", std::io::stdin())
            .map_err(|e| TransportError::LoadFailed(format!("cannot read stdin: {}", e)))?;
        Ok(Self::new("stdio", BufReader::new(stdin), std::io::stdout()))
    }
}

impl ReplayTransport {
    /// Read inbound lines from `path`
    pub fn replay(path: impl AsRef<Path>) -> Result<Self, TransportError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| {
            TransportError::LoadFailed(format!(
                "cannot open replay file {}: {}",
                path.display(),
                e
            ))
        })?;
        debug!("Replaying inbound signals from {}", path.display());
        Ok(Self::new(
            format!("replay:{}", path.display()),
            BufReader::new(tokio::fs::File::from_std(file)),
            std::io::stdout(),
        ))
    }
}

impl<R, W> fmt::Debug for LineTransport<R, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineTransport")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<R, W> Transport for LineTransport<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: Write + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&self, signal: &Signal) -> Result<(), TransportError> {
        let mut writer = self.writer.lock();
        writeln!(writer, "{}", format_line(signal))
            .and_then(|()| writer.flush())
            .map_err(|e| TransportError::SendFailed(format!("{}: {}", self.name, e)))
    }

    async fn receive(&self) -> Result<Inbound, TransportError> {
        let mut reader = self.reader.lock().await;
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .await
                .map_err(|e| TransportError::ReceiveFailed(format!("{}: {}", self.name, e)))?;
            if read == 0 {
                debug!("{}: end of input", self.name);
                return Ok(Inbound::Terminate);
            }

            let line = match std::str::from_utf8(&buf) {
                Ok(line) => line,
                Err(e) => {
                    warn!("Malformed inbound line on {}: {}", self.name, e);
                    continue;
                },
            };
            if let Some(inbound) = parse_line(line) {
                return Ok(inbound);
            }
        }
    }
}
