//! Byte transport
//!
//! TCP connection to the server plus an in-memory transport used for
//! replaying captured streams. Reads never block: no pending data is
//! reported as `Ok(0)`, end of stream as [`TransportError::Closed`].

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;

use log::{debug, info, warn};
use thiserror::Error;

use crate::constants::WRITE_RETRY_MS;

/// Transport errors
#[derive(Debug, Error)]
pub enum TransportError {
    /// Peer closed the connection
    #[error("connection closed")]
    Closed,
    /// Host name did not resolve to any address
    #[error("cannot resolve {0}")]
    Resolve(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Bidirectional byte stream to the server
pub trait Transport {
    /// Read available bytes into `buf`; Ok(0) when nothing is pending
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// Write all of `data`
    fn write_all(&mut self, data: &[u8]) -> Result<(), TransportError>;
}

/// Non-blocking TCP connection
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    /// Connect to `host:port`, trying each resolved address in turn
    pub fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self, TransportError> {
        let addrs: Vec<_> = (host, port).to_socket_addrs()?.collect();
        if addrs.is_empty() {
            return Err(TransportError::Resolve(format!("{}:{}", host, port)));
        }

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => {
                    stream.set_nonblocking(true)?;
                    if let Err(e) = stream.set_nodelay(true) {
                        warn!("Failed to set TCP_NODELAY: {}", e);
                    }
                    info!("Connected to {}", addr);
                    return Ok(Self { stream });
                }
                Err(e) => {
                    debug!("Connect to {} failed: {}", addr, e);
                    last_err = Some(e);
                }
            }
        }
        Err(last_err
            .map(TransportError::Io)
            .unwrap_or_else(|| TransportError::Resolve(format!("{}:{}", host, port))))
    }
}

impl Transport for TcpTransport {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        match self.stream.read(buf) {
            Ok(0) => Err(TransportError::Closed),
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(0),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&mut self, mut data: &[u8]) -> Result<(), TransportError> {
        while !data.is_empty() {
            match self.stream.write(data) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => data = &data[n..],
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    std::thread::sleep(Duration::from_millis(WRITE_RETRY_MS));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

/// Transport backed by in-memory chunks.
///
/// Each read returns at most one queued chunk; once the queue is empty
/// the stream reports [`TransportError::Closed`]. Writes are collected.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    chunks: VecDeque<Vec<u8>>,
    written: Vec<u8>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Split `data` into reads of at most `chunk_size` bytes
    pub fn from_bytes(data: &[u8], chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunks: data.chunks(chunk_size).map(<[u8]>::to_vec).collect(),
            written: Vec::new(),
        }
    }

    /// Queue one more read
    pub fn push(&mut self, chunk: &[u8]) {
        self.chunks.push_back(chunk.to_vec());
    }

    /// Everything written so far
    pub fn written(&self) -> &[u8] {
        &self.written
    }
}

impl Transport for MemoryTransport {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let Some(mut chunk) = self.chunks.pop_front() else {
            return Err(TransportError::Closed);
        };
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        if n < chunk.len() {
            self.chunks.push_front(chunk.split_off(n));
        }
        Ok(n)
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.written.extend_from_slice(data);
        Ok(())
    }
}

/// Raw capture of every received byte
pub struct Recorder {
    file: File,
}

impl Recorder {
    /// Create (truncate) the capture file
    pub fn create(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(path)?;
        info!("Recording stream to {}", path.display());
        Ok(Self { file })
    }

    pub fn record(&mut self, data: &[u8]) -> io::Result<()> {
        self.file.write_all(data)
    }
}
