//! Byte-stream transports.
//!
//! # Design
//! The executor only needs something it can write a request into and read a
//! response out of. `Transport` opens one such connection per call; the
//! default `TcpTransport` is a plain blocking socket. Pooling, TLS and
//! proxies would be other implementations of the same trait.

use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::config::ClientConfig;

/// Opens a fresh connection to `host:port`.
pub trait Transport {
    type Conn: Read + Write;

    fn connect(&self, host: &str, port: u16) -> io::Result<Self::Conn>;
}

/// Blocking TCP transport with optional connect, read and write timeouts.
#[derive(Debug, Clone, Default)]
pub struct TcpTransport {
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
}

impl TcpTransport {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout(),
            read_timeout: config.read_timeout(),
            write_timeout: config.write_timeout(),
        }
    }
}

impl Transport for TcpTransport {
    type Conn = TcpStream;

    fn connect(&self, host: &str, port: u16) -> io::Result<TcpStream> {
        let stream = match self.connect_timeout {
            None => TcpStream::connect((host, port))?,
            Some(timeout) => connect_with_timeout(host, port, timeout)?,
        };
        stream.set_read_timeout(self.read_timeout)?;
        stream.set_write_timeout(self.write_timeout)?;
        stream.set_nodelay(true)?;
        Ok(stream)
    }
}

/// Try each resolved address in turn, returning the last error if all fail.
fn connect_with_timeout(host: &str, port: u16, timeout: Duration) -> io::Result<TcpStream> {
    let mut last_err = None;
    for addr in (host, port).to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::AddrNotAvailable, format!("{host} resolved to no addresses"))
    }))
}
