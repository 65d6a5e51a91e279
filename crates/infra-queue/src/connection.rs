// TCP Connection Setup

use kestrel_net_core::port::TransportError;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::debug;

/// Line-oriented blocking connection to a queue server
pub struct Connection {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

/// Open a TCP connection, trying every resolved address in turn
pub fn connect(host: &str, port: u16, io_timeout: Duration) -> Result<Connection, TransportError> {
    let addrs = (host, port).to_socket_addrs().map_err(|e| {
        TransportError::Connection(format!("cannot resolve {}:{}: {}", host, port, e))
    })?;

    let mut last_err = None;
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, io_timeout) {
            Ok(stream) => {
                debug!(addr = %addr, "Connected to queue server");
                return Connection::from_stream(stream, io_timeout);
            }
            Err(e) => last_err = Some(e),
        }
    }

    Err(TransportError::Connection(match last_err {
        Some(e) => format!("cannot connect to {}:{}: {}", host, port, e),
        None => format!("{}:{} resolved to no addresses", host, port),
    }))
}

impl Connection {
    pub fn from_stream(stream: TcpStream, io_timeout: Duration) -> Result<Self, TransportError> {
        stream.set_nodelay(true)?;
        stream.set_write_timeout(Some(io_timeout))?;
        stream.set_read_timeout(Some(io_timeout))?;
        let writer = stream.try_clone()?;
        Ok(Self {
            reader: BufReader::new(stream),
            writer,
        })
    }

    pub fn set_read_timeout(&self, timeout: Duration) -> Result<(), TransportError> {
        self.reader.get_ref().set_read_timeout(Some(timeout))?;
        Ok(())
    }

    /// Write `bytes` and flush
    pub fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.writer.write_all(bytes)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Read one line without its trailing CRLF
    pub fn read_line(&mut self) -> Result<String, TransportError> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Err(TransportError::Connection(
                "connection closed by server".to_string(),
            ));
        }
        let trimmed = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(trimmed);
        Ok(line)
    }

    /// Read exactly `len` bytes
    pub fn read_exact(&mut self, len: usize) -> Result<Vec<u8>, TransportError> {
        let mut buf = vec![0u8; len];
        self.reader.read_exact(&mut buf)?;
        Ok(buf)
    }
}
