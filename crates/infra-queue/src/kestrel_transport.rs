// Kestrel QueueTransport Implementation (memcache text protocol)

use crate::connection::{connect, Connection};
use kestrel_net_core::config::{Acknowledgement, ClientConfig};
use kestrel_net_core::port::{QueueTransport, TransportError};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Kestrel client over one shared TCP connection
///
/// Commands are serialized through a mutex, so one transport can back any
/// number of clients.
///
/// A command that fails part way (I/O error, read timeout, garbled reply)
/// leaves unread bytes on the socket, so the connection is dropped. The
/// next command reconnects when the server address is known and fails
/// with `Unavailable` otherwise.
pub struct KestrelTransport {
    conn: Mutex<Option<Connection>>,
    endpoint: Option<(String, u16)>,
    io_timeout: Duration,
    reliable_reads: bool,
}

impl KestrelTransport {
    pub fn connect(host: &str, port: u16, io_timeout: Duration) -> Result<Self, TransportError> {
        let conn = connect(host, port, io_timeout)?;
        let mut transport = Self::from_connection(conn, io_timeout);
        transport.endpoint = Some((host.to_string(), port));
        Ok(transport)
    }

    /// Connect using host, port and I/O timeout from `config`
    ///
    /// Reliable reads are enabled when the config acknowledges every message.
    pub fn from_config(config: &ClientConfig) -> Result<Self, TransportError> {
        let transport = Self::connect(&config.host, config.port, config.io_timeout)?;
        Ok(transport.with_reliable_reads(config.acknowledgement == Acknowledgement::PerMessage))
    }

    /// Wrap an established connection; it is not re-established once dropped
    pub fn from_connection(conn: Connection, io_timeout: Duration) -> Self {
        Self {
            conn: Mutex::new(Some(conn)),
            endpoint: None,
            io_timeout,
            reliable_reads: false,
        }
    }

    /// Use `/open` reads that must be closed with `confirm`
    pub fn with_reliable_reads(mut self, reliable: bool) -> Self {
        self.reliable_reads = reliable;
        self
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<Connection>>, TransportError> {
        self.conn
            .lock()
            .map_err(|_| TransportError::Unavailable("connection lock poisoned".to_string()))
    }

    /// Run one command/reply exchange on the shared connection
    fn exchange<T>(
        &self,
        command: &str,
        f: impl FnOnce(&mut Connection) -> Result<T, TransportError>,
    ) -> Result<T, TransportError> {
        let mut slot = self.lock()?;
        if slot.is_none() {
            *slot = Some(self.reconnect()?);
        }
        let conn = slot.as_mut().ok_or_else(not_connected)?;

        let result = f(conn);
        if let Err(e) = &result {
            if !leaves_stream_in_sync(e) {
                warn!(command, error = %e, "Dropping queue server connection");
                *slot = None;
            }
        }
        result
    }

    fn reconnect(&self) -> Result<Connection, TransportError> {
        let (host, port) = self.endpoint.as_ref().ok_or_else(not_connected)?;
        let conn = connect(host, *port, self.io_timeout)?;
        info!(host = %host, port = *port, "Reconnected to queue server");
        Ok(conn)
    }
}

impl QueueTransport for KestrelTransport {
    fn put(
        &self,
        queue: &str,
        payload: &[u8],
        expiration: Option<Duration>,
    ) -> Result<bool, TransportError> {
        validate_queue_name(queue)?;
        let exp_secs = expiration.map_or(0, expiry_seconds);

        let header = format!("set {} 0 {} {}\r\n", queue, exp_secs, payload.len());
        let mut command = header.into_bytes();
        command.extend_from_slice(payload);
        command.extend_from_slice(b"\r\n");

        self.exchange("set", |conn| {
            conn.write_all(&command)?;
            let reply = conn.read_line()?;
            check_error_reply(&reply)?;

            match reply.as_str() {
                "STORED" => Ok(true),
                "NOT_STORED" => Ok(false),
                other => Err(unexpected("set", other)),
            }
        })
    }

    fn get(&self, queue: &str, timeout: Duration) -> Result<Option<Vec<u8>>, TransportError> {
        validate_queue_name(queue)?;
        let options = if self.reliable_reads { "/open" } else { "" };
        let command = format!("get {}{}/t={}\r\n", queue, options, timeout.as_millis());

        let item = self.exchange("get", |conn| {
            conn.set_read_timeout(timeout + self.io_timeout)?;
            conn.write_all(command.as_bytes())?;
            let header = conn.read_line();
            conn.set_read_timeout(self.io_timeout)?;
            let header = header?;
            check_error_reply(&header)?;

            if header == "END" {
                return Ok(None);
            }

            let len = parse_value_header(&header, queue)?;
            let data = conn.read_exact(len)?;
            if conn.read_exact(2)? != b"\r\n" {
                return Err(TransportError::Protocol(
                    "value not terminated by CRLF".to_string(),
                ));
            }
            let end = conn.read_line()?;
            if end != "END" {
                return Err(unexpected("get", &end));
            }
            Ok(Some(data))
        })?;

        if let Some(data) = &item {
            debug!(queue = %queue, bytes = data.len(), "Item received");
        }
        Ok(item)
    }

    fn confirm(&self, queue: &str) -> Result<bool, TransportError> {
        if !self.reliable_reads {
            return Ok(true);
        }
        validate_queue_name(queue)?;

        self.exchange("close", |conn| {
            conn.write_all(format!("get {}/close\r\n", queue).as_bytes())?;
            let reply = conn.read_line()?;
            check_error_reply(&reply)?;

            match reply.as_str() {
                "END" => Ok(true),
                other => Err(unexpected("close", other)),
            }
        })
    }

    fn delete(&self, queue: &str) -> Result<bool, TransportError> {
        validate_queue_name(queue)?;

        self.exchange("delete", |conn| {
            conn.write_all(format!("delete {}\r\n", queue).as_bytes())?;
            let reply = conn.read_line()?;
            check_error_reply(&reply)?;

            match reply.as_str() {
                "DELETED" => Ok(true),
                "NOT_FOUND" => Ok(false),
                other => Err(unexpected("delete", other)),
            }
        })
    }
}

/// Server error lines are complete replies; anything else may leave bytes behind
fn leaves_stream_in_sync(error: &TransportError) -> bool {
    matches!(error, TransportError::Server(_))
}

fn not_connected() -> TransportError {
    TransportError::Unavailable("connection dropped after a failed command".to_string())
}

/// Kestrel reads 0 as "never expires", so sub-second values round up
fn expiry_seconds(ttl: Duration) -> u64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    secs.max(1)
}

/// Queue names become memcache keys: no whitespace, no control bytes
fn validate_queue_name(queue: &str) -> Result<(), TransportError> {
    if queue.is_empty() {
        return Err(TransportError::Protocol("queue name is empty".to_string()));
    }
    if queue.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(TransportError::Protocol(format!(
            "queue name '{}' contains whitespace or control characters",
            queue.escape_debug()
        )));
    }
    Ok(())
}

fn check_error_reply(line: &str) -> Result<(), TransportError> {
    if line == "ERROR" || line.starts_with("CLIENT_ERROR") || line.starts_with("SERVER_ERROR") {
        return Err(TransportError::Server(line.to_string()));
    }
    Ok(())
}

/// Parse `VALUE <key> <flags> <bytes>` and return the byte count
///
/// The key must name `queue`; read options after `/` are ignored.
fn parse_value_header(line: &str, queue: &str) -> Result<usize, TransportError> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    match parts.as_slice() {
        ["VALUE", key, _flags, len] => {
            let key_queue = key.split('/').next().unwrap_or_default();
            if key_queue != queue {
                return Err(TransportError::Protocol(format!(
                    "reply for queue '{}' while reading '{}'",
                    key_queue, queue
                )));
            }
            len.parse()
                .map_err(|_| TransportError::Protocol(format!("bad value length in '{}'", line)))
        }
        _ => Err(unexpected("get", line)),
    }
}

fn unexpected(command: &str, reply: &str) -> TransportError {
    TransportError::Protocol(format!("unexpected reply to {}: '{}'", command, reply))
}
