//! SCPI-over-TCP client for Siglent SDS series oscilloscopes.
//!
//! Talks to the raw SCPI socket (port 5025). The client owns one
//! `TcpStream` for its lifetime; it is the production implementation of
//! [`InstrumentLink`] and carries no decoding logic of its own.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use log::{debug, warn};

use crate::error::CaptureError;
use crate::link::InstrumentLink;
use crate::siglent::protocol;

/// Default SCPI raw-socket port on Siglent scopes.
pub const SCPI_PORT: u16 = 5025;

const READ_CHUNK: usize = 64 * 1024;
// Deep-memory transfers on the SDS1104X-E run to 14 Mpts.
const MAX_BLOCK_RESPONSE: usize = 64 * 1024 * 1024;

/// Connection configuration for the SCPI TCP link.
///
/// The read timeout bounds every instrument round-trip; waveform transfers
/// of deep memory can take tens of seconds, so it defaults much higher than
/// the others.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Timeout for establishing the TCP connection.
    pub connect_timeout: Duration,
    /// Timeout for reading a response from the scope.
    pub read_timeout: Duration,
    /// Timeout for writing a command to the scope.
    pub write_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(30),
            write_timeout: Duration::from_secs(5),
        }
    }
}

/// Builder for [`SiglentClient`] instances.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use scope_capture::SiglentClient;
///
/// let client = SiglentClient::builder()
///     .address("192.168.1.100")
///     .port(5025)
///     .read_timeout(Duration::from_secs(60))
///     .build()?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Default)]
pub struct SiglentClientBuilder {
    address: Option<String>,
    port: Option<u16>,
    config: ConnectionConfig,
}

impl SiglentClientBuilder {
    pub fn address(mut self, addr: &str) -> Self {
        self.address = Some(addr.to_string());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the full connection configuration
    pub fn config(mut self, config: ConnectionConfig) -> Self {
        self.config = config;
        self
    }

    /// Set connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set read timeout
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    /// Set write timeout
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.config.write_timeout = timeout;
        self
    }

    /// Build the SiglentClient
    pub fn build(self) -> Result<SiglentClient, CaptureError> {
        let address = self
            .address
            .ok_or_else(|| CaptureError::InvalidAddress("address must be specified".to_string()))?;
        let port = self.port.unwrap_or(SCPI_PORT);

        let socket_addr: SocketAddr = format!("{address}:{port}")
            .parse()
            .map_err(|_| CaptureError::InvalidAddress(address.clone()))?;

        debug!("Connecting to scope at {socket_addr}");

        let stream = TcpStream::connect_timeout(&socket_addr, self.config.connect_timeout)
            .map_err(|e| {
                warn!("Failed to connect to {address}: {e}");
                if e.kind() == std::io::ErrorKind::TimedOut {
                    CaptureError::Timeout
                } else {
                    CaptureError::link(format!("connecting to {address}"), e)
                }
            })?;

        stream
            .set_read_timeout(Some(self.config.read_timeout))
            .map_err(|e| CaptureError::link("setting read timeout", e))?;
        stream
            .set_write_timeout(Some(self.config.write_timeout))
            .map_err(|e| CaptureError::link("setting write timeout", e))?;

        debug!("Successfully connected to scope");

        Ok(SiglentClient {
            stream,
            config: self.config,
        })
    }
}

/// TCP client implementing the instrument link over the scope's SCPI
/// socket. One client equals one exclusively owned connection; a capture
/// session takes the client for its whole duration.
pub struct SiglentClient {
    stream: TcpStream,
    config: ConnectionConfig,
}

impl SiglentClient {
    /// Connect with default timeouts.
    pub fn new(addr: &str, port: u16) -> Result<Self, CaptureError> {
        Self::builder().address(addr).port(port).build()
    }

    /// Create a builder for flexible configuration.
    pub fn builder() -> SiglentClientBuilder {
        SiglentClientBuilder::default()
    }

    /// Get the current connection configuration
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// `*IDN?` identity string, trimmed.
    pub fn identify(&mut self) -> Result<String, CaptureError> {
        self.query(protocol::IDN)
    }

    fn write_line(&mut self, command: &str) -> Result<(), CaptureError> {
        debug!("-> {command}");
        self.stream
            .write_all(command.as_bytes())
            .and_then(|()| self.stream.write_all(b"\n"))
            .map_err(|e| Self::map_io(e, &format!("sending {command:?}")))
    }

    /// Read bytes until `stop` says the buffer is complete.
    fn read_until(
        &mut self,
        context: &str,
        mut stop: impl FnMut(&[u8]) -> bool,
    ) -> Result<Vec<u8>, CaptureError> {
        let mut response = Vec::new();
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            let n = self
                .stream
                .read(&mut chunk)
                .map_err(|e| Self::map_io(e, context))?;
            if n == 0 {
                return Err(CaptureError::link(
                    context.to_string(),
                    std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "connection closed by instrument",
                    ),
                ));
            }
            response.extend_from_slice(&chunk[..n]);
            if stop(&response) {
                return Ok(response);
            }
            if response.len() > MAX_BLOCK_RESPONSE {
                return Err(CaptureError::Protocol(format!(
                    "response exceeds {MAX_BLOCK_RESPONSE} bytes"
                )));
            }
        }
    }

    fn map_io(e: std::io::Error, context: &str) -> CaptureError {
        // Socket read timeouts surface as WouldBlock on unix and TimedOut
        // on windows.
        match e.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => {
                CaptureError::Timeout
            }
            _ => CaptureError::link(context.to_string(), e),
        }
    }
}

impl InstrumentLink for SiglentClient {
    fn send_command(&mut self, command: &str) -> Result<(), CaptureError> {
        self.write_line(command)
    }

    fn query(&mut self, command: &str) -> Result<String, CaptureError> {
        self.write_line(command)?;
        let raw = self.read_until(&format!("reading response to {command:?}"), |buf| {
            buf.ends_with(b"\n")
        })?;
        let text = String::from_utf8_lossy(&raw).trim().to_string();
        debug!("<- {text}");
        Ok(text)
    }

    fn read_block(&mut self, command: &str) -> Result<Vec<u8>, CaptureError> {
        self.write_line(command)?;
        // Keep reading until the definite-length header plus its declared
        // payload have arrived; trailing terminator bytes are ignored.
        let raw = self.read_until(&format!("reading block for {command:?}"), |buf| {
            protocol::framed_response_len(buf).is_some_and(|needed| buf.len() >= needed)
        })?;
        debug!("<- {} raw block bytes", raw.len());
        protocol::deframe_block(&raw)
    }
}
