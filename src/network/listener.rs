// UdpListener - receives tracking datagrams on a dedicated thread
//
// The socket is bound on the caller's thread so a bind failure is reported
// synchronously; everything after that is best effort. Each datagram is
// decoded as UTF-8 JSON and handed to the callback on the receive thread.
// Undecodable datagrams and transient socket errors are logged and the loop
// keeps going.
//
// Shutdown: the running flag is cleared and a `{}` datagram is sent to the
// bound port so a blocked receive returns immediately instead of waiting out
// the read timeout. The flag is re-checked after every receive, so that wake
// datagram (or anything else arriving after stop) is never dispatched.

use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde_json::Value;
use socket2::{Domain, Protocol, Socket, Type};

use crate::config::ListenerConfig;
use crate::error::{log_ingest_error, IngestError};
use crate::telemetry::PipelineStats;

/// Payload sent to ourselves to unblock a pending receive
const WAKE_DATAGRAM: &[u8] = b"{}";

/// Back-off after a non-timeout socket error
const ERROR_BACKOFF: Duration = Duration::from_millis(10);

/// UDP listener lifecycle
///
/// `start` → running → `stop` → idle. Dropping a running listener stops it.
pub struct UdpListener {
    config: ListenerConfig,
    stats: Arc<PipelineStats>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    local_addr: Option<SocketAddr>,
}

impl UdpListener {
    pub fn new(config: ListenerConfig) -> Self {
        Self::with_stats(config, Arc::new(PipelineStats::new()))
    }

    /// Listener that records received datagrams and decode failures in `stats`
    pub fn with_stats(config: ListenerConfig, stats: Arc<PipelineStats>) -> Self {
        Self {
            config,
            stats,
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
            local_addr: None,
        }
    }

    /// Bind and start receiving.
    ///
    /// # Arguments
    /// * `callback` - Invoked on the receive thread with every decoded message
    ///
    /// # Returns
    /// The bound local address (useful when the configured port is 0).
    ///
    /// # Errors
    /// `AlreadyRunning` if started twice, `BindFailed`/`SocketOption` when the
    /// socket cannot be set up.
    pub fn start<F>(&mut self, mut callback: F) -> Result<SocketAddr, IngestError>
    where
        F: FnMut(Value) + Send + 'static,
    {
        if self.handle.is_some() {
            return Err(IngestError::AlreadyRunning);
        }

        let socket = bind_socket(&self.config)?;
        let local_addr = socket.local_addr()?;
        let recv_buffer_bytes = self.config.recv_buffer_bytes.max(1);
        let running = Arc::clone(&self.running);
        let stats = Arc::clone(&self.stats);

        running.store(true, Ordering::SeqCst);
        let spawned = thread::Builder::new()
            .name("udp-listener".to_string())
            .spawn(move || {
                tracing::info!("[UdpListener] Listening on {}", local_addr);
                let mut buffer = vec![0u8; recv_buffer_bytes];

                while running.load(Ordering::SeqCst) {
                    let len = match socket.recv_from(&mut buffer) {
                        Ok((len, _peer)) => len,
                        Err(err)
                            if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                        {
                            continue;
                        }
                        Err(err) => {
                            tracing::warn!("[UdpListener] Receive error: {}", err);
                            thread::sleep(ERROR_BACKOFF);
                            continue;
                        }
                    };

                    if !running.load(Ordering::SeqCst) {
                        break;
                    }
                    stats.record_datagram();

                    match serde_json::from_slice::<Value>(&buffer[..len]) {
                        Ok(message) => callback(message),
                        Err(err) => {
                            stats.record_decode_failure();
                            tracing::warn!(
                                "[UdpListener] Dropping undecodable datagram ({} bytes): {}",
                                len,
                                err
                            );
                        }
                    }
                }

                tracing::info!("[UdpListener] Receive loop exited");
            });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(err) => {
                self.running.store(false, Ordering::SeqCst);
                return Err(IngestError::from(err));
            }
        };

        self.handle = Some(handle);
        self.local_addr = Some(local_addr);
        Ok(local_addr)
    }

    /// Stop receiving and join the receive thread.
    ///
    /// Returns within one read timeout even if the wake datagram is lost.
    pub fn stop(&mut self) -> Result<(), IngestError> {
        let handle = self.handle.take().ok_or(IngestError::NotRunning)?;
        self.running.store(false, Ordering::SeqCst);

        if let Some(addr) = self.local_addr.take() {
            if let Err(err) = send_wake(addr) {
                tracing::debug!("[UdpListener] Wake datagram to {} failed: {}", addr, err);
            }
        }

        handle.join().map_err(|_| IngestError::ThreadPanicked)?;
        tracing::info!("[UdpListener] Stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }
}

impl Drop for UdpListener {
    fn drop(&mut self) {
        if self.handle.is_some() {
            if let Err(err) = self.stop() {
                log_ingest_error(&err, "UdpListener::drop");
            }
        }
    }
}

/// Create the receive socket with address reuse, broadcast reception and a
/// read timeout, then bind it.
fn bind_socket(config: &ListenerConfig) -> Result<UdpSocket, IngestError> {
    let addr = config.socket_addr();
    let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))?;

    socket
        .set_reuse_address(true)
        .map_err(|err| socket_option("SO_REUSEADDR", err))?;
    socket
        .set_broadcast(true)
        .map_err(|err| socket_option("SO_BROADCAST", err))?;
    socket
        .set_read_timeout(Some(config.read_timeout()))
        .map_err(|err| socket_option("SO_RCVTIMEO", err))?;

    socket
        .bind(&addr.into())
        .map_err(|err| IngestError::BindFailed {
            address: addr.to_string(),
            reason: err.to_string(),
        })?;

    Ok(socket.into())
}

fn socket_option(option: &'static str, err: std::io::Error) -> IngestError {
    IngestError::SocketOption {
        option,
        reason: err.to_string(),
    }
}

/// Send the wake datagram to the bound port, via loopback when bound to all
/// interfaces.
fn send_wake(bound: SocketAddr) -> std::io::Result<()> {
    let target = match bound.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => SocketAddr::new(Ipv4Addr::LOCALHOST.into(), bound.port()),
        IpAddr::V6(ip) if ip.is_unspecified() => SocketAddr::new(Ipv6Addr::LOCALHOST.into(), bound.port()),
        _ => bound,
    };
    let local: SocketAddr = match target {
        SocketAddr::V4(_) => SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), 0),
        SocketAddr::V6(_) => SocketAddr::new(Ipv6Addr::UNSPECIFIED.into(), 0),
    };
    let sender = UdpSocket::bind(local)?;
    sender.send_to(WAKE_DATAGRAM, target)?;
    Ok(())
}
