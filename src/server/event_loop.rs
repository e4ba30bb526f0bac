use log::{debug, error, info, warn};
use std::io;
use std::net::{TcpListener, TcpStream};
use std::os::unix::io::AsRawFd;
use std::time::Duration;

use super::config::ServerConfig;
use super::connection::{Connection, ConnectionState};
use super::disconnector::disconnect;
use super::poller;
use super::registry::{LISTENER_SLOT, Registry};
use super::request_handler::{ReadOutcome, RequestHandler};
use super::responder::{self, Progress};

/// Single-threaded readiness loop over the listener and every live
/// connection.
pub struct EventLoop {
    listener: TcpListener,
    registry: Registry<TcpStream>,
    handler: RequestHandler,
    poll_timeout: Option<Duration>,
    recv_buffer_size: usize,
    chunk_size: usize,
    total_connections: u64,
}

impl EventLoop {
    /// `listener` must already be non-blocking.
    pub fn new(listener: TcpListener, config: &ServerConfig) -> Self {
        let registry = Registry::new(listener.as_raw_fd(), config.max_connections);

        Self {
            listener,
            registry,
            handler: RequestHandler::new(config),
            poll_timeout: config.poll_timeout(),
            recv_buffer_size: config.recv_buffer_size,
            chunk_size: config.chunk_size,
            total_connections: 0,
        }
    }

    pub fn registry(&self) -> &Registry<TcpStream> {
        &self.registry
    }

    pub fn listener(&self) -> &TcpListener {
        &self.listener
    }

    pub fn run(&mut self) -> io::Result<()> {
        loop {
            self.turn()?;
        }
    }

    /// One iteration: refresh interest, wait for readiness, dispatch.
    /// Returns the number of ready descriptors.
    pub fn turn(&mut self) -> io::Result<usize> {
        self.registry.refresh_interest();

        let ready = match poller::wait(self.registry.descriptors_mut(), self.poll_timeout) {
            Ok(ready) => ready,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => return Ok(0),
            Err(e) => {
                error!("poll error: {}", e);
                return Err(e);
            }
        };
        if ready == 0 {
            return Ok(0);
        }

        if poller::is_readable(self.registry.revents(LISTENER_SLOT)) {
            self.accept();
        }

        // Removal only vacates slots, so the cursor never needs adjusting.
        let mut slot = LISTENER_SLOT + 1;
        while slot < self.registry.slot_count() {
            let revents = self.registry.revents(slot);
            if revents != 0 {
                self.dispatch(slot, revents);
            }
            slot += 1;
        }

        Ok(ready)
    }

    fn accept(&mut self) {
        let (stream, addr) = match self.listener.accept() {
            Ok(pair) => pair,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return,
            Err(e) => {
                error!("Error accepting connection: {}", e);
                return;
            }
        };

        if let Err(e) = stream.set_nonblocking(true) {
            error!("Failed to set non-blocking for {}: {}", addr, e);
            return;
        }

        let conn = Connection::new(stream, addr, self.recv_buffer_size, self.chunk_size);
        let fd = conn.fd;
        match self.registry.add(conn) {
            Ok(slot) => {
                self.total_connections += 1;
                info!(
                    "Accepted connection from {} on fd {} (total: {}, active: {})",
                    addr,
                    fd,
                    self.total_connections,
                    self.registry.len()
                );
                debug!("fd {} registered in slot {}", fd, slot);
                self.registry.log_connections();
            }
            Err(rejected) => {
                warn!(
                    "Maximum connections reached, rejecting connection from {}",
                    addr
                );
                drop(rejected);
            }
        }
    }

    fn dispatch(&mut self, slot: usize, revents: libc::c_short) {
        let Some(conn) = self.registry.get_mut(slot) else {
            return;
        };
        let fd = conn.fd;

        let teardown = match conn.state() {
            ConnectionState::ReadingRequest if poller::is_readable(revents) => {
                match self.handler.on_readable(conn) {
                    Ok(ReadOutcome::Pending) | Ok(ReadOutcome::Prepared) => false,
                    Ok(ReadOutcome::Closed) => {
                        debug!("Client disconnected on fd {}", fd);
                        true
                    }
                    Err(e) => {
                        error!("Cannot handle request on fd {}: {}", fd, e);
                        true
                    }
                }
            }
            state @ (ConnectionState::SendingHeader | ConnectionState::SendingFile)
                if poller::is_writable(revents) =>
            {
                let result = if state == ConnectionState::SendingHeader {
                    responder::advance_header(conn)
                } else {
                    responder::advance_file(conn)
                };
                match result {
                    Ok(Progress::Complete) => conn.state() == ConnectionState::Done,
                    Ok(Progress::Pending) => false,
                    Err(e) => {
                        error!("Error sending to fd {}: {}", fd, e);
                        true
                    }
                }
            }
            ConnectionState::Done => true,
            _ if poller::is_invalid(revents) => {
                warn!("Invalid descriptor in slot {} (fd {})", slot, fd);
                true
            }
            _ => false,
        };

        if teardown {
            disconnect(&mut self.registry, fd);
        }
    }
}
