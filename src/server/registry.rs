use log::debug;
use std::net::TcpStream;
use std::os::unix::io::RawFd;

use super::connection::Connection;

/// Slot reserved for the listening socket.
pub const LISTENER_SLOT: usize = 0;

/// Live connections and their poll descriptors, kept as two slot tables of
/// equal length. Slot `i` of one always describes slot `i` of the other;
/// a vacant slot carries descriptor fd `-1`, which `poll` skips.
pub struct Registry<S = TcpStream> {
    connections: Vec<Option<Connection<S>>>,
    descriptors: Vec<libc::pollfd>,
    active: usize,
    max_connections: usize,
}

fn vacant() -> libc::pollfd {
    libc::pollfd {
        fd: -1,
        events: 0,
        revents: 0,
    }
}

impl<S> Registry<S> {
    pub fn new(listener_fd: RawFd, max_connections: usize) -> Self {
        let listener = libc::pollfd {
            fd: listener_fd,
            events: libc::POLLIN,
            revents: 0,
        };

        Self {
            connections: vec![None],
            descriptors: vec![listener],
            active: 0,
            max_connections,
        }
    }

    /// Registers `connection` with read interest in the lowest vacant slot.
    /// Hands the connection back when the registry is full.
    pub fn add(&mut self, connection: Connection<S>) -> Result<usize, Connection<S>> {
        if self.active >= self.max_connections {
            return Err(connection);
        }

        let descriptor = libc::pollfd {
            fd: connection.fd,
            events: libc::POLLIN,
            revents: 0,
        };

        let slot = match self.connections[1..].iter().position(Option::is_none) {
            Some(free) => {
                let slot = free + 1;
                self.connections[slot] = Some(connection);
                self.descriptors[slot] = descriptor;
                slot
            }
            None => {
                self.connections.push(Some(connection));
                self.descriptors.push(descriptor);
                self.connections.len() - 1
            }
        };

        self.active += 1;
        Ok(slot)
    }

    /// Vacates the slot holding `fd` in both tables and hands the connection
    /// back. Trailing vacant slots are truncated; live slots never move.
    pub fn remove(&mut self, fd: RawFd) -> Option<Connection<S>> {
        let slot = self.slot_of(fd)?;
        let connection = self.connections[slot].take();
        self.descriptors[slot] = vacant();
        self.active -= 1;

        let keep = self
            .connections
            .iter()
            .rposition(Option::is_some)
            .map_or(1, |last| last + 1);
        self.connections.truncate(keep);
        self.descriptors.truncate(keep);

        connection
    }

    pub fn find(&mut self, fd: RawFd) -> Option<&mut Connection<S>> {
        let slot = self.slot_of(fd)?;
        self.connections[slot].as_mut()
    }

    pub fn get_mut(&mut self, slot: usize) -> Option<&mut Connection<S>> {
        self.connections.get_mut(slot).and_then(Option::as_mut)
    }

    fn slot_of(&self, fd: RawFd) -> Option<usize> {
        if fd < 0 {
            return None;
        }
        self.connections
            .iter()
            .position(|c| c.as_ref().is_some_and(|c| c.fd == fd))
    }

    /// Sets each descriptor's events from its connection's state and clears
    /// stale readiness.
    pub fn refresh_interest(&mut self) {
        for (connection, descriptor) in self.connections.iter().zip(self.descriptors.iter_mut()) {
            if let Some(connection) = connection {
                descriptor.events = connection.state().interest();
            }
            descriptor.revents = 0;
        }
    }

    pub fn descriptors_mut(&mut self) -> &mut [libc::pollfd] {
        &mut self.descriptors
    }

    pub fn descriptors(&self) -> &[libc::pollfd] {
        &self.descriptors
    }

    pub fn revents(&self, slot: usize) -> libc::c_short {
        self.descriptors.get(slot).map_or(0, |d| d.revents)
    }

    /// Number of slots, vacant ones included.
    pub fn slot_count(&self) -> usize {
        self.connections.len()
    }

    pub fn len(&self) -> usize {
        self.active
    }

    pub fn is_empty(&self) -> bool {
        self.active == 0
    }

    pub fn is_full(&self) -> bool {
        self.active >= self.max_connections
    }

    pub fn iter(&self) -> impl Iterator<Item = &Connection<S>> {
        self.connections.iter().flatten()
    }

    /// Whether both tables agree slot by slot.
    pub fn is_synchronized(&self) -> bool {
        self.connections.len() == self.descriptors.len()
            && self
                .connections
                .iter()
                .zip(&self.descriptors)
                .skip(1)
                .all(|(c, d)| match c {
                    Some(c) => c.fd == d.fd,
                    None => d.fd == -1,
                })
    }

    pub fn log_connections(&self) {
        debug!("--- {} live connection(s) ---", self.active);
        for connection in self.iter() {
            debug!("fd {} => {}", connection.fd, connection.peer);
        }
    }
}
