use std::fs::File;
use std::net::{SocketAddr, TcpStream};
use std::os::unix::io::RawFd;

use super::net::Transport;
use super::response::Response;

/// Per-connection protocol state. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    ReadingRequest,
    SendingHeader,
    SendingFile,
    Done,
}

impl ConnectionState {
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (ReadingRequest, SendingHeader) | (SendingHeader, SendingFile) | (SendingFile, Done)
        )
    }

    /// Readiness events the connection waits for in this state.
    pub fn interest(self) -> libc::c_short {
        match self {
            Self::ReadingRequest => libc::POLLIN,
            Self::SendingHeader | Self::SendingFile => libc::POLLOUT,
            Self::Done => 0,
        }
    }
}

#[derive(Debug)]
pub struct Connection<S = TcpStream> {
    pub fd: RawFd,
    pub peer: SocketAddr,
    pub stream: S,
    state: ConnectionState,

    pub request_buffer: Vec<u8>,
    pub request_len: usize,

    pub header: Vec<u8>,
    pub header_sent: usize,

    pub file: Option<File>,
    pub file_size: u64,
    pub file_sent: u64,

    pub chunk: Vec<u8>,
    pub chunk_len: usize,
    pub chunk_offset: usize,
}

impl<S: Transport> Connection<S> {
    pub fn new(stream: S, peer: SocketAddr, recv_buffer_size: usize, chunk_size: usize) -> Self {
        let fd = stream.as_raw_fd();

        Self {
            fd,
            peer,
            stream,
            state: ConnectionState::ReadingRequest,
            request_buffer: vec![0u8; recv_buffer_size.max(1)],
            request_len: 0,
            header: Vec::new(),
            header_sent: 0,
            file: None,
            file_size: 0,
            file_sent: 0,
            chunk: vec![0u8; chunk_size.max(1)],
            chunk_len: 0,
            chunk_offset: 0,
        }
    }
}

impl<S> Connection<S> {
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Moves to `next`, which must be the single successor of the current state.
    pub fn transition(&mut self, next: ConnectionState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {:?} -> {:?} on fd {}",
            self.state,
            next,
            self.fd
        );
        self.state = next;
    }

    /// Installs a prepared response and starts sending its header.
    pub fn attach(&mut self, response: Response) {
        self.header = response.header_block();
        self.header_sent = 0;
        self.file_size = response.content_length;
        self.file = response.body;
        self.file_sent = 0;
        self.chunk_len = 0;
        self.chunk_offset = 0;
        self.transition(ConnectionState::SendingHeader);
    }

    /// Drops the header buffer and closes the file. Safe to call repeatedly.
    pub fn release(&mut self) {
        self.header = Vec::new();
        self.file = None;
    }
}
