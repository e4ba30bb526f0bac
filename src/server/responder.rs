//! Outbound side of a connection: the header block, then the file body
//! through the connection's chunk buffer. Each call performs at most one
//! socket write.

use log::{debug, trace, warn};
use std::io::{self, Read, Write};

use super::connection::{Connection, ConnectionState};
use super::net::is_would_block;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Pending,
    Complete,
}

pub fn advance_header<S: Write>(conn: &mut Connection<S>) -> io::Result<Progress> {
    if conn.header_sent >= conn.header.len() {
        debug!("Header sent on fd {} ({} bytes)", conn.fd, conn.header.len());
        conn.transition(ConnectionState::SendingFile);
        return Ok(Progress::Complete);
    }

    match conn.stream.write(&conn.header[conn.header_sent..]) {
        Ok(0) => Err(io::Error::new(
            io::ErrorKind::WriteZero,
            "socket accepted no header bytes",
        )),
        Ok(n) => {
            conn.header_sent += n;
            trace!(
                "Sent {} header bytes on fd {} ({}/{})",
                n,
                conn.fd,
                conn.header_sent,
                conn.header.len()
            );
            Ok(Progress::Pending)
        }
        Err(e) if is_would_block(&e) => Ok(Progress::Pending),
        Err(e) => Err(e),
    }
}

pub fn advance_file<S: Write>(conn: &mut Connection<S>) -> io::Result<Progress> {
    if conn.chunk_offset >= conn.chunk_len {
        if conn.file_sent >= conn.file_size {
            debug!(
                "File sent completely on fd {} ({} bytes)",
                conn.fd, conn.file_sent
            );
            conn.transition(ConnectionState::Done);
            return Ok(Progress::Complete);
        }

        let Some(file) = conn.file.as_mut() else {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                "body declared but no file attached",
            ));
        };

        let remaining = conn.file_size - conn.file_sent;
        let to_read = conn.chunk.len().min(usize::try_from(remaining).unwrap_or(usize::MAX));

        let n = loop {
            match file.read(&mut conn.chunk[..to_read]) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        };

        conn.chunk_len = n;
        conn.chunk_offset = 0;
        if n == 0 {
            warn!(
                "File ended early on fd {} ({}/{} bytes)",
                conn.fd, conn.file_sent, conn.file_size
            );
            conn.transition(ConnectionState::Done);
            return Ok(Progress::Complete);
        }
    }

    match conn
        .stream
        .write(&conn.chunk[conn.chunk_offset..conn.chunk_len])
    {
        Ok(0) => Err(io::Error::new(
            io::ErrorKind::WriteZero,
            "socket accepted no body bytes",
        )),
        Ok(n) => {
            conn.chunk_offset += n;
            conn.file_sent += n as u64;
            trace!(
                "File progress on fd {}: {}/{} bytes",
                conn.fd,
                conn.file_sent,
                conn.file_size
            );
            Ok(Progress::Pending)
        }
        Err(e) if is_would_block(&e) => Ok(Progress::Pending),
        Err(e) => Err(e),
    }
}
