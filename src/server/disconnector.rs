use log::{debug, info};
use std::io::{self, Read};
use std::os::unix::io::RawFd;

use super::net::Transport;
use super::registry::Registry;

/// Tears down the connection on `fd`: releases its header buffer and file,
/// half-closes the socket, drains pending input, and closes it.
///
/// Returns `false` when no connection is registered under `fd`, which makes
/// a repeated call a no-op.
pub fn disconnect<S: Transport>(registry: &mut Registry<S>, fd: RawFd) -> bool {
    let Some(mut conn) = registry.remove(fd) else {
        return false;
    };

    conn.release();

    if let Err(e) = conn.stream.shutdown_write() {
        debug!("Half-close failed on fd {}: {}", fd, e);
    }

    let drained = drain(&mut conn.stream);
    if drained > 0 {
        debug!("Discarded {} trailing bytes on fd {}", drained, fd);
    }

    info!(
        "Closed connection from {} on fd {} (active: {})",
        conn.peer,
        fd,
        registry.len()
    );
    true
}

fn drain<R: Read>(stream: &mut R) -> usize {
    let mut buffer = [0u8; 4096];
    let mut total = 0;
    loop {
        match stream.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(_) => break,
        }
    }
    total
}
