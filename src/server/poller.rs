use std::io;
use std::time::Duration;

use super::net::syscall;

pub const READABLE: libc::c_short = libc::POLLIN | libc::POLLHUP | libc::POLLERR;
pub const WRITABLE: libc::c_short = libc::POLLOUT | libc::POLLHUP | libc::POLLERR;

/// Blocks until a descriptor in `descriptors` is ready or `timeout` elapses
/// (`None` waits indefinitely). Returns the number of ready descriptors.
pub fn wait(descriptors: &mut [libc::pollfd], timeout: Option<Duration>) -> io::Result<usize> {
    let timeout_ms = match timeout {
        Some(t) => t.as_millis().min(libc::c_int::MAX as u128) as libc::c_int,
        None => -1,
    };

    let ready = syscall!(poll(
        descriptors.as_mut_ptr(),
        descriptors.len() as libc::nfds_t,
        timeout_ms,
    ))?;

    Ok(ready as usize)
}

pub fn is_readable(revents: libc::c_short) -> bool {
    revents & READABLE != 0
}

pub fn is_writable(revents: libc::c_short) -> bool {
    revents & WRITABLE != 0
}

pub fn is_invalid(revents: libc::c_short) -> bool {
    revents & libc::POLLNVAL != 0
}
