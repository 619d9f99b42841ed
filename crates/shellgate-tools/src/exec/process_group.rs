//! Signalling whole process groups.
//!
//! Children are spawned as group leaders, so the child's pid doubles as its
//! process-group id. A group that has already exited is not an error.

use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::io;
use tracing::debug;

/// Send `signal` to the process group led by `pid`.
pub fn signal_group(pid: u32, signal: Signal) -> io::Result<()> {
    let raw = i32::try_from(pid).map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?;
    match killpg(Pid::from_raw(raw), signal) {
        Ok(()) => {
            debug!(pgid = pid, signal = %signal, "Signalled process group");
            Ok(())
        }
        Err(Errno::ESRCH) => Ok(()),
        Err(errno) => Err(io::Error::from(errno)),
    }
}

/// SIGKILL the process group led by `pid`.
pub fn kill_group(pid: u32) -> io::Result<()> {
    signal_group(pid, Signal::SIGKILL)
}

/// Whether any process in the group led by `pid` is still alive.
pub fn group_alive(pid: u32) -> bool {
    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    // Signal 0 only checks for existence.
    !matches!(
        nix::sys::signal::killpg(Pid::from_raw(raw), None::<Signal>),
        Err(Errno::ESRCH)
    )
}
