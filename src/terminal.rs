//! Terminal state owned by the interpreter: raw input mode for the line editor
//! and the foreground process group of the controlling terminal.

use log::{debug, warn};
use std::io::{self, IsTerminal};
use std::mem::MaybeUninit;
use std::os::fd::{AsRawFd, RawFd};

/// Whether standard input is attached to a terminal.
pub fn stdin_is_terminal() -> bool {
    io::stdin().is_terminal()
}

/// Scoped guard that disables line buffering and echo on a terminal.
///
/// Signal generation (`ISIG`) stays enabled so Ctrl-C still raises SIGINT.
/// The previous attributes are restored when the guard is dropped.
pub struct RawMode {
    fd: RawFd,
    original: libc::termios,
}

impl RawMode {
    pub fn enable() -> io::Result<Self> {
        Self::enable_on(io::stdin().as_raw_fd())
    }

    pub fn enable_on(fd: RawFd) -> io::Result<Self> {
        let mut termios = MaybeUninit::<libc::termios>::uninit();
        // SAFETY: tcgetattr fully initialises the struct when it returns 0.
        let original = unsafe {
            if libc::tcgetattr(fd, termios.as_mut_ptr()) != 0 {
                return Err(io::Error::last_os_error());
            }
            termios.assume_init()
        };
        let mut raw = original;
        raw.c_lflag &= !(libc::ICANON | libc::ECHO);
        raw.c_cc[libc::VMIN] = 1;
        raw.c_cc[libc::VTIME] = 0;
        // SAFETY: `raw` is a valid termios copied from the current settings.
        if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &raw) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(Self { fd, original })
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        // SAFETY: restores attributes previously read from the same fd.
        if unsafe { libc::tcsetattr(self.fd, libc::TCSANOW, &self.original) } != 0 {
            warn!(
                "failed to restore terminal mode: {}",
                io::Error::last_os_error()
            );
        }
    }
}

/// Hands the controlling terminal to a job's process group and takes it back.
///
/// Only meaningful when standard input is a terminal; otherwise every call is
/// a no-op, so launched jobs never need the terminal to receive signals.
#[derive(Debug, Clone, Copy)]
pub struct TerminalControl {
    fd: RawFd,
    shell_pgid: libc::pid_t,
}

impl TerminalControl {
    /// Capture the interpreter's own process group if stdin is a terminal.
    pub fn detect() -> Option<Self> {
        if !stdin_is_terminal() {
            return None;
        }
        // SAFETY: getpgrp has no preconditions.
        let shell_pgid = unsafe { libc::getpgrp() };
        Some(Self {
            fd: io::stdin().as_raw_fd(),
            shell_pgid,
        })
    }

    /// Make `pgid` the terminal's foreground process group.
    pub fn hand_to(&self, pgid: libc::pid_t) {
        self.set_foreground(pgid);
    }

    /// Make the interpreter's process group the foreground group again.
    pub fn reclaim(&self) {
        self.set_foreground(self.shell_pgid);
    }

    fn set_foreground(&self, pgid: libc::pid_t) {
        // A background process calling tcsetpgrp receives SIGTTOU; block it
        // for the duration of the call.
        // SAFETY: plain libc calls on locally owned signal sets.
        let result = unsafe {
            let mut block = MaybeUninit::<libc::sigset_t>::uninit();
            let mut previous = MaybeUninit::<libc::sigset_t>::uninit();
            libc::sigemptyset(block.as_mut_ptr());
            libc::sigaddset(block.as_mut_ptr(), libc::SIGTTOU);
            libc::sigprocmask(libc::SIG_BLOCK, block.as_ptr(), previous.as_mut_ptr());
            let rc = libc::tcsetpgrp(self.fd, pgid);
            let err = io::Error::last_os_error();
            libc::sigprocmask(libc::SIG_SETMASK, previous.as_ptr(), std::ptr::null_mut());
            if rc == 0 { Ok(()) } else { Err(err) }
        };
        match result {
            Ok(()) => debug!("terminal foreground group is now {pgid}"),
            Err(err) => warn!("tcsetpgrp({pgid}) failed: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_mode_fails_on_non_terminal() {
        let file = tempfile::tempfile().unwrap();
        assert!(RawMode::enable_on(file.as_raw_fd()).is_err());
    }
}
