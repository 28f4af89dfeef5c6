//! Keyboard interrupt forwarding.
//!
//! The SIGINT handler never touches session state directly. It reads the
//! [`ForegroundJob`] cell: when a job is running the interrupt is forwarded to
//! the job's whole process group, otherwise it is recorded as an idle interrupt
//! for the line editor to pick up. Reaping the job and clearing the cell is left
//! to the main thread, which is already blocked waiting on it.

use log::debug;
use std::io;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, OnceLock};

/// The process group currently in the foreground, shared with the handler.
#[derive(Debug, Default)]
pub struct ForegroundJob {
    pgid: AtomicI32,
    idle_interrupt: AtomicBool,
}

impl ForegroundJob {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `pgid` as the foreground job.
    pub fn claim(&self, pgid: libc::pid_t) {
        self.pgid.store(pgid, Ordering::SeqCst);
    }

    /// Stop tracking the foreground job once it has been reaped.
    pub fn release(&self) {
        self.pgid.store(0, Ordering::SeqCst);
    }

    /// Process group id of the foreground job, or 0 when idle.
    pub fn current(&self) -> libc::pid_t {
        self.pgid.load(Ordering::SeqCst)
    }

    /// Consume a pending idle interrupt.
    pub fn take_idle_interrupt(&self) -> bool {
        self.idle_interrupt.swap(false, Ordering::SeqCst)
    }

    /// React to an interrupt. Async-signal-safe: atomics and `kill` only.
    pub fn relay(&self) {
        let pgid = self.current();
        if pgid > 0 {
            // SAFETY: kill is async-signal-safe; a stale group yields ESRCH.
            unsafe {
                libc::kill(-pgid, libc::SIGINT);
            }
        } else {
            self.idle_interrupt.store(true, Ordering::SeqCst);
        }
    }
}

static RELAY_TARGET: OnceLock<Arc<ForegroundJob>> = OnceLock::new();

extern "C" fn on_interrupt(_signum: libc::c_int) {
    if let Some(job) = RELAY_TARGET.get() {
        job.relay();
    }
}

/// Installs the SIGINT handler that forwards interrupts to a [`ForegroundJob`].
pub struct InterruptRelay;

impl InterruptRelay {
    /// Install the handler for `job`.
    ///
    /// The handler is process-wide, so only the first registered job is ever
    /// signalled; later calls return that same job.
    pub fn install(job: Arc<ForegroundJob>) -> io::Result<Arc<ForegroundJob>> {
        let target = RELAY_TARGET.get_or_init(|| job).clone();
        // SAFETY: the sigaction struct is zeroed then filled in; the handler
        // only performs async-signal-safe work.
        unsafe {
            let mut action = MaybeUninit::<libc::sigaction>::zeroed().assume_init();
            action.sa_sigaction = on_interrupt as extern "C" fn(libc::c_int) as libc::sighandler_t;
            // No SA_RESTART: a blocked terminal read must return EINTR so the
            // editor can redraw the prompt.
            action.sa_flags = 0;
            libc::sigemptyset(&mut action.sa_mask);
            if libc::sigaction(libc::SIGINT, &action, std::ptr::null_mut()) != 0 {
                return Err(io::Error::last_os_error());
            }
        }
        debug!("interrupt relay installed");
        Ok(target)
    }
}

/// Holds SIGINT pending on the calling thread until dropped.
///
/// Used while a job is being spawned and claimed: an interrupt in that window
/// is delivered once the job is tracked, so it reaches the job instead of
/// counting as an idle interrupt. Spawned children start with an empty signal
/// mask, so they never inherit the block.
pub struct DeferredInterrupts {
    previous: libc::sigset_t,
}

impl DeferredInterrupts {
    pub fn begin() -> Self {
        // SAFETY: both sets are initialised by sigemptyset/pthread_sigmask
        // before being read.
        unsafe {
            let mut block = MaybeUninit::<libc::sigset_t>::uninit();
            let mut previous = MaybeUninit::<libc::sigset_t>::uninit();
            libc::sigemptyset(block.as_mut_ptr());
            libc::sigaddset(block.as_mut_ptr(), libc::SIGINT);
            libc::sigemptyset(previous.as_mut_ptr());
            libc::pthread_sigmask(libc::SIG_BLOCK, block.as_ptr(), previous.as_mut_ptr());
            Self {
                previous: previous.assume_init(),
            }
        }
    }
}

impl Drop for DeferredInterrupts {
    fn drop(&mut self) {
        // SAFETY: restores the mask captured in `begin`.
        unsafe {
            libc::pthread_sigmask(libc::SIG_SETMASK, &self.previous, std::ptr::null_mut());
        }
    }
}
