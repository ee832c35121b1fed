//! Ctrl+C handling
//!
//! Ctrl+C (SIGINT on Unix, the console control event on Windows) only raises
//! a flag. The forwarder checks it between iterations, so a read or post
//! already in progress finishes (or times out) first.

use std::sync::atomic::{AtomicBool, Ordering};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Install the Ctrl+C handler and return the flag it raises.
///
/// Can only succeed once per process.
pub fn install() -> Result<&'static AtomicBool, ctrlc::Error> {
    ctrlc::set_handler(|| INTERRUPTED.store(true, Ordering::SeqCst))?;
    Ok(&INTERRUPTED)
}

/// Whether an interrupt has been requested
pub fn requested(flag: &AtomicBool) -> bool {
    flag.load(Ordering::SeqCst)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::thread;
    use std::time::{Duration, Instant};

    #[test]
    fn test_sigint_raises_flag() {
        let flag = install().unwrap();
        assert!(!requested(flag));

        // SAFETY: SIGINT is routed to the handler installed above
        let rc = unsafe { libc::raise(libc::SIGINT) };
        assert_eq!(rc, 0);

        // The handler runs on its own thread
        let deadline = Instant::now() + Duration::from_secs(2);
        while !requested(flag) && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(requested(flag));

        flag.store(false, Ordering::SeqCst);
    }
}
