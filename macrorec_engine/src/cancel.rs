use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// One-shot cancellation flag that sleeping threads can wait on.
///
/// Clones share the same flag. Waits wake as soon as `cancel()` is called and otherwise
/// re-check at least once per `slice`.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    cancelled: Mutex<bool>,
    cond: Condvar,
}

impl CancelToken {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn cancel(&self) {
        let mut cancelled = lock(&self.inner.cancelled);
        *cancelled = true;
        self.inner.cond.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *lock(&self.inner.cancelled)
    }

    /// Sleeps until `deadline`. Returns true if cancelled before (or while) waiting.
    pub fn wait_until(&self, deadline: Instant, slice: Duration) -> bool {
        let mut cancelled = lock(&self.inner.cancelled);
        loop {
            if *cancelled {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let wait = (deadline - now).min(slice);
            cancelled = match self.inner.cond.wait_timeout(cancelled, wait) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }

    /// Sleeps for `duration`. Returns true if cancelled.
    pub fn wait_for(&self, duration: Duration, slice: Duration) -> bool {
        match Instant::now().checked_add(duration) {
            Some(deadline) => self.wait_until(deadline, slice),
            // too far in the future to represent: wait until cancelled
            None => loop {
                if self.wait_until(Instant::now() + slice, slice) {
                    return true;
                }
            },
        }
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn wait_runs_to_deadline() {
        let token = CancelToken::new();
        let start = Instant::now();
        assert!(!token.wait_for(Duration::from_millis(50), Duration::from_millis(10)));
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn cancel_wakes_waiter_promptly() {
        let token = CancelToken::new();
        let waiter = token.clone();
        let handle = thread::spawn(move || {
            let start = Instant::now();
            let cancelled = waiter.wait_for(Duration::from_secs(10), Duration::from_secs(1));
            (cancelled, start.elapsed())
        });

        thread::sleep(Duration::from_millis(50));
        token.cancel();
        let (cancelled, elapsed) = handle.join().unwrap();
        assert!(cancelled);
        assert!(elapsed < Duration::from_millis(500));
    }

    #[test]
    fn cancelled_token_returns_immediately() {
        let token = CancelToken::new();
        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
        assert!(token.wait_for(Duration::from_secs(5), Duration::from_secs(1)));
    }
}
