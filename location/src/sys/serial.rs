//! One-at-a-time execution for state shared with platform callbacks.
//!
//! Platform helpers may call back into native code while a call from native
//! code is still on the stack. A plain mutex would deadlock on that re-entry,
//! so actions are queued and run by whichever caller currently owns the
//! value. Output is handed out only after the lock is released.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};

type Action<T> = Box<dyn FnOnce(&mut T) + Send>;

pub(crate) struct Serialized<T> {
    value: Mutex<T>,
    queue: Mutex<VecDeque<Action<T>>>,
}

impl<T> fmt::Debug for Serialized<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Serialized")
            .field("queued", &self.queued())
            .finish_non_exhaustive()
    }
}

impl<T> Serialized<T> {
    pub(crate) fn new(value: T) -> Self {
        Self {
            value: Mutex::new(value),
            queue: Mutex::new(VecDeque::new()),
        }
    }

    /// Queue `action`, then run the queue unless another caller already is.
    ///
    /// Once the queue is empty, `flush` collects output while the value is
    /// still locked and `deliver` receives it after the lock is dropped, so
    /// `deliver` may submit again.
    pub(crate) fn submit<A, M, F, D>(&self, action: A, flush: F, deliver: D)
    where
        A: FnOnce(&mut T) + Send + 'static,
        F: Fn(&mut T) -> M,
        D: Fn(M),
    {
        self.lock_queue().push_back(Box::new(action));

        loop {
            let output = {
                let mut value = match self.value.try_lock() {
                    Ok(guard) => guard,
                    Err(TryLockError::Poisoned(err)) => err.into_inner(),
                    // The owner drains the queue before it lets go.
                    Err(TryLockError::WouldBlock) => return,
                };

                loop {
                    let next = self.lock_queue().pop_front();
                    let Some(action) = next else { break };
                    action(&mut value);
                }

                flush(&mut value)
            };

            deliver(output);

            // Something may have been queued between the last pop and unlock.
            if self.queued() == 0 {
                return;
            }
        }
    }

    fn queued(&self) -> usize {
        self.lock_queue().len()
    }

    fn lock_queue(&self) -> MutexGuard<'_, VecDeque<Action<T>>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn reentrant_submit_runs_after_the_current_action() {
        let cell: Arc<Serialized<Vec<&'static str>>> = Arc::new(Serialized::new(Vec::new()));
        let inner = Arc::clone(&cell);

        cell.submit(
            move |log| {
                log.push("outer start");
                inner.submit(|log| log.push("inner"), |_| (), |()| {});
                log.push("outer end");
            },
            |_| (),
            |()| {},
        );

        let log = cell.value.lock().unwrap();
        assert_eq!(*log, vec!["outer start", "outer end", "inner"]);
    }

    #[test]
    fn output_is_delivered_once_per_drain_without_the_lock() {
        let cell = Arc::new(Serialized::new(0_u32));
        let again = Arc::clone(&cell);
        let deliveries = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&deliveries);

        cell.submit(
            |count| *count += 1,
            |count| *count,
            move |count| {
                seen.fetch_add(1, Ordering::SeqCst);
                if count == 1 {
                    // The value is unlocked here, so this runs immediately.
                    again.submit(|count| *count += 10, |count| *count, |count| {
                        assert_eq!(count, 11);
                    });
                }
            },
        );

        assert_eq!(deliveries.load(Ordering::SeqCst), 1);
        assert_eq!(*cell.value.lock().unwrap(), 11);
        assert_eq!(cell.queued(), 0);
    }

    #[test]
    fn actions_from_other_threads_are_all_applied() {
        let cell = Arc::new(Serialized::new(0_u32));
        let workers: Vec<_> = (0..8)
            .map(|_| {
                let cell = Arc::clone(&cell);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        cell.submit(|count| *count += 1, |_| (), |()| {});
                    }
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(*cell.value.lock().unwrap(), 800);
    }
}
