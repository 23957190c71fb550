//! The thread that owns the algebra backend.
//!
//! Without a `SYMBOLICA_LICENSE` key the backend runs in restricted mode: the
//! first thread that touches it owns it for the rest of the process and any
//! other thread aborts the process. Callers that fan work out over threads
//! (test harnesses, worker pools) route it through [`on_engine_thread`],
//! which runs every job on one long-lived thread.

use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Sender};
use std::sync::OnceLock;
use std::thread;

use tracing::debug;

type Job = Box<dyn FnOnce() + Send>;

static ENGINE: OnceLock<Sender<Job>> = OnceLock::new();

thread_local! {
    static IS_ENGINE_THREAD: Cell<bool> = const { Cell::new(false) };
}

fn engine() -> &'static Sender<Job> {
    ENGINE.get_or_init(|| {
        let (tx, rx) = mpsc::channel::<Job>();
        thread::spawn(move || {
            IS_ENGINE_THREAD.with(|flag| flag.set(true));
            for job in rx {
                job();
            }
        });
        debug!("started symbolic engine thread");
        tx
    })
}

/// Run `f` on the engine thread and return its result.
///
/// Calls made from the engine thread itself run inline. A panic inside `f`
/// is resumed on the calling thread.
///
/// ```no_run
/// use lyra_symbolic::{on_engine_thread, Expr};
///
/// let two = on_engine_thread(|| (Expr::one() + Expr::one()).to_string());
/// assert_eq!(two, "2");
/// ```
pub fn on_engine_thread<F, R>(f: F) -> R
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    if IS_ENGINE_THREAD.with(Cell::get) {
        return f();
    }

    let (tx, rx) = mpsc::sync_channel(1);
    let job: Job = Box::new(move || {
        let _ = tx.send(panic::catch_unwind(AssertUnwindSafe(f)));
    });
    if let Err(mpsc::SendError(job)) = engine().send(job) {
        job();
    }

    match rx.recv() {
        Ok(Ok(value)) => value,
        Ok(Err(payload)) => panic::resume_unwind(payload),
        Err(_) => panic!("symbolic engine thread dropped a job"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Expr;

    #[test]
    fn test_results_come_back() {
        let value = on_engine_thread(|| (Expr::int(2) * Expr::int(3)).is_one());
        assert!(!value);
    }

    #[test]
    fn test_nested_calls_run_inline() {
        let inner = on_engine_thread(|| on_engine_thread(|| Expr::int(7) - Expr::int(7)));
        assert!(on_engine_thread(move || inner.is_zero()));
    }

    #[test]
    #[should_panic(expected = "boom")]
    fn test_panics_are_resumed() {
        on_engine_thread(|| panic!("boom"));
    }
}
