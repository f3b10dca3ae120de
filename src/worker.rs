//! The worker-thread pool: each thread loops calling `dispatch_once`,
//! backing off briefly when it finds nothing ready so an idle runtime
//! doesn't spin.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use skynet_process::{dispatch_once, DispatchOutcome, Kernel};

const IDLE_BACKOFF: Duration = Duration::from_millis(1);

/// Spawns `threads` worker threads and blocks until every one of them
/// has observed `shutdown` and returned.
pub fn run_pool(kernel: Arc<Kernel>, threads: usize, shutdown: Arc<AtomicBool>) {
    let handles: Vec<_> = (0..threads)
        .map(|id| {
            let kernel = kernel.clone();
            let shutdown = shutdown.clone();
            std::thread::Builder::new()
                .name(format!("skynet-worker-{id}"))
                .spawn(move || worker_loop(&kernel, &shutdown))
                .expect("failed to spawn worker thread")
        })
        .collect();

    for handle in handles {
        let _ = handle.join();
    }
}

fn worker_loop(kernel: &Arc<Kernel>, shutdown: &AtomicBool) {
    while !shutdown.load(Ordering::Acquire) {
        match dispatch_once(kernel) {
            DispatchOutcome::Idle => std::thread::sleep(IDLE_BACKOFF),
            DispatchOutcome::Dispatched(_) | DispatchOutcome::Dropped(_) => {}
        }
    }
}
