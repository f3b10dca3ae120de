//! A tick-driven timer wheel backing the `TIMEOUT` command: a background
//! thread advances a tick counter at a fixed cadence and, on each tick,
//! delivers every pending timeout whose deadline has passed as a
//! `SYSTEM_TIMER`-sourced message.
//!
//! Implemented as a plain OS thread rather than a tokio task so that
//! constructing a [`TimerWheel`] never requires an active tokio runtime
//! to already exist — useful both for unit tests and for collaborators
//! that get built before the runtime is started.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use skynet_process::{Handle, Message, MessageSink, Payload, Session, Timer, SYSTEM_TIMER};

/// Tick granularity, matching the original timer wheel's centisecond
/// resolution.
const TICK: Duration = Duration::from_millis(10);

struct Pending {
    fire_at: u64,
    handle: Handle,
    session: Session,
    sink: Arc<dyn MessageSink>,
}

pub struct TimerWheel {
    ticks: Arc<AtomicU64>,
    pending: Arc<Mutex<Vec<Pending>>>,
    running: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl TimerWheel {
    /// Spawns the background tick thread and returns the handle callers
    /// register as the runtime's [`Timer`] collaborator.
    pub fn start() -> Arc<Self> {
        let ticks = Arc::new(AtomicU64::new(0));
        let pending: Arc<Mutex<Vec<Pending>>> = Arc::new(Mutex::new(Vec::new()));
        let running = Arc::new(AtomicBool::new(true));

        let worker = {
            let ticks = ticks.clone();
            let pending = pending.clone();
            let running = running.clone();
            std::thread::Builder::new()
                .name("skynet-timer".into())
                .spawn(move || run(ticks, pending, running))
                .expect("failed to spawn timer thread")
        };

        Arc::new(Self {
            ticks,
            pending,
            running,
            worker: Mutex::new(Some(worker)),
        })
    }
}

fn run(ticks: Arc<AtomicU64>, pending: Arc<Mutex<Vec<Pending>>>, running: Arc<AtomicBool>) {
    while running.load(Ordering::Acquire) {
        std::thread::sleep(TICK);
        let now = ticks.fetch_add(1, Ordering::AcqRel) + 1;

        let due: Vec<Pending> = {
            let mut guard = pending.lock().unwrap();
            let mut due = Vec::new();
            let mut i = 0;
            while i < guard.len() {
                if guard[i].fire_at <= now {
                    due.push(guard.swap_remove(i));
                } else {
                    i += 1;
                }
            }
            due
        };

        for item in due {
            item.sink.push(
                item.handle,
                Message {
                    source: SYSTEM_TIMER,
                    session: item.session,
                    payload: Payload::Bytes(Vec::new()),
                },
            );
        }
    }
}

impl Timer for TimerWheel {
    fn now_ticks(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }

    fn timeout(&self, sink: Arc<dyn MessageSink>, handle: Handle, ticks: u32, session: Session) {
        let fire_at = self.now_ticks() + ticks as u64;
        self.pending.lock().unwrap().push(Pending {
            fire_at,
            handle,
            session,
            sink,
        });
    }
}

impl Drop for TimerWheel {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(worker) = self.worker.lock().unwrap().take() {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use std::time::Instant;

    struct RecordingSink(StdMutex<Vec<(Handle, Session)>>);
    impl MessageSink for RecordingSink {
        fn push(&self, handle: Handle, message: Message) -> bool {
            self.0.lock().unwrap().push((handle, message.session));
            true
        }
    }

    #[test]
    fn now_ticks_advances_over_time() {
        let wheel = TimerWheel::start();
        std::thread::sleep(Duration::from_millis(50));
        assert!(wheel.now_ticks() > 0);
    }

    #[test]
    fn timeout_fires_after_its_tick_deadline() {
        let wheel = TimerWheel::start();
        let sink = Arc::new(RecordingSink(StdMutex::new(Vec::new())));
        wheel.timeout(sink.clone(), 7, 2, 99);

        let deadline = Instant::now() + Duration::from_millis(500);
        loop {
            if !sink.0.lock().unwrap().is_empty() || Instant::now() > deadline {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }

        let fired = sink.0.lock().unwrap();
        assert_eq!(fired.as_slice(), &[(7, 99)]);
    }
}
