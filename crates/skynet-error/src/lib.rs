//! Where dropped messages and service-launch failures get reported.
//! [`LogErrorSink`] forwards them through the `log` facade the rest of
//! the runtime already logs through, tagged with the context handle
//! when one is available.

use std::collections::VecDeque;
use std::sync::Mutex;

use skynet_process::{ErrorSink, Handle};

pub struct LogErrorSink {
    recent: Mutex<VecDeque<String>>,
    capacity: usize,
}

impl LogErrorSink {
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// `capacity` bounds how many recent entries [`recent`](Self::recent)
    /// keeps around for introspection; it does not limit what gets
    /// logged.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            recent: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// The most recent entries logged through this sink, oldest first.
    pub fn recent(&self) -> Vec<String> {
        self.recent.lock().unwrap().iter().cloned().collect()
    }
}

impl Default for LogErrorSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorSink for LogErrorSink {
    fn log(&self, ctx: Option<Handle>, message: &str) {
        let line = match ctx {
            Some(handle) => format!("[{handle:08x}] {message}"),
            None => message.to_string(),
        };
        log::error!("{line}");

        let mut recent = self.recent.lock().unwrap();
        if recent.len() == self.capacity {
            recent.pop_front();
        }
        recent.push_back(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_tags_entries_with_the_context_handle() {
        let sink = LogErrorSink::new();
        sink.log(Some(7), "dropped message");
        assert_eq!(sink.recent(), vec!["[00000007] dropped message".to_string()]);
    }

    #[test]
    fn log_without_a_context_omits_the_tag() {
        let sink = LogErrorSink::new();
        sink.log(None, "launch failed");
        assert_eq!(sink.recent(), vec!["launch failed".to_string()]);
    }

    #[test]
    fn recent_drops_the_oldest_entry_once_full() {
        let sink = LogErrorSink::with_capacity(2);
        sink.log(None, "one");
        sink.log(None, "two");
        sink.log(None, "three");
        assert_eq!(sink.recent(), vec!["two".to_string(), "three".to_string()]);
    }
}
