//! Diagnostic log stream returned with a symbolicated report.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Ordered, shareable collector of diagnostic messages
///
/// Cloning gives another handle to the same buffer, so search strategies on
/// worker threads can append while the caller keeps its own handle. Messages
/// keep the order in which `add` calls acquired the lock.
///
/// Every message is also emitted as a `tracing` event under the `symbo::log`
/// target.
#[derive(Debug, Clone, Default)]
pub struct LogSink
{
    messages: Arc<Mutex<Vec<String>>>,
}

impl LogSink
{
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Append one message.
    pub fn add(&self, message: impl Into<String>)
    {
        let message = message.into();
        tracing::debug!(target: "symbo::log", "{message}");
        self.lock().push(message);
    }

    /// Append several messages, keeping them contiguous.
    pub fn add_all<I, S>(&self, messages: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut guard = self.lock();
        for message in messages {
            let message = message.into();
            tracing::debug!(target: "symbo::log", "{message}");
            guard.push(message);
        }
    }

    /// Copy of every message so far.
    #[must_use]
    pub fn messages(&self) -> Vec<String>
    {
        self.lock().clone()
    }

    /// Drop every message.
    pub fn reset(&self)
    {
        self.lock().clear();
    }

    /// Number of messages.
    #[must_use]
    pub fn len(&self) -> usize
    {
        self.lock().len()
    }

    /// Returns `true` if nothing was logged.
    #[must_use]
    pub fn is_empty(&self) -> bool
    {
        self.lock().is_empty()
    }

    /// Returns `true` if any message contains `needle`.
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool
    {
        self.lock().iter().any(|message| message.contains(needle))
    }

    /// Messages joined with newlines.
    #[must_use]
    pub fn joined(&self) -> String
    {
        self.lock().join("\n")
    }

    fn lock(&self) -> MutexGuard<'_, Vec<String>>
    {
        // A panicking writer cannot leave a half-pushed String behind.
        self.messages.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests
{
    use std::thread;

    use super::*;

    #[test]
    fn test_messages_keep_order()
    {
        let logs = LogSink::new();
        logs.add("first");
        logs.add_all(["second", "third"]);
        assert_eq!(logs.messages(), vec!["first", "second", "third"]);
        assert_eq!(logs.joined(), "first\nsecond\nthird");
    }

    #[test]
    fn test_clones_share_the_buffer()
    {
        let logs = LogSink::new();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let logs = logs.clone();
                thread::spawn(move || logs.add(format!("worker {i}")))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(logs.len(), 4);
        assert!(logs.contains("worker 3"));

        logs.reset();
        assert!(logs.is_empty());
    }
}
