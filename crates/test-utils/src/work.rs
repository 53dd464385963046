//! Scripted work functions for executor tests.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::anyhow;
use dagrun::{work, Value, WorkFn};

/// Returns its input unchanged.
pub fn echo() -> WorkFn {
    work(|input: Value| async move { Ok(input) })
}

/// Ignores its input and returns `value`.
pub fn constant(value: Value) -> WorkFn {
    work(move |_input: Value| {
        let value = value.clone();
        async move { Ok(value) }
    })
}

/// Adds `n` to a numeric input (null counts as 0).
pub fn add(n: i64) -> WorkFn {
    work(move |input: Value| async move {
        let base = input.as_i64().unwrap_or(0);
        Ok(Value::from(base + n))
    })
}

/// Sums an array of numeric inputs, treating nulls as 0.
pub fn sum() -> WorkFn {
    work(|input: Value| async move {
        let total: i64 = input
            .as_array()
            .map(|items| items.iter().filter_map(Value::as_i64).sum())
            .unwrap_or(0);
        Ok(Value::from(total))
    })
}

/// Fails every time with `message`.
pub fn always_fail(message: &str) -> WorkFn {
    let message = message.to_string();
    work(move |_input: Value| {
        let message = message.clone();
        async move { Err(anyhow!(message)) }
    })
}

/// Fails the first `failures` calls, then returns `value`.
///
/// The returned counter holds the number of calls made so far.
pub fn fail_times(failures: u32, value: Value) -> (WorkFn, Arc<AtomicU32>) {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let f = work(move |_input: Value| {
        let call = counter.fetch_add(1, Ordering::SeqCst) + 1;
        let value = value.clone();
        async move {
            if call <= failures {
                Err(anyhow!("transient failure #{call}"))
            } else {
                Ok(value)
            }
        }
    });
    (f, calls)
}

/// Counts calls and echoes its input.
pub fn counting() -> (WorkFn, Arc<AtomicU32>) {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let f = work(move |input: Value| {
        counter.fetch_add(1, Ordering::SeqCst);
        async move { Ok(input) }
    });
    (f, calls)
}

/// Start/finish event recorded by [`CallLog`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallEvent {
    Started(String),
    Finished(String),
}

/// Shared record of when nodes started and finished, plus a live count of
/// how many were running at once.
#[derive(Debug, Default, Clone)]
pub struct CallLog {
    events: Arc<Mutex<Vec<CallEvent>>>,
    running: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<CallEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Ids in the order they started.
    pub fn started(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                CallEvent::Started(id) => Some(id),
                CallEvent::Finished(_) => None,
            })
            .collect()
    }

    /// Position of an event in the log.
    pub fn position(&self, event: &CallEvent) -> Option<usize> {
        self.events().iter().position(|e| e == event)
    }

    /// Highest number of work functions observed running at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn enter(&self, id: &str) {
        self.events
            .lock()
            .unwrap()
            .push(CallEvent::Started(id.to_string()));
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self, id: &str) {
        self.running.fetch_sub(1, Ordering::SeqCst);
        self.events
            .lock()
            .unwrap()
            .push(CallEvent::Finished(id.to_string()));
    }

    /// Work that logs start/finish around a sleep and echoes its input.
    pub fn sleepy(&self, id: &str, delay: Duration) -> WorkFn {
        let log = self.clone();
        let id = id.to_string();
        work(move |input: Value| {
            let log = log.clone();
            let id = id.clone();
            async move {
                log.enter(&id);
                tokio::time::sleep(delay).await;
                log.exit(&id);
                Ok(input)
            }
        })
    }

    /// Like [`sleepy`](CallLog::sleepy) but fails after the sleep.
    pub fn sleepy_failure(&self, id: &str, delay: Duration, message: &str) -> WorkFn {
        let log = self.clone();
        let id = id.to_string();
        let message = message.to_string();
        work(move |_input: Value| {
            let log = log.clone();
            let id = id.clone();
            let message = message.clone();
            async move {
                log.enter(&id);
                tokio::time::sleep(delay).await;
                log.exit(&id);
                Err(anyhow!(message))
            }
        })
    }
}

/// Records the instant of every call, for checking backoff spacing.
pub fn timed_fail_times(failures: u32, value: Value) -> (WorkFn, Arc<Mutex<Vec<Instant>>>) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let log = calls.clone();
    let f = work(move |_input: Value| {
        let attempt = {
            let mut guard = log.lock().unwrap();
            guard.push(Instant::now());
            guard.len() as u32
        };
        let value = value.clone();
        async move {
            if attempt <= failures {
                Err(anyhow!("attempt {attempt} failed"))
            } else {
                Ok(value)
            }
        }
    });
    (f, calls)
}
