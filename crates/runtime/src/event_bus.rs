use std::collections::VecDeque;

/// Diagnostic record of something the viewer did or declined to do.
///
/// `seq` is assigned by the bus and increases by one per emitted event, so
/// tests and the console log can reconstruct the exact order of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub seq: u64,
    pub kind: &'static str,
    pub message: String,
}

/// Bounded in-memory event log; the oldest events are dropped first.
#[derive(Debug)]
pub struct EventBus {
    events: VecDeque<Event>,
    next_seq: u64,
    max_len: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub const DEFAULT_MAX_LEN: usize = 512;

    pub fn new() -> Self {
        Self::with_max_len(Self::DEFAULT_MAX_LEN)
    }

    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            events: VecDeque::new(),
            next_seq: 0,
            max_len: max_len.max(1),
        }
    }

    pub fn emit(&mut self, kind: &'static str, message: impl Into<String>) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        if self.events.len() == self.max_len {
            self.events.pop_front();
        }
        self.events.push_back(Event {
            seq,
            kind,
            message: message.into(),
        });
        seq
    }

    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn last(&self) -> Option<&Event> {
        self.events.back()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.events.iter().filter(|e| e.kind == kind).count()
    }

    pub fn drain(&mut self) -> Vec<Event> {
        self.events.drain(..).collect()
    }
}
